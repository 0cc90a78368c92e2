use std::collections::{BTreeSet, HashMap};

use axum::extract::{Path, Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use platform_wire::reddit::{
    fullname, strip_kind, AccessTokenResponse, Comment, Listing, RefreshTokenResponse,
    RelatedUser, Submission, Submitted, Subreddit, Thing, UserList, ACCESS_TOKEN_PATH,
    COMMENT_KIND, GENERATE_REFRESH_TOKEN_PATH, LISTING_KIND, POST_KIND, SUBREDDIT_KIND,
};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::{status, MockPlatforms, Platforms};

const REFRESH_PREFIX: &str = "refresh-";
const ACCESS_PREFIX: &str = "access-";
const ACCESS_TOKEN_HEADER: &str = "X-Access-Token";
const DEFAULT_LIMIT: usize = 25;

type Params = HashMap<String, String>;

#[derive(Debug, Clone)]
pub(crate) struct Channel {
    pub(crate) subreddit: Subreddit,
    settings: Map<String, Value>,
    contributors: BTreeSet<String>,
    moderators: BTreeSet<String>,
    invites: BTreeSet<String>,
    subscribers: BTreeSet<String>,
}

/// What a test can observe of a channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSnapshot {
    pub subreddit: Subreddit,
    pub settings: Map<String, Value>,
    pub contributors: Vec<String>,
    pub moderators: Vec<String>,
    pub subscribers: Vec<String>,
}

impl Channel {
    pub(crate) fn new(id: &str, name: &str, title: &str, channel_type: &str, creator: &str) -> Self {
        Self {
            subreddit: Subreddit {
                display_name: name.to_string(),
                title: title.to_string(),
                subreddit_type: channel_type.to_string(),
                name: Some(fullname(SUBREDDIT_KIND, id)),
                public_description: None,
            },
            settings: Map::new(),
            contributors: BTreeSet::new(),
            moderators: BTreeSet::from([creator.to_string()]),
            invites: BTreeSet::new(),
            subscribers: BTreeSet::from([creator.to_string()]),
        }
    }

    pub(crate) fn snapshot(&self) -> ChannelSnapshot {
        ChannelSnapshot {
            subreddit: self.subreddit.clone(),
            settings: self.settings.clone(),
            contributors: self.contributors.iter().cloned().collect(),
            moderators: self.moderators.iter().cloned().collect(),
            subscribers: self.subscribers.iter().cloned().collect(),
        }
    }

    fn is_moderator(&self, username: &str) -> bool {
        self.moderators.contains(username)
    }

    fn can_read(&self, username: &str) -> bool {
        self.subreddit.subreddit_type != "private"
            || self.is_moderator(username)
            || self.contributors.contains(username)
    }

    fn apply(&mut self, params: &Params) {
        if let Some(title) = params.get("title") {
            self.subreddit.title.clone_from(title);
        }
        if let Some(channel_type) = params.get("type") {
            self.subreddit.subreddit_type.clone_from(channel_type);
        }
        for key in [
            "header_title",
            "link_type",
            "public_description",
            "submit_link_label",
            "submit_text",
            "submit_text_label",
        ] {
            if let Some(value) = params.get(key) {
                self.settings
                    .insert(key.to_string(), Value::String(value.clone()));
            }
        }
        if let Some(description) = params.get("public_description") {
            self.subreddit.public_description = Some(description.clone());
        }
    }
}

pub(crate) fn routes() -> Router<MockPlatforms> {
    Router::new()
        .route(GENERATE_REFRESH_TOKEN_PATH, get(generate_refresh_token))
        .route(ACCESS_TOKEN_PATH, post(access_token))
        .route("/subreddits/mine/subscriber", get(mine))
        .route("/r/:channel/about", get(about))
        .route("/r/:channel/about/edit", get(about_edit))
        .route("/r/:channel/about/contributors", get(contributors))
        .route("/r/:channel/about/moderators", get(moderators))
        .route("/r/:channel/hot", get(channel_hot))
        .route("/r/:channel/api/friend", post(friend))
        .route("/r/:channel/api/unfriend", post(unfriend))
        .route("/r/:channel/api/accept_moderator_invite", post(accept_moderator_invite))
        .route("/api/site_admin", post(site_admin))
        .route("/api/submit", post(submit))
        .route("/api/editusertext", post(edit_user_text))
        .route("/api/comment", post(comment))
        .route("/api/del", post(delete))
        .route("/api/info", get(info))
        .route("/api/morechildren", get(more_children))
        .route("/api/subscribe", post(subscribe))
        .route("/hot", get(front_page))
        .route("/by_id/:fullname", get(by_id))
        .route("/comments/:post_id/", get(comment_page))
        .route("/comments/:post_id/_/:comment_id", get(comment_thread))
}

fn bearer_user(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("bearer ")?
        .strip_prefix(ACCESS_PREFIX)
        .map(str::to_string)
}

macro_rules! require_user {
    ($headers:expr) => {
        match bearer_user(&$headers) {
            Some(username) => username,
            None => return status(StatusCode::UNAUTHORIZED),
        }
    };
}

fn listing<T: Serialize>(kind: &str, items: impl IntoIterator<Item = T>) -> Thing<Listing<T>> {
    Thing::new(
        LISTING_KIND,
        Listing {
            children: items.into_iter().map(|item| Thing::new(kind, item)).collect(),
            after: None,
            before: None,
        },
    )
}

fn envelope(data: Option<Value>) -> Response {
    Json(json!({"json": {"errors": [], "data": data}})).into_response()
}

fn api_error(code: &str, message: &str, field: &str) -> Response {
    Json(json!({"json": {"errors": [[code, message, field]]}})).into_response()
}

fn things<T: Serialize>(kind: &str, items: impl IntoIterator<Item = T>) -> Response {
    let things: Vec<Thing<T>> = items.into_iter().map(|item| Thing::new(kind, item)).collect();
    envelope(Some(json!({ "things": things })))
}

fn limit(params: &Params) -> usize {
    params
        .get("limit")
        .and_then(|limit| limit.parse().ok())
        .unwrap_or(DEFAULT_LIMIT)
}

async fn generate_refresh_token(
    State(state): State<MockPlatforms>,
    headers: HeaderMap,
    Query(params): Query<Params>,
) -> Response {
    let access = headers
        .get(ACCESS_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok());
    if access != Some(state.config.reddit_access_token.as_str()) {
        return status(StatusCode::FORBIDDEN);
    }
    match params.get("username") {
        Some(username) if !username.is_empty() => Json(RefreshTokenResponse {
            refresh_token: format!("{REFRESH_PREFIX}{username}"),
        })
        .into_response(),
        _ => status(StatusCode::BAD_REQUEST),
    }
}

async fn access_token(
    State(state): State<MockPlatforms>,
    headers: HeaderMap,
    Form(params): Form<Params>,
) -> Response {
    let expected = STANDARD.encode(format!(
        "{}:{}",
        state.config.reddit_client_id, state.config.reddit_secret
    ));
    let basic = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Basic "));
    if basic != Some(expected.as_str()) {
        return status(StatusCode::UNAUTHORIZED);
    }
    if params.get("grant_type").map(String::as_str) != Some("refresh_token") {
        return status(StatusCode::BAD_REQUEST);
    }
    let Some(username) = params
        .get("refresh_token")
        .and_then(|token| token.strip_prefix(REFRESH_PREFIX))
    else {
        return status(StatusCode::BAD_REQUEST);
    };
    Json(AccessTokenResponse {
        access_token: format!("{ACCESS_PREFIX}{username}"),
        token_type: Some("bearer".to_string()),
        expires_in: Some(3600),
    })
    .into_response()
}

async fn mine(State(state): State<MockPlatforms>, headers: HeaderMap) -> Response {
    let username = require_user!(headers);
    let platforms = state.lock();
    let subscribed = platforms
        .channels
        .values()
        .filter(|channel| channel.subscribers.contains(&username))
        .map(|channel| channel.subreddit.clone());
    Json(listing(SUBREDDIT_KIND, subscribed)).into_response()
}

async fn about(
    State(state): State<MockPlatforms>,
    Path(channel): Path<String>,
    headers: HeaderMap,
) -> Response {
    let username = require_user!(headers);
    match state.lock().channels.get(&channel) {
        Some(channel) if channel.can_read(&username) => {
            Json(Thing::new(SUBREDDIT_KIND, channel.subreddit.clone())).into_response()
        }
        Some(_) => status(StatusCode::FORBIDDEN),
        None => status(StatusCode::NOT_FOUND),
    }
}

async fn about_edit(
    State(state): State<MockPlatforms>,
    Path(channel): Path<String>,
    headers: HeaderMap,
) -> Response {
    let username = require_user!(headers);
    let platforms = state.lock();
    let Some(channel) = platforms.channels.get(&channel) else {
        return status(StatusCode::NOT_FOUND);
    };
    if !channel.is_moderator(&username) {
        return status(StatusCode::FORBIDDEN);
    }
    let mut data = channel.settings.clone();
    data.insert("title".to_string(), json!(channel.subreddit.title));
    data.insert(
        "subreddit_type".to_string(),
        json!(channel.subreddit.subreddit_type),
    );
    data.insert("subreddit_id".to_string(), json!(channel.subreddit.name));
    Json(Thing::new("subreddit_settings", data)).into_response()
}

fn user_list<'a>(names: impl Iterator<Item = &'a String>) -> Response {
    let children = names
        .map(|name| RelatedUser { name: name.clone() })
        .collect();
    Json(Thing::new("UserList", UserList { children })).into_response()
}

async fn contributors(
    State(state): State<MockPlatforms>,
    Path(channel): Path<String>,
    headers: HeaderMap,
) -> Response {
    let _username = require_user!(headers);
    match state.lock().channels.get(&channel) {
        Some(channel) => user_list(channel.contributors.iter()),
        None => status(StatusCode::NOT_FOUND),
    }
}

async fn moderators(
    State(state): State<MockPlatforms>,
    Path(channel): Path<String>,
    headers: HeaderMap,
) -> Response {
    let _username = require_user!(headers);
    match state.lock().channels.get(&channel) {
        Some(channel) => user_list(channel.moderators.iter()),
        None => status(StatusCode::NOT_FOUND),
    }
}

async fn friend(
    State(state): State<MockPlatforms>,
    Path(channel): Path<String>,
    headers: HeaderMap,
    Form(params): Form<Params>,
) -> Response {
    let username = require_user!(headers);
    let mut platforms = state.lock();
    let Some(channel) = platforms.channels.get_mut(&channel) else {
        return status(StatusCode::NOT_FOUND);
    };
    if !channel.is_moderator(&username) {
        return status(StatusCode::FORBIDDEN);
    }
    let (Some(name), Some(kind)) = (params.get("name"), params.get("type")) else {
        return status(StatusCode::BAD_REQUEST);
    };
    match kind.as_str() {
        "contributor" => channel.contributors.insert(name.clone()),
        "moderator_invite" => channel.invites.insert(name.clone()),
        _ => return status(StatusCode::BAD_REQUEST),
    };
    envelope(None)
}

async fn unfriend(
    State(state): State<MockPlatforms>,
    Path(channel): Path<String>,
    headers: HeaderMap,
    Form(params): Form<Params>,
) -> Response {
    let username = require_user!(headers);
    let mut platforms = state.lock();
    let Some(channel) = platforms.channels.get_mut(&channel) else {
        return status(StatusCode::NOT_FOUND);
    };
    if !channel.is_moderator(&username) {
        return status(StatusCode::FORBIDDEN);
    }
    let (Some(name), Some(kind)) = (params.get("name"), params.get("type")) else {
        return status(StatusCode::BAD_REQUEST);
    };
    let removed = match kind.as_str() {
        "contributor" => {
            channel.contributors.remove(name);
            true
        }
        "moderator" => channel.moderators.remove(name),
        _ => return status(StatusCode::BAD_REQUEST),
    };
    if removed {
        envelope(None)
    } else {
        status(StatusCode::FORBIDDEN)
    }
}

async fn accept_moderator_invite(
    State(state): State<MockPlatforms>,
    Path(channel): Path<String>,
    headers: HeaderMap,
) -> Response {
    let username = require_user!(headers);
    let mut platforms = state.lock();
    let Some(channel) = platforms.channels.get_mut(&channel) else {
        return status(StatusCode::NOT_FOUND);
    };
    if !channel.invites.remove(&username) {
        return status(StatusCode::FORBIDDEN);
    }
    channel.moderators.insert(username);
    envelope(None)
}

async fn site_admin(
    State(state): State<MockPlatforms>,
    headers: HeaderMap,
    Form(params): Form<Params>,
) -> Response {
    let username = require_user!(headers);
    let Some(name) = params.get("name") else {
        return api_error("BAD_SR_NAME", "that name isn't going to work", "name");
    };
    let mut platforms = state.lock();
    if params.contains_key("sr") {
        let Some(channel) = platforms.channels.get_mut(name) else {
            return status(StatusCode::NOT_FOUND);
        };
        if !channel.is_moderator(&username) {
            return status(StatusCode::FORBIDDEN);
        }
        channel.apply(&params);
        return envelope(None);
    }
    if platforms.channels.contains_key(name) {
        return api_error("SUBREDDIT_EXISTS", "that subreddit already exists", "name");
    }
    let id = platforms.next_id();
    let title = params.get("title").map_or(name.as_str(), String::as_str);
    let channel_type = params.get("type").map_or("public", String::as_str);
    let mut channel = Channel::new(&id, name, title, channel_type, &username);
    channel.apply(&params);
    platforms.channels.insert(name.clone(), channel);
    envelope(None)
}

async fn submit(
    State(state): State<MockPlatforms>,
    headers: HeaderMap,
    Form(params): Form<Params>,
) -> Response {
    let username = require_user!(headers);
    let (Some(channel_name), Some(title), Some(kind)) =
        (params.get("sr"), params.get("title"), params.get("kind"))
    else {
        return status(StatusCode::BAD_REQUEST);
    };
    let mut platforms = state.lock();
    match platforms.channels.get(channel_name) {
        Some(channel) if channel.can_read(&username) => {}
        Some(_) => return status(StatusCode::FORBIDDEN),
        None => return api_error("SUBREDDIT_NOEXIST", "that subreddit doesn't exist", "sr"),
    }
    let (is_self, selftext, url) = match kind.as_str() {
        "self" => (true, params.get("text").cloned().unwrap_or_default(), None),
        "link" => (false, String::new(), params.get("url").cloned()),
        _ => return status(StatusCode::BAD_REQUEST),
    };
    let id = platforms.next_id();
    let post = Submission {
        id: id.clone(),
        name: fullname(POST_KIND, &id),
        title: title.clone(),
        is_self,
        selftext,
        url: url.clone(),
        subreddit: Some(channel_name.clone()),
        num_comments: 0,
    };
    let submitted = Submitted {
        id: id.clone(),
        name: post.name.clone(),
        url,
    };
    platforms.posts.insert(id, post);
    envelope(serde_json::to_value(submitted).ok())
}

fn hot(platforms: &Platforms, channel: Option<&str>, params: &Params) -> Response {
    let posts = platforms
        .posts
        .values()
        .rev()
        .filter(|post| channel.is_none() || post.subreddit.as_deref() == channel)
        .take(limit(params))
        .cloned();
    Json(listing(POST_KIND, posts)).into_response()
}

async fn front_page(
    State(state): State<MockPlatforms>,
    headers: HeaderMap,
    Query(params): Query<Params>,
) -> Response {
    let _username = require_user!(headers);
    hot(&state.lock(), None, &params)
}

async fn channel_hot(
    State(state): State<MockPlatforms>,
    Path(channel): Path<String>,
    headers: HeaderMap,
    Query(params): Query<Params>,
) -> Response {
    let username = require_user!(headers);
    let platforms = state.lock();
    match platforms.channels.get(&channel) {
        Some(found) if found.can_read(&username) => hot(&platforms, Some(&channel), &params),
        Some(_) => status(StatusCode::FORBIDDEN),
        None => status(StatusCode::NOT_FOUND),
    }
}

async fn by_id(
    State(state): State<MockPlatforms>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Response {
    let _username = require_user!(headers);
    let platforms = state.lock();
    let post = strip_kind(&name).and_then(|id| platforms.posts.get(id)).cloned();
    Json(listing(POST_KIND, post)).into_response()
}

async fn edit_user_text(
    State(state): State<MockPlatforms>,
    headers: HeaderMap,
    Form(params): Form<Params>,
) -> Response {
    let _username = require_user!(headers);
    let (Some(thing_id), Some(text)) = (params.get("thing_id"), params.get("text")) else {
        return status(StatusCode::BAD_REQUEST);
    };
    let Some((kind, id)) = thing_id.split_once('_') else {
        return status(StatusCode::BAD_REQUEST);
    };
    let mut platforms = state.lock();
    match kind {
        POST_KIND => match platforms.posts.get_mut(id) {
            Some(post) if post.is_self => {
                post.selftext.clone_from(text);
                things(POST_KIND, [post.clone()])
            }
            Some(_) => api_error("NO_SELFS", "link posts have no text", "thing_id"),
            None => status(StatusCode::NOT_FOUND),
        },
        COMMENT_KIND => match platforms.comments.get_mut(id) {
            Some(comment) => {
                comment.body.clone_from(text);
                things(COMMENT_KIND, [comment.clone()])
            }
            None => status(StatusCode::NOT_FOUND),
        },
        _ => status(StatusCode::BAD_REQUEST),
    }
}

async fn comment(
    State(state): State<MockPlatforms>,
    headers: HeaderMap,
    Form(params): Form<Params>,
) -> Response {
    let username = require_user!(headers);
    let (Some(parent_id), Some(text)) = (params.get("thing_id"), params.get("text")) else {
        return status(StatusCode::BAD_REQUEST);
    };
    let mut platforms = state.lock();
    let link_id = match parent_id.split_once('_') {
        Some((POST_KIND, id)) if platforms.posts.contains_key(id) => parent_id.clone(),
        Some((COMMENT_KIND, id)) => match platforms.comments.get(id) {
            Some(parent) => parent.link_id.clone(),
            None => return status(StatusCode::NOT_FOUND),
        },
        _ => return status(StatusCode::NOT_FOUND),
    };
    let id = platforms.next_id();
    let comment = Comment {
        id: id.clone(),
        name: fullname(COMMENT_KIND, &id),
        body: text.clone(),
        parent_id: parent_id.clone(),
        link_id: link_id.clone(),
        author: Some(username),
    };
    if let Some(post) = strip_kind(&link_id).and_then(|post_id| platforms.posts.get_mut(post_id)) {
        post.num_comments += 1;
    }
    platforms.comments.insert(id, comment.clone());
    things(COMMENT_KIND, [comment])
}

async fn delete(
    State(state): State<MockPlatforms>,
    headers: HeaderMap,
    Form(params): Form<Params>,
) -> Response {
    let username = require_user!(headers);
    let Some(id) = params.get("id").and_then(|id| strip_kind(id)) else {
        return status(StatusCode::BAD_REQUEST);
    };
    let mut platforms = state.lock();
    let author = platforms.comments.get(id).map(|comment| comment.author.clone());
    match author {
        Some(author) if author.as_deref() != Some(username.as_str()) => {
            status(StatusCode::FORBIDDEN)
        }
        Some(_) => {
            platforms.comments.remove(id);
            Json(json!({})).into_response()
        }
        None => Json(json!({})).into_response(),
    }
}

async fn info(
    State(state): State<MockPlatforms>,
    headers: HeaderMap,
    Query(params): Query<Params>,
) -> Response {
    let _username = require_user!(headers);
    let platforms = state.lock();
    let comment = params
        .get("id")
        .and_then(|id| strip_kind(id))
        .and_then(|id| platforms.comments.get(id))
        .cloned();
    Json(listing(COMMENT_KIND, comment)).into_response()
}

fn comment_tree(platforms: &Platforms, post_id: &str, parent: &str) -> Response {
    let Some(post) = platforms.posts.get(post_id) else {
        return status(StatusCode::NOT_FOUND);
    };
    let comments = platforms
        .comments
        .values()
        .filter(|comment| comment.parent_id == parent)
        .cloned();
    Json((listing(POST_KIND, [post.clone()]), listing(COMMENT_KIND, comments))).into_response()
}

async fn comment_page(
    State(state): State<MockPlatforms>,
    Path(post_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let _username = require_user!(headers);
    let parent = fullname(POST_KIND, &post_id);
    comment_tree(&state.lock(), &post_id, &parent)
}

async fn comment_thread(
    State(state): State<MockPlatforms>,
    Path((post_id, comment_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let _username = require_user!(headers);
    let parent = fullname(COMMENT_KIND, &comment_id);
    comment_tree(&state.lock(), &post_id, &parent)
}

async fn more_children(
    State(state): State<MockPlatforms>,
    headers: HeaderMap,
    Query(params): Query<Params>,
) -> Response {
    let _username = require_user!(headers);
    let Some(children) = params.get("children") else {
        return status(StatusCode::BAD_REQUEST);
    };
    let platforms = state.lock();
    let comments: Vec<Comment> = children
        .split(',')
        .filter_map(|id| platforms.comments.get(id))
        .cloned()
        .collect();
    things(COMMENT_KIND, comments)
}

async fn subscribe(
    State(state): State<MockPlatforms>,
    headers: HeaderMap,
    Form(params): Form<Params>,
) -> Response {
    let username = require_user!(headers);
    let (Some(action), Some(channel)) = (params.get("action"), params.get("sr_name")) else {
        return status(StatusCode::BAD_REQUEST);
    };
    let mut platforms = state.lock();
    let Some(channel) = platforms.channels.get_mut(channel) else {
        return status(StatusCode::NOT_FOUND);
    };
    match action.as_str() {
        "sub" => {
            channel.subscribers.insert(username);
        }
        "unsub" => {
            if !channel.subscribers.remove(&username) {
                return status(StatusCode::NOT_FOUND);
            }
        }
        _ => return status(StatusCode::BAD_REQUEST),
    }
    Json(json!({})).into_response()
}

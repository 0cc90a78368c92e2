//! Channel API of the discussion backend.
//!
//! Channels, posts and comments live in a Reddit-style service. Every
//! [`ChannelApi`] acts as one user: it obtains a refresh token for that user
//! from the backend's token plugin, trades it for an OAuth access token and
//! sends every later call with it. Calls that must run as somebody else
//! (accepting a moderator invite, subscribing) connect a second `ChannelApi`
//! through the same session.

use std::str::FromStr;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hyper::Method;
use platform_wire::reddit::{
    fullname, strip_kind, AccessTokenResponse, ApiEnvelope, Comment, Listing,
    RefreshTokenResponse, RelatedUser, Submission, Submitted, Subreddit, Thing, Things, UserList,
    ACCESS_TOKEN_PATH, COMMENT_KIND, GENERATE_REFRESH_TOKEN_PATH, POST_KIND,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::session::{NamedRequest, Session};
use crate::settings::DiscussionSettings;

pub const CHANNEL_TYPE_PUBLIC: &str = "public";
pub const CHANNEL_TYPE_PRIVATE: &str = "private";

pub const ACCESS_TOKEN_HEADER_NAME: &str = "X-Access-Token";

/// Settings a channel accepts besides its title and type.
pub const CHANNEL_SETTINGS: &[&str] = &[
    "header_title",
    "link_type",
    "public_description",
    "submit_link_label",
    "submit_text",
    "submit_text_label",
];

const COMMENT_TREE_LIMIT: &str = "2048";

/// A user as the backend reports it back.
pub type Redditor = RelatedUser;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ChannelType {
    Public,
    Private,
}

impl ChannelType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => CHANNEL_TYPE_PUBLIC,
            Self::Private => CHANNEL_TYPE_PRIVATE,
        }
    }
}

impl FromStr for ChannelType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            CHANNEL_TYPE_PUBLIC => Ok(Self::Public),
            CHANNEL_TYPE_PRIVATE => Ok(Self::Private),
            other => Err(Error::invalid(format!(
                "Invalid argument channel_type={other}"
            ))),
        }
    }
}

#[must_use]
pub fn user_agent(version: &str) -> String {
    format!("MIT-Open: {version}")
}

fn validate_settings(other_settings: &[(&str, &str)]) -> Result<()> {
    match other_settings
        .iter()
        .find(|(key, _)| !CHANNEL_SETTINGS.contains(key))
    {
        Some((key, value)) => Err(Error::invalid(format!("Invalid argument {key}={value}"))),
        None => Ok(()),
    }
}

fn exactly_one(first: Option<&str>, second: Option<&str>, message: &str) -> Result<()> {
    if first.is_some() == second.is_some() {
        return Err(Error::invalid(message));
    }
    Ok(())
}

fn listing_params(
    before: Option<&str>,
    after: Option<&str>,
    count: Option<u32>,
) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(before) = before {
        params.push(("before", before.to_string()));
    }
    if let Some(after) = after {
        params.push(("after", after.to_string()));
    }
    if let Some(count) = count {
        params.push(("count", count.to_string()));
    }
    params
}

/// A post with its top-level comments.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentTree {
    pub post: Submission,
    pub comments: Vec<Comment>,
}

type CommentPage = (Thing<Listing<Submission>>, Thing<Listing<Comment>>);

impl CommentTree {
    fn from_page((post, comments): CommentPage, name: &str) -> Result<Self> {
        let post = post
            .data
            .into_items()
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound {
                name: name.to_string(),
            })?;
        Ok(Self {
            post,
            comments: comments.data.into_items(),
        })
    }
}

/// Asks the backend's token plugin for a refresh token, registering the user if needed.
pub async fn get_or_create_user<S: Session>(
    session: &mut S,
    settings: &DiscussionSettings,
    username: &str,
) -> Result<String> {
    let url = settings.reddit_url.join(GENERATE_REFRESH_TOKEN_PATH)?;
    let request = NamedRequest::get(url.as_str())
        .query(&[("username", username)])
        .name(GENERATE_REFRESH_TOKEN_PATH)
        .header(ACCESS_TOKEN_HEADER_NAME, settings.reddit_access_token.as_str());
    let response: RefreshTokenResponse = session.send(request).await?.error_for_status()?.json()?;
    Ok(response.refresh_token)
}

async fn access_token<S: Session>(
    session: &mut S,
    settings: &DiscussionSettings,
    refresh_token: &str,
) -> Result<String> {
    let url = settings.reddit_url.join(ACCESS_TOKEN_PATH)?;
    let credentials = STANDARD.encode(format!(
        "{}:{}",
        settings.reddit_client_id, settings.reddit_secret
    ));
    let request = NamedRequest::post(url.as_str())
        .name(ACCESS_TOKEN_PATH)
        .header("Authorization", format!("Basic {credentials}"))
        .header("User-Agent", user_agent(&settings.version))
        .header(ACCESS_TOKEN_HEADER_NAME, settings.reddit_access_token.as_str())
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])?;
    let reply = session.send(request).await?;
    if !reply.status.is_success() {
        return Err(Error::Auth(format!(
            "token exchange answered {}",
            reply.status
        )));
    }
    let response: AccessTokenResponse = reply.json()?;
    Ok(response.access_token)
}

#[derive(Debug, Clone)]
pub struct ChannelApi {
    settings: Arc<DiscussionSettings>,
    username: String,
    access_token: String,
}

impl ChannelApi {
    pub async fn connect<S: Session>(
        session: &mut S,
        settings: Arc<DiscussionSettings>,
        username: &str,
    ) -> Result<Self> {
        let refresh_token = get_or_create_user(session, &settings, username).await?;
        let access_token = access_token(session, &settings, &refresh_token).await?;
        tracing::debug!(username, "connected to the channel backend");
        Ok(Self {
            settings,
            username: username.to_string(),
            access_token,
        })
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    async fn as_user<S: Session>(&self, session: &mut S, username: &str) -> Result<Self> {
        Self::connect(session, Arc::clone(&self.settings), username).await
    }

    fn request(&self, method: Method, path: &str, name: &str) -> Result<NamedRequest> {
        let url = self.settings.reddit_url.join(path)?;
        Ok(NamedRequest::new(method, url.as_str())
            .query(&[("raw_json", "1")])
            .name(name)
            .header("Authorization", format!("bearer {}", self.access_token))
            .header("User-Agent", user_agent(&self.settings.version))
            .header(
                ACCESS_TOKEN_HEADER_NAME,
                self.settings.reddit_access_token.as_str(),
            ))
    }

    async fn fetch<T: DeserializeOwned, S: Session>(
        &self,
        session: &mut S,
        request: NamedRequest,
    ) -> Result<T> {
        session.send(request).await?.error_for_status()?.json()
    }

    /// Sends an `api_type=json` call and unwraps its envelope.
    async fn call<T: DeserializeOwned, S: Session>(
        &self,
        session: &mut S,
        request: NamedRequest,
    ) -> Result<Option<T>> {
        let name = request.stat_name();
        let envelope: ApiEnvelope<T> = self.fetch(session, request).await?;
        if !envelope.json.errors.is_empty() {
            return Err(Error::invalid(format!(
                "{name} rejected: {}",
                Value::Array(envelope.json.errors)
            )));
        }
        Ok(envelope.json.data)
    }

    async fn post_form<S: Session>(
        &self,
        session: &mut S,
        path: &str,
        name: &str,
        form: &[(&str, &str)],
    ) -> Result<()> {
        let request = self.request(Method::POST, path, name)?.form(form)?;
        session.send(request).await?.error_for_status()?;
        Ok(())
    }

    pub async fn list_channels<S: Session>(&self, session: &mut S) -> Result<Vec<Subreddit>> {
        let request = self
            .request(Method::GET, "/subreddits/mine/subscriber", "/subreddits/mine/subscriber")?
            .query(&[("limit", "100")]);
        let listing: Thing<Listing<Subreddit>> = self.fetch(session, request).await?;
        Ok(listing.data.into_items())
    }

    pub async fn get_channel<S: Session>(&self, session: &mut S, name: &str) -> Result<Subreddit> {
        let request = self.request(
            Method::GET,
            &format!("/r/{name}/about"),
            "/r/[channel_name]/about",
        )?;
        let about: Thing<Subreddit> = self.fetch(session, request).await?;
        Ok(about.data)
    }

    pub async fn create_channel<S: Session>(
        &self,
        session: &mut S,
        name: &str,
        title: &str,
        channel_type: &str,
        other_settings: &[(&str, &str)],
    ) -> Result<Subreddit> {
        let channel_type = ChannelType::from_str(channel_type)?;
        validate_settings(other_settings)?;

        let mut form = vec![
            ("api_type", "json"),
            ("name", name),
            ("title", title),
            ("type", channel_type.as_str()),
            ("link_type", "any"),
        ];
        form.retain(|(key, _)| !other_settings.iter().any(|(other, _)| other == key));
        form.extend_from_slice(other_settings);
        let request = self
            .request(Method::POST, "/api/site_admin", "/api/site_admin")?
            .form(&form)?;
        self.call::<Value, _>(session, request).await?;
        self.get_channel(session, name).await
    }

    pub async fn update_channel<S: Session>(
        &self,
        session: &mut S,
        name: &str,
        title: Option<&str>,
        channel_type: Option<&str>,
        other_settings: &[(&str, &str)],
    ) -> Result<Subreddit> {
        let channel_type = channel_type.map(ChannelType::from_str).transpose()?;
        validate_settings(other_settings)?;

        let edit = self.request(
            Method::GET,
            &format!("/r/{name}/about/edit"),
            "/r/[channel_name]/about/edit",
        )?;
        let current: Thing<Map<String, Value>> = self.fetch(session, edit).await?;
        let current_str = |key: &str| {
            current
                .data
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        let mut form: Vec<(String, String)> = vec![
            ("api_type".to_string(), "json".to_string()),
            ("sr".to_string(), current_str("subreddit_id").unwrap_or_else(|| name.to_string())),
            ("name".to_string(), name.to_string()),
        ];
        let title = title.map(str::to_string).or_else(|| current_str("title"));
        if let Some(title) = title {
            form.push(("title".to_string(), title));
        }
        let channel_type = channel_type
            .map(|kind| kind.as_str().to_string())
            .or_else(|| current_str("subreddit_type"));
        if let Some(channel_type) = channel_type {
            form.push(("type".to_string(), channel_type));
        }
        for key in CHANNEL_SETTINGS {
            let value = match other_settings.iter().find(|(other, _)| other == key) {
                Some((_, value)) => Some((*value).to_string()),
                None => current_str(key),
            };
            if let Some(value) = value {
                form.push(((*key).to_string(), value));
            }
        }
        let request = self
            .request(Method::POST, "/api/site_admin", "/api/site_admin")?
            .form(&form)?;
        self.call::<Value, _>(session, request).await?;
        self.get_channel(session, name).await
    }

    /// Submits a text post or a link post; exactly one of `text` and `url` must be set.
    pub async fn create_post<S: Session>(
        &self,
        session: &mut S,
        channel_name: &str,
        title: &str,
        text: Option<&str>,
        url: Option<&str>,
    ) -> Result<Submitted> {
        exactly_one(text, url, "Exactly one of text and url must be provided")?;
        let mut form = vec![
            ("api_type", "json"),
            ("sr", channel_name),
            ("title", title),
        ];
        match (text, url) {
            (Some(text), _) => form.extend([("kind", "self"), ("text", text)]),
            (_, Some(url)) => form.extend([("kind", "link"), ("url", url)]),
            (None, None) => {}
        }
        let request = self
            .request(Method::POST, "/api/submit", "/api/submit")?
            .form(&form)?;
        self.call(session, request)
            .await?
            .ok_or_else(|| Error::MissingField("data"))
    }

    async fn hot<S: Session>(
        &self,
        session: &mut S,
        request: NamedRequest,
        before: Option<&str>,
        after: Option<&str>,
        count: Option<u32>,
    ) -> Result<Vec<Submission>> {
        let limit = self.settings.channel_post_limit.to_string();
        let mut params = listing_params(before, after, count);
        params.push(("limit", limit));
        let listing: Thing<Listing<Submission>> =
            self.fetch(session, request.query(&params)).await?;
        Ok(listing.data.into_items())
    }

    /// Posts on the front page, ranked hot.
    pub async fn front_page<S: Session>(
        &self,
        session: &mut S,
        before: Option<&str>,
        after: Option<&str>,
        count: Option<u32>,
    ) -> Result<Vec<Submission>> {
        let request = self.request(Method::GET, "/hot", "/hot")?;
        self.hot(session, request, before, after, count).await
    }

    pub async fn list_posts<S: Session>(
        &self,
        session: &mut S,
        channel_name: &str,
        before: Option<&str>,
        after: Option<&str>,
        count: Option<u32>,
    ) -> Result<Vec<Submission>> {
        let request = self.request(
            Method::GET,
            &format!("/r/{channel_name}/hot"),
            "/r/[channel_name]/hot?count=0&limit=25&raw_json=1",
        )?;
        self.hot(session, request, before, after, count).await
    }

    pub async fn get_post<S: Session>(&self, session: &mut S, post_id: &str) -> Result<Submission> {
        let name = "/by_id/[post_fullname]";
        let request = self.request(
            Method::GET,
            &format!("/by_id/{}", fullname(POST_KIND, post_id)),
            name,
        )?;
        let listing: Thing<Listing<Submission>> = self.fetch(session, request).await?;
        listing
            .data
            .into_items()
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound {
                name: name.to_string(),
            })
    }

    async fn edit_text<T: DeserializeOwned, S: Session>(
        &self,
        session: &mut S,
        thing_id: &str,
        text: &str,
    ) -> Result<T> {
        let request = self
            .request(Method::POST, "/api/editusertext", "/api/editusertext")?
            .form(&[("api_type", "json"), ("thing_id", thing_id), ("text", text)])?;
        let things: Option<Things<T>> = self.call(session, request).await?;
        things
            .and_then(|things| things.things.into_iter().next())
            .map(|thing| thing.data)
            .ok_or(Error::MissingField("things"))
    }

    /// Replaces the text of a text post; link posts cannot be edited.
    pub async fn update_post<S: Session>(
        &self,
        session: &mut S,
        post_id: &str,
        text: &str,
    ) -> Result<Submission> {
        let post = self.get_post(session, post_id).await?;
        if !post.is_self {
            return Err(Error::invalid("Posts with a url cannot be updated"));
        }
        self.edit_text(session, &post.name, text).await
    }

    /// Replies to a post or to a comment; exactly one parent must be given.
    pub async fn create_comment<S: Session>(
        &self,
        session: &mut S,
        text: &str,
        post_id: Option<&str>,
        comment_id: Option<&str>,
    ) -> Result<Comment> {
        exactly_one(
            post_id,
            comment_id,
            "Exactly one of post_id and comment_id must be provided",
        )?;
        let parent = match (post_id, comment_id) {
            (Some(post_id), _) => fullname(POST_KIND, post_id),
            (_, Some(comment_id)) => fullname(COMMENT_KIND, comment_id),
            (None, None) => return Err(Error::invalid("no parent")),
        };
        let request = self
            .request(Method::POST, "/api/comment", "/api/comment")?
            .form(&[("api_type", "json"), ("thing_id", &parent), ("text", text)])?;
        let things: Option<Things<Comment>> = self.call(session, request).await?;
        things
            .and_then(|things| things.things.into_iter().next())
            .map(|thing| thing.data)
            .ok_or(Error::MissingField("things"))
    }

    pub async fn update_comment<S: Session>(
        &self,
        session: &mut S,
        comment_id: &str,
        text: &str,
    ) -> Result<Comment> {
        self.edit_text(session, &fullname(COMMENT_KIND, comment_id), text)
            .await
    }

    pub async fn delete_comment<S: Session>(&self, session: &mut S, comment_id: &str) -> Result<()> {
        let id = fullname(COMMENT_KIND, comment_id);
        self.post_form(session, "/api/del", "/api/del", &[("id", &id)])
            .await
    }

    pub async fn get_comment<S: Session>(&self, session: &mut S, comment_id: &str) -> Result<Comment> {
        let name = "/api/info?id=[comment_fullname]";
        let request = self
            .request(Method::GET, "/api/info", name)?
            .query(&[("id", fullname(COMMENT_KIND, comment_id))]);
        let listing: Thing<Listing<Comment>> = self.fetch(session, request).await?;
        listing
            .data
            .into_items()
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound {
                name: name.to_string(),
            })
    }

    pub async fn list_comments<S: Session>(
        &self,
        session: &mut S,
        post_id: &str,
    ) -> Result<CommentTree> {
        let name = "/comments/[post_id]/?limit=2048&sort=best&raw_json=1";
        let request = self
            .request(Method::GET, &format!("/comments/{post_id}/"), name)?
            .query(&[("limit", COMMENT_TREE_LIMIT), ("sort", "best")]);
        let page: CommentPage = self.fetch(session, request).await?;
        CommentTree::from_page(page, name)
    }

    /// Loads the comments hidden behind a "more comments" stub.
    ///
    /// An empty `children` list is a "continue this thread" link, which loads
    /// the thread below `comment_fullname` instead.
    pub async fn more_comments<S: Session>(
        &self,
        session: &mut S,
        comment_fullname: &str,
        parent_fullname: &str,
        count: u32,
        children: &[String],
    ) -> Result<Vec<Comment>> {
        let submission_id = strip_kind(parent_fullname)
            .ok_or_else(|| Error::invalid(format!("Invalid fullname {parent_fullname}")))?;
        let comment_id = strip_kind(comment_fullname)
            .ok_or_else(|| Error::invalid(format!("Invalid fullname {comment_fullname}")))?;
        tracing::trace!(comment_fullname, count, children = children.len(), "loading more comments");

        if children.is_empty() {
            let name = "/comments/[post_id]/_/[comment_id]";
            let request = self
                .request(
                    Method::GET,
                    &format!("/comments/{submission_id}/_/{comment_id}"),
                    name,
                )?
                .query(&[("limit", COMMENT_TREE_LIMIT), ("sort", "best")]);
            let page: CommentPage = self.fetch(session, request).await?;
            return Ok(CommentTree::from_page(page, name)?.comments);
        }

        let children = children.join(",");
        let request = self
            .request(Method::GET, "/api/morechildren", "/api/morechildren")?
            .query(&[
                ("api_type", "json"),
                ("link_id", parent_fullname),
                ("children", children.as_str()),
                ("sort", "best"),
            ]);
        let things: Option<Things<Comment>> = self.call(session, request).await?;
        Ok(things
            .map(|things| things.things.into_iter().map(|thing| thing.data).collect())
            .unwrap_or_default())
    }

    pub async fn add_contributor<S: Session>(
        &self,
        session: &mut S,
        contributor_name: &str,
        channel_name: &str,
    ) -> Result<Redditor> {
        self.post_form(
            session,
            &format!("/r/{channel_name}/api/friend"),
            "/r/[channel_name]/api/friend/?raw_json=1",
            &[("api_type", "json"), ("name", contributor_name), ("type", "contributor")],
        )
        .await?;
        Ok(Redditor {
            name: contributor_name.to_string(),
        })
    }

    /// Moderators keep channel access whether or not they are contributors.
    pub async fn remove_contributor<S: Session>(
        &self,
        session: &mut S,
        contributor_name: &str,
        channel_name: &str,
    ) -> Result<()> {
        self.post_form(
            session,
            &format!("/r/{channel_name}/api/unfriend"),
            "/r/[channel_name]/api/unfriend/?raw_json=1",
            &[("api_type", "json"), ("name", contributor_name), ("type", "contributor")],
        )
        .await
    }

    async fn user_list<S: Session>(
        &self,
        session: &mut S,
        path: &str,
        name: &str,
    ) -> Result<Vec<Redditor>> {
        let request = self.request(Method::GET, path, name)?;
        let users: Thing<UserList> = self.fetch(session, request).await?;
        Ok(users.data.children)
    }

    pub async fn list_contributors<S: Session>(
        &self,
        session: &mut S,
        channel_name: &str,
    ) -> Result<Vec<Redditor>> {
        self.user_list(
            session,
            &format!("/r/{channel_name}/about/contributors"),
            "/r/[channel_name]/about/contributors/?raw_json=1",
        )
        .await
    }

    pub async fn list_moderators<S: Session>(
        &self,
        session: &mut S,
        channel_name: &str,
    ) -> Result<Vec<Redditor>> {
        self.user_list(
            session,
            &format!("/r/{channel_name}/about/moderators"),
            "/r/[channel_name]/about/moderators/?raw_json=1",
        )
        .await
    }

    /// Invites the user and accepts on their behalf, unless they already moderate.
    pub async fn add_moderator<S: Session>(
        &self,
        session: &mut S,
        moderator_name: &str,
        channel_name: &str,
    ) -> Result<Redditor> {
        let moderators = self.list_moderators(session, channel_name).await?;
        if !moderators.iter().any(|moderator| moderator.name == moderator_name) {
            self.post_form(
                session,
                &format!("/r/{channel_name}/api/friend"),
                "/r/[channel_name]/api/friend/?raw_json=1",
                &[("api_type", "json"), ("name", moderator_name), ("type", "moderator_invite")],
            )
            .await?;
            let moderator = self.as_user(session, moderator_name).await?;
            moderator.accept_invite(session, channel_name).await?;
        }
        Ok(Redditor {
            name: moderator_name.to_string(),
        })
    }

    pub async fn accept_invite<S: Session>(&self, session: &mut S, channel_name: &str) -> Result<()> {
        self.post_form(
            session,
            &format!("/r/{channel_name}/api/accept_moderator_invite"),
            "/r/[channel_name]/api/accept_moderator_invite?raw_json=1",
            &[("api_type", "json")],
        )
        .await
    }

    /// A 403 most likely means the user was no moderator to begin with.
    pub async fn remove_moderator<S: Session>(
        &self,
        session: &mut S,
        moderator_name: &str,
        channel_name: &str,
    ) -> Result<()> {
        let removed = self
            .post_form(
                session,
                &format!("/r/{channel_name}/api/unfriend"),
                "/r/[channel_name]/api/unfriend/?raw_json=1",
                &[("api_type", "json"), ("name", moderator_name), ("type", "moderator")],
            )
            .await;
        match removed {
            Err(Error::Forbidden { .. }) => {
                tracing::debug!(moderator_name, channel_name, "already not a moderator");
                Ok(())
            }
            other => other,
        }
    }

    async fn subscription<S: Session>(&self, session: &mut S, action: &str, channel_name: &str) -> Result<()> {
        self.post_form(
            session,
            "/api/subscribe",
            "/api/subscribe",
            &[("action", action), ("sr_name", channel_name)],
        )
        .await
    }

    pub async fn add_subscriber<S: Session>(
        &self,
        session: &mut S,
        subscriber_name: &str,
        channel_name: &str,
    ) -> Result<Redditor> {
        let subscriber = self.as_user(session, subscriber_name).await?;
        subscriber.subscription(session, "sub", channel_name).await?;
        Ok(Redditor {
            name: subscriber_name.to_string(),
        })
    }

    /// A 404 most likely means the user was not subscribed anymore.
    pub async fn remove_subscriber<S: Session>(
        &self,
        session: &mut S,
        subscriber_name: &str,
        channel_name: &str,
    ) -> Result<()> {
        let subscriber = self.as_user(session, subscriber_name).await?;
        match subscriber.subscription(session, "unsub", channel_name).await {
            Err(Error::NotFound { .. }) => {
                tracing::debug!(subscriber_name, channel_name, "already unsubscribed");
                Ok(())
            }
            other => other,
        }
    }

    pub async fn is_subscriber<S: Session>(
        &self,
        session: &mut S,
        subscriber_name: &str,
        channel_name: &str,
    ) -> Result<bool> {
        let subscriber = self.as_user(session, subscriber_name).await?;
        let channels = subscriber.list_channels(session).await?;
        Ok(channels
            .iter()
            .any(|channel| channel.display_name == channel_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_type_parses_known_values_only() {
        assert_eq!("public".parse::<ChannelType>().unwrap(), ChannelType::Public);
        assert_eq!("private".parse::<ChannelType>().unwrap(), ChannelType::Private);
        let err = "restricted".parse::<ChannelType>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid argument: Invalid argument channel_type=restricted"
        );
    }

    #[test]
    fn settings_outside_the_allowed_list_are_rejected() {
        assert!(validate_settings(&[("header_title", "x"), ("submit_text", "y")]).is_ok());
        let err = validate_settings(&[("over_18", "true")]).unwrap_err();
        assert_eq!(err.to_string(), "invalid argument: Invalid argument over_18=true");
    }

    #[test]
    fn exactly_one_of_two() {
        assert!(exactly_one(Some("a"), None, "m").is_ok());
        assert!(exactly_one(None, Some("b"), "m").is_ok());
        assert!(exactly_one(Some("a"), Some("b"), "m").is_err());
        assert!(exactly_one(None, None, "m").is_err());
    }

    #[test]
    fn listing_params_skip_missing_values() {
        assert!(listing_params(None, None, None).is_empty());
        assert_eq!(
            listing_params(Some("t3_a"), None, Some(25)),
            vec![("before", "t3_a".to_string()), ("count", "25".to_string())]
        );
    }

    #[test]
    fn user_agent_embeds_version() {
        assert_eq!(user_agent("0.1.0"), "MIT-Open: 0.1.0");
    }
}

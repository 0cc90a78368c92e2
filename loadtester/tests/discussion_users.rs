mod common;

use hyper::{Method, StatusCode};
use loadtester::discussions::OpenDiscussionsApi;
use loadtester::error::Error;
use loadtester::scenario::discussion_users::{self, DiscussionUsersContext};
use loadtester::scenario::Outcome;
use platform_wire::discussions::DiscussionUser;
use serde_json::{json, Map, Value};

fn profile(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn creates_until_the_limit_then_only_updates() {
    let (mock, base) = common::start().await;
    let settings = common::settings(&base);
    let ctx = DiscussionUsersContext::new(&settings).unwrap();
    let mut client = common::client(&base);
    let mut created = Vec::new();

    let outcome = discussion_users::update_user(&mut client, &ctx, &created)
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Interrupted);

    for _ in 0..settings.open_discussions.user_limit {
        let outcome = discussion_users::create_user(&mut client, &ctx, &mut created)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Completed);
    }
    let outcome = discussion_users::create_user(&mut client, &ctx, &mut created)
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Interrupted);
    assert_eq!(created.len(), 2);
    assert_eq!(mock.count_requests(&Method::POST, "/api/v0/users/"), 2);

    let outcome = discussion_users::update_user(&mut client, &ctx, &created)
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Completed);
    for username in &created {
        let user = mock.discussion_user(username).unwrap();
        assert!(user["image_small"].is_null());
    }
}

#[tokio::test]
async fn users_api_round_trip() {
    let (mock, base) = common::start().await;
    let settings = common::settings(&base);
    let od = &settings.open_discussions;
    let api = OpenDiscussionsApi::new(&od.jwt_secret, base.clone(), "mitodl", &["staff"]).unwrap();
    let mut client = common::client(&base);

    let reply = api
        .users()
        .create(&mut client, profile(json!({"name": "Grace Hopper", "image": null})))
        .await
        .unwrap();
    assert_eq!(reply.status, StatusCode::CREATED);
    let user: DiscussionUser = reply.json().unwrap();

    api.users()
        .update(&mut client, &user.username, profile(json!({"name": "Ada Lovelace"})))
        .await
        .unwrap()
        .error_for_status()
        .unwrap();
    assert_eq!(mock.discussion_user(&user.username).unwrap()["name"], "Ada Lovelace");

    let fetched: DiscussionUser = api
        .users()
        .get(&mut client, &user.username)
        .await
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(fetched.profile["name"], "Ada Lovelace");

    let listed: Vec<DiscussionUser> = api.users().list(&mut client).await.unwrap().json().unwrap();
    assert_eq!(listed.len(), 1);

    let missing = api
        .users()
        .get(&mut client, "nobody")
        .await
        .unwrap()
        .error_for_status();
    assert!(matches!(missing, Err(Error::NotFound { .. })));
}

#[tokio::test]
async fn unsupported_update_never_reaches_the_server() {
    let (mock, base) = common::start().await;
    let settings = common::settings(&base);
    let od = &settings.open_discussions;
    let api = OpenDiscussionsApi::new(&od.jwt_secret, base.clone(), "mitodl", &["staff"]).unwrap();
    let mut client = common::client(&base);

    let err = api
        .users()
        .update(&mut client, "someone", profile(json!({"bio": "x"})))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    let err = api
        .users()
        .update(&mut client, "someone", Map::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn wrong_secret_is_rejected() {
    let (_mock, base) = common::start().await;
    let api = OpenDiscussionsApi::new("not the secret", base.clone(), "mitodl", &["staff"]).unwrap();
    let mut client = common::client(&base);

    let reply = api.users().list(&mut client).await.unwrap();
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

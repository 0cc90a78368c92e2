mod common;

use std::sync::Arc;

use hyper::Method;
use loadtester::client::HttpClient;
use loadtester::discussions::channels::{ChannelApi, CHANNEL_TYPE_PUBLIC};
use loadtester::error::Error;
use loadtester::scenario::channels::{self, Reader};
use mock_platforms::MockPlatforms;

const CHANNEL: &str = "load_test";

async fn connected() -> (MockPlatforms, HttpClient, ChannelApi) {
    let (mock, base) = common::start().await;
    let settings = common::settings(&base);
    let mut client = common::client(&base);
    let api = ChannelApi::connect(&mut client, Arc::new(settings.open_discussions), "staff")
        .await
        .unwrap();
    assert_eq!(api.username(), "staff");
    (mock, client, api)
}

#[tokio::test]
async fn invalid_arguments_fail_before_any_request() {
    let (mock, mut client, api) = connected().await;
    let sent = mock.requests().len();

    let err = api
        .create_channel(&mut client, CHANNEL, "Title", "restricted", &[])
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid argument: Invalid argument channel_type=restricted"
    );
    let err = api
        .create_channel(&mut client, CHANNEL, "Title", CHANNEL_TYPE_PUBLIC, &[("over_18", "true")])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    let err = api
        .update_channel(&mut client, CHANNEL, None, Some("secret"), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    for (text, url) in [(Some("t"), Some("http://example.com")), (None, None)] {
        let err = api
            .create_post(&mut client, CHANNEL, "Title", text, url)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
    for (post_id, comment_id) in [(Some("1"), Some("2")), (None, None)] {
        let err = api
            .create_comment(&mut client, "text", post_id, comment_id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    assert_eq!(mock.requests().len(), sent);
}

#[tokio::test]
async fn channels_are_created_and_updated() {
    let (mock, mut client, api) = connected().await;

    let channel = api
        .create_channel(
            &mut client,
            CHANNEL,
            "Load Test",
            CHANNEL_TYPE_PUBLIC,
            &[("public_description", "about")],
        )
        .await
        .unwrap();
    assert_eq!(channel.display_name, CHANNEL);
    assert_eq!(channel.title, "Load Test");
    assert_eq!(channel.subreddit_type, CHANNEL_TYPE_PUBLIC);

    let mine = api.list_channels(&mut client).await.unwrap();
    assert_eq!(mine, vec![channel.clone()]);

    let updated = api
        .update_channel(&mut client, CHANNEL, Some("Renamed"), None, &[("submit_text", "go")])
        .await
        .unwrap();
    assert_eq!(updated.title, "Renamed");
    assert_eq!(updated.subreddit_type, CHANNEL_TYPE_PUBLIC);
    assert_eq!(updated.public_description.as_deref(), Some("about"));
    let snapshot = mock.channel(CHANNEL).unwrap();
    assert_eq!(snapshot.settings["submit_text"], "go");

    let err = api.get_channel(&mut client, "missing").await.unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
}

#[tokio::test]
async fn posts_and_comments() {
    let (mock, mut client, api) = connected().await;
    mock.seed_channel(CHANNEL, "Load Test", "staff");

    let text = api
        .create_post(&mut client, CHANNEL, "Hello", Some("body"), None)
        .await
        .unwrap();
    let link = api
        .create_post(&mut client, CHANNEL, "Link", None, Some("http://example.com/"))
        .await
        .unwrap();

    let post = api.get_post(&mut client, &text.id).await.unwrap();
    assert!(post.is_self);
    assert_eq!(post.selftext, "body");
    let edited = api.update_post(&mut client, &text.id, "edited").await.unwrap();
    assert_eq!(edited.selftext, "edited");
    assert_eq!(mock.post(&text.id).unwrap().selftext, "edited");
    let err = api.update_post(&mut client, &link.id, "edited").await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));

    assert_eq!(api.front_page(&mut client, None, None, None).await.unwrap().len(), 2);
    let listed = api
        .list_posts(&mut client, CHANNEL, None, None, Some(0))
        .await
        .unwrap();
    assert_eq!(listed.len(), 2);

    let top = api
        .create_comment(&mut client, "first", Some(&text.id), None)
        .await
        .unwrap();
    assert_eq!(top.parent_id, text.name);
    let reply = api
        .create_comment(&mut client, "reply", None, Some(&top.id))
        .await
        .unwrap();
    assert_eq!(reply.link_id, text.name);

    let updated = api.update_comment(&mut client, &reply.id, "edited reply").await.unwrap();
    assert_eq!(updated.body, "edited reply");
    assert_eq!(api.get_comment(&mut client, &reply.id).await.unwrap().body, "edited reply");

    let tree = api.list_comments(&mut client, &text.id).await.unwrap();
    assert_eq!(tree.post.id, text.id);
    assert_eq!(tree.post.num_comments, 2);
    assert_eq!(tree.comments, vec![top.clone()]);

    let more = api
        .more_comments(&mut client, &top.name, &text.name, 1, &[reply.id.clone()])
        .await
        .unwrap();
    assert_eq!(more.len(), 1);
    assert_eq!(more[0].id, reply.id);
    let thread = api
        .more_comments(&mut client, &top.name, &text.name, 0, &[])
        .await
        .unwrap();
    assert_eq!(thread.len(), 1);
    assert_eq!(thread[0].id, reply.id);

    api.delete_comment(&mut client, &reply.id).await.unwrap();
    assert!(mock.comment(&reply.id).is_none());
}

#[tokio::test]
async fn contributors_and_moderators() {
    let (mock, mut client, api) = connected().await;
    mock.seed_channel(CHANNEL, "Load Test", "staff");

    let added = api.add_contributor(&mut client, "honor", CHANNEL).await.unwrap();
    assert_eq!(added.name, "honor");
    let contributors = api.list_contributors(&mut client, CHANNEL).await.unwrap();
    assert_eq!(contributors, vec![added]);
    api.remove_contributor(&mut client, "honor", CHANNEL).await.unwrap();
    assert!(api.list_contributors(&mut client, CHANNEL).await.unwrap().is_empty());

    api.add_moderator(&mut client, "honor", CHANNEL).await.unwrap();
    let moderators: Vec<String> = api
        .list_moderators(&mut client, CHANNEL)
        .await
        .unwrap()
        .into_iter()
        .map(|moderator| moderator.name)
        .collect();
    assert_eq!(moderators, vec!["honor".to_string(), "staff".to_string()]);

    let invites = mock.count_requests(&Method::POST, "/r/load_test/api/friend");
    api.add_moderator(&mut client, "honor", CHANNEL).await.unwrap();
    assert_eq!(mock.count_requests(&Method::POST, "/r/load_test/api/friend"), invites);

    api.remove_moderator(&mut client, "honor", CHANNEL).await.unwrap();
    // already removed, the 403 is swallowed
    api.remove_moderator(&mut client, "honor", CHANNEL).await.unwrap();
    assert_eq!(mock.channel(CHANNEL).unwrap().moderators, vec!["staff".to_string()]);
}

#[tokio::test]
async fn subscribers() {
    let (mock, mut client, api) = connected().await;
    mock.seed_channel(CHANNEL, "Load Test", "staff");

    assert!(!api.is_subscriber(&mut client, "verified", CHANNEL).await.unwrap());
    let subscriber = api.add_subscriber(&mut client, "verified", CHANNEL).await.unwrap();
    assert_eq!(subscriber.name, "verified");
    assert!(api.is_subscriber(&mut client, "verified", CHANNEL).await.unwrap());

    api.remove_subscriber(&mut client, "verified", CHANNEL).await.unwrap();
    // already unsubscribed, the 404 is swallowed
    api.remove_subscriber(&mut client, "verified", CHANNEL).await.unwrap();
    assert!(!api.is_subscriber(&mut client, "verified", CHANNEL).await.unwrap());
}

#[tokio::test]
async fn wrong_client_secret_fails_to_connect() {
    let (_mock, base) = common::start().await;
    let mut settings = common::settings(&base).open_discussions;
    settings.reddit_secret = "wrong".to_string();
    let mut client = common::client(&base);

    let err = ChannelApi::connect(&mut client, Arc::new(settings), "staff")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Auth(_)));
}

#[tokio::test]
async fn browse_and_discuss_journey() {
    let (mock, base) = common::start().await;
    mock.seed_channel(CHANNEL, "Load Test", "staff");
    let settings = common::settings(&base);
    let mut client = common::client(&base);

    let api = channels::connect(&mut client, &settings, "staff").await.unwrap();
    let reader = Reader {
        api,
        channel_name: CHANNEL.to_string(),
    };
    channels::browse(&mut client, &reader).await.unwrap();
    channels::discuss(&mut client, &reader).await.unwrap();

    let stats = client.statistics();
    assert_eq!(
        stats
            .get("/r/[channel_name]/hot?count=0&limit=25&raw_json=1")
            .unwrap()
            .count,
        1
    );
    assert_eq!(stats.get("/api/comment").unwrap().count, 2);
    assert_eq!(stats.total_failures(), 0);
}

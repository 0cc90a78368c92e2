//! Channel browsing: a pool user reads the front page and a channel, posts,
//! comments and reads the comments back.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use goose::prelude::*;
use rand::seq::SliceRandom;

use super::bound_transaction;
use crate::discussions::channels::ChannelApi;
use crate::harness::{self, Certificates, GooseSession};
use crate::session::Session;
use crate::settings::{DiscussionSettings, Settings};

pub const SCENARIO_NAME: &str = "Channels";
/// The channel backend is reached without checking its certificate.
pub const CERTIFICATES: Certificates = Certificates::AcceptInvalid;

/// State of a connected virtual user.
#[derive(Debug, Clone)]
pub struct Reader {
    pub api: ChannelApi,
    pub channel_name: String,
}

pub async fn connect<S: Session>(
    session: &mut S,
    settings: &Settings,
    username: &str,
) -> Result<ChannelApi> {
    let discussions = Arc::new(settings.open_discussions.clone());
    ChannelApi::connect(session, discussions, username)
        .await
        .with_context(|| format!("Connecting {username} to the channel backend"))
}

pub async fn browse<S: Session>(session: &mut S, reader: &Reader) -> Result<()> {
    let front_page = reader.api.front_page(session, None, None, None).await?;
    tracing::trace!(posts = front_page.len(), "front page");
    reader
        .api
        .list_posts(session, &reader.channel_name, None, None, Some(0))
        .await?;
    Ok(())
}

pub async fn discuss<S: Session>(session: &mut S, reader: &Reader) -> Result<()> {
    let submitted = reader
        .api
        .create_post(
            session,
            &reader.channel_name,
            "Load test post",
            Some("Posted while load testing."),
            None,
        )
        .await?;
    let comment = reader
        .api
        .create_comment(session, "A first comment.", Some(&submitted.id), None)
        .await?;
    reader
        .api
        .create_comment(session, "A reply.", None, Some(&comment.id))
        .await?;
    let tree = reader.api.list_comments(session, &submitted.id).await?;
    if tree.comments.is_empty() {
        anyhow::bail!("Post {} lost its comments", submitted.id);
    }
    Ok(())
}

fn pick_channel(settings: &DiscussionSettings) -> Option<String> {
    settings
        .channel_names
        .choose(&mut rand::thread_rng())
        .cloned()
}

async fn on_start(settings: &Settings, user: &mut GooseUser) -> TransactionResult {
    let username = settings.usernames_in_edx.choose(&mut rand::thread_rng()).cloned();
    let (Some(username), Some(channel_name)) = (username, pick_channel(&settings.open_discussions))
    else {
        return harness::finish("on_start", Err(anyhow::anyhow!("no user or channel configured")));
    };
    // connecting needs the harness client, started with a placeholder state
    harness::start_virtual_user(user, CERTIFICATES, None::<Reader>).await?;
    let Some((jar, _)) = harness::checkout::<Option<Reader>>(user) else {
        return harness::finish("on_start", Err(anyhow::anyhow!("virtual user not started")));
    };
    let mut session = GooseSession::new(user, jar);
    let result = connect(&mut session, settings, &username).await;
    match result {
        Ok(api) => {
            harness::checkin(user, Some(Reader { api, channel_name }));
            Ok(())
        }
        Err(e) => harness::finish("on_start", Err(e)),
    }
}

fn reader(user: &GooseUser) -> Option<(crate::session::CookieJar, Reader)> {
    let (jar, reader) = harness::checkout::<Option<Reader>>(user)?;
    Some((jar, reader?))
}

async fn browse_task(_settings: &Settings, user: &mut GooseUser) -> TransactionResult {
    let Some((jar, reader)) = reader(user) else {
        return harness::finish("browse", Err(anyhow::anyhow!("virtual user not connected")));
    };
    let mut session = GooseSession::new(user, jar);
    let result = browse(&mut session, &reader).await;
    harness::finish("browse", result)
}

async fn discuss_task(_settings: &Settings, user: &mut GooseUser) -> TransactionResult {
    let Some((jar, reader)) = reader(user) else {
        return harness::finish("discuss", Err(anyhow::anyhow!("virtual user not connected")));
    };
    let mut session = GooseSession::new(user, jar);
    let result = discuss(&mut session, &reader).await;
    harness::finish("discuss", result)
}

pub fn scenario(settings: &Arc<Settings>) -> Result<Scenario, GooseError> {
    Ok(scenario!(SCENARIO_NAME)
        .set_host(settings.open_discussions.reddit_url.as_str())
        .set_wait_time(Duration::from_secs(1), Duration::from_secs(3))?
        .register_transaction(bound_transaction!(settings, on_start).set_name("on_start").set_on_start())
        .register_transaction(
            bound_transaction!(settings, browse_task)
                .set_name("browse")
                .set_weight(3)?,
        )
        .register_transaction(bound_transaction!(settings, discuss_task).set_name("discuss")))
}

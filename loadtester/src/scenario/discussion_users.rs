//! Staff creating discussion users and renaming them.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use goose::prelude::*;
use hyper::StatusCode;
use platform_wire::discussions::DiscussionUser;
use rand::seq::SliceRandom;
use serde_json::{Map, Value};

use super::{bound_transaction, Outcome};
use crate::discussions::OpenDiscussionsApi;
use crate::harness::{self, Certificates, GooseSession};
use crate::session::Session;
use crate::settings::Settings;

pub const SCENARIO_NAME: &str = "DiscussionUsers";
pub const CERTIFICATES: Certificates = Certificates::Verify;
const STAFF_ROLES: &[&str] = &["staff"];

const FIRST_NAMES: &[&str] = &[
    "Ada", "Alan", "Barbara", "Claude", "Dorothy", "Edsger", "Frances", "Grace", "Hedy", "Ivan",
    "John", "Katherine", "Linus", "Margaret", "Niklaus", "Radia", "Shafi", "Tim",
];
const LAST_NAMES: &[&str] = &[
    "Allen", "Backus", "Dijkstra", "Hamilton", "Hopper", "Johnson", "Kay", "Knuth", "Lamarr",
    "Liskov", "Lovelace", "McCarthy", "Perlman", "Ritchie", "Shannon", "Sutherland", "Turing",
    "Wirth",
];

pub struct DiscussionUsersContext {
    pub api: OpenDiscussionsApi,
    pub user_limit: usize,
}

impl DiscussionUsersContext {
    pub fn new(settings: &Settings) -> crate::error::Result<Self> {
        let discussions = &settings.open_discussions;
        let api = OpenDiscussionsApi::new(
            &discussions.jwt_secret,
            discussions.base_url.clone(),
            &discussions.api_username,
            STAFF_ROLES,
        )?;
        Ok(Self {
            api,
            user_limit: discussions.user_limit,
        })
    }
}

/// Usernames this virtual user has created.
pub type CreatedUsers = Vec<String>;

#[must_use]
pub fn fake_name() -> String {
    let mut rng = rand::thread_rng();
    let first = FIRST_NAMES.choose(&mut rng).copied().unwrap_or("Ada");
    let last = LAST_NAMES.choose(&mut rng).copied().unwrap_or("Lovelace");
    format!("{first} {last}")
}

fn fake_profile() -> Map<String, Value> {
    let mut profile = Map::new();
    profile.insert("name".to_string(), Value::String(fake_name()));
    for image in ["image", "image_small", "image_medium"] {
        profile.insert(image.to_string(), Value::Null);
    }
    profile
}

pub async fn create_user<S: Session>(
    session: &mut S,
    ctx: &DiscussionUsersContext,
    created: &mut CreatedUsers,
) -> Result<Outcome> {
    if created.len() >= ctx.user_limit {
        return Ok(Outcome::Interrupted);
    }
    let reply = ctx.api.users().create(session, fake_profile()).await?;
    if reply.status == StatusCode::CREATED {
        let user: DiscussionUser = reply.json()?;
        created.push(user.username);
    } else {
        tracing::debug!(status = %reply.status, "user was not created");
    }
    Ok(Outcome::Completed)
}

pub async fn update_user<S: Session>(
    session: &mut S,
    ctx: &DiscussionUsersContext,
    created: &CreatedUsers,
) -> Result<Outcome> {
    let Some(username) = created.choose(&mut rand::thread_rng()) else {
        return Ok(Outcome::Interrupted);
    };
    ctx.api
        .users()
        .update(session, username, fake_profile())
        .await?
        .error_for_status()
        .with_context(|| format!("Renaming {username}"))?;
    Ok(Outcome::Completed)
}

async fn on_start(_ctx: &DiscussionUsersContext, user: &mut GooseUser) -> TransactionResult {
    harness::start_virtual_user(user, CERTIFICATES, CreatedUsers::new()).await
}

async fn create_users_task(ctx: &DiscussionUsersContext, user: &mut GooseUser) -> TransactionResult {
    let Some((jar, mut created)) = harness::checkout::<CreatedUsers>(user) else {
        return harness::finish("create_users", Err(anyhow::anyhow!("virtual user not started")));
    };
    let mut session = GooseSession::new(user, jar);
    let result = create_user(&mut session, ctx, &mut created).await;
    harness::checkin(user, created);
    harness::finish("create_users", result.map(|_| ()))
}

async fn update_users_task(ctx: &DiscussionUsersContext, user: &mut GooseUser) -> TransactionResult {
    let Some((jar, created)) = harness::checkout::<CreatedUsers>(user) else {
        return harness::finish("update_users", Err(anyhow::anyhow!("virtual user not started")));
    };
    let mut session = GooseSession::new(user, jar);
    let result = update_user(&mut session, ctx, &created).await;
    harness::finish("update_users", result.map(|_| ()))
}

pub fn scenario(settings: &Arc<Settings>) -> Result<Scenario, GooseError> {
    let ctx = DiscussionUsersContext::new(settings).map_err(|e| GooseError::InvalidOption {
        option: "open_discussions.jwt_secret".to_string(),
        value: String::new(),
        detail: e.to_string(),
    })?;
    let ctx = Arc::new(ctx);
    Ok(scenario!(SCENARIO_NAME)
        .set_host(settings.open_discussions.base_url.as_str())
        .set_wait_time(Duration::from_millis(1), Duration::from_millis(100))?
        .register_transaction(bound_transaction!(ctx, on_start).set_name("on_start").set_on_start())
        .register_transaction(bound_transaction!(ctx, create_users_task).set_name("create_users"))
        .register_transaction(bound_transaction!(ctx, update_users_task).set_name("update_users")))
}

//! The scripted user journeys.
//!
//! Each submodule exposes its journey as plain async functions generic over
//! [`crate::session::Session`] and a `scenario` constructor registering them
//! with the goose harness.

use std::sync::Arc;

use goose::prelude::*;

use crate::settings::Settings;

pub mod channels;
pub mod discussion_users;
pub mod micromasters;
pub mod rapid_response;

/// How a scripted task ended.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// The task stopped early without sending its requests.
    Interrupted,
}

/// Wraps `$func(&ctx, user)` into a goose transaction owning a clone of `$ctx`.
macro_rules! bound_transaction {
    ($ctx:expr, $func:path) => {{
        let ctx = ::std::sync::Arc::clone(&$ctx);
        let function: ::goose::prelude::TransactionFunction =
            ::std::sync::Arc::new(move |user| {
                let ctx = ::std::sync::Arc::clone(&ctx);
                Box::pin(async move { $func(&ctx, user).await })
            });
        ::goose::prelude::Transaction::new(function)
    }};
}
pub(crate) use bound_transaction;

/// Every scenario the settings allow, under the names `--scenarios` selects by.
pub fn all(settings: &Arc<Settings>) -> Result<Vec<Scenario>, GooseError> {
    let mut scenarios = vec![
        micromasters::scenario(settings)?,
        discussion_users::scenario(settings)?,
    ];
    if settings.rapid_response.course_data.is_empty() {
        tracing::warn!("no rapid_response.course_data configured, skipping RapidResponse");
    } else {
        scenarios.push(rapid_response::scenario(settings)?);
    }
    if settings.open_discussions.channel_names.is_empty() {
        tracing::warn!("no open_discussions.channel_names configured, skipping Channels");
    } else {
        scenarios.push(channels::scenario(settings)?);
    }
    Ok(scenarios)
}

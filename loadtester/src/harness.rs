//! Glue between the scripts and the goose harness.
//!
//! The harness owns scheduling, pacing and statistics; this module only hands
//! its per-user client to the scripts as a [`Session`] and keeps each virtual
//! user's script state in the harness's session data slot.

use std::time::Duration;

use goose::prelude::*;
use hyper::Method;
use url::Url;

use crate::error::{Error, Result};
use crate::session::{CookieJar, NamedRequest, Reply, Session};

const USER_AGENT: &str = concat!("loadtester/", env!("CARGO_PKG_VERSION"));

/// How a scenario's client treats server certificates.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Certificates {
    Verify,
    /// The channel backend runs with self-signed certificates.
    AcceptInvalid,
}

/// Script state of one virtual user plus the cookies of its client.
pub struct VirtualUser<T> {
    pub jar: CookieJar,
    pub state: T,
}

/// Swaps in a client that shares its cookie jar with the scripts, then stores `state`.
pub async fn start_virtual_user<T>(
    user: &mut GooseUser,
    certificates: Certificates,
    state: T,
) -> TransactionResult
where
    T: Send + Sync + 'static,
{
    let jar = CookieJar::default();
    let builder = reqwest::Client::builder()
        .cookie_provider(jar.provider())
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(60))
        .danger_accept_invalid_certs(certificates == Certificates::AcceptInvalid);
    user.set_client_builder(builder).await?;
    user.set_session_data(VirtualUser { jar, state });
    Ok(())
}

/// Clones the virtual user's cookie jar and state out of the harness.
pub fn checkout<T>(user: &GooseUser) -> Option<(CookieJar, T)>
where
    T: Clone + Send + Sync + 'static,
{
    user.get_session_data::<VirtualUser<T>>()
        .map(|virtual_user| (virtual_user.jar.clone(), virtual_user.state.clone()))
}

/// Stores state changed by a transaction back into the harness.
pub fn checkin<T>(user: &mut GooseUser, state: T)
where
    T: Send + Sync + 'static,
{
    if let Some(virtual_user) = user.get_session_data_mut::<VirtualUser<T>>() {
        virtual_user.state = state;
    }
}

/// Ends a transaction. Failed requests are already in the harness statistics,
/// a failed script is logged and the virtual user carries on.
pub fn finish(transaction: &str, result: anyhow::Result<()>) -> TransactionResult {
    if let Err(e) = result {
        tracing::warn!(transaction, error = %format!("{e:#}"), "transaction failed");
    }
    Ok(())
}

pub struct GooseSession<'a> {
    user: &'a mut GooseUser,
    jar: CookieJar,
}

impl<'a> GooseSession<'a> {
    #[must_use]
    pub fn new(user: &'a mut GooseUser, jar: CookieJar) -> Self {
        Self { user, jar }
    }
}

fn goose_method(method: &Method) -> Result<GooseMethod> {
    Ok(match *method {
        Method::GET => GooseMethod::Get,
        Method::POST => GooseMethod::Post,
        Method::PATCH => GooseMethod::Patch,
        Method::PUT => GooseMethod::Put,
        Method::DELETE => GooseMethod::Delete,
        Method::HEAD => GooseMethod::Head,
        ref other => return Err(Error::invalid(format!("unsupported method {other}"))),
    })
}

impl Session for GooseSession<'_> {
    fn base_url(&self) -> &Url {
        &self.user.base_url
    }

    async fn send(&mut self, request: NamedRequest) -> Result<Reply> {
        let url = self.resolve(&request.target)?;
        let method = goose_method(&request.method)?;
        let name = request.stat_name();

        let mut builder = self
            .user
            .get_request_builder(&method, url.as_str())
            .map_err(|e| Error::Transport(e.to_string()))?;
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if let Some(content_type) = request.body.content_type() {
            builder = builder
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(request.body.to_bytes());
        }
        let goose_request = GooseRequest::builder()
            .method(method)
            .path(url.as_str())
            .name(name.as_str())
            .set_request_builder(builder)
            .build();

        let goose = self
            .user
            .request(goose_request)
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        let response = goose
            .response
            .map_err(|e| Error::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        Ok(Reply::new(name, status, body))
    }

    fn cookie(&self, url: &Url, name: &str) -> Option<String> {
        self.jar.get(url, name)
    }
}

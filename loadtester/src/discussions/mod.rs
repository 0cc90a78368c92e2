//! Clients for the Open Discussions service.
//!
//! [`OpenDiscussionsApi`] talks to the service's own REST API with a signed
//! service token; [`channels::ChannelApi`] talks to the Reddit-style backend
//! behind it. Neither owns a connection: every call takes the [`Session`] it
//! should go through.

pub mod channels;

use jsonwebtoken::{encode, get_current_timestamp, EncodingKey, Header};
use parking_lot::Mutex;
use platform_wire::discussions::{
    TokenClaims, UserPayload, SUPPORTED_USER_ATTRIBUTES, USERS_PATH,
};
use serde_json::{Map, Value};
use url::Url;

use crate::error::{Error, Result};
use crate::session::{NamedRequest, Reply, Session};

const TOKEN_TTL_SECS: u64 = 60 * 60;
/// Tokens this close to expiry are signed again before use.
const TOKEN_REFRESH_SECS: u64 = 5 * 60;

#[derive(Debug)]
struct SignedToken {
    value: String,
    expires_at: u64,
}

/// Client of the users API, shared by every virtual user of a run.
#[derive(Debug)]
pub struct OpenDiscussionsApi {
    base_url: Url,
    secret: String,
    username: String,
    roles: Vec<String>,
    token: Mutex<SignedToken>,
}

impl OpenDiscussionsApi {
    pub fn new(secret: &str, base_url: Url, username: &str, roles: &[&str]) -> Result<Self> {
        let now = get_current_timestamp();
        let value = sign(secret, username, roles, now)?;
        Ok(Self {
            base_url,
            secret: secret.to_string(),
            username: username.to_string(),
            roles: roles.iter().map(|role| (*role).to_string()).collect(),
            token: Mutex::new(SignedToken {
                value,
                expires_at: now + TOKEN_TTL_SECS,
            }),
        })
    }

    #[must_use]
    pub fn users(&self) -> UsersApi<'_> {
        UsersApi { api: self }
    }

    fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// The current service token, re-signed when it is about to expire.
    fn token_at(&self, now: u64) -> Result<String> {
        let mut token = self.token.lock();
        if now + TOKEN_REFRESH_SECS >= token.expires_at {
            let roles: Vec<&str> = self.roles.iter().map(String::as_str).collect();
            token.value = sign(&self.secret, &self.username, &roles, now)?;
            token.expires_at = now + TOKEN_TTL_SECS;
            tracing::debug!(username = %self.username, "service token re-signed");
        }
        Ok(token.value.clone())
    }

    fn authorized(&self, request: NamedRequest) -> Result<NamedRequest> {
        let token = self.token_at(get_current_timestamp())?;
        Ok(request.header("Authorization", format!("Bearer {token}")))
    }
}

/// Signs the HS256 token the service expects from trusted callers.
pub fn service_token(secret: &str, username: &str, roles: &[&str]) -> Result<String> {
    sign(secret, username, roles, get_current_timestamp())
}

fn sign(secret: &str, username: &str, roles: &[&str], now: u64) -> Result<String> {
    let claims = TokenClaims {
        username: username.to_string(),
        roles: roles.iter().map(|role| (*role).to_string()).collect(),
        exp: now + TOKEN_TTL_SECS,
        orig_iat: now,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| Error::Auth(e.to_string()))
}

fn validate_profile(profile: &Map<String, Value>, action: &str) -> Result<()> {
    if profile.is_empty() {
        return Err(Error::invalid(format!("No fields provided to {action}")));
    }
    match profile
        .keys()
        .find(|key| !SUPPORTED_USER_ATTRIBUTES.contains(&key.as_str()))
    {
        Some(key) => Err(Error::invalid(format!("Argument {key} is not supported"))),
        None => Ok(()),
    }
}

pub struct UsersApi<'a> {
    api: &'a OpenDiscussionsApi,
}

impl UsersApi<'_> {
    /// URL of one user, the username is percent-encoded as a path segment.
    fn user_url(&self, username: &str) -> Result<Url> {
        let mut url = self.api.url(USERS_PATH)?;
        url.path_segments_mut()
            .map_err(|()| Error::invalid("base url cannot carry a path"))?
            .pop_if_empty()
            .push(username)
            .push("");
        Ok(url)
    }

    pub async fn list<S: Session>(&self, session: &mut S) -> Result<Reply> {
        let url = self.api.url(USERS_PATH)?;
        session
            .send(self.api.authorized(NamedRequest::get(url.as_str()))?)
            .await
    }

    pub async fn get<S: Session>(&self, session: &mut S, username: &str) -> Result<Reply> {
        let url = self.user_url(username)?;
        let request = NamedRequest::get(url.as_str()).name("/users/[username]/");
        session.send(self.api.authorized(request)?).await
    }

    pub async fn create<S: Session>(
        &self,
        session: &mut S,
        profile: Map<String, Value>,
    ) -> Result<Reply> {
        validate_profile(&profile, "create")?;
        let url = self.api.url(USERS_PATH)?;
        let request = NamedRequest::post(url.as_str())
            .name(USERS_PATH)
            .json(&UserPayload { profile })?;
        session.send(self.api.authorized(request)?).await
    }

    pub async fn update<S: Session>(
        &self,
        session: &mut S,
        username: &str,
        profile: Map<String, Value>,
    ) -> Result<Reply> {
        validate_profile(&profile, "update")?;
        let url = self.user_url(username)?;
        let request = NamedRequest::patch(url.as_str())
            .name("/users/[username]/")
            .json(&UserPayload { profile })?;
        session.send(self.api.authorized(request)?).await
    }
}

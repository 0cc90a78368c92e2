//! The HTTP interface every script talks through.
//!
//! Scripts never own a client. They receive a [`Session`], which is either the
//! load harness's instrumented user or the standalone [`crate::client::HttpClient`].

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use hyper::header::HeaderValue;
use hyper::{Method, StatusCode};
use platform_wire::{FORM_CONTENT_TYPE, JSON_CONTENT_TYPE};
use reqwest::cookie::{CookieStore, Jar};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    Empty,
    Form(String),
    Json(Vec<u8>),
}

impl RequestBody {
    #[must_use]
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            Self::Empty => None,
            Self::Form(_) => Some(FORM_CONTENT_TYPE),
            Self::Json(_) => Some(JSON_CONTENT_TYPE),
        }
    }

    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        match self {
            Self::Empty => Bytes::new(),
            Self::Form(form) => Bytes::copy_from_slice(form.as_bytes()),
            Self::Json(json) => Bytes::copy_from_slice(json),
        }
    }
}

/// A request together with the name it is reported under.
///
/// `target` is either an absolute URL or a path resolved against the
/// session's base URL. Requests without a name are reported under their target.
#[derive(Debug, Clone)]
pub struct NamedRequest {
    pub method: Method,
    pub target: String,
    pub name: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl NamedRequest {
    #[must_use]
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            name: None,
            headers: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    #[must_use]
    pub fn get(target: impl Into<String>) -> Self {
        Self::new(Method::GET, target)
    }

    #[must_use]
    pub fn post(target: impl Into<String>) -> Self {
        Self::new(Method::POST, target)
    }

    #[must_use]
    pub fn patch(target: impl Into<String>) -> Self {
        Self::new(Method::PATCH, target)
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Adds the header only when a value is present.
    #[must_use]
    pub fn header_opt(self, key: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.header(key, value),
            None => self,
        }
    }

    /// Appends URL-encoded query parameters to the target.
    #[must_use]
    pub fn query<K: AsRef<str>, V: AsRef<str>>(mut self, pairs: &[(K, V)]) -> Self {
        if pairs.is_empty() {
            return self;
        }
        let mut encoded = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in pairs {
            encoded.append_pair(key.as_ref(), value.as_ref());
        }
        let separator = if self.target.contains('?') { '&' } else { '?' };
        self.target.push(separator);
        self.target.push_str(&encoded.finish());
        self
    }

    pub fn form<T: Serialize + ?Sized>(mut self, form: &T) -> Result<Self> {
        let encoded = serde_urlencoded::to_string(form)
            .map_err(|e| Error::invalid(format!("unencodable form: {e}")))?;
        self.body = RequestBody::Form(encoded);
        Ok(self)
    }

    pub fn json<T: Serialize + ?Sized>(mut self, json: &T) -> Result<Self> {
        let raw = serde_json::to_vec(json).map_err(|source| Error::Decode {
            name: self.stat_name(),
            source,
        })?;
        self.body = RequestBody::Json(raw);
        Ok(self)
    }

    #[must_use]
    pub fn stat_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.target.clone())
    }
}

#[derive(Debug, Clone)]
pub struct Reply {
    pub name: String,
    pub status: StatusCode,
    pub body: Bytes,
}

impl Reply {
    #[must_use]
    pub fn new(name: String, status: StatusCode, body: Bytes) -> Self {
        Self { name, status, body }
    }

    /// Success and redirect statuses pass, 403 and 404 get their own variants.
    pub fn error_for_status(self) -> Result<Self> {
        let status = self.status;
        if status.is_success() || status.is_redirection() {
            return Ok(self);
        }
        Err(match status {
            StatusCode::FORBIDDEN => Error::Forbidden { name: self.name },
            StatusCode::NOT_FOUND => Error::NotFound { name: self.name },
            _ => Error::Status {
                name: self.name,
                status,
            },
        })
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|source| Error::Decode {
            name: self.name.clone(),
            source,
        })
    }
}

pub trait Session: Send {
    fn base_url(&self) -> &Url;

    fn send(&mut self, request: NamedRequest) -> impl Future<Output = Result<Reply>> + Send;

    /// Value of the cookie `name` that would be sent to `url`.
    fn cookie(&self, url: &Url, name: &str) -> Option<String>;

    fn resolve(&self, target: &str) -> Result<Url> {
        Ok(self.base_url().join(target)?)
    }

    fn base_cookie(&self, name: &str) -> Option<String> {
        self.cookie(self.base_url(), name)
    }
}

/// Cookie store of one virtual user, shared with the transport that fills it.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    inner: Arc<Jar>,
}

impl CookieJar {
    #[must_use]
    pub fn provider(&self) -> Arc<Jar> {
        self.inner.clone()
    }

    /// Looks a cookie up by host and path; ports never take part in the match.
    #[must_use]
    pub fn get(&self, url: &Url, name: &str) -> Option<String> {
        let header = self.inner.cookies(url)?;
        let raw = header.to_str().ok()?;
        raw.split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.to_string())
    }

    #[must_use]
    pub fn header(&self, url: &Url) -> Option<HeaderValue> {
        self.inner.cookies(url)
    }

    pub fn store<'a>(&self, url: &Url, set_cookies: impl Iterator<Item = &'a HeaderValue>) {
        let mut set_cookies = set_cookies.peekable();
        if set_cookies.peek().is_some() {
            self.inner.set_cookies(&mut set_cookies, url);
        }
    }
}

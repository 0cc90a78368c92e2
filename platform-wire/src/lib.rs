//! Request bodies and payload types shared by the load scripts and the mock platforms.

pub mod discussions;
pub mod drain;
pub mod edx;
pub mod micromasters;
pub mod reddit;

use bytes::Bytes;
use http_body_util::Full;

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
pub const JSON_CONTENT_TYPE: &str = "application/json";

#[inline]
pub fn byte_body<B: Into<Bytes>>(bytes: B) -> Full<Bytes> {
    Full::new(bytes.into())
}

/// Both platforms check the anti-forgery token in this header.
pub const CSRF_HEADER: &str = "X-CSRFToken";
pub const CSRF_COOKIE: &str = "csrftoken";

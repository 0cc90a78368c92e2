//! Open Discussions user API payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const USERS_PATH: &str = "/api/v0/users/";

/// Profile keys the user API accepts on create and update.
pub const SUPPORTED_USER_ATTRIBUTES: &[&str] = &["name", "image", "image_small", "image_medium"];

/// Users are created and updated by wrapping the profile fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPayload {
    pub profile: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscussionUser {
    pub username: String,
    #[serde(default)]
    pub profile: Map<String, Value>,
}

/// Claims of the service token the API client signs with the shared secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub username: String,
    pub roles: Vec<String>,
    pub exp: u64,
    pub orig_iat: u64,
}

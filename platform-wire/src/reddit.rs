//! The Reddit-style JSON shapes the discussion backend speaks.
//!
//! Only the fields the channel API reads are modelled; everything else in a
//! response is ignored on decode.

use serde::{Deserialize, Serialize};

pub const GENERATE_REFRESH_TOKEN_PATH: &str = "/api/v1/generate_refresh_token";
pub const ACCESS_TOKEN_PATH: &str = "/api/v1/access_token";

/// Prefix of post fullnames (`t3_<id>`).
pub const POST_KIND: &str = "t3";
/// Prefix of comment fullnames (`t1_<id>`).
pub const COMMENT_KIND: &str = "t1";
pub const SUBREDDIT_KIND: &str = "t5";
pub const LISTING_KIND: &str = "Listing";

#[must_use]
pub fn fullname(kind: &str, id: &str) -> String {
    format!("{kind}_{id}")
}

/// Returns the id part of a `kind_id` fullname.
#[must_use]
pub fn strip_kind(fullname: &str) -> Option<&str> {
    fullname.split_once('_').map(|(_, id)| id)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thing<T> {
    pub kind: String,
    pub data: T,
}

impl<T> Thing<T> {
    #[must_use]
    pub fn new(kind: &str, data: T) -> Self {
        Self {
            kind: kind.to_string(),
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing<T> {
    pub children: Vec<Thing<T>>,
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub before: Option<String>,
}

impl<T> Listing<T> {
    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        self.children.into_iter().map(|thing| thing.data).collect()
    }
}

/// Moderator and contributor lists are not things, just names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserList {
    pub children: Vec<RelatedUser>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedUser {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subreddit {
    pub display_name: String,
    pub title: String,
    pub subreddit_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub public_description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub name: String,
    pub title: String,
    pub is_self: bool,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub subreddit: Option<String>,
    #[serde(default)]
    pub num_comments: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub name: String,
    pub body: String,
    pub parent_id: String,
    pub link_id: String,
    #[serde(default)]
    pub author: Option<String>,
}

/// `api_type=json` responses wrap their payload twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub json: ApiJson<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiJson<T> {
    #[serde(default)]
    pub errors: Vec<serde_json::Value>,
    pub data: Option<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Things<T> {
    pub things: Vec<Thing<T>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submitted {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshTokenResponse {
    pub refresh_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fullnames_round_trip_through_strip() {
        let name = fullname(POST_KIND, "2a");
        assert_eq!(name, "t3_2a");
        assert_eq!(strip_kind(&name), Some("2a"));
        assert_eq!(strip_kind("plain"), None);
    }

    #[test]
    fn submit_envelope_decodes_without_data() {
        let raw = r#"{"json": {"errors": [["BAD_SR_NAME", "bad", "sr"]]}}"#;
        let envelope: ApiEnvelope<Submitted> = serde_json::from_str(raw).unwrap();
        assert_eq!(envelope.json.errors.len(), 1);
        assert!(envelope.json.data.is_none());
    }

    #[test]
    fn listing_ignores_unknown_fields() {
        let raw = r#"{"kind": "Listing", "data": {"modhash": "", "dist": 1, "after": null,
            "children": [{"kind": "t5", "data": {"display_name": "general", "title": "General",
            "subreddit_type": "public", "over18": false}}]}}"#;
        let listing: Thing<Listing<Subreddit>> = serde_json::from_str(raw).unwrap();
        let items = listing.data.into_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].display_name, "general");
    }
}

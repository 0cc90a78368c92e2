use hyper::StatusCode;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// An argument was rejected before any request went out.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("`{name}` was forbidden")]
    Forbidden { name: String },

    #[error("`{name}` was not found")]
    NotFound { name: String },

    #[error("`{name}` failed with status {status}")]
    Status { name: String, status: StatusCode },

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to decode `{name}`: {source}")]
    Decode {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("payload is missing `{0}`")]
    MissingField(&'static str),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

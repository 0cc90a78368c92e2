//! Load-testing scripts for MicroMasters, the rapid-response LMS flows and
//! Open Discussions.
//!
//! Every journey is written once against [`session::Session`]. The `loadtest`
//! binary runs them under goose; the `smoke` binary and the tests run them
//! sequentially through [`client::HttpClient`].

pub mod client;
pub mod discussions;
pub mod error;
pub mod harness;
pub mod profile;
pub mod scenario;
pub mod session;
pub mod settings;
pub mod statistics;

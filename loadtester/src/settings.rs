//! Settings for every scenario.
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults pointing at a local development stack
//! 2. The TOML file named by `LOADTEST_CONFIG`, or `./loadtest.toml` when present
//! 3. Environment variables, e.g. `LOADTEST_MICROMASTERS__PROGRAM_ID=3`
//!    or `LOADTEST_USERNAMES_IN_EDX=staff,honor`

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use platform_wire::edx::CourseData;
use serde::Deserialize;
use url::Url;

pub const CONFIG_PATH_ENV: &str = "LOADTEST_CONFIG";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Accounts that already exist on edX; every scenario draws from this pool.
    pub usernames_in_edx: Vec<String>,
    pub micromasters: MicromastersSettings,
    pub rapid_response: RapidResponseSettings,
    pub open_discussions: DiscussionSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MicromastersSettings {
    pub base_url: Url,
    pub edxorg_base_url: Url,
    pub program_id: u64,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RapidResponseSettings {
    pub lms_base_url: Url,
    pub password: String,
    #[serde(default)]
    pub course_data: Vec<CourseData>,
    pub task_min_wait_ms: u64,
    pub task_max_wait_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscussionSettings {
    pub base_url: Url,
    pub jwt_secret: String,
    pub api_username: String,
    pub reddit_url: Url,
    pub reddit_client_id: String,
    pub reddit_secret: String,
    pub reddit_access_token: String,
    pub channel_post_limit: u32,
    pub version: String,
    /// Users one virtual user creates before it only updates.
    pub user_limit: usize,
    #[serde(default)]
    pub channel_names: Vec<String>,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).ok();
        Self::load_from(path.as_deref())
    }

    pub fn load_from(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Self::set_defaults(Config::builder())?;
        builder = match path {
            Some(path) => builder.add_source(File::with_name(path)),
            None => builder.add_source(File::with_name("loadtest").required(false)),
        };
        builder = builder.add_source(
            Environment::with_prefix("LOADTEST")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("usernames_in_edx")
                .with_list_parse_key("open_discussions.channel_names")
                .try_parsing(true),
        );
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn set_defaults(
        builder: ConfigBuilder<DefaultState>,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        builder
            .set_default("usernames_in_edx", vec!["staff", "honor", "audit", "verified"])?
            .set_default("micromasters.base_url", "http://localhost:8079/")?
            .set_default("micromasters.edxorg_base_url", "http://localhost:8000/")?
            .set_default("micromasters.program_id", 1)?
            .set_default("micromasters.password", "test")?
            .set_default("rapid_response.lms_base_url", "http://localhost:8000/")?
            .set_default("rapid_response.password", "edx")?
            .set_default("rapid_response.task_min_wait_ms", 1000)?
            .set_default("rapid_response.task_max_wait_ms", 3000)?
            .set_default("open_discussions.base_url", "http://localhost:8063/")?
            .set_default("open_discussions.jwt_secret", "terribly_unsafe_default_jwt_secret_key")?
            .set_default("open_discussions.api_username", "mitodl")?
            .set_default("open_discussions.reddit_url", "http://localhost:8065/")?
            .set_default("open_discussions.reddit_client_id", "od_client_id")?
            .set_default("open_discussions.reddit_secret", "od_client_secret")?
            .set_default("open_discussions.reddit_access_token", "od_access_token")?
            .set_default("open_discussions.channel_post_limit", 25)?
            .set_default("open_discussions.version", env!("CARGO_PKG_VERSION"))?
            .set_default("open_discussions.user_limit", 100)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.usernames_in_edx.is_empty() {
            return Err(ConfigError::Message(
                "usernames_in_edx must name at least one account".to_string(),
            ));
        }
        let rapid = &self.rapid_response;
        if rapid.task_min_wait_ms > rapid.task_max_wait_ms {
            return Err(ConfigError::Message(
                "rapid_response.task_min_wait_ms must be <= task_max_wait_ms".to_string(),
            ));
        }
        for course in &rapid.course_data {
            if course.blocks.is_empty() {
                return Err(ConfigError::Message(format!(
                    "rapid_response course {} has no blocks",
                    course.course_id
                )));
            }
            if let Some(block) = course.blocks.iter().find(|b| b.answer_ids.is_empty()) {
                return Err(ConfigError::Message(format!(
                    "rapid_response block {} has no answer ids",
                    block.id
                )));
            }
        }
        if self.open_discussions.user_limit == 0 {
            return Err(ConfigError::Message(
                "open_discussions.user_limit must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform_wire::edx::ProblemBlock;

    fn defaults() -> Settings {
        Settings::set_defaults(Config::builder())
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn defaults_are_valid() {
        let settings = defaults();
        settings.validate().unwrap();
        assert_eq!(settings.micromasters.password, "test");
        assert_eq!(settings.rapid_response.password, "edx");
        assert_eq!(settings.open_discussions.user_limit, 100);
        assert_eq!(settings.open_discussions.channel_post_limit, 25);
        assert!(settings.rapid_response.course_data.is_empty());
    }

    #[test]
    fn rejects_inverted_wait_bounds() {
        let mut settings = defaults();
        settings.rapid_response.task_min_wait_ms = 5000;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn rejects_blocks_without_answers() {
        let mut settings = defaults();
        settings.rapid_response.course_data.push(CourseData {
            course_id: "course-v1:MITx+RR+1".to_string(),
            blocks: vec![ProblemBlock {
                id: "b1".to_string(),
                choicegroup_id: "c1".to_string(),
                answer_ids: Vec::new(),
            }],
        });
        let err = settings.validate().unwrap_err().to_string();
        assert!(err.contains("b1"), "{err}");
    }

    #[test]
    fn rejects_empty_username_pool() {
        let mut settings = defaults();
        settings.usernames_in_edx.clear();
        assert!(settings.validate().is_err());
    }
}

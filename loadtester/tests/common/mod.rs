#![allow(dead_code)]

use loadtester::client::HttpClient;
use loadtester::settings::{DiscussionSettings, MicromastersSettings, RapidResponseSettings, Settings};
use mock_platforms::{MockConfig, MockPlatforms};
use platform_wire::edx::{CourseData, ProblemBlock};
use url::Url;

pub const COURSE_ID: &str = "course-v1:MITx+RR+1";

/// Starts the mock platforms on an ephemeral port.
pub async fn start() -> (MockPlatforms, Url) {
    start_with(MockConfig::default()).await
}

pub async fn start_with(config: MockConfig) -> (MockPlatforms, Url) {
    let mock = MockPlatforms::new(config);
    let addr = mock_platforms::spawn("127.0.0.1:0", mock.clone())
        .await
        .unwrap();
    let base = Url::parse(&format!("http://{addr}/")).unwrap();
    (mock, base)
}

pub fn course() -> CourseData {
    CourseData {
        course_id: COURSE_ID.to_string(),
        blocks: vec![ProblemBlock {
            id: "block-v1:MITx+RR+1+type@problem+block@q1".to_string(),
            choicegroup_id: "q1_2_1".to_string(),
            answer_ids: vec!["choice_0".to_string(), "choice_1".to_string()],
        }],
    }
}

/// Every platform pointed at the one mock server.
pub fn settings(base: &Url) -> Settings {
    let config = MockConfig::default();
    Settings {
        usernames_in_edx: vec!["staff".to_string()],
        micromasters: MicromastersSettings {
            base_url: base.clone(),
            edxorg_base_url: base.clone(),
            program_id: 1,
            password: "test".to_string(),
        },
        rapid_response: RapidResponseSettings {
            lms_base_url: base.clone(),
            password: "edx".to_string(),
            course_data: vec![course()],
            task_min_wait_ms: 0,
            task_max_wait_ms: 0,
        },
        open_discussions: DiscussionSettings {
            base_url: base.clone(),
            jwt_secret: config.jwt_secret,
            api_username: "mitodl".to_string(),
            reddit_url: base.clone(),
            reddit_client_id: config.reddit_client_id,
            reddit_secret: config.reddit_secret,
            reddit_access_token: config.reddit_access_token,
            channel_post_limit: 25,
            version: "0.1.0".to_string(),
            user_limit: 2,
            channel_names: vec!["load_test".to_string()],
        },
    }
}

pub fn client(base: &Url) -> HttpClient {
    HttpClient::new(base.clone())
}

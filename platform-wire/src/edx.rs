//! edX LMS login, enrollment and problem-check payloads.

use serde::{Deserialize, Serialize};

pub const LOGIN_PAGE_PATH: &str = "/login";
pub const LOGIN_SESSION_PATH: &str = "/user_api/v1/account/login_session/";
pub const LOGOUT_PATH: &str = "/logout";
pub const CHANGE_ENROLLMENT_PATH: &str = "/change_enrollment";

/// Set to `true` by the LMS once a session is authenticated.
pub const LOGGED_IN_COOKIE: &str = "edxloggedin";

const ACCOUNT_DOMAIN: &str = "@example.com";

/// Test accounts all live under this mail domain.
#[must_use]
pub fn account_email(username: &str) -> String {
    format!("{username}{ACCOUNT_DOMAIN}")
}

#[must_use]
pub fn account_username(email: &str) -> Option<&str> {
    email.strip_suffix(ACCOUNT_DOMAIN)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub remember: String,
}

impl LoginForm {
    #[must_use]
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            email: account_email(username),
            password: password.to_string(),
            remember: "false".to_string(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentAction {
    Enroll,
    Unenroll,
}

impl EnrollmentAction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Enroll => "enroll",
            Self::Unenroll => "unenroll",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentForm {
    pub course_id: String,
    pub enrollment_action: EnrollmentAction,
}

/// A course with the multiple-choice problems the rapid response flow answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseData {
    pub course_id: String,
    pub blocks: Vec<ProblemBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemBlock {
    pub id: String,
    pub choicegroup_id: String,
    pub answer_ids: Vec<String>,
}

#[must_use]
pub fn problem_check_path(course_id: &str, block_id: &str) -> String {
    format!("/courses/{course_id}/xblock/{block_id}/handler/xmodule_handler/problem_check")
}

/// Form field that carries the chosen answer of a choice group.
#[must_use]
pub fn answer_field(choicegroup_id: &str) -> String {
    format!("input_{choicegroup_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn problem_check_path_embeds_ids() {
        assert_eq!(
            problem_check_path("course-v1:MITx+1+2", "block-v1:abc"),
            "/courses/course-v1:MITx+1+2/xblock/block-v1:abc/handler/xmodule_handler/problem_check"
        );
        assert_eq!(answer_field("q1_2_1"), "input_q1_2_1");
    }

    #[test]
    fn enrollment_action_serializes_lowercase() {
        let form = EnrollmentForm {
            course_id: "c".to_string(),
            enrollment_action: EnrollmentAction::Unenroll,
        };
        let value = serde_json::to_value(form).unwrap();
        assert_eq!(value["enrollment_action"], "unenroll");
    }

    #[test]
    fn account_email_maps_back_to_username() {
        let email = account_email("staff");
        assert_eq!(account_username(&email), Some("staff"));
        assert_eq!(account_username("staff@mit.edu"), None);
    }
}

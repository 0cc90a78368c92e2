//! MicroMasters profile and enrollment payloads.
//!
//! The profile itself travels as a free-form JSON object since the flow only
//! rewrites a handful of its keys; the entries it appends are typed.

use serde::{Deserialize, Serialize};

pub const EDX_LOGIN_PATH: &str = "/login/edxorg/";
pub const PROFILE_PAGE_PATH: &str = "/profile/";
pub const DASHBOARD_PATH: &str = "/api/v0/dashboard/";
pub const COURSE_PRICES_PATH: &str = "/api/v0/course_prices/";
pub const ENROLLED_PROGRAMS_PATH: &str = "/api/v0/enrolledprograms/";

#[must_use]
pub fn profile_path(username: &str) -> String {
    format!("/api/v0/profiles/{username}/")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollProgramRequest {
    pub program_id: u64,
}

/// Month picker state the profile form posts next to a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateEdit {
    pub year: String,
    pub month: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EducationEntry {
    pub degree_name: String,
    pub graduation_date: String,
    pub field_of_study: Option<String>,
    pub online_degree: bool,
    pub school_name: String,
    pub school_city: String,
    pub school_state_or_territory: String,
    pub school_country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graduation_date_edit: Option<DateEdit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkHistoryEntry {
    pub position: String,
    pub industry: String,
    pub company_name: String,
    pub start_date: String,
    pub end_date: Option<String>,
    pub city: String,
    pub country: String,
    pub state_or_territory: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date_edit: Option<DateEdit>,
}

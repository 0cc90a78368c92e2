//! The MicroMasters profile as the first-login flow rewrites it.
//!
//! Every run starts by resetting the profile it fetched so the next run
//! walks through the same tabs again.

use platform_wire::micromasters::{DateEdit, EducationEntry, WorkHistoryEntry};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

const AGREED_TO_TERMS: &str = "agreed_to_terms_of_service";
const FILLED_OUT: &str = "filled_out";

#[derive(Debug, Clone, Serialize)]
pub struct ProfileDraft {
    #[serde(flatten)]
    fields: Map<String, Value>,
    education: Vec<EducationEntry>,
    work_history: Vec<WorkHistoryEntry>,
    #[serde(skip)]
    was_filled_out: bool,
}

impl ProfileDraft {
    /// Clears education and work history, flips the terms flag and drops the
    /// read-only keys the profile API refuses on PATCH.
    pub fn reset(mut fields: Map<String, Value>) -> Result<Self> {
        fields.remove("education");
        fields.remove("work_history");

        let agreed = fields
            .get(AGREED_TO_TERMS)
            .ok_or(Error::MissingField(AGREED_TO_TERMS))?;
        if agreed == &Value::Bool(true) {
            fields.remove(AGREED_TO_TERMS);
        } else {
            fields.insert(AGREED_TO_TERMS.to_string(), Value::Bool(true));
        }

        let filled_out = fields
            .remove(FILLED_OUT)
            .ok_or(Error::MissingField(FILLED_OUT))?;
        fields
            .remove("email_optin")
            .ok_or(Error::MissingField("email_optin"))?;
        fields.remove("image").ok_or(Error::MissingField("image"))?;

        Ok(Self {
            fields,
            education: Vec::new(),
            work_history: Vec::new(),
            was_filled_out: filled_out == Value::Bool(true),
        })
    }

    pub fn fill_personal_info(&mut self, username: &str) {
        let personal = [
            ("birth_country", "IT".to_string()),
            ("city", "Los Angeles".to_string()),
            ("country", "US".to_string()),
            ("date_of_birth", "2000-01-12".to_string()),
            ("first_name", username.to_string()),
            ("gender", "f".to_string()),
            ("last_name", "Example".to_string()),
            ("nationality", "IT".to_string()),
            ("preferred_language", "en".to_string()),
            ("preferred_name", format!("{username} Preferred")),
            ("state_or_territory", "US-CA".to_string()),
        ];
        for (key, value) in personal {
            self.fields.insert(key.to_string(), Value::String(value));
        }
    }

    pub fn add_education(&mut self, entry: EducationEntry) {
        self.education.push(entry);
    }

    pub fn add_work_history(&mut self, entry: WorkHistoryEntry) {
        self.work_history.push(entry);
    }

    /// Whether the fetched profile was already complete before the reset.
    #[must_use]
    pub fn was_filled_out(&self) -> bool {
        self.was_filled_out
    }

    pub fn mark_filled_out(&mut self) {
        self.fields.insert(FILLED_OUT.to_string(), Value::Bool(true));
    }

    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

#[must_use]
pub fn high_school() -> EducationEntry {
    EducationEntry {
        degree_name: "hs".to_string(),
        graduation_date: "1998-02-01".to_string(),
        field_of_study: None,
        online_degree: false,
        school_name: "School User".to_string(),
        school_city: "Lexington".to_string(),
        school_state_or_territory: "US-MA".to_string(),
        school_country: "US".to_string(),
        graduation_date_edit: None,
    }
}

#[must_use]
pub fn college() -> EducationEntry {
    EducationEntry {
        degree_name: "m".to_string(),
        graduation_date: "2008-12-01".to_string(),
        field_of_study: Some("14.0903".to_string()),
        online_degree: false,
        school_name: "University of Here".to_string(),
        school_city: "Bologna".to_string(),
        school_state_or_territory: "IT-BO".to_string(),
        school_country: "IT".to_string(),
        graduation_date_edit: Some(DateEdit {
            year: "2008".to_string(),
            month: "12".to_string(),
        }),
    }
}

#[must_use]
pub fn software_engineer() -> WorkHistoryEntry {
    WorkHistoryEntry {
        position: "Senior Software Engineer".to_string(),
        industry: "Computer Software".to_string(),
        company_name: "MIT".to_string(),
        start_date: "2000-01-01".to_string(),
        end_date: None,
        city: "Cambridge".to_string(),
        country: "US".to_string(),
        state_or_territory: "US-MA".to_string(),
        start_date_edit: Some(DateEdit {
            year: "2000".to_string(),
            month: "1".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fetched(agreed: bool, filled_out: bool) -> Map<String, Value> {
        let value = json!({
            "username": "staff",
            "first_name": "Old",
            "agreed_to_terms_of_service": agreed,
            "filled_out": filled_out,
            "email_optin": true,
            "image": "http://example.com/image.png",
            "education": [{"degree_name": "p"}],
            "work_history": [{"position": "old"}],
        });
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn reset_drops_terms_when_already_agreed() {
        let draft = ProfileDraft::reset(fetched(true, false)).unwrap();
        let payload = serde_json::to_value(&draft).unwrap();
        assert!(payload.get("agreed_to_terms_of_service").is_none());
        assert!(payload.get("filled_out").is_none());
        assert!(payload.get("email_optin").is_none());
        assert!(payload.get("image").is_none());
        assert_eq!(payload["education"], json!([]));
        assert_eq!(payload["work_history"], json!([]));
        assert!(!draft.was_filled_out());
    }

    #[test]
    fn reset_agrees_to_terms_when_not_yet_agreed() {
        let draft = ProfileDraft::reset(fetched(false, true)).unwrap();
        assert_eq!(draft.field("agreed_to_terms_of_service"), Some(&Value::Bool(true)));
        assert!(draft.was_filled_out());
    }

    #[test]
    fn reset_requires_read_only_keys() {
        let mut profile = fetched(true, true);
        profile.remove("image");
        assert!(matches!(
            ProfileDraft::reset(profile),
            Err(Error::MissingField("image"))
        ));
        let mut profile = fetched(true, true);
        profile.remove("filled_out");
        assert!(matches!(
            ProfileDraft::reset(profile),
            Err(Error::MissingField("filled_out"))
        ));
    }

    #[test]
    fn personal_info_uses_username() {
        let mut draft = ProfileDraft::reset(fetched(true, false)).unwrap();
        draft.fill_personal_info("verified");
        assert_eq!(draft.field("first_name"), Some(&json!("verified")));
        assert_eq!(draft.field("preferred_name"), Some(&json!("verified Preferred")));
        assert_eq!(draft.field("state_or_territory"), Some(&json!("US-CA")));
    }

    #[test]
    fn entries_serialize_like_the_profile_form() {
        let mut draft = ProfileDraft::reset(fetched(true, false)).unwrap();
        draft.add_education(high_school());
        draft.add_education(college());
        draft.add_work_history(software_engineer());
        draft.mark_filled_out();
        let payload = serde_json::to_value(&draft).unwrap();

        let education = payload["education"].as_array().unwrap();
        assert_eq!(education.len(), 2);
        assert_eq!(education[0]["field_of_study"], Value::Null);
        assert!(education[0].get("graduation_date_edit").is_none());
        assert_eq!(education[1]["graduation_date_edit"], json!({"year": "2008", "month": "12"}));
        assert_eq!(payload["work_history"][0]["end_date"], Value::Null);
        assert_eq!(payload["filled_out"], json!(true));
    }
}

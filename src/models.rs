use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, TrackerError};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    #[default]
    Applied,
    Interviewing,
    Offered,
    Rejected,
    Accepted,
}

impl Status {
    pub const ALL: [Status; 5] = [
        Status::Applied,
        Status::Interviewing,
        Status::Offered,
        Status::Rejected,
        Status::Accepted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Applied => "APPLIED",
            Status::Interviewing => "INTERVIEWING",
            Status::Offered => "OFFERED",
            Status::Rejected => "REJECTED",
            Status::Accepted => "ACCEPTED",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

fn default_source() -> String {
    "OTHER".to_string()
}

/// Everything about an application except its id. This is the payload for
/// create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationDraft {
    pub company: String,
    pub position: String,
    pub location: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary: Option<String>,
    pub applied_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_steps: Option<String>,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_url: Option<String>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub favorite: bool,
}

impl ApplicationDraft {
    /// A blank draft with the same defaults the add form starts from.
    pub fn new(applied_date: NaiveDate) -> Self {
        Self {
            company: String::new(),
            position: String::new(),
            location: String::new(),
            status: Status::default(),
            source: default_source(),
            job_url: None,
            salary: None,
            applied_date,
            last_contact: None,
            next_steps: None,
            notes: String::new(),
            company_url: None,
            contacts: Vec::new(),
            favorite: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("company", &self.company),
            ("position", &self.position),
            ("location", &self.location),
        ] {
            if value.trim().is_empty() {
                return Err(TrackerError::Validation(format!("{field} is required")));
            }
        }
        if let Some(i) = self.contacts.iter().position(|c| c.name.trim().is_empty()) {
            return Err(TrackerError::Validation(format!(
                "contact #{} needs a name",
                i + 1
            )));
        }
        Ok(())
    }

    pub fn matches(&self, needle_lower: &str) -> bool {
        self.company.to_lowercase().contains(needle_lower)
            || self.position.to_lowercase().contains(needle_lower)
            || self.location.to_lowercase().contains(needle_lower)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: String,
    #[serde(flatten)]
    pub details: ApplicationDraft,
}

impl Application {
    pub fn new(id: String, details: ApplicationDraft) -> Self {
        Self { id, details }
    }
}

/// One Sunday-to-Saturday week of the weekly report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekBucket<'a> {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub applications: Vec<&'a Application>,
}

/// Display label for the built-in source tags. User-added tags show as-is.
pub fn source_label(source: &str) -> &str {
    match source {
        "LINKEDIN" => "LinkedIn",
        "INDEED" => "Indeed",
        "COMPANY_WEBSITE" => "Company Website",
        "REFERRAL" => "Referral",
        "OTHER" => "Other",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn serializes_with_camel_case_and_iso_dates() {
        let mut draft = ApplicationDraft::new(date("2024-01-10"));
        draft.company = "Acme".into();
        draft.position = "Engineer".into();
        draft.location = "Remote".into();
        draft.job_url = Some("https://acme.example/jobs/1".into());
        let app = Application::new("abc".into(), draft);

        let value = serde_json::to_value(&app).unwrap();
        assert_eq!(value["id"], "abc");
        assert_eq!(value["appliedDate"], "2024-01-10");
        assert_eq!(value["jobUrl"], "https://acme.example/jobs/1");
        assert_eq!(value["status"], "APPLIED");
        assert_eq!(value["source"], "OTHER");
        assert_eq!(value["contacts"], serde_json::json!([]));
        assert_eq!(value["favorite"], false);
        assert!(value.get("salary").is_none());
    }

    #[test]
    fn validate_rejects_blank_required_fields() {
        let mut draft = ApplicationDraft::new(date("2024-01-10"));
        draft.company = "Acme".into();
        draft.position = "  ".into();
        draft.location = "Berlin".into();
        let err = draft.validate().unwrap_err();
        assert!(err.to_string().contains("position"));

        draft.position = "Engineer".into();
        assert!(draft.validate().is_ok());

        draft.contacts.push(Contact {
            name: String::new(),
            role: None,
            email: None,
            phone: None,
            notes: None,
        });
        assert!(matches!(draft.validate(), Err(TrackerError::Validation(_))));
    }

    #[test]
    fn source_labels() {
        assert_eq!(source_label("COMPANY_WEBSITE"), "Company Website");
        assert_eq!(source_label("Hacker News"), "Hacker News");
    }
}

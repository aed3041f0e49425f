use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Severity classification stored with each case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RiskLevel {
    High,
    Medium,
    Low,
    Other(String),
}

impl From<String> for RiskLevel {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" => Self::High,
            "medium" => Self::Medium,
            "low" => Self::Low,
            _ => Self::Other(value),
        }
    }
}

impl From<RiskLevel> for String {
    fn from(value: RiskLevel) -> Self {
        value.to_string()
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => f.write_str("High"),
            Self::Medium => f.write_str("Medium"),
            Self::Low => f.write_str("Low"),
            Self::Other(label) => f.write_str(label),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Case {
    #[schema(example = 7)]
    pub id: i32,
    #[schema(example = "Acme Dispute")]
    #[sqlx(rename = "issue_title")]
    pub title: String,
    #[schema(example = "Breach of supply contract")]
    pub summary: String,
    #[schema(value_type = String, example = "High")]
    #[sqlx(try_from = "String")]
    pub risk_level: RiskLevel,
}

/// One entry of the case's correspondence history.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Message {
    pub id: i32,
    pub case_id: i32,
    #[schema(example = "claims@acme.example")]
    pub sender: String,
    pub subject: String,
    pub body_text: Option<String>,
    #[schema(value_type = String, example = "2024-01-01T09:30:00")]
    pub date_sent: NaiveDateTime,
}

impl Message {
    /// `YYYY-MM-DD` part of the sent timestamp.
    pub fn sent_date(&self) -> String {
        self.date_sent.format("%Y-%m-%d").to_string()
    }

    pub fn body(&self) -> &str {
        self.body_text.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Attachment {
    pub id: i32,
    pub case_id: i32,
    #[schema(example = "invoice.pdf")]
    pub filename: String,
    /// `gs://bucket/path` locator; `None` when the file is not cloud-linked.
    #[schema(example = "gs://evidence/acme/invoice.pdf")]
    #[sqlx(rename = "gcs_path")]
    pub locator: Option<String>,
}

impl Attachment {
    pub fn is_cloud_linked(&self) -> bool {
        self.locator.as_deref().is_some_and(|l| !l.trim().is_empty())
    }
}

/// A case together with its evidence, as loaded for one request.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CaseFile {
    pub case: Case,
    /// Ascending by `date_sent`; ties keep store order.
    pub messages: Vec<Message>,
    /// Store listing order.
    pub attachments: Vec<Attachment>,
}

impl CaseFile {
    pub fn new(case: Case, mut messages: Vec<Message>, attachments: Vec<Attachment>) -> Self {
        messages.sort_by_key(|m| m.date_sent);
        Self {
            case,
            messages,
            attachments,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CaseSummary {
    pub id: i32,
    pub title: String,
    #[schema(value_type = String)]
    pub risk_level: RiskLevel,
}

impl From<&Case> for CaseSummary {
    fn from(case: &Case) -> Self {
        Self {
            id: case.id,
            title: case.title.clone(),
            risk_level: case.risk_level.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn message(id: i32, day: u32) -> Message {
        Message {
            id,
            case_id: 1,
            sender: format!("sender{id}"),
            subject: String::new(),
            body_text: None,
            date_sent: NaiveDate::from_ymd_opt(2024, 1, day)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn test_risk_level_parsing() {
        assert_eq!(RiskLevel::from("High".to_string()), RiskLevel::High);
        assert_eq!(RiskLevel::from(" medium ".to_string()), RiskLevel::Medium);
        assert_eq!(
            RiskLevel::from("Critical".to_string()),
            RiskLevel::Other("Critical".to_string())
        );
        assert_eq!(RiskLevel::Other("Critical".into()).to_string(), "Critical");
    }

    #[test]
    fn test_case_file_sorts_messages_stably() {
        let case = Case {
            id: 1,
            title: "t".into(),
            summary: "s".into(),
            risk_level: RiskLevel::High,
        };
        let file = CaseFile::new(
            case,
            vec![message(1, 3), message(2, 1), message(3, 3), message(4, 2)],
            Vec::new(),
        );
        let ids: Vec<i32> = file.messages.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![2, 4, 1, 3]);
    }

    #[test]
    fn test_sent_date_is_ten_chars() {
        assert_eq!(message(1, 2).sent_date(), "2024-01-02");
    }

    #[test]
    fn test_cloud_linked() {
        let mut attachment = Attachment {
            id: 1,
            case_id: 1,
            filename: "x.pdf".into(),
            locator: None,
        };
        assert!(!attachment.is_cloud_linked());
        attachment.locator = Some("  ".into());
        assert!(!attachment.is_cloud_linked());
        attachment.locator = Some("gs://b/x.pdf".into());
        assert!(attachment.is_cloud_linked());
    }
}

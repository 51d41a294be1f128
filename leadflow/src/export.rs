//! Lead export as delimited text.
//!
//! Every field is quoted unconditionally so free-text values containing the
//! delimiter can never shift column boundaries.

use crate::auth::UserWithFile;
use csv::{QuoteStyle, WriterBuilder};
use thiserror::Error;

/// Sentinel rendered when a registrant has no associated file
const NO_FILE: &str = "N/A";

/// Export errors
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV output was not valid UTF-8")]
    Encoding,
}

/// Render the registrant list as CSV with a fixed column order.
pub fn users_to_csv(users: &[UserWithFile]) -> Result<String, ExportError> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(Vec::new());

    writer.write_record([
        "Name",
        "Email",
        "WhatsApp Number",
        "Education Level",
        "Knowledge Level",
        "Source Platform",
        "Registered For File",
        "Registration Date & Time",
    ])?;

    for user in users {
        let account = &user.account;
        writer.write_record([
            account.name.as_str(),
            account.email.as_str(),
            account.whatsapp.as_deref().unwrap_or_default(),
            account.edu_level.map(|l| l.as_str()).unwrap_or_default(),
            account
                .knowledge_level
                .map(|l| l.as_str())
                .unwrap_or_default(),
            account.source_platform.as_str(),
            user.registered_file_topic.as_deref().unwrap_or(NO_FILE),
            account.created_at.to_rfc3339().as_str(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Csv(e.into_error().into()))?;
    String::from_utf8(bytes).map_err(|_| ExportError::Encoding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Account, EduLevel, KnowledgeLevel, Role};
    use chrono::Utc;

    fn sample_user(name: &str, topic: Option<&str>) -> UserWithFile {
        UserWithFile {
            account: Account {
                id: 1,
                name: name.to_string(),
                email: "lead@example.com".to_string(),
                whatsapp: Some("+8801700000000".to_string()),
                edu_level: Some(EduLevel::Honors),
                knowledge_level: Some(KnowledgeLevel::Beginner),
                role: Role::User,
                source_platform: "YouTube".to_string(),
                registered_for_file: topic.map(|_| 7),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            registered_file_topic: topic.map(str::to_string),
        }
    }

    #[test]
    fn test_header_row_and_column_order() {
        let csv = users_to_csv(&[]).unwrap();
        assert_eq!(
            csv.trim_end(),
            "\"Name\",\"Email\",\"WhatsApp Number\",\"Education Level\",\"Knowledge Level\",\
             \"Source Platform\",\"Registered For File\",\"Registration Date & Time\""
        );
    }

    #[test]
    fn test_comma_in_name_does_not_shift_columns() {
        let csv = users_to_csv(&[sample_user("Rahim, Md.", Some("Rust Notes"))]).unwrap();
        let data_row = csv.lines().nth(1).unwrap();
        assert!(data_row.starts_with("\"Rahim, Md.\",\"lead@example.com\""));
        // Quoted comma leaves the field count intact.
        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(record.len(), 8);
        assert_eq!(&record[0], "Rahim, Md.");
    }

    #[test]
    fn test_missing_file_renders_sentinel() {
        let csv = users_to_csv(&[sample_user("Karim", None)]).unwrap();
        let data_row = csv.lines().nth(1).unwrap();
        assert!(data_row.contains("\"N/A\""));
    }

    #[test]
    fn test_every_field_is_quoted() {
        let csv = users_to_csv(&[sample_user("Karim", Some("Notes"))]).unwrap();
        for line in csv.lines() {
            assert!(line.starts_with('"') && line.ends_with('"'));
        }
    }
}

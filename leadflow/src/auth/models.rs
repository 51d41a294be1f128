//! Authentication data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account ID type
pub type AccountId = i64;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Parse a stored role label. Unknown labels fall back to `User` so a
    /// corrupt row can never grant admin access.
    pub fn parse(label: &str) -> Role {
        match label {
            "admin" => Role::Admin,
            _ => Role::User,
        }
    }
}

/// Education-level tag chosen at registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EduLevel {
    #[serde(rename = "SSC/HSC Level")]
    SscHsc,
    #[serde(rename = "Honors Level")]
    Honors,
    #[serde(rename = "Diploma/Polytechnic")]
    Diploma,
    #[serde(rename = "Madrasha Level")]
    Madrasha,
    #[serde(rename = "Others")]
    Others,
}

impl EduLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EduLevel::SscHsc => "SSC/HSC Level",
            EduLevel::Honors => "Honors Level",
            EduLevel::Diploma => "Diploma/Polytechnic",
            EduLevel::Madrasha => "Madrasha Level",
            EduLevel::Others => "Others",
        }
    }

    pub fn from_label(label: &str) -> Option<EduLevel> {
        match label {
            "SSC/HSC Level" => Some(EduLevel::SscHsc),
            "Honors Level" => Some(EduLevel::Honors),
            "Diploma/Polytechnic" => Some(EduLevel::Diploma),
            "Madrasha Level" => Some(EduLevel::Madrasha),
            "Others" => Some(EduLevel::Others),
            _ => None,
        }
    }
}

/// Proficiency-level tag chosen at registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KnowledgeLevel {
    #[serde(rename = "Noob")]
    Noob,
    #[serde(rename = "Beginner")]
    Beginner,
    #[serde(rename = "Mid Level")]
    MidLevel,
    #[serde(rename = "Expert Level")]
    ExpertLevel,
    #[serde(rename = "Job Holder")]
    JobHolder,
}

impl KnowledgeLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            KnowledgeLevel::Noob => "Noob",
            KnowledgeLevel::Beginner => "Beginner",
            KnowledgeLevel::MidLevel => "Mid Level",
            KnowledgeLevel::ExpertLevel => "Expert Level",
            KnowledgeLevel::JobHolder => "Job Holder",
        }
    }

    pub fn from_label(label: &str) -> Option<KnowledgeLevel> {
        match label {
            "Noob" => Some(KnowledgeLevel::Noob),
            "Beginner" => Some(KnowledgeLevel::Beginner),
            "Mid Level" => Some(KnowledgeLevel::MidLevel),
            "Expert Level" => Some(KnowledgeLevel::ExpertLevel),
            "Job Holder" => Some(KnowledgeLevel::JobHolder),
            _ => None,
        }
    }
}

/// Account model. The password hash is deliberately not part of this struct
/// so it can never leak through serialization.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub whatsapp: Option<String>,
    pub edu_level: Option<EduLevel>,
    pub knowledge_level: Option<KnowledgeLevel>,
    pub role: Role,
    pub source_platform: String,
    pub registered_for_file: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A `user`-role account expanded with the topic of the file it registered
/// for, resolved by an explicit join in the store.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserWithFile {
    #[serde(flatten)]
    pub account: Account,
    pub registered_file_topic: Option<String>,
}

/// Visitor registration request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub whatsapp: String,
    pub password: String,
    #[serde(default)]
    pub edu_level: Option<EduLevel>,
    #[serde(default)]
    pub knowledge_level: Option<KnowledgeLevel>,
    /// Marketing channel label carried through the registration redirect.
    #[serde(default)]
    pub source_platform: Option<String>,
    /// File the visitor is registering to obtain.
    #[serde(default)]
    pub file_id: Option<i64>,
}

/// JWT claims for a bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthClaims {
    /// Account ID
    pub sub: AccountId,
    pub role: Role,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued at timestamp
    pub iat: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_unknown_is_user() {
        assert_eq!(Role::parse("admin"), Role::Admin);
        assert_eq!(Role::parse("user"), Role::User);
        assert_eq!(Role::parse("superuser"), Role::User);
    }

    #[test]
    fn test_edu_level_labels_round_trip() {
        for level in [
            EduLevel::SscHsc,
            EduLevel::Honors,
            EduLevel::Diploma,
            EduLevel::Madrasha,
            EduLevel::Others,
        ] {
            assert_eq!(EduLevel::from_label(level.as_str()), Some(level));
        }
        assert_eq!(EduLevel::from_label("PhD"), None);
    }

    #[test]
    fn test_knowledge_level_serde_uses_display_labels() {
        let json = serde_json::to_string(&KnowledgeLevel::MidLevel).unwrap();
        assert_eq!(json, "\"Mid Level\"");
        let parsed: KnowledgeLevel = serde_json::from_str("\"Job Holder\"").unwrap();
        assert_eq!(parsed, KnowledgeLevel::JobHolder);
    }

    #[test]
    fn test_register_request_accepts_camel_case_payload() {
        let request: RegisterRequest = serde_json::from_str(
            r#"{
                "name": "Rahim",
                "email": "rahim@example.com",
                "whatsapp": "+8801700000000",
                "password": "secret1",
                "eduLevel": "Honors Level",
                "knowledgeLevel": "Beginner",
                "sourcePlatform": "YouTube",
                "fileId": 7
            }"#,
        )
        .unwrap();
        assert_eq!(request.edu_level, Some(EduLevel::Honors));
        assert_eq!(request.source_platform.as_deref(), Some("YouTube"));
        assert_eq!(request.file_id, Some(7));
    }
}

//! crates/memory_wall_core/src/domain.rs
//!
//! Defines the pure, core data structures for the memory wall.
//! Records travel through the document store as schemaless JSON fields; the
//! conversions between those fields and the typed structs live here.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::ports::{PortError, PortResult};

/// Name shown for thoughts whose author never set a first name.
pub const ANONYMOUS: &str = "Anonymous";

/// Collection holding one profile per identity, keyed by the identity's user id.
pub const USERS: &str = "users";

/// Append-only collection of submitted thoughts.
pub const THOUGHTS: &str = "thoughts";

/// The field map of a single schemaless document.
pub type Fields = Map<String, Value>;

/// A document as returned by the store: its store-assigned id plus its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub fields: Fields,
}

/// A signed-in principal as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub email: String,
    pub email_verified: bool,
    /// First name captured at registration, if any.
    pub first_name: Option<String>,
}

/// A comment attached to a thought. Read-only from this application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
}

fn anonymous() -> String {
    ANONYMOUS.to_string()
}

/// Wire shape of a thought document's fields.
#[derive(Deserialize)]
struct ThoughtFields {
    #[serde(default = "anonymous")]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(rename = "userId", default)]
    user_id: String,
    thought: String,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    allowcomments: bool,
    #[serde(default)]
    comments: BTreeMap<String, Comment>,
}

/// A thought read back from the store. Never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Thought {
    pub id: String,
    pub name: String,
    pub email: String,
    pub user_id: String,
    pub thought: String,
    pub timestamp: DateTime<Utc>,
    pub allow_comments: bool,
    pub comments: BTreeMap<String, Comment>,
}

impl Thought {
    /// Decodes a `thoughts` document. An empty stored name falls back to [`ANONYMOUS`].
    pub fn from_document(doc: StoredDocument) -> PortResult<Self> {
        let fields: ThoughtFields = serde_json::from_value(Value::Object(doc.fields))
            .map_err(|e| PortError::Unexpected(format!("Malformed thought {}: {}", doc.id, e)))?;

        let name = if fields.name.trim().is_empty() {
            anonymous()
        } else {
            fields.name
        };

        Ok(Self {
            id: doc.id,
            name,
            email: fields.email,
            user_id: fields.user_id,
            thought: fields.thought,
            timestamp: fields.timestamp,
            allow_comments: fields.allowcomments,
            comments: fields.comments,
        })
    }
}

/// The payload written once per successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewThought {
    pub name: String,
    pub email: String,
    pub user_id: String,
    pub thought: String,
    pub timestamp: DateTime<Utc>,
}

impl NewThought {
    pub fn into_fields(self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("name".to_string(), Value::String(self.name));
        fields.insert("email".to_string(), Value::String(self.email));
        fields.insert("userId".to_string(), Value::String(self.user_id));
        fields.insert("thought".to_string(), Value::String(self.thought));
        fields.insert(
            "timestamp".to_string(),
            Value::String(self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        fields
    }
}

/// Profile stored under `users/<user_id>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "firstName", default)]
    pub first_name: String,
    #[serde(default)]
    pub email: String,
}

impl UserProfile {
    pub fn from_fields(fields: Fields) -> PortResult<Self> {
        serde_json::from_value(Value::Object(fields))
            .map_err(|e| PortError::Unexpected(format!("Malformed user profile: {}", e)))
    }

    pub fn into_fields(self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("firstName".to_string(), Value::String(self.first_name));
        fields.insert("email".to_string(), Value::String(self.email));
        fields
    }

    /// The name used to sign thoughts: the first name, or [`ANONYMOUS`] when blank.
    pub fn display_name(&self) -> &str {
        let trimmed = self.first_name.trim();
        if trimmed.is_empty() {
            ANONYMOUS
        } else {
            trimmed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn doc(id: &str, value: Value) -> StoredDocument {
        match value {
            Value::Object(fields) => StoredDocument {
                id: id.to_string(),
                fields,
            },
            _ => panic!("test documents must be objects"),
        }
    }

    #[test]
    fn new_thought_fields_use_store_field_names() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap();
        let fields = NewThought {
            name: "Alice".into(),
            email: "alice.2125cs001@kiet.edu".into(),
            user_id: "uid-1".into(),
            thought: "Best four years ever".into(),
            timestamp: ts,
        }
        .into_fields();

        assert_eq!(fields["name"], json!("Alice"));
        assert_eq!(fields["userId"], json!("uid-1"));
        assert_eq!(fields["thought"], json!("Best four years ever"));
        assert!(fields.contains_key("timestamp"));
        assert!(!fields.contains_key("comments"));
        assert!(!fields.contains_key("allowcomments"));
    }

    #[test]
    fn thought_without_name_reads_as_anonymous() {
        let thought = Thought::from_document(doc(
            "t1",
            json!({"thought": "hello", "timestamp": "2025-01-10T12:00:00Z"}),
        ))
        .unwrap();
        assert_eq!(thought.name, ANONYMOUS);
        assert!(!thought.allow_comments);
        assert!(thought.comments.is_empty());
    }

    #[test]
    fn thought_with_comments_decodes_them() {
        let thought = Thought::from_document(doc(
            "t2",
            json!({
                "name": "Bob",
                "thought": "see you",
                "timestamp": "2025-01-10T12:00:00Z",
                "allowcomments": true,
                "comments": {"c1": {"text": "same!"}}
            }),
        ))
        .unwrap();
        assert!(thought.allow_comments);
        assert_eq!(thought.comments["c1"].text, "same!");
    }

    #[test]
    fn thought_missing_body_is_rejected() {
        let err = Thought::from_document(doc("t3", json!({"name": "x"}))).unwrap_err();
        assert!(matches!(err, PortError::Unexpected(_)));
    }

    #[test]
    fn blank_first_name_displays_anonymous() {
        let profile = UserProfile {
            first_name: "  ".into(),
            email: "a@b.c".into(),
        };
        assert_eq!(profile.display_name(), ANONYMOUS);

        let round = UserProfile::from_fields(
            UserProfile {
                first_name: "Alice".into(),
                email: "a@b.c".into(),
            }
            .into_fields(),
        )
        .unwrap();
        assert_eq!(round.display_name(), "Alice");
    }
}

//! Data models for quizsync
//!
//! Defines the question bank records (Question, LogEntry), the cache's
//! view of a question (CachedQuestion), and the other dashboard record
//! kinds that share the same contract shape.
//!
//! All records serialize with camelCase keys to match the remote documents.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::{record_from, record_into, ConvertError, Record, ID_FIELD};

/// Current time as epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Question difficulty
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Wire names, in declaration order
    pub const NAMES: &'static [&'static str] = &["easy", "medium", "hard"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!(
                "unknown difficulty '{}' (expected one of: {})",
                other,
                Self::NAMES.join(", ")
            )),
        }
    }
}

/// A question from the remote question bank
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Store-assigned document key
    pub id: String,
    /// Classification: subject
    pub subject: String,
    /// Classification: topic within the subject
    pub topic: String,
    pub difficulty: Difficulty,
    /// Question body
    pub content: String,
    /// Ordered answer options (multiple choice only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    /// Canonical answer
    pub answer: String,
    pub explanation: String,
    /// Authoring user
    pub author_id: String,
    /// Epoch milliseconds
    pub created_at: i64,
    /// Epoch milliseconds
    pub updated_at: i64,
    /// Incremented on every edit
    pub version: u64,
}

impl Question {
    /// Create a question with the given identity and classification
    ///
    /// Questions are normally authored remotely; this is for tools and tests.
    pub fn new(
        id: impl Into<String>,
        subject: impl Into<String>,
        topic: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let now = now_millis();
        Self {
            id: id.into(),
            subject: subject.into(),
            topic: topic.into(),
            difficulty: Difficulty::Medium,
            content: content.into(),
            options: None,
            answer: String::new(),
            explanation: String::new(),
            author_id: String::new(),
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    /// Update the question body
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.touch();
    }

    /// Update the canonical answer
    pub fn set_answer(&mut self, answer: impl Into<String>) {
        self.answer = answer.into();
        self.touch();
    }

    /// Update the explanation
    pub fn set_explanation(&mut self, explanation: impl Into<String>) {
        self.explanation = explanation.into();
        self.touch();
    }

    /// Replace the answer options
    pub fn set_options(&mut self, options: Option<Vec<String>>) {
        self.options = options;
        self.touch();
    }

    /// Change the difficulty
    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.difficulty = difficulty;
        self.touch();
    }

    // updated_at never moves backwards, even with clock skew
    fn touch(&mut self) {
        self.version += 1;
        self.updated_at = now_millis().max(self.updated_at);
    }
}

/// Keys of a log entry that are not free-form attributes
pub const RESERVED_LOG_FIELDS: &[&str] = &["seq", "questionId", "timestamp", "eventType"];

/// A log entry as handed to the cache (no sequence number yet)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewLogEntry {
    /// Weak reference to a question
    pub question_id: String,
    /// Epoch milliseconds
    pub timestamp: i64,
    /// Free-form tag, e.g. "viewed" or "answered"
    pub event_type: String,
    /// Additional attributes
    #[serde(flatten)]
    pub attributes: Record,
}

impl NewLogEntry {
    /// Create an entry stamped with the current time
    pub fn new(question_id: impl Into<String>, event_type: impl Into<String>) -> Self {
        Self {
            question_id: question_id.into(),
            timestamp: now_millis(),
            event_type: event_type.into(),
            attributes: Record::new(),
        }
    }

    /// Add an attribute; reserved keys are ignored
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if !RESERVED_LOG_FIELDS.contains(&key.as_str()) {
            self.attributes.insert(key, value.into());
        }
        self
    }
}

/// A stored, immutable log entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Assigned by the cache, monotonic, never reused
    pub seq: i64,
    pub question_id: String,
    pub timestamp: i64,
    pub event_type: String,
    #[serde(flatten)]
    pub attributes: Record,
}

/// A question as held by the local cache
///
/// The raw record is kept even when it failed validation; `validated`
/// records whether it conformed to the question contract when admitted.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedQuestion {
    pub record: Record,
    pub validated: bool,
}

impl CachedQuestion {
    /// Wrap a typed question (always validated)
    pub fn from_question(question: &Question) -> Result<Self, ConvertError> {
        Ok(Self {
            record: record_from(question)?,
            validated: true,
        })
    }

    /// Wrap a raw record that did not pass validation
    pub fn unvalidated(record: Record) -> Self {
        Self {
            record,
            validated: false,
        }
    }

    /// The record identity, if present and non-empty
    pub fn id(&self) -> Option<&str> {
        self.str_field(ID_FIELD).filter(|id| !id.is_empty())
    }

    pub fn subject(&self) -> Option<&str> {
        self.str_field("subject")
    }

    pub fn topic(&self) -> Option<&str> {
        self.str_field("topic")
    }

    pub fn difficulty(&self) -> Option<&str> {
        self.str_field("difficulty")
    }

    /// Typed view; `None` for unvalidated records or if decoding fails
    pub fn question(&self) -> Option<Question> {
        if !self.validated {
            return None;
        }
        record_into(&self.record).ok()
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.record.get(key).and_then(Value::as_str)
    }
}

/// Dashboard user role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
    Admin,
}

impl Role {
    pub const NAMES: &'static [&'static str] = &["student", "teacher", "admin"];
}

/// A dashboard user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub role: Role,
    pub created_at: i64,
}

/// A set of questions taken together
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub id: String,
    pub title: String,
    pub subject: String,
    pub question_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    pub created_at: i64,
}

/// A user's progress on one question
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub id: String,
    pub user_id: String,
    pub question_id: String,
    pub correct: bool,
    pub attempts: u32,
    pub last_attempt_at: i64,
}

/// Questions assigned to a user for one day
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyMission {
    pub id: String,
    pub user_id: String,
    /// Calendar date, YYYY-MM-DD
    pub date: String,
    pub question_ids: Vec<String>,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward_points: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_question_new() {
        let q = Question::new("q1", "math", "fractions", "What is 1/2 + 1/4?");
        assert_eq!(q.id, "q1");
        assert_eq!(q.difficulty, Difficulty::Medium);
        assert_eq!(q.version, 1);
        assert!(q.options.is_none());
        assert_eq!(q.created_at, q.updated_at);
    }

    #[test]
    fn test_question_edit_bumps_version() {
        let mut q = Question::new("q1", "math", "fractions", "old");
        let before = q.updated_at;

        q.set_content("new");
        assert_eq!(q.content, "new");
        assert_eq!(q.version, 2);
        assert!(q.updated_at >= before);

        q.set_difficulty(Difficulty::Hard);
        q.set_answer("3/4");
        assert_eq!(q.version, 4);
        assert_eq!(q.id, "q1");
    }

    #[test]
    fn test_question_serializes_camel_case() {
        let mut q = Question::new("q1", "math", "fractions", "body");
        q.author_id = "author-7".to_string();
        let value = serde_json::to_value(&q).unwrap();

        assert_eq!(value["authorId"], "author-7");
        assert_eq!(value["difficulty"], "medium");
        assert!(value.get("createdAt").is_some());
        assert!(value.get("options").is_none());
    }

    #[test]
    fn test_difficulty_from_str() {
        assert_eq!("HARD".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert!("impossible".parse::<Difficulty>().is_err());
        assert_eq!(Difficulty::Easy.to_string(), "easy");
    }

    #[test]
    fn test_new_log_entry_ignores_reserved_attributes() {
        let entry = NewLogEntry::new("q1", "answered")
            .with_attribute("correct", true)
            .with_attribute("seq", 99);

        assert_eq!(entry.attributes.get("correct"), Some(&json!(true)));
        assert!(entry.attributes.get("seq").is_none());
    }

    #[test]
    fn test_log_entry_flattens_attributes() {
        let entry = LogEntry {
            seq: 3,
            question_id: "q1".to_string(),
            timestamp: 1_700_000_000_000,
            event_type: "viewed".to_string(),
            attributes: json!({ "durationMs": 1200 }).as_object().unwrap().clone(),
        };

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["seq"], 3);
        assert_eq!(value["questionId"], "q1");
        assert_eq!(value["durationMs"], 1200);

        let back: LogEntry = serde_json::from_value(value).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_cached_question_views() {
        let q = Question::new("q1", "science", "cells", "What is a ribosome?");
        let cached = CachedQuestion::from_question(&q).unwrap();

        assert!(cached.validated);
        assert_eq!(cached.id(), Some("q1"));
        assert_eq!(cached.subject(), Some("science"));
        assert_eq!(cached.topic(), Some("cells"));
        assert_eq!(cached.difficulty(), Some("medium"));
        assert_eq!(cached.question(), Some(q));
    }

    #[test]
    fn test_unvalidated_has_no_typed_view() {
        let record = json!({ "id": "q9", "content": "orphan" })
            .as_object()
            .unwrap()
            .clone();
        let cached = CachedQuestion::unvalidated(record);

        assert!(!cached.validated);
        assert_eq!(cached.id(), Some("q9"));
        assert!(cached.question().is_none());
        assert!(cached.subject().is_none());
    }

    #[test]
    fn test_empty_id_is_no_identity() {
        let record = json!({ "id": "" }).as_object().unwrap().clone();
        assert!(CachedQuestion::unvalidated(record).id().is_none());
    }
}

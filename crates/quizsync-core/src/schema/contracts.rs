//! Contracts for the dashboard's record kinds
//!
//! Field names follow the camelCase wire format of the remote documents.

use super::contract::{FieldType, SchemaContract};
use crate::models::{Difficulty, Role};

pub const QUESTION: &str = "question";
pub const LOG_ENTRY: &str = "log_entry";
pub const USER: &str = "user";
pub const ASSESSMENT: &str = "assessment";
pub const PROGRESS: &str = "progress";
pub const DAILY_MISSION: &str = "daily_mission";

pub fn question() -> SchemaContract {
    SchemaContract::new(QUESTION)
        .required("id", FieldType::String)
        .required("subject", FieldType::String)
        .required("topic", FieldType::String)
        .required("difficulty", FieldType::one_of(Difficulty::NAMES))
        .required("content", FieldType::String)
        .optional("options", FieldType::array_of(FieldType::String))
        .required("answer", FieldType::String)
        .required("explanation", FieldType::String)
        .required("authorId", FieldType::String)
        .required("createdAt", FieldType::Integer)
        .required("updatedAt", FieldType::Integer)
        .required("version", FieldType::Integer)
}

/// Log entries carry free-form attributes, so the contract is open
pub fn log_entry() -> SchemaContract {
    SchemaContract::new(LOG_ENTRY)
        .optional("seq", FieldType::Integer)
        .required("questionId", FieldType::String)
        .required("timestamp", FieldType::Integer)
        .required("eventType", FieldType::String)
}

pub fn user() -> SchemaContract {
    SchemaContract::new(USER)
        .required("id", FieldType::String)
        .required("displayName", FieldType::String)
        .required("email", FieldType::String)
        .required("role", FieldType::one_of(Role::NAMES))
        .required("createdAt", FieldType::Integer)
}

pub fn assessment() -> SchemaContract {
    SchemaContract::new(ASSESSMENT)
        .required("id", FieldType::String)
        .required("title", FieldType::String)
        .required("subject", FieldType::String)
        .required("questionIds", FieldType::array_of(FieldType::String))
        .optional("durationMinutes", FieldType::Integer)
        .required("createdAt", FieldType::Integer)
}

pub fn progress() -> SchemaContract {
    SchemaContract::new(PROGRESS)
        .required("id", FieldType::String)
        .required("userId", FieldType::String)
        .required("questionId", FieldType::String)
        .required("correct", FieldType::Boolean)
        .required("attempts", FieldType::Integer)
        .required("lastAttemptAt", FieldType::Integer)
}

pub fn daily_mission() -> SchemaContract {
    SchemaContract::new(DAILY_MISSION)
        .required("id", FieldType::String)
        .required("userId", FieldType::String)
        .required("date", FieldType::String)
        .required("questionIds", FieldType::array_of(FieldType::String))
        .required("completed", FieldType::Boolean)
        .optional("rewardPoints", FieldType::Integer)
}

/// Every built-in contract
pub fn all() -> Vec<SchemaContract> {
    vec![
        question(),
        log_entry(),
        user(),
        assessment(),
        progress(),
        daily_mission(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Assessment, DailyMission, LogEntry, Progress, User};
    use crate::schema::validate;
    use serde_json::json;

    #[test]
    fn test_user_contract() {
        let value = json!({
            "id": "u1",
            "displayName": "Ada",
            "email": "ada@example.com",
            "role": "student",
            "createdAt": 1_700_000_000_000i64
        });
        let user: User = validate(&value, &user()).unwrap();
        assert_eq!(user.display_name, "Ada");

        let bad = json!({ "id": "u2", "role": "principal" });
        let err = validate::<User>(&bad, &super::user()).unwrap_err();
        assert!(err.has_field("role"));
        assert!(err.has_field("email"));
    }

    #[test]
    fn test_assessment_contract() {
        let value = json!({
            "id": "a1",
            "title": "Fractions quiz",
            "subject": "math",
            "questionIds": ["q1", "q2"],
            "createdAt": 1_700_000_000_000i64
        });
        let assessment: Assessment = validate(&value, &assessment()).unwrap();
        assert_eq!(assessment.question_ids.len(), 2);
        assert!(assessment.duration_minutes.is_none());
    }

    #[test]
    fn test_progress_contract() {
        let value = json!({
            "id": "p1",
            "userId": "u1",
            "questionId": "q1",
            "correct": "yes",
            "attempts": 2,
            "lastAttemptAt": 1_700_000_000_000i64
        });
        let err = validate::<Progress>(&value, &progress()).unwrap_err();
        assert_eq!(err.fields(), vec!["correct"]);
    }

    #[test]
    fn test_daily_mission_contract() {
        let value = json!({
            "id": "m1",
            "userId": "u1",
            "date": "2026-10-19",
            "questionIds": ["q3"],
            "completed": false,
            "rewardPoints": 50
        });
        let mission: DailyMission = validate(&value, &daily_mission()).unwrap();
        assert_eq!(mission.reward_points, Some(50));
    }

    #[test]
    fn test_log_entry_contract_allows_attributes() {
        let value = json!({
            "seq": 1,
            "questionId": "q1",
            "timestamp": 1_700_000_000_000i64,
            "eventType": "answered",
            "correct": true
        });
        let entry: LogEntry = validate(&value, &log_entry()).unwrap();
        assert_eq!(entry.attributes.get("correct"), Some(&json!(true)));
    }

    #[test]
    fn test_all_names_unique() {
        let mut names: Vec<String> = all().iter().map(|c| c.name().to_string()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 6);
    }
}

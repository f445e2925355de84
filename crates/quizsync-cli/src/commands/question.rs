//! Question command handlers

use anyhow::{bail, Context, Result};
use serde_json::Value;

use quizsync_core::document::record_from;
use quizsync_core::schema::{contracts, SchemaError};
use quizsync_core::{CachedQuestion, Difficulty, LocalCache, Question, SchemaRegistry};

use crate::output::Output;

/// Filters for `question list`
#[derive(Debug, Default)]
pub struct QuestionFilter {
    pub subject: Option<String>,
    pub topic: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub unvalidated: bool,
}

/// Local changes for `question edit`
#[derive(Debug, Default)]
pub struct QuestionEdit {
    pub content: Option<String>,
    pub answer: Option<String>,
    pub explanation: Option<String>,
}

impl QuestionEdit {
    fn is_empty(&self) -> bool {
        self.content.is_none() && self.answer.is_none() && self.explanation.is_none()
    }
}

/// List cached questions
pub fn list(cache: &LocalCache, filter: QuestionFilter, output: &Output) -> Result<()> {
    let questions = select(cache, &filter).context("Failed to read questions")?;
    output.print_questions(&questions);
    Ok(())
}

/// Show one question; unvalidated ones are re-checked to list their issues
pub fn show(cache: &LocalCache, id: String, output: &Output) -> Result<()> {
    let Some(question) = cache.question(&id)? else {
        bail!("Question not found: {}", id);
    };

    let issues = if question.validated {
        Vec::new()
    } else {
        validation_issues(&question)
    };

    output.print_question(&question, &issues);
    Ok(())
}

/// Edit a cached question locally (pushed on the next `quizsync push`)
pub fn edit(cache: &LocalCache, id: String, changes: QuestionEdit, output: &Output) -> Result<()> {
    if changes.is_empty() {
        bail!("Nothing to change. Pass --content, --answer or --explanation.");
    }

    let Some(question) = cache.question(&id)? else {
        bail!("Question not found: {}", id);
    };

    let edited = apply_edit(&question, &changes)?;
    cache.put_question(&edited)?;

    let version = edited.record.get("version").cloned().unwrap_or(Value::Null);
    output.success(&format!("Updated question {} (version {})", id, version));
    Ok(())
}

/// Run the query matching the filter, using the narrowest index available
fn select(cache: &LocalCache, filter: &QuestionFilter) -> Result<Vec<CachedQuestion>> {
    let mut questions = if filter.unvalidated {
        cache.unvalidated_questions()?
    } else {
        match (&filter.subject, &filter.topic, filter.difficulty) {
            (Some(subject), Some(topic), _) => {
                cache.questions_by_classification(subject, topic)?
            }
            (Some(subject), None, _) => cache.questions_by_subject(subject)?,
            (None, Some(topic), _) => cache.questions_by_topic(topic)?,
            (None, None, Some(difficulty)) => cache.questions_by_difficulty(difficulty)?,
            (None, None, None) => cache.questions()?,
        }
    };

    questions.retain(|q| {
        filter.subject.as_deref().map_or(true, |s| q.subject() == Some(s))
            && filter.topic.as_deref().map_or(true, |t| q.topic() == Some(t))
            && filter
                .difficulty
                .map_or(true, |d| q.difficulty() == Some(d.as_str()))
    });

    Ok(questions)
}

/// Apply edits through the typed model, keeping any extra remote fields
fn apply_edit(question: &CachedQuestion, changes: &QuestionEdit) -> Result<CachedQuestion> {
    let Some(mut typed) = question.question() else {
        bail!(
            "Question {} failed validation and cannot be edited locally. \
             Fix it in the remote store and pull again.",
            question.id().unwrap_or("(none)")
        );
    };

    if let Some(content) = &changes.content {
        typed.set_content(content.as_str());
    }
    if let Some(answer) = &changes.answer {
        typed.set_answer(answer.as_str());
    }
    if let Some(explanation) = &changes.explanation {
        typed.set_explanation(explanation.as_str());
    }

    let mut record = question.record.clone();
    record.extend(record_from(&typed).context("Failed to encode question")?);

    Ok(CachedQuestion {
        record,
        validated: true,
    })
}

fn validation_issues(question: &CachedQuestion) -> Vec<String> {
    let registry = SchemaRegistry::new();
    let candidate = Value::Object(question.record.clone());
    match registry.validate::<Question>(contracts::QUESTION, &candidate) {
        Ok(_) => Vec::new(),
        Err(SchemaError::Invalid(err)) => err.errors.iter().map(ToString::to_string).collect(),
        Err(e) => vec![e.to_string()],
    }
}

//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use chrono::{DateTime, Local, TimeZone};
use serde::Serialize;
use serde_json::Value;

use quizsync_core::{CachedQuestion, LogEntry, PullReport, PushReport};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print a single question, with validation issues for unvalidated ones
    pub fn print_question(&self, question: &CachedQuestion, issues: &[String]) {
        match self.format {
            OutputFormat::Human => {
                let field = |key: &str| question.record.get(key).and_then(Value::as_str);

                println!("ID:          {}", question.id().unwrap_or("(none)"));
                println!("Subject:     {}", field("subject").unwrap_or("-"));
                println!("Topic:       {}", field("topic").unwrap_or("-"));
                println!("Difficulty:  {}", field("difficulty").unwrap_or("-"));
                if let Some(version) = question.record.get("version") {
                    println!("Version:     {}", version);
                }
                if let Some(updated) = question.record.get("updatedAt").and_then(Value::as_i64) {
                    println!("Updated:     {}", format_millis(updated));
                }
                println!(
                    "Validated:   {}",
                    if question.validated { "yes" } else { "no" }
                );
                println!();
                println!("{}", field("content").unwrap_or("(no content)"));

                if let Some(Value::Array(options)) = question.record.get("options") {
                    println!();
                    for (i, option) in options.iter().enumerate() {
                        println!("  {}. {}", i + 1, option.as_str().unwrap_or("?"));
                    }
                }
                if let Some(answer) = field("answer") {
                    println!();
                    println!("Answer:      {}", answer);
                }
                if let Some(explanation) = field("explanation") {
                    println!("Explanation: {}", explanation);
                }

                if !issues.is_empty() {
                    println!();
                    println!("── Validation issues ({}) ──", issues.len());
                    for issue in issues {
                        println!("  {}", issue);
                    }
                }
            }
            OutputFormat::Json => {
                let mut value = question_json(question);
                if let Value::Object(map) = &mut value {
                    map.insert("issues".to_string(), issues.into());
                }
                print_json(&value);
            }
            OutputFormat::Quiet => {
                println!("{}", question.id().unwrap_or_default());
            }
        }
    }

    /// Print a list of questions
    pub fn print_questions(&self, questions: &[CachedQuestion]) {
        match self.format {
            OutputFormat::Human => {
                if questions.is_empty() {
                    println!("No questions found.");
                    return;
                }
                for question in questions {
                    let field = |key: &str| {
                        question
                            .record
                            .get(key)
                            .and_then(Value::as_str)
                            .unwrap_or("-")
                    };
                    let marker = if question.validated { "" } else { " [unvalidated]" };
                    println!(
                        "{} | {}/{} | {:<6} | {}{}",
                        truncate(question.id().unwrap_or("(none)"), 12),
                        field("subject"),
                        field("topic"),
                        field("difficulty"),
                        truncate_line(field("content"), 50),
                        marker
                    );
                }
                println!("\n{} question(s)", questions.len());
            }
            OutputFormat::Json => {
                let values: Vec<Value> = questions.iter().map(question_json).collect();
                print_json(&values);
            }
            OutputFormat::Quiet => {
                for question in questions {
                    if let Some(id) = question.id() {
                        println!("{}", id);
                    }
                }
            }
        }
    }

    /// Print log entries
    pub fn print_log_entries(&self, entries: &[LogEntry]) {
        match self.format {
            OutputFormat::Human => {
                if entries.is_empty() {
                    println!("No log entries found.");
                    return;
                }
                for entry in entries {
                    println!("{}", log_line(entry));
                }
                println!("\n{} entr{}", entries.len(), if entries.len() == 1 { "y" } else { "ies" });
            }
            OutputFormat::Json => print_json(entries),
            OutputFormat::Quiet => {
                for entry in entries {
                    println!("{}", entry.seq);
                }
            }
        }
    }

    pub fn print_log_entry(&self, entry: &LogEntry) {
        match self.format {
            OutputFormat::Human => println!("✓ Logged {}", log_line(entry)),
            OutputFormat::Json => print_json(entry),
            OutputFormat::Quiet => println!("{}", entry.seq),
        }
    }

    pub fn print_pull(&self, report: &PullReport) {
        match self.format {
            OutputFormat::Human => {
                println!("✓ Pulled {} question(s)", report.cached);
                if report.unvalidated > 0 {
                    println!(
                        "  {} failed validation (see `quizsync question list --unvalidated`)",
                        report.unvalidated
                    );
                }
                if report.skipped > 0 {
                    println!("  {} skipped (no key)", report.skipped);
                }
            }
            OutputFormat::Json => print_json(report),
            OutputFormat::Quiet => println!("{}", report.cached),
        }
    }

    pub fn print_push(&self, report: &PushReport) {
        match self.format {
            OutputFormat::Human => {
                println!("✓ Pushed {} question(s)", report.written);
                if report.skipped > 0 {
                    println!("  {} skipped (no identity)", report.skipped);
                }
            }
            OutputFormat::Json => print_json(report),
            OutputFormat::Quiet => println!("{}", report.written),
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a warning to stderr (human mode only)
    pub fn warning(&self, msg: &str) {
        if self.format == OutputFormat::Human {
            eprintln!("⚠ {}", msg);
        }
    }
}

/// A question as JSON, with its validation flag
fn question_json(question: &CachedQuestion) -> Value {
    let mut record = question.record.clone();
    record.insert("validated".to_string(), question.validated.into());
    Value::Object(record)
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to encode output: {}", e),
    }
}

fn log_line(entry: &LogEntry) -> String {
    let mut line = format!(
        "#{} [{}] {} {}",
        entry.seq,
        format_millis(entry.timestamp),
        entry.question_id,
        entry.event_type
    );
    for (key, value) in &entry.attributes {
        line.push_str(&format!(" {}={}", key, value));
    }
    line
}

/// Epoch milliseconds as local time
fn format_millis(millis: i64) -> String {
    match Local.timestamp_millis_opt(millis).single() {
        Some(time) => format_time(time),
        None => millis.to_string(),
    }
}

fn format_time(time: DateTime<Local>) -> String {
    time.format("%Y-%m-%d %H:%M").to_string()
}

/// Truncate a string to max length, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Truncate to first line and max length
fn truncate_line(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    truncate(first_line, max_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizsync_core::Question;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
        assert_eq!(truncate("ééééééééééé", 5), "éé...");
    }

    #[test]
    fn test_truncate_line() {
        assert_eq!(truncate_line("single line", 20), "single line");
        assert_eq!(truncate_line("line one\nline two", 20), "line one");
    }

    #[test]
    fn test_question_json_carries_flag() {
        let q = Question::new("q1", "math", "algebra", "x?");
        let cached = CachedQuestion::from_question(&q).unwrap();

        let value = question_json(&cached);
        assert_eq!(value["id"], "q1");
        assert_eq!(value["validated"], true);
    }

    #[test]
    fn test_log_line_lists_attributes() {
        let entry = LogEntry {
            seq: 7,
            question_id: "q1".to_string(),
            timestamp: 0,
            event_type: "answered".to_string(),
            attributes: serde_json::json!({ "correct": true })
                .as_object()
                .unwrap()
                .clone(),
        };
        let line = log_line(&entry);
        assert!(line.starts_with("#7 ["));
        assert!(line.ends_with("q1 answered correct=true"));
    }
}

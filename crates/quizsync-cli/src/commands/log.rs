//! Question log command handlers

use anyhow::{bail, Context, Result};
use serde_json::Value;

use quizsync_core::models::RESERVED_LOG_FIELDS;
use quizsync_core::{LocalCache, NewLogEntry};

use crate::output::Output;

/// Append an entry to the question log
pub fn add(
    cache: &LocalCache,
    question_id: String,
    event_type: String,
    attrs: Vec<String>,
    output: &Output,
) -> Result<()> {
    let mut entry = NewLogEntry::new(question_id, event_type);
    for attr in &attrs {
        let (key, value) = parse_attribute(attr)?;
        entry = entry.with_attribute(key, value);
    }

    // Log entries only weakly reference questions
    if cache.question(&entry.question_id)?.is_none() {
        output.warning(&format!(
            "Question {} is not in the local cache",
            entry.question_id
        ));
    }

    let stored = cache.append(entry).context("Failed to append log entry")?;
    output.print_log_entry(&stored);
    Ok(())
}

/// List log entries, optionally for one question
pub fn list(cache: &LocalCache, question_id: Option<String>, output: &Output) -> Result<()> {
    let entries = match question_id {
        Some(id) => cache.log_entries_for(&id)?,
        None => cache.log_entries()?,
    };
    output.print_log_entries(&entries);
    Ok(())
}

/// Parse `key=value`; the value is read as JSON when it parses, else as a string
fn parse_attribute(attr: &str) -> Result<(String, Value)> {
    let Some((key, raw)) = attr.split_once('=') else {
        bail!("Invalid attribute '{}'. Use key=value.", attr);
    };

    let key = key.trim();
    if key.is_empty() {
        bail!("Invalid attribute '{}': empty key", attr);
    }
    if RESERVED_LOG_FIELDS.contains(&key) {
        bail!("'{}' is set by quizsync and cannot be used as an attribute", key);
    }

    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use serde_json::json;

    #[test]
    fn test_parse_attribute_values() {
        assert_eq!(parse_attribute("correct=true").unwrap(), ("correct".into(), json!(true)));
        assert_eq!(parse_attribute("ms=1520").unwrap(), ("ms".into(), json!(1520)));
        assert_eq!(
            parse_attribute("choice=B").unwrap(),
            ("choice".into(), json!("B"))
        );
        assert_eq!(parse_attribute("note=a=b").unwrap(), ("note".into(), json!("a=b")));
    }

    #[test]
    fn test_parse_attribute_rejects() {
        assert!(parse_attribute("novalue").is_err());
        assert!(parse_attribute("=1").is_err());
        assert!(parse_attribute("seq=4").is_err());
    }

    #[test]
    fn test_add_and_list() {
        let cache = LocalCache::open_in_memory().unwrap();
        let output = Output::new(OutputFormat::Quiet);

        add(
            &cache,
            "q1".into(),
            "answered".into(),
            vec!["correct=false".into()],
            &output,
        )
        .unwrap();
        add(&cache, "q2".into(), "viewed".into(), Vec::new(), &output).unwrap();

        let q1 = cache.log_entries_for("q1").unwrap();
        assert_eq!(q1.len(), 1);
        assert_eq!(q1[0].attributes["correct"], false);
        assert_eq!(cache.log_count().unwrap(), 2);

        list(&cache, Some("q2".into()), &output).unwrap();
    }
}

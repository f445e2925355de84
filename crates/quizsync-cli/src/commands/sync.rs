//! Pull and push command handlers

use std::sync::Arc;

use anyhow::{bail, Context, Result};

use tokio::sync::mpsc::UnboundedReceiver;

use quizsync_core::{
    Config, HttpRemote, JsonFileRemote, LocalCache, RemoteLocation, RemoteStore, SyncEngine,
    SyncEvent,
};

use crate::output::Output;

/// Build the remote store selected by `remote_url`
pub fn build_remote(config: &Config) -> Result<Box<dyn RemoteStore>> {
    match config.remote_location() {
        Some(RemoteLocation::Http(url)) => {
            let remote = HttpRemote::new(&url, config.request_timeout())
                .context("Failed to set up HTTP client")?;
            Ok(Box::new(remote))
        }
        Some(RemoteLocation::File(path)) => Ok(Box::new(JsonFileRemote::new(path))),
        None => bail!(
            "Remote store not configured. Set it with:\n  \
             quizsync config set remote_url https://your-server/api\n  \
             quizsync config set remote_url /path/to/questions.json"
        ),
    }
}

fn engine(cache: Arc<LocalCache>, config: &Config) -> Result<SyncEngine<Box<dyn RemoteStore>>> {
    let remote = build_remote(config)?;
    Ok(SyncEngine::new(cache, remote, config.collection.clone()))
}

/// Replace the cache with the remote collection
pub async fn pull(cache: Arc<LocalCache>, config: &Config, output: &Output) -> Result<()> {
    let engine = engine(cache, config)?;
    let events = engine.take_events();

    output.message(&format!(
        "Pulling '{}' from {}...",
        engine.collection(),
        engine.remote().describe()
    ));

    let result = engine.pull().await;
    report_warnings(events, output);

    let report = result.context("Pull failed")?;
    output.print_pull(&report);
    Ok(())
}

/// Write the cache to the remote in one batch
pub async fn push(cache: Arc<LocalCache>, config: &Config, output: &Output) -> Result<()> {
    let engine = engine(cache, config)?;
    let events = engine.take_events();

    output.message(&format!(
        "Pushing '{}' to {}...",
        engine.collection(),
        engine.remote().describe()
    ));

    let result = engine.push_questions().await;
    report_warnings(events, output);

    let report = result.context("Push failed")?;
    output.print_push(&report);
    Ok(())
}

/// Print the per-record warnings queued during a run
fn report_warnings(events: Option<UnboundedReceiver<SyncEvent>>, output: &Output) {
    let Some(mut events) = events else {
        return;
    };
    while let Ok(event) = events.try_recv() {
        match event {
            SyncEvent::ValidationWarning(diagnostic) => {
                output.warning(&format!("Unvalidated: {}", diagnostic));
            }
            SyncEvent::RecordSkipped { collection, reason } => {
                output.warning(&format!("Skipped {} record: {}", collection, reason));
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use quizsync_core::{CachedQuestion, Question};
    use tempfile::TempDir;

    fn file_config(temp_dir: &TempDir) -> Config {
        Config {
            data_dir: temp_dir.path().to_path_buf(),
            remote_url: Some(temp_dir.path().join("remote.json").display().to_string()),
            ..Config::default()
        }
    }

    #[test]
    fn test_build_remote_requires_url() {
        let config = Config {
            remote_url: None,
            ..Config::default()
        };
        let err = build_remote(&config).err().unwrap();
        assert!(err.to_string().contains("not configured"));
    }

    #[tokio::test]
    async fn test_push_then_pull_through_file_remote() {
        let temp_dir = TempDir::new().unwrap();
        let config = file_config(&temp_dir);
        let output = Output::new(OutputFormat::Quiet);

        let cache = Arc::new(LocalCache::open(&config).unwrap());
        let q = Question::new("q1", "science", "cells", "What is a ribosome?");
        cache
            .put_question(&CachedQuestion::from_question(&q).unwrap())
            .unwrap();

        push(cache.clone(), &config, &output).await.unwrap();
        assert!(temp_dir.path().join("remote.json").exists());

        cache.clear_all(quizsync_core::RecordKind::Question).unwrap();
        pull(cache.clone(), &config, &output).await.unwrap();

        let pulled = cache.question("q1").unwrap().unwrap();
        assert!(pulled.validated);
        assert_eq!(pulled.question().unwrap(), q);
    }
}

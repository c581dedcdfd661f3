// Show where a document's history lives

use async_trait::async_trait;
use revisor_config::VersioningConfig;
use revisor_history::{HistoryPaths, WatchPattern};
use revisor_store::path::is_document_path;

use super::Command;
use crate::error::{CliError, CliResult};

/// Print the history, versions and backup paths of a document
pub struct PathsCommand {
    pub doc_path: String,
    pub config: VersioningConfig,
}

impl PathsCommand {
    pub fn new(doc_path: impl Into<String>, config: VersioningConfig) -> Self {
        Self {
            doc_path: doc_path.into(),
            config,
        }
    }

    /// Labelled lines to print
    pub fn describe(&self) -> CliResult<Vec<(&'static str, String)>> {
        let doc_path = self.doc_path.trim_matches('/');
        if !is_document_path(doc_path) {
            return Err(CliError::invalid_argument(format!(
                "not a document path: '{}' (expected collection/document segments)",
                self.doc_path
            )));
        }

        let paths = HistoryPaths::new(self.config.history_root.clone());
        let watched = WatchPattern::parse(&self.config.collection).matches(doc_path);
        Ok(vec![
            ("history", paths.history_path(doc_path)),
            ("versions", paths.versions_path(doc_path)),
            ("backup", paths.backup_path(doc_path)),
            ("watched", watched.to_string()),
        ])
    }
}

#[async_trait]
impl Command for PathsCommand {
    async fn execute(&self) -> CliResult<()> {
        for (label, value) in self.describe()? {
            println!("{:<9} {}", label, value);
        }
        Ok(())
    }
}

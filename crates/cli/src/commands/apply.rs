//! This module runs a single fixture directory's reorganization and emits the
//! resulting storage image as JSON, without comparing against an expectation.

use crate::fixture::{apply_fixture, storage_entries};
use async_trait::async_trait;
use clap::Args;
use std::error::Error;
use std::fs;
use std::path::PathBuf;

/// Arguments for the `apply` subcommand.
#[derive(Args)]
pub struct ApplyArgs {
    /// Fixture directory holding old_storage.json, directives.json, types.json.
    pub fixture: PathBuf,
    /// Write the resulting storage JSON here instead of stdout.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

/// Executes the `apply` subcommand.
#[async_trait]
impl super::Command for ApplyArgs {
    async fn execute(self) -> Result<(), Box<dyn Error>> {
        let backend = apply_fixture(&self.fixture)?;
        let entries = storage_entries(backend.image());
        let json = serde_json::to_string_pretty(&entries)?;

        match self.output {
            Some(path) => fs::write(path, json)?,
            None => println!("{json}"),
        }
        Ok(())
    }
}

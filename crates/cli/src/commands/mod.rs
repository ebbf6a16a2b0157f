use async_trait::async_trait;
use clap::Subcommand;
use std::error::Error;

pub mod apply;

use thiserror::Error;

/// Errors that can occur while loading or running fixtures.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Failed to read a fixture file.
    #[error("could not read file '{path}': {source}")]
    FileRead {
        /// The path that could not be read.
        path: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// A fixture file held invalid JSON.
    #[error("invalid JSON in '{path}': {source}")]
    Json {
        /// The offending file.
        path: String,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },
    /// The rewrite itself failed.
    #[error(transparent)]
    Rewrite(#[from] reslot_rewrite::Error),
    /// The fixtures root was not a directory.
    #[error("'{0}' is not a directory")]
    NotADirectory(String),
    /// One or more fixtures did not produce their expected image.
    #[error("{failed} of {total} fixtures failed")]
    FixturesFailed {
        /// Number of failing fixtures.
        failed: usize,
        /// Number of fixtures run.
        total: usize,
    },
}

/// CLI subcommands for Reslot.
#[derive(Subcommand)]
pub enum Cmd {
    /// Apply one fixture's reorganization and emit the resulting storage.
    Apply(apply::ApplyArgs),
    /// Run every fixture under a directory and report pass/fail.
    Test(test::TestArgs),
}

/// Trait for executing CLI subcommands.
#[async_trait]
pub trait Command {
    /// Executes the subcommand.
    async fn execute(self) -> Result<(), Box<dyn Error>>;
}

#[async_trait]
impl Command for Cmd {
    async fn execute(self) -> Result<(), Box<dyn Error>> {
        match self {
            Cmd::Apply(args) => args.execute().await,
            Cmd::Test(args) => args.execute().await,
        }
    }
}

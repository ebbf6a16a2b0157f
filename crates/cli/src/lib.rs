//! Library surface of the Reslot CLI: fixture loading and the subcommand
//! implementations, kept callable from integration tests.

pub mod commands;
pub mod fixture;

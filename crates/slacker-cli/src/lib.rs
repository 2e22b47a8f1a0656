// ABOUTME: Library root for slacker-cli.
// ABOUTME: Exports config, Slack client, commands, output, and error modules.

pub mod commands;
pub mod config;
pub mod error;
pub mod output;
pub mod since;
pub mod slack;

pub use commands::{execute, Command, Request, ViewRequest};
pub use config::{Config, EnrichConfig, SlackConfig};
pub use error::{CliError, Result};
pub use output::{Format, Subject};
pub use slack::{Identity, SlackClient};

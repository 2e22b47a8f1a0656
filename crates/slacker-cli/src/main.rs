// ABOUTME: Entry point for the slacker binary.
// ABOUTME: Parses arguments, loads config, runs one command, prints the result.

use anyhow::{Context, Result};
use clap::Parser;
use slacker_cli::{Command, Config, Format};
use tracing::Level;

#[derive(Parser)]
#[command(name = "slacker")]
#[command(about = "Slack activity and direct messages with names resolved")]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true, env = "SLACKER_CONFIG")]
    config: Option<std::path::PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = Format::Text)]
    output: Format,

    /// Log debug detail to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Append debug logs to ~/.config/slacker/slacker.log instead of stderr
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Command,
}

fn init_logging(cli: &Cli) {
    if cli.log_file {
        slacker_log::init_file("slacker");
    } else {
        let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
        slacker_log::init_with("slacker", level);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let config = Config::load(cli.config).context("Could not load slacker configuration")?;

    match slacker_cli::execute(&cli.command, &config, cli.output).await {
        Ok(rendered) => {
            println!("{rendered}");
            Ok(())
        }
        Err(err) => {
            eprintln!("slacker: {err}");
            std::process::exit(err.exit_code());
        }
    }
}

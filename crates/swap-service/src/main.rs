use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod implementations;

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();

	// Initialize tracing
	setup_tracing(&cli.log_level)?;

	let config = commands::load_config(&cli.config).await?;

	match cli.command {
		Command::Swap(args) => commands::swap(config, args).await,
		Command::Resume { id } => commands::resume(config, id).await,
		Command::Inspect {
			chain,
			token,
			account,
		} => commands::inspect(&config, chain, &token, account).await,
		Command::Tokens { chain } => {
			commands::tokens(&config, chain);
			Ok(())
		}
		Command::Validate => {
			commands::validate(&config);
			Ok(())
		}
		Command::History { id } => commands::history(&config, id).await,
	}
}

fn setup_tracing(log_level: &str) -> Result<()> {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

	tracing_subscriber::registry()
		.with(env_filter)
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.init();

	Ok(())
}

//! The `wagerbook` command-line interface.

pub mod audit;
pub mod command;
pub mod config;
pub mod market;
pub mod migrate;
pub mod output;
pub mod quote;
pub mod simulate;

use crate::error::Result;
use crate::infrastructure::config::Config;
use command::{Cli, Commands, ConfigCommand};

/// Run a parsed command line to completion.
///
/// # Errors
///
/// Returns the first error raised by the selected command.
pub async fn execute(cli: Cli) -> Result<()> {
    output::configure(output::OutputConfig::new(cli.json, cli.quiet));

    if let Commands::Config(ConfigCommand::Check) = &cli.command {
        return config::execute_check(&cli.config);
    }

    let settings = Config::load_or_default(&cli.config)?;
    settings.init_logging();

    match &cli.command {
        Commands::Migrate => migrate::execute(&settings),
        Commands::Quote(args) => quote::execute(args),
        Commands::Market(args) => market::execute(&settings, &args.id),
        Commands::Audit => audit::execute(&settings),
        Commands::Simulate(args) => simulate::execute(&settings, args).await,
        Commands::Config(ConfigCommand::Show) => config::execute_show(&settings),
        Commands::Config(ConfigCommand::Check) => config::execute_check(&cli.config),
    }
}

use std::str::FromStr;

use clap::Parser;
use log::{error, LevelFilter};

use pelicanctl::api::describe_error;
use pelicanctl::auth::TokenResolver;
use pelicanctl::cli::common::CommandContext;
use pelicanctl::cli::{Cli, Commands};
use pelicanctl::config::Config;
use pelicanctl::output::Formatter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // init logger
    env_logger::Builder::from_default_env()
        .filter_level(LevelFilter::from_str(&cli.log_level).unwrap_or(LevelFilter::Info))
        .init();

    let mut config = match Config::load_or_default(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load config: {:#}", e);
            std::process::exit(1);
        }
    };
    config.apply_env();

    let ctx = CommandContext {
        tokens: TokenResolver::from_env(&config),
        output: Formatter::new(cli.json),
        config,
    };

    let result = match &cli.command {
        Commands::Client(client_cmd) => client_cmd.execute(&ctx).await,
        Commands::Admin(admin_cmd) => admin_cmd.execute(&ctx).await,
    };

    if let Err(e) = result {
        error!("{}", describe_error(&e));
        std::process::exit(1);
    }
}

//! folio CLI

use clap::Parser;

mod cli;
mod output;

use cli::{CacheCommands, Cli, Commands, GlobalOptions, ProfileCommands};
use folio::error::Result;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

/// `--debug` wins over RUST_LOG; without either only warnings are shown
fn init_logging(debug: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if debug {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.format_timestamp(None).init();
}

async fn run(cli: Cli) -> Result<()> {
    let opts = GlobalOptions::from_cli(&cli);

    match cli.command {
        Commands::Profile(cmd) => match cmd {
            ProfileCommands::Get { owner_key } => cli::profile::get(&opts, &owner_key),
            ProfileCommands::Create { owner_key, file } => {
                cli::profile::create(&opts, &owner_key, file.as_deref())
            }
            ProfileCommands::Put { owner_key, file } => {
                cli::profile::put(&opts, &owner_key, &file)
            }
            ProfileCommands::Delete { owner_key, yes } => {
                cli::profile::delete(&opts, &owner_key, yes)
            }
        },
        Commands::Enrich { owner_key, repo } => cli::enrich::run(&opts, &owner_key, &repo).await,
        Commands::Readme { repo } => cli::readme::run(&opts, &repo).await,
        Commands::Cache(cmd) => match cmd {
            CacheCommands::Status => cli::cache::status(&opts),
            CacheCommands::Clear => cli::cache::clear(&opts),
        },
        Commands::Version => {
            println!("folio version {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

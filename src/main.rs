use anyhow::Result;
use clap::{CommandFactory, Parser};
use std::env;
use whisperdeck::{init_logging, Config, LogConfig, Storage};

mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::browse::{handle_categories, handle_fav, handle_favs, handle_list, handle_show};
use commands::settings::{handle_config, handle_layout};
use commands::usage::{handle_challenge, handle_copy, handle_lock, handle_status, handle_unlock};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        commands::report_error(&e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Only initialize logging if explicitly requested via env var
    if env::var("WHISPERDECK_LOG_LEVEL").is_ok() {
        init_logging(LogConfig::from_env())?;
    }

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let storage = Storage::new()?;
    storage.init()?;

    // Config edits must work even when the config file does not parse
    if let Commands::Config { action } = command {
        return handle_config(&storage, action);
    }

    let config = Config::load(&storage.config_path())?.with_env_overrides();
    let mut session = commands::open_session(&storage, &config)?;

    match command {
        Commands::List {
            query,
            category,
            favorites,
            sort,
            limit,
        } => handle_list(
            &session,
            query.as_deref(),
            category.as_deref(),
            favorites,
            sort,
            limit,
        )?,
        Commands::Show { prompt } => handle_show(&session, &prompt)?,
        Commands::Categories => handle_categories(&session)?,
        Commands::Fav { prompt } => handle_fav(&mut session, &prompt)?,
        Commands::Favs => handle_favs(&session)?,
        Commands::Copy { prompts } => handle_copy(&mut session, &prompts)?,
        Commands::Status => handle_status(&session)?,
        Commands::Challenge { id } => handle_challenge(&mut session, &id)?,
        Commands::Unlock { passphrase } => handle_unlock(&mut session, passphrase.as_deref())?,
        Commands::Lock => handle_lock(&mut session)?,
        Commands::Layout { panel, on, off } => {
            handle_layout(&session, panel.as_deref(), on, off)?
        }
        Commands::Templates { action } => {
            commands::templates::handle_templates(&session, action).await?
        }
        Commands::Shell => commands::shell::run_shell(&mut session).await?,
        Commands::Config { action } => handle_config(&storage, action)?,
    }

    Ok(())
}

//! tix - offline-first ticket board for the command line
//!
//! Every command works offline against the local store; changes are pushed
//! whenever the ticket API is reachable.

mod cli;
mod commands;
mod error;


use clap::{CommandFactory, Parser};

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::board::run_board;
use crate::commands::common::App;
use crate::commands::completions::run_completions;
use crate::commands::delete::run_delete;
use crate::commands::edit::{build_patch, run_edit};
use crate::commands::list::run_list;
use crate::commands::move_cmd::run_move;
use crate::commands::status::run_status;
use crate::commands::sync::run_sync;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let directive = "ticketsync=info"
        .parse::<tracing_subscriber::filter::Directive>()
        .map_err(|error| CliError::Config(format!("invalid log directive: {error}")))?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    if let Commands::Completions { shell, output } = &command {
        return run_completions(*shell, output.as_deref());
    }

    let app = App::open(&cli.global).await?;

    match command {
        Commands::Add {
            title,
            description,
            status,
        } => run_add(&title, description.as_deref(), status, &app).await?,
        Commands::List { status, json } => run_list(status, json, &app).await?,
        Commands::Board => run_board(&app).await,
        Commands::Edit {
            id,
            title,
            description,
            status,
        } => run_edit(&id, build_patch(title, description, status), &app).await?,
        Commands::Move { id, status } => run_move(&id, status, &app).await?,
        Commands::Delete { id } => run_delete(&id, &app).await?,
        Commands::Sync => run_sync(&app).await?,
        Commands::Status { json } => run_status(json, &app).await?,
        Commands::Completions { .. } => {}
    }

    Ok(())
}

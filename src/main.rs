use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

use verse_import::cli::{CantoCommand, Cli, Command};
use verse_import::commands;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    verse_import::logging::init().context("init logging")?;

    let cli = Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        Command::Import(args) => commands::import(args).await.context("import")?,
        Command::ImportFile(args) => commands::import_file(args).await.context("import-file")?,
        Command::Plan(args) => commands::plan(args).await.context("plan")?,
        Command::Canto {
            command: CantoCommand::Add(args),
        } => commands::canto_add(args).await.context("canto add")?,
        Command::Show(args) => commands::show(args).await.context("show")?,
    }

    Ok(())
}

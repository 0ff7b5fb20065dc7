pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "storefront",
    about = "Storefront operator and demo CLI",
    long_about = "Prepare the storefront database, inspect configuration, and try product search, chat and a full shopping session from the terminal.",
    after_help = "Examples:\n  storefront migrate\n  storefront seed\n  storefront search \"breakfast under 60\"\n  storefront chat \"where is my order #1\"\n  storefront shop"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the demo product catalog (idempotent) and verify it")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "List every product in the catalog")]
    Products,
    #[command(about = "Interpret a free-text query and list the matching products")]
    Search {
        #[arg(help = "Free-text query, e.g. \"spices below 100\"")]
        query: Vec<String>,
    },
    #[command(about = "Send one message to the storefront assistant and print its reply")]
    Chat {
        #[arg(required = true, help = "Chat message, e.g. \"where is my order #3\"")]
        message: Vec<String>,
    },
    #[command(about = "Start an interactive shopping session on stdin/stdout")]
    Shop,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Products => commands::products::run(),
        Command::Search { query } => commands::search::run(&query.join(" ")),
        Command::Chat { message } => commands::chat::run(&message.join(" ")),
        Command::Shop => commands::shop::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use budgetbook_core::config::{AppConfig, LoadOptions};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "budgetbook",
    about = "Budgetbook client registry CLI",
    long_about = "Manage the client registry, link budget PDFs to clients, and inspect configuration.",
    after_help = "Examples:\n  budgetbook clients list --search ana\n  budgetbook link --name \"Carla Dias\" --file orcamento.pdf\n  budgetbook doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(subcommand, about = "List, add, update or remove registry customers")]
    Clients(ClientsCommand),
    #[command(about = "Store a budget PDF and link it to the customer typed on the budget")]
    Link {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long, help = "Path of the rendered budget PDF")]
        file: PathBuf,
        #[arg(long, help = "Budget number; allocated from the sequence when omitted")]
        number: Option<u32>,
    },
    #[command(about = "Show customer and document counts")]
    Stats,
    #[command(about = "Build the share message for a customer's document")]
    Share { customer_id: String, file_name: String },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config and storage readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
enum ClientsCommand {
    List {
        #[arg(long)]
        search: Option<String>,
    },
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long, default_value = "")]
        email: String,
    },
    #[command(about = "Fill in contact fields a customer is missing")]
    Update {
        id: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long, default_value = "")]
        email: String,
    },
    #[command(about = "Remove a customer and delete its documents")]
    Remove { id: String },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    if let Ok(config) = AppConfig::load(LoadOptions::default()) {
        if let Err(error) = logging::init_logging(&config) {
            eprintln!("{error}");
        }
    }

    let result = match cli.command {
        Command::Clients(ClientsCommand::List { search }) => {
            commands::clients::list(search.as_deref())
        }
        Command::Clients(ClientsCommand::Add { name, phone, email }) => {
            commands::clients::add(&name, &phone, &email)
        }
        Command::Clients(ClientsCommand::Update { id, phone, email }) => {
            commands::clients::update(&id, &phone, &email)
        }
        Command::Clients(ClientsCommand::Remove { id }) => commands::clients::remove(&id),
        Command::Link { name, phone, email, file, number } => {
            commands::link::run(commands::link::LinkRequest {
                name: &name,
                phone: &phone,
                email: &email,
                file: &file,
                number,
            })
        }
        Command::Stats => commands::stats::run(),
        Command::Share { customer_id, file_name } => {
            commands::share::run(&customer_id, &file_name)
        }
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

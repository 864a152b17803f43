pub mod api_client;
mod commands;
pub mod error;
mod utils;


use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::Result;

use commands::api::ServeArgs;

#[derive(Parser)]
#[command(name = "docuflow")]
#[command(author, version, about = "DocuFlow server and command-line client", long_about = None)]
pub struct Cli {
    /// API URL for client commands
    #[arg(long, global = true, env = "DOCUFLOW_API_URL")]
    pub api_url: Option<String>,

    /// Session token for client commands
    #[arg(long, global = true, env = "DOCUFLOW_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Team id for client commands
    #[arg(long, global = true, env = "DOCUFLOW_TEAM")]
    pub team: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Api {
        /// Host address to bind to (default: 0.0.0.0 or DOCUFLOW_HOST)
        #[arg(long)]
        host: Option<IpAddr>,
        /// Port to listen on (default: 3737 or DOCUFLOW_PORT)
        #[arg(short, long)]
        port: Option<u16>,
        /// Data directory (default: DOCUFLOW_HOME or ~/.local/share/docuflow)
        #[arg(long)]
        home: Option<PathBuf>,
        /// Increase log verbosity (-v info, -vv debug, -vvv trace)
        #[arg(short, long, action = clap::ArgAction::Count)]
        verbose: u8,
        /// Serve OpenAPI docs at /docs
        #[arg(long)]
        docs: bool,
    },
    /// Wiki documents
    Doc {
        #[command(subcommand)]
        command: DocCommands,
    },
    /// Time tracking
    Time {
        #[command(subcommand)]
        command: TimeCommands,
    },
    /// CRM records
    Crm {
        #[command(subcommand)]
        command: CrmCommands,
    },
}

#[derive(Subcommand)]
enum DocCommands {
    /// List documents
    List {
        /// Filter by project ID
        #[arg(long)]
        project: Option<String>,
        /// Parent document ID, or `root` for top-level pages
        #[arg(long)]
        parent: Option<String>,
        /// Output format (table or json)
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Show the page tree
    Tree {
        /// Restrict to one project
        #[arg(long)]
        project: Option<String>,
    },
}

#[derive(Subcommand)]
enum TimeCommands {
    /// Start a timer
    Start {
        /// Project ID
        #[arg(long)]
        project: Option<String>,
        /// What you are working on
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Stop the running timer
    Stop,
    /// Totals per project and day
    Report {
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,
        /// End date, exclusive (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
        /// Output format (table or json)
        #[arg(long, default_value = "table")]
        format: String,
    },
}

#[derive(Subcommand)]
enum CrmCommands {
    /// List clients
    Clients {
        /// Search name, company or email
        #[arg(long)]
        q: Option<String>,
        /// Filter by tag ID
        #[arg(long)]
        tag: Option<String>,
        /// Output format (table or json)
        #[arg(long, default_value = "table")]
        format: String,
    },
}

pub async fn run() -> Result<()> {
    // reqwest is built without a default TLS provider
    let _ = rustls::crypto::ring::default_provider().install_default();

    let cli = Cli::parse();

    let Some(command) = cli.command else {
        // Show help when no command provided
        let _ = Cli::parse_from(["docuflow", "--help"]);
        return Ok(());
    };

    let api_client = api_client::ApiClient::new(cli.api_url, cli.token, cli.team);
    let output = match command {
        Commands::Api {
            host,
            port,
            home,
            verbose,
            docs,
        } => {
            return commands::api::run(ServeArgs {
                host,
                port,
                home,
                verbosity: verbose,
                enable_docs: docs,
            })
            .await;
        }
        Commands::Doc { command } => match command {
            DocCommands::List {
                project,
                parent,
                format,
            } => {
                commands::doc::list_documents(
                    &api_client,
                    project.as_deref(),
                    parent.as_deref(),
                    &format,
                )
                .await
            }
            DocCommands::Tree { project } => {
                commands::doc::show_tree(&api_client, project.as_deref()).await
            }
        },
        Commands::Time { command } => match command {
            TimeCommands::Start {
                project,
                description,
            } => {
                commands::time::start(&api_client, project.as_deref(), description.as_deref())
                    .await
            }
            TimeCommands::Stop => commands::time::stop(&api_client).await,
            TimeCommands::Report { from, to, format } => {
                commands::time::report(&api_client, from.as_deref(), to.as_deref(), &format).await
            }
        },
        Commands::Crm { command } => match command {
            CrmCommands::Clients { q, tag, format } => {
                commands::crm::list_clients(&api_client, q.as_deref(), tag.as_deref(), &format)
                    .await
            }
        },
    }?;

    println!("{}", output);
    Ok(())
}

//! portfolio-agent CLI entry point

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use portfolio_agent::actions::{ActionEvent, ActionRouter};
use portfolio_agent::adapters::CliChannel;
use portfolio_agent::agent::{AgentSession, TurnRequest};
use portfolio_agent::auth::{CredentialChain, ProvideCredentials};
use portfolio_agent::ui;

#[derive(Parser)]
#[command(name = "portfolio-agent")]
#[command(about = "Chat with a knowledge-base and portfolio action agent")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the configuration file
    Init,

    /// Ask a single question
    Ask {
        /// Question to send to the agent
        #[arg(short, long)]
        message: String,

        /// Session ID (defaults to the configured one)
        #[arg(short, long)]
        session: Option<String>,

        /// Print the decoded trace after the answer
        #[arg(long)]
        trace: bool,
    },

    /// Interactive chat
    Chat {
        /// Session ID (defaults to a fresh random id)
        #[arg(short, long)]
        session: Option<String>,
    },

    /// End a remote session
    End {
        /// Session ID (defaults to the configured one)
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Handle a turn request given as JSON and print the reply JSON
    Invoke {
        /// File with {"sessionId", "question", "endSession"}; stdin when omitted
        #[arg(short, long)]
        event: Option<PathBuf>,
    },

    /// Run the local action handler
    Action {
        /// File with a full action event; stdin when neither this nor --path is given
        #[arg(short, long, conflicts_with = "path")]
        event: Option<PathBuf>,

        /// Api path to call (e.g. /createPortfolio)
        #[arg(short, long)]
        path: Option<String>,

        /// Parameters as name=value
        #[arg(long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// Action group name reported back in the envelope
        #[arg(long, default_value = "PortfolioCreator")]
        group: String,
    },

    /// Print the OpenAPI schema of the action group
    Schema {
        #[arg(long, default_value = "Portfolio Creator API")]
        title: String,
    },

    /// Show configuration and credential status
    Status,
}

fn parse_param(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .ok_or_else(|| format!("expected name=value, got '{}'", s))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            portfolio_agent::config::init()?;
            println!("\nNext steps:");
            println!("  1. Export AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY, or configure a profile");
            println!("  2. Chat: portfolio-agent chat");
        }

        Commands::Ask { message, session, trace } => {
            let config = portfolio_agent::config::load()?;
            let session_id = session.unwrap_or_else(|| config.session_id.clone());
            let agent = AgentSession::from_config(config)?;

            let reply = agent.invoke(&session_id, message.trim(), false).await;
            if !reply.is_success() {
                anyhow::bail!("{}", reply.response_text);
            }

            println!("{}", reply.response_text);
            if trace {
                println!("\n--- trace ---\n{}", reply.trace_log);
            }
        }

        Commands::Chat { session } => {
            let config = portfolio_agent::config::load()?;
            let session_id = session.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            ui::print_header("Chat", &format!("session {}  •  {}", session_id, config.region));
            println!("  Type /help for commands, exit to leave\n");

            let agent = AgentSession::from_config(config)?;
            let mut channel = CliChannel::new(agent, session_id);
            channel.run_interactive().await?;
        }

        Commands::End { session } => {
            let config = portfolio_agent::config::load()?;
            let session_id = session.unwrap_or_else(|| config.session_id.clone());
            let agent = AgentSession::from_config(config)?;

            let reply = agent.end_session(&session_id).await;
            if !reply.is_success() {
                anyhow::bail!("{}", reply.response_text);
            }
            ui::print_success(&format!("Session {} ended", session_id));
        }

        Commands::Invoke { event } => {
            let raw = read_input(event.as_ref())?;
            let turn: TurnRequest = serde_json::from_str(&raw).context("invalid turn request")?;

            let config = portfolio_agent::config::load()?;
            let agent = AgentSession::from_config(config)?;
            let reply = agent.handle(turn).await;
            println!("{}", serde_json::to_string_pretty(&reply)?);
        }

        Commands::Action { event, path, params, group } => {
            let event = match path {
                Some(api_path) => params
                    .into_iter()
                    .fold(ActionEvent::new(group, api_path), |ev, (k, v)| ev.with_parameter(k, v)),
                None => {
                    let raw = read_input(event.as_ref())?;
                    serde_json::from_str(&raw).context("invalid action event")?
                }
            };

            let router = ActionRouter::with_defaults();
            let response = router.handle(&event).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }

        Commands::Schema { title } => {
            let schema = ActionRouter::with_defaults().openapi_schema(&title);
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }

        Commands::Status => {
            let config = portfolio_agent::config::load()?;
            ui::print_header("Status", "");
            println!("Agent: {}", if config.agent_id.is_empty() { "not set" } else { config.agent_id.as_str() });
            println!("Alias: {}", if config.agent_alias_id.is_empty() { "not set" } else { config.agent_alias_id.as_str() });
            println!("Region: {}", config.region);
            println!("Endpoint: {}", config.endpoint());

            if let Err(e) = config.validate() {
                ui::print_warning(&e.to_string());
            }

            let chain = CredentialChain::default_chain(config.profile.as_deref());
            match chain.provide() {
                Ok(Some(creds)) => ui::print_success(&format!("Credentials: {}", creds.access_key_id)),
                Ok(None) => ui::print_error("Credentials: none found"),
                Err(e) => ui::print_error(&format!("Credentials: {}", e)),
            }
        }
    }

    Ok(())
}

fn read_input(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("reading {:?}", path)),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

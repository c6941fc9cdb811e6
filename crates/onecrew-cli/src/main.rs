use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use onecrew_core::identity::ParticipantKind;
use onecrew_infrastructure::{ConfigService, logging};

mod commands;

#[derive(Parser)]
#[command(name = "onecrew")]
#[command(about = "OneCrew messaging tools - identity and channel ids, configuration", long_about = None)]
struct Cli {
    /// Override the configured id prefix
    #[arg(long, global = true)]
    prefix: Option<String>,

    /// Use this config file instead of the platform default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate between domain identities and provider user ids
    Identity {
        #[command(subcommand)]
        action: IdentityAction,
    },
    /// Translate between conversation ids and channel references
    Channel {
        #[command(subcommand)]
        action: ChannelAction,
    },
    /// Inspect the messaging configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum IdentityAction {
    /// Print the provider user id for a domain id
    Encode {
        #[arg(long, default_value = "user")]
        kind: ParticipantKind,
        id: String,
    },
    /// Print the domain identity behind a provider user id
    Decode { provider_id: String },
}

#[derive(Subcommand)]
enum ChannelAction {
    /// Print the channel reference for a conversation id
    Encode { conversation_id: String },
    /// Print the conversation id behind a channel reference
    Decode { channel_ref: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration (API key masked)
    Show,
    /// Print the config file location
    Path,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let service = match cli.config {
        Some(path) => ConfigService::with_path(path),
        None => ConfigService::new()?,
    };
    let mut config = service.get_config()?;
    if let Some(prefix) = cli.prefix {
        config.id_prefix = prefix;
    }
    logging::init_tracing(&config.log_level);

    let translator = config.translator();
    match cli.command {
        Commands::Identity { action } => match action {
            IdentityAction::Encode { kind, id } => commands::identity::encode(&translator, kind, &id),
            IdentityAction::Decode { provider_id } => {
                commands::identity::decode(&translator, &provider_id)?
            }
        },
        Commands::Channel { action } => match action {
            ChannelAction::Encode { conversation_id } => {
                commands::channel::encode(&translator, &conversation_id)
            }
            ChannelAction::Decode { channel_ref } => {
                commands::channel::decode(&translator, &channel_ref)?
            }
        },
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show(&config)?,
            ConfigAction::Path => commands::config::path(&service),
        },
    }

    Ok(())
}

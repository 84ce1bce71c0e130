/*
[INPUT]:  CLI arguments, YAML configuration file, KEYBRIDGE__* environment
[OUTPUT]: Wallet login, session and provider-linking operations as JSON on stdout
[POS]:    Binary entry point
[UPDATE]: When changing CLI flags, subcommands, or startup flow
*/

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use keybridge_cli::commands::{self, with_hint};
use keybridge_cli::{LinkArgs, Settings};
use keybridge_core::KeybridgeService;

#[derive(Parser, Debug)]
#[command(name = "keybridge", version, about = "Wallet login and provider account linking")]
struct Cli {
    #[arg(long = "config", value_name = "PATH", global = true)]
    config_path: Option<PathBuf>,
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info", global = true)]
    log_level: String,
    #[arg(long = "data-dir", value_name = "DIR", global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign a message with a local EVM key
    Sign {
        #[arg(long)]
        private_key: String,
        #[arg(long)]
        message: String,
    },
    /// Sign a login message and exchange it for a bearer token
    Login {
        #[arg(long)]
        private_key: String,
        /// Defaults to a message carrying the wallet address and current time
        #[arg(long)]
        message: Option<String>,
    },
    /// Revoke a bearer token
    Logout {
        #[arg(long)]
        token: String,
    },
    /// Show the account behind a bearer token
    Profile {
        #[arg(long)]
        token: String,
    },
    /// Link a provider account to the wallet behind the token
    Link {
        #[arg(long)]
        token: String,
        #[arg(long = "phone", value_name = "PHONE")]
        phone_number: String,
        /// Skip the interactive prompt
        #[arg(long)]
        code: Option<String>,
        /// Fetch contacts right after linking, while the provider session is cached
        #[arg(long)]
        show_contacts: bool,
    },
    /// List provider contacts for the wallet behind the token
    Contacts {
        #[arg(long)]
        token: String,
    },
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(&args.log_level)?;

    let settings = Settings::load(args.config_path.as_deref()).context("load settings")?;

    let output = match args.command {
        Command::Sign {
            private_key,
            message,
        } => commands::sign(&private_key, &message).await?,
        Command::Config => settings.to_redacted_yaml()?,
        command => {
            let service = open_service(&settings, args.data_dir.as_deref(), &command).await?;
            run(&service, command).await?
        }
    };

    println!("{output}");
    Ok(())
}

async fn open_service(
    settings: &Settings,
    data_dir: Option<&std::path::Path>,
    command: &Command,
) -> Result<KeybridgeService> {
    let data_dir = settings.resolve_data_dir(data_dir)?;
    let core = settings.core();
    if matches!(command, Command::Link { .. } | Command::Contacts { .. }) {
        core.provider().map_err(with_hint)?;
    }

    info!(data_dir = %data_dir.display(), "opening keybridge");
    KeybridgeService::open(&data_dir, &core)
        .await
        .map_err(with_hint)
        .context("open keybridge service")
}

async fn run(service: &KeybridgeService, command: Command) -> Result<String> {
    match command {
        Command::Login {
            private_key,
            message,
        } => commands::login(service, &private_key, message).await,
        Command::Logout { token } => commands::logout(service, &token).await,
        Command::Profile { token } => commands::profile(service, &token).await,
        Command::Link {
            token,
            phone_number,
            code,
            show_contacts,
        } => {
            commands::link(
                service,
                LinkArgs {
                    token,
                    phone_number,
                    code,
                    show_contacts,
                },
            )
            .await
        }
        Command::Contacts { token } => commands::contacts(service, &token).await,
        Command::Sign { .. } | Command::Config => Err(anyhow!("command does not need a service")),
    }
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(log_level).context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("initialize tracing subscriber")?;
    Ok(())
}

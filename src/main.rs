use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use sitechat::{Config, Locale, QuotaGate, logging};

mod chat_cmd;

#[derive(Parser)]
#[command(name = "sitechat", version, about = "Describe a website, get a static site")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive site-building chat (default)
    #[command(name = "chat")]
    Chat,

    /// Show today's creation usage
    #[command(name = "quota")]
    Quota,

    /// View or modify config (~/.sitechat/config.toml)
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current config
    Show,
    /// Set a config value
    Set {
        /// Key to set (model, api_base_url, daily_limit, locale, site_language, contact_email)
        key: String,
        /// Value to set
        value: String,
    },
    /// Reset config to defaults
    Reset,
}

fn main() {
    let log_file = logging::init_tracing();
    if let Err(err) = run(log_file) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run(log_file: Option<PathBuf>) -> Result<()> {
    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let config = Config::load()?;
            chat_cmd::run(&config, log_file.as_deref())?;
        }
        Commands::Quota => {
            show_quota()?;
        }
        Commands::Config { action } => {
            handle_config(action)?;
        }
    }
    Ok(())
}

fn show_quota() -> Result<()> {
    let config = Config::load()?;
    let locale = Locale::load(config.locale);
    let mut quota = QuotaGate::open_default(config.daily_limit);
    println!("{}", chat_cmd::quota_status(&mut quota, &locale));
    Ok(())
}

fn handle_config(action: Option<ConfigAction>) -> Result<()> {
    match action {
        None | Some(ConfigAction::Show) => {
            let config = Config::load()?;
            println!("model = \"{}\"", config.model);
            println!("api_base_url = \"{}\"", config.api_base_url);
            println!("daily_limit = {}", config.daily_limit);
            println!("locale = \"{}\"", config.locale);
            println!("site_language = \"{}\"", config.site_language);
            println!("contact_email = \"{}\"", config.contact_email);
        }
        Some(ConfigAction::Set { key, value }) => {
            let mut config = Config::load().unwrap_or_default();
            config.set(&key, &value)?;
            let path = config.save()?;
            println!("saved to {}", path.display());
        }
        Some(ConfigAction::Reset) => {
            let config = Config::default();
            let path = config.save()?;
            println!("reset to defaults at {}", path.display());
        }
    }
    Ok(())
}

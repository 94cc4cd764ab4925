//! Command-line interface parsing and handling
//!
//! This module parses arguments, resolves settings, and dispatches to the
//! chat loop or one of the one-shot commands.

pub mod chat;
pub mod model_list;
pub mod persona_list;
pub mod say;
pub mod strings;


use std::error::Error;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cli::chat::run_chat;
use crate::cli::model_list::list_models;
use crate::cli::persona_list::{list_personas, unknown_persona_message};
use crate::cli::say::run_say;
use crate::cli::strings::Strings;
use crate::core::backend::{BackendConfig, OllamaClient};
use crate::core::config::{Config, ConfigError, ResolvedSettings, SettingsOverrides};
use crate::core::persona::PersonaRegistry;
use crate::core::session::{SessionError, SessionManager};

/// Environment variable holding the tracing filter (e.g. `debug`, `newhorizon=trace`).
pub const LOG_ENV: &str = "NEWHORIZON_LOG";

#[derive(Parser)]
#[command(name = "newhorizon")]
#[command(version, long_version = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("VERGEN_GIT_SHA"),
    ", built ",
    env!("VERGEN_BUILD_DATE"),
    ")"
))]
#[command(about = "Chat with a local Ollama model through switchable personas")]
#[command(
    long_about = "NewHorizon is a terminal chat front-end for a locally hosted Ollama server. \
Replies stream in as they are generated, and one of four personas (nova, byte, muse, oracle) \
shapes the assistant's behavior.\n\n\
Environment Variables:\n\
  OLLAMA_HOST       Backend address used when no base-url is configured\n\
  NEWHORIZON_LOG    Diagnostic log filter written to stderr (default: warn)\n\n\
Chat commands:\n\
  /clear            Clear the conversation history\n\
  /persona <id>     Switch persona (clears history)\n\
  /personas         List personas\n\
  /status           Check whether Ollama is reachable\n\
  /quit             Leave the chat"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Ollama model to chat with
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Persona to start with
    #[arg(short = 'p', long, global = true, value_name = "PERSONA")]
    pub persona: Option<String>,

    /// Interface language for persona names and notices (zh, en)
    #[arg(long, global = true, value_name = "LANG")]
    pub lang: Option<String>,

    /// Ollama base URL (e.g. http://localhost:11434)
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the interactive chat (default)
    Chat,
    /// Send a single message and print the streamed reply
    Say {
        /// Message to send
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        prompt: Vec<String>,
    },
    /// Check whether the Ollama server is reachable
    Status,
    /// List available personas
    Personas,
    /// List models installed on the Ollama server
    Models,
    /// Show the current configuration
    Config,
    /// Set a configuration value
    Set {
        /// Configuration key (model, base-url, language, persona, show-welcome)
        key: String,
        /// Value to set for the key
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Unset a configuration value
    Unset {
        /// Configuration key to unset
        key: String,
    },
}

impl Args {
    pub fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            language: self.lang.clone(),
            persona: self.persona.clone(),
        }
    }
}

pub fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    // Diagnostics go to stderr so they never interleave with streamed replies.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn resolve_settings(args: &Args, config: &Config) -> Result<ResolvedSettings, ConfigError> {
    let ollama_host = std::env::var("OLLAMA_HOST").ok();
    config.resolve(&args.overrides(), ollama_host.as_deref())
}

fn build_session(
    settings: &ResolvedSettings,
    registry: Arc<PersonaRegistry>,
) -> Result<SessionManager<OllamaClient>, Box<dyn Error>> {
    let client = OllamaClient::new(BackendConfig::new(&settings.base_url, &settings.model))?;
    match SessionManager::with_persona(client, registry.clone(), &settings.persona) {
        Ok(session) => Ok(session),
        Err(SessionError::InvalidPersona(id)) => {
            Err(unknown_persona_message(&registry, &id).into())
        }
        Err(err) => Err(err.into()),
    }
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let registry = Arc::new(PersonaRegistry::builtin());

    match args.command {
        Some(Commands::Set { ref key, ref value }) => {
            let mut config = Config::load()?;
            config.set_value(key, &value.join(" "))?;
            config.save()?;
            println!("✅ Set {key} to: {}", value.join(" ").trim());
            Ok(())
        }
        Some(Commands::Unset { ref key }) => {
            let mut config = Config::load()?;
            config.unset_value(key)?;
            config.save()?;
            println!("✅ Unset {key}");
            Ok(())
        }
        Some(Commands::Config) => {
            let config = Config::load()?;
            let settings = resolve_settings(&args, &config)?;
            config.print_all(&settings);
            Ok(())
        }
        Some(Commands::Personas) => {
            let config = Config::load()?;
            let settings = resolve_settings(&args, &config)?;
            list_personas(&registry, &settings)
        }
        Some(Commands::Models) => {
            let config = Config::load()?;
            let settings = resolve_settings(&args, &config)?;
            list_models(&settings).await
        }
        Some(Commands::Status) => {
            let config = Config::load()?;
            let settings = resolve_settings(&args, &config)?;
            let session = build_session(&settings, registry)?;
            let strings = Strings::for_language(&settings.language);
            let online = session.check_availability().await;
            println!("{} ({})", strings.status(online), settings.base_url);
            if !online {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Commands::Say { ref prompt }) => {
            let config = Config::load()?;
            let settings = resolve_settings(&args, &config)?;
            let session = build_session(&settings, registry)?;
            run_say(session, prompt).await
        }
        Some(Commands::Chat) | None => {
            let config = Config::load()?;
            let settings = resolve_settings(&args, &config)?;
            let session = build_session(&settings, registry)?;
            run_chat(session, &settings).await
        }
    }
}

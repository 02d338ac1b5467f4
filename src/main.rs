#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::too_many_lines,
    clippy::uninlined_format_args,
    dead_code
)]

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use console::style;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

mod agent;
mod config;
mod gateway;
mod providers;
mod sessions;
mod voice;

use config::Config;

fn parse_temperature(s: &str) -> std::result::Result<f64, String> {
    let t: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if !(0.0..=2.0).contains(&t) {
        return Err("temperature must be between 0.0 and 2.0".to_string());
    }
    Ok(t)
}

/// `parley` - ask anything, keep the thread.
#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(version)]
#[command(about = "A small conversational front-end for hosted chat models.", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    config_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start a chat session
    #[command(long_about = "\
Start a chat session.

Launches an interactive conversation with the configured provider. \
Use --message for single-shot queries without entering interactive mode. \
Inside the session, /clear resets the conversation and /quit exits.

Examples:
  parley chat                              # interactive session
  parley chat -m \"What's 2+2?\"             # single message
  parley chat -p openai --model gpt-4o-mini")]
    Chat {
        /// Single message mode (don't enter interactive mode)
        #[arg(short, long)]
        message: Option<String>,

        /// Session id to continue; a fresh id is generated when omitted
        #[arg(short, long)]
        session: Option<String>,

        /// Provider to use (groq, openai, custom:<URL>)
        #[arg(short, long)]
        provider: Option<String>,

        /// Model to use
        #[arg(long)]
        model: Option<String>,

        /// Temperature (0.0 - 2.0)
        #[arg(short, long, value_parser = parse_temperature)]
        temperature: Option<f64>,
    },

    /// Start the HTTP gateway
    #[command(long_about = "\
Start the HTTP gateway.

Serves the chat and voice endpoints over HTTP. Bind address defaults \
to the values in your config file (gateway.host / gateway.port).

Examples:
  parley gateway                  # use config defaults
  parley gateway -p 8080          # listen on port 8080
  parley gateway --host 0.0.0.0   # bind to all interfaces")]
    Gateway {
        /// Port to listen on; defaults to config gateway.port
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to; defaults to config gateway.host
        #[arg(long)]
        host: Option<String>,
    },

    /// Show configuration summary
    Status,

    /// List supported model providers
    Providers,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install default crypto provider for Rustls TLS before any client is built.
    if let Err(e) = rustls::crypto::ring::default_provider().install_default() {
        eprintln!("Warning: Failed to install default crypto provider: {e:?}");
    }

    let cli = Cli::parse();

    if let Some(config_dir) = &cli.config_dir {
        if config_dir.trim().is_empty() {
            bail!("--config-dir cannot be empty");
        }
        std::env::set_var("PARLEY_CONFIG_DIR", config_dir);
    }

    // Initialize logging - respects RUST_LOG env var, defaults to INFO
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let mut config = Config::load_or_init().await?;
    config.apply_env_overrides();

    match cli.command {
        Commands::Chat {
            message,
            session,
            provider,
            model,
            temperature,
        } => {
            if let Some(provider) = provider {
                config.default_provider = Some(provider);
            }
            if let Some(model) = model {
                config.default_model = Some(model);
            }
            if let Some(temperature) = temperature {
                config.default_temperature = temperature;
            }
            run_chat(&config, message, session).await
        }

        Commands::Gateway { port, host } => {
            let port = port.unwrap_or(config.gateway.port);
            let host = host.unwrap_or_else(|| config.gateway.host.clone());
            info!("Starting parley gateway on {host}:{port}");
            gateway::run_gateway(&host, port, config).await
        }

        Commands::Status => {
            println!("parley status");
            println!();
            println!("Version:     {}", env!("CARGO_PKG_VERSION"));
            println!("Config:      {}", config.config_path.display());
            println!();
            println!(
                "Provider:    {}",
                config.default_provider.as_deref().unwrap_or("groq")
            );
            println!(
                "Model:       {}",
                config.default_model.as_deref().unwrap_or("(default)")
            );
            println!("Temperature: {}", config.default_temperature);
            println!();
            println!(
                "History:     {} turns per request{}",
                config.agent.max_history_turns,
                if config.agent.max_history_turns == 0 {
                    " (unlimited)"
                } else {
                    ""
                }
            );
            println!("Timeout:     {}s per completion", config.agent.request_timeout_secs);
            println!();
            println!(
                "Gateway:     {}:{}",
                config.gateway.host, config.gateway.port
            );
            println!(
                "Voice:       {}",
                if config.voice.enabled { "enabled" } else { "disabled" }
            );

            Ok(())
        }

        Commands::Providers => {
            let providers = providers::list_providers();
            let current = config
                .default_provider
                .as_deref()
                .unwrap_or("groq")
                .trim()
                .to_ascii_lowercase();
            println!("Supported providers ({} total):\n", providers.len());
            for p in &providers {
                let marker = if p.name.eq_ignore_ascii_case(&current) {
                    " (active)"
                } else {
                    ""
                };
                println!("  {:<8} {}{}  [key: {}]", p.name, p.display_name, marker, p.key_env);
            }
            println!("\n  custom:<URL>   Any OpenAI-compatible endpoint");
            Ok(())
        }
    }
}

async fn run_chat(config: &Config, message: Option<String>, session: Option<String>) -> Result<()> {
    let state = gateway::build_state(config)?;
    let orchestrator = state.orchestrator;

    let session_id = session.unwrap_or_else(|| format!("cli-{}", uuid::Uuid::new_v4()));

    // Single-shot mode: one exchange, then exit.
    if let Some(message) = message {
        let trimmed = message.trim();
        if trimmed.is_empty() {
            bail!("message must not be empty");
        }
        let reply = orchestrator.respond(&session_id, trimmed).await?;
        println!("{reply}");
        return Ok(());
    }

    println!(
        "{} {} · session {}",
        style("parley").cyan().bold(),
        orchestrator.model(),
        style(&session_id).dim()
    );
    println!("{}", style("/clear resets the conversation, /quit exits").dim());

    let theme = dialoguer::theme::ColorfulTheme::default();
    loop {
        let line: String = dialoguer::Input::with_theme(&theme)
            .with_prompt("you")
            .allow_empty(true)
            .interact_text()?;

        let trimmed = line.trim();
        // Empty input never reaches the orchestrator.
        if trimmed.is_empty() {
            continue;
        }

        match trimmed {
            "/quit" | "/exit" => break,
            "/clear" => {
                orchestrator.clear(&session_id).await?;
                println!("{}", style("conversation cleared").dim());
                continue;
            }
            _ => {}
        }

        match orchestrator.respond(&session_id, trimmed).await {
            Ok(reply) => println!("{} {reply}", style("assistant").green().bold()),
            // A failed exchange keeps the session continuable; just report it.
            Err(err) => eprintln!("{} {err}", style("error").red().bold()),
        }
    }

    Ok(())
}

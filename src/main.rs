//! llm-council - ask a council of LLMs the same question
//!
//! Routes each council member to its vendor API or the OpenRouter relay and
//! prints every member's answer side by side.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use llm_council::config::parse_model_list;
use llm_council::{Config, Council, Message};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(long, default_value_t = false, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask every council member the same question
    Ask {
        /// The question to put to the council
        prompt: String,

        /// System instruction sent ahead of the question
        #[arg(short, long)]
        system: Option<String>,

        /// Comma-separated model ids (defaults to the configured council)
        #[arg(short, long)]
        models: Option<String>,

        /// Per-member timeout in seconds
        #[arg(short, long)]
        timeout: Option<u64>,
    },

    /// Show which providers are available and the current routing mode
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = if args.debug { "debug" } else { "info" };
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let mut config = Config::load(args.config.as_deref())?;

    match args.command {
        Command::Ask {
            prompt,
            system,
            models,
            timeout,
        } => {
            if let Some(secs) = timeout {
                config.council.timeout_secs = secs;
            }
            let models = models
                .map(|m| parse_model_list(&m))
                .unwrap_or_else(|| config.council.models.clone());
            if models.is_empty() {
                anyhow::bail!("No council models given");
            }

            let mut messages = Vec::new();
            if let Some(system) = system {
                messages.push(Message::system(system));
            }
            messages.push(Message::user(prompt));

            let council = Council::from_config(&config);
            let responses = council.query_all(&models, &messages).await;

            for (model, outcome) in responses.iter() {
                println!("=== {} ===", model);
                match outcome {
                    Ok(result) => println!("{}\n", result.content.as_deref().unwrap_or("")),
                    Err(e) => println!("(no answer: {})\n", e),
                }
            }

            if responses.succeeded() == 0 {
                anyhow::bail!("No council member answered");
            }
        }
        Command::Status => {
            let council = Council::from_config(&config);
            let status = council.provider_status();

            println!("{}", serde_json::to_string_pretty(&status)?);
            println!("council: {}", config.council.models.join(", "));
            println!("chairman: {}", config.council.chairman);
            println!("timeout: {:?}", config.council.timeout());
        }
    }

    Ok(())
}

mod configuration;
mod error;

use anyhow::Result;
use clap::Parser;
use console::style;
use std::io::{self, Write};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use configuration::Settings;
use parley::agent::Agent;
use parley::models::message::Message;
use parley::providers::base::{ChatOptions, Usage};
use parley::providers::factory::{get_provider, ProviderType};

const DEFAULT_SYSTEM: &str = "You are a helpful assistant.";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// The message to send
    message: String,

    /// Provider to use (anthropic or openai), overrides PARLEY_PROVIDER__TYPE
    #[arg(short, long)]
    provider: Option<ProviderType>,

    /// Model to use, overrides PARLEY_PROVIDER__MODEL
    #[arg(short, long)]
    model: Option<String>,

    /// System prompt
    #[arg(short, long)]
    system: Option<String>,

    /// Wait for the complete reply instead of streaming it
    #[arg(long)]
    no_stream: bool,

    /// Let the model read and write local files
    #[arg(long)]
    files: bool,

    #[arg(long)]
    max_tokens: Option<i32>,

    #[arg(long)]
    temperature: Option<f32>,
}

impl Cli {
    fn options(&self) -> ChatOptions {
        let system = self.system.as_deref().unwrap_or(DEFAULT_SYSTEM);
        let mut options = if self.files {
            ChatOptions::file_assistant(system)
        } else {
            ChatOptions::new().with_system(system)
        };
        if let Some(max_tokens) = self.max_tokens {
            options = options.with_max_tokens(max_tokens);
        }
        if let Some(temperature) = self.temperature {
            options = options.with_temperature(temperature);
        }
        options
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.provider, cli.model.clone())?;
    let max_round_trips = settings.agent.max_round_trips;
    let provider = get_provider(settings.provider.into_config()?)?;

    let messages = vec![Message::user().with_text(&cli.message)];
    let options = cli.options();

    let response = if cli.files {
        // tool round trips need complete responses
        let agent = Agent::new(provider).with_max_round_trips(max_round_trips);
        let response = agent.reply(&messages, &options).await?;
        println!("{}", response.text());
        response
    } else if cli.no_stream {
        let response = provider.complete(&messages, &options).await?;
        println!("{}", response.text());
        response
    } else {
        let options = options.streaming(Arc::new(|delta: &str| {
            print!("{}", delta);
            let _ = io::stdout().flush();
        }));
        let response = provider.complete(&messages, &options).await?;
        println!();
        response
    };

    print_usage(&response.usage);
    Ok(())
}

fn print_usage(usage: &Usage) {
    if usage.is_empty() {
        return;
    }
    let field = |count: Option<i32>| count.map_or("-".to_string(), |c| c.to_string());
    println!(
        "{}",
        style(format!(
            "tokens: {} in, {} out, {} total",
            field(usage.input_tokens),
            field(usage.output_tokens),
            field(usage.total_tokens)
        ))
        .dim()
    );
}

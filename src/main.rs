use anyhow::Result;
use clap::{Parser, Subcommand};
use ollama_chat::Config;
use tracing_subscriber::EnvFilter;

mod commands;
mod slash;

#[derive(Parser)]
#[command(name = "ollama-chat")]
#[command(version)]
#[command(about = "Chat with models served by a local Ollama instance", long_about = None)]
struct Cli {
    /// Inference service address (overrides config and OLLAMA_API_URL)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Model to use instead of the first one discovered
    #[arg(long, global = true)]
    model: Option<String>,

    /// Verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat (default)
    Chat,
    /// List models available on the server
    Models,
    /// Ask a single question without keeping history
    Ask {
        #[arg(required = true)]
        prompt: Vec<String>,
    },
    /// Check that the server answers end to end
    Check,
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load()?.with_overrides(cli.endpoint, cli.model);
    config.validate()?;

    match cli.command {
        None | Some(Commands::Chat) => commands::chat(&config).await,
        Some(Commands::Models) => commands::list_models(&config).await,
        Some(Commands::Ask { prompt }) => commands::ask(&config, &prompt.join(" ")).await,
        Some(Commands::Check) => commands::check(&config).await,
    }
}

mod config;
mod error;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use runtime::{CATALOG, QueryConfig, run_query, run_query_cancellable};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use config::Config;
use error::{Error, Result};

#[derive(Parser)]
#[command(name = "fxanalyst")]
#[command(about = "Forex market analysis with tool-calling LLMs", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./fxanalyst.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Model provider: gemini, openai or claude
    #[arg(long, global = true)]
    provider: Option<String>,

    /// Model name override
    #[arg(long, global = true)]
    model: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the answer
    Ask {
        /// The question, e.g. "How is EUR/USD trending?"
        #[arg(required = true)]
        prompt: Vec<String>,
    },
    /// Ask questions interactively
    Chat,
    /// List the market data tools offered to the model
    Tools,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::discover(cli.config.as_deref())?;
    config.apply_env();
    if let Some(provider) = cli.provider {
        config.provider = provider;
    }
    if let Some(model) = cli.model {
        config.model = Some(model);
    }

    match cli.command {
        Some(Commands::Ask { prompt }) => {
            cmd_ask(&prompt.join(" "), &config.query_config()).await
        }
        Some(Commands::Chat) | None => cmd_chat(&config).await,
        Some(Commands::Tools) => {
            cmd_tools();
            Ok(())
        }
    }
}

/// Logs go to stderr so stdout carries only answers.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn cmd_ask(prompt: &str, query: &QueryConfig) -> Result<()> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(Error::EmptyPrompt);
    }

    let cancel = CancellationToken::new();
    let answer = answer_or_interrupt(
        run_query_cancellable(prompt, query, &cancel),
        second_interrupt(&cancel),
    )
    .await?;
    println!("{answer}");
    Ok(())
}

/// The first Ctrl+C stops the loop at the next turn boundary; this resolves
/// on the second one.
async fn second_interrupt(cancel: &CancellationToken) {
    if tokio::signal::ctrl_c().await.is_err() {
        return std::future::pending().await;
    }
    cancel.cancel();
    eprintln!("Stopping after the current turn. Press Ctrl+C again to quit.");
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

async fn answer_or_interrupt(
    answer: impl Future<Output = String>,
    interrupted: impl Future<Output = ()>,
) -> Result<String> {
    tokio::select! {
        answer = answer => Ok(answer),
        () = interrupted => Err(Error::Interrupted),
    }
}

async fn cmd_chat(config: &Config) -> Result<()> {
    let query = config.query_config();
    println!("fxanalyst v{}", env!("CARGO_PKG_VERSION"));
    println!("Provider: {}", query.provider);
    println!("Type 'quit' or Ctrl+D to exit.\n");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            // EOF
            break;
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "quit" || input == "exit" {
            break;
        }

        // Each question is answered independently.
        let answer = run_query(input, &query).await;
        println!("\n{answer}\n");
    }

    Ok(())
}

fn cmd_tools() {
    let width = CATALOG.iter().map(|tool| tool.name.len()).max().unwrap_or(0);
    for tool in CATALOG {
        println!(
            "{:<width$}  {:<14}  {}",
            tool.name,
            tool.function.code(),
            tool.description
        );
    }
}

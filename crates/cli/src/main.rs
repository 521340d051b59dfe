mod config;
mod error;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use maps::{GeoLookupServer, RouteServer, Toolbox};
use runtime::{Assistant, MapToolHost, OpenAiBackend, Timed, ToolCall};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use error::{Error, Result};

type MapAssistant = Assistant<OpenAiBackend, Timed<MapToolHost>>;

#[derive(Parser)]
#[command(name = "mapassist")]
#[command(about = "Ask a model about places, routes and travel times", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./mapassist.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat
    Chat {
        /// Ask before every tool call
        #[arg(long)]
        confirm: bool,
    },
    /// Ask one question and print the answer
    Ask {
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// Print the tool specs as JSON
    Tools,
    /// Invoke one tool directly
    Call {
        /// Tool name, e.g. forward_geocode
        tool: String,
        /// Arguments as a JSON object
        #[arg(default_value = "{}")]
        args: String,
    },
    /// Serve the tools over MCP on stdin/stdout
    Serve,
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Logs go to stderr so stdout carries only answers, JSON and MCP frames.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::resolve(cli.config.as_deref())?;

    match cli.command {
        Some(Commands::Chat { confirm }) => cmd_chat(&config, confirm).await,
        None => cmd_chat(&config, false).await,
        Some(Commands::Ask { query }) => cmd_ask(&config, &query.join(" ")).await,
        Some(Commands::Tools) => cmd_tools(&config),
        Some(Commands::Call { tool, args }) => cmd_call(&config, &tool, &args).await,
        Some(Commands::Serve) => cmd_serve(&config).await,
    }
}

async fn cmd_chat(config: &Config, confirm: bool) -> Result<()> {
    let mut assistant = assistant(config)?;
    if confirm {
        assistant = assistant.with_approval(approve);
    }

    println!("mapassist v{}", env!("CARGO_PKG_VERSION"));
    println!("Model: {}", config.model.model);
    println!("Type 'quit' or Ctrl+D to exit.\n");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input, "quit" | "exit" | "bye") {
            break;
        }

        match assistant.chat(input).await {
            Ok(reply) => println!("\n{}\n", reply.text),
            Err(e) => eprintln!("Error: {e}\n"),
        }
    }

    let usage = assistant.total_usage();
    info!(
        input_tokens = usage.input_tokens,
        output_tokens = usage.output_tokens,
        "chat ended"
    );
    Ok(())
}

async fn cmd_ask(config: &Config, query: &str) -> Result<()> {
    let mut assistant = assistant(config)?;
    let reply = assistant.chat(query).await?;
    println!("{}", reply.text);
    Ok(())
}

fn cmd_tools(config: &Config) -> Result<()> {
    let specs = toolbox(config)?.specs();
    println!("{}", serde_json::to_string_pretty(&specs)?);
    Ok(())
}

async fn cmd_call(config: &Config, tool: &str, args: &str) -> Result<()> {
    let args: Value = serde_json::from_str(args).map_err(Error::Arguments)?;
    match toolbox(config)?.call(tool, args).await {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(e) => {
            println!("{}", serde_json::to_string_pretty(&e.to_json())?);
            Err(Error::ToolFailed { kind: e.kind() })
        }
    }
}

async fn cmd_serve(config: &Config) -> Result<()> {
    let server = mcp::Server::new(toolbox(config)?);
    server.serve_stdio().await?;
    Ok(())
}

fn toolbox(config: &Config) -> Result<Toolbox> {
    let geo = GeoLookupServer::new(config.geocoding_params(), &config.geocoding.overpass_url)?;
    let route = RouteServer::new(config.routing_params())?;
    Ok(Toolbox::new(Arc::new(geo), Arc::new(route)))
}

/// Only `chat` and `ask` need a model, so only they need its key.
fn assistant(config: &Config) -> Result<MapAssistant> {
    let backend = config.backend().ok_or(Error::MissingApiKey)?;
    let host = Timed::new(MapToolHost::new(toolbox(config)?), config.tool_timeout());
    let mut assistant =
        Assistant::new(backend, host).with_max_rounds(config.model.max_tool_rounds);
    if let Some(system) = &config.model.system_prompt {
        assistant = assistant.with_system(system.as_str());
    }
    Ok(assistant)
}

/// y/n prompt on stderr; anything but `y` or `yes` rejects.
fn approve(call: &ToolCall) -> bool {
    eprint!("Run {} {}? [y/N] ", call.name, call.input);
    if io::stderr().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
        Err(_) => false,
    }
}

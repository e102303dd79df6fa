use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

use kashflow::config::Config;
use kashflow::fetch::{configure_simple_fetch, HttpTransport, RequestOptions};
use kashflow::flow::{create_flow, render, JsonLinesView};
use kashflow::lifecycle::Status;
use kashflow::logging::init_tracing;

#[derive(Debug, Parser)]
#[command(name = "kashflow", version, about = "Run a fetch through a flow and print every state")]
struct Cli {
    /// Config file (default: ~/.config/kashflow/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch a JSON resource into a namespace of the state
    Fetch {
        url: String,

        /// Namespace the result is stored under
        #[arg(short, long, default_value = "data")]
        namespace: String,

        /// HTTP method
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,

        /// JSON request body
        #[arg(short = 'd', long)]
        body: Option<String>,

        /// Extra header, `name: value`
        #[arg(short = 'H', long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,

        /// Treat non-2xx responses as failures
        #[arg(long)]
        fail_on_status: bool,
    },
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected 'name: value', got '{}'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("header name is empty".to_string());
    }
    Ok((name.to_string(), value.trim().to_string()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    init_tracing(&config.logging, cli.verbose);

    match cli.command {
        Command::Fetch {
            url,
            namespace,
            method,
            body,
            headers,
            fail_on_status,
        } => {
            config.fetch.error_on_status |= fail_on_status;
            let mut options = RequestOptions::default().with_method(method);
            if let Some(body) = body {
                let body = serde_json::from_str(&body).context("--body is not valid JSON")?;
                options = options.with_body(body);
            }
            for (name, value) in headers {
                options = options.with_header(name, value);
            }

            let status = run_fetch(&config, &namespace, &url, options).await?;
            if status == Status::Errored {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

/// Drive one fetch through a fresh flow, printing each state as JSON.
async fn run_fetch(
    config: &Config,
    namespace: &str,
    url: &str,
    options: RequestOptions,
) -> anyhow::Result<Status> {
    let flow = create_flow(Vec::new());
    render(&flow, JsonLinesView::new(std::io::stdout()));

    let (settled_tx, mut settled_rx) = mpsc::unbounded_channel();
    let watched = namespace.to_string();
    flow.subscribe(move |state| {
        if let Some(context) = state.lifecycle(&watched) {
            if context.is_settled() {
                let _ = settled_tx.send(context.status);
            }
        }
    });

    flow.start();

    let transport = Arc::new(HttpTransport::from_config(&config.fetch)?);
    let fetcher = configure_simple_fetch(namespace, flow.dispatcher(), transport)?;
    fetcher.dispatch_fetch(url, options);

    settled_rx
        .recv()
        .await
        .ok_or_else(|| anyhow!("flow closed before the fetch settled"))
}

use clap::Parser;
use futures_util::future::join_all;
use serde_json::{json, Value};

use blest::config::{load_config, ClientConfig};
use blest::HttpClient;

#[derive(Parser)]
#[command(name = "blest-cli")]
#[command(about = "Send batched calls to a blest server", long_about = None)]
struct Cli {
    /// Server endpoint (overrides the config file)
    #[arg(short, long)]
    url: Option<String>,

    /// TOML configuration file; only the [client] table is used
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Extra header sent with every batch, as NAME=VALUE
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Calls to send, as ROUTE or ROUTE:{"json":"body"}
    #[arg(required = true)]
    calls: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?.client,
        None => ClientConfig::default(),
    };
    if let Some(url) = cli.url {
        config.endpoint = url;
    }
    for header in &cli.headers {
        let (name, value) = header
            .split_once('=')
            .ok_or_else(|| format!("Header '{header}' should look like NAME=VALUE"))?;
        config.headers.insert(name.trim().to_string(), value.trim().to_string());
    }

    let mut calls = Vec::with_capacity(cli.calls.len());
    for call in &cli.calls {
        calls.push(parse_call(call)?);
    }

    let client = HttpClient::new(config)?;
    let waiters: Vec<_> = calls
        .iter()
        .map(|(route, body)| client.request(route.clone(), body.clone(), None))
        .collect();

    let mut failed = false;
    for ((route, _), outcome) in calls.iter().zip(join_all(waiters).await) {
        let line = match outcome {
            Ok(result) => json!({ "route": route, "result": result }),
            Err(err) => {
                failed = true;
                json!({ "route": route, "error": err.to_string() })
            }
        };
        println!("{}", serde_json::to_string_pretty(&line)?);
    }

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

fn parse_call(raw: &str) -> Result<(String, Option<Value>), Box<dyn std::error::Error>> {
    match raw.split_once(':') {
        Some((route, body)) => {
            let body: Value = serde_json::from_str(body)?;
            Ok((route.to_string(), Some(body)))
        }
        None => Ok((raw.to_string(), None)),
    }
}

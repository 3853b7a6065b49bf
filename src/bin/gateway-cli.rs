use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Management CLI for the inference gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// API key sent with admin requests
    #[arg(short, long, env = "GATEWAY_API_KEY")]
    key: String,

    /// Header carrying the API key
    #[arg(long, default_value = "X-API-Key")]
    header: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reload the gateway configuration from disk
    Reload {
        #[arg(long, default_value = "/config/reload")]
        path: String,
    },
    /// Generate and persist a new API key
    NewKey {
        #[arg(long, default_value = "/config/new-key")]
        path: String,
    },
    /// Print the Prometheus metrics
    Metrics {
        #[arg(long, default_value = "/metrics")]
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_bytes(cli.header.as_bytes())?,
        HeaderValue::from_str(&cli.key)?,
    );

    let path = match &cli.command {
        Commands::Reload { path } | Commands::NewKey { path } | Commands::Metrics { path } => path,
    };

    let res = client
        .get(format!("{}{}", cli.url.trim_end_matches('/'), path))
        .headers(headers)
        .send()
        .await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        eprintln!("Response: {}", text.trim_end());
        std::process::exit(1);
    }

    println!("{}", text.trim_end());
    Ok(())
}

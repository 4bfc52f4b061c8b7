use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, SEC_WEBSOCKET_PROTOCOL};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "stack-cli")]
#[command(about = "Management CLI for the elos stack", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Caller id
    #[arg(long)]
    id: String,

    /// Caller key
    #[arg(long)]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a user; the response carries its id and key
    CreateUser {
        #[arg(long)]
        name: String,
    },
    /// Create an event owned by the caller
    CreateEvent {
        #[arg(long)]
        name: String,
    },
    /// List the caller's events
    ListEvents,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        SEC_WEBSOCKET_PROTOCOL,
        HeaderValue::from_str(&format!("{}-{}", cli.id, cli.key))?,
    );

    let res = match cli.command {
        Commands::CreateUser { name } => {
            client
                .post(format!("{}/v1/users/", cli.url))
                .headers(headers)
                .form(&[("name", name)])
                .send()
                .await?
        }
        Commands::CreateEvent { name } => {
            client
                .post(format!("{}/v1/events/", cli.url))
                .headers(headers)
                .form(&[("name", name)])
                .send()
                .await?
        }
        Commands::ListEvents => {
            client
                .get(format!("{}/v1/events/", cli.url))
                .headers(headers)
                .send()
                .await?
        }
    };
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    let rendered = match serde_json::from_str::<Value>(&text) {
        Ok(json) => serde_json::to_string_pretty(&json)?,
        Err(_) => text,
    };

    if status.is_success() {
        println!("{}", rendered);
    } else {
        eprintln!("Error: server returned status {}", status);
        eprintln!("{}", rendered);
        std::process::exit(1);
    }
    Ok(())
}

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

use connector_hub::config::loader::read_config;
use connector_hub::validation::validate_connector_config;

#[derive(Parser)]
#[command(name = "hubctl")]
#[command(about = "Management CLI for the connector hub", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, default_value = "admin-secret-key")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check hub status
    Status,
    /// List services with state and metrics
    Services,
    /// Connect a registered service
    Connect { service_id: String },
    /// Disconnect a service
    Disconnect { service_id: String },
    /// Run the probe sequence against a service
    Test { service_id: String },
    /// Show the latest probe results for a service
    Results { service_id: String },
    /// Validate a configuration file without contacting the hub
    Validate { config: PathBuf },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let base = cli.url.trim_end_matches('/').to_string();

    let (post, path) = match cli.command {
        Commands::Validate { config } => return validate(&config),
        Commands::Status => (false, "/admin/status".to_string()),
        Commands::Services => (false, "/admin/services".to_string()),
        Commands::Connect { service_id } => (true, format!("/admin/services/{service_id}/connect")),
        Commands::Disconnect { service_id } => (true, format!("/admin/services/{service_id}/disconnect")),
        Commands::Test { service_id } => (true, format!("/admin/services/{service_id}/test")),
        Commands::Results { service_id } => (false, format!("/admin/services/{service_id}/tests")),
    };

    let client = reqwest::Client::new();
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let url = format!("{base}{path}");
    let request = if post { client.post(url) } else { client.get(url) };
    let res = request.headers(headers).send().await?;
    print_response(res).await
}

fn validate(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = read_config(path)?;

    let mut invalid = 0;
    for policy in &config.services {
        let result = validate_connector_config(&policy.connector);
        if !result.is_valid {
            invalid += 1;
        }
        println!("{}", policy.service_id());
        println!("{}", serde_json::to_string_pretty(&result)?);
    }

    println!(
        "{}: {} services, {} invalid",
        path.display(),
        config.services.len(),
        invalid
    );
    if invalid > 0 {
        std::process::exit(1);
    }
    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

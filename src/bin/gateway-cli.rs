use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use gateway_sdk::{ClientConfig, FileStore, GatewayClient, HttpError, Payload};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Call the admission gateway with a stored bearer credential", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Credential file (JSON object of named slots).
    #[arg(short, long, default_value = ".gateway-credentials.json")]
    store: PathBuf,

    /// Slot holding the bearer credential.
    #[arg(short = 'k', long, default_value = "AUTH_TOKEN")]
    token_key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// GET a path
    Get { path: String },
    /// POST a JSON body to a path
    Post { path: String, body: String },
    /// PUT a JSON body to a path
    Put { path: String, body: String },
    /// DELETE a path
    Delete { path: String },
    /// Manage the stored credential
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Store a credential
    Set { value: String },
    /// Remove the stored credential
    Clear,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let store = Arc::new(FileStore::new(&cli.store));

    if let Commands::Token { action } = &cli.command {
        let result = match action {
            TokenAction::Set { value } => store.set(&cli.token_key, value),
            TokenAction::Clear => store.remove(&cli.token_key),
        };
        return match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: cannot update {}: {}", cli.store.display(), e);
                ExitCode::FAILURE
            }
        };
    }

    let client = match GatewayClient::new(ClientConfig::new(&cli.url, &cli.token_key), store) {
        Ok(client) => client,
        Err(e) => return report(e),
    };

    let result = match cli.command {
        Commands::Get { path } => client.get(&path).await,
        Commands::Delete { path } => client.delete(&path).await,
        Commands::Post { path, body } => match parse_body(&body) {
            Ok(body) => client.post(&path, &body).await,
            Err(e) => Err(e),
        },
        Commands::Put { path, body } => match parse_body(&body) {
            Ok(body) => client.put(&path, &body).await,
            Err(e) => Err(e),
        },
        Commands::Token { .. } => unreachable!("handled above"),
    };

    match result {
        Ok(Payload::Json(value)) => {
            match serde_json::to_string_pretty(&value) {
                Ok(text) => println!("{}", text),
                Err(_) => println!("{}", value),
            }
            ExitCode::SUCCESS
        }
        Ok(Payload::Success) => {
            println!("ok");
            ExitCode::SUCCESS
        }
        Err(e) => report(e),
    }
}

fn parse_body(body: &str) -> Result<Value, HttpError> {
    serde_json::from_str(body).map_err(|e| HttpError {
        status: 0,
        message: format!("body is not valid JSON: {}", e),
        kind: gateway_sdk::ErrorKind::InvalidRequest,
    })
}

fn report(e: HttpError) -> ExitCode {
    eprintln!("Error {} ({:?}): {}", e.status, e.kind, e.message);
    ExitCode::FAILURE
}

//! Magpie Server CLI
//!
//! Starts the HTTP server for page ingestion, search, and retrieval queries.

use magpie_server::{config::ServerConfig, start_server, ServerError};
use std::env;
use std::process;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run() -> Result<(), ServerError> {
    let args: Vec<String> = env::args().collect();

    let config = if args.len() > 2 && args[1] == "--config" {
        let config_path = &args[2];
        ServerConfig::from_file(config_path)?
    } else if args.len() > 1 && args[1] == "--help" {
        print_help();
        process::exit(0);
    } else {
        eprintln!("Warning: No config file specified, using default test configuration");
        eprintln!("Usage: magpie-server --config <path-to-config.toml>");
        eprintln!();
        let mut config = ServerConfig::default_test_config();
        config.apply_env_overrides();
        config
    };

    start_server(config).await?;

    Ok(())
}

fn print_help() {
    println!("Magpie Server - Web Page Ingestion and Retrieval");
    println!();
    println!("USAGE:");
    println!("    magpie-server --config <path-to-config.toml>");
    println!();
    println!("OPTIONS:");
    println!("    --config <file>    Load configuration from TOML file");
    println!("    --help             Print this help message");
    println!();
    println!("EXAMPLE:");
    println!("    magpie-server --config config/server.toml");
    println!();
    println!("CONFIGURATION:");
    println!("    The TOML config file should contain:");
    println!("    - bind_address: IP address to bind (e.g., '127.0.0.1')");
    println!("    - bind_port: Port number (e.g., 8080)");
    println!("    - database_path: SQLite database file (':memory:' for ephemeral)");
    println!("    - embedding_dimension: Embedding vector size (default: 384)");
    println!("    - [llm]: policy, openai_api_key/model, groq_api_key/model");
    println!("    - [fetcher]: user_agent, timeout_secs");
    println!("    - [rag]: max_context_items");
    println!();
    println!("ENVIRONMENT:");
    println!("    OPENAI_API_KEY / GROQ_API_KEY override file values when set");
    println!();
}

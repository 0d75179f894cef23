//! dermascan-cli — command-line client for the Dermascan prediction service
//!
//! # Subcommands
//! - `predict <path> [--json]` — upload an image and print the verdict
//! - `history [--json]`        — list stored predictions
//! - `status`                  — check that the server answers

use std::path::Path;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Deserialize;

const DEFAULT_SERVER: &str = "http://127.0.0.1:4000";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "dermascan-cli",
    version,
    about = "Upload skin images to Dermascan and browse prediction history"
)]
struct Cli {
    /// Dermascan HTTP server URL (overrides DERMASCAN_HTTP_URL env var)
    #[arg(long, env = "DERMASCAN_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Upload an image (.jpg, .jpeg or .png) for prediction
    Predict {
        /// Path to the image file
        path: String,

        /// Print the raw response envelope
        #[arg(long)]
        json: bool,
    },

    /// List stored predictions
    History {
        /// Print the raw response envelope
        #[arg(long)]
        json: bool,
    },

    /// Show whether the server is reachable
    Status,
}

// ============================================================================
// API Response Types
// ============================================================================

/// Response envelope shared by every endpoint
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub status: String,
    pub message: Option<String>,
    pub data: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub id: String,
    pub result: String,
    pub suggestion: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryItem {
    pub id: String,
    pub history: Prediction,
}

/// Unwrap a success envelope, or turn a fail envelope into an error message.
pub fn into_data<T>(envelope: Envelope<T>) -> Result<Option<T>, String> {
    if envelope.status == "success" {
        Ok(envelope.data)
    } else {
        Err(envelope
            .message
            .unwrap_or_else(|| format!("server returned status '{}'", envelope.status)))
    }
}

/// One line per prediction: timestamp, verdict, id.
pub fn format_history_line(item: &HistoryItem) -> String {
    format!(
        "{}  {:<10}  {}",
        item.history.created_at, item.history.result, item.id
    )
}

pub fn format_prediction(p: &Prediction) -> String {
    format!(
        "Result:     {}\nSuggestion: {}\nId:         {}\nCreated:    {}",
        p.result, p.suggestion, p.id, p.created_at
    )
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

fn client(timeout_secs: u64) -> anyhow::Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()?)
}

/// Upload an image to POST /predict.
fn do_predict(server: &str, path: &str, json_output: bool) -> anyhow::Result<()> {
    let file_name = Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .context("image path has no file name")?
        .to_string();
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path))?;

    let part = reqwest::blocking::multipart::Part::bytes(bytes).file_name(file_name);
    let form = reqwest::blocking::multipart::Form::new().part("image", part);

    let url = format!("{}/predict", server);
    let resp = match client(30)?.post(&url).multipart(form).send() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("dermascan-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    };

    let body: serde_json::Value = resp.json().context("parsing predict response")?;
    if json_output {
        println!("{}", serde_json::to_string_pretty(&body)?);
    }

    let envelope: Envelope<Prediction> = serde_json::from_value(body)?;
    match into_data(envelope) {
        Ok(Some(prediction)) => {
            if !json_output {
                println!("{}", format_prediction(&prediction));
            }
        }
        Ok(None) => {
            eprintln!("dermascan-cli: server returned no prediction");
            std::process::exit(1);
        }
        Err(message) => {
            eprintln!("dermascan-cli: prediction failed: {}", message);
            std::process::exit(1);
        }
    }

    Ok(())
}

/// List GET /predict/histories.
fn do_history(server: &str, json_output: bool) -> anyhow::Result<()> {
    let url = format!("{}/predict/histories", server);
    let resp = match client(30)?.get(&url).send() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("dermascan-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    };

    let body: serde_json::Value = resp.json().context("parsing history response")?;
    if json_output {
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let envelope: Envelope<Vec<HistoryItem>> = serde_json::from_value(body)?;
    match into_data(envelope) {
        Ok(items) => {
            let items = items.unwrap_or_default();
            if items.is_empty() {
                eprintln!("No predictions stored yet");
            }
            for item in &items {
                println!("{}", format_history_line(item));
            }
        }
        Err(message) => {
            eprintln!("dermascan-cli: {}", message);
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Probe the server through the history endpoint.
fn do_status(server: &str) -> anyhow::Result<()> {
    let url = format!("{}/predict/histories", server);
    match client(10)?.get(&url).send() {
        Ok(r) if r.status().is_success() => {
            let body: serde_json::Value = r.json().unwrap_or_default();
            let count = body["data"].as_array().map(|a| a.len()).unwrap_or(0);
            println!("Dermascan server: up");
            println!("URL:              {}", server);
            println!("Predictions:      {}", count);
        }
        Ok(r) => {
            eprintln!("dermascan-cli: server unhealthy (HTTP {})", r.status());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("dermascan-cli: cannot reach {}: {}", url, e);
            std::process::exit(1);
        }
    }

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();

    let result = match cli.command {
        Commands::Predict { path, json } => do_predict(&server, &path, json),
        Commands::History { json } => do_history(&server, json),
        Commands::Status => do_status(&server),
    };

    if let Err(e) = result {
        eprintln!("dermascan-cli: {:#}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================

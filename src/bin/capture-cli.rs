use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use request_capture::storage::{SerializedHeaders, SqliteStore, StoredRecord};

#[derive(Parser)]
#[command(name = "capture-cli")]
#[command(about = "Inspect requests recorded by request-capture", long_about = None)]
struct Cli {
    /// Path to the capture database.
    #[arg(short, long, env = "CAPTURE_DB_PATH", default_value = "./requests.db")]
    db: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the most recent requests, newest first, one JSON object per line
    List {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Print the number of stored requests
    Count,
    /// Print one request with decoded headers
    Show { id: i64 },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let store = SqliteStore::open_read_only(&cli.db)?;

    match cli.command {
        Commands::List { limit } => {
            for record in store.recent(limit).await? {
                println!("{}", to_json(&record, false));
            }
        }
        Commands::Count => {
            println!("{}", store.count().await?);
        }
        Commands::Show { id } => match store.get(id).await? {
            Some(record) => println!("{}", serde_json::to_string_pretty(&to_json(&record, true))?),
            None => {
                eprintln!("Error: no request with id {}", id);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}

fn to_json(record: &StoredRecord, decode_headers: bool) -> Value {
    let headers = match SerializedHeaders::decode(&record.headers) {
        Ok(parsed) if decode_headers => json!(parsed.headers),
        _ => json!(record.headers),
    };

    json!({
        "id": record.id,
        "received_at": record.received_at,
        "method": record.method,
        "path": record.path,
        "query": record.query,
        "headers": headers,
        "body": record.body_text(),
    })
}

use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "warehouse-cli")]
#[command(about = "Client for the warehouse proxy and nodes", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch one employee
    Get { id: i64 },
    /// List employees
    List {
        #[arg(long, default_value_t = 0)]
        offset: u32,
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    /// Create an employee
    Add {
        name: String,
        position: String,
        salary: f64,
    },
    /// Replace an existing employee
    Update {
        id: i64,
        name: String,
        position: String,
        salary: f64,
    },
    /// Delete an employee
    Delete { id: i64 },
    /// Node health (ask a node directly)
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Get { id } => client.get(format!("{}/employee/{}", base, id)).send().await?,
        Commands::List { offset, limit } => {
            client
                .get(format!("{}/employees", base))
                .query(&[("offset", offset), ("limit", limit)])
                .send()
                .await?
        }
        Commands::Add { name, position, salary } => {
            client
                .put(format!("{}/employee", base))
                .json(&json!({ "name": name, "position": position, "salary": salary }))
                .send()
                .await?
        }
        Commands::Update { id, name, position, salary } => {
            client
                .post(format!("{}/employee", base))
                .json(&json!({ "id": id, "name": name, "position": position, "salary": salary }))
                .send()
                .await?
        }
        Commands::Delete { id } => client.delete(format!("{}/employee/{}", base, id)).send().await?,
        Commands::Health => client.get(format!("{}/health", base)).send().await?,
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
        eprintln!("Response: {}", text);
        std::process::exit(1);
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}

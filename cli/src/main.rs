use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use resp_client::{catalog, Config, Connection, Item};

#[derive(Parser)]
#[command(name = "resp-cli")]
#[command(about = "A small command-line client for RESP servers", long_about = None)]
struct Cli {
    #[arg(short = 'H', long, default_value = "127.0.0.1", global = true)]
    host: String,
    #[arg(short, long, default_value = "6380", global = true)]
    port: u16,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a PING and print the reply.
    Ping,
    /// SET a key to a value.
    Set { key: String, value: String },
    /// GET a key, printing the value or "(nil)".
    Get { key: String },
    /// Send an arbitrary command, array-encoded, and print the raw reply.
    Raw { args: Vec<String> },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let conn = Connection::connect((cli.host.as_str(), cli.port), Config::default())
        .await
        .with_context(|| format!("connecting to {}:{}", cli.host, cli.port))?;

    match cli.command {
        Commands::Ping => {
            catalog::ping(&conn).await?;
            println!("PONG");
        }
        Commands::Set { key, value } => {
            catalog::set(&conn, &key, value).await?;
            println!("OK");
        }
        Commands::Get { key } => match catalog::get(&conn, &key).await? {
            Some(bytes) => println!("{}", String::from_utf8_lossy(&bytes)),
            None => println!("(nil)"),
        },
        Commands::Raw { args } => {
            let items: Vec<Item> = args.into_iter().map(Item::text).collect();
            let reply = conn.submit(items, false).await?;
            println!("{:?}", reply);
        }
    }

    Ok(())
}

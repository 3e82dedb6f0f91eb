//! AtlasID CLI Client
//!
//! Command-line interface for interacting with AtlasID.

use atlasid::network::Client;
use clap::{Parser, Subcommand};

/// AtlasID CLI
#[derive(Parser, Debug)]
#[command(name = "atlasid-cli")]
#[command(about = "CLI for the AtlasID server")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:6389")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Take the next id of a sequence
    Get {
        /// The sequence key
        key: String,

        /// Number of ids to take
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,
    },

    /// Create a sequence starting after the given value
    Set {
        /// The sequence key
        key: String,

        /// The starting value
        #[arg(allow_hyphen_values = true)]
        value: i64,
    },

    /// Check whether a sequence is live on the server
    Exists {
        /// The sequence key
        key: String,
    },

    /// Delete a sequence
    Del {
        /// The sequence key
        key: String,
    },

    /// Select a database index (accepted for compatibility)
    Select {
        /// The database index
        index: String,
    },
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("(error) {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> atlasid::Result<()> {
    let mut client = Client::connect(&args.server)?;

    match args.command {
        Commands::Get { key, count } => {
            for _ in 0..count {
                match client.get(&key)? {
                    Some(id) => println!("{}", id),
                    None => {
                        println!("(nil)");
                        break;
                    }
                }
            }
        }
        Commands::Set { key, value } => {
            client.set(&key, value)?;
            println!("OK");
        }
        Commands::Exists { key } => {
            println!("(integer) {}", client.exists(&key)? as i64);
        }
        Commands::Del { key } => {
            println!("(integer) {}", client.del(&key)? as i64);
        }
        Commands::Select { index } => {
            client.select(&index)?;
            println!("OK");
        }
    }

    Ok(())
}

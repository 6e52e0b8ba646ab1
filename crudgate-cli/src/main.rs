//! Crudgate CLI
//!
//! ```bash
//! crudgate serve --config crudgate.toml
//! crudgate token --user u1 --secret "$CG_JWT_SECRET"
//! ```
//!
//! See `crudgate --help` for all available commands and options.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "crudgate",
    about = "Permission-filtered CRUD endpoints from a model declaration",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve every model declared in the config file
    Serve {
        /// Config file (defaults, then this file, then CG_* variables)
        #[arg(short, long, default_value = "crudgate.toml")]
        config: PathBuf,

        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print a signed HS256 token for testing
    Token {
        /// User id to put in the token
        #[arg(short, long)]
        user: String,

        /// HMAC secret (same as security.jwt_secret)
        #[arg(short, long, env = "CG_JWT_SECRET")]
        secret: String,

        /// Lifetime in seconds
        #[arg(long, default_value_t = 3600)]
        ttl: i64,

        /// Claim holding the user id
        #[arg(long, default_value = "_id")]
        claim: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve { config, port } => commands::serve::run(&config, port).await,
        Commands::Token { user, secret, ttl, claim } => {
            commands::token::run(&user, &secret, ttl, &claim)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

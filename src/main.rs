mod capabilities;
mod checksum;
mod cli;
mod config;
mod coordinate;
mod error;
mod pipeline;
mod resolver;
mod signature;
mod transport;
mod verification;

use colored::Colorize;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    match cli::cli().await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            std::process::exit(1);
        }
    }
}

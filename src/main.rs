// HexLink - TCP hex command tool
use anyhow::Result;
use clap::Parser;
use hexlink::cli::{execute_command, Args};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Err(e) = execute_command(args).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{Parser, Subcommand};
use env_logger::Env;

mod checksum;
mod env;
mod fetcher;
mod progress;

use fetcher::BuildFetcher;

#[derive(Parser, Debug)]
#[command(
    name = "nuka-get",
    author,
    version,
    about = "Keep local NukaCode build archives in sync with the build server"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download the latest build archives, skipping copies that already
    /// match a server-side checksum.
    Download,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Download => download().await,
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        process::exit(1);
    }
}

async fn download() -> Result<(), String> {
    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.store(true, Ordering::SeqCst);
            }
        });
    }

    println!("Downloading NukaCode application data...");
    BuildFetcher::for_build_server().fetch_all(Some(&cancel)).await?;
    println!("Application download complete! Ready to build something amazingly FAST!");
    Ok(())
}

//
//  aem-cli
//  main.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use aem_cli::cli::{Cli, Commands};
use aem_cli::{exit_code_for, exit_codes};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.global.debug);

    // Execute command
    let result = run(cli).await;

    // Handle result and exit
    match result {
        Ok(()) => std::process::exit(exit_codes::SUCCESS),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(exit_code_for(&e));
        }
    }
}

/// Initialize logging from `AEM_LOG`, or at debug level with `--debug`
fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("AEM_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Main command dispatcher
async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Env(cmd) => cmd.run(&cli.global).await,
        Commands::Config(cmd) => cmd.run(&cli.global).await,
        Commands::Api(cmd) => cmd.run(&cli.global).await,
        Commands::Bulk(cmd) => cmd.run(&cli.global).await,
        Commands::Job(cmd) => cmd.run(&cli.global).await,
        Commands::Version => {
            println!("aem version {}", aem_cli::VERSION);
            Ok(())
        }
    }
}

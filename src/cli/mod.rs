//
//  aem-cli
//  cli/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! CLI command definitions using clap derive macros

mod api;
mod bulk;
mod config;
mod env;
mod job;

pub use api::ApiCommand;
pub use bulk::BulkCommand;
pub use config::ConfigCommand;
pub use env::EnvCommand;
pub use job::JobCommand;

use clap::{Parser, Subcommand};

/// AEM CLI - Exercise AEM REST APIs from the command line
#[derive(Parser, Debug)]
#[command(
    name = "aem",
    version,
    about = "Exercise Adobe Experience Manager REST APIs from the command line",
    long_about = "aem is a CLI for AEM author and publish instances.\n\n\
                  It issues cached, audited requests, runs bulk operations with bounded \
                  concurrency, and follows long-running server jobs to completion.",
    propagate_version = true,
    after_help = "Use 'aem <command> --help' for more information about a command."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOptions,
}

/// Global options available to all commands
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Environment to target instead of the active one
    #[arg(long, short = 'e', global = true, env = "AEM_ENV")]
    pub env: Option<String>,

    /// Output format as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Reject plaintext http:// addresses
    #[arg(long, global = true)]
    pub https_only: bool,

    /// Bypass the response cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Enable debug logging
    #[arg(long, global = true, env = "AEM_DEBUG")]
    pub debug: bool,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage AEM environments
    Env(EnvCommand),

    /// Manage CLI configuration
    Config(ConfigCommand),

    /// Make API requests
    Api(ApiCommand),

    /// Run a request against many paths concurrently
    Bulk(BulkCommand),

    /// Start a server-side job and poll it to completion
    Job(JobCommand),

    /// Print version information
    Version,
}

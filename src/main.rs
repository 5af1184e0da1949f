// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! Datastore Env CLI
//!
//! Generates required-key manifests from dot-env files and uploads dot-env
//! values to Cloud Datastore.

mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use datastore_env::{
    DatastoreEnvironment,
    errors::DatastoreEnvError,
    manifest::{GenerateOptions, Output, generate_required},
    upload::{UploadOptions, upload_dot_env},
};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    install_logging(cli.verbose);

    let Some(command) = cli.command else {
        println!("{}", cli::usage(""));
        return;
    };

    if let Err(err) = run(command).await {
        error!("{err}");
        std::process::exit(1);
    }
}

fn install_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(command: Commands) -> Result<(), DatastoreEnvError> {
    match command {
        Commands::GenerateRequired {
            env_file,
            require_file,
        } => {
            let options = GenerateOptions {
                env_file,
                output: Output::from(require_file.as_str()),
            };
            generate_required(&options).await?;
        }
        Commands::UploadEnv {
            env_file,
            include,
            overwrite,
            namespace,
            kind,
            project_id,
        } => {
            let options = UploadOptions {
                env_file,
                include,
                overwrite,
                namespace,
                kind,
                project_id,
            };
            let env = DatastoreEnvironment::from_env(options.environment_options())?;
            upload_dot_env(&options, &env).await?;
        }
        Commands::Unknown(args) => {
            let action = args.first().map(String::as_str).unwrap_or_default();
            println!("{}", cli::usage(action));
        }
    }

    Ok(())
}

// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! CLI argument parsing using clap derive

use clap::{Parser, Subcommand};
use datastore_env::{
    env_keys::{DEFAULT_ENV_FILE, DEFAULT_REQUIRE_FILE},
    upload::Include,
};
use std::path::PathBuf;

pub const KNOWN_COMMANDS: &str = "generate:required, upload:env";

/// Manage environment variables kept in Cloud Datastore
#[derive(Parser, Debug)]
#[command(name = "datastore-env")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Generate a file exporting the required and optional variable names
    ///
    /// NOTE: It will overwrite <require-file>
    #[command(name = "generate:required", visible_aliases = ["gen:required", "g:required"])]
    GenerateRequired {
        /// Dot-env file to read
        #[arg(short = 'i', value_name = "dot-env-file", default_value = DEFAULT_ENV_FILE)]
        env_file: PathBuf,

        /// File to write, `-` for standard output
        #[arg(short = 'o', value_name = "require-file", default_value = DEFAULT_REQUIRE_FILE)]
        require_file: String,
    },

    /// Upload the values of a dot-env file to the datastore
    #[command(name = "upload:env")]
    UploadEnv {
        /// Dot-env file to read
        #[arg(short = 'i', value_name = "dot-env-file", default_value = DEFAULT_ENV_FILE)]
        env_file: PathBuf,

        /// Which keys to upload
        #[arg(long, value_enum, default_value_t = Include::Optional)]
        include: Include,

        /// Replace values that already exist in the datastore
        #[arg(long)]
        overwrite: bool,

        /// Datastore namespace
        #[arg(long)]
        namespace: Option<String>,

        /// Entity kind (default "Env")
        #[arg(long)]
        kind: Option<String>,

        /// Google Cloud project id
        #[arg(long)]
        project_id: Option<String>,
    },

    #[command(external_subcommand)]
    Unknown(Vec<String>),
}

/// Usage text printed for a missing or unknown command.
pub fn usage(action: &str) -> String {
    format!(
        "Unknown action: {action}\n\
         Usage:\n    datastore-env <action> [args]\n\n\
         Known commands: {KNOWN_COMMANDS}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve_to_generate() {
        for name in ["generate:required", "gen:required", "g:required"] {
            let cli = Cli::try_parse_from(["datastore-env", name, "-o", "-"]).unwrap();
            assert_eq!(
                cli.command,
                Some(Commands::GenerateRequired {
                    env_file: PathBuf::from(".env"),
                    require_file: "-".into(),
                })
            );
        }
    }

    #[test]
    fn upload_defaults() {
        let cli = Cli::try_parse_from(["datastore-env", "upload:env", "-i", "env.example"]).unwrap();

        assert_eq!(
            cli.command,
            Some(Commands::UploadEnv {
                env_file: PathBuf::from("env.example"),
                include: Include::Optional,
                overwrite: false,
                namespace: None,
                kind: None,
                project_id: None,
            })
        );
    }

    #[test]
    fn upload_include_and_overwrite() {
        let cli = Cli::try_parse_from([
            "datastore-env",
            "upload:env",
            "--include=all",
            "--overwrite",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::UploadEnv {
                include, overwrite, ..
            }) => {
                assert_eq!(include, Include::All);
                assert!(overwrite);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn unknown_commands_are_captured() {
        let cli = Cli::try_parse_from(["datastore-env", "uploadEnv", "x"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Unknown(vec!["uploadEnv".into(), "x".into()]))
        );
    }
}

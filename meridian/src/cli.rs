// meridian/src/cli.rs

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "meridian")]
#[command(version)]
#[command(about = "Governance policy harness: submit objects, preview plans, inspect state", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Submit a bundle of objects (YAML, one sequence, "kind"-tagged) and print the resulting plan
    Apply {
        /// Path to a YAML file containing a list of objects
        file: PathBuf,

        /// Acting user, as "namespace/name" (must exist in the bundle for anything past the first submit)
        #[arg(long, default_value = "system/root")]
        user: String,

        /// Resolve and diff without persisting anything
        #[arg(long)]
        noop: bool,
    },

    /// Compose a bundle into a container and run referential/ACL/cycle validation only
    Validate {
        file: PathBuf,
    },

    /// Fetch one object from a bundle by key (debugging aid, no store round-trip)
    Get {
        file: PathBuf,
        namespace: String,
        kind: String,
        name: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_defaults_user_to_system_root() {
        let args = Cli::parse_from(["meridian", "apply", "bundle.yaml"]);
        match args.command {
            Commands::Apply { file, user, noop } => {
                assert_eq!(file, PathBuf::from("bundle.yaml"));
                assert_eq!(user, "system/root");
                assert!(!noop);
            }
            _ => panic!("expected Apply"),
        }
    }

    #[test]
    fn apply_accepts_noop_and_user_overrides() {
        let args = Cli::parse_from(["meridian", "apply", "bundle.yaml", "--user", "p/alice", "--noop"]);
        match args.command {
            Commands::Apply { user, noop, .. } => {
                assert_eq!(user, "p/alice");
                assert!(noop);
            }
            _ => panic!("expected Apply"),
        }
    }

    #[test]
    fn get_parses_positional_key() {
        let args = Cli::parse_from(["meridian", "get", "bundle.yaml", "p", "Service", "kafka"]);
        match args.command {
            Commands::Get { namespace, kind, name, .. } => {
                assert_eq!(namespace, "p");
                assert_eq!(kind, "Service");
                assert_eq!(name, "kafka");
            }
            _ => panic!("expected Get"),
        }
    }
}

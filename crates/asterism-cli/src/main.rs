//! Asterism CLI - deploy and manage container constellations.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "asterism")]
#[command(about = "Deploy and manage Asterism constellations")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a constellation
    Start {
        /// Deployment directory containing asterism.yml
        path: PathBuf,

        /// Overlay configuration name (reads <path>/<extra>.yml)
        #[arg(long)]
        extra: Option<String>,

        /// Override a single configuration value as key.path=value
        #[arg(long = "option", value_name = "KEY=VALUE")]
        options: Vec<String>,

        /// Pull every referenced image before starting
        #[arg(long)]
        pull: bool,
    },

    /// Report the status of a constellation
    Status {
        /// Deployment directory containing asterism.yml
        path: PathBuf,
    },

    /// Run a user administration command in the running constellation
    Admin {
        /// Deployment directory containing asterism.yml
        path: PathBuf,

        /// Arguments passed to the admin image, e.g. `add-users a@x.com`
        #[arg(required = true, trailing_var_arg = true)]
        args: Vec<String>,
    },

    /// Stop a constellation
    Stop {
        /// Deployment directory containing asterism.yml
        path: PathBuf,

        /// Kill containers instead of stopping them gracefully
        #[arg(long)]
        kill: bool,

        /// Also remove the network
        #[arg(long)]
        network: bool,

        /// Also remove the volumes (destroys data)
        #[arg(long)]
        volumes: bool,

        /// Tear down even when the deployment snapshot is unreadable,
        /// rebuilding the configuration from disk
        #[arg(long)]
        force: bool,

        /// Overlay configuration name, used with --force
        #[arg(long)]
        extra: Option<String>,

        /// Configuration override, used with --force
        #[arg(long = "option", value_name = "KEY=VALUE")]
        options: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let result: Result<(), anyhow::Error> = match cli.command {
        Commands::Start {
            path,
            extra,
            options,
            pull,
        } => commands::start::run(&path, extra, options, pull).await,
        Commands::Status { path } => commands::status::run(&path).await,
        Commands::Admin { path, args } => commands::admin::run(&path, args).await,
        Commands::Stop {
            path,
            kill,
            network,
            volumes,
            force,
            extra,
            options,
        } => commands::stop::run(&path, kill, network, volumes, force, extra, options).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn start_defaults() {
        let cli = parse(&["asterism", "start", "deploy/production"]);
        match cli.command {
            Commands::Start {
                path,
                extra,
                options,
                pull,
            } => {
                assert_eq!(path, PathBuf::from("deploy/production"));
                assert!(extra.is_none());
                assert!(options.is_empty());
                assert!(!pull);
            }
            _ => panic!("expected start"),
        }
    }

    #[test]
    fn start_with_overlay_and_repeated_options() {
        let cli = parse(&[
            "asterism",
            "start",
            ".",
            "--extra",
            "staging",
            "--option",
            "web.port=8080",
            "--option",
            "worker.replicas=4",
            "--pull",
        ]);
        match cli.command {
            Commands::Start {
                extra,
                options,
                pull,
                ..
            } => {
                assert_eq!(extra.as_deref(), Some("staging"));
                assert_eq!(options, vec!["web.port=8080", "worker.replicas=4"]);
                assert!(pull);
            }
            _ => panic!("expected start"),
        }
    }

    #[test]
    fn admin_passes_arguments_through() {
        let cli = parse(&[
            "asterism",
            "admin",
            ".",
            "grant",
            "admin-group",
            "*/reports.read",
        ]);
        match cli.command {
            Commands::Admin { path, args } => {
                assert_eq!(path, PathBuf::from("."));
                assert_eq!(args, vec!["grant", "admin-group", "*/reports.read"]);
            }
            _ => panic!("expected admin"),
        }
        assert!(Cli::try_parse_from(["asterism", "admin", "."]).is_err());
    }

    #[test]
    fn stop_flags() {
        let cli = parse(&[
            "asterism", "stop", ".", "--kill", "--network", "--volumes", "--force",
        ]);
        match cli.command {
            Commands::Stop {
                kill,
                network,
                volumes,
                force,
                ..
            } => {
                assert!(kill && network && volumes && force);
            }
            _ => panic!("expected stop"),
        }
    }

    #[test]
    fn path_is_required() {
        assert!(Cli::try_parse_from(["asterism", "status"]).is_err());
    }
}

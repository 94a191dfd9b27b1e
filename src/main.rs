//! dbstack: provision a MariaDB database and an EC2 tunnel host
//!
//! Runs an idempotent sequence against one AWS account/region: discover the
//! default network resources, open the stack's firewall ports, create or
//! reuse the database and tunnel host, wait for both to be ready, and print
//! connection instructions.

use anyhow::Result;
use clap::{Parser, Subcommand};
use dbstack::aws::CloudClient;
use dbstack::config;
use dbstack::provision::{self, ProvisionConfig};
use dbstack::report;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "dbstack")]
#[command(about = "Provision a MariaDB database and an EC2 tunnel host in the default VPC")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Provision the stack (idempotent; existing resources are reused)
    Up {
        /// AWS region
        #[arg(long, default_value = config::DEFAULT_REGION)]
        region: String,

        /// Print what would be provisioned without issuing any calls
        #[arg(long)]
        dry_run: bool,
    },

    /// Print connection info for an already-provisioned stack
    Status {
        /// AWS region
        #[arg(long, default_value = config::DEFAULT_REGION)]
        region: String,

        /// Output format (table, json)
        #[arg(long, default_value = "table")]
        format: String,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&e);
        std::process::exit(1);
    }
}

/// Print error in a user-friendly way
fn print_error(e: &anyhow::Error) {
    use std::io::Write;

    let mut stderr = std::io::stderr();

    let _ = writeln!(stderr, "\n\x1b[1;31mError:\x1b[0m {e}");

    let mut source = e.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  \x1b[33mCaused by:\x1b[0m {cause}");
        source = cause.source();
    }
}

async fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    match args.command {
        Command::Up { region, dry_run } => {
            if dry_run {
                print_dry_run(&region);
                return Ok(());
            }

            info!(region = %region, "Provisioning development stack");

            let client = CloudClient::new(&region).await?;
            let report = provision::provision(&client, &ProvisionConfig::default()).await?;

            println!("{}", report::render(&report));
        }

        Command::Status { region, format } => {
            let client = CloudClient::new(&region).await?;
            let report = provision::status(&client).await?;

            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report::render(&report));
            }
        }
    }

    Ok(())
}

fn print_dry_run(region: &str) {
    println!("\n=== DRY RUN ===\n");
    println!("This would provision the following stack:\n");
    println!("  Region:       {}", region);
    println!(
        "  Database:     {} ({} {}, {} GiB {})",
        config::DB_INSTANCE_ID,
        config::DB_ENGINE,
        config::DB_INSTANCE_CLASS,
        config::DB_ALLOCATED_STORAGE_GIB,
        config::DB_STORAGE_TYPE
    );
    println!(
        "  Tunnel host:  {} ({}, key pair {})",
        config::INSTANCE_NAME,
        config::COMPUTE_INSTANCE_TYPE,
        config::KEY_NAME
    );
    println!(
        "  Ingress:      tcp/{} and tcp/{} from 0.0.0.0/0, tcp/{} intra-group",
        config::SSH_PORT,
        config::APP_PORT,
        config::DB_PORT
    );
    println!();
    println!("Existing resources with the same identifier/name tag are reused.");
    println!("To provision for real, remove the --dry-run flag.");
}

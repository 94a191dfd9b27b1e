//! The provisioning pipeline
//!
//! A strictly sequential run: discover defaults, ensure firewall rules,
//! ensure the database and tunnel host exist, wait for both to be ready,
//! then gather the connection report. A failed stage aborts the run; nothing
//! partially created is cleaned up.

use crate::aws::types::{ComputeState, NetworkContext};
use crate::aws::ProvisionOps;
use crate::config;
use crate::report::StackReport;
use crate::wait::{wait_for_resource, WaitConfig};
use anyhow::{Context, Result};
use tracing::{info, warn};

/// Wait profiles for the two readiness stages.
#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    /// Wait profile for the database instance
    pub db_wait: WaitConfig,
    /// Wait profile for the tunnel host
    pub compute_wait: WaitConfig,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            db_wait: WaitConfig::database(),
            compute_wait: WaitConfig::compute(),
        }
    }
}

/// Run the full provisioning sequence and return the connection report.
///
/// Idempotent: existing resources are detected by identifier/name tag and
/// reused instead of recreated.
pub async fn provision<O: ProvisionOps>(ops: &O, cfg: &ProvisionConfig) -> Result<StackReport> {
    let started = chrono::Utc::now();

    let network = ops
        .discover_network()
        .await
        .context("Default resource discovery failed")?;

    ops.authorize_stack_ingress(&network.security_group_id)
        .await
        .context("Firewall configuration failed")?;

    ensure_database(ops, &network).await?;
    let instance_id = ensure_compute(ops, &network).await?;

    wait_for_compute_running(ops, cfg, &instance_id).await?;
    wait_for_db_available(ops, cfg).await?;

    let report = gather_report(ops, &instance_id).await?;

    let elapsed = chrono::Utc::now() - started;
    info!(elapsed_secs = elapsed.num_seconds(), "Stack ready");

    Ok(report)
}

/// Gather the connection report for an already-provisioned stack.
///
/// Pure read: no create calls are issued. Fails if either resource is
/// missing or the database has no endpoint yet.
pub async fn status<O: ProvisionOps>(ops: &O) -> Result<StackReport> {
    let instance = ops
        .find_instance_by_name(config::INSTANCE_NAME)
        .await?
        .context("No pending or running tunnel host found; run `dbstack up` first")?;

    let db = ops
        .find_db_instance(config::DB_INSTANCE_ID)
        .await?
        .context("Database instance not found; run `dbstack up` first")?;

    let endpoint = db
        .endpoint
        .context("Database instance has no endpoint yet; it may still be creating")?;

    Ok(StackReport {
        db_identifier: db.identifier,
        db_address: endpoint.address,
        db_port: endpoint.port,
        instance_id: instance.instance_id,
        public_ip: instance.public_ip,
        private_ip: instance.private_ip,
    })
}

/// Ensure the database instance exists, short-circuiting on an existing one
async fn ensure_database<O: ProvisionOps>(ops: &O, network: &NetworkContext) -> Result<()> {
    match ops
        .find_db_instance(config::DB_INSTANCE_ID)
        .await
        .context("Failed to look up database instance")?
    {
        Some(db) => {
            info!(
                identifier = %db.identifier,
                status = %db.status,
                "Database instance already exists"
            );
        }
        None => {
            ops.create_db_instance(config::DB_INSTANCE_ID, &network.security_group_id)
                .await
                .context("Database provisioning failed")?;
        }
    }
    Ok(())
}

/// Ensure the tunnel host exists, returning its instance id
async fn ensure_compute<O: ProvisionOps>(ops: &O, network: &NetworkContext) -> Result<String> {
    match ops
        .find_instance_by_name(config::INSTANCE_NAME)
        .await
        .context("Failed to look up tunnel host")?
    {
        Some(instance) => {
            info!(instance_id = %instance.instance_id, "Tunnel host already exists");
            Ok(instance.instance_id)
        }
        None => ops
            .launch_instance(config::INSTANCE_NAME, network)
            .await
            .context("Tunnel host launch failed"),
    }
}

async fn wait_for_compute_running<O: ProvisionOps>(
    ops: &O,
    cfg: &ProvisionConfig,
    instance_id: &str,
) -> Result<()> {
    info!(instance_id = %instance_id, "Waiting for tunnel host to be running");

    wait_for_resource(
        cfg.compute_wait.clone(),
        || async {
            match ops.describe_instance(instance_id).await? {
                Some(instance) => match instance.state {
                    ComputeState::Running => Ok(true),
                    ComputeState::Pending => Ok(false),
                    ComputeState::Other(state) => anyhow::bail!(
                        "Instance {} entered unexpected state: {}",
                        instance_id,
                        state
                    ),
                },
                // Describe can lag a fresh launch; keep polling
                None => Ok(false),
            }
        },
        &format!("EC2 instance {} running", instance_id),
    )
    .await
}

async fn wait_for_db_available<O: ProvisionOps>(ops: &O, cfg: &ProvisionConfig) -> Result<()> {
    info!(
        identifier = config::DB_INSTANCE_ID,
        "Waiting for database instance to be available"
    );

    wait_for_resource(
        cfg.db_wait.clone(),
        || async {
            let db = ops.find_db_instance(config::DB_INSTANCE_ID).await?;
            Ok(db.is_some_and(|d| d.is_available()))
        },
        &format!("database instance {} available", config::DB_INSTANCE_ID),
    )
    .await
}

/// Query final endpoint and addresses for the report
async fn gather_report<O: ProvisionOps>(ops: &O, instance_id: &str) -> Result<StackReport> {
    let db = ops
        .find_db_instance(config::DB_INSTANCE_ID)
        .await?
        .context("Database instance disappeared after becoming available")?;

    let endpoint = db
        .endpoint
        .context("Database instance reports no endpoint")?;

    let instance = ops
        .describe_instance(instance_id)
        .await?
        .context("Tunnel host disappeared after becoming ready")?;

    if instance.public_ip.is_none() {
        warn!(instance_id = %instance_id, "Tunnel host has no public IP address");
    }

    Ok(StackReport {
        db_identifier: db.identifier,
        db_address: endpoint.address,
        db_port: endpoint.port,
        instance_id: instance.instance_id,
        public_ip: instance.public_ip,
        private_ip: instance.private_ip,
    })
}

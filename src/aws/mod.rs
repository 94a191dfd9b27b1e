//! AWS client modules
//!
//! This module provides wrappers around AWS SDK clients for:
//! - EC2: network discovery, firewall rules, and the tunnel host
//! - RDS: the database instance
//!
//! `CloudClient` bundles both and implements [`ProvisionOps`], the seam the
//! provisioner (and its tests) program against.

pub mod context;
pub mod ec2;
pub mod error;
pub mod ops;
pub mod rds;
pub mod types;

pub use context::AwsContext;
pub use ec2::Ec2Client;
pub use error::{classify_aws_error, AwsError};
pub use ops::ProvisionOps;
pub use rds::RdsClient;
pub use types::{ComputeInstance, ComputeState, DbEndpoint, DbInstanceInfo, NetworkContext};

use anyhow::Result;

/// Real control-plane client: EC2 + RDS over one loaded SDK config.
pub struct CloudClient {
    ec2: Ec2Client,
    rds: RdsClient,
}

impl CloudClient {
    /// Create a new client pair (loads AWS config from the environment)
    pub async fn new(region: &str) -> Result<Self> {
        let ctx = AwsContext::new(region).await;
        Ok(Self::from_context(&ctx))
    }

    /// Create the client pair from a pre-loaded AWS context
    pub fn from_context(ctx: &AwsContext) -> Self {
        Self {
            ec2: Ec2Client::from_context(ctx),
            rds: RdsClient::from_context(ctx),
        }
    }
}

impl ProvisionOps for CloudClient {
    async fn discover_network(&self) -> Result<NetworkContext> {
        self.ec2.discover_network().await
    }

    async fn authorize_stack_ingress(&self, security_group_id: &str) -> Result<()> {
        self.ec2.authorize_stack_ingress(security_group_id).await
    }

    async fn find_db_instance(&self, identifier: &str) -> Result<Option<DbInstanceInfo>> {
        self.rds.find_db_instance(identifier).await
    }

    async fn create_db_instance(&self, identifier: &str, security_group_id: &str) -> Result<()> {
        self.rds
            .create_db_instance(identifier, security_group_id)
            .await
    }

    async fn find_instance_by_name(&self, name: &str) -> Result<Option<ComputeInstance>> {
        self.ec2.find_instance_by_name(name).await
    }

    async fn launch_instance(&self, name: &str, network: &NetworkContext) -> Result<String> {
        self.ec2.launch_instance(name, network).await
    }

    async fn describe_instance(&self, instance_id: &str) -> Result<Option<ComputeInstance>> {
        self.ec2.describe_instance(instance_id).await
    }
}

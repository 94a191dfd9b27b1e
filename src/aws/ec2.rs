//! EC2 network discovery and tunnel host management

use crate::aws::context::AwsContext;
use crate::aws::error::classify_aws_error;
use crate::aws::types::{ComputeInstance, ComputeState, NetworkContext};
use crate::config;
use anyhow::{Context, Result};
use aws_sdk_ec2::error::ProvideErrorMetadata;
use aws_sdk_ec2::types::{
    Filter, Instance, InstanceStateName, InstanceType, IpPermission, IpRange, ResourceType, Tag,
    TagSpecification, UserIdGroupPair,
};
use aws_sdk_ec2::Client;
use tracing::{debug, info};

/// EC2 client for network discovery and the tunnel host
pub struct Ec2Client {
    client: Client,
}

impl Ec2Client {
    /// Create a new EC2 client (loads AWS config from the environment)
    pub async fn new(region: &str) -> Result<Self> {
        let ctx = AwsContext::new(region).await;
        Ok(Self::from_context(&ctx))
    }

    /// Create an EC2 client from a pre-loaded AWS context
    pub fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.ec2_client(),
        }
    }

    /// Look up the account's default network resources.
    ///
    /// Any missing default resource aborts the lookup; the caller treats
    /// provisioning as failed without issuing create calls.
    pub async fn discover_network(&self) -> Result<NetworkContext> {
        let vpc_id = self.default_vpc().await?;
        let security_group_id = self.default_security_group(&vpc_id).await?;
        let subnet_id = self.default_subnet(&vpc_id).await?;
        let image_id = self.latest_stack_ami().await?;

        info!(
            vpc_id = %vpc_id,
            security_group_id = %security_group_id,
            subnet_id = %subnet_id,
            image_id = %image_id,
            "Discovered default network resources"
        );

        Ok(NetworkContext {
            vpc_id,
            security_group_id,
            subnet_id,
            image_id,
        })
    }

    async fn default_vpc(&self) -> Result<String> {
        let vpcs = self
            .client
            .describe_vpcs()
            .filters(Filter::builder().name("isDefault").values("true").build())
            .send()
            .await
            .context("Failed to describe VPCs")?;

        let vpc_id = vpcs
            .vpcs()
            .first()
            .and_then(|v| v.vpc_id())
            .context("No default VPC found")?
            .to_string();

        Ok(vpc_id)
    }

    async fn default_security_group(&self, vpc_id: &str) -> Result<String> {
        let groups = self
            .client
            .describe_security_groups()
            .filters(Filter::builder().name("vpc-id").values(vpc_id).build())
            .filters(Filter::builder().name("group-name").values("default").build())
            .send()
            .await
            .context("Failed to describe security groups")?;

        let group_id = groups
            .security_groups()
            .first()
            .and_then(|g| g.group_id())
            .context("No default security group found")?
            .to_string();

        Ok(group_id)
    }

    async fn default_subnet(&self, vpc_id: &str) -> Result<String> {
        let subnets = self
            .client
            .describe_subnets()
            .filters(Filter::builder().name("vpc-id").values(vpc_id).build())
            .filters(
                Filter::builder()
                    .name("default-for-az")
                    .values("true")
                    .build(),
            )
            .send()
            .await
            .context("Failed to describe subnets")?;

        let subnet_id = subnets
            .subnets()
            .first()
            .and_then(|s| s.subnet_id())
            .context("No default subnet found")?
            .to_string();

        Ok(subnet_id)
    }

    /// Get the newest available AMI matching the stack's name/architecture filter
    async fn latest_stack_ami(&self) -> Result<String> {
        let response = self
            .client
            .describe_images()
            .owners("amazon")
            .filters(
                Filter::builder()
                    .name("name")
                    .values(config::AMI_NAME_PATTERN)
                    .build(),
            )
            .filters(
                Filter::builder()
                    .name("architecture")
                    .values(config::AMI_ARCHITECTURE)
                    .build(),
            )
            .filters(Filter::builder().name("state").values("available").build())
            .send()
            .await
            .context("Failed to describe images")?;

        let images = response.images();

        // Sort by creation date and get the latest
        let mut images: Vec<_> = images.iter().collect();
        images.sort_by(|a, b| {
            b.creation_date()
                .unwrap_or_default()
                .cmp(a.creation_date().unwrap_or_default())
        });

        let ami = images
            .first()
            .and_then(|img| img.image_id())
            .context("No matching AMI found")?;

        debug!(ami = %ami, "Found latest stack AMI");

        Ok(ami.to_string())
    }

    /// Ensure the stack's three ingress rules exist on the security group:
    /// SSH and application ports from anywhere, database port restricted to
    /// members of the group itself. Rules that already exist are success.
    pub async fn authorize_stack_ingress(&self, security_group_id: &str) -> Result<()> {
        let ssh_permission = IpPermission::builder()
            .ip_protocol("tcp")
            .from_port(config::SSH_PORT)
            .to_port(config::SSH_PORT)
            .ip_ranges(
                IpRange::builder()
                    .cidr_ip("0.0.0.0/0")
                    .description("SSH access")
                    .build(),
            )
            .build();

        let app_permission = IpPermission::builder()
            .ip_protocol("tcp")
            .from_port(config::APP_PORT)
            .to_port(config::APP_PORT)
            .ip_ranges(
                IpRange::builder()
                    .cidr_ip("0.0.0.0/0")
                    .description("Application access")
                    .build(),
            )
            .build();

        let db_permission = IpPermission::builder()
            .ip_protocol("tcp")
            .from_port(config::DB_PORT)
            .to_port(config::DB_PORT)
            .user_id_group_pairs(
                UserIdGroupPair::builder()
                    .group_id(security_group_id)
                    .description("Database access from within the group")
                    .build(),
            )
            .build();

        match self
            .client
            .authorize_security_group_ingress()
            .group_id(security_group_id)
            .ip_permissions(ssh_permission)
            .ip_permissions(app_permission)
            .ip_permissions(db_permission)
            .send()
            .await
        {
            Ok(_) => {
                info!(
                    security_group_id = %security_group_id,
                    ssh = config::SSH_PORT,
                    app = config::APP_PORT,
                    db = config::DB_PORT,
                    "Ingress rules added"
                );
                Ok(())
            }
            Err(e) if classify_aws_error(e.code(), e.message()).is_already_exists() => {
                debug!(security_group_id = %security_group_id, "Ingress rules already present");
                Ok(())
            }
            Err(e) => Err(anyhow::Error::from(e)
                .context("Failed to add ingress rules to security group")),
        }
    }

    /// Find a pending or running instance carrying the given `Name` tag
    pub async fn find_instance_by_name(&self, name: &str) -> Result<Option<ComputeInstance>> {
        let response = self
            .client
            .describe_instances()
            .filters(Filter::builder().name("tag:Name").values(name).build())
            .filters(
                Filter::builder()
                    .name("instance-state-name")
                    .values("pending")
                    .values("running")
                    .build(),
            )
            .send()
            .await
            .context("Failed to describe instances")?;

        let instance = response
            .reservations()
            .first()
            .and_then(|r| r.instances().first());

        Ok(instance.map(snapshot))
    }

    /// Launch the tunnel host with the discovered image, subnet, and
    /// security group, tagged with the given name
    pub async fn launch_instance(&self, name: &str, network: &NetworkContext) -> Result<String> {
        let instance_type: InstanceType = config::COMPUTE_INSTANCE_TYPE
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid instance type: {}", config::COMPUTE_INSTANCE_TYPE))?;

        info!(
            instance_type = config::COMPUTE_INSTANCE_TYPE,
            ami = %network.image_id,
            subnet_id = %network.subnet_id,
            "Launching tunnel host"
        );

        let response = self
            .client
            .run_instances()
            .image_id(&network.image_id)
            .instance_type(instance_type)
            .key_name(config::KEY_NAME)
            .min_count(1)
            .max_count(1)
            .security_group_ids(&network.security_group_id)
            .subnet_id(&network.subnet_id)
            .tag_specifications(
                TagSpecification::builder()
                    .resource_type(ResourceType::Instance)
                    .tags(Tag::builder().key("Name").value(name).build())
                    .build(),
            )
            .send()
            .await
            .context("Failed to launch instance")?;

        let instance = response
            .instances()
            .first()
            .context("No instance returned")?;

        let instance_id = instance
            .instance_id()
            .context("No instance ID")?
            .to_string();

        info!(instance_id = %instance_id, "Instance launched");

        Ok(instance_id)
    }

    /// Describe a single instance by id; "not found" maps to `None`
    pub async fn describe_instance(&self, instance_id: &str) -> Result<Option<ComputeInstance>> {
        let response = match self
            .client
            .describe_instances()
            .instance_ids(instance_id)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if classify_aws_error(e.code(), e.message()).is_not_found() => {
                return Ok(None);
            }
            Err(e) => return Err(anyhow::Error::from(e).context("Failed to describe instance")),
        };

        let instance = response
            .reservations()
            .first()
            .and_then(|r| r.instances().first());

        Ok(instance.map(snapshot))
    }
}

/// Reduce an SDK instance to the fields the provisioner cares about
fn snapshot(instance: &Instance) -> ComputeInstance {
    let state = match instance.state().and_then(|s| s.name()) {
        Some(InstanceStateName::Running) => ComputeState::Running,
        Some(InstanceStateName::Pending) | None => ComputeState::Pending,
        Some(other) => ComputeState::Other(other.as_str().to_string()),
    };

    ComputeInstance {
        instance_id: instance.instance_id().unwrap_or_default().to_string(),
        state,
        public_ip: instance.public_ip_address().map(|s| s.to_string()),
        private_ip: instance.private_ip_address().map(|s| s.to_string()),
    }
}

//! RDS database instance management

use crate::aws::context::AwsContext;
use crate::aws::error::classify_aws_error;
use crate::aws::types::{DbEndpoint, DbInstanceInfo};
use crate::config;
use anyhow::{Context, Result};
use aws_sdk_rds::error::ProvideErrorMetadata;
use aws_sdk_rds::Client;
use tracing::{debug, info};

/// RDS client for the stack's database instance
pub struct RdsClient {
    client: Client,
}

impl RdsClient {
    /// Create a new RDS client (loads AWS config from the environment)
    pub async fn new(region: &str) -> Result<Self> {
        let ctx = AwsContext::new(region).await;
        Ok(Self::from_context(&ctx))
    }

    /// Create an RDS client from a pre-loaded AWS context
    pub fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.rds_client(),
        }
    }

    /// Describe the database instance by identifier; "not found" maps to `None`
    pub async fn find_db_instance(&self, identifier: &str) -> Result<Option<DbInstanceInfo>> {
        let response = match self
            .client
            .describe_db_instances()
            .db_instance_identifier(identifier)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if classify_aws_error(e.code(), e.message()).is_not_found() => {
                debug!(identifier = %identifier, "Database instance not found");
                return Ok(None);
            }
            Err(e) => {
                return Err(
                    anyhow::Error::from(e).context("Failed to describe database instance")
                );
            }
        };

        let info = response.db_instances().first().map(|db| DbInstanceInfo {
            identifier: db
                .db_instance_identifier()
                .unwrap_or(identifier)
                .to_string(),
            status: db.db_instance_status().unwrap_or_default().to_string(),
            endpoint: db.endpoint().and_then(|e| {
                let address = e.address()?.to_string();
                let port = e.port()?;
                Some(DbEndpoint { address, port })
            }),
        });

        Ok(info)
    }

    /// Request creation of the database instance with the stack's fixed
    /// parameters. Does not wait for the instance to become available.
    pub async fn create_db_instance(
        &self,
        identifier: &str,
        security_group_id: &str,
    ) -> Result<()> {
        info!(
            identifier = %identifier,
            engine = config::DB_ENGINE,
            class = config::DB_INSTANCE_CLASS,
            storage_gib = config::DB_ALLOCATED_STORAGE_GIB,
            "Creating database instance"
        );

        let response = self
            .client
            .create_db_instance()
            .db_instance_identifier(identifier)
            .db_instance_class(config::DB_INSTANCE_CLASS)
            .engine(config::DB_ENGINE)
            .allocated_storage(config::DB_ALLOCATED_STORAGE_GIB)
            .storage_type(config::DB_STORAGE_TYPE)
            .master_username(config::DB_MASTER_USERNAME)
            .master_user_password(config::DB_MASTER_PASSWORD)
            .vpc_security_group_ids(security_group_id)
            .publicly_accessible(false)
            .backup_retention_period(0)
            .multi_az(false)
            .storage_encrypted(false)
            .deletion_protection(false)
            .send()
            .await
            .context("Failed to create database instance")?;

        let created = response
            .db_instance()
            .and_then(|db| db.db_instance_identifier())
            .unwrap_or(identifier);

        info!(identifier = %created, "Database instance creation requested");

        Ok(())
    }
}

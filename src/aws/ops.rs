//! Control-plane operations trait
//!
//! Abstracts every call the provisioner makes against AWS so the pipeline
//! can be unit tested against an in-memory fake instead of real clients.

use crate::aws::types::{ComputeInstance, DbInstanceInfo, NetworkContext};
use anyhow::Result;
use std::future::Future;

/// Operations the provisioning pipeline performs against the control plane.
pub trait ProvisionOps: Send + Sync {
    /// Look up the account's default network resources
    fn discover_network(&self) -> impl Future<Output = Result<NetworkContext>> + Send;

    /// Ensure the stack's ingress rules exist (already-present rules succeed)
    fn authorize_stack_ingress(
        &self,
        security_group_id: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Describe the database instance; `None` when it does not exist
    fn find_db_instance(
        &self,
        identifier: &str,
    ) -> impl Future<Output = Result<Option<DbInstanceInfo>>> + Send;

    /// Request database instance creation (does not wait for completion)
    fn create_db_instance(
        &self,
        identifier: &str,
        security_group_id: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Find a pending or running instance by its `Name` tag
    fn find_instance_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<ComputeInstance>>> + Send;

    /// Launch the tunnel host, returning its instance id
    fn launch_instance(
        &self,
        name: &str,
        network: &NetworkContext,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Describe a single instance by id; `None` when it does not exist
    fn describe_instance(
        &self,
        instance_id: &str,
    ) -> impl Future<Output = Result<Option<ComputeInstance>>> + Send;
}

//! Shared types for control-plane lookups

/// The account's default network resources, looked up fresh on every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkContext {
    /// Default VPC id
    pub vpc_id: String,
    /// Default security group id within the VPC
    pub security_group_id: String,
    /// Default subnet id within the VPC
    pub subnet_id: String,
    /// Newest available AMI matching the stack's name/architecture filter
    pub image_id: String,
}

/// Database endpoint, present once the instance is available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbEndpoint {
    pub address: String,
    pub port: i32,
}

/// Snapshot of the database instance as reported by the control plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbInstanceInfo {
    /// Instance identifier
    pub identifier: String,
    /// Lifecycle status string ("creating", "backing-up", "available", ...)
    pub status: String,
    /// Endpoint, once assigned
    pub endpoint: Option<DbEndpoint>,
}

impl DbInstanceInfo {
    /// Whether the instance has reached its ready state.
    pub fn is_available(&self) -> bool {
        self.status == "available"
    }
}

/// Lifecycle state of the tunnel host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComputeState {
    Pending,
    Running,
    /// Any other state (stopping, terminated, ...) — terminal for our purposes
    Other(String),
}

/// Snapshot of the tunnel host as reported by the control plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputeInstance {
    pub instance_id: String,
    pub state: ComputeState,
    pub public_ip: Option<String>,
    pub private_ip: Option<String>,
}

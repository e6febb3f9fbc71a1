use std::net::IpAddr;

use anyhow::Result;
use async_trait::async_trait;

/// A freshly created key pair, private half included.
pub struct KeyPair {
    pub name: String,
    pub material: String,
}

/// One inbound allow rule of a security group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngressRule {
    pub protocol: String,
    pub from_port: i64,
    pub to_port: i64,
    pub cidr: String,
}

impl IngressRule {
    /// Allow a single TCP port from the given source range.
    pub fn tcp(port: i64, cidr: &str) -> Self {
        Self {
            protocol: "tcp".to_string(),
            from_port: port,
            to_port: port,
            cidr: cidr.to_string(),
        }
    }
}

/// Parameters for launching a single instance.
#[derive(Debug, Clone)]
pub struct LaunchTemplate {
    pub image_id: String,
    pub instance_type: String,
    pub key_name: String,
    pub security_group_id: String,
    pub name_tag: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceState {
    Pending,
    Running,
    Other(String),
}

impl InstanceState {
    pub fn is_running(&self) -> bool {
        matches!(self, InstanceState::Running)
    }
}

impl From<&str> for InstanceState {
    fn from(name: &str) -> Self {
        match name {
            "pending" => InstanceState::Pending,
            "running" => InstanceState::Running,
            other => InstanceState::Other(other.to_string()),
        }
    }
}

/// Point-in-time view of a launched instance.
#[derive(Debug, Clone)]
pub struct InstanceDescription {
    pub id: String,
    pub state: InstanceState,
    pub public_ip: Option<IpAddr>,
}

/// The slice of the cloud API the deployment pipeline consumes.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    async fn create_key_pair(&self, name: &str) -> Result<KeyPair>;
    async fn create_security_group(&self, name: &str, description: &str) -> Result<String>;
    async fn authorize_ingress(&self, group_id: &str, rules: &[IngressRule]) -> Result<()>;
    /// Launch exactly one instance and return its id.
    async fn run_instance(&self, launch: &LaunchTemplate) -> Result<String>;
    async fn describe_instance(&self, instance_id: &str) -> Result<InstanceDescription>;
}

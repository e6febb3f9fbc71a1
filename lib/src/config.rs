use std::path::PathBuf;
use std::time::Duration;

use crate::ssh::HostKeyPolicy;

/// The shell script pushed to the instance once it is reachable.
pub const WEB_SERVER_SCRIPT: &str = "#!/bin/bash
yum update -y
yum install -y httpd
systemctl start httpd
systemctl enable httpd
echo 'Hello, World!' > /var/www/html/index.html
";

/// Everything one deployment run needs, passed explicitly into each stage.
#[derive(Debug, Clone)]
pub struct DeployConfig {
    pub key_name: String,
    /// Directory the private key file is written into.
    pub key_dir: PathBuf,
    pub security_group_name: String,
    pub security_group_description: String,
    pub instance_type: String,
    pub image_id: String,
    /// Value of the `Name` tag attached to the launched instance.
    pub instance_name: String,
    pub region: String,
    pub ssh_user: String,
    pub ssh_port: i64,
    pub web_port: i64,
    pub provision_script: String,
    /// Delay between instance state polls.
    pub poll_interval: Duration,
    /// Number of state polls before the wait stage gives up.
    pub wait_attempts: usize,
    pub host_key_policy: HostKeyPolicy,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            key_name: "spinup-key".to_string(),
            key_dir: PathBuf::from("."),
            security_group_name: "spinup-web".to_string(),
            security_group_description: "Security group for the spinup web deployment"
                .to_string(),
            instance_type: "t2.micro".to_string(),
            image_id: "ami-12345678".to_string(),
            instance_name: "spinup-web".to_string(),
            region: "us-east-1".to_string(),
            ssh_user: "ec2-user".to_string(),
            ssh_port: 22,
            web_port: 80,
            provision_script: WEB_SERVER_SCRIPT.to_string(),
            poll_interval: Duration::from_secs(5),
            wait_attempts: 120,
            host_key_policy: HostKeyPolicy::AcceptNew,
        }
    }
}

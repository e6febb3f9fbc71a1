use std::io::{self, Write};
use std::net::IpAddr;
use std::path::PathBuf;

use log::{debug, info, warn};
use serde::Serialize;
use tokio::time;

use crate::config::DeployConfig;
use crate::error::ProvisionError;
use crate::keys;
use crate::provider::{CloudProvider, IngressRule, LaunchTemplate};
use crate::ssh::{RemoteShell, SshTarget};

const ANY_SOURCE: &str = "0.0.0.0/0";

/// Everything a completed run produced.
#[derive(Debug, Serialize)]
pub struct Deployment {
    pub instance_id: String,
    pub security_group_id: String,
    pub public_ip: IpAddr,
    pub key_file: PathBuf,
}

impl Deployment {
    pub fn web_url(&self) -> String {
        format!("http://{}", self.public_ip)
    }
}

/// Run the full provisioning sequence. Every stage failure aborts the run;
/// nothing is rolled back.
pub async fn run(
    config: &DeployConfig,
    provider: &dyn CloudProvider,
    shell: &dyn RemoteShell,
) -> Result<Deployment, ProvisionError> {
    let key = provider
        .create_key_pair(&config.key_name)
        .await
        .map_err(|err| ProvisionError::KeyPair(err.to_string()))?;
    let key_file = keys::save_private_key(&config.key_dir, &key)?;
    info!(
        "key pair {} created and saved as {}",
        key.name,
        key_file.display()
    );

    let group_id = provider
        .create_security_group(
            &config.security_group_name,
            &config.security_group_description,
        )
        .await
        .map_err(|err| ProvisionError::SecurityGroup(err.to_string()))?;
    let rules = [
        IngressRule::tcp(config.ssh_port, ANY_SOURCE),
        IngressRule::tcp(config.web_port, ANY_SOURCE),
    ];
    provider
        .authorize_ingress(&group_id, &rules)
        .await
        .map_err(|err| ProvisionError::SecurityGroup(err.to_string()))?;
    info!(
        "security group {} created with ID {}",
        config.security_group_name, group_id
    );

    let launch = LaunchTemplate {
        image_id: config.image_id.clone(),
        instance_type: config.instance_type.clone(),
        key_name: config.key_name.clone(),
        security_group_id: group_id.clone(),
        name_tag: config.instance_name.clone(),
    };
    let instance_id = provider
        .run_instance(&launch)
        .await
        .map_err(|err| ProvisionError::Launch(err.to_string()))?;
    info!("instance {} launched", instance_id);

    wait_for_running(provider, &instance_id, config).await?;

    let description = provider
        .describe_instance(&instance_id)
        .await
        .map_err(|err| ProvisionError::AddressLookup(err.to_string()))?;
    let public_ip = description
        .public_ip
        .ok_or_else(|| ProvisionError::AddressMissing(instance_id.clone()))?;
    info!("instance public IP is {}", public_ip);

    let target = SshTarget {
        host: public_ip,
        user: config.ssh_user.clone(),
        key_file: key_file.clone(),
    };
    info!("deploying web application to {}", public_ip);
    let output = shell
        .run_script(&target, &config.provision_script)
        .await
        .map_err(|err| ProvisionError::Deploy(err.to_string()))?;
    if !output.stdout.is_empty() {
        info!("remote stdout:\n{}", output.stdout);
    }
    if !output.stderr.is_empty() {
        warn!("remote stderr:\n{}", output.stderr);
    }
    if !output.success() {
        return Err(ProvisionError::Deploy(format!(
            "provisioning script exited with status {:?}",
            output.exit_code
        )));
    }
    info!("web application deployed successfully");

    Ok(Deployment {
        instance_id,
        security_group_id: group_id,
        public_ip,
        key_file,
    })
}

/// Bounded wait for the running state. Transient describe errors are retried;
/// only exhausting the attempts surfaces as a timeout.
async fn wait_for_running(
    provider: &dyn CloudProvider,
    instance_id: &str,
    config: &DeployConfig,
) -> Result<(), ProvisionError> {
    info!(
        "waiting for instance {} to enter the running state",
        instance_id
    );
    for _ in 0..config.wait_attempts {
        match provider.describe_instance(instance_id).await {
            Ok(description) if description.state.is_running() => {
                info!("instance {} is running", instance_id);
                return Ok(());
            }
            Ok(description) => debug!("instance {} is {:?}", instance_id, description.state),
            Err(err) => warn!("could not poll instance {}: {}", instance_id, err),
        }
        time::sleep(config.poll_interval).await;
    }

    Err(ProvisionError::WaitTimeout {
        id: instance_id.to_string(),
        attempts: config.wait_attempts,
    })
}

/// Render the closing summary lines shown to the user.
pub fn print_summary(deployment: &Deployment, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "Instance public IP: {}", deployment.public_ip)?;
    writeln!(
        out,
        "Web application accessible at {}",
        deployment.web_url()
    )?;
    Ok(())
}

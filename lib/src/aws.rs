use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use rusoto_core::Region;
use rusoto_ec2::{
    AuthorizeSecurityGroupIngressRequest, CreateKeyPairRequest, CreateSecurityGroupRequest,
    DescribeInstancesRequest, Ec2, Ec2Client, IpPermission, IpRange, RunInstancesRequest, Tag,
    TagSpecification,
};

use crate::provider::{
    CloudProvider, IngressRule, InstanceDescription, InstanceState, KeyPair, LaunchTemplate,
};

/// `CloudProvider` backed by the EC2 API, using the default credential chain.
pub struct AwsEc2 {
    client: Ec2Client,
}

impl AwsEc2 {
    pub fn new(region_name: &str) -> Result<Self> {
        let region = Region::from_str(region_name)
            .with_context(|| format!("unknown region {}", region_name))?;
        Ok(Self {
            client: Ec2Client::new(region),
        })
    }
}

#[async_trait]
impl CloudProvider for AwsEc2 {
    async fn create_key_pair(&self, name: &str) -> Result<KeyPair> {
        let request = CreateKeyPairRequest {
            key_name: name.to_string(),
            ..Default::default()
        };
        let result = self
            .client
            .create_key_pair(request)
            .await
            .with_context(|| format!("creating key pair {}", name))?;
        let material = result
            .key_material
            .ok_or_else(|| anyhow!("no key material returned for {}", name))?;
        Ok(KeyPair {
            name: name.to_string(),
            material,
        })
    }

    async fn create_security_group(&self, name: &str, description: &str) -> Result<String> {
        let request = CreateSecurityGroupRequest {
            group_name: name.to_string(),
            description: description.to_string(),
            ..Default::default()
        };
        let result = self
            .client
            .create_security_group(request)
            .await
            .with_context(|| format!("creating security group {}", name))?;
        result
            .group_id
            .ok_or_else(|| anyhow!("no group id returned for {}", name))
    }

    async fn authorize_ingress(&self, group_id: &str, rules: &[IngressRule]) -> Result<()> {
        let permissions = rules
            .iter()
            .map(|rule| IpPermission {
                ip_protocol: Some(rule.protocol.clone()),
                from_port: Some(rule.from_port),
                to_port: Some(rule.to_port),
                ip_ranges: Some(vec![IpRange {
                    cidr_ip: Some(rule.cidr.clone()),
                    ..Default::default()
                }]),
                ..Default::default()
            })
            .collect();
        let request = AuthorizeSecurityGroupIngressRequest {
            group_id: Some(group_id.to_string()),
            ip_permissions: Some(permissions),
            ..Default::default()
        };
        self.client
            .authorize_security_group_ingress(request)
            .await
            .with_context(|| format!("authorizing ingress on {}", group_id))?;
        Ok(())
    }

    async fn run_instance(&self, launch: &LaunchTemplate) -> Result<String> {
        let request = RunInstancesRequest {
            image_id: Some(launch.image_id.clone()),
            instance_type: Some(launch.instance_type.clone()),
            key_name: Some(launch.key_name.clone()),
            min_count: 1,
            max_count: 1,
            security_group_ids: Some(vec![launch.security_group_id.clone()]),
            tag_specifications: Some(vec![TagSpecification {
                resource_type: Some("instance".to_string()),
                tags: Some(vec![Tag {
                    key: Some("Name".to_string()),
                    value: Some(launch.name_tag.clone()),
                }]),
            }]),
            ..Default::default()
        };
        let reservation = self
            .client
            .run_instances(request)
            .await
            .with_context(|| format!("launching {} instance", launch.instance_type))?;
        reservation
            .instances
            .unwrap_or_default()
            .first()
            .and_then(|instance| instance.instance_id.clone())
            .ok_or_else(|| anyhow!("no instance id in reservation"))
    }

    async fn describe_instance(&self, instance_id: &str) -> Result<InstanceDescription> {
        let request = DescribeInstancesRequest {
            instance_ids: Some(vec![instance_id.to_string()]),
            ..Default::default()
        };
        let result = self
            .client
            .describe_instances(request)
            .await
            .with_context(|| format!("describing instance {}", instance_id))?;
        let instance = result
            .reservations
            .unwrap_or_default()
            .into_iter()
            .flat_map(|reservation| reservation.instances.unwrap_or_default())
            .next()
            .ok_or_else(|| anyhow!("instance {} not found", instance_id))?;

        let state = instance
            .state
            .and_then(|state| state.name)
            .map_or_else(
                || InstanceState::Other("unknown".to_string()),
                |name| InstanceState::from(name.as_str()),
            );
        let public_ip = match instance.public_ip_address {
            Some(raw) => Some(
                raw.parse()
                    .with_context(|| format!("unparseable public IP {}", raw))?,
            ),
            None => None,
        };

        Ok(InstanceDescription {
            id: instance_id.to_string(),
            state,
            public_ip,
        })
    }
}

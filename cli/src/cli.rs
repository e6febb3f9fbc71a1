use std::io;

use anyhow::Result;
use clap::ArgMatches;
use log::info;
use spinup_lib::{aws::AwsEc2, config::DeployConfig, pipeline, ssh::OpenSsh};

pub(crate) async fn deploy(sub: &ArgMatches) -> Result<()> {
    let json: bool = sub.is_present("json");

    let config = DeployConfig::default();
    let provider = AwsEc2::new(&config.region)?;
    let shell = OpenSsh::new(config.host_key_policy.clone());

    info!("deploying to {}", config.region);
    let deployment = pipeline::run(&config, &provider, &shell).await?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if json {
        serde_json::to_writer_pretty(&mut handle, &deployment)?;
        println!();
    } else {
        pipeline::print_summary(&deployment, &mut handle)?;
    }

    Ok(())
}

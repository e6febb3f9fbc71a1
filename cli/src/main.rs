mod cli;

use anyhow::{bail, Result};
use clap::{App, Arg};

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::init();

    let mut app = App::new("spinup")
        .version("0.1.0")
        .about("Provision a single EC2 web server in one shot")
        .subcommand(
            App::new("deploy")
                .about("Create key pair and security group, launch the instance, deploy the web app")
                .arg(
                    Arg::new("json")
                        .short('j')
                        .long("json")
                        .help("print the deployment summary as json"),
                ),
        );

    let mut help_text = Vec::new();
    app.write_help(&mut help_text)
        .expect("Failed to write help text to buffer");
    let matches = app.get_matches();

    match matches.subcommand() {
        Some(("deploy", sub)) => cli::deploy(sub).await,
        _ => {
            bail!(format!(
                "Invalid subcommand\n {}",
                String::from_utf8(help_text).expect("help text contains invalid UTF8")
            ))
        }
    }?;
    Ok(())
}

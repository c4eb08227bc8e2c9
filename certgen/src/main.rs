// SPDX-License-Identifier: MIT

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use kube::Client;
use kube::config::{KubeConfigOptions, Kubeconfig};
use log::info;

use certgen::config::{Cli, Command, CreateConfig, PatchConfig};
use certgen::{create, patch};

async fn kube_client(kubeconfig: Option<&Path>) -> Result<Client> {
    let config = match kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path)
                .with_context(|| format!("error reading kubeconfig {}", path.display()))?;
            kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .context("error building kubernetes config")?
        }
        None => kube::Config::infer()
            .await
            .context("error building kubernetes config")?,
    };
    Client::try_from(config).context("error creating kubernetes client")
}

#[tokio::main]
async fn main() -> Result<()> {
    let Cli {
        kubeconfig,
        log_level,
        ca_name,
        command,
    } = Cli::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    match command {
        Command::Create(args) => {
            let config = CreateConfig::new(args, ca_name);
            let client = kube_client(kubeconfig.as_deref()).await?;
            let outcome = create::run(client, &config).await?;
            info!("{outcome:?}: {}", config.secret);
        }
        Command::Patch(args) => {
            let config = PatchConfig::new(args, ca_name)?;
            let client = kube_client(kubeconfig.as_deref()).await?;
            patch::run(client, &config).await?;
        }
        Command::Version => println!("{}", env!("CARGO_PKG_VERSION")),
    }

    Ok(())
}

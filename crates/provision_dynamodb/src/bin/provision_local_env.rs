use std::path::PathBuf;

use anyhow::Context;
use clap::builder::BoolishValueParser;
use clap::Parser;
use provision_dynamodb::adapters::dynamodb::DynamoDbTableStore;
use provision_dynamodb::domain::config::{ConfigLayer, ProvisionerConfig};
use provision_dynamodb::handlers::provision::{run_provisioning, ProvisionOptions};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "provision_local_env",
    about = "Create the users table and seed the admin account in a local DynamoDB"
)]
struct Opts {
    /// TOML file with endpoint, region and credentials
    #[arg(long, env = "PROVISION_CONFIG")]
    config: Option<PathBuf>,
    /// Store endpoint URL [default: http://localhost:8000]
    #[arg(long, env = "PROVISION_ENDPOINT")]
    endpoint: Option<String>,
    /// Region identifier [default: ap-northeast-1]
    #[arg(long, env = "PROVISION_REGION")]
    region: Option<String>,
    /// Access key id (required; DynamoDB Local accepts any value)
    #[arg(long, env = "PROVISION_ACCESS_KEY_ID")]
    access_key_id: Option<String>,
    /// Secret access key (required; DynamoDB Local accepts any value)
    #[arg(long, env = "PROVISION_SECRET_ACCESS_KEY", hide_env_values = true)]
    secret_access_key: Option<String>,
    /// Wait for a newly created table to become active before seeding
    #[arg(long, env = "PROVISION_WAIT_FOR_ACTIVE", value_parser = BoolishValueParser::new())]
    wait_for_active: bool,
    /// Read the admin record back after seeding it
    #[arg(long, env = "PROVISION_VERIFY", value_parser = BoolishValueParser::new())]
    verify: bool,
    /// Emit logs as JSON lines
    #[arg(long, env = "PROVISION_JSON_LOG", value_parser = BoolishValueParser::new())]
    json_log: bool,
}

impl Opts {
    fn cli_layer(&self) -> ConfigLayer {
        ConfigLayer {
            endpoint: self.endpoint.clone(),
            region: self.region.clone(),
            access_key_id: self.access_key_id.clone(),
            secret_access_key: self.secret_access_key.clone(),
            wait_for_active: self.wait_for_active.then_some(true),
            verify: self.verify.then_some(true),
        }
    }
}

fn resolve_config(opts: &Opts) -> anyhow::Result<ProvisionerConfig> {
    let mut layer = ConfigLayer::defaults();
    if let Some(path) = &opts.config {
        layer = layer.overlay(ConfigLayer::from_file(path)?);
    }
    layer
        .overlay(opts.cli_layer())
        .resolve()
        .context("invalid provisioner configuration")
}

fn init_tracing(json_log: bool) {
    use tracing_subscriber::prelude::*;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json_log {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();
    init_tracing(opts.json_log);

    let config = resolve_config(&opts)?;
    info!(
        component = "provision_local_env",
        event = "config_resolved",
        endpoint = %config.connection.endpoint,
        region = %config.connection.region,
        wait_for_active = config.wait_for_active,
        verify = config.verify,
        "provisioning local environment"
    );

    let store = DynamoDbTableStore::connect(&config.connection).await;
    let report = run_provisioning(&store, &ProvisionOptions::from(&config))
        .context("provisioning failed")?;

    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("failed to serialize report")?
    );
    Ok(())
}

//! Municipality code reconciliation job - main entry point
//!
//! `--queue` populates the workqueue and exits; without it the workqueue is
//! drained and suppliers are updated.

use clap::Parser;
use kommunekode_sync::automation::{
    AutomationServerClient, Credential, CredentialStore, WorkItemStatus, WorkQueue,
};
use kommunekode_sync::config::JobConfig;
use kommunekode_sync::error::{JobError, JobResult};
use kommunekode_sync::mapping::MunicipalityMapping;
use kommunekode_sync::nexus::client::NexusConfig;
use kommunekode_sync::nexus::{NexusClient, SupplierSource};
use kommunekode_sync::observability::init_default_logging;
use kommunekode_sync::reporting::{HttpReporter, LogReporter, Reporter};
use kommunekode_sync::rules::RuleSet;
use kommunekode_sync::tracking::{HttpTracker, TaskTracker};
use kommunekode_sync::workflow::{populate_queue, process_queue, JobContext};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Opdatering af kommunekode på leverandør i Nexus
#[derive(Parser)]
#[command(name = "kommunekode-sync")]
#[command(about = "Reconcile the municipality code on Nexus suppliers from their postal code")]
#[command(version)]
struct Cli {
    /// Populate the workqueue and exit
    #[arg(long)]
    queue: bool,

    /// Path to the Excel file containing the rules
    #[arg(long, value_name = "FILE", default_value = "./Regelsæt.xlsx")]
    excel_file: PathBuf,

    /// Postal code to municipality code table (overrides the config)
    #[arg(long, value_name = "FILE")]
    mapping_file: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE", env = "KOMMUNEKODE_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_default_logging(cli.verbose);

    info!("Starting kommunekode-sync v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(cli).await {
        error!("Run failed: {}", e);
        process::exit(1);
    }

    info!("Run complete");
}

async fn run(cli: Cli) -> JobResult<()> {
    let mut config = load_configuration(cli.config.as_deref())?;
    if let Some(mapping_file) = cli.mapping_file {
        config.process.mapping_file = mapping_file;
    }

    let automation = Arc::new(AutomationServerClient::from_environment(
        &config.automation_server,
    )?);

    let ctx = build_context(&config, automation.clone()).await?;

    // The rules workbook is a precondition for both modes
    let rules = RuleSet::load(&cli.excel_file)?;

    if cli.queue {
        let exclusions = rules.exclusion_list(&config.process.exclusion_column);
        ctx.queue.clear(WorkItemStatus::New).await?;
        populate_queue(&ctx, &exclusions).await?;
        return Ok(());
    }

    let mapping = MunicipalityMapping::load(&config.process.mapping_file)?;
    process_queue(&ctx, &mapping).await?;
    Ok(())
}

fn load_configuration(config_path: Option<&Path>) -> JobResult<JobConfig> {
    match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Ok(JobConfig::load_from_file(path)?)
        }
        None => {
            for path_str in ["kommunekode.toml", "config/kommunekode.toml"] {
                let path = PathBuf::from(path_str);
                if path.exists() {
                    info!("Loading configuration from: {}", path.display());
                    return Ok(JobConfig::load_from_file(&path)?);
                }
            }

            info!("No configuration file found, using defaults");
            let config = JobConfig::default();
            config.validate()?;
            Ok(config)
        }
    }
}

/// Bootstrap: fetch credentials and build every collaborator
async fn build_context(
    config: &JobConfig,
    automation: Arc<AutomationServerClient>,
) -> JobResult<JobContext> {
    let nexus_credential = automation
        .get_credential(&config.credentials.nexus)
        .await?;
    let tracking_credential = automation
        .get_credential(&config.credentials.tracking)
        .await?;

    let suppliers = ClientFactory::nexus(config, &nexus_credential)?;
    let tracker = ClientFactory::tracker(config, &tracking_credential)?;
    let reporter = ClientFactory::reporter(config, &*automation).await?;

    let queue: Arc<dyn WorkQueue> = automation;
    Ok(JobContext::new(
        &config.process,
        queue,
        suppliers,
        tracker,
        reporter,
    ))
}

/// Collaborator factory, keeping construction out of the workflow
struct ClientFactory;

impl ClientFactory {
    fn nexus(config: &JobConfig, credential: &Credential) -> JobResult<Arc<dyn SupplierSource>> {
        let instance = credential.data_str("instance").ok_or_else(|| {
            JobError::incomplete_credential(&config.credentials.nexus, "instance")
        })?;

        let client = NexusClient::new(NexusConfig {
            base_url: config.nexus.base_url_for(instance),
            token_url: config.nexus.token_url_for(instance),
            client_id: credential.username.clone(),
            client_secret: credential.password.clone(),
            timeout: Duration::from_millis(config.nexus.timeout_ms),
        })?;
        Ok(Arc::new(client))
    }

    fn tracker(config: &JobConfig, credential: &Credential) -> JobResult<Arc<dyn TaskTracker>> {
        let tracker = HttpTracker::new(
            &config.tracking.url,
            &credential.username,
            &credential.password,
            Duration::from_millis(config.tracking.timeout_ms),
        )
        .map_err(|e| JobError::startup(format!("tracking client: {e}")))?;
        Ok(Arc::new(tracker))
    }

    async fn reporter(
        config: &JobConfig,
        store: &dyn CredentialStore,
    ) -> JobResult<Arc<dyn Reporter>> {
        if !config.reporting.enabled {
            info!("Reporting disabled, data-quality issues are only logged");
            return Ok(Arc::new(LogReporter));
        }

        let credential = store.get_credential(&config.credentials.reporting).await?;
        let reporter = HttpReporter::new(
            &config.reporting.url,
            &credential.username,
            &credential.password,
            Duration::from_millis(config.reporting.timeout_ms),
        )
        .map_err(|e| JobError::startup(format!("reporting client: {e}")))?;
        Ok(Arc::new(reporter))
    }
}

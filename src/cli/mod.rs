//! # Command Line Interface
//!
//! Offline tooling around the convergence engine: validate route files, print
//! the distribution model a group would converge to, and simulate full
//! reconciliation against in-memory backends.

pub mod output;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use futures::future::join_all;
use serde::Serialize;
use tracing::{info, Instrument};

use crate::config::{EngineConfig, ObservabilityConfig};
use crate::domain::{
    Certificate, DistributionModel, Event, GroupName, ReconciliationStatus, RouteDescriptor,
};
use crate::observability::{describe_metrics, init_logging, log_config_info};
use crate::services::{
    aggregate, AliasOwnershipProtocol, ConvergenceReconciler, DistributionModelBuilder,
    ReconcilerBackends,
};
use crate::sources::RouteFile;
use crate::storage::{
    InMemoryCertificateRepository, InMemoryDescriptorRepository, InMemoryDistributionRepository,
    InMemoryDnsRepository, InMemoryEventRecorder, InMemoryStatusRepository,
};
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "edgeplane")]
#[command(about = "Converge route descriptors into CDN distributions")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Engine configuration file (TOML, YAML or JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate every route in a file
    Validate {
        /// Route file (YAML or JSON)
        file: PathBuf,
    },

    /// Print the distribution model one group converges to
    Plan {
        file: PathBuf,

        /// Group to plan
        #[arg(long)]
        group: String,

        /// Certificates available to TLS matching, as ARN=DOMAIN[,ALT...]
        #[arg(long = "certificate", value_parser = parse_certificate)]
        certificates: Vec<Certificate>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        output: OutputFormat,
    },

    /// Reconcile every route against in-memory backends
    Simulate {
        file: PathBuf,

        /// Certificates available to TLS matching, as ARN=DOMAIN[,ALT...]
        #[arg(long = "certificate", value_parser = parse_certificate)]
        certificates: Vec<Certificate>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
}

/// Parse `ARN=DOMAIN[,ALT...]` into an issued certificate
pub fn parse_certificate(raw: &str) -> Result<Certificate, String> {
    let (arn, domains) =
        raw.split_once('=').ok_or_else(|| format!("'{}' is not of the form ARN=DOMAIN", raw))?;
    let mut domains = domains.split(',').map(str::trim).filter(|d| !d.is_empty());
    let primary = domains.next().ok_or_else(|| format!("'{}' names no domain", raw))?;
    Ok(domains.fold(Certificate::issued(arn.trim(), primary), |cert, alt| {
        cert.with_alternative_name(alt)
    }))
}

/// Run CLI commands
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    initialise_logging(&cli)?;
    describe_metrics();

    let config = EngineConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    log_config_info(&config);

    match cli.command {
        Commands::Validate { file } => validate(&file),
        Commands::Plan { file, group, certificates, output } => {
            plan(&config, &file, GroupName::new(group), certificates, output).await
        }
        Commands::Simulate { file, certificates, output } => {
            simulate(config, &file, certificates, output).await
        }
    }
}

fn initialise_logging(cli: &Cli) -> anyhow::Result<()> {
    let mut observability = ObservabilityConfig::from_env();
    if cli.verbose {
        observability.log_level = "debug".to_string();
    } else if std::env::var("EDGEPLANE_LOG_LEVEL").is_err() {
        observability.log_level = "warn".to_string();
    }
    observability.json_logging |= cli.json_logs;

    init_logging(&observability)?;
    Ok(())
}

fn load_descriptors(file: &Path) -> anyhow::Result<Vec<RouteDescriptor>> {
    let routes = RouteFile::load(file)?;
    Ok(routes.descriptors()?)
}

fn by_group(descriptors: &[RouteDescriptor]) -> BTreeMap<GroupName, Vec<RouteDescriptor>> {
    let mut groups: BTreeMap<GroupName, Vec<RouteDescriptor>> = BTreeMap::new();
    for descriptor in descriptors {
        groups.entry(descriptor.group.clone()).or_default().push(descriptor.clone());
    }
    groups
}

fn validate(file: &Path) -> anyhow::Result<()> {
    let descriptors = load_descriptors(file)?;
    let mut failures = 0;

    for descriptor in &descriptors {
        match descriptor.validate() {
            Ok(()) => println!("✅ {}", descriptor.reference),
            Err(e) => {
                failures += 1;
                println!("❌ {}: {}", descriptor.reference, e);
            }
        }
    }

    for group in by_group(&descriptors).keys() {
        if let Err(e) = aggregate(group, &descriptors) {
            failures += 1;
            println!("❌ group {}: {}", group, e);
        }
    }

    if failures > 0 {
        anyhow::bail!("{} problem(s) found in {}", failures, file.display());
    }
    println!("{} route(s) valid", descriptors.len());
    Ok(())
}

async fn plan(
    config: &EngineConfig,
    file: &Path,
    group: GroupName,
    certificates: Vec<Certificate>,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let descriptors = load_descriptors(file)?;
    for descriptor in descriptors.iter().filter(|d| d.group == group) {
        descriptor.validate()?;
    }

    let aggregated = aggregate(&group, &descriptors)?;
    if aggregated.is_empty() {
        anyhow::bail!("group '{}' has no provisioned routes in {}", group, file.display());
    }

    let certificates = InMemoryCertificateRepository::new(certificates);
    let model = DistributionModelBuilder::new(config, &certificates).build(&aggregated, None).await?;
    output::print_structured(&model, output)
}

#[derive(Debug, Serialize)]
struct SimulationFailure {
    descriptor: String,
    reason: String,
    /// Transient backend failures converge on a later cycle; input errors do not
    retryable: bool,
    error: String,
}

#[derive(Debug, Serialize)]
struct SimulationReport {
    distributions: Vec<DistributionModel>,
    statuses: Vec<ReconciliationStatus>,
    events: Vec<Event>,
    failures: Vec<SimulationFailure>,
}

async fn simulate(
    config: EngineConfig,
    file: &Path,
    certificates: Vec<Certificate>,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let descriptors = load_descriptors(file)?;
    let groups = by_group(&descriptors);

    let distributions = Arc::new(InMemoryDistributionRepository::new());
    let statuses = Arc::new(InMemoryStatusRepository::new());
    let events = Arc::new(InMemoryEventRecorder::new());
    let dns = Arc::new(InMemoryDnsRepository::new());
    let backends = ReconcilerBackends {
        distributions: distributions.clone(),
        aliases: Arc::new(AliasOwnershipProtocol::new(dns, config.alias.ownership_token.clone())),
        certificates: Arc::new(InMemoryCertificateRepository::new(certificates)),
        statuses: statuses.clone(),
        descriptors: Arc::new(InMemoryDescriptorRepository::new(descriptors.clone())),
        events: events.clone(),
    };
    let reconciler = ConvergenceReconciler::new(config, backends);

    info!(groups = groups.len(), descriptors = descriptors.len(), "Starting simulation");

    // Groups converge concurrently; members of one group run in order.
    let runs = groups.values().map(|members| {
        let reconciler = &reconciler;
        async move {
            let mut failures = Vec::new();
            for descriptor in members {
                let span = crate::reconcile_span!(descriptor.group, descriptor.reference);
                if let Err(e) = reconciler.reconcile(descriptor).instrument(span).await {
                    failures.push(SimulationFailure {
                        descriptor: descriptor.reference.to_string(),
                        reason: e.reason().to_string(),
                        retryable: !e.is_fatal(),
                        error: e.to_string(),
                    });
                }
            }
            failures
        }
    });
    let failures: Vec<SimulationFailure> = join_all(runs).await.into_iter().flatten().collect();

    let mut models = Vec::new();
    for group in groups.keys() {
        if let Some(model) = distributions.get(group).await {
            models.push(model);
        }
    }

    let report = SimulationReport {
        distributions: models,
        statuses: statuses.all().await,
        events: events.events().await,
        failures,
    };

    match output {
        OutputFormat::Table => {
            print!("{}", output::status_table(&report.statuses));
            for failure in &report.failures {
                let retry = if failure.retryable { ", retryable" } else { "" };
                println!("❌ {} [{}{}]: {}", failure.descriptor, failure.reason, retry, failure.error);
            }
        }
        format => output::print_structured(&report, format)?,
    }

    if !report.failures.is_empty() {
        anyhow::bail!("{} route(s) failed to reconcile", report.failures.len());
    }
    Ok(())
}

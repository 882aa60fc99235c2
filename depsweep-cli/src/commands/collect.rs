//! `depsweep collect` command handler

use std::collections::BTreeMap;
use std::io::Write;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use depsweep_collector::{CollectionDriver, CollectorConfig, Package};
use depsweep_core::config::DepsweepConfig;

use crate::cli::CollectArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `collect` command.
pub async fn execute(
    args: CollectArgs,
    config: &DepsweepConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let collector_config = build_collector_config(&args, config);
    let driver = CollectionDriver::builder()
        .config(collector_config)
        .builtin_collectors()
        .build()?;

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, cancelling collection");
                cancel.cancel();
            }
        })
    };

    info!(
        path = %args.path.display(),
        collectors = ?driver.collector_names(),
        "starting collection"
    );
    let result = driver.collect_with_cancel(&args.path, cancel).await;
    interrupt.abort();

    let report = CollectReport::new(args.path.display().to_string(), result?);
    writer.render(&report)
}

/// Merge command-line flags over the `[collect]` section.
///
/// Flags only ever widen: `--strict` and `--external-tools` switch features on,
/// `--ignore` appends. `--collectors` replaces the configured list.
pub fn build_collector_config(args: &CollectArgs, config: &DepsweepConfig) -> CollectorConfig {
    let mut collector_config = CollectorConfig::from_core(&config.collect);
    collector_config.strict_mode |= args.strict;
    collector_config.external_tools |= args.external_tools;
    collector_config
        .ignore_patterns
        .extend(args.ignore.iter().cloned());
    if !args.collectors.is_empty() {
        collector_config.enabled_collectors = args.collectors.clone();
    }
    if let Some(prefix) = &args.strip_prefix {
        collector_config.strip_prefix = prefix.clone();
    }
    collector_config
}

/// Result of a collection run.
#[derive(Serialize)]
pub struct CollectReport {
    pub root: String,
    pub total: usize,
    /// Package count per purl type.
    pub by_type: BTreeMap<String, usize>,
    pub packages: Vec<Package>,
}

impl CollectReport {
    pub fn new(root: String, packages: Vec<Package>) -> Self {
        let mut by_type = BTreeMap::new();
        for pkg in &packages {
            *by_type.entry(pkg.purl_type.to_lowercase()).or_insert(0) += 1;
        }
        Self {
            root,
            total: packages.len(),
            by_type,
            packages,
        }
    }
}

impl Render for CollectReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Collected: {}", self.root.bold())?;
        let breakdown = self
            .by_type
            .iter()
            .map(|(t, n)| format!("{t}: {n}"))
            .collect::<Vec<_>>()
            .join(", ");
        if breakdown.is_empty() {
            writeln!(w, "Packages: {}", self.total)?;
        } else {
            writeln!(w, "Packages: {} ({breakdown})", self.total)?;
        }
        writeln!(w)?;

        if self.packages.is_empty() {
            writeln!(w, "{}", "No packages found.".yellow())?;
            return Ok(());
        }

        writeln!(w, "{:<55} {:<20} Source", "PURL", "License")?;
        writeln!(w, "{}", "-".repeat(100))?;
        for pkg in &self.packages {
            let license = if pkg.license_declared.is_empty() {
                "-".to_owned()
            } else {
                pkg.license_declared
                    .iter()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            let purl = if pkg.version.is_empty() {
                pkg.purl.dimmed()
            } else {
                pkg.purl.normal()
            };
            writeln!(w, "{:<55} {:<20} {}", purl, license, pkg.source_location)?;
        }

        Ok(())
    }
}

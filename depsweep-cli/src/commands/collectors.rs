//! `depsweep collectors` command handler

use std::io::Write;

use serde::Serialize;

use depsweep_collector::{CollectorConfig, builtin_collectors};
use depsweep_core::config::DepsweepConfig;

use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `collectors` command.
pub fn execute(config: &DepsweepConfig, writer: &OutputWriter) -> Result<(), CliError> {
    let report = build_report(&CollectorConfig::from_core(&config.collect))?;
    writer.render(&report)
}

fn build_report(config: &CollectorConfig) -> Result<CollectorsReport, CliError> {
    let collectors = builtin_collectors()?
        .iter()
        .map(|c| CollectorEntry {
            name: c.name().to_owned(),
            purl_type: c.purl_type().to_owned(),
            enabled: config.is_collector_enabled(c.name()),
            parsers: c
                .slots()
                .iter()
                .map(|slot| ParserEntry {
                    kind: slot.kind().to_string(),
                    matcher: slot.matcher().description(),
                })
                .collect(),
        })
        .collect();
    Ok(CollectorsReport { collectors })
}

#[derive(Serialize)]
pub struct CollectorsReport {
    pub collectors: Vec<CollectorEntry>,
}

#[derive(Serialize)]
pub struct CollectorEntry {
    pub name: String,
    pub purl_type: String,
    pub enabled: bool,
    pub parsers: Vec<ParserEntry>,
}

#[derive(Serialize)]
pub struct ParserEntry {
    pub kind: String,
    pub matcher: String,
}

impl Render for CollectorsReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "{:<10} {:<8} {:<9} Parsers", "Name", "Type", "Status")?;
        writeln!(w, "{}", "-".repeat(72))?;
        for c in &self.collectors {
            let status = if c.enabled {
                "enabled".green()
            } else {
                "disabled".dimmed()
            };
            let parsers = c
                .parsers
                .iter()
                .map(|p| format!("{} ({})", p.matcher, p.kind))
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(w, "{:<10} {:<8} {:<9} {}", c.name, c.purl_type, status, parsers)?;
        }
        Ok(())
    }
}

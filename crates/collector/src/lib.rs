#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`CollectorError`)
//! - [`config`]: Engine configuration (`CollectorConfig`, builder)
//! - [`types`]: Domain types (`Package`, `Ecosystem`)
//! - [`purl`]: Package URL rendering (`PackageUrl`, `derive_purl`, `split_name`)
//! - [`graph`]: Per-manifest dependency graph (`DependencyGraph`)
//! - [`consolidate`]: Global consolidation pass (`consolidate`, `merge`)
//! - [`matcher`]: File matching rules (`FileMatcher`, `MimeKind`)
//! - [`parser`]: Manifest parsers (`PackageParser`, `MainPackageParser`, npm/cargo/pypi)
//! - [`collector`]: Per-ecosystem parser bundles and compose policies (`Collector`)
//! - [`tool`]: Bounded external tool execution (`run_bounded`)
//! - [`driver`]: Walk, concurrent dispatch, consolidation (`CollectionDriver`)
//!
//! # Architecture
//!
//! ```text
//! root --> walkdir (spawn_blocking, ignore GlobSet)
//!             |
//!             +--> Collector::claim --> Vec<CollectRequest> per collector
//!                                             |
//!                    +------------------------+------------------------+
//!                    |                        |                        |
//!              tokio::spawn(npm)       tokio::spawn(cargo)      tokio::spawn(pypi)
//!                    |                        |                        |
//!                    +------------- mpsc --> fan-in <------------------+
//!                                             |
//!                                        consolidate
//!                                             |
//!                                  strip source prefix --> Vec<Package>
//! ```

pub mod collector;
pub mod config;
pub mod consolidate;
pub mod driver;
pub mod error;
pub mod graph;
pub mod matcher;
pub mod parser;
pub mod purl;
pub mod tool;
pub mod types;

// --- Public API Re-exports ---

// Driver (main orchestrator)
pub use driver::{CollectionDriver, CollectionDriverBuilder};

// Configuration
pub use config::{CollectorConfig, CollectorConfigBuilder};

// Error
pub use error::CollectorError;

// Types
pub use types::{Ecosystem, Package};

// Identity
pub use purl::{PackageUrl, derive_purl, identity_key, split_name};

// Graph & consolidation
pub use consolidate::{ConsolidateOptions, consolidate, merge};
pub use graph::DependencyGraph;

// Collectors & parsers
pub use collector::{
    CollectContext, CollectRequest, Collector, ComposePolicy, Enrichment, builtin_collectors,
};
pub use matcher::{FileMatcher, MimeKind};
pub use parser::cargo::{CargoLockParser, CargoManifestParser};
pub use parser::npm::{NpmLockParser, NpmManifestParser};
pub use parser::pypi::RequirementsParser;
pub use parser::{MainPackageParser, PackageParser, ParserSlot, RequestKind};

//! dirsift - organize directory trees with deduplication and an audit trail
//!
//! This library classifies files into a category/date hierarchy keyed by
//! extension, deletes byte-identical duplicates found within a run, moves
//! the survivors collision-safely, and records every move in a durable
//! SQLite audit log alongside per-folder completion markers.

pub mod audit;
pub mod backup;
pub mod category;
pub mod cli;
pub mod config;
pub mod date;
pub mod engine;
pub mod fingerprint;
pub mod output;
pub mod reaper;

pub use audit::{AuditError, AuditLog, RelocationRecord};
pub use backup::backup;
pub use category::CategoryMap;
pub use config::{CompiledFilters, ConfigError, SiftConfig};
pub use date::{DateExtractor, DateInference, DateSource};
pub use engine::{OrganizeError, OrganizeOptions, RelocationEngine, RunReport, RunStats};
pub use fingerprint::fingerprint;
pub use reaper::reap;

pub use cli::{run, Cli};

//! Optional TOML configuration.
//!
//! A config file can preset run flags, name folders and filename patterns to
//! leave alone, and extend the category table with custom mappings. All of
//! it is optional; a missing file means defaults.
//!
//! # Configuration File Format
//!
//! ```toml
//! [options]
//! deep_search = true
//! use_date = true
//!
//! [exclude]
//! folders = ["/data/photos/originals"]
//! filenames = ["Thumbs.db", ".DS_Store"]
//! patterns = ["*.part", "*.crdownload"]
//!
//! [[categories]]
//! category = "Code"
//! subcategory = "Rust_Sources"
//! extensions = [".rs"]
//! ```

use crate::category::CategoryMap;
use glob::Pattern;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Errors that can occur during configuration loading.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    ConfigNotFound(PathBuf),
    /// Invalid TOML syntax or structure.
    ConfigInvalid(String),
    /// Invalid glob pattern provided.
    InvalidGlobPattern(String),
    /// IO error while reading configuration.
    IoError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ConfigNotFound(path) => {
                write!(f, "Configuration file not found: {}", path.display())
            }
            ConfigError::ConfigInvalid(msg) => write!(f, "Invalid configuration: {}", msg),
            ConfigError::InvalidGlobPattern(pattern) => {
                write!(f, "Invalid glob pattern '{}'", pattern)
            }
            ConfigError::IoError(msg) => write!(f, "IO error reading configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Top-level configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiftConfig {
    /// Default run flags, overridable per invocation.
    #[serde(default)]
    pub options: RunDefaults,

    /// Things to leave untouched.
    #[serde(default)]
    pub exclude: ExcludeRules,

    /// Extra category mappings layered over the standard table.
    #[serde(default)]
    pub categories: Vec<CategoryRule>,
}

/// Run flags as stored in configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunDefaults {
    /// Descend into subdirectories when discovering files.
    #[serde(default)]
    pub deep_search: bool,

    /// Sub-divide destinations by inferred year/month.
    #[serde(default)]
    pub use_date: bool,
}

/// Exclusion rules: directory prefixes, exact filenames, glob patterns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludeRules {
    /// Directories to skip entirely (absolute or relative paths).
    #[serde(default)]
    pub folders: Vec<PathBuf>,

    /// Exact filenames to leave in place (e.g. "Thumbs.db").
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Glob patterns for filenames to leave in place (e.g. "*.part").
    #[serde(default)]
    pub patterns: Vec<String>,
}

/// One user-defined category mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRule {
    pub category: String,
    pub subcategory: String,
    pub extensions: Vec<String>,
}

impl SiftConfig {
    /// Load configuration, with fallback to defaults.
    ///
    /// Lookup order:
    /// 1. the explicitly provided path, if any
    /// 2. `.dirsiftrc.toml` in the current directory
    /// 3. `~/.config/dirsift/config.toml`
    /// 4. built-in defaults
    ///
    /// An explicitly provided path that cannot be read is an error; the
    /// fallback locations are only used when present.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(".dirsiftrc.toml");
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("dirsift")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }

    /// Builds the category table: the standard mappings extended with the
    /// configured custom rules.
    pub fn category_map(&self) -> CategoryMap {
        let mut map = CategoryMap::standard();
        for rule in &self.categories {
            let extensions: Vec<&str> = rule.extensions.iter().map(String::as_str).collect();
            map.add_mapping(&rule.category, &rule.subcategory, &extensions);
        }
        map
    }

    /// Compiles the filename-level exclusion rules for matching.
    pub fn compile_filters(&self) -> Result<CompiledFilters, ConfigError> {
        let patterns = self
            .exclude
            .patterns
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CompiledFilters {
            exclude_filenames: self.exclude.filenames.iter().cloned().collect(),
            exclude_patterns: patterns,
        })
    }
}

/// Pre-compiled filename filters applied during discovery.
///
/// The default value excludes nothing.
#[derive(Debug, Default)]
pub struct CompiledFilters {
    exclude_filenames: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
}

impl CompiledFilters {
    /// Check whether a file should be considered for organization.
    pub fn should_include(&self, file_path: &Path) -> bool {
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if self.exclude_filenames.contains(file_name.as_ref()) {
            return false;
        }

        if self
            .exclude_patterns
            .iter()
            .any(|pattern| pattern.matches(&file_name))
        {
            return false;
        }

        true
    }
}

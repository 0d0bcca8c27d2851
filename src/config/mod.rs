//! Configuration module for Page-Sounder
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use page_sounder::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("page-sounder.toml")).unwrap();
//! println!("Probe timeout: {}ms", config.crawler.probe_timeout_ms);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, StorageConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{load_config, load_config_or_default, parse_config};
pub use validation::validate;

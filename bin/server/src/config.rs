//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the server,
//! loaded via the `config` crate from environment variables. Nested keys use
//! a double underscore, e.g. `LAYOUT__DIRECTION=right`.

use mailflow_workflow::{LayoutDirection, LayoutOptions};
use serde::Deserialize;

/// Server configuration.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// PostgreSQL database connection URL. Without it workflows are kept in
    /// memory only.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Maximum number of pooled database connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Auto-layout settings for new editing sessions.
    #[serde(default)]
    pub layout: LayoutConfig,
}

/// Auto-layout configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LayoutConfig {
    #[serde(default)]
    pub direction: LayoutDirection,

    /// Gap between nodes in the same rank.
    #[serde(default = "default_spacing")]
    pub spacing: f64,

    /// Gap between ranks.
    #[serde(default = "default_spacing")]
    pub layer_spacing: f64,

    /// Margin around the diagram.
    #[serde(default = "default_padding")]
    pub padding: f64,

    /// Largest workflow the layout will accept.
    #[serde(default = "default_max_nodes")]
    pub max_nodes: usize,
}

fn default_bind_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_spacing() -> f64 {
    50.0
}

fn default_padding() -> f64 {
    20.0
}

fn default_max_nodes() -> usize {
    2000
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            direction: LayoutDirection::default(),
            spacing: default_spacing(),
            layer_spacing: default_spacing(),
            padding: default_padding(),
            max_nodes: default_max_nodes(),
        }
    }
}

impl From<LayoutConfig> for LayoutOptions {
    fn from(config: LayoutConfig) -> Self {
        Self {
            direction: config.direction,
            spacing: config.spacing,
            layer_spacing: config.layer_spacing,
            padding: config.padding,
            max_nodes: config.max_nodes,
            ..Self::default()
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration values are invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

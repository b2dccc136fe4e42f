use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use validator::Validate;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Parse error for {field}: {value}")]
    Parse { field: String, value: String },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Rendering and layout settings.
#[derive(Clone, Debug, Validate, Serialize, Deserialize, PartialEq)]
pub struct RenderConfig {
    /// Ideal edge length of the force layout
    #[validate(range(min = 50, max = 800, message = "Spring length must be between 50 and 800"))]
    pub spring_length: u32,

    /// Layout relaxation steps
    #[validate(range(min = 1, max = 1000, message = "Iterations must be between 1 and 1000"))]
    pub iterations: u32,

    /// Minimum canvas width in pixels
    #[validate(range(min = 200, message = "Width must be at least 200"))]
    pub width: u32,

    /// Minimum canvas height in pixels
    #[validate(range(min = 200, message = "Height must be at least 200"))]
    pub height: u32,

    /// Page title
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            spring_length: 300,
            iterations: 200,
            width: 1200,
            height: 800,
            title: "Database Schema Graph".to_string(),
        }
    }
}

/// Overrides collected from the command line.
#[derive(Clone, Debug, Default)]
pub struct CliConfig {
    pub spring_length: Option<u32>,
    pub iterations: Option<u32>,
    pub title: Option<String>,
}

impl RenderConfig {
    /// Build from `RELGRAPH_*` environment variables, defaulting unset ones.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            spring_length: parse_env_var("RELGRAPH_SPRING_LENGTH", defaults.spring_length)?,
            iterations: parse_env_var("RELGRAPH_ITERATIONS", defaults.iterations)?,
            width: parse_env_var("RELGRAPH_WIDTH", defaults.width)?,
            height: parse_env_var("RELGRAPH_HEIGHT", defaults.height)?,
            title: env::var("RELGRAPH_TITLE").unwrap_or(defaults.title),
        };

        config.validate()?;
        Ok(config)
    }

    /// Apply command line overrides on top of the environment.
    pub fn from_cli(cli: CliConfig) -> Result<Self, ConfigError> {
        let base = Self::from_env()?;
        let config = Self {
            spring_length: cli.spring_length.unwrap_or(base.spring_length),
            iterations: cli.iterations.unwrap_or(base.iterations),
            title: cli.title.unwrap_or(base.title),
            ..base
        };

        config.validate()?;
        Ok(config)
    }
}

fn parse_env_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError::Parse {
            field: name.to_string(),
            value,
        }),
        Err(_) => Ok(default),
    }
}

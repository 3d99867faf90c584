use anyhow::Context;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_DATABASE: &str = "osm.sqlite3";
pub const DEFAULT_COLLECTION: &str = "elements";

/// Settings file contents. Every section is optional.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub output: OutputSettings,
    pub store: StoreSettings,
    pub on_invalid_coordinate: CoordinatePolicy,
}

impl Settings {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path))
            .build()
            .with_context(|| format!("Config: Failed to read {:?}", path))?;
        settings
            .try_deserialize()
            .with_context(|| format!("Config: Invalid settings in {:?}", path))
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputSettings {
    pub pretty: bool,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreSettings {
    pub database: PathBuf,
    pub collection: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE),
            collection: DEFAULT_COLLECTION.to_string(),
        }
    }
}

/// What the driver does with an element whose `lat`/`lon` cannot be parsed.
#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CoordinatePolicy {
    /// Stop the run with an error.
    #[default]
    Abort,
    /// Log a warning and continue with the next element.
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonStyle {
    Compact,
    Pretty,
}

impl JsonStyle {
    pub fn from_pretty(pretty: bool) -> Self {
        if pretty {
            JsonStyle::Pretty
        } else {
            JsonStyle::Compact
        }
    }
}

/// Settings resolved from defaults, the settings file and the command line.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub style: JsonStyle,
    pub database: PathBuf,
    pub collection: String,
    pub coordinate_policy: CoordinatePolicy,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::from(Settings::default())
    }
}

impl From<Settings> for RuntimeConfig {
    fn from(settings: Settings) -> Self {
        Self {
            style: JsonStyle::from_pretty(settings.output.pretty),
            database: settings.store.database,
            collection: settings.store.collection,
            coordinate_policy: settings.on_invalid_coordinate,
        }
    }
}

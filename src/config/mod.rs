use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::Result;
use crate::error::{ConfigError, Error as AppError};
use crate::filter::{EventFilter, RuleFilter};
use crate::normalizer::EventNormalizer;

mod defaults;
mod duration;
mod env;
mod raw;

pub(crate) use duration::HumantimeDuration;

#[derive(Debug, Clone)]
pub struct Config {
    pub runtime: RuntimeSettings,
    pub events: EventSettings,
    pub drain_interval: Duration,
    pub queue_capacity: usize,
}

#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub url: Url,
    pub api_version: Option<String>,
    pub connect_timeout: Duration,
    pub reconnect_max_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct EventSettings {
    /// `None` denies every event.
    pub filter: Option<RuleFilter>,
    pub machine_id: Option<String>,
    pub verbose: bool,
}

impl Config {
    /// Load configuration from a file and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration file cannot be read, parsed,
    /// when environment overrides are invalid, or when the resulting values
    /// fail validation.
    pub fn from_env_and_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut raw = raw::load(path).map_err(AppError::from)?;
        raw.apply_env_overrides().map_err(AppError::from)?;
        raw.validate_and_build()
    }

    /// Like [`Config::from_env_and_file`], but the file must exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FileRead`] when `path` cannot be opened, and
    /// otherwise the same errors as [`Config::from_env_and_file`].
    pub fn from_env_and_required_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        std::fs::File::open(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_env_and_file(path)
    }
}

impl EventSettings {
    pub fn normalizer(&self) -> EventNormalizer {
        let filter = self
            .filter
            .clone()
            .map(|filter| Arc::new(filter) as Arc<dyn EventFilter>);
        EventNormalizer::new(filter, self.machine_id.clone()).with_verbose(self.verbose)
    }
}

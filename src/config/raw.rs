use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde_with::serde_as;
use url::Url;

use crate::Result;
use crate::error::ConfigError;
use crate::filter::RuleFilter;

use super::defaults::{
    default_connect_timeout, default_drain_interval, default_filter, default_queue_bound,
    default_reconnect_max_interval, default_runtime_url,
};
use super::env::{env_bool, env_duration, env_list, env_parse, env_string};
use super::{Config, EventSettings, HumantimeDuration, RuntimeSettings};

pub(super) fn load(path: impl AsRef<Path>) -> std::result::Result<RawConfig, ConfigError> {
    let mut builder = ::config::Config::builder();
    let path = path.as_ref();
    builder = builder.add_source(::config::File::from(path).required(false));
    builder = builder.add_source(
        ::config::Environment::with_prefix("RTEVENTS")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("events.filter")
            .try_parsing(true),
    );

    builder
        .build()
        .map_err(|err| ConfigError::Other(err.to_string()))?
        .try_deserialize()
        .map_err(|err| ConfigError::Parse(err.to_string()))
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct RawConfig {
    #[serde(default)]
    pub(super) runtime: RawRuntime,
    #[serde(default)]
    pub(super) events: RawEvents,
    #[serde(default)]
    pub(super) app: RawApp,
}

#[serde_as]
#[derive(Debug, Deserialize)]
pub(super) struct RawRuntime {
    #[serde(default = "default_runtime_url")]
    pub(super) url: String,
    #[serde(default)]
    pub(super) api_version: Option<String>,
    #[serde(default = "default_connect_timeout")]
    #[serde_as(as = "HumantimeDuration")]
    pub(super) connect_timeout: Duration,
    #[serde(default = "default_reconnect_max_interval")]
    #[serde_as(as = "HumantimeDuration")]
    pub(super) reconnect_max_interval: Duration,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawEvents {
    #[serde(default = "default_filter")]
    pub(super) filter: Vec<String>,
    #[serde(default)]
    pub(super) machine_id: Option<String>,
    #[serde(default)]
    pub(super) verbose: bool,
}

#[serde_as]
#[derive(Debug, Deserialize)]
pub(super) struct RawApp {
    #[serde(default = "default_drain_interval")]
    #[serde_as(as = "HumantimeDuration")]
    pub(super) drain_interval: Duration,
    #[serde(default = "default_queue_bound")]
    pub(super) queue_bound: usize,
}

impl RawConfig {
    pub(super) fn apply_env_overrides(&mut self) -> std::result::Result<(), ConfigError> {
        if let Some(url) = env_string("RUNTIME_URL")? {
            self.runtime.url = url;
        }
        if let Some(version) = env_string("RUNTIME_API_VERSION")? {
            self.runtime.api_version = Some(version);
        }
        if let Some(timeout) = env_duration("CONNECT_TIMEOUT")? {
            self.runtime.connect_timeout = timeout;
        }
        if let Some(interval) = env_duration("RECONNECT_MAX_INTERVAL")? {
            self.runtime.reconnect_max_interval = interval;
        }
        if let Some(filter) = env_list("EVENT_FILTER")? {
            self.events.filter = filter;
        }
        if let Some(machine_id) = env_string("MACHINE_ID")? {
            self.events.machine_id = Some(machine_id);
        }
        if let Some(verbose) = env_bool("EVENTS_VERBOSE")? {
            self.events.verbose = verbose;
        }
        if let Some(interval) = env_duration("DRAIN_INTERVAL")? {
            self.app.drain_interval = interval;
        }
        if let Some(queue) = env_parse::<usize>("NOTIFY_QUEUE_BOUND")? {
            self.app.queue_bound = queue;
        }
        Ok(())
    }

    pub(super) fn validate_and_build(self) -> Result<Config> {
        let url = Url::parse(self.runtime.url.trim()).map_err(|err| {
            ConfigError::InvalidField {
                field: "runtime.url",
                message: err.to_string(),
            }
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidField {
                field: "runtime.url",
                message: format!("unsupported scheme `{}`", url.scheme()),
            }
            .into());
        }
        if self.runtime.connect_timeout.is_zero() {
            return Err(ConfigError::InvalidField {
                field: "runtime.connect_timeout",
                message: "timeout must be greater than zero".to_string(),
            }
            .into());
        }
        if self.runtime.reconnect_max_interval.is_zero() {
            return Err(ConfigError::InvalidField {
                field: "runtime.reconnect_max_interval",
                message: "interval must be greater than zero".to_string(),
            }
            .into());
        }
        if self.app.drain_interval.is_zero() {
            return Err(ConfigError::InvalidField {
                field: "app.drain_interval",
                message: "drain interval must be greater than zero".to_string(),
            }
            .into());
        }
        if self.app.queue_bound == 0 {
            return Err(ConfigError::InvalidField {
                field: "app.queue_bound",
                message: "queue bound must be greater than zero".to_string(),
            }
            .into());
        }

        let filter = if self.events.filter.is_empty() {
            None
        } else {
            Some(RuleFilter::parse(&self.events.filter)?)
        };

        Ok(Config {
            runtime: RuntimeSettings {
                url,
                api_version: non_empty(self.runtime.api_version),
                connect_timeout: self.runtime.connect_timeout,
                reconnect_max_interval: self.runtime.reconnect_max_interval,
            },
            events: EventSettings {
                filter,
                machine_id: non_empty(self.events.machine_id),
                verbose: self.events.verbose,
            },
            drain_interval: self.app.drain_interval,
            queue_capacity: self.app.queue_bound,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Default for RawRuntime {
    fn default() -> Self {
        Self {
            url: default_runtime_url(),
            api_version: None,
            connect_timeout: default_connect_timeout(),
            reconnect_max_interval: default_reconnect_max_interval(),
        }
    }
}

impl Default for RawEvents {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            machine_id: None,
            verbose: false,
        }
    }
}

impl Default for RawApp {
    fn default() -> Self {
        Self {
            drain_interval: default_drain_interval(),
            queue_bound: default_queue_bound(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RawConfig;
    use crate::error::{ConfigError, Error};
    use crate::filter::is_permitted;
    use std::time::Duration;

    fn from_toml(text: &str) -> RawConfig {
        let built = ::config::Config::builder()
            .add_source(::config::File::from_str(text, ::config::FileFormat::Toml))
            .build()
            .and_then(::config::Config::try_deserialize);
        match built {
            Ok(raw) => raw,
            Err(err) => panic!("test config should parse: {err}"),
        }
    }

    #[test]
    fn defaults_allow_everything() {
        let config = match RawConfig::default().validate_and_build() {
            Ok(config) => config,
            Err(err) => panic!("defaults should validate: {err}"),
        };
        assert_eq!(config.runtime.url.as_str(), "http://127.0.0.1:2375/");
        assert_eq!(config.drain_interval, Duration::from_secs(1));
        assert_eq!(config.queue_capacity, 256);
        let filter = config.events.filter.as_ref().map(|f| f as &dyn crate::filter::EventFilter);
        assert!(is_permitted(filter, "network", "connect"));
    }

    #[test]
    fn file_values_are_applied() {
        let raw = from_toml(
            r#"
            [runtime]
            url = "https://runtime.internal:2376"
            api_version = "v1.43"
            connect_timeout = "2s"

            [events]
            filter = ["container", "image:pull"]
            machine_id = " 00:11:22:33:44:55 "

            [app]
            drain_interval = "250ms"
            queue_bound = 8
            "#,
        );
        let config = match raw.validate_and_build() {
            Ok(config) => config,
            Err(err) => panic!("config should validate: {err}"),
        };
        assert_eq!(config.runtime.api_version.as_deref(), Some("v1.43"));
        assert_eq!(config.runtime.connect_timeout, Duration::from_secs(2));
        assert_eq!(
            config.events.machine_id.as_deref(),
            Some("00:11:22:33:44:55")
        );
        assert_eq!(config.drain_interval, Duration::from_millis(250));
        assert_eq!(config.queue_capacity, 8);

        let filter = config.events.filter.as_ref().map(|f| f as &dyn crate::filter::EventFilter);
        assert!(is_permitted(filter, "image", "pull"));
        assert!(!is_permitted(filter, "image", "push"));
    }

    #[test]
    fn empty_filter_list_means_no_filter() {
        let raw = from_toml("[events]\nfilter = []\n");
        let config = match raw.validate_and_build() {
            Ok(config) => config,
            Err(err) => panic!("config should validate: {err}"),
        };
        assert!(config.events.filter.is_none());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let raw = from_toml("[runtime]\nurl = \"ftp://example.com\"\n");
        assert!(matches!(
            raw.validate_and_build(),
            Err(Error::Config(ConfigError::InvalidField {
                field: "runtime.url",
                ..
            }))
        ));

        let raw = from_toml("[events]\nfilter = [\"image:\"]\n");
        assert!(matches!(
            raw.validate_and_build(),
            Err(Error::Config(ConfigError::InvalidField {
                field: "events.filter",
                ..
            }))
        ));

        let raw = from_toml("[app]\nqueue_bound = 0\n");
        assert!(raw.validate_and_build().is_err());
    }
}

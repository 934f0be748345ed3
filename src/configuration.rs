use std::num::NonZeroU32;
use std::time::Duration;

use serde_aux::field_attributes::deserialize_number_from_string;

use crate::domain::{CorrelationIdGenerator, GenerationError};
use crate::poller::PollSettings;

#[derive(serde::Deserialize, Clone, Debug)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub poller: PollerSettings,
    pub correlation_id: CorrelationIdSettings,
    pub work_queue: WorkQueueSettings,
    pub worker: WorkerSettings,
    pub result_store: ResultStoreSettings,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct PollerSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_tries: NonZeroU32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub sleep_interval_seconds: u64,
}

impl PollerSettings {
    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            max_tries: self.max_tries,
            sleep_interval: Duration::from_secs(self.sleep_interval_seconds),
        }
    }
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct CorrelationIdSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub id_length_bytes: usize,
}

impl CorrelationIdSettings {
    pub fn generator(&self) -> Result<CorrelationIdGenerator, GenerationError> {
        CorrelationIdGenerator::with_length_bytes(self.id_length_bytes)
    }
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct WorkQueueSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub capacity: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub enqueue_timeout_milliseconds: u64,
}

impl WorkQueueSettings {
    pub fn enqueue_timeout(&self) -> Duration {
        Duration::from_millis(self.enqueue_timeout_milliseconds)
    }
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct WorkerSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub concurrency: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_deliveries: u32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub redelivery_delay_milliseconds: u64,
}

impl WorkerSettings {
    pub fn redelivery_delay(&self) -> Duration {
        Duration::from_millis(self.redelivery_delay_milliseconds)
    }
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct ResultStoreSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub entry_ttl_seconds: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub reap_interval_seconds: u64,
}

impl ResultStoreSettings {
    pub fn entry_ttl(&self) -> Duration {
        Duration::from_secs(self.entry_ttl_seconds)
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_seconds)
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().map_err(|e| config::ConfigError::Foreign(e.into()))?;
    let configuration_directory = base_path.join("configuration");

    // Detect the running environment.
    // Default to `local` if unspecified.
    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;
    let environment_filename = format!("{}.yaml", environment.as_str());

    let settings = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")))
        .add_source(config::File::from(
            configuration_directory.join(environment_filename),
        ))
        // Add in settings from environment variables (with a prefix of APP and '__' as separator)
        // E.g. `APP_POLLER__MAX_TRIES=10` would set `Settings.poller.max_tries`
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}

/// The possible runtime environment for our application.
#[derive(Debug)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. \
                Use either `local` or `production`.",
                other
            )),
        }
    }
}

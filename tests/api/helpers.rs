use std::num::NonZeroU32;
use std::sync::Arc;

use once_cell::sync::Lazy;
use queued_health::configuration::{Settings, get_configuration};
use queued_health::health_check_worker::{HealthCheck, LivenessCheck};
use queued_health::startup::Application;
use queued_health::telemetry;
use queued_health::work_queue::WorkItem;

// Ensure that the `tracing` stack is only initialised once using `once_cell`
static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();
    // The sink is part of the type returned by `get_subscriber`, so both
    // branches have to install their subscriber separately.
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber =
            telemetry::get_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        telemetry::init_subscriber(subscriber).expect("Failed to set subscriber");
    } else {
        let subscriber =
            telemetry::get_subscriber(subscriber_name, default_filter_level, std::io::sink);
        telemetry::init_subscriber(subscriber).expect("Failed to set subscriber");
    }
});

pub struct TestApp {
    pub address: String,
    pub api_client: reqwest::Client,
}

impl TestApp {
    pub async fn request_health_check(&self, method: reqwest::Method) -> reqwest::Response {
        self.api_client
            .request(method, &self.address)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn get_health_check(&self) -> reqwest::Response {
        self.request_health_check(reqwest::Method::GET).await
    }
}

/// Health check logic that never completes successfully.
pub struct FailingCheck;

#[async_trait::async_trait]
impl HealthCheck for FailingCheck {
    async fn check(&self, _item: &WorkItem) -> Result<bool, anyhow::Error> {
        anyhow::bail!("The database is unreachable")
    }
}

/// Health check logic that completes but reports the service as unhealthy.
pub struct UnhealthyCheck;

#[async_trait::async_trait]
impl HealthCheck for UnhealthyCheck {
    async fn check(&self, _item: &WorkItem) -> Result<bool, anyhow::Error> {
        Ok(false)
    }
}

/// Fails the first delivery of every work item.
pub struct FlakyCheck;

#[async_trait::async_trait]
impl HealthCheck for FlakyCheck {
    async fn check(&self, item: &WorkItem) -> Result<bool, anyhow::Error> {
        if item.delivery_attempt == 1 {
            anyhow::bail!("Connection pool still warming up");
        }
        Ok(true)
    }
}

fn test_configuration() -> Settings {
    let mut c = get_configuration().expect("Failed to read config");
    // Assign random OS port
    c.application.port = 0;
    // The worker runs on the test runtime while requests are served by actix's
    // own threads, so leave it a moment to publish before the second read.
    c.poller.max_tries = NonZeroU32::new(3).unwrap();
    c.poller.sleep_interval_seconds = 1;
    c.worker.redelivery_delay_milliseconds = 0;
    c
}

/// Spin up an instance of the application and return its address (i.e. http://localhost:XXXXX)
pub async fn spawn_app() -> TestApp {
    spawn_app_with(Arc::new(LivenessCheck), test_configuration()).await
}

pub async fn spawn_app_with_check(health_check: Arc<dyn HealthCheck>) -> TestApp {
    spawn_app_with(health_check, test_configuration()).await
}

/// Same as [`spawn_app`], with enough polling budget to outlast a redelivery.
pub async fn spawn_patient_app_with_check(health_check: Arc<dyn HealthCheck>) -> TestApp {
    let mut configuration = test_configuration();
    configuration.poller.max_tries = NonZeroU32::new(10).unwrap();
    spawn_app_with(health_check, configuration).await
}

async fn spawn_app_with(health_check: Arc<dyn HealthCheck>, configuration: Settings) -> TestApp {
    // The first time `initialise` is invoked the code in `TRACING` is executed.
    // All other invocations will instead skip execution.
    Lazy::force(&TRACING);

    let app = Application::build_with_health_check(configuration, health_check)
        .await
        .expect("Failed to build app");
    let address = format!("http://127.0.0.1:{}/", app.port());

    // Tokio spins up a new runtime for each test, shutting down and cleaning up
    // after the test ran. Therefore, no cleanup needed.
    let _ = tokio::spawn(app.run_until_stopped());

    TestApp {
        address,
        api_client: reqwest::Client::new(),
    }
}

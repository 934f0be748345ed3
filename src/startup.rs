use crate::configuration::Settings;
use crate::domain::CorrelationIdGenerator;
use crate::health_check_worker::{HealthCheck, LivenessCheck, run_worker_until_stopped};
use crate::poller::PollSettings;
use crate::result_store::{InMemoryResultStore, ResultStore, run_reaper_until_stopped};
use crate::work_queue::{WorkQueue, in_process_queue};
use actix_web::{App, HttpServer, dev::Server, web};
use std::io::Error;
use std::net::SocketAddr;
use std::net::TcpListener;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing_actix_web::TracingLogger;

pub struct Application {
    port: u16,
    server: Server,
    background_tasks: Vec<JoinHandle<Result<(), anyhow::Error>>>,
}

impl Application {
    pub async fn build(configuration: Settings) -> Result<Self, anyhow::Error> {
        Self::build_with_health_check(configuration, Arc::new(LivenessCheck)).await
    }

    /// Must be called from within a `tokio` runtime: the worker and the
    /// store reaper are spawned onto it.
    pub async fn build_with_health_check(
        configuration: Settings,
        health_check: Arc<dyn HealthCheck>,
    ) -> Result<Self, anyhow::Error> {
        let generator = configuration.correlation_id.generator()?;
        let poll_settings = configuration.poller.poll_settings();

        let store = Arc::new(InMemoryResultStore::new(
            configuration.result_store.entry_ttl(),
        ));
        let (queue, receiver) = in_process_queue(
            configuration.work_queue.capacity,
            configuration.work_queue.enqueue_timeout(),
        );
        let redelivery = Arc::new(queue.downgrade());
        let queue: Arc<dyn WorkQueue> = Arc::new(queue);

        let worker = tokio::spawn(run_worker_until_stopped(
            receiver,
            redelivery,
            store.clone(),
            health_check,
            configuration.worker.clone(),
        ));
        let reaper = tokio::spawn(run_reaper_until_stopped(
            Arc::clone(&store),
            configuration.result_store.reap_interval(),
        ));

        let address = format!(
            "{}:{}",
            configuration.application.host, configuration.application.port
        );
        let bound_addr = TcpListener::bind(address)?.local_addr()?;
        let server = run(&bound_addr, generator, queue, store, poll_settings)?;

        Ok(Self {
            server,
            port: bound_addr.port(),
            background_tasks: vec![worker, reaper],
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    // A more expressive name that makes it clear that
    // this function only returns when the application is stopped.
    pub async fn run_until_stopped(self) -> Result<(), Error> {
        let outcome = self.server.await;
        for task in self.background_tasks {
            task.abort();
        }
        outcome
    }
}

fn run(
    address: &SocketAddr,
    generator: CorrelationIdGenerator,
    queue: Arc<dyn WorkQueue>,
    store: Arc<dyn ResultStore>,
    poll_settings: PollSettings,
) -> Result<Server, anyhow::Error> {
    // Constructed once and shared by reference with every worker thread.
    let generator = web::Data::new(generator);
    let queue = web::Data::from(queue);
    let store = web::Data::from(store);
    let poll_settings = web::Data::new(poll_settings);
    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .route("/", web::route().to(crate::routes::health_check))
            .app_data(web::Data::clone(&generator))
            .app_data(web::Data::clone(&queue))
            .app_data(web::Data::clone(&store))
            .app_data(web::Data::clone(&poll_settings))
    })
    .bind(address)?
    .run();

    Ok(server)
}

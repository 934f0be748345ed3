pub mod configuration;
pub mod domain;
pub mod health_check_worker;
pub mod poller;
pub mod result_store;
pub mod routes;
pub mod startup;
pub mod telemetry;
pub mod utility;
pub mod work_queue;

use queued_health::configuration;
use queued_health::startup::Application;
use queued_health::telemetry;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let subscriber =
        telemetry::get_subscriber("queued_health".into(), "info".into(), std::io::stdout);
    telemetry::init_subscriber(subscriber)?;
    let configuration = configuration::get_configuration()?;
    let application = Application::build(configuration).await?;
    application.run_until_stopped().await?;
    Ok(())
}

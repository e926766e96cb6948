use portal_core::observability::logging::init_tracing;
use portal_service::{config::Config, Application};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("info,portal_service=debug");

    let config = Config::from_env().expect("Failed to load configuration");
    let application = Application::build(config).await?;
    application.run_until_stopped().await?;

    Ok(())
}

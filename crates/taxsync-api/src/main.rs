use taxsync_api::setup;
use taxsync_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize the application (database, services, routes)
    let (state, router) = setup::initialize_app(config.clone()).await?;

    // Start the server and the status poll scheduler
    setup::server::start_server(&config, router, &state).await?;

    Ok(())
}

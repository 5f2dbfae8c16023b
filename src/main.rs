/// Cattle Alert service binary
use cattle_alert::{jobs, server, AlertResult, AppContext, ServerConfig};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> AlertResult<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cattle_alert=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    print_banner();

    let config = ServerConfig::from_env()?;

    let ctx = Arc::new(AppContext::new(config).await?);

    // Start background jobs
    let scheduler = Arc::new(jobs::JobScheduler::new(Arc::clone(&ctx)));
    scheduler.start();

    server::serve((*ctx).clone()).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
   ___       _   _   _           _   _           _
  / __|__ _ | |_| |_| |___      /_\ | |___ _ _ _| |_
 | (__/ _` ||  _|  _| / -_)    / _ \| / -_) '_|  _|
  \___\__,_| \__|\__|_\___|   /_/ \_\_\___|_|  \__|

        Road cattle hazard alerts v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}

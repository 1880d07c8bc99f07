use std::net::SocketAddr;

use anyhow::Context;
use fork_gateway::{
    framework::{env::Env, AppState},
    mk_router,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env は無くてもよい
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let env = Env::from_env().context("invalid configuration")?;
    if env.uses_default_secret() {
        warn!("SECRET_KEY is not set; using the insecure placeholder");
    }
    match env.origin.get() {
        Ok(origin) => info!(%origin, "forking from configured origin"),
        Err(e) => warn!(error = %e, "origin is not usable; /fork will report it"),
    }

    let bind_addr = env.bind_addr;
    let router = mk_router(AppState::new(env)?);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

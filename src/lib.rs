pub mod framework;
pub mod github;
pub mod github_oauth;
pub mod origin;
pub mod pages;
pub mod settings;
pub mod views;

use std::time::Duration;

use axum::{middleware, Router};
use framework::AppState;
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer};

pub fn mk_router(state: AppState) -> Router {
    Router::new()
        .merge(pages::mk_router(state.clone()))
        .merge(github_oauth::mk_router())
        .layer(middleware::from_fn(framework::log))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            framework::setup,
        ))
        .layer(TimeoutLayer::new(Duration::from_secs(
            settings::TIMEOUT_DURATION,
        )))
        .layer(CatchPanicLayer::custom(framework::system::handle_panic))
        .with_state(state)
}

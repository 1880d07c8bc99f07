use crate::framework::{session, AppState};
use axum::{middleware, routing, Router};

pub mod assets;
pub mod fork;
pub mod index;
pub mod logout;

pub fn mk_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route(index::PATH, routing::get(index::handler))
        .route(
            fork::PATH,
            routing::get(fork::handler)
                .route_layer(middleware::from_fn_with_state(state, session::require_login)),
        )
        .route(logout::PATH, routing::get(logout::handler))
        .route(assets::STYLESHEET_PATH, routing::get(assets::stylesheet))
}

use crate::{
    framework::{logger::LoggerInterface, session::Session, AppState, ReqScopedState},
    views::IndexPage,
};
use axum::{extract, response::Html};

/// パス
pub const PATH: &str = "/";

pub async fn handler(
    extract::State(state): extract::State<AppState>,
    ctx: ReqScopedState,
    mut session: Session,
) -> (Session, Html<String>) {
    let flashes = session.take_flashes();
    let user = session.user();
    ctx.logger()
        .debug(&format!("rendering index with {} flash(es)", flashes.len()));

    let page = IndexPage {
        user: &user,
        origin: state.env.origin.parsed(),
        flashes: &flashes,
    };

    (session, Html(page.render()))
}

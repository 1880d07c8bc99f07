use super::index;
use crate::{
    framework::{
        logger::LoggerInterface,
        session::{Flash, FlashCategory, Session},
        system::AppError,
        AppState, ReqScopedState,
    },
    github::Fork,
};
use axum::{extract, response::Redirect};

/// パス
pub const PATH: &str = "/fork";

pub async fn handler(
    extract::State(state): extract::State<AppState>,
    ctx: ReqScopedState,
    mut session: Session,
) -> (Session, Redirect) {
    match fork(&state, &session).await {
        Ok((origin, fork)) => {
            ctx.logger().info(&format!("forked {origin} to {}", fork.html_url));
            session.push_flash(Flash::with_link(
                FlashCategory::Info,
                format!("Forked {origin} to"),
                fork.html_url,
            ));
        }
        Err(err) => {
            ctx.logger().warning(&format!("fork failed: {err}"));
            session.flash_error(&err);
        }
    }

    (session, Redirect::to(index::PATH))
}

async fn fork(state: &AppState, session: &Session) -> Result<(String, Fork), AppError> {
    let origin = state.env.origin.get()?;
    let token = session.token().ok_or(AppError::AuthRequired)?;
    let fork = state
        .github
        .create_fork(token, origin)
        .await
        .map_err(AppError::upstream("Fork"))?;

    Ok((origin.to_string(), fork))
}

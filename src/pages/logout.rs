use super::index;
use crate::framework::{
    env::LogoutMode,
    logger::LoggerInterface,
    session::{FlashCategory, Session},
    system::AppError,
    AppState, ReqScopedState,
};
use axum::{extract, response::Redirect};

/// パス
pub const PATH: &str = "/logout";

/// 取り消しの成否に関わらずセッションは必ず消す
pub async fn handler(
    extract::State(state): extract::State<AppState>,
    ctx: ReqScopedState,
    mut session: Session,
) -> (Session, Redirect) {
    let token = session.clear();

    match (state.env.logout_mode, token) {
        (LogoutMode::RevokeGrant, Some(token)) => match revoke(&state, &token).await {
            Ok(()) => {
                ctx.logger().info("signed out and revoked the OAuth grant");
                session.flash(
                    FlashCategory::Info,
                    "You have been signed out and this application's access has been revoked.",
                );
            }
            Err(err) => {
                ctx.logger().warning(&format!("grant revocation failed: {err}"));
                session.flash(FlashCategory::Info, "You have been signed out.");
                session.flash_error(&err);
            }
        },
        _ => {
            ctx.logger().info("signed out");
            session.flash(FlashCategory::Info, "You have been signed out.");
        }
    }

    (session, Redirect::to(index::PATH))
}

async fn revoke(state: &AppState, token: &str) -> Result<(), AppError> {
    state
        .github
        .revoke_grant(token)
        .await
        .map_err(|source| AppError::RevocationFailed {
            settings_url: state.env.application_settings_url(),
            source,
        })
}

use crate::{
    framework::{
        logger::LoggerInterface,
        session::{FlashCategory, Session},
        system::AppError,
        AppState, ReqScopedState,
    },
    pages::index,
};
use anyhow::Context;
use axum::{extract, response::Redirect, routing, Router};
use serde::Deserialize;
use ulid::Ulid;

/// パス
pub const LOGIN_PATH: &str = "/login";
pub const CALLBACK_PATH: &str = "/authorized";

pub fn mk_router() -> Router<AppState> {
    Router::new()
        .route(LOGIN_PATH, routing::get(handler))
        .route(CALLBACK_PATH, routing::get(callback_handler))
}

/// GitHub の認可ページへ飛ばす
pub async fn handler(
    extract::State(state): extract::State<AppState>,
    ctx: ReqScopedState,
    mut session: Session,
) -> Result<(Session, Redirect), AppError> {
    let csrf_token = Ulid::new().to_string();
    let url = state
        .github
        .authorize_url(
            &csrf_token,
            state.env.oauth_redirect_uri.as_deref(),
            &state.env.oauth_scope,
        )
        .context("failed to build the GitHub authorize URL")?;

    ctx.logger().debug("redirecting to GitHub for authorization");
    session.set_oauth_state(csrf_token);
    Ok((session, Redirect::to(url.as_str())))
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

pub async fn callback_handler(
    extract::State(state): extract::State<AppState>,
    ctx: ReqScopedState,
    mut session: Session,
    extract::Query(params): extract::Query<CallbackParams>,
) -> (Session, Redirect) {
    match authorize(&state, &mut session, params).await {
        Ok(login) => {
            ctx.logger().info(&format!("signed in as {login}"));
            session.flash(FlashCategory::Info, format!("Signed in as {login}."));
        }
        Err(err) => {
            ctx.logger().warning(&format!("sign-in failed: {err}"));
            session.flash_error(&err);
        }
    }

    (session, Redirect::to(index::PATH))
}

async fn authorize(
    state: &AppState,
    session: &mut Session,
    params: CallbackParams,
) -> Result<String, AppError> {
    let expected_state = session.take_oauth_state();

    if let Some(error) = params.error {
        return Err(AppError::OAuthRejected(
            params.error_description.unwrap_or(error),
        ));
    }
    let (Some(code), Some(returned_state)) = (params.code, params.state) else {
        return Err(AppError::OAuthRejected(
            "the callback is missing its code or state".to_string(),
        ));
    };
    if expected_state.as_deref() != Some(returned_state.as_str()) {
        return Err(AppError::OAuthRejected(
            "the sign-in request has expired or was not started here".to_string(),
        ));
    }

    let token = state
        .github
        .exchange_code(&code, state.env.oauth_redirect_uri.as_deref())
        .await
        .map_err(AppError::upstream("Sign-in"))?;
    let user = state
        .github
        .current_user(&token)
        .await
        .map_err(AppError::upstream("Fetching your GitHub profile"))?;

    session.sign_in(token, user.login.clone());
    Ok(user.login)
}

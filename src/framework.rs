pub mod env;
pub mod logger;
pub mod session;
pub mod system;
use self::{env::Env, logger::LoggerInterface, session::Session, system::User};
use crate::{github::GithubClient, settings};
use anyhow::Context;
use axum::{
    async_trait,
    extract::{self, ConnectInfo, FromRef},
    http::{request::Parts, StatusCode},
    middleware,
    response::Response,
};
use axum_extra::extract::cookie::Key;
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use std::{net::SocketAddr, sync::Arc};
use ulid::Ulid;

/// アプリケーション全体での共有する状態. 起動後は変更しない.
#[derive(Clone)]
pub struct AppState {
    pub env: Arc<Env>,
    pub github: Arc<GithubClient>,
    pub cookie_key: Key,
}

impl AppState {
    pub fn new(env: Env) -> anyhow::Result<Self> {
        let cookie_key = Key::try_from(env.secret_key.as_bytes())
            .map_err(|_| system::ConfigError::WeakSecretKey(settings::MIN_SECRET_KEY_LEN))?;

        let github = GithubClient::builder()
            .api_url(env.github_api_url.clone())
            .oauth_url(env.github_oauth_url.clone())
            .client_id(env.github_client_id.clone())
            .client_secret(env.github_client_secret.clone())
            .timeout(env.github_timeout)
            .build()
            .context("failed to build GitHub client")?;

        Ok(Self {
            env: Arc::new(env),
            github: Arc::new(github),
            cookie_key,
        })
    }
}

// SignedCookieJar 用
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// リクエストごとに分離された状態.
#[derive(Clone, Debug)]
pub struct ReqScopedState {
    pub ts: DateTime<Utc>,
    pub req_id: Ulid,
    pub user: User,
    pub log_member: Map<String, Value>,
}

impl ReqScopedState {
    pub fn new(
        req_id: Ulid,
        user: &User,
        req: &extract::Request,
        remote_addr: Option<&SocketAddr>,
    ) -> Self {
        let method = req.method();
        let uri = req.uri();

        let ts = i64::try_from(req_id.timestamp_ms())
            .ok()
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or_else(Utc::now);
        let mut pairs = vec![
            ("req_id", req_id.to_string()),
            ("timestamp", ts.to_rfc3339()),
            ("uri", uri.to_string()),
            ("method", method.to_string()),
        ];

        if let Some(addr) = remote_addr {
            pairs.push(("remote_addr", addr.to_string()));
        }
        if let Some(login) = user.login() {
            pairs.push(("user", login.to_string()));
        }

        // cookie はセッションを含むので出さない
        let header_keys = vec!["user-agent"];

        for key in header_keys {
            if let Some(v) = req.headers().get(key) {
                pairs.push((key, v.to_str().unwrap_or("parse error").to_string()));
            }
        }

        Self {
            req_id,
            user: user.clone(),
            ts,
            log_member: Map::from_iter(pairs.iter().map(|(k, v)| (k.to_string(), json!(v)))),
        }
    }

    pub fn logger(&self) -> logger::Logger {
        logger::Logger(self)
    }
}

#[async_trait]
impl<S> extract::FromRequestParts<S> for ReqScopedState
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ReqScopedState>()
            .cloned()
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// リクエストごとの状態を用意する
pub async fn setup(
    extract::State(state): extract::State<AppState>,
    mut req: extract::Request,
    next: middleware::Next,
) -> Response {
    let req_id = Ulid::new();
    let user = Session::from_headers(req.headers(), &state).user();
    let remote_addr = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let req_scoped_state = ReqScopedState::new(req_id, &user, &req, remote_addr.as_ref());
    req.extensions_mut().insert(req_scoped_state);

    next.run(req).await
}

pub async fn log(req: extract::Request, next: middleware::Next) -> Response {
    let Some(ctx) = req.extensions().get::<ReqScopedState>().cloned() else {
        return next.run(req).await;
    };

    ctx.logger().debug("request started");
    let res = next.run(req).await;
    let elapsed = Utc::now().signed_duration_since(ctx.ts).num_milliseconds();
    let message = format!("{} in {}ms", res.status(), elapsed);
    if res.status().is_server_error() {
        ctx.logger().danger(&message);
    } else {
        ctx.logger().info(&message);
    }
    res
}

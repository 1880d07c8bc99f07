use std::{convert::Infallible, fmt};

use axum::{
    async_trait, extract,
    http::{request::Parts, HeaderMap},
    middleware,
    response::{IntoResponse, IntoResponseParts, Redirect, Response, ResponseParts},
};
use axum_extra::extract::cookie::{Cookie, SameSite, SignedCookieJar};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use time::Duration;

use super::{
    logger::LoggerInterface,
    system::{AppError, AuthenticatedUser, User},
    AppState, ReqScopedState,
};
use crate::{pages::index, settings};

/// flash の種類
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashCategory {
    Info,
    Warning,
    Error,
    Details,
}

impl FlashCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlashCategory::Info => "info",
            FlashCategory::Warning => "warning",
            FlashCategory::Error => "error",
            FlashCategory::Details => "details",
        }
    }
}

/// 次に描画されるページで一度だけ表示されるメッセージ
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub text: String,
    pub category: FlashCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl Flash {
    pub fn new(category: FlashCategory, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            category,
            link: None,
        }
    }

    pub fn with_link(category: FlashCategory, text: impl Into<String>, link: String) -> Self {
        Self {
            link: Some(link),
            ..Self::new(category, text)
        }
    }

    /// クッキーに収まるよう切り詰める
    pub fn details(text: impl Into<String>) -> Self {
        let mut text = text.into();
        if text.len() > settings::MAX_FLASH_DETAIL_LEN {
            let mut end = settings::MAX_FLASH_DETAIL_LEN;
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            text.truncate(end);
            text.push('…');
        }
        Self::new(FlashCategory::Details, text)
    }
}

/// クッキーに保存される中身
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct SessionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    login: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    oauth_state: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    flashes: Vec<Flash>,
}

impl SessionData {
    fn decode(value: &str) -> Option<Self> {
        let bytes = URL_SAFE_NO_PAD.decode(value).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_vec(self).map(|bytes| URL_SAFE_NO_PAD.encode(bytes))
    }

    /// 上限に収まるまで details を後ろから削る. 削り切れなければ flash ごと捨てる
    fn encode_bounded(&mut self) -> Result<String, serde_json::Error> {
        loop {
            let value = self.encode()?;
            let excess = value.len().saturating_sub(settings::MAX_SESSION_COOKIE_LEN);
            if excess == 0 {
                return Ok(value);
            }
            let Some(i) = self
                .flashes
                .iter()
                .rposition(|f| f.category == FlashCategory::Details)
            else {
                tracing::warn!(len = value.len(), "session cookie exceeds the size limit");
                return Ok(value);
            };

            // base64 で 4/3 倍になる
            let cut = excess * 3 / 4 + 1 + '…'.len_utf8();
            let text = &mut self.flashes[i].text;
            if text.len() <= cut {
                self.flashes.remove(i);
            } else {
                let mut end = text.len() - cut;
                while !text.is_char_boundary(end) {
                    end -= 1;
                }
                text.truncate(end);
                text.push('…');
            }
        }
    }
}

/// セッション. 署名付きクッキーに保存され, レスポンスに含めると書き戻される
#[derive(Clone)]
pub struct Session {
    jar: SignedCookieJar,
    data: SessionData,
    secure: bool,
}

impl Session {
    pub fn from_headers(headers: &HeaderMap, state: &AppState) -> Self {
        let jar = SignedCookieJar::from_headers(headers, state.cookie_key.clone());
        let data = jar
            .get(settings::SESSION_ID_KEY)
            .and_then(|c| SessionData::decode(c.value()))
            .unwrap_or_default();

        Self {
            jar,
            data,
            secure: state.env.cookie_secure,
        }
    }

    /// トークンを持っているか
    pub fn authorized(&self) -> bool {
        self.data.token.is_some()
    }

    pub fn token(&self) -> Option<&str> {
        self.data.token.as_deref()
    }

    /// サインイン時に取得した GitHub のログイン名
    pub fn identity(&self) -> Option<&str> {
        self.data.token.as_ref().and(self.data.login.as_deref())
    }

    pub fn user(&self) -> User {
        match self.identity() {
            Some(login) => User::Authenticated(AuthenticatedUser {
                login: login.to_string(),
            }),
            None => User::Anonymous,
        }
    }

    pub fn sign_in(&mut self, token: String, login: String) {
        self.data.token = Some(token);
        self.data.login = Some(login);
    }

    pub fn set_oauth_state(&mut self, state: String) {
        self.data.oauth_state = Some(state);
    }

    pub fn take_oauth_state(&mut self) -> Option<String> {
        self.data.oauth_state.take()
    }

    /// 全て消して, 持っていたトークンを返す
    pub fn clear(&mut self) -> Option<String> {
        std::mem::take(&mut self.data).token
    }

    pub fn flash(&mut self, category: FlashCategory, text: impl Into<String>) {
        self.data.flashes.push(Flash::new(category, text));
    }

    pub fn push_flash(&mut self, flash: Flash) {
        self.data.flashes.push(flash);
    }

    pub fn flash_error(&mut self, err: &AppError) {
        self.data.flashes.extend(err.flashes());
    }

    pub fn take_flashes(&mut self) -> Vec<Flash> {
        std::mem::take(&mut self.data.flashes)
    }

    fn into_jar(mut self) -> SignedCookieJar {
        if self.data == SessionData::default() {
            return self.jar.remove(removal_cookie());
        }
        match self.data.encode_bounded() {
            Ok(value) => self.jar.add(mk_cookie(value, self.secure)),
            Err(e) => {
                tracing::error!(error = %e, "failed to encode session");
                self.jar.remove(removal_cookie())
            }
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("authorized", &self.authorized())
            .field("login", &self.data.login)
            .field("flashes", &self.data.flashes)
            .finish_non_exhaustive()
    }
}

// ハンドラの引数で指定できるようにするための処理
#[async_trait]
impl extract::FromRequestParts<AppState> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Session::from_headers(&parts.headers, state))
    }
}

// ハンドラの戻り値に含めるとクッキーを更新する
impl IntoResponseParts for Session {
    type Error = Infallible;

    fn into_response_parts(self, res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        self.into_jar().into_response_parts(res)
    }
}

/// 未認証なら処理を行わずトップに戻す
pub async fn require_login(
    ctx: ReqScopedState,
    mut session: Session,
    req: extract::Request,
    next: middleware::Next,
) -> Response {
    if session.authorized() {
        return next.run(req).await;
    }

    ctx.logger().warning("unauthenticated request to a protected route");
    session.flash_error(&AppError::AuthRequired);
    (session, Redirect::to(index::PATH)).into_response()
}

pub fn mk_cookie(value: String, secure: bool) -> Cookie<'static> {
    let mut c = Cookie::new(settings::SESSION_ID_KEY, value);
    c.set_max_age(Duration::hours(settings::SESSION_EXPIRATION_HOURS));
    c.set_secure(secure);
    c.set_http_only(true);
    c.set_path("/");
    c.set_same_site(SameSite::Lax);

    c
}

fn removal_cookie() -> Cookie<'static> {
    let mut c = Cookie::from(settings::SESSION_ID_KEY);
    c.set_path("/");
    c
}

use std::any::Any;

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use super::session::{Flash, FlashCategory};
use crate::{github::GithubError, views::ErrorPage};

/// 設定の不備. 起動時に検出されたものは致命的
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable {0} must be set")]
    MissingVar(&'static str),

    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("origin {0:?} must end with .git")]
    MissingGitSuffix(String),

    #[error("origin {0:?} must use git@host:owner/repo.git or https://host/owner/repo.git")]
    UnsupportedScheme(String),

    #[error("origin {origin:?} is malformed: {reason}")]
    MalformedOrigin { origin: String, reason: String },

    #[error("{0:?} is not a valid GitHub username")]
    InvalidOwner(String),

    #[error("SECRET_KEY must be at least {0} bytes long")]
    WeakSecretKey(usize),
}

/// リクエスト処理中のエラー
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("the gateway is misconfigured: {0}")]
    Config(#[from] ConfigError),

    #[error("Please sign in with GitHub first.")]
    AuthRequired,

    #[error("GitHub sign-in was not completed: {0}")]
    OAuthRejected(String),

    #[error("{action} failed: {source}")]
    Upstream {
        action: &'static str,
        #[source]
        source: GithubError,
    },

    #[error("Could not revoke this application's access to your GitHub account ({source}). Please revoke it manually:")]
    RevocationFailed {
        settings_url: String,
        #[source]
        source: GithubError,
    },

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl AppError {
    pub fn upstream(action: &'static str) -> impl FnOnce(GithubError) -> Self {
        move |source| Self::Upstream { action, source }
    }

    /// ユーザーに見せる flash の列
    pub fn flashes(&self) -> Vec<Flash> {
        let mut flashes = match self {
            Self::AuthRequired => vec![Flash::new(FlashCategory::Warning, self.to_string())],
            Self::RevocationFailed { settings_url, .. } => vec![Flash::with_link(
                FlashCategory::Error,
                self.to_string(),
                settings_url.clone(),
            )],
            _ => vec![Flash::new(FlashCategory::Error, self.to_string())],
        };

        let details = match self {
            Self::Upstream { source, .. } | Self::RevocationFailed { source, .. } => {
                source.details()
            }
            _ => None,
        };
        if let Some(details) = details {
            flashes.push(Flash::details(details));
        }

        flashes
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "request failed");
        let detail = format!("{self:#}");
        let page = ErrorPage { detail: &detail };
        (StatusCode::INTERNAL_SERVER_ERROR, Html(page.render())).into_response()
    }
}

/// ハンドラ内の panic を 500 のエラーページに変換する
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    AppError::Unexpected(anyhow::anyhow!(detail)).into_response()
}

/// ユーザー
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum User {
    /// 認証済みユーザー
    Authenticated(AuthenticatedUser),
    /// 認証されていないユーザー
    Anonymous,
}

impl User {
    pub fn login(&self) -> Option<&str> {
        match self {
            User::Authenticated(user) => Some(&user.login),
            User::Anonymous => None,
        }
    }
}

/// 認証済みユーザー
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub login: String,
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::*;

    #[test]
    fn test_auth_required_is_a_warning() {
        let flashes = AppError::AuthRequired.flashes();

        assert_eq!(flashes.len(), 1);
        assert_eq!(flashes[0].category, FlashCategory::Warning);
    }

    #[test]
    fn test_upstream_failure_carries_details() {
        let err = AppError::upstream("Fork")(GithubError::Status {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            body: r#"{"message":"already forked"}"#.to_string(),
        });

        let flashes = err.flashes();

        assert_eq!(flashes.len(), 2);
        assert_eq!(flashes[0].category, FlashCategory::Error);
        assert!(flashes[0].text.starts_with("Fork failed"));
        assert!(flashes[0].text.contains("422"));
        assert_eq!(flashes[1].category, FlashCategory::Details);
        assert!(flashes[1].text.contains("\"message\": \"already forked\""));
    }

    #[test]
    fn test_revocation_failure_links_settings() {
        let err = AppError::RevocationFailed {
            settings_url: "https://github.com/settings/connections/applications/abc".to_string(),
            source: GithubError::Status {
                status: StatusCode::NOT_FOUND,
                body: r#"{"message":"Not Found"}"#.to_string(),
            },
        };

        let flashes = err.flashes();

        assert_eq!(
            flashes[0].link.as_deref(),
            Some("https://github.com/settings/connections/applications/abc")
        );
        assert_eq!(flashes[1].category, FlashCategory::Details);
    }

    #[test]
    fn test_config_error_flash() {
        let err = AppError::from(ConfigError::MissingVar("GITHUB_ORIGIN"));
        let flashes = err.flashes();

        assert_eq!(flashes.len(), 1);
        assert!(flashes[0].text.contains("GITHUB_ORIGIN"));
    }

    #[test]
    fn test_unexpected_error_renders_500() {
        let response = AppError::Unexpected(anyhow::anyhow!("boom")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_panic_renders_500() {
        let response = handle_panic(Box::new("kaboom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

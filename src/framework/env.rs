use std::{fmt, net::SocketAddr, time::Duration};

use url::Url;

use super::system::ConfigError;
use crate::{origin::Origin, settings};

/// ログアウト時の振る舞い
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogoutMode {
    /// セッションを消すだけ
    ClearSession,
    /// GitHub 側の OAuth grant も取り消す
    RevokeGrant,
}

/// GITHUB_ORIGIN が無い・不正なときの扱い
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OriginPolicy {
    /// 起動時に失敗する
    Strict,
    /// 起動はして, /fork でエラーを表示する
    Lenient,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OriginSetting {
    Parsed(Origin),
    Deferred(ConfigError),
}

impl OriginSetting {
    pub fn get(&self) -> Result<&Origin, ConfigError> {
        match self {
            OriginSetting::Parsed(origin) => Ok(origin),
            OriginSetting::Deferred(err) => Err(err.clone()),
        }
    }

    pub fn parsed(&self) -> Option<&Origin> {
        self.get().ok()
    }
}

#[derive(Clone)]
pub struct Env {
    pub origin: OriginSetting,
    pub origin_policy: OriginPolicy,
    pub github_client_id: String,
    pub github_client_secret: String,
    pub secret_key: String,
    pub oauth_redirect_uri: Option<String>,
    pub oauth_scope: String,
    pub github_api_url: Url,
    pub github_oauth_url: Url,
    pub github_timeout: Duration,
    pub logout_mode: LogoutMode,
    pub bind_addr: SocketAddr,
    pub cookie_secure: bool,
}

impl Env {
    /// プロセスの環境変数から読み込む
    pub fn from_env() -> Result<Env, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Env, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| var(key).ok_or(ConfigError::MissingVar(key));

        let origin_policy = match var("ORIGIN_POLICY").as_deref().map(str::trim) {
            None | Some("strict") => OriginPolicy::Strict,
            Some("lenient") => OriginPolicy::Lenient,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    var: "ORIGIN_POLICY",
                    value: other.to_string(),
                    reason: "expected strict or lenient".to_string(),
                })
            }
        };
        let parsed = required("GITHUB_ORIGIN").and_then(|raw| raw.parse::<Origin>());
        let origin = match (parsed, origin_policy) {
            (Ok(origin), _) => OriginSetting::Parsed(origin),
            (Err(err), OriginPolicy::Lenient) => OriginSetting::Deferred(err),
            (Err(err), OriginPolicy::Strict) => return Err(err),
        };

        let secret_key = var("SECRET_KEY").unwrap_or_else(|| settings::DEFAULT_SECRET_KEY.into());
        if secret_key.len() < settings::MIN_SECRET_KEY_LEN {
            return Err(ConfigError::WeakSecretKey(settings::MIN_SECRET_KEY_LEN));
        }

        let logout_mode = if parse_bool(&var, "LOGOUT_REVOKES_GRANT", false)? {
            LogoutMode::RevokeGrant
        } else {
            LogoutMode::ClearSession
        };

        let github_timeout = match var("GITHUB_TIMEOUT_SECS") {
            None => Duration::from_secs(settings::DEFAULT_GITHUB_TIMEOUT_SECS),
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: "GITHUB_TIMEOUT_SECS",
                        value: raw,
                        reason: "expected a positive number of seconds".to_string(),
                    })
                }
            },
        };

        let bind_addr_raw = var("BIND_ADDR").unwrap_or_else(|| settings::DEFAULT_BIND_ADDR.into());
        let bind_addr = bind_addr_raw
            .trim()
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::InvalidValue {
                var: "BIND_ADDR",
                value: bind_addr_raw.clone(),
                reason: e.to_string(),
            })?;

        Ok(Env {
            origin,
            origin_policy,
            github_client_id: required("GITHUB_OAUTH_CLIENT_ID")?,
            github_client_secret: required("GITHUB_OAUTH_CLIENT_SECRET")?,
            secret_key,
            oauth_redirect_uri: var("OAUTH_REDIRECT_URI"),
            oauth_scope: var("GITHUB_OAUTH_SCOPE")
                .unwrap_or_else(|| settings::DEFAULT_OAUTH_SCOPE.into()),
            github_api_url: parse_base_url(&var, "GITHUB_API_URL", settings::DEFAULT_GITHUB_API_URL)?,
            github_oauth_url: parse_base_url(
                &var,
                "GITHUB_OAUTH_URL",
                settings::DEFAULT_GITHUB_OAUTH_URL,
            )?,
            github_timeout,
            logout_mode,
            bind_addr,
            cookie_secure: parse_bool(&var, "COOKIE_SECURE", true)?,
        })
    }

    pub fn uses_default_secret(&self) -> bool {
        self.secret_key == settings::DEFAULT_SECRET_KEY
    }

    /// 手動でアクセスを取り消すための GitHub の設定ページ
    pub fn application_settings_url(&self) -> String {
        format!(
            "{}/{}",
            settings::GITHUB_APPLICATION_SETTINGS_URL,
            self.github_client_id
        )
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Env")
            .field("origin", &self.origin)
            .field("origin_policy", &self.origin_policy)
            .field("github_client_id", &self.github_client_id)
            .field("oauth_redirect_uri", &self.oauth_redirect_uri)
            .field("oauth_scope", &self.oauth_scope)
            .field("github_api_url", &self.github_api_url.as_str())
            .field("github_oauth_url", &self.github_oauth_url.as_str())
            .field("github_timeout", &self.github_timeout)
            .field("logout_mode", &self.logout_mode)
            .field("bind_addr", &self.bind_addr)
            .field("cookie_secure", &self.cookie_secure)
            .finish_non_exhaustive()
    }
}

fn parse_bool<F>(var: &F, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = var(key) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var: key,
            value: raw,
            reason: "expected true or false".to_string(),
        }),
    }
}

/// join で末尾のパスが消えないよう '/' で終わらせる
fn parse_base_url<F>(var: &F, key: &'static str, default: &str) -> Result<Url, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = var(key).unwrap_or_else(|| default.to_string());
    let mut normalized = raw.trim().to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    Url::parse(&normalized).map_err(|e| ConfigError::InvalidValue {
        var: key,
        value: raw,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn base() -> HashMap<&'static str, String> {
        HashMap::from([
            ("GITHUB_ORIGIN", "git@github.com:octocat/Hello-World.git".to_string()),
            ("GITHUB_OAUTH_CLIENT_ID", "client-id".to_string()),
            ("GITHUB_OAUTH_CLIENT_SECRET", "client-secret".to_string()),
        ])
    }

    fn load(vars: &HashMap<&'static str, String>) -> Result<Env, ConfigError> {
        Env::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let env = load(&base()).unwrap();

        assert_eq!(env.origin.get().unwrap().to_string(), "octocat/Hello-World");
        assert_eq!(env.origin_policy, OriginPolicy::Strict);
        assert_eq!(env.logout_mode, LogoutMode::ClearSession);
        assert_eq!(env.oauth_scope, "public_repo");
        assert_eq!(env.github_api_url.as_str(), "https://api.github.com/");
        assert_eq!(env.github_oauth_url.as_str(), "https://github.com/login/oauth/");
        assert_eq!(env.github_timeout, Duration::from_secs(10));
        assert_eq!(env.bind_addr.port(), 3000);
        assert!(env.cookie_secure);
        assert!(env.uses_default_secret());
        assert_eq!(env.oauth_redirect_uri, None);
    }

    #[test]
    fn test_default_secret_is_long_enough() {
        assert!(settings::DEFAULT_SECRET_KEY.len() >= settings::MIN_SECRET_KEY_LEN);
    }

    #[test]
    fn test_strict_policy_rejects_missing_origin() {
        let mut vars = base();
        vars.remove("GITHUB_ORIGIN");

        assert_eq!(
            load(&vars).unwrap_err(),
            ConfigError::MissingVar("GITHUB_ORIGIN")
        );
    }

    #[test]
    fn test_strict_policy_rejects_invalid_origin() {
        let mut vars = base();
        vars.insert("GITHUB_ORIGIN", "https://github.com/octocat/Hello-World".to_string());

        assert!(matches!(
            load(&vars).unwrap_err(),
            ConfigError::MissingGitSuffix(_)
        ));
    }

    #[test]
    fn test_lenient_policy_defers_origin_errors() {
        let mut vars = base();
        vars.remove("GITHUB_ORIGIN");
        vars.insert("ORIGIN_POLICY", "lenient".to_string());

        let env = load(&vars).unwrap();

        assert_eq!(env.origin_policy, OriginPolicy::Lenient);
        assert_eq!(
            env.origin.get().unwrap_err(),
            ConfigError::MissingVar("GITHUB_ORIGIN")
        );
        assert!(env.origin.parsed().is_none());
    }

    #[test]
    fn test_missing_oauth_credentials() {
        let mut vars = base();
        vars.remove("GITHUB_OAUTH_CLIENT_SECRET");

        assert_eq!(
            load(&vars).unwrap_err(),
            ConfigError::MissingVar("GITHUB_OAUTH_CLIENT_SECRET")
        );
    }

    #[test]
    fn test_short_secret_key() {
        let mut vars = base();
        vars.insert("SECRET_KEY", "too-short".to_string());

        assert_eq!(
            load(&vars).unwrap_err(),
            ConfigError::WeakSecretKey(settings::MIN_SECRET_KEY_LEN)
        );
    }

    #[test]
    fn test_overrides() {
        let mut vars = base();
        vars.insert("SECRET_KEY", "k".repeat(64));
        vars.insert("LOGOUT_REVOKES_GRANT", "true".to_string());
        vars.insert("GITHUB_API_URL", "http://127.0.0.1:9000/api".to_string());
        vars.insert("GITHUB_TIMEOUT_SECS", "3".to_string());
        vars.insert("COOKIE_SECURE", "off".to_string());
        vars.insert("BIND_ADDR", "127.0.0.1:8080".to_string());

        let env = load(&vars).unwrap();

        assert!(!env.uses_default_secret());
        assert_eq!(env.logout_mode, LogoutMode::RevokeGrant);
        assert_eq!(env.github_api_url.as_str(), "http://127.0.0.1:9000/api/");
        assert_eq!(env.github_timeout, Duration::from_secs(3));
        assert!(!env.cookie_secure);
        assert_eq!(env.bind_addr.to_string(), "127.0.0.1:8080");
    }

    #[test]
    fn test_invalid_values() {
        for (key, value) in [
            ("LOGOUT_REVOKES_GRANT", "maybe"),
            ("GITHUB_TIMEOUT_SECS", "0"),
            ("ORIGIN_POLICY", "loose"),
            ("BIND_ADDR", "localhost"),
        ] {
            let mut vars = base();
            vars.insert(key, value.to_string());

            assert!(
                matches!(load(&vars), Err(ConfigError::InvalidValue { var, .. }) if var == key),
                "{key}={value} should be rejected"
            );
        }
    }

    #[test]
    fn test_settings_url() {
        let env = load(&base()).unwrap();
        assert_eq!(
            env.application_settings_url(),
            "https://github.com/settings/connections/applications/client-id"
        );
    }
}

//! GitHub の REST API と OAuth エンドポイント

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header::ACCEPT, Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use tracing::instrument;
use url::Url;

use crate::{origin::Origin, settings};

const GITHUB_JSON: &str = "application/vnd.github+json";

/// GitHub との通信の失敗
#[derive(Debug, thiserror::Error)]
pub enum GithubError {
    #[error("GitHub did not respond within {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("could not reach GitHub: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("GitHub responded with HTTP {status}")]
    Status { status: StatusCode, body: String },

    #[error("GitHub rejected the authorization code: {description}")]
    OAuth { error: String, description: String },

    #[error("unexpected response from GitHub: {0}")]
    Decode(String),
}

impl GithubError {
    /// 診断用のレスポンス本文. JSON なら整形する
    pub fn details(&self) -> Option<String> {
        let GithubError::Status { body, .. } = self else {
            return None;
        };
        if body.trim().is_empty() {
            return None;
        }
        let pretty = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| serde_json::to_string_pretty(&v).ok());
        Some(pretty.unwrap_or_else(|| body.clone()))
    }
}

/// `POST /repos/{owner}/{repo}/forks` の結果
#[derive(Clone, Debug, Deserialize)]
pub struct Fork {
    pub html_url: String,
}

/// `GET /user` の結果
#[derive(Clone, Debug, Deserialize)]
pub struct GithubUser {
    pub login: String,
}

/// access_token エンドポイントは失敗時も 200 を返す
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug)]
pub struct GithubClient {
    http_client: Client,
    api_url: Url,
    oauth_url: Url,
    client_id: String,
    client_secret: String,
    timeout: Duration,
}

/// `GithubClient` のビルダー
#[derive(Debug, Default)]
pub struct GithubClientBuilder {
    api_url: Option<Url>,
    oauth_url: Option<Url>,
    client_id: Option<String>,
    client_secret: Option<String>,
    timeout: Option<Duration>,
}

impl GithubClientBuilder {
    /// REST API のベース URL (テストでは wiremock を指す)
    #[must_use]
    pub fn api_url(mut self, url: Url) -> Self {
        self.api_url = Some(url);
        self
    }

    /// OAuth のベース URL (`.../login/oauth/`)
    #[must_use]
    pub fn oauth_url(mut self, url: Url) -> Self {
        self.oauth_url = Some(url);
        self
    }

    #[must_use]
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    #[must_use]
    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(client_secret.into());
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// client_id と client_secret は必須
    pub fn build(self) -> Result<GithubClient> {
        let client_id = self.client_id.context("client_id is required")?;
        let client_secret = self.client_secret.context("client_secret is required")?;
        let api_url = match self.api_url {
            Some(url) => url,
            None => Url::parse(settings::DEFAULT_GITHUB_API_URL)
                .context("invalid default API URL")?,
        };
        let oauth_url = match self.oauth_url {
            Some(url) => url,
            None => Url::parse(settings::DEFAULT_GITHUB_OAUTH_URL)
                .context("invalid default OAuth URL")?,
        };
        let timeout = self
            .timeout
            .unwrap_or(Duration::from_secs(settings::DEFAULT_GITHUB_TIMEOUT_SECS));

        let http_client = Client::builder()
            .user_agent(settings::USER_AGENT)
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(GithubClient {
            http_client,
            api_url,
            oauth_url,
            client_id,
            client_secret,
            timeout,
        })
    }
}

impl GithubClient {
    #[must_use]
    pub fn builder() -> GithubClientBuilder {
        GithubClientBuilder::default()
    }

    /// GitHub の認可ページの URL
    pub fn authorize_url(
        &self,
        state: &str,
        redirect_uri: Option<&str>,
        scope: &str,
    ) -> Result<Url, url::ParseError> {
        let mut url = self.oauth_url.join("authorize")?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.client_id)
                .append_pair("scope", scope)
                .append_pair("state", state);
            if let Some(redirect_uri) = redirect_uri {
                query.append_pair("redirect_uri", redirect_uri);
            }
        }
        Ok(url)
    }

    /// 認可コードをアクセストークンに交換する
    #[instrument(skip_all)]
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: Option<&str>,
    ) -> Result<String, GithubError> {
        let url = self.join(&self.oauth_url, "access_token")?;
        let mut form = vec![
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code", code),
        ];
        if let Some(redirect_uri) = redirect_uri {
            form.push(("redirect_uri", redirect_uri));
        }

        let request = self
            .http_client
            .post(url)
            .header(ACCEPT, "application/json")
            .form(&form);
        let response: TokenResponse = self.send_json(request).await?;

        match response {
            TokenResponse {
                access_token: Some(token),
                ..
            } => Ok(token),
            TokenResponse {
                error,
                error_description,
                ..
            } => {
                let error = error.unwrap_or_else(|| "unknown_error".to_string());
                Err(GithubError::OAuth {
                    description: error_description.unwrap_or_else(|| error.clone()),
                    error,
                })
            }
        }
    }

    /// `GET /user`
    #[instrument(skip_all)]
    pub async fn current_user(&self, token: &str) -> Result<GithubUser, GithubError> {
        let url = self.join(&self.api_url, "user")?;
        let request = self
            .http_client
            .get(url)
            .bearer_auth(token)
            .header(ACCEPT, GITHUB_JSON);
        self.send_json(request).await
    }

    /// `POST /repos/{owner}/{repo}/forks`
    #[instrument(skip_all, fields(origin = %origin))]
    pub async fn create_fork(&self, token: &str, origin: &Origin) -> Result<Fork, GithubError> {
        let path = format!("repos/{}/{}/forks", origin.owner(), origin.repo());
        let url = self.join(&self.api_url, &path)?;
        let request = self
            .http_client
            .post(url)
            .bearer_auth(token)
            .header(ACCEPT, GITHUB_JSON);
        let fork: Fork = self.send_json(request).await?;
        tracing::debug!(html_url = %fork.html_url, "fork created");
        Ok(fork)
    }

    /// `DELETE /applications/{client_id}/grants/{token}`. 204 以外は失敗
    #[instrument(skip_all)]
    pub async fn revoke_grant(&self, token: &str) -> Result<(), GithubError> {
        let path = format!("applications/{}/grants/{}", self.client_id, token);
        let url = self.join(&self.api_url, &path)?;
        let request = self
            .http_client
            .delete(url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header(ACCEPT, GITHUB_JSON);

        let response = self.send(request).await?;
        let status = response.status();
        if status != StatusCode::NO_CONTENT {
            let body = response.text().await.unwrap_or_default();
            return Err(GithubError::Status { status, body });
        }
        Ok(())
    }

    // path にトークンが含まれることがあるのでエラーには出さない
    fn join(&self, base: &Url, path: &str) -> Result<Url, GithubError> {
        base.join(path)
            .map_err(|e| GithubError::Decode(format!("invalid request URL: {e}")))
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, GithubError> {
        let response = request.send().await.map_err(|e| self.transport_error(e))?;

        let status = response.status();
        tracing::debug!(%status, "GitHub response");
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<failed to read body>"));
            return Err(GithubError::Status { status, body });
        }
        Ok(response)
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, GithubError> {
        let response = self.send(request).await?;
        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        serde_json::from_str(&body).map_err(|e| GithubError::Decode(e.to_string()))
    }

    /// reqwest のエラーは URL を含むので外す
    fn transport_error(&self, e: reqwest::Error) -> GithubError {
        if e.is_timeout() {
            GithubError::Timeout(self.timeout)
        } else {
            GithubError::Transport(e.without_url())
        }
    }
}

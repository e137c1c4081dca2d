//! Connection handle for the hosted backend.
//!
//! Built once by the app core and handed to the auth and table clients.

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, Response, Url};
use serde::Deserialize;

use crate::types::errors::ConfigError;

/// Shared HTTP client plus the project URL and anon key. Cheap to clone.
#[derive(Clone)]
pub struct SupabaseClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    base_url: Url,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(base_url: &str, anon_key: &str) -> Result<Self, ConfigError> {
        if anon_key.is_empty() {
            return Err(ConfigError::Missing("supabase_anon_key"));
        }

        let mut base_url = Url::parse(base_url).map_err(|e| ConfigError::Invalid {
            key: "supabase_url",
            message: e.to_string(),
        })?;
        // `Url::join` replaces the last path segment unless the path ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("smart-bookmark/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigError::Invalid {
                key: "http_client",
                message: e.to_string(),
            })?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                anon_key: anon_key.to_string(),
            }),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// `<base>/auth/v1/<path>`
    pub fn auth_url(&self, path: &str) -> Url {
        self.join(&format!("auth/v1/{}", path))
    }

    /// `<base>/rest/v1/<table>`
    pub fn rest_url(&self, table: &str) -> Url {
        self.join(&format!("rest/v1/{}", table))
    }

    fn join(&self, path: &str) -> Url {
        // Relative joins onto a slash-terminated base cannot fail.
        self.inner
            .base_url
            .join(path)
            .unwrap_or_else(|_| self.inner.base_url.clone())
    }

    /// Starts a request carrying the project `apikey` and a bearer token; the
    /// anon key stands in for the bearer when no session token is given.
    pub fn request(&self, method: Method, url: Url, bearer: Option<&str>) -> RequestBuilder {
        let token = bearer.unwrap_or(&self.inner.anon_key);
        self.inner
            .http
            .request(method, url)
            .header("apikey", &self.inner.anon_key)
            .bearer_auth(token)
    }
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

/// Reads a failed response into `(status, message)`, preferring the most
/// specific message field either API puts in its error body.
pub async fn error_parts(response: Response) -> (u16, String) {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
    let message = body
        .error_description
        .or(body.msg)
        .or(body.message)
        .or(body.error)
        .unwrap_or_else(|| {
            if text.is_empty() {
                status.canonical_reason().unwrap_or("unknown error").to_string()
            } else {
                text
            }
        });
    (status.as_u16(), message)
}

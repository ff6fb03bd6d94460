use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;

/// Raw access to the marketplace REST backend
#[async_trait::async_trait]
pub trait ApiBackend: Send + Sync {
    async fn get(&self, path: &str, token: Option<&str>) -> Result<Value>;

    async fn post(&self, path: &str, token: Option<&str>, body: Value) -> Result<Value>;

    async fn delete(&self, path: &str, token: Option<&str>) -> Result<()>;
}

/// `ApiBackend` over HTTP using `ureq`
///
/// Since `ureq` is blocking, every request runs in `spawn_blocking`.
#[derive(Debug, Clone)]
pub struct HttpApi {
    base_url: String,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

fn parse_body(bytes: &[u8]) -> Result<Value> {
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes).context("Backend returned invalid JSON")
}

#[async_trait::async_trait]
impl ApiBackend for HttpApi {
    async fn get(&self, path: &str, token: Option<&str>) -> Result<Value> {
        let url = self.url(path);
        let auth = token.map(bearer);
        debug!("GET {}", url);

        tokio::task::spawn_blocking(move || {
            let mut req = ureq::get(&url);
            if let Some(auth) = &auth {
                req = req.header("Authorization", auth);
            }
            let response = req.call().with_context(|| format!("GET {} failed", url))?;
            let body = response.into_body().read_to_vec()?;
            parse_body(&body)
        })
        .await?
    }

    async fn post(&self, path: &str, token: Option<&str>, body: Value) -> Result<Value> {
        let url = self.url(path);
        let auth = token.map(bearer);
        let payload = serde_json::to_vec(&body)?;
        debug!("POST {}", url);

        tokio::task::spawn_blocking(move || {
            let mut req = ureq::post(&url).header("Content-Type", "application/json");
            if let Some(auth) = &auth {
                req = req.header("Authorization", auth);
            }
            let response = req
                .send(&payload[..])
                .with_context(|| format!("POST {} failed", url))?;
            let body = response.into_body().read_to_vec()?;
            parse_body(&body)
        })
        .await?
    }

    async fn delete(&self, path: &str, token: Option<&str>) -> Result<()> {
        let url = self.url(path);
        let auth = token.map(bearer);
        debug!("DELETE {}", url);

        tokio::task::spawn_blocking(move || {
            let mut req = ureq::delete(&url);
            if let Some(auth) = &auth {
                req = req.header("Authorization", auth);
            }
            req.call().with_context(|| format!("DELETE {} failed", url))?;
            Ok(())
        })
        .await?
    }
}

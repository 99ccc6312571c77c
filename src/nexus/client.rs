//! Nexus REST client
//!
//! Authenticates with OAuth2 client credentials and caches the access token
//! until shortly before it expires.

use super::{NexusError, SupplierRecord, SupplierReference, SupplierSource};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};
use url::Url;

/// Tokens are refreshed this long before they expire
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(30);

/// Nexus client configuration
#[derive(Debug, Clone)]
pub struct NexusConfig {
    pub base_url: String,
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    300
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Nexus client implementing [`SupplierSource`]
pub struct NexusClient {
    base_url: Url,
    token_url: String,
    client_id: String,
    client_secret: String,
    client: Client,
    token: Mutex<Option<CachedToken>>,
}

impl NexusClient {
    pub fn new(config: NexusConfig) -> Result<Self, NexusError> {
        if config.client_id.is_empty() || config.client_secret.is_empty() {
            return Err(NexusError::AuthenticationFailed(
                "client id and secret are required".to_string(),
            ));
        }

        let base_url = Url::parse(&config.base_url).map_err(|e| {
            NexusError::RequestFailed(format!("invalid base URL {}: {e}", config.base_url))
        })?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| NexusError::RequestFailed(e.to_string()))?;

        info!(base_url = %base_url, "Created Nexus client");

        Ok(Self {
            base_url,
            token_url: config.token_url,
            client_id: config.client_id,
            client_secret: config.client_secret,
            client,
            token: Mutex::new(None),
        })
    }

    /// Current access token, fetching a new one when needed
    async fn access_token(&self) -> Result<String, NexusError> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() + TOKEN_EXPIRY_MARGIN {
                return Ok(token.access_token.clone());
            }
        }

        debug!(token_url = %self.token_url, "Requesting Nexus access token");
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| NexusError::AuthenticationFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NexusError::AuthenticationFailed(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| NexusError::AuthenticationFailed(e.to_string()))?;

        let access_token = token.access_token.clone();
        *cached = Some(CachedToken {
            access_token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });
        Ok(access_token)
    }

    /// Resolve an href against the API base; Nexus normally returns absolute links
    fn resolve_href(&self, href: &str) -> Result<Url, NexusError> {
        self.base_url
            .join(href)
            .map_err(|e| NexusError::InvalidResponse(format!("invalid link {href}: {e}")))
    }

    async fn get_json(&self, url: Url) -> Result<Value, NexusError> {
        let token = self.access_token().await?;
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| NexusError::RequestFailed(e.to_string()))?;

        ensure_success(response)?
            .json()
            .await
            .map_err(|e| NexusError::InvalidResponse(e.to_string()))
    }

    /// The API home resource, which links to the supplier listing
    async fn home(&self) -> Result<Value, NexusError> {
        self.get_json(self.base_url.clone()).await
    }
}

impl std::fmt::Debug for NexusClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NexusClient")
            .field("base_url", &self.base_url.as_str())
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

fn ensure_success(response: Response) -> Result<Response, NexusError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(NexusError::UnexpectedStatus {
            status: status.as_u16(),
            url: response.url().to_string(),
        })
    }
}

#[async_trait]
impl SupplierSource for NexusClient {
    async fn list_suppliers(&self) -> Result<Vec<SupplierReference>, NexusError> {
        let home = self.home().await?;
        let href = home
            .get("_links")
            .and_then(|links| links.get("suppliers"))
            .and_then(|link| link.get("href"))
            .and_then(Value::as_str)
            .ok_or_else(|| NexusError::MissingLink("suppliers".to_string()))?;

        let listing = self.get_json(self.resolve_href(href)?).await?;
        let entries = match listing {
            Value::Array(entries) => entries,
            other => {
                return Err(NexusError::InvalidResponse(format!(
                    "supplier listing is not an array: {other}"
                )))
            }
        };

        let suppliers = entries
            .into_iter()
            .map(SupplierReference::from_json)
            .collect::<Result<Vec<_>, _>>()?;

        info!(count = suppliers.len(), "Fetched suppliers from Nexus");
        Ok(suppliers)
    }

    async fn resolve(&self, reference: &SupplierReference) -> Result<SupplierRecord, NexusError> {
        let href = reference
            .link("self")
            .ok_or_else(|| NexusError::MissingLink("self".to_string()))?;

        debug!(supplier_id = reference.id, "Resolving supplier reference");
        let raw = self.get_json(self.resolve_href(href)?).await?;
        SupplierRecord::from_json(raw)
    }

    async fn update(&self, record: &SupplierRecord) -> Result<(), NexusError> {
        let href = record
            .link("update")
            .or_else(|| record.link("self"))
            .ok_or_else(|| NexusError::MissingLink("update".to_string()))?;
        let url = self.resolve_href(href)?;

        let token = self.access_token().await?;
        let response = self
            .client
            .put(url)
            .bearer_auth(token)
            .json(record.as_json())
            .send()
            .await
            .map_err(|e| NexusError::RequestFailed(e.to_string()))?;

        ensure_success(response)?;
        info!(supplier_id = record.id(), "Updated supplier in Nexus");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> NexusConfig {
        NexusConfig {
            base_url: "https://odense.nexus.example/api/v2/".to_string(),
            token_url: "https://iam.example/token".to_string(),
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_requires_client_credentials() {
        let mut config = config();
        config.client_secret = String::new();
        assert!(matches!(
            NexusClient::new(config),
            Err(NexusError::AuthenticationFailed(_))
        ));
    }

    #[test]
    fn test_resolve_relative_and_absolute_links() {
        let client = NexusClient::new(config()).unwrap();

        assert_eq!(
            client.resolve_href("suppliers/7").unwrap().as_str(),
            "https://odense.nexus.example/api/v2/suppliers/7"
        );
        assert_eq!(
            client
                .resolve_href("https://other.example/suppliers/7")
                .unwrap()
                .as_str(),
            "https://other.example/suppliers/7"
        );
    }
}

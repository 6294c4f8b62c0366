//! qBittorrent client implementation for release grabbing
//!
//! Talks to qBittorrent's Web API: cookie-based session login, then
//! form posts to add torrents. The API answers "Ok." or "Fails." in the
//! response body rather than using status codes for rejections.

use async_trait::async_trait;
use fetcharr_core::{FetcharrError, GrabClient, GrabReceipt, GrabRequest, Result};
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

/// Name reported back on successful grabs.
const CLIENT_NAME: &str = "qBittorrent";

/// Sessions are re-established after this long without a login.
const SESSION_TTL: Duration = Duration::from_secs(30 * 60);

/// Configuration for qBittorrent client
#[derive(Debug, Clone)]
pub struct QBittorrentConfig {
    /// Base URL of the qBittorrent Web UI (e.g., "http://localhost:8080")
    pub base_url: String,
    /// Username for authentication
    pub username: String,
    /// Password for authentication
    pub password: String,
    /// Request timeout in seconds
    pub timeout: u64,
}

impl Default for QBittorrentConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            username: "admin".to_string(),
            password: String::new(),
            timeout: 30,
        }
    }
}

/// Session state for tracking login status
#[derive(Debug, Default)]
struct SessionState {
    authenticated: bool,
    last_auth_time: Option<Instant>,
}

/// qBittorrent client for handing selected releases to the downloader
#[derive(Debug)]
pub struct QBittorrentClient {
    config: QBittorrentConfig,
    client: Client,
    base_url: Url,
    session_state: Arc<RwLock<SessionState>>,
}

impl QBittorrentClient {
    /// Create a new qBittorrent client
    pub fn new(config: QBittorrentConfig) -> Result<Self> {
        let base_url =
            Url::parse(&config.base_url).map_err(|e| FetcharrError::ExternalServiceError {
                service: "qbittorrent".to_string(),
                error: format!("Invalid base URL: {}", e),
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .cookie_store(true)
            .build()
            .map_err(|e| FetcharrError::ExternalServiceError {
                service: "qbittorrent".to_string(),
                error: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            config,
            client,
            base_url,
            session_state: Arc::new(RwLock::new(SessionState::default())),
        })
    }

    async fn ensure_authenticated(&self) -> Result<()> {
        {
            let state = self.session_state.read().await;
            let fresh = state
                .last_auth_time
                .is_some_and(|at| at.elapsed() < SESSION_TTL);
            if state.authenticated && fresh {
                return Ok(());
            }
        }
        self.login().await
    }

    async fn login(&self) -> Result<()> {
        let url = self.endpoint("/api/v2/auth/login")?;
        debug!(%url, "Authenticating with qBittorrent");

        let response = self
            .client
            .post(url)
            .form(&[
                ("username", self.config.username.as_str()),
                ("password", self.config.password.as_str()),
            ])
            .send()
            .await
            .map_err(|e| FetcharrError::ExternalServiceError {
                service: "qbittorrent".to_string(),
                error: format!("Login request failed: {}", e),
            })?;

        let body = response
            .text()
            .await
            .map_err(|e| FetcharrError::ExternalServiceError {
                service: "qbittorrent".to_string(),
                error: format!("Failed to read login response: {}", e),
            })?;

        if body.trim() != "Ok." {
            let mut state = self.session_state.write().await;
            state.authenticated = false;
            return Err(FetcharrError::ExternalServiceError {
                service: "qbittorrent".to_string(),
                error: "Authentication rejected".to_string(),
            });
        }

        let mut state = self.session_state.write().await;
        state.authenticated = true;
        state.last_auth_time = Some(Instant::now());
        debug!("qBittorrent session established");
        Ok(())
    }

    async fn add_torrent(&self, request: &GrabRequest) -> Result<bool> {
        let url = self.endpoint("/api/v2/torrents/add")?;

        let response = self
            .client
            .post(url)
            .form(&[
                ("urls", request.download_url.as_str()),
                ("category", request.category.as_str()),
            ])
            .send()
            .await
            .map_err(|e| FetcharrError::ExternalServiceError {
                service: "qbittorrent".to_string(),
                error: format!("Add torrent request failed: {}", e),
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(FetcharrError::ExternalServiceError {
                service: "qbittorrent".to_string(),
                error: format!("HTTP {}: {}", status, body),
            });
        }
        Ok(body.trim() == "Ok.")
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| FetcharrError::ExternalServiceError {
                service: "qbittorrent".to_string(),
                error: format!("Failed to build URL: {}", e),
            })
    }
}

#[async_trait]
impl GrabClient for QBittorrentClient {
    async fn grab(&self, request: &GrabRequest) -> Result<GrabReceipt> {
        self.ensure_authenticated().await?;

        let accepted = self.add_torrent(request).await?;
        if !accepted {
            warn!(title = %request.title, "qBittorrent declined the torrent");
            return Ok(GrabReceipt {
                success: false,
                client_name: CLIENT_NAME.to_string(),
                download_id: String::new(),
                reason: Some("qBittorrent declined the torrent".to_string()),
            });
        }

        let download_id =
            extract_info_hash(&request.download_url).unwrap_or_else(|| request.guid.clone());
        info!(title = %request.title, category = %request.category, download_id = %download_id, "Torrent added");
        Ok(GrabReceipt {
            success: true,
            client_name: CLIENT_NAME.to_string(),
            download_id,
            reason: None,
        })
    }
}

/// Pull the btih info hash out of a magnet link, lowercased.
fn extract_info_hash(download_url: &str) -> Option<String> {
    let url = Url::parse(download_url).ok()?;
    if url.scheme() != "magnet" {
        return None;
    }
    url.query_pairs()
        .find(|(name, _)| name == "xt")
        .and_then(|(_, value)| {
            value
                .strip_prefix("urn:btih:")
                .map(|hash| hash.to_lowercase())
        })
}

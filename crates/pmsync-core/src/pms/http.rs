//! Generic REST adapter for PMS providers
//!
//! ## Endpoints
//!
//! - `GET {endpoint}/{api_version}/hotels/{hotel_id}/reservations`
//!   returns a JSON array of reservations
//! - `GET {endpoint}/{api_version}/hotels/{hotel_id}/changes?since=<RFC 3339>`
//!   returns a JSON array of change events (`since` omitted for the backlog)
//!
//! Requests carry `Authorization: Bearer <api_key>` and the provider id in
//! `X-PMS-Provider`. HTTP 429 responses are retried a bounded number of
//! times with exponential backoff; everything else is reported to the
//! caller as-is.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::PmsConfig;
use crate::models::{PmsReservation, PmsSyncEvent};
use crate::pms::client::PmsClient;
use crate::pms::error::{PmsError, PmsErrorCode};

const DEFAULT_RATE_LIMIT_RETRIES: u32 = 3;
const DEFAULT_RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(2);
const MAX_RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(60);

/// HTTP implementation of [`PmsClient`]
pub struct HttpPmsClient {
    config: PmsConfig,
    client: Client,
    rate_limit_retries: u32,
    rate_limit_backoff: Duration,
}

impl HttpPmsClient {
    /// Build a client from validated configuration
    pub fn new(config: PmsConfig) -> Result<Self, PmsError> {
        if config.api_key.trim().is_empty() {
            return Err(PmsError::new(
                PmsErrorCode::NotConfigured,
                "API key is empty",
            ));
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("pmsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PmsError::new(PmsErrorCode::NotConfigured, e.to_string()))?;

        Ok(Self {
            config,
            client,
            rate_limit_retries: DEFAULT_RATE_LIMIT_RETRIES,
            rate_limit_backoff: DEFAULT_RATE_LIMIT_BACKOFF,
        })
    }

    /// Override how 429 responses are retried
    pub fn with_rate_limit_backoff(mut self, initial: Duration, retries: u32) -> Self {
        self.rate_limit_backoff = initial;
        self.rate_limit_retries = retries;
        self
    }

    fn hotel_url(&self) -> String {
        format!(
            "{}/{}/hotels/{}",
            self.config.api_endpoint.trim_end_matches('/'),
            self.config.provider.api_version,
            self.config.hotel_id
        )
    }

    /// URL for the full reservation snapshot
    pub fn reservations_url(&self) -> Result<Url, PmsError> {
        parse_url(&format!("{}/reservations", self.hotel_url()))
    }

    /// URL for the change feed after `since`
    pub fn changes_url(&self, since: Option<DateTime<Utc>>) -> Result<Url, PmsError> {
        let mut url = parse_url(&format!("{}/changes", self.hotel_url()))?;
        if let Some(since) = since {
            url.query_pairs_mut()
                .append_pair("since", &since.to_rfc3339_opts(SecondsFormat::Millis, true));
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, PmsError> {
        let mut retries = 0;
        let mut backoff = self.rate_limit_backoff;

        loop {
            debug!("GET {}", url);
            let resp = self
                .client
                .get(url.clone())
                .bearer_auth(&self.config.api_key)
                .header("X-PMS-Provider", &self.config.provider.id)
                .send()
                .await?;

            let status = resp.status();
            if status == StatusCode::TOO_MANY_REQUESTS && retries < self.rate_limit_retries {
                retries += 1;
                warn!(
                    "PMS rate limited request ({}/{}), retrying in {:?}",
                    retries, self.rate_limit_retries, backoff
                );
                tokio::time::sleep(backoff).await;
                backoff = next_backoff(backoff);
                continue;
            }

            let body = resp.text().await?;
            if !status.is_success() {
                return Err(status_error(status, body));
            }

            return serde_json::from_str(&body).map_err(|e| {
                PmsError::malformed(format!("Failed to decode response from {}: {}", url, e))
            });
        }
    }
}

#[async_trait]
impl PmsClient for HttpPmsClient {
    async fn fetch_all_reservations(&self) -> Result<Vec<PmsReservation>, PmsError> {
        let url = self.reservations_url()?;
        let reservations: Vec<PmsReservation> = self.get_json(url).await?;
        debug!("Fetched {} reservations from PMS", reservations.len());
        Ok(reservations)
    }

    async fn fetch_changes_since(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<PmsSyncEvent>, PmsError> {
        let url = self.changes_url(since)?;
        let events: Vec<PmsSyncEvent> = self.get_json(url).await?;
        debug!("Fetched {} change events from PMS", events.len());
        Ok(events)
    }
}

fn parse_url(raw: &str) -> Result<Url, PmsError> {
    Url::parse(raw).map_err(|e| {
        PmsError::new(
            PmsErrorCode::NotConfigured,
            format!("Invalid PMS URL '{}': {}", raw, e),
        )
    })
}

/// Map a non-success HTTP status to a PMS error
fn status_error(status: StatusCode, body: String) -> PmsError {
    let code = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PmsErrorCode::Unauthorized,
        StatusCode::TOO_MANY_REQUESTS => PmsErrorCode::RateLimited,
        s if s.is_server_error() => PmsErrorCode::Network,
        s => PmsErrorCode::Provider(format!("http_{}", s.as_u16())),
    };

    let details = serde_json::from_str(&body).unwrap_or(serde_json::Value::String(body));
    PmsError::new(code, format!("HTTP {}", status)).with_details(details)
}

fn next_backoff(current: Duration) -> Duration {
    current.saturating_mul(2).min(MAX_RATE_LIMIT_BACKOFF)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PmsProvider;
    use chrono::TimeZone;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn pms_config(endpoint: &str) -> PmsConfig {
        PmsConfig {
            provider: PmsProvider {
                name: "Test PMS".to_string(),
                id: "test-pms".to_string(),
                api_version: "v2".to_string(),
            },
            api_key: "k-123".to_string(),
            api_endpoint: endpoint.to_string(),
            hotel_id: "H-1".to_string(),
            sync_interval: Duration::from_secs(60),
            request_timeout: Duration::from_secs(5),
        }
    }

    /// Serve one canned response per connection, returning the raw requests
    async fn serve(responses: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let mut requests = Vec::new();
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                loop {
                    let n = socket.read(&mut chunk).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                    if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }
                requests.push(String::from_utf8_lossy(&buf).to_string());

                let response = format!(
                    "HTTP/1.1 {} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
            }
            requests
        });

        (format!("http://{}", addr), handle)
    }

    const RESERVATIONS: &str = r#"[{
        "pmsId": "R-1", "guestName": "Ada", "checkIn": "2026-06-01T15:00:00Z",
        "checkOut": "2026-06-02T11:00:00Z", "roomNumber": "7", "status": "confirmed",
        "adults": 2, "children": 0, "totalAmount": 99.5, "paymentStatus": "pending"
    }]"#;

    #[test]
    fn test_rejects_empty_api_key() {
        let mut config = pms_config("https://pms.example.com");
        config.api_key = "  ".to_string();
        let err = HttpPmsClient::new(config).err().unwrap();
        assert_eq!(err.code, PmsErrorCode::NotConfigured);
    }

    #[test]
    fn test_urls() {
        let client = HttpPmsClient::new(pms_config("https://pms.example.com/api/")).unwrap();

        assert_eq!(
            client.reservations_url().unwrap().as_str(),
            "https://pms.example.com/api/v2/hotels/H-1/reservations"
        );
        assert_eq!(
            client.changes_url(None).unwrap().as_str(),
            "https://pms.example.com/api/v2/hotels/H-1/changes"
        );

        let since = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let url = client.changes_url(Some(since)).unwrap();
        assert_eq!(url.query(), Some("since=2026-01-02T03%3A04%3A05.000Z"));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_error(StatusCode::FORBIDDEN, String::new()).code,
            PmsErrorCode::Unauthorized
        );
        assert_eq!(
            status_error(StatusCode::BAD_GATEWAY, String::new()).code,
            PmsErrorCode::Network
        );
        let err = status_error(StatusCode::NOT_FOUND, r#"{"error":"no hotel"}"#.to_string());
        assert_eq!(err.code, PmsErrorCode::Provider("http_404".to_string()));
        assert_eq!(err.details.unwrap()["error"], "no hotel");
    }

    #[tokio::test]
    async fn test_fetch_all_reservations() {
        let (endpoint, server) = serve(vec![(200, RESERVATIONS)]).await;
        let client = HttpPmsClient::new(pms_config(&endpoint)).unwrap();

        let reservations = client.fetch_all_reservations().await.unwrap();
        assert_eq!(reservations.len(), 1);
        assert_eq!(reservations[0].pms_id, "R-1");

        let requests = server.await.unwrap();
        let request = requests[0].to_lowercase();
        assert!(request.starts_with("get /v2/hotels/h-1/reservations"));
        assert!(request.contains("authorization: bearer k-123"));
        assert!(request.contains("x-pms-provider: test-pms"));
    }

    #[tokio::test]
    async fn test_fetch_changes_passes_cursor() {
        let (endpoint, server) = serve(vec![(200, "[]")]).await;
        let client = HttpPmsClient::new(pms_config(&endpoint)).unwrap();

        let since = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let events = client.fetch_changes_since(Some(since)).await.unwrap();
        assert!(events.is_empty());

        let requests = server.await.unwrap();
        assert!(requests[0].contains("/changes?since=2026-01-01T00%3A00%3A00.000Z"));
    }

    #[tokio::test]
    async fn test_unauthorized_is_reported() {
        let (endpoint, _server) = serve(vec![(401, r#"{"error":"bad key"}"#)]).await;
        let client = HttpPmsClient::new(pms_config(&endpoint)).unwrap();

        let err = client.fetch_all_reservations().await.unwrap_err();
        assert_eq!(err.code, PmsErrorCode::Unauthorized);
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let (endpoint, _server) = serve(vec![(200, r#"{"not":"a list"}"#)]).await;
        let client = HttpPmsClient::new(pms_config(&endpoint)).unwrap();

        let err = client.fetch_all_reservations().await.unwrap_err();
        assert_eq!(err.code, PmsErrorCode::MalformedResponse);
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried() {
        let (endpoint, server) = serve(vec![(429, "{}"), (200, RESERVATIONS)]).await;
        let client = HttpPmsClient::new(pms_config(&endpoint))
            .unwrap()
            .with_rate_limit_backoff(Duration::from_millis(1), 2);

        let reservations = client.fetch_all_reservations().await.unwrap();
        assert_eq!(reservations.len(), 1);
        assert_eq!(server.await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rate_limit_gives_up() {
        let (endpoint, _server) = serve(vec![(429, "{}"), (429, "{}")]).await;
        let client = HttpPmsClient::new(pms_config(&endpoint))
            .unwrap()
            .with_rate_limit_backoff(Duration::from_millis(1), 1);

        let err = client.fetch_all_reservations().await.unwrap_err();
        assert_eq!(err.code, PmsErrorCode::RateLimited);
        assert!(err.is_transient());
    }

    #[test]
    fn test_rate_limit_backoff_is_capped() {
        assert_eq!(next_backoff(Duration::from_secs(2)), Duration::from_secs(4));
        assert_eq!(next_backoff(Duration::from_secs(45)), MAX_RATE_LIMIT_BACKOFF);

        let mut backoff = Duration::from_secs(1);
        for _ in 0..200 {
            backoff = next_backoff(backoff);
        }
        assert_eq!(backoff, MAX_RATE_LIMIT_BACKOFF);
        assert_eq!(next_backoff(Duration::MAX), MAX_RATE_LIMIT_BACKOFF);
    }
}

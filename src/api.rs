//! Synchronous client for the **e-Stat API (v3.0, JSON)** `getStatsData` endpoint.
//!
//! Returns results as tidy `models::NormalizedRecord` rows with classification
//! codes resolved to labels.
//!
//! ### Notes
//! - Transient failures (network errors, 5xx, 429) are retried with exponential
//!   backoff: 3 attempts, 2s base delay doubling per attempt, capped at 10s.
//! - A non-zero `RESULT.STATUS` in an otherwise successful response is an
//!   API-level error and is surfaced immediately without retrying.
//! - `get` caches normalized results per `(table id, params)` for one hour by default.
//!
//! Typical usage:
//! ```no_run
//! # use estat_market::{Client, ClientConfig, Params};
//! let client = Client::new("my-app-id", ClientConfig::default())?;
//! let mut params = Params::new();
//! params.insert("cdArea".into(), "13".into());
//! let rows = client.get("0003109558", &params)?;
//! # Ok::<(), estat_market::EstatError>(())
//! ```
use crate::cache::{CacheKey, MemoryCache, ResponseCache};
use crate::classification::ClassificationIndex;
use crate::credentials::CredentialChain;
use crate::error::{EstatError, Result, TransportError};
use crate::models::{NormalizedRecord, Params, RawResponse, RawValueRecord};
use log::{debug, info, warn};
use reqwest::blocking::Client as HttpClient;
use reqwest::redirect::Policy;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub const ESTAT_BASE_URL: &str = "https://api.e-stat.go.jp/rest/3.0/app/json/getStatsData";

const APP_ID_PARAM: &str = "appId";

/// Client configuration. `Default` matches the public API's expectations.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    /// Total request timeout.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Attempts in total, including the first one.
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
    /// Used when the client builds its own [`MemoryCache`].
    pub cache_ttl: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: ESTAT_BASE_URL.into(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_attempts: 3,
            backoff_base: Duration::from_secs(2),
            backoff_cap: Duration::from_secs(10),
            cache_ttl: Duration::from_secs(3600),
        }
    }
}

impl ClientConfig {
    /// Delay after failed attempt `attempt` (1-based): `base * 2^(attempt-1)`, capped.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.backoff_base
            .saturating_mul(factor)
            .min(self.backoff_cap)
    }
}

/// One GET returning a JSON document. Implementations do not retry.
pub trait Transport: Send + Sync {
    fn get_json(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> std::result::Result<Value, TransportError>;
}

/// `reqwest` blocking transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: HttpClient,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(config.timeout) // total request timeout
            .connect_timeout(config.connect_timeout) // connect timeout
            .redirect(Policy::limited(5)) // cap redirects
            .user_agent(concat!("estat_market/", env!("CARGO_PKG_VERSION"))) // set user agent
            .build()
            .map_err(|e| EstatError::ClientSetup(e.to_string()))?;
        Ok(Self { http })
    }
}

impl Transport for HttpTransport {
    fn get_json(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> std::result::Result<Value, TransportError> {
        match self.http.get(url).query(query).send() {
            // A body cut off mid-read is a network failure; only a complete
            // body that fails to parse is a decode error.
            Ok(r) if r.status().is_success() => {
                let body = r
                    .bytes()
                    .map_err(|e| TransportError::Network(e.to_string()))?;
                serde_json::from_slice(&body).map_err(|e| TransportError::Decode(e.to_string()))
            }
            Ok(r) => Err(TransportError::Status(r.status().as_u16())),
            Err(e) => Err(TransportError::Network(e.to_string())),
        }
    }
}

/// Result of normalizing one response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalization {
    pub records: Vec<NormalizedRecord>,
    /// `VALUE` entries that could not be read as a value row at all.
    pub malformed_rows: usize,
}

/// Convert the `VALUE` rows of a response into tidy records, resolving codes
/// through the response's own classification block.
pub fn normalize(response: &RawResponse) -> Normalization {
    let index = ClassificationIndex::build(&response.class_objs);
    let mut out = Normalization {
        records: Vec::with_capacity(response.values.len()),
        malformed_rows: 0,
    };
    for raw in &response.values {
        let row: RawValueRecord = match serde_json::from_value(raw.clone()) {
            Ok(r) => r,
            Err(e) => {
                debug!("skipping malformed VALUE row {}: {}", raw, e);
                out.malformed_rows += 1;
                continue;
            }
        };
        out.records.push(NormalizedRecord {
            category: index.resolve_opt("cat01", row.cat01.as_deref()),
            area: index.resolve_opt("area", row.area.as_deref()),
            time: index.resolve_opt("time", row.time.as_deref()),
            value: row.numeric_value(),
            tab: row.tab,
            class_code: row.class_code,
        });
    }
    out
}

/// e-Stat statistics client with retry and response caching.
#[derive(Clone)]
pub struct Client {
    app_id: String,
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    cache: Arc<dyn ResponseCache>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("app_id", &"<redacted>")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// HTTP transport and an in-memory cache with `config.cache_ttl`.
    ///
    /// ### Errors
    /// - `AuthenticationMissing` if `app_id` is blank
    /// - `ClientSetup` if the HTTP client cannot be built
    pub fn new(app_id: impl Into<String>, config: ClientConfig) -> Result<Self> {
        let app_id = app_id.into().trim().to_string();
        if app_id.is_empty() {
            return Err(EstatError::AuthenticationMissing);
        }
        let transport = Arc::new(HttpTransport::new(&config)?);
        let cache = Arc::new(MemoryCache::new(config.cache_ttl));
        Ok(Self {
            app_id,
            config,
            transport,
            cache,
        })
    }

    /// Resolve the app id once, through `chain`, then build the client.
    pub fn from_credentials(chain: &CredentialChain, config: ClientConfig) -> Result<Self> {
        Self::new(chain.require()?, config)
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn ResponseCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Query string for a request; caller params override the defaults,
    /// except `appId`, which always comes from the resolved credential.
    fn query(&self, table_id: &str, params: &Params) -> Vec<(String, String)> {
        let mut query = vec![
            ("appId".to_string(), self.app_id.clone()),
            ("statsDataId".to_string(), table_id.to_string()),
        ];
        for (k, v) in params {
            if k == APP_ID_PARAM {
                warn!("ignoring caller-supplied appId; the resolved credential is used");
                continue;
            }
            match query.iter_mut().find(|(qk, _)| qk == k) {
                Some(slot) => slot.1 = v.clone(),
                None => query.push((k.clone(), v.clone())),
            }
        }
        query
    }

    /// GET with retry. Non-transient failures return immediately.
    fn request(&self, table_id: &str, params: &Params) -> Result<Value> {
        let query = self.query(table_id, params);
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.transport.get_json(&self.config.base_url, &query) {
                Ok(v) => return Ok(v),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.config.backoff_delay(attempt);
                    debug!(
                        "statsDataId={} attempt {}/{} failed ({}); retrying in {:?}",
                        table_id, attempt, max_attempts, e, delay
                    );
                    std::thread::sleep(delay);
                }
                Err(e) if e.is_transient() => {
                    return Err(EstatError::TransientFetch {
                        attempts: attempt,
                        message: e.to_string(),
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Fetch one table and check the API-level status.
    ///
    /// ### Errors
    /// - `TransientFetch` once the retry budget is spent
    /// - `RemoteApi` for a non-zero `RESULT.STATUS` (not retried)
    /// - `Http` / `Decode` for other unusable responses
    pub fn fetch_raw(&self, table_id: &str, params: &Params) -> Result<RawResponse> {
        let body = self.request(table_id, params)?;
        let response = RawResponse::from_json(&body);
        response.check_status()?;
        Ok(response)
    }

    /// Classification labels only. The payload status is not enforced here so
    /// labels stay available for tables whose data block is empty.
    pub fn fetch_metadata(&self, table_id: &str, params: &Params) -> Result<ClassificationIndex> {
        let body = self.request(table_id, params)?;
        let response = RawResponse::from_json(&body);
        Ok(ClassificationIndex::build(&response.class_objs))
    }

    /// Fetch, normalize, and cache one table.
    ///
    /// Identical `(table_id, params)` within the cache TTL are served without a
    /// network call. Malformed rows are dropped and counted in the log.
    pub fn get(&self, table_id: &str, params: &Params) -> Result<Vec<NormalizedRecord>> {
        let key = CacheKey::new(table_id, params);
        if let Some(records) = self.cache.get(&key) {
            info!("cache hit for {}", key);
            return Ok(records);
        }
        info!("cache miss for {}; fetching", key);
        let response = self.fetch_raw(table_id, params)?;
        let normalized = normalize(&response);
        if normalized.malformed_rows > 0 {
            info!(
                "dropped {} malformed VALUE row(s) from statsDataId={}",
                normalized.malformed_rows, table_id
            );
        }
        self.cache.set(key, normalized.records.clone());
        Ok(normalized.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.backoff_delay(1), Duration::from_secs(2));
        assert_eq!(cfg.backoff_delay(2), Duration::from_secs(4));
        assert_eq!(cfg.backoff_delay(3), Duration::from_secs(8));
        assert_eq!(cfg.backoff_delay(4), Duration::from_secs(10));
        assert_eq!(cfg.backoff_delay(40), Duration::from_secs(10));
    }

    #[test]
    fn params_override_default_query_keys() {
        let client = Client::new("key", ClientConfig::default()).unwrap();
        let mut params = Params::new();
        params.insert("cdArea".into(), "13".into());
        params.insert("statsDataId".into(), "override".into());
        let q = client.query("0003", &params);
        assert_eq!(q[0], ("appId".to_string(), "key".to_string()));
        assert_eq!(q[1], ("statsDataId".to_string(), "override".to_string()));
        assert_eq!(q[2], ("cdArea".to_string(), "13".to_string()));
    }

    #[test]
    fn caller_cannot_replace_app_id() {
        let client = Client::new("key", ClientConfig::default()).unwrap();
        let mut params = Params::new();
        params.insert("appId".into(), "someone-else".into());
        let q = client.query("0003", &params);
        assert_eq!(q.len(), 2);
        assert_eq!(q[0], ("appId".to_string(), "key".to_string()));
        assert!(!q.iter().any(|(_, v)| v == "someone-else"));
    }

    #[test]
    fn blank_app_id_is_authentication_missing() {
        let err = Client::new("   ", ClientConfig::default()).unwrap_err();
        assert!(matches!(err, EstatError::AuthenticationMissing));
    }
}

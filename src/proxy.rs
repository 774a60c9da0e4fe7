//! Proxy pool for routing engine requests through upstream proxies.
//!
//! The pool is filled once at startup from a proxy list file or a one-shot
//! API fetch and is read-only afterwards. Each outgoing request picks a
//! random member; an empty pool means direct connections.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use rand::seq::SliceRandom;
use regex::Regex;
use reqwest::{Client, Proxy as ReqwestProxy};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{ProxySettings, ProxySource};
use crate::{Result, SearchError};

/// Target fetched through a proxy to decide whether it is alive.
pub const DEFAULT_CHECK_URL: &str = "https://httpbin.org/ip";

/// Timeout for a single liveness probe.
pub const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Probes in flight at once during [`ProxyPool::validated`].
const VALIDATE_CONCURRENCY: usize = 32;

/// Timeout for the proxy list API call.
const API_TIMEOUT: Duration = Duration::from_secs(15);

static PROXY_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?P<user>[^:@\s]+):(?P<pass>[^@\s]+)@)?(?P<host>[^:@\s/]+):(?P<port>\d{1,5})$")
        .expect("proxy line pattern is valid")
});

/// Proxy protocol type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProxyScheme {
    /// HTTP proxy
    #[default]
    Http,
    /// HTTPS proxy
    Https,
    /// SOCKS4 proxy
    Socks4,
    /// SOCKS5 proxy
    Socks5,
}

impl ProxyScheme {
    /// Returns the URL scheme string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
            Self::Socks4 => "socks4",
            Self::Socks5 => "socks5",
        }
    }
}

impl FromStr for ProxyScheme {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            "socks4" => Ok(Self::Socks4),
            "socks5" => Ok(Self::Socks5),
            other => Err(SearchError::Proxy(format!("unsupported proxy scheme '{other}'"))),
        }
    }
}

/// How much of the client identity a proxy reveals. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anonymity {
    Transparent,
    Anonymous,
    Elite,
}

impl FromStr for Anonymity {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "transparent" => Ok(Self::Transparent),
            "anonymous" => Ok(Self::Anonymous),
            "elite" => Ok(Self::Elite),
            other => Err(SearchError::Proxy(format!("unknown anonymity level '{other}'"))),
        }
    }
}

/// A single upstream proxy.
///
/// Descriptors are never changed once pooled; a health probe returns a new
/// descriptor carrying the measured latency.
#[derive(Debug, Clone, PartialEq)]
pub struct Proxy {
    host: String,
    port: u16,
    scheme: ProxyScheme,
    username: Option<String>,
    password: Option<String>,
    anonymity: Option<Anonymity>,
    measured_latency: Option<Duration>,
}

impl Proxy {
    /// Creates a new HTTP proxy descriptor.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            scheme: ProxyScheme::Http,
            username: None,
            password: None,
            anonymity: None,
            measured_latency: None,
        }
    }

    /// Sets the proxy scheme.
    pub fn with_scheme(mut self, scheme: ProxyScheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Sets authentication credentials.
    pub fn with_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Sets the anonymity tag.
    pub fn with_anonymity(mut self, anonymity: Anonymity) -> Self {
        self.anonymity = Some(anonymity);
        self
    }

    /// Returns a copy of this descriptor carrying a measured latency.
    pub fn with_measured_latency(mut self, latency: Duration) -> Self {
        self.measured_latency = Some(latency);
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn scheme(&self) -> ProxyScheme {
        self.scheme
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn anonymity(&self) -> Option<Anonymity> {
        self.anonymity
    }

    pub fn measured_latency(&self) -> Option<Duration> {
        self.measured_latency
    }

    /// Returns the proxy URL string, credentials included.
    ///
    /// Credentials are only emitted when both username and password are set.
    pub fn url(&self) -> String {
        let scheme = self.scheme.as_str();
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => format!(
                "{}://{}:{}@{}:{}",
                scheme,
                urlencoding::encode(user),
                urlencoding::encode(pass),
                self.host,
                self.port
            ),
            _ => format!("{}://{}:{}", scheme, self.host, self.port),
        }
    }

    /// Builds the reqwest proxy routing all traffic through this descriptor.
    pub fn to_reqwest(&self) -> Result<ReqwestProxy> {
        ReqwestProxy::all(self.url())
            .map_err(|e| SearchError::Proxy(format!("failed to create proxy {self}: {e}")))
    }
}

/// Credentials are left out so descriptors can be logged.
impl fmt::Display for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme.as_str(), self.host, self.port)
    }
}

/// Parses a `[user:pass@]host:port` line.
impl FromStr for Proxy {
    type Err = SearchError;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let caps = PROXY_LINE
            .captures(line)
            .ok_or_else(|| SearchError::Proxy(format!("'{line}' is not [user:pass@]host:port")))?;

        let port = caps["port"]
            .parse::<u16>()
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| SearchError::Proxy(format!("invalid port in '{line}'")))?;

        let mut proxy = Proxy::new(&caps["host"], port);
        if let (Some(user), Some(pass)) = (caps.name("user"), caps.name("pass")) {
            proxy = proxy.with_auth(user.as_str(), pass.as_str());
        }
        Ok(proxy)
    }
}

/// Builds an HTTP client, routed through `proxy` when one is given.
pub fn build_client(user_agent: &str, timeout: Duration, proxy: Option<&Proxy>) -> Result<Client> {
    let mut builder = Client::builder().user_agent(user_agent).timeout(timeout);

    if let Some(proxy) = proxy {
        debug!(proxy = %proxy, "Routing request through proxy");
        builder = builder.proxy(proxy.to_reqwest()?);
    }

    builder
        .build()
        .map_err(|e| SearchError::Other(format!("Failed to create HTTP client: {}", e)))
}

/// Parses a newline-delimited proxy list.
///
/// Blank lines and `#` comments are ignored; malformed lines are logged
/// and skipped without affecting the rest of the list.
pub fn parse_proxy_list(text: &str) -> Vec<Proxy> {
    let mut proxies = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line.parse::<Proxy>() {
            Ok(proxy) => proxies.push(proxy),
            Err(e) => warn!(line = index + 1, error = %e, "Skipping malformed proxy entry"),
        }
    }
    proxies
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ApiProxyEntry {
    Plain(String),
    Detailed(ApiProxyRecord),
}

#[derive(Deserialize)]
struct ApiProxyRecord {
    ip_address: String,
    port: ApiPort,
    #[serde(default)]
    protocol: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    anonymity: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ApiPort {
    Number(u64),
    Text(String),
}

impl ApiProxyRecord {
    fn into_proxy(self) -> Result<Proxy> {
        let port = match self.port {
            ApiPort::Number(n) => u16::try_from(n).ok(),
            ApiPort::Text(s) => s.trim().parse::<u16>().ok(),
        }
        .filter(|p| *p != 0)
        .ok_or_else(|| SearchError::Proxy(format!("invalid port for {}", self.ip_address)))?;

        let host = self.ip_address.trim();
        if host.is_empty() {
            return Err(SearchError::Proxy("empty ip_address".to_string()));
        }

        let mut proxy = Proxy::new(host, port);
        if let Some(protocol) = self.protocol.as_deref() {
            proxy = proxy.with_scheme(protocol.parse()?);
        }
        if let (Some(user), Some(pass)) = (self.username, self.password) {
            proxy = proxy.with_auth(user, pass);
        }
        if let Some(anonymity) = self.anonymity.as_deref().and_then(|a| a.parse().ok()) {
            proxy = proxy.with_anonymity(anonymity);
        }
        Ok(proxy)
    }
}

/// Parses the proxy API response body.
///
/// The body must be a JSON array; each element is either a `"host:port"`
/// string or an object with `ip_address`/`port`/`protocol`/`username`/
/// `password`. Bad elements are logged and skipped.
pub fn parse_api_payload(body: &str) -> Result<Vec<Proxy>> {
    let entries: Vec<Value> = serde_json::from_str(body)
        .map_err(|e| SearchError::Parse(format!("proxy API response is not a JSON array: {e}")))?;

    let mut proxies = Vec::new();
    for (index, entry) in entries.into_iter().enumerate() {
        let parsed = serde_json::from_value::<ApiProxyEntry>(entry)
            .map_err(|e| SearchError::Proxy(e.to_string()))
            .and_then(|entry| match entry {
                ApiProxyEntry::Plain(line) => line.parse::<Proxy>(),
                ApiProxyEntry::Detailed(record) => record.into_proxy(),
            });
        match parsed {
            Ok(proxy) => proxies.push(proxy),
            Err(e) => warn!(entry = index, error = %e, "Skipping malformed proxy entry"),
        }
    }
    Ok(proxies)
}

/// Trait for providing proxies.
#[async_trait]
pub trait ProxyProvider: Send + Sync {
    /// Fetches a list of available proxies.
    async fn fetch_proxies(&self) -> Result<Vec<Proxy>>;
}

/// A static proxy provider that returns a fixed list of proxies.
pub struct StaticProxyProvider {
    proxies: Vec<Proxy>,
}

impl StaticProxyProvider {
    /// Creates a new static proxy provider.
    pub fn new(proxies: Vec<Proxy>) -> Self {
        Self { proxies }
    }
}

#[async_trait]
impl ProxyProvider for StaticProxyProvider {
    async fn fetch_proxies(&self) -> Result<Vec<Proxy>> {
        Ok(self.proxies.clone())
    }
}

/// Reads proxies from a newline-delimited file.
pub struct FileProxyProvider {
    path: PathBuf,
}

impl FileProxyProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ProxyProvider for FileProxyProvider {
    async fn fetch_proxies(&self) -> Result<Vec<Proxy>> {
        let text = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            SearchError::Proxy(format!("failed to read {}: {}", self.path.display(), e))
        })?;
        Ok(parse_proxy_list(&text))
    }
}

/// Fetches proxies once from an HTTP API using bearer authentication.
pub struct ApiProxyProvider {
    url: String,
    api_key: Option<String>,
}

impl ApiProxyProvider {
    pub fn new(url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            url: url.into(),
            api_key,
        }
    }
}

#[async_trait]
impl ProxyProvider for ApiProxyProvider {
    async fn fetch_proxies(&self) -> Result<Vec<Proxy>> {
        let client = Client::builder().timeout(API_TIMEOUT).build()?;
        let mut request = client.get(&self.url);
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.is_empty()) {
            request = request.bearer_auth(key);
        }
        let body = request.send().await?.error_for_status()?.text().await?;
        parse_api_payload(&body)
    }
}

/// A read-only set of proxies with random selection.
#[derive(Debug, Clone)]
pub struct ProxyPool {
    proxies: Vec<Arc<Proxy>>,
    check_url: String,
}

impl ProxyPool {
    /// Creates an empty pool. Every `get` returns `None`.
    pub fn new() -> Self {
        Self {
            proxies: Vec::new(),
            check_url: DEFAULT_CHECK_URL.to_string(),
        }
    }

    /// Creates a proxy pool with static proxies.
    pub fn with_proxies(proxies: Vec<Proxy>) -> Self {
        Self {
            proxies: proxies.into_iter().map(Arc::new).collect(),
            ..Self::new()
        }
    }

    /// Sets the URL used by liveness probes.
    pub fn with_check_url(mut self, url: impl Into<String>) -> Self {
        self.check_url = url.into();
        self
    }

    /// Fills a pool from a provider. Provider failures leave the pool empty.
    pub async fn from_provider(provider: &dyn ProxyProvider) -> Self {
        match provider.fetch_proxies().await {
            Ok(proxies) => {
                info!(count = proxies.len(), "Loaded proxy pool");
                Self::with_proxies(proxies)
            }
            Err(e) => {
                warn!(error = %e, "Failed to load proxies, using direct connections");
                Self::new()
            }
        }
    }

    /// Builds the pool described by the `[proxy]` settings.
    ///
    /// Never fails: missing sources and load errors are logged and yield an
    /// empty pool.
    pub async fn load(settings: &ProxySettings) -> Self {
        let pool = match settings.source {
            None => {
                debug!("No proxy source configured, using direct connections");
                Self::new()
            }
            Some(ProxySource::File) => match settings.path.as_ref() {
                Some(path) => Self::from_provider(&FileProxyProvider::new(path)).await,
                None => {
                    warn!("Proxy source is 'file' but no path is set");
                    Self::new()
                }
            },
            Some(ProxySource::Api) => match settings.url.as_ref() {
                Some(url) => {
                    let provider = ApiProxyProvider::new(url, settings.api_key.clone());
                    Self::from_provider(&provider).await
                }
                None => {
                    warn!("Proxy source is 'api' but no url is set");
                    Self::new()
                }
            },
        };

        let pool = match settings.check_url.as_ref() {
            Some(url) => pool.with_check_url(url),
            None => pool,
        };

        if settings.validate && !pool.is_empty() {
            pool.validated().await
        } else {
            pool
        }
    }

    /// Returns the number of proxies in the pool.
    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    /// Returns whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    /// Returns the pooled descriptors.
    pub fn proxies(&self) -> &[Arc<Proxy>] {
        &self.proxies
    }

    /// Picks a uniformly random proxy, or `None` when the pool is empty.
    pub fn get(&self) -> Option<Arc<Proxy>> {
        self.proxies.choose(&mut rand::thread_rng()).cloned()
    }

    /// Returns whether `proxy` can fetch the check URL with a 2xx status.
    pub async fn check(&self, proxy: &Proxy) -> bool {
        self.probe(proxy).await.is_some()
    }

    /// Like [`check`](Self::check), returning a descriptor with the
    /// measured latency when the proxy is alive.
    pub async fn probe(&self, proxy: &Proxy) -> Option<Proxy> {
        let client = match build_client(crate::user_agent::random_user_agent(), CHECK_TIMEOUT, Some(proxy)) {
            Ok(client) => client,
            Err(e) => {
                debug!(proxy = %proxy, error = %e, "Proxy check could not build client");
                return None;
            }
        };

        let start = Instant::now();
        match client.get(&self.check_url).send().await {
            Ok(response) if response.status().is_success() => {
                let latency = start.elapsed();
                debug!(proxy = %proxy, latency_ms = latency.as_millis() as u64, "Proxy alive");
                Some(proxy.clone().with_measured_latency(latency))
            }
            Ok(response) => {
                debug!(proxy = %proxy, status = %response.status(), "Proxy check failed");
                None
            }
            Err(e) => {
                debug!(proxy = %proxy, error = %e, "Proxy check failed");
                None
            }
        }
    }

    /// Probes every proxy once and keeps the live ones, latency recorded.
    ///
    /// At most 32 probes run at a time; pool order is preserved.
    pub async fn validated(self) -> Self {
        let total = self.proxies.len();
        let alive: Vec<Arc<Proxy>> = stream::iter(self.proxies.iter())
            .map(|proxy| self.probe(proxy))
            .buffered(VALIDATE_CONCURRENCY)
            .filter_map(|probed| async move { probed.map(Arc::new) })
            .collect()
            .await;
        info!(alive = alive.len(), total, "Validated proxy pool");
        Self {
            proxies: alive,
            check_url: self.check_url,
        }
    }
}

impl Default for ProxyPool {
    fn default() -> Self {
        Self::new()
    }
}

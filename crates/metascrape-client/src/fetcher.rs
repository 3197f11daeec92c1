use std::error::Error as _;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use metascrape_core::error::AppError;
use metascrape_core::models::{FetchedDocument, HeaderValues, ProbeResult};
use metascrape_core::traits::Fetcher;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::header::HeaderMap;
use reqwest::redirect::Policy;
use reqwest::{Client, Method};
use url::Url;

/// Redirect hops followed before giving up.
const MAX_REDIRECTS: usize = 10;

/// HTTP method used for the availability probe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProbeMethod {
    #[default]
    Options,
    Head,
}

impl ProbeMethod {
    fn as_method(self) -> Method {
        match self {
            ProbeMethod::Options => Method::OPTIONS,
            ProbeMethod::Head => Method::HEAD,
        }
    }
}

impl FromStr for ProbeMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "options" => Ok(ProbeMethod::Options),
            "head" => Ok(ProbeMethod::Head),
            other => Err(format!(
                "Unknown probe method '{other}' (expected 'options' or 'head')"
            )),
        }
    }
}

impl fmt::Display for ProbeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_method().as_str())
    }
}

/// HTTP fetcher using reqwest.
///
/// Probes the target with a body-less request, then downloads headers and
/// body with a GET. Non-2xx responses are not errors: the status is reported
/// and the body is used as served.
/// By default, SSRF protection is **enabled**: requests to private/reserved
/// IP ranges are blocked, including hops reached through redirects and names
/// that resolve differently on the second lookup. Use
/// [`allow_private_urls`](Self::allow_private_urls) to disable this (e.g., for
/// CLI usage where the user controls the machine).
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
    timeout: Duration,
    ssrf_protection: bool,
    probe_method: ProbeMethod,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        Ok(Self {
            client: build_client(timeout, true)?,
            timeout,
            ssrf_protection: true,
            probe_method: ProbeMethod::default(),
        })
    }

    /// Disable SSRF protection, allowing requests to private/reserved IPs.
    ///
    /// Only use this for CLI usage where the user controls the machine.
    pub fn allow_private_urls(mut self) -> Result<Self, AppError> {
        self.client = build_client(self.timeout, false)?;
        self.ssrf_protection = false;
        Ok(self)
    }

    pub fn with_probe_method(mut self, method: ProbeMethod) -> Self {
        self.probe_method = method;
        self
    }

    fn classify(&self, e: reqwest::Error) -> AppError {
        if e.is_timeout() {
            AppError::Timeout(self.timeout.as_secs())
        } else if e.is_redirect() {
            let reason = e.source().map(ToString::to_string).unwrap_or_default();
            AppError::HttpError(format!("Redirect refused: {reason}"))
        } else if e.is_connect() {
            AppError::NetworkError(format!("Connection failed: {e}"))
        } else {
            AppError::HttpError(e.to_string())
        }
    }
}

impl Fetcher for ReqwestFetcher {
    async fn probe(&self, url: &str) -> Result<ProbeResult, AppError> {
        if self.ssrf_protection {
            validate_url(url).await?;
        }

        let response = self
            .client
            .request(self.probe_method.as_method(), url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        tracing::debug!(%url, method = %self.probe_method, status = status.as_u16(), "Probed target");

        Ok(ProbeResult {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
        })
    }

    async fn fetch(&self, url: &str) -> Result<FetchedDocument, AppError> {
        if self.ssrf_protection {
            validate_url(url).await?;
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let headers = collect_headers(response.headers());
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(%url, error = %e, "Failed to read response body");
                String::new()
            }
        };

        Ok(FetchedDocument { headers, body })
    }
}

fn build_client(timeout: Duration, ssrf_protection: bool) -> Result<Client, AppError> {
    let builder = Client::builder()
        .user_agent(concat!("metascrape/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout);

    let builder = if ssrf_protection {
        builder
            .redirect(guarded_redirects())
            .dns_resolver(PublicOnlyResolver)
    } else {
        builder.redirect(Policy::limited(MAX_REDIRECTS))
    };

    builder
        .build()
        .map_err(|e| AppError::HttpError(e.to_string()))
}

/// Group header values by name, keeping repeated headers in arrival order.
fn collect_headers(headers: &HeaderMap) -> HeaderValues {
    let mut collected = HeaderValues::new();
    for (name, value) in headers {
        collected
            .entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    collected
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Validate a URL to prevent server-side request forgery (SSRF).
///
/// 1. Only allow `http` and `https` schemes.
/// 2. Resolve the hostname via DNS.
/// 3. Reject if any resolved IP is private/reserved.
async fn validate_url(url: &str) -> Result<(), AppError> {
    let parsed = Url::parse(url).map_err(|e| AppError::HttpError(format!("Invalid URL: {e}")))?;

    let Some(host) = check_literal_target(&parsed)? else {
        return Ok(());
    };

    let port = parsed.port_or_known_default().unwrap_or(80);
    let addrs: Vec<_> = tokio::net::lookup_host((host.as_str(), port))
        .await
        .map_err(|e| AppError::NetworkError(format!("DNS resolution failed for {host}: {e}")))?
        .collect();

    if addrs.is_empty() {
        return Err(AppError::NetworkError(format!(
            "DNS resolution returned no addresses for {host}"
        )));
    }

    for socket_addr in &addrs {
        check_ip(socket_addr.ip(), &host)?;
    }

    Ok(())
}

/// Check the scheme and, for IP-literal hosts, the address itself.
///
/// Returns the domain name when the host still needs resolving.
fn check_literal_target(parsed: &Url) -> Result<Option<String>, AppError> {
    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(AppError::HttpError(format!(
                "URL scheme '{scheme}' is not allowed (only http/https)"
            )));
        }
    }

    match parsed.host() {
        Some(url::Host::Domain(domain)) => Ok(Some(domain.to_string())),
        Some(url::Host::Ipv4(ip)) => check_ip(IpAddr::V4(ip), parsed.as_str()).map(|()| None),
        Some(url::Host::Ipv6(ip)) => check_ip(IpAddr::V6(ip), parsed.as_str()).map(|()| None),
        None => Err(AppError::HttpError("URL has no host".to_string())),
    }
}

/// Redirect policy for guarded clients.
///
/// IP-literal hops are checked here since they never reach the resolver.
/// Named hops are checked by [`PublicOnlyResolver`] when reqwest connects.
fn guarded_redirects() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }
        let verdict = check_literal_target(attempt.url());
        match verdict {
            Ok(_) => attempt.follow(),
            Err(e) => attempt.error(e.to_string()),
        }
    })
}

/// DNS resolver that refuses names resolving to private/reserved addresses.
///
/// The addresses it checks are the ones reqwest connects to, so a name that
/// answers differently between [`validate_url`] and the request is caught.
#[derive(Debug, Clone, Copy)]
struct PublicOnlyResolver;

impl Resolve for PublicOnlyResolver {
    fn resolve(&self, name: Name) -> Resolving {
        Box::pin(resolve_public(name.as_str().to_string()))
    }
}

async fn resolve_public(host: String) -> Result<Addrs, Box<dyn std::error::Error + Send + Sync>> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host.as_str(), 0))
        .await?
        .collect();

    for addr in &addrs {
        check_ip(addr.ip(), &host)?;
    }

    Ok(Box::new(addrs.into_iter()))
}

fn check_ip(ip: IpAddr, target: &str) -> Result<(), AppError> {
    if is_private_ip(ip) {
        return Err(AppError::HttpError(format!(
            "SSRF blocked: {target} resolves to private/reserved IP {ip}"
        )));
    }
    Ok(())
}

/// Check if an IP address is in a private/reserved/link-local range.
fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local() // 169.254.0.0/16 (cloud metadata)
                || v4.is_unspecified()
                || v4.is_broadcast()
                || v4.is_documentation()
                || v4.is_multicast()
                || v4.octets()[0] == 0 // 0.0.0.0/8
                || v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64 // 100.64.0.0/10 (CGN)
                || v4.octets()[0] == 198 && (v4.octets()[1] & 0xFE) == 18 // 198.18.0.0/15 (benchmarking)
                || v4.octets()[0] >= 240 // 240.0.0.0/4 (reserved)
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                || v6.is_multicast()
                || v6.segments()[..6] == [0x64, 0xFF9B, 0, 0, 0, 0] // 64:ff9b::/96 (NAT64)
                || (v6.segments()[0] & 0xFFC0) == 0xFE80 // fe80::/10
                || (v6.segments()[0] & 0xFE00) == 0xFC00 // fc00::/7
                || match v6.to_ipv4_mapped() {
                    Some(v4) => is_private_ip(IpAddr::V4(v4)),
                    None => false,
                }
        }
    }
}

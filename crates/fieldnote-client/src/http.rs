use std::sync::Arc;
use std::time::Instant;

use fieldnote_config::{AuthMode, Config, ConfigStore};
use fieldnote_telemetry::Logger;
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use secrecy::ExposeSecret;
use serde_json::{Value, json};
use url::Url;

use crate::body::{BODY_SAMPLE_LIMIT, RequestBody, ResponseBody, truncate};
use crate::error::{ClientError, Result};

/// Placeholder written into logged URLs in place of the key
const REDACTED: &str = "[redacted]";

const CORS_HINT: &str = "the API appears to reject the cross-origin preflight; allow this origin and the auth header in the server's CORS policy";
const CONNECT_HINT: &str = "could not connect; check api_base_url and network connectivity";
const TIMEOUT_HINT: &str = "the request timed out; the API may be overloaded or unreachable";

/// A request relative to the configured base URL
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: RequestBody,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    #[must_use]
    pub fn json(self, value: Value) -> Self {
        self.body(RequestBody::Json(value))
    }

    pub const fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Authenticated transport with paired request/response logging
///
/// Every call made through [`HttpClient::send`] leaves exactly two entries
/// in the [`Logger`]: the outbound request, then either the response or the
/// transport error.
#[derive(Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    config: Arc<ConfigStore>,
    logger: Logger,
}

impl HttpClient {
    /// Create a transport reading settings from `config` on every call
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built
    pub fn new(config: Arc<ConfigStore>, logger: Logger) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ClientError::InvalidRequest(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config, logger })
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn config(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    /// Send a request and decode the response
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] before anything is sent when settings
    /// are incomplete, [`ClientError::Network`] when no response arrives and
    /// [`ClientError::Http`] for a non-2xx status
    pub async fn send(&self, request: ApiRequest) -> Result<ResponseBody> {
        let config = self.config.get()?;
        config.validate()?;

        let ApiRequest {
            method,
            path,
            mut headers,
            body,
        } = request;

        let target = Target::resolve(&config, &path)?;
        apply_header_auth(&config, &mut headers)?;

        if matches!(body, RequestBody::Multipart(_)) && headers.remove(CONTENT_TYPE).is_some() {
            tracing::debug!("dropped explicit content-type from multipart request");
        }

        self.logger.info(
            format!("request {method} {}", target.display),
            Some(json!({
                "method": method.as_str(),
                "url": target.display,
                "headers": header_names(&config, &headers),
                "body": body.summary(),
            })),
        );

        let mut builder = self.http.request(method.clone(), target.url.clone()).headers(headers);
        builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(payload) => match payload.into_form() {
                Ok(form) => builder.multipart(form),
                Err(e) => {
                    self.log_failure(&method, &target.display, 0, &e.to_string(), None);
                    return Err(e);
                }
            },
        };

        let started = Instant::now();
        let response = match builder.send().await {
            Ok(response) => response,
            Err(source) => {
                let hint = network_hint(&source);
                self.log_failure(&method, &target.display, elapsed_ms(started), &source.to_string(), hint);
                return Err(ClientError::Network {
                    url: target.display,
                    hint,
                    source,
                });
            }
        };

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(source) => {
                let hint = network_hint(&source);
                self.log_failure(&method, &target.display, elapsed_ms(started), &source.to_string(), hint);
                return Err(ClientError::Network {
                    url: target.display,
                    hint,
                    source,
                });
            }
        };

        let duration_ms = elapsed_ms(started);
        let decoded = ResponseBody::decode(content_type.as_deref(), bytes.clone());
        let sample = match &decoded {
            Ok(body) => body.sample(),
            Err(_) => truncate(&String::from_utf8_lossy(&bytes), BODY_SAMPLE_LIMIT),
        };

        let extra = json!({
            "status": status.as_u16(),
            "duration_ms": duration_ms,
            "body": sample,
        });
        let message = format!("response {} {method} {} ({duration_ms} ms)", status.as_u16(), target.display);

        if status.is_success() {
            self.logger.info(message, Some(extra));
            decoded
        } else {
            self.logger.error(message, Some(extra));
            Err(ClientError::Http {
                status: status.as_u16(),
                body: truncate(&String::from_utf8_lossy(&bytes), BODY_SAMPLE_LIMIT),
            })
        }
    }

    fn log_failure(&self, method: &Method, url: &str, duration_ms: u64, error: &str, hint: Option<&str>) {
        self.logger.error(
            format!("request {method} {url} failed: {error}"),
            Some(json!({
                "duration_ms": duration_ms,
                "error": error,
                "hint": hint,
            })),
        );
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config.path())
            .finish_non_exhaustive()
    }
}

/// Resolved request URL plus its loggable form
struct Target {
    url: Url,
    display: String,
}

impl Target {
    fn resolve(config: &Config, path: &str) -> Result<Self> {
        let mut url = join_url(&config.base_url()?, path)?;

        if config.auth_mode != AuthMode::Query {
            let display = url.to_string();
            return Ok(Self { url, display });
        }

        let mut redacted = url.clone();
        redacted
            .query_pairs_mut()
            .append_pair(&config.auth_query_param, REDACTED);
        url.query_pairs_mut()
            .append_pair(&config.auth_query_param, config.api_key.expose_secret());

        Ok(Self {
            url,
            display: redacted.to_string(),
        })
    }
}

/// Join a base URL and a path with exactly one slash between them
pub fn join_url(base: &Url, path: &str) -> Result<Url> {
    let base = base.as_str().trim_end_matches('/');
    let path = path.trim_start_matches('/');
    let joined = if path.is_empty() {
        base.to_owned()
    } else {
        format!("{base}/{path}")
    };

    Url::parse(&joined).map_err(|e| ClientError::InvalidRequest(format!("invalid URL '{joined}': {e}")))
}

fn apply_header_auth(config: &Config, headers: &mut HeaderMap) -> Result<()> {
    let key = config.api_key.expose_secret();

    match config.auth_mode {
        AuthMode::Header => {
            let name = HeaderName::from_bytes(config.auth_header.trim().as_bytes()).map_err(|e| {
                ClientError::InvalidRequest(format!("invalid auth header name '{}': {e}", config.auth_header))
            })?;
            let mut value = HeaderValue::from_str(key)
                .map_err(|_| ClientError::InvalidRequest("API key is not a valid header value".to_owned()))?;
            value.set_sensitive(true);
            headers.insert(name, value);
        }
        AuthMode::Bearer => {
            let mut value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|_| ClientError::InvalidRequest("API key is not a valid header value".to_owned()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        AuthMode::Query => {}
    }

    Ok(())
}

/// Header names for the request log; query auth shows as `?<param>`
fn header_names(config: &Config, headers: &HeaderMap) -> Vec<String> {
    let mut names: Vec<String> = headers.keys().map(|name| name.as_str().to_owned()).collect();
    if config.auth_mode == AuthMode::Query {
        names.push(format!("?{}", config.auth_query_param));
    }
    names
}

/// Remediation hint for a transport failure
fn network_hint(error: &reqwest::Error) -> Option<&'static str> {
    let mut chain = String::new();
    let mut current: Option<&dyn std::error::Error> = Some(error);
    while let Some(e) = current {
        chain.push_str(&e.to_string());
        chain.push(' ');
        current = e.source();
    }

    classify_failure(&chain, error.is_timeout(), error.is_connect())
}

/// Pick a hint from the rendered error chain; cross-origin wording wins
fn classify_failure(chain: &str, timeout: bool, connect: bool) -> Option<&'static str> {
    let chain = chain.to_ascii_lowercase();

    if ["cors", "preflight", "access-control"].iter().any(|needle| chain.contains(needle)) {
        Some(CORS_HINT)
    } else if timeout {
        Some(TIMEOUT_HINT)
    } else if connect {
        Some(CONNECT_HINT)
    } else {
        None
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

//! The root client: configuration, request building and response parsing.
//!
//! # Design
//! `Client` holds only immutable configuration (base URL, default headers)
//! and the [`Transport`], behind an `Arc`, so clones are cheap and every
//! service can carry its own. Each call is split the same way: build an
//! [`HttpRequest`], send it through the transport raced against the caller's
//! [`Context`], then parse the [`HttpResponse`] against the status the
//! operation expects. No per-call state lives on the client.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn, Span};
use url::Url;

use crate::context::Context;
use crate::error::{ApiError, RemoteError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::posts::PostsService;
use crate::response::{ApiResponse, ResponseMeta};
use crate::service::{Resource, Service};
use crate::taxonomies::TaxonomiesService;
use crate::terms::TermsService;
use crate::transport::{ReqwestTransport, Transport};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_USER_AGENT: &str = concat!("wordpress-core/", env!("CARGO_PKG_VERSION"));

/// Client settings read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub base_url: String,
    pub credentials: Option<(String, String)>,
    pub timeout: Option<Duration>,
}

impl Config {
    pub const URL_VAR: &'static str = "WORDPRESS_API_URL";
    pub const USER_VAR: &'static str = "WORDPRESS_USER";
    pub const PASSWORD_VAR: &'static str = "WORDPRESS_PASSWORD";
    pub const TIMEOUT_VAR: &'static str = "WORDPRESS_TIMEOUT_SECS";

    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`, which returns `None` for unset keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let base_url = lookup(Self::URL_VAR)
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ApiError::Config(format!("{} is not set", Self::URL_VAR)))?;

        let credentials = match (lookup(Self::USER_VAR), lookup(Self::PASSWORD_VAR)) {
            (Some(user), Some(password)) => Some((user, password)),
            (None, None) => None,
            _ => {
                return Err(ApiError::Config(format!(
                    "{} and {} must be set together",
                    Self::USER_VAR,
                    Self::PASSWORD_VAR
                )))
            }
        };

        let timeout = lookup(Self::TIMEOUT_VAR)
            .map(|secs| {
                secs.trim().parse::<u64>().map(Duration::from_secs).map_err(|_| {
                    ApiError::Config(format!("{} must be whole seconds, got {secs:?}", Self::TIMEOUT_VAR))
                })
            })
            .transpose()?;

        Ok(Self {
            base_url,
            credentials,
            timeout,
        })
    }
}

/// Builder for configuring a [`Client`].
pub struct ClientBuilder {
    base_url: String,
    timeout: Duration,
    user_agent: String,
    headers: Vec<(String, String)>,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            headers: Vec::new(),
            transport: None,
        }
    }

    /// Per-request timeout of the default transport.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// HTTP basic authentication, e.g. a user and an application password.
    pub fn basic_auth(self, user: &str, password: &str) -> Self {
        let token = STANDARD.encode(format!("{user}:{password}"));
        self.header("authorization", format!("Basic {token}"))
    }

    /// Adds a header sent with every request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Replaces the default reqwest transport.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<Client, ApiError> {
        let parsed = Url::parse(&self.base_url)
            .map_err(|e| ApiError::Config(format!("invalid base URL {:?}: {e}", self.base_url)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::Config(format!(
                "base URL must be http or https, got {:?}",
                parsed.scheme()
            )));
        }
        if parsed.query().is_some() {
            return Err(ApiError::Config("base URL must not carry a query string".to_string()));
        }

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(self.timeout)?),
        };

        let mut headers = vec![
            ("user-agent".to_string(), self.user_agent),
            ("accept".to_string(), "application/json".to_string()),
        ];
        headers.extend(self.headers);

        Ok(Client {
            inner: Arc::new(ClientInner {
                base_url: self.base_url.trim_end_matches('/').to_string(),
                headers,
                transport,
            }),
        })
    }
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("custom_transport", &self.transport.is_some())
            .finish_non_exhaustive()
    }
}

/// Entry point to the API.
///
/// Top-level services ([`Client::posts`], [`Client::terms`],
/// [`Client::taxonomies`]) are the only way into the nested accessors.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    base_url: String,
    headers: Vec<(String, String)>,
    transport: Arc<dyn Transport>,
}

impl Client {
    pub fn builder(base_url: &str) -> ClientBuilder {
        ClientBuilder::new(base_url)
    }

    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::builder(base_url).build()
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let mut builder = Self::builder(&config.base_url);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some((user, password)) = &config.credentials {
            builder = builder.basic_auth(user, password);
        }
        builder.build()
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn posts(&self) -> PostsService {
        PostsService::new(self.clone())
    }

    pub fn terms(&self) -> TermsService {
        TermsService::new(self.clone())
    }

    pub fn taxonomies(&self) -> TaxonomiesService {
        TaxonomiesService::new(self.clone())
    }

    /// A service over an arbitrary collection path, relative to the base URL.
    pub fn service<T: Resource>(&self, path: &str) -> Service<T> {
        Service::new(self.clone(), path)
    }

    pub(crate) fn same_as(&self, other: &Client) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        query: &str,
        body: Option<String>,
    ) -> HttpRequest {
        let mut url = format!("{}/{}", self.inner.base_url, path.trim_matches('/'));
        if !query.is_empty() {
            url.push('?');
            url.push_str(query);
        }

        let mut headers = self.inner.headers.clone();
        if body.is_some() {
            headers.push(("content-type".to_string(), "application/json".to_string()));
        }

        HttpRequest {
            method,
            url,
            headers,
            body,
        }
    }

    /// Sends `request`, giving up as soon as `ctx` ends.
    #[instrument(
        name = "wp_request",
        skip_all,
        fields(
            http.method = %request.method,
            http.url = %request.url,
            http.status_code = tracing::field::Empty,
        )
    )]
    pub(crate) async fn execute(
        &self,
        ctx: &Context,
        request: HttpRequest,
    ) -> Result<HttpResponse, ApiError> {
        if let Some(err) = ctx.err() {
            debug!(error = %err, "context already ended, not sending");
            return Err(err);
        }

        let started = Instant::now();
        debug!("sending request");
        let result = tokio::select! {
            biased;
            err = ctx.done() => Err(err),
            response = self.inner.transport.send(request) => response,
        };

        match &result {
            Ok(response) => {
                Span::current().record("http.status_code", response.status);
                debug!(
                    status = response.status,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "received response"
                );
            }
            Err(err) if err.is_context_error() => warn!(error = %err, "request abandoned"),
            Err(err) => warn!(error = %err, "request failed"),
        }
        result
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

/// Map a response to a decoded value or the matching `ApiError` variant.
///
/// Any 2xx status decodes; whether it was the `expected` one is left in the
/// returned metadata.
pub(crate) fn parse_response<T: DeserializeOwned>(
    response: HttpResponse,
    expected: u16,
) -> Result<ApiResponse<T>, ApiError> {
    let meta = ResponseMeta::new(response.status, expected, response.headers);

    if meta.is_success() {
        if !meta.is_expected() {
            warn!(status = meta.status, expected, "unexpected success status");
        }
        return match serde_json::from_str(&response.body) {
            Ok(value) => Ok(ApiResponse { value, meta }),
            Err(source) => Err(ApiError::Decode { meta, source }),
        };
    }

    let remote = RemoteError::parse(&response.body);
    if meta.status == 404 {
        return Err(ApiError::NotFound { meta, remote });
    }
    Err(ApiError::Status {
        meta,
        remote,
        body: response.body,
    })
}

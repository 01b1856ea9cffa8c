//! HTTP client for the Alpha Vantage query endpoint.

use crate::{ApiError, Function, Params, Result};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// The single query endpoint all functions are served from.
pub const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";

/// Per-request timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Names the client sets itself; callers may not supply them.
const RESERVED_PARAMS: [&str; 2] = ["function", "apikey"];

/// Trait for quote/indicator sources.
///
/// This is the seam between the tool catalog and the network, so the
/// catalog can be exercised against an in-memory source.
pub trait QuoteApi: Send + Sync {
    /// Invoke an upstream function and return its JSON body unmodified.
    fn invoke(
        &self,
        function: Function,
        params: &Params,
    ) -> impl Future<Output = Result<Value>> + Send;
}

/// Authenticated client for the data API.
///
/// The API key is owned by the client instance, so concurrent queries with
/// different keys never observe each other's credentials.
#[derive(Clone)]
pub struct AlphaVantageClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl AlphaVantageClient {
    /// Create a client for the public endpoint.
    ///
    /// A `None` or blank key is accepted here; every call then fails with
    /// [`ApiError::MissingKey`] instead.
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Point the client at a different endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.trim().is_empty())
    }

    fn transport_error(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            return ApiError::Timeout(self.timeout);
        }
        // The request URL carries the key as a query parameter.
        ApiError::Transport(err.without_url().to_string())
    }
}

impl std::fmt::Debug for AlphaVantageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlphaVantageClient")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl QuoteApi for AlphaVantageClient {
    async fn invoke(&self, function: Function, params: &Params) -> Result<Value> {
        let Some(api_key) = self.api_key() else {
            return Err(ApiError::MissingKey);
        };

        if let Some(name) = RESERVED_PARAMS.into_iter().find(|name| params.contains(name)) {
            return Err(ApiError::InvalidParameter {
                name: name.to_string(),
                reason: "set by the client".into(),
            });
        }

        let mut query: Vec<(&str, String)> = Vec::with_capacity(params.len() + 2);
        query.push(("function", function.code().to_string()));
        query.extend(params.iter().map(|(name, value)| (name, value.to_string())));
        query.push(("apikey", api_key.to_string()));

        debug!(%function, params = params.len(), "calling data API");

        let response = self
            .http
            .get(&self.base_url)
            .query(&query)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(%function, status = status.as_u16(), "data API returned an error status");
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ApiError::InvalidBody(e.without_url().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fx_params() -> Params {
        let mut params = Params::new();
        params.insert("from_symbol", "EUR");
        params.insert("to_symbol", "USD");
        params
    }

    fn client_for(server: &MockServer, key: Option<&str>) -> AlphaVantageClient {
        AlphaVantageClient::new(key.map(str::to_string))
            .with_base_url(format!("{}/query", server.uri()))
    }

    #[tokio::test]
    async fn forwards_function_params_and_key() {
        let server = MockServer::start().await;
        let body = json!({"Meta Data": {"2. From Symbol": "EUR"}, "Time Series FX (Daily)": {}});
        Mock::given(method("GET"))
            .and(path("/query"))
            .and(query_param("function", "FX_DAILY"))
            .and(query_param("from_symbol", "EUR"))
            .and(query_param("to_symbol", "USD"))
            .and(query_param("apikey", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("test-key"));
        let result = client.invoke(Function::FxDaily, &fx_params()).await.unwrap();
        assert_eq!(result, body);
    }

    #[tokio::test]
    async fn missing_key_fails_without_request() {
        let server = MockServer::start().await;
        let client = client_for(&server, None);

        for _ in 0..3 {
            let err = client.invoke(Function::FxDaily, &fx_params()).await.unwrap_err();
            assert_eq!(err, ApiError::MissingKey);
            assert_eq!(err.to_string(), "Alpha Vantage API Key not set.");
        }

        let blank = client_for(&server, Some("  "));
        assert_eq!(
            blank.invoke(Function::Sma, &Params::new()).await.unwrap_err(),
            ApiError::MissingKey
        );
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn error_status_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream busy"))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("test-key"));
        let err = client.invoke(Function::Rsi, &Params::new()).await.unwrap_err();
        assert_eq!(
            err,
            ApiError::Status {
                status: 503,
                body: "upstream busy".into()
            }
        );
        assert!(err.to_string().starts_with("503"));
    }

    #[tokio::test]
    async fn non_json_body_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("test-key"));
        let err = client.invoke(Function::Ema, &Params::new()).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidBody(_)));
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, Some("test-key"))
            .with_timeout(Duration::from_millis(50));
        let err = client.invoke(Function::Adx, &Params::new()).await.unwrap_err();
        assert_eq!(err, ApiError::Timeout(Duration::from_millis(50)));
    }

    #[tokio::test]
    async fn caller_cannot_supply_reserved_params() {
        let server = MockServer::start().await;
        let client = client_for(&server, Some("test-key"));

        let mut params = fx_params();
        params.insert("apikey", "other-key");
        let err = client.invoke(Function::FxDaily, &params).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidParameter { ref name, .. } if name == "apikey"));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[test]
    fn debug_output_redacts_key() {
        let client = AlphaVantageClient::new(Some("secret-key".into()));
        let debug = format!("{client:?}");
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("<redacted>"));
    }
}

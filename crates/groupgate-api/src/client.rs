//! Asynchronous directory API searcher.

use crate::models::SearchEnvelope;
use crate::Result;
use async_trait::async_trait;
use groupgate_core::client::{load_ca_bundle, ClientConfig};
use groupgate_core::config::ApiConfig;
use groupgate_core::error::{StatusError, StatusResult, TRANSPORT_FAILURE_STATUS};
use groupgate_core::{Backend, DirectorySearcher, Error, SearchFilter, SearchResponse};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, ClientBuilder, StatusCode};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

const USER_AGENT: &str = concat!("groupgate-api/", env!("CARGO_PKG_VERSION"));

/// Builder for [`ApiSearcher`].
#[derive(Debug)]
pub struct ApiSearcherBuilder {
    config: ApiConfig,
    http_config: ClientConfig,
}

impl ApiSearcherBuilder {
    /// Create a new builder from an [`ApiConfig`].
    #[must_use]
    pub fn new(config: ApiConfig) -> Self {
        let http_config = ClientConfig::new().with_timeout(config.timeout());
        Self {
            config,
            http_config,
        }
    }

    /// Override the HTTP client configuration used when building the searcher.
    #[must_use]
    pub fn with_http_config(mut self, http_config: ClientConfig) -> Self {
        self.http_config = http_config;
        self
    }

    /// Finalise the builder and create the [`ApiSearcher`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the URL is invalid, the CA bundle cannot be loaded,
    /// or the HTTP client cannot be built.
    pub fn build(self) -> Result<ApiSearcher> {
        let url = self.config.parse_url()?;

        let mut builder = ClientBuilder::new()
            .user_agent(USER_AGENT)
            .timeout(self.http_config.timeout)
            .connect_timeout(self.http_config.connect_timeout);

        if let Some(bundle) = &self.config.tls_ca_cert {
            for certificate in load_ca_bundle(bundle)? {
                builder = builder.add_root_certificate(certificate);
            }
        }

        let http = builder.build().map_err(|err| {
            Error::ConfigError(format!("Failed to build directory API HTTP client: {err}"))
        })?;

        Ok(ApiSearcher {
            http,
            url,
            config: Arc::new(self.config),
            log_requests: self.http_config.enable_logging,
        })
    }
}

/// Searches the directory through its HTTP API.
///
/// Every request is a single POST; failures are never retried.
#[derive(Clone)]
pub struct ApiSearcher {
    http: Client,
    url: Url,
    config: Arc<ApiConfig>,
    log_requests: bool,
}

impl ApiSearcher {
    /// Construct a searcher directly from the configuration.
    ///
    /// # Errors
    ///
    /// See [`ApiSearcherBuilder::build`].
    pub fn from_config(config: ApiConfig) -> Result<Self> {
        ApiSearcherBuilder::new(config).build()
    }

    /// Start a builder pre-populated with the provided configuration.
    #[must_use]
    pub fn builder(config: ApiConfig) -> ApiSearcherBuilder {
        ApiSearcherBuilder::new(config)
    }

    /// The search endpoint.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn post_search(&self, request: &SearchFilter) -> StatusResult<SearchResponse> {
        if self.log_requests {
            info!(url = %self.url, filter = %request.filter(), "Sending directory API search");
        }

        let response = self
            .http
            .post(self.url.clone())
            .header(AUTHORIZATION, self.config.basic_auth.header_value())
            .header(CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await
            .map_err(|err| {
                warn!(url = %self.url, error = %err, "Directory API request failed");
                StatusError::new(TRANSPORT_FAILURE_STATUS, Error::from(err))
            })?;

        let status = response.status();
        let code = status.as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|err| StatusError::new(code, Error::from(err)))?;

        if !status.is_success() {
            warn!(url = %self.url, status = code, "Directory API returned an error status");
            return Err(StatusError::new(code, status_error(status, &body)));
        }

        let envelope: SearchEnvelope = serde_json::from_slice(&body).map_err(|err| {
            StatusError::new(
                code,
                Error::DecodeError(format!("Failed to parse directory API response: {err}")),
            )
        })?;

        debug!(status = code, count = envelope.message.len(), "Directory API search complete");
        Ok(SearchResponse::new(envelope.into_records(), code))
    }
}

#[async_trait]
impl DirectorySearcher for ApiSearcher {
    fn backend(&self) -> Backend {
        Backend::Api
    }

    async fn search(&self, subject_id: &str) -> StatusResult<SearchResponse> {
        let request = SearchFilter::api(subject_id, self.config.base_dn.as_str());
        self.post_search(&request).await
    }
}

fn status_error(status: StatusCode, body: &[u8]) -> Error {
    let detail = String::from_utf8_lossy(body).trim().to_string();
    match status {
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            Error::ServiceUnavailable(format!("directory API unavailable ({status}): {detail}"))
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::HttpStatus {
            status: status.as_u16(),
            message: format!("credentials rejected: {detail}"),
        },
        _ => Error::HttpStatus {
            status: status.as_u16(),
            message: detail,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groupgate_core::credentials::BasicAuth;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TOKEN: &str = "dXNlcjpwYXNz";

    fn test_config(server: &MockServer) -> ApiConfig {
        ApiConfig::new(format!("{}/search", server.uri()), BasicAuth::new(TOKEN)).unwrap()
    }

    fn record_body() -> serde_json::Value {
        serde_json::json!({
            "message": [{
                "dn": "CN=John Doe,OU=People,DC=a,DC=com",
                "controls": [],
                "cn": "John Doe",
                "sAMAccountName": "jdoe",
                "mail": "jdoe@a.com",
                "memberOf": ["CN=some_user_group,OU=Groups,DC=a,DC=com"]
            }]
        })
    }

    #[tokio::test]
    async fn test_search_sends_expected_request() {
        let server = MockServer::start().await;
        let expected_body = serde_json::json!({
            "filter": "(&(objectClass=person)(objectClass=user)(userAccountControl=512)(sAMAccountName=jdoe)(!(objectClass=computer)))",
            "attributes": ["dn", "cn", "sAMAccountName", "mail", "memberOf"],
            "sizeLimit": 0,
            "dn": "DC=a,DC=com"
        });

        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header("Authorization", "Basic dXNlcjpwYXNz"))
            .and(header("Content-Type", "application/json"))
            .and(body_json(expected_body))
            .respond_with(ResponseTemplate::new(200).set_body_json(record_body()))
            .expect(1)
            .mount(&server)
            .await;

        let searcher = ApiSearcher::from_config(test_config(&server)).unwrap();
        let response = searcher.search("jdoe").await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.records.len(), 1);
        assert_eq!(response.records[0].mail, "jdoe@a.com");
        assert_eq!(searcher.backend(), Backend::Api);
    }

    #[tokio::test]
    async fn test_search_uses_configured_base_dn() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/search"))
            .and(body_json(serde_json::json!({
                "filter": "(&(objectClass=person)(objectClass=user)(userAccountControl=512)(sAMAccountName=jdoe)(!(objectClass=computer)))",
                "attributes": ["dn", "cn", "sAMAccountName", "mail", "memberOf"],
                "sizeLimit": 0,
                "dn": "DC=example,DC=com"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(record_body()))
            .expect(1)
            .mount(&server)
            .await;

        let config = test_config(&server).with_base_dn("DC=example,DC=com");
        let searcher = ApiSearcher::from_config(config).unwrap();
        assert!(searcher.search("jdoe").await.is_ok());
    }

    #[tokio::test]
    async fn test_empty_result_is_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"message": []})),
            )
            .mount(&server)
            .await;

        let searcher = ApiSearcher::from_config(test_config(&server)).unwrap();
        let response = searcher.search("ghost").await.unwrap();
        assert!(response.records.is_empty());
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn test_error_status_is_passed_through() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
            .mount(&server)
            .await;

        let searcher = ApiSearcher::from_config(test_config(&server)).unwrap();
        let err = searcher.search("jdoe").await.unwrap_err();

        assert_eq!(err.status, 401);
        assert_eq!(
            err.error,
            Error::HttpStatus {
                status: 401,
                message: "credentials rejected: bad token".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_unavailable_status() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let searcher = ApiSearcher::from_config(test_config(&server)).unwrap();
        let err = searcher.search("jdoe").await.unwrap_err();
        assert_eq!(err.status, 503);
        assert!(matches!(err.error, Error::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_malformed_body_keeps_status() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let searcher = ApiSearcher::from_config(test_config(&server)).unwrap();
        let err = searcher.search("jdoe").await.unwrap_err();
        assert_eq!(err.status, 200);
        assert!(matches!(err.error, Error::DecodeError(_)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_reports_500() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let config =
            ApiConfig::new(format!("http://127.0.0.1:{port}/search"), BasicAuth::new(TOKEN))
                .unwrap();

        let searcher = ApiSearcher::from_config(config).unwrap();
        let err = searcher.search("jdoe").await.unwrap_err();
        assert_eq!(err.status, TRANSPORT_FAILURE_STATUS);
        assert!(err.error.is_transport());
    }

    #[tokio::test]
    async fn test_request_timeout() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(record_body())
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let searcher = ApiSearcher::builder(test_config(&server))
            .with_http_config(ClientConfig::new().with_timeout(Duration::from_millis(200)))
            .build()
            .unwrap();
        let err = searcher.search("jdoe").await.unwrap_err();
        assert_eq!(err.status, TRANSPORT_FAILURE_STATUS);
        assert!(matches!(err.error, Error::Timeout(_)));
    }

    #[tokio::test]
    async fn test_ping_searches_empty_subject() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(body_json(serde_json::json!({
                "filter": "(&(objectClass=person)(objectClass=user)(userAccountControl=512)(sAMAccountName=)(!(objectClass=computer)))",
                "attributes": ["dn", "cn", "sAMAccountName", "mail", "memberOf"],
                "sizeLimit": 0,
                "dn": "DC=a,DC=com"
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"message": []})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let searcher = ApiSearcher::from_config(test_config(&server)).unwrap();
        assert_eq!(searcher.ping().await.unwrap(), 200);
    }

    #[test]
    fn test_missing_ca_bundle_fails_build() {
        let config = ApiConfig::new("https://ldap-api.example.com/search", BasicAuth::new(TOKEN))
            .unwrap()
            .with_ca_cert("/nonexistent/bundle.pem".into());
        let result = ApiSearcher::from_config(config);
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }
}

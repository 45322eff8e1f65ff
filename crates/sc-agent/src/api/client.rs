//! HTTP transport to the coordination server

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ETAG, IF_NONE_MATCH};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};

use sc_core::config::SidecarConfig;
use sc_core::error::TransportError;
use sc_core::traits::{CatalogFetch, Transport};
use sc_core::{BackendDefinition, ChangeToken};
use sc_protocol::{
    CollectorListResponse, RegistrationRequest, RegistrationResponse, REQUESTED_BY,
    REQUESTED_BY_HEADER,
};

/// Password sent alongside the API token in basic auth
const TOKEN_PASSWORD: &str = "token";

/// [`Transport`] speaking the sidecar REST API over reqwest
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    node_id: String,
    api_token: String,
}

impl HttpTransport {
    /// Create a transport for `node_id` from the agent configuration
    pub fn new(config: &SidecarConfig, node_id: impl Into<String>) -> Result<Self, TransportError> {
        let mut url = config.server_url.clone();
        if !url.ends_with('/') {
            url.push('/');
        }
        let base_url = Url::parse(&url)
            .map_err(|e| TransportError::Request(format!("invalid server URL {}: {}", url, e)))?;

        let mut headers = HeaderMap::new();
        headers.insert(REQUESTED_BY_HEADER, HeaderValue::from_static(REQUESTED_BY));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .user_agent(concat!("sc-agent/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(config.request_timeout)
            .danger_accept_invalid_certs(config.tls_skip_verify)
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            node_id: node_id.into(),
            api_token: config.server_api_token.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(path)
            .map_err(|e| TransportError::Request(format!("invalid endpoint {}: {}", path, e)))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        if self.api_token.is_empty() {
            request
        } else {
            request.basic_auth(&self.api_token, Some(TOKEN_PASSWORD))
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, TransportError> {
        self.authorize(request).send().await.map_err(map_error)
    }
}

fn map_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Request(err.to_string())
    }
}

/// Read the body of a successful response, or turn the status into an error
async fn success_body(response: Response) -> Result<Vec<u8>, TransportError> {
    let status = response.status();
    let body = response.bytes().await.map_err(map_error)?;
    if !status.is_success() {
        return Err(TransportError::Status {
            status: status.as_u16(),
            body: String::from_utf8_lossy(&body).into_owned(),
        });
    }
    Ok(body.to_vec())
}

#[async_trait]
impl Transport for HttpTransport {
    async fn report_status(
        &self,
        request: &RegistrationRequest,
    ) -> Result<RegistrationResponse, TransportError> {
        let url = self.endpoint(&format!("sidecars/{}", self.node_id))?;
        let response = self.send(self.client.put(url).json(request)).await?;
        let body = success_body(response).await?;
        Ok(sc_protocol::decode(&body)?)
    }

    async fn fetch_catalog(&self, last_token: &ChangeToken) -> Result<CatalogFetch, TransportError> {
        let url = self.endpoint("sidecar/collectors")?;
        let mut request = self.client.get(url);
        if !last_token.is_initial() {
            request = request.header(IF_NONE_MATCH, last_token.as_str());
        }

        let response = self.send(request).await?;
        if response.status() == StatusCode::NOT_MODIFIED {
            return Ok(CatalogFetch::Unchanged);
        }

        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = success_body(response).await?;
        let listing: CollectorListResponse = sc_protocol::decode(&body)?;

        let token = etag
            .or(listing.checksum)
            .map(ChangeToken::new)
            .unwrap_or_else(ChangeToken::initial);
        let backends = listing
            .collectors
            .into_iter()
            .map(BackendDefinition::from_response)
            .collect();
        Ok(CatalogFetch::Updated { token, backends })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sc_core::config::Platform;

    fn config(url: &str) -> SidecarConfig {
        let mut config = SidecarConfig::defaults(Platform::Posix).unwrap();
        config.server_url = url.to_string();
        config
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let transport = HttpTransport::new(&config("http://graylog:9000/api"), "node-1").unwrap();
        let url = transport.endpoint("sidecars/node-1").unwrap();
        assert_eq!(url.as_str(), "http://graylog:9000/api/sidecars/node-1");
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(matches!(
            HttpTransport::new(&config("not a url"), "node-1"),
            Err(TransportError::Request(_))
        ));
    }
}

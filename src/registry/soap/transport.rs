//! HTTP transport for SOAP calls.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::envelope::soap_action;
use crate::error::RegistryError;

const BACKEND: &str = "soap";

/// Sends one SOAP envelope and returns the raw response body.
#[async_trait]
pub trait SoapTransport: Send + Sync {
    async fn call(&self, operation: &str, envelope: String) -> Result<String, RegistryError>;
}

/// [`SoapTransport`] over HTTP POST.
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
}

impl HttpTransport {
    pub fn new(endpoint: Url, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("teryt-resolver/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl SoapTransport for HttpTransport {
    async fn call(&self, operation: &str, envelope: String) -> Result<String, RegistryError> {
        debug!("SOAP {} -> {}", operation, self.endpoint);

        let response = self
            .client
            .post(self.endpoint.clone())
            .header("Content-Type", "text/xml; charset=utf-8")
            .header("SOAPAction", soap_action(operation))
            .body(envelope)
            .send()
            .await
            .map_err(|e| {
                warn!("SOAP request {} failed: {}", operation, e);
                RegistryError::unavailable(BACKEND, e)
            })?;

        let status = response.status();
        // Faults come back as HTTP 500 with a SOAP body; the envelope parser
        // reports them.
        if !status.is_success() && status != StatusCode::INTERNAL_SERVER_ERROR {
            return Err(RegistryError::unavailable(
                BACKEND,
                format!("{} returned HTTP {}", operation, status),
            ));
        }

        response
            .text()
            .await
            .map_err(|e| RegistryError::unavailable(BACKEND, e))
    }
}

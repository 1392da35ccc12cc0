//! # Configuration transports
//!
//! The loader works against the [`ConfigFetcher`] seam; the two concrete
//! transports only differ in how they obtain the raw JSON document. Tests
//! substitute their own fetcher through the same seam.

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;

/// Fetches the raw configuration document.
#[async_trait]
pub trait ConfigFetcher: Send + Sync {
    /// Stable identifier used in log records.
    fn backend_id(&self) -> &str;

    /// Returns the raw JSON document as text.
    async fn fetch(&self) -> Result<String>;
}

/// Hosted backend: GET against the local configuration extension endpoint.
#[derive(Debug)]
pub struct AppConfigFetcher {
    endpoint: String,
    client: reqwest::Client,
}

impl AppConfigFetcher {
    pub fn new(application: &str, environment: &str, profile: &str, port: u16) -> Self {
        Self {
            endpoint: format!(
                "http://localhost:{port}/applications/{application}/environments/{environment}/configurations/{profile}"
            ),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ConfigFetcher for AppConfigFetcher {
    fn backend_id(&self) -> &str {
        "appconfig"
    }

    async fn fetch(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .context("configuration extension endpoint unreachable")?;
        let status = response.status();
        if !status.is_success() {
            bail!("configuration extension endpoint returned {status}");
        }
        response
            .text()
            .await
            .context("failed to read configuration response body")
    }
}

/// Parameter-store backend: reads one named parameter whose string value
/// holds the JSON document.
#[derive(Debug)]
pub struct ParameterStoreFetcher {
    parameter_name: String,
    client: tokio::sync::OnceCell<aws_sdk_ssm::Client>,
}

impl ParameterStoreFetcher {
    pub fn new(parameter_name: &str) -> Self {
        Self {
            parameter_name: parameter_name.to_string(),
            client: tokio::sync::OnceCell::new(),
        }
    }

    async fn client(&self) -> &aws_sdk_ssm::Client {
        self.client
            .get_or_init(|| async {
                let shared =
                    aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
                aws_sdk_ssm::Client::new(&shared)
            })
            .await
    }
}

#[async_trait]
impl ConfigFetcher for ParameterStoreFetcher {
    fn backend_id(&self) -> &str {
        "ssm"
    }

    async fn fetch(&self) -> Result<String> {
        let output = self
            .client()
            .await
            .get_parameter()
            .name(&self.parameter_name)
            .send()
            .await
            .map_err(|e| anyhow!("parameter read failed: {e}"))?;
        let value = output
            .parameter()
            .and_then(|parameter| parameter.value())
            .ok_or_else(|| anyhow!("parameter {} has no value", self.parameter_name))?;
        Ok(value.to_string())
    }
}

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Url, header::CONTENT_TYPE};

use crate::{
    Config,
    error::{LookupError, LookupResult},
    lookup::{LookupService, ServiceReply, truncate_body},
    model::NewRecord,
};

/// `LookupService` over plain HTTP.
#[derive(Debug, Clone)]
pub struct HttpLookupService {
    base_url: Url,
    http: Client,
}

impl HttpLookupService {
    pub fn new(base_url: Url, timeout: Option<Duration>) -> anyhow::Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("Failed to build HTTP client")?;

        Ok(Self { base_url, http })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .with_context(|| format!("Invalid base URL in config: {}", config.base_url))?;

        Self::new(base_url, config.timeout())
    }

    /// `{base}/weather`, or `{base}/weather/{id}` with the ID as a single
    /// percent-encoded segment.
    fn weather_url(&self, id: Option<&str>) -> LookupResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| LookupError::InvalidEndpoint(self.base_url.to_string()))?;
            segments.pop_if_empty().push("weather");
            if let Some(id) = id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    async fn read_reply(&self, res: reqwest::Response, what: &str) -> LookupResult<ServiceReply> {
        let status = res.status();
        let body = res.text().await.map_err(LookupError::transport)?;

        if !status.is_success() {
            tracing::warn!(
                %status,
                body = %truncate_body(&body),
                "weather service rejected {what}"
            );
        }

        Ok(ServiceReply { status, body })
    }
}

#[async_trait]
impl LookupService for HttpLookupService {
    async fn fetch(&self, id: &str) -> LookupResult<ServiceReply> {
        let url = self.weather_url(Some(id))?;
        tracing::debug!(%url, "fetching weather record");

        // The header is sent on the bodiless GET as well; the service expects it.
        let res = self
            .http
            .get(url)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|err| {
                tracing::warn!(error = %err, "weather lookup request failed");
                LookupError::transport(err)
            })?;

        self.read_reply(res, "lookup").await
    }

    async fn create(&self, record: &NewRecord) -> LookupResult<ServiceReply> {
        let url = self.weather_url(None)?;
        tracing::debug!(%url, "creating weather record");

        let res = self.http.post(url).json(record).send().await.map_err(|err| {
            tracing::warn!(error = %err, "weather create request failed");
            LookupError::transport(err)
        })?;

        self.read_reply(res, "create").await
    }
}

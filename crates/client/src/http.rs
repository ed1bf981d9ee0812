//! [`StatusSource`] over the HTTP status endpoint.

use async_trait::async_trait;
use manimflow_core::status_view::JobStatusView;
use manimflow_core::types::JobId;
use serde::Deserialize;

use crate::poller::{PollError, StatusSource};

#[derive(Deserialize)]
struct Envelope {
    data: JobStatusView,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Reads `GET {base}/api/v1/animations/{id}/status` with a bearer token.
pub struct HttpStatusSource {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpStatusSource {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn status_url(&self, job_id: JobId) -> String {
        format!("{}/api/v1/animations/{job_id}/status", self.base_url)
    }
}

#[async_trait]
impl StatusSource for HttpStatusSource {
    async fn fetch(&self, job_id: JobId) -> Result<JobStatusView, PollError> {
        let response = self
            .client
            .get(self.status_url(job_id))
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(PollError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: Envelope = response.json().await?;
        Ok(envelope.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_url_is_built_from_trimmed_base() {
        let source = HttpStatusSource::new("https://api.example/", "t");
        let id = uuid::Uuid::nil();
        assert_eq!(
            source.status_url(id),
            "https://api.example/api/v1/animations/00000000-0000-0000-0000-000000000000/status"
        );
    }
}

use crate::domain::market::FearGreedReading;
use crate::ingest::provider::HttpJsonClient;
use crate::ingest::types::FearGreedResponse;
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;

const HISTORY_LIMIT: &str = "7";

/// Alternative.me crypto Fear & Greed Index.
#[derive(Debug, Clone)]
pub struct AlternativeMeClient {
    http: Arc<HttpJsonClient>,
    url: String,
}

impl AlternativeMeClient {
    pub fn new(http: Arc<HttpJsonClient>, url: &str) -> Self {
        Self {
            http,
            url: url.to_string(),
        }
    }

    /// Current reading plus the last 7 daily values, newest first.
    pub async fn fear_greed_index(&self) -> Result<FearGreedReading> {
        let body: FearGreedResponse = self
            .http
            .get_json(&self.url, &[("limit", HISTORY_LIMIT)])
            .await?;

        let current = body
            .data
            .first()
            .ok_or_else(|| anyhow::anyhow!("fear & greed response has no data"))?;

        let timestamp = current
            .timestamp
            .as_deref()
            .and_then(|s| s.trim().parse::<i64>().ok())
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));

        Ok(FearGreedReading {
            value: current.value,
            classification: current.value_classification.clone(),
            timestamp,
            history_7d: body.data.iter().map(|item| item.value).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mockito::Matcher;
    use std::time::Duration;

    fn client(url: &str) -> AlternativeMeClient {
        let http = HttpJsonClient::new(Duration::from_secs(5), 1, Duration::ZERO).unwrap();
        AlternativeMeClient::new(Arc::new(http), url)
    }

    #[tokio::test]
    async fn parses_current_value_and_history() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("GET", "/fng/")
            .match_query(Matcher::UrlEncoded("limit".into(), "7".into()))
            .with_status(200)
            .with_body(
                r#"{"name": "Fear and Greed Index", "data": [
                    {"value": "38", "value_classification": "Fear", "timestamp": "1769472000"},
                    {"value": "45", "value_classification": "Fear", "timestamp": "1769385600"},
                    {"value": "52", "value_classification": "Neutral", "timestamp": "1769299200"}
                ], "metadata": {"error": null}}"#,
            )
            .create_async()
            .await;

        let r = client(&format!("{}/fng/", server.url()))
            .fear_greed_index()
            .await
            .unwrap();
        assert_eq!(r.value, 38);
        assert_eq!(r.classification, "Fear");
        assert_eq!(r.history_7d, vec![38, 45, 52]);
        assert_eq!(
            r.timestamp,
            Some(Utc.with_ymd_and_hms(2026, 1, 27, 0, 0, 0).unwrap())
        );
        m.assert_async().await;
    }

    #[tokio::test]
    async fn empty_data_is_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/fng/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"data": []}"#)
            .create_async()
            .await;

        let res = client(&format!("{}/fng/", server.url()))
            .fear_greed_index()
            .await;
        assert!(res.is_err());
    }
}

//! Fire-and-forget client analytics.
//!
//! The pipeline never waits on, or reads anything back from, the sink. A
//! failed post is logged at debug and dropped.

use reqwest::Client;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryEvent {
    pub session_id: String,
    pub question: String,
    pub answer: String,
    pub latency_ms: u64,
}

#[derive(Clone)]
pub struct AnalyticsSink {
    endpoint: Option<String>,
    client: Client,
}

impl AnalyticsSink {
    pub fn new(endpoint: Option<String>) -> Self {
        Self {
            endpoint,
            client: Client::new(),
        }
    }

    pub fn disabled() -> Self {
        Self::new(None)
    }

    /// Posts the event in the background; returns immediately.
    pub fn record(&self, event: QueryEvent) {
        let Some(endpoint) = self.endpoint.clone() else {
            return;
        };
        let client = self.client.clone();

        tokio::spawn(async move {
            if let Err(err) = client.post(&endpoint).json(&event).send().await {
                tracing::debug!("analytics post failed: {}", err);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serializes_camel_case() {
        let event = QueryEvent {
            session_id: "1abc".to_string(),
            question: "q".to_string(),
            answer: "a".to_string(),
            latency_ms: 120,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["sessionId"], "1abc");
        assert_eq!(json["latencyMs"], 120);
    }

    #[tokio::test]
    async fn disabled_sink_is_a_noop() {
        // Must not panic or spawn anything that outlives the test.
        AnalyticsSink::disabled().record(QueryEvent {
            session_id: "s".to_string(),
            question: "q".to_string(),
            answer: "a".to_string(),
            latency_ms: 1,
        });
    }
}

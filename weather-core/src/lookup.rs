use crate::{
    Config,
    error::{LookupError, LookupResult},
    lookup::http::HttpLookupService,
    model::{CreatedRecord, NewRecord},
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::fmt::Debug;

pub mod http;

/// Message used when a rejected lookup carries no `detail`.
pub const LOOKUP_FAILED_MESSAGE: &str = "Failed to submit weather lookup";

/// Message used when a rejected creation carries no `detail`.
pub const CREATE_FAILED_MESSAGE: &str = "Failed to create weather record";

/// A response as received, before any interpretation of the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceReply {
    pub status: StatusCode,
    pub body: String,
}

impl ServiceReply {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self { status, body: body.into() }
    }

    /// Body of a 2xx reply, or a `RequestRejected` error carrying the
    /// server's `detail` message (or `fallback` when there is none).
    pub fn into_body(self, fallback: &str) -> LookupResult<String> {
        if self.status.is_success() {
            return Ok(self.body);
        }

        let message = detail_message(&self.body).unwrap_or_else(|| fallback.to_string());
        Err(LookupError::RequestRejected { status: self.status, message })
    }
}

/// The remote record store.
///
/// Implementations return `Err` only when no response was received; every
/// HTTP status, error or not, comes back as a `ServiceReply`.
#[async_trait]
pub trait LookupService: Send + Sync + Debug {
    async fn fetch(&self, id: &str) -> LookupResult<ServiceReply>;

    async fn create(&self, record: &NewRecord) -> LookupResult<ServiceReply>;
}

#[async_trait]
impl<T: LookupService + ?Sized> LookupService for Box<T> {
    async fn fetch(&self, id: &str) -> LookupResult<ServiceReply> {
        (**self).fetch(id).await
    }

    async fn create(&self, record: &NewRecord) -> LookupResult<ServiceReply> {
        (**self).create(record).await
    }
}

/// Construct the HTTP service described by the config.
pub fn service_from_config(config: &Config) -> anyhow::Result<Box<dyn LookupService>> {
    Ok(Box::new(HttpLookupService::from_config(config)?))
}

/// Store a new record and return its ID.
pub async fn create_record<S>(service: &S, record: &NewRecord) -> LookupResult<String>
where
    S: LookupService + ?Sized,
{
    tracing::info!(location = %record.location, date = %record.date, "creating weather record");

    let body = service.create(record).await?.into_body(CREATE_FAILED_MESSAGE)?;
    let created: CreatedRecord = serde_json::from_str(&body).map_err(LookupError::Decode)?;

    Ok(created.id)
}

fn detail_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;

    match value.get("detail")? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    };
    use tokio::sync::Notify;

    /// Canned service that records the IDs it was asked for.
    #[derive(Debug)]
    pub struct StubService {
        reply: LookupResult<ServiceReply>,
        pub calls: AtomicUsize,
        pub ids: Mutex<Vec<String>>,
        gate: Option<Arc<Notify>>,
    }

    impl StubService {
        pub fn replying(status: StatusCode, body: &str) -> Self {
            Self::with_result(Ok(ServiceReply::new(status, body)))
        }

        pub fn unreachable() -> Self {
            Self::with_result(Err(LookupError::transport("connection refused")))
        }

        fn with_result(reply: LookupResult<ServiceReply>) -> Self {
            Self { reply, calls: AtomicUsize::new(0), ids: Mutex::new(Vec::new()), gate: None }
        }

        /// Hold every request until `release` is called.
        pub fn gated(mut self) -> Self {
            self.gate = Some(Arc::new(Notify::new()));
            self
        }

        pub fn release(&self) {
            if let Some(gate) = &self.gate {
                gate.notify_one();
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn cloned_reply(&self) -> LookupResult<ServiceReply> {
            match &self.reply {
                Ok(reply) => Ok(reply.clone()),
                Err(LookupError::Transport { reason }) => {
                    Err(LookupError::Transport { reason: reason.clone() })
                }
                Err(other) => panic!("unsupported stub error: {other}"),
            }
        }
    }

    #[async_trait]
    impl LookupService for StubService {
        async fn fetch(&self, id: &str) -> LookupResult<ServiceReply> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.ids.lock().unwrap().push(id.to_string());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.cloned_reply()
        }

        async fn create(&self, _record: &NewRecord) -> LookupResult<ServiceReply> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.cloned_reply()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::StubService;
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn success_reply_yields_body() {
        let reply = ServiceReply::new(StatusCode::OK, "{}");
        assert_eq!(reply.into_body(LOOKUP_FAILED_MESSAGE).unwrap(), "{}");
    }

    #[test]
    fn rejected_reply_uses_detail() {
        let reply = ServiceReply::new(StatusCode::NOT_FOUND, r#"{"detail":"not found"}"#);
        match reply.into_body(LOOKUP_FAILED_MESSAGE).unwrap_err() {
            LookupError::RequestRejected { status, message } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(message, "not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejected_reply_falls_back_without_detail() {
        let bodies = [
            "",
            "Internal Server Error",
            r#"{"error":"x"}"#,
            r#"{"detail":null}"#,
            r#"{"detail":""}"#,
        ];
        for body in bodies {
            let reply = ServiceReply::new(StatusCode::INTERNAL_SERVER_ERROR, body);
            let err = reply.into_body(LOOKUP_FAILED_MESSAGE).unwrap_err();
            assert_eq!(err.to_string(), LOOKUP_FAILED_MESSAGE, "body: {body:?}");
        }
    }

    #[test]
    fn structured_detail_is_shown_as_json() {
        let reply = ServiceReply::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"detail":[{"msg":"field required"}]}"#,
        );
        let err = reply.into_body(LOOKUP_FAILED_MESSAGE).unwrap_err();
        assert_eq!(err.to_string(), r#"[{"msg":"field required"}]"#);
    }

    #[test]
    fn truncate_body_limits_long_bodies() {
        let long = "é".repeat(300);
        let cut = truncate_body(&long);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), 203);
        assert_eq!(truncate_body("short"), "short");
    }

    fn paris_record() -> NewRecord {
        NewRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            location: "Paris".into(),
            notes: "windy".into(),
        }
    }

    #[tokio::test]
    async fn create_record_returns_id() {
        let service = StubService::replying(StatusCode::OK, r#"{"id":"1234"}"#);
        let id = create_record(&service, &paris_record()).await.unwrap();
        assert_eq!(id, "1234");
        assert_eq!(service.call_count(), 1);
    }

    #[tokio::test]
    async fn create_record_surfaces_detail() {
        let service = StubService::replying(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"detail":"Please add an API_KEY"}"#,
        );
        let err = create_record(&service, &paris_record()).await.unwrap_err();
        assert_eq!(err.to_string(), "Please add an API_KEY");
    }

    #[test]
    fn service_from_config_accepts_defaults() {
        assert!(service_from_config(&Config::default()).is_ok());
    }

    #[tokio::test]
    async fn boxed_services_delegate() {
        let boxed: Box<dyn LookupService> =
            Box::new(StubService::replying(StatusCode::OK, r#"{"id":"7"}"#));
        assert_eq!(create_record(&boxed, &paris_record()).await.unwrap(), "7");
        assert_eq!(boxed.fetch("x").await.unwrap().status, StatusCode::OK);
    }
}

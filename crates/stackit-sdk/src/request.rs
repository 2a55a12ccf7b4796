//! Typed request builder shared by every service client.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{Result, SdkError};
use crate::transport::{ApiCall, Method, Transport};

/// Response type for calls whose body carries no information.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoContent;

impl<'de> Deserialize<'de> for NoContent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        IgnoredAny::deserialize(deserializer)?;
        Ok(Self)
    }
}

impl Serialize for NoContent {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_unit()
    }
}

/// A single API call with a typed payload `P` and a typed response `R`.
///
/// Requests are inert until [`Request::execute`] is awaited.
pub struct Request<P, R> {
    transport: Arc<dyn Transport>,
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    payload: Option<P>,
    _response: PhantomData<fn() -> R>,
}

impl<P: fmt::Debug, R> fmt::Debug for Request<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("payload", &self.payload)
            .finish_non_exhaustive()
    }
}

impl<P, R> Request<P, R>
where
    P: Serialize + Send + Sync,
    R: DeserializeOwned,
{
    pub(crate) fn new(transport: &Arc<dyn Transport>, method: Method, path: String) -> Self {
        Self {
            transport: Arc::clone(transport),
            method,
            path,
            query: Vec::new(),
            payload: None,
            _response: PhantomData,
        }
    }

    /// Sets the request body.
    #[must_use]
    pub fn payload(mut self, payload: P) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Adds a query parameter.
    #[must_use]
    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_owned(), value.into()));
        self
    }

    /// HTTP method of the call.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Path of the call relative to the service endpoint.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The payload set so far.
    #[must_use]
    pub const fn payload_ref(&self) -> Option<&P> {
        self.payload.as_ref()
    }

    /// Sends the request and decodes the response.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::InvalidPath`] without sending anything if a path
    /// segment is empty, `.` or `..`. Otherwise returns the transport's error,
    /// or [`SdkError::Decode`] if the payload or the response body does not
    /// match its model.
    pub async fn execute(self) -> Result<R> {
        if self
            .path
            .split('/')
            .skip(1)
            .any(|s| matches!(s, "" | "." | ".."))
        {
            return Err(SdkError::InvalidPath { path: self.path });
        }
        let body = self.payload.as_ref().map(serde_json::to_value).transpose()?;
        let call = ApiCall {
            method: self.method,
            path: self.path,
            query: self.query,
            body,
        };
        let value = self.transport.send(call).await?;
        Ok(serde_json::from_value(value.unwrap_or(Value::Null))?)
    }
}

/// Characters left as-is in a path segment: RFC 3986 unreserved.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

/// Percent-encodes a single path segment.
pub(crate) fn segment(raw: &str) -> String {
    utf8_percent_encode(raw, SEGMENT).to_string()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde::Deserialize;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<ApiCall>>,
        reply: Option<Value>,
    }

    #[async_trait]
    impl Transport for Recorder {
        async fn send(&self, call: ApiCall) -> Result<Option<Value>> {
            self.calls.lock().expect("lock").push(call);
            Ok(self.reply.clone())
        }
    }

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Payload {
        display_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Reply {
        id: String,
    }

    #[tokio::test]
    async fn execute_serializes_payload_and_decodes_reply() {
        let recorder = Arc::new(Recorder {
            calls: Default::default(),
            reply: Some(serde_json::json!({"id": "42"})),
        });
        let transport: Arc<dyn Transport> = recorder.clone();

        let reply: Reply = Request::<Payload, Reply>::new(&transport, Method::Post, "/v1/things".into())
            .payload(Payload {
                display_name: "a".into(),
                description: None,
            })
            .query("force", "true")
            .execute()
            .await
            .expect("execute");

        assert_eq!(reply, Reply { id: "42".into() });
        let calls = recorder.calls.lock().expect("lock");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, Method::Post);
        assert_eq!(calls[0].query, vec![("force".to_owned(), "true".to_owned())]);
        assert_eq!(calls[0].body, Some(serde_json::json!({"displayName": "a"})));
    }

    #[tokio::test]
    async fn no_content_accepts_empty_and_non_empty_bodies() {
        for reply in [None, Some(serde_json::json!({"message": "deleted"}))] {
            let transport: Arc<dyn Transport> = Arc::new(Recorder {
                calls: Default::default(),
                reply,
            });
            let result = Request::<(), NoContent>::new(&transport, Method::Delete, "/x".into())
                .execute()
                .await;
            assert_eq!(result.expect("execute"), NoContent);
        }
    }

    #[tokio::test]
    async fn request_without_payload_sends_no_body() {
        let recorder = Arc::new(Recorder::default());
        let transport: Arc<dyn Transport> = recorder.clone();
        let _ = Request::<(), NoContent>::new(&transport, Method::Get, "/x".into())
            .execute()
            .await;
        assert_eq!(recorder.calls.lock().expect("lock")[0].body, None);
    }

    #[test]
    fn segment_encodes_reserved_characters() {
        assert_eq!(segment("abc-123_x.y~z"), "abc-123_x.y~z");
        assert_eq!(segment("a/b c"), "a%2Fb%20c");
        assert_eq!(segment("job?x#y"), "job%3Fx%23y");
        assert_eq!(segment("100%"), "100%25");
    }

    #[tokio::test]
    async fn dot_and_empty_segments_are_never_sent() {
        for id in ["..", ".", ""] {
            let recorder = Arc::new(Recorder::default());
            let transport: Arc<dyn Transport> = recorder.clone();
            let path = format!("/v1beta/pools/pool-1/snapshots/{}", segment(id));
            let err = Request::<(), NoContent>::new(&transport, Method::Delete, path.clone())
                .execute()
                .await
                .expect_err("rejected");
            assert!(matches!(err, SdkError::InvalidPath { path: ref p } if *p == path), "{id:?}: {err}");
            assert!(recorder.calls.lock().expect("lock").is_empty(), "{id:?} was sent");
        }
    }
}

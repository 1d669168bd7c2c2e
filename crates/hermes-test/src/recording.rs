//! Middleware that records the order it runs in.

use hermes_core::{BoxFuture, ClientError, Context, HttpRequest, HttpResponse, RequestBuilder, SdkError};
use hermes_middleware::{Middleware, Next, SerializeInput};
use http::{HeaderMap, HeaderName, HeaderValue};
use parking_lot::Mutex;
use std::sync::Arc;

/// A shared, append-only list of events.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<String>>>,
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event.
    pub fn push(&self, event: impl Into<String>) {
        self.events.lock().push(event.into());
    }

    /// A snapshot of every event so far.
    #[must_use]
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    /// Forgets every event.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

/// Step inputs that carry headers a recorder can read and append to.
pub trait Taggable: Send + 'static {
    /// Reads a header.
    fn tag(&self, name: &str) -> Option<String>;

    /// Replaces a header.
    fn set_tag(&mut self, name: &str, value: &str) -> Result<(), ClientError>;
}

fn read(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(ToString::to_string)
}

fn write(headers: &mut HeaderMap, name: &str, value: &str) -> Result<(), ClientError> {
    let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| ClientError::InvalidRequest(format!("invalid tag header {name:?}: {e}")))?;
    let value = HeaderValue::from_str(value)
        .map_err(|e| ClientError::InvalidRequest(format!("invalid tag value for {name}: {e}")))?;
    headers.insert(name, value);
    Ok(())
}

impl Taggable for RequestBuilder {
    fn tag(&self, name: &str) -> Option<String> {
        read(self.headers(), name)
    }

    fn set_tag(&mut self, name: &str, value: &str) -> Result<(), ClientError> {
        write(self.headers_mut(), name, value)
    }
}

impl<I: Send + 'static> Taggable for SerializeInput<I> {
    fn tag(&self, name: &str) -> Option<String> {
        self.request.tag(name)
    }

    fn set_tag(&mut self, name: &str, value: &str) -> Result<(), ClientError> {
        self.request.set_tag(name, value)
    }
}

impl Taggable for HttpRequest {
    fn tag(&self, name: &str) -> Option<String> {
        read(self.headers(), name)
    }

    fn set_tag(&mut self, name: &str, value: &str) -> Result<(), ClientError> {
        write(self.headers_mut(), name, value)
    }
}

impl Taggable for HttpResponse {
    fn tag(&self, name: &str) -> Option<String> {
        read(self.headers(), name)
    }

    fn set_tag(&mut self, name: &str, value: &str) -> Result<(), ClientError> {
        write(self.headers_mut(), name, value)
    }
}

/// Logs `{id}-before` and `{id}-after` around the rest of its step.
///
/// With [`tagging`](Self::tagging) it also appends its id to a header, and the
/// before-event shows what earlier middleware left there: `B-before[A]`.
#[derive(Debug, Clone)]
pub struct RecordingMiddleware {
    id: String,
    log: EventLog,
    tag_header: Option<String>,
}

impl RecordingMiddleware {
    /// Creates a recorder writing to `log`.
    pub fn new(id: impl Into<String>, log: &EventLog) -> Self {
        Self {
            id: id.into(),
            log: log.clone(),
            tag_header: None,
        }
    }

    /// Appends the id to `header` before delegating.
    #[must_use]
    pub fn tagging(mut self, header: impl Into<String>) -> Self {
        self.tag_header = Some(header.into());
        self
    }
}

impl<In, O, E> Middleware<In, O, E> for RecordingMiddleware
where
    In: Taggable,
    O: Send + 'static,
    E: Send + 'static,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a mut Context,
        mut input: In,
        next: Next<'a, In, O, E>,
    ) -> BoxFuture<'a, Result<O, SdkError<E>>> {
        Box::pin(async move {
            match &self.tag_header {
                Some(header) => {
                    let seen = input.tag(header).unwrap_or_default();
                    self.log.push(format!("{}-before[{seen}]", self.id));
                    input.set_tag(header, &format!("{seen}{}", self.id))?;
                }
                None => self.log.push(format!("{}-before", self.id)),
            }

            let result = next.run(ctx, input).await;
            self.log.push(format!("{}-after", self.id));
            result
        })
    }
}

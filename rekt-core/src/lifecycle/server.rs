//! Server-rendered contexts.
//!
//! A [`ServerContext`] is a [`Context`] plus the identity of the request
//! being rendered and the parts of the response a component may shape.
//! None of these fields carry invariants; they are handed through to the
//! driver that writes the response.

use std::ops::Deref;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use super::context::{Context, ContextOptions};

/// Response status and headers set by components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseParts {
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,
    /// In first-set order; setting a name again replaces its value in place.
    pub headers: IndexMap<String, String>,
}

impl Default for ResponseParts {
    fn default() -> Self {
        Self {
            status: 200,
            status_text: None,
            headers: IndexMap::new(),
        }
    }
}

/// A lifecycle context for a component rendered on behalf of a request.
///
/// Derefs to [`Context`], so mount and dismount registration work as on a
/// client context.
pub struct ServerContext<R> {
    /// The lifecycle context proper.
    context: Context,

    /// Identifier of this render.
    id: String,

    /// Identifier of the connection the request arrived on.
    connection_id: String,

    /// The request being rendered.
    request: R,

    /// Free-form data handed to the component.
    data: Value,

    /// Status and headers set so far.
    response: ResponseParts,
}

impl<R> ServerContext<R> {
    /// Create a context for `request`. The context's log label is `id`.
    pub fn new(id: impl Into<String>, connection_id: impl Into<String>, request: R) -> Self {
        let id = id.into();
        Self {
            context: Context::with_options(ContextOptions::new().label(id.clone())),
            id,
            connection_id: connection_id.into(),
            request,
            data: Value::Null,
            response: ResponseParts::default(),
        }
    }

    /// Attach free-form data for the component.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    pub fn request(&self) -> &R {
        &self.request
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Value {
        &mut self.data
    }

    /// Set a response header, replacing any earlier value for `name`.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.response.headers.insert(name.into(), value.into());
    }

    /// Set the response status code and optional reason text.
    pub fn set_status(&mut self, code: u16, status_text: Option<&str>) {
        self.response.status = code;
        self.response.status_text = status_text.map(str::to_owned);
    }

    pub fn response(&self) -> &ResponseParts {
        &self.response
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Split into the lifecycle context and the shaped response.
    pub fn into_parts(self) -> (Context, ResponseParts) {
        (self.context, self.response)
    }
}

impl<R> Deref for ServerContext<R> {
    type Target = Context;

    fn deref(&self) -> &Context {
        &self.context
    }
}

impl<R: std::fmt::Debug> std::fmt::Debug for ServerContext<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerContext")
            .field("id", &self.id)
            .field("connection_id", &self.connection_id)
            .field("request", &self.request)
            .field("response", &self.response)
            .field("context", &self.context)
            .finish()
    }
}

//! Substitute response synthesis.
//!
//! Turns a callback name and a payload into script text, then hands that
//! text to a [`ResourceStore`] which returns a loadable URL. Nothing here
//! executes the script.

use crate::result::{StubError, StubResult};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use uuid::Uuid;

/// Default MIME type for synthesized scripts
pub const DEFAULT_CONTENT_TYPE: &str = "application/javascript";

/// Produces the script body that delivers a payload to a callback
pub trait PayloadFormatter {
    /// Format `payload` as a script calling the global `callback`
    fn format(&self, callback: &str, payload: &Value) -> StubResult<String>;
}

impl<F> PayloadFormatter for F
where
    F: Fn(&str, &Value) -> StubResult<String>,
{
    fn format(&self, callback: &str, payload: &Value) -> StubResult<String> {
        self(callback, payload)
    }
}

/// Formats payloads as `callback(<json>);`
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonpFormatter;

impl PayloadFormatter for JsonpFormatter {
    fn format(&self, callback: &str, payload: &Value) -> StubResult<String> {
        let json = serde_json::to_string(payload)?;
        Ok(format!("{callback}({json});"))
    }
}

/// Creates and releases dereferenceable URLs for script text
///
/// The browser implementation is `Blob` + `URL.createObjectURL`.
pub trait ResourceStore {
    /// Wrap `content` into a resource and return its URL
    fn create(&self, content: &str, content_type: &str) -> StubResult<String>;

    /// Release a URL; unknown URLs are ignored
    fn revoke(&self, url: &str);
}

/// A resource held by [`MemoryResourceStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResource {
    /// Script text
    pub content: String,
    /// MIME type
    pub content_type: String,
}

/// In-process resource store issuing `blob:<origin>/<uuid>` handles
///
/// Clones share the same backing table.
#[derive(Debug, Clone)]
pub struct MemoryResourceStore {
    origin: String,
    resources: Rc<RefCell<HashMap<String, StoredResource>>>,
}

impl Default for MemoryResourceStore {
    fn default() -> Self {
        Self::new("http://localhost")
    }
}

impl MemoryResourceStore {
    /// Create a store whose handles look like they belong to `origin`
    #[must_use]
    pub fn new(origin: &str) -> Self {
        Self {
            origin: origin.trim_end_matches('/').to_string(),
            resources: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    /// Look up the script text behind a handle
    #[must_use]
    pub fn content(&self, url: &str) -> Option<String> {
        self.resources.borrow().get(url).map(|r| r.content.clone())
    }

    /// Look up the full resource behind a handle
    #[must_use]
    pub fn resource(&self, url: &str) -> Option<StoredResource> {
        self.resources.borrow().get(url).cloned()
    }

    /// Number of handles created and not yet revoked
    #[must_use]
    pub fn live_handles(&self) -> usize {
        self.resources.borrow().len()
    }

    /// Check whether a URL was issued by this store and is still live
    #[must_use]
    pub fn is_live(&self, url: &str) -> bool {
        self.resources.borrow().contains_key(url)
    }
}

impl ResourceStore for MemoryResourceStore {
    fn create(&self, content: &str, content_type: &str) -> StubResult<String> {
        let url = format!("blob:{}/{}", self.origin, Uuid::new_v4());
        self.resources.borrow_mut().insert(
            url.clone(),
            StoredResource {
                content: content.to_string(),
                content_type: content_type.to_string(),
            },
        );
        Ok(url)
    }

    fn revoke(&self, url: &str) {
        self.resources.borrow_mut().remove(url);
    }
}

/// A synthesized substitute script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstituteResource {
    /// Loadable URL of the substitute
    pub url: String,
    /// Callback the script invokes
    pub callback: String,
    /// Script text
    pub content: String,
}

/// Builds substitute scripts and registers them with a store
pub struct Synthesizer {
    formatter: Box<dyn PayloadFormatter>,
    store: Rc<dyn ResourceStore>,
    content_type: String,
}

impl fmt::Debug for Synthesizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Synthesizer")
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

impl Synthesizer {
    /// Create a synthesizer with the JSONP formatter
    #[must_use]
    pub fn new(store: Rc<dyn ResourceStore>) -> Self {
        Self {
            formatter: Box::new(JsonpFormatter),
            store,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
        }
    }

    /// Replace the payload formatter
    #[must_use]
    pub fn with_formatter(self, formatter: impl PayloadFormatter + 'static) -> Self {
        self.with_boxed_formatter(Box::new(formatter))
    }

    #[must_use]
    pub(crate) fn with_boxed_formatter(mut self, formatter: Box<dyn PayloadFormatter>) -> Self {
        self.formatter = formatter;
        self
    }

    /// Set the MIME type of created resources
    #[must_use]
    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = content_type.to_string();
        self
    }

    /// Synthesize a substitute script for `callback`
    ///
    /// Every call allocates a fresh handle, even for identical inputs.
    pub fn synthesize(&self, callback: &str, payload: &Value) -> StubResult<SubstituteResource> {
        if callback.is_empty() {
            return Err(StubError::Format {
                message: "callback name is empty".to_string(),
            });
        }
        let content = self.formatter.format(callback, payload)?;
        let url = self.store.create(&content, &self.content_type)?;
        Ok(SubstituteResource {
            url,
            callback: callback.to_string(),
            content,
        })
    }

    /// Create a substitute URL for `payload` delivered to `callback`
    pub fn source_url_for(&self, payload: &Value, callback: &str) -> StubResult<String> {
        self.synthesize(callback, payload).map(|r| r.url)
    }

    /// Release a substitute URL
    pub fn revoke(&self, url: &str) {
        self.store.revoke(url);
    }
}

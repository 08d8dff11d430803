//! Test harness wiring an interceptor to a mock document.

use super::document::{ElementId, MockDocument};
use crate::config::StubConfig;
use crate::diagnostics::RecordingSink;
use crate::interceptor::SourceInterceptor;
use crate::synth::MemoryResourceStore;
use std::rc::Rc;

/// An installed interceptor over a [`MockDocument`], with inspectable
/// resource store and diagnostics
///
/// # Example
///
/// ```rust
/// use jsonp_stub::mock::StubHarness;
/// use jsonp_stub::UrlPattern;
/// use serde_json::json;
///
/// let mut harness = StubHarness::new();
/// harness
///     .interceptor
///     .register(UrlPattern::contains("ad.js").shared(), json!({"id": 1}));
///
/// let script = harness.assign("https://ads.example/ad.js?cbfn=render");
/// harness.assert_substituted(script, "render");
/// ```
#[derive(Debug)]
pub struct StubHarness {
    /// The document under test
    pub document: MockDocument,
    /// The installed interceptor
    pub interceptor: SourceInterceptor,
    /// Store backing substitute URLs
    pub store: MemoryResourceStore,
    /// Everything reported on the diagnostic channel
    pub diagnostics: RecordingSink,
}

impl Default for StubHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl StubHarness {
    /// Create a harness with default config, already installed
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(StubConfig::default())
    }

    /// Create a harness with custom config, already installed
    #[must_use]
    pub fn with_config(config: StubConfig) -> Self {
        let store = MemoryResourceStore::new(&config.blob_origin);
        let diagnostics = RecordingSink::new();
        let interceptor = SourceInterceptor::builder()
            .config(config)
            .store(Rc::new(store.clone()))
            .diagnostics(Rc::new(diagnostics.clone()))
            .build();
        let mut document = MockDocument::new();
        interceptor.install(&mut document);
        Self {
            document,
            interceptor,
            store,
            diagnostics,
        }
    }

    /// Create a script element and assign its `src`
    pub fn assign(&mut self, src: &str) -> ElementId {
        let id = self.document.create_script();
        self.document.set_src(id, src);
        id
    }

    /// Effective `src` of an element
    #[must_use]
    pub fn src_of(&self, id: ElementId) -> String {
        self.document.src(id)
    }

    /// Script text behind an element's substitute URL
    #[must_use]
    pub fn content_of(&self, id: ElementId) -> Option<String> {
        self.store.content(&self.document.src(id))
    }

    /// Assert the element was given a substitute calling `callback`
    ///
    /// # Panics
    ///
    /// Panics if the element's source is not a live substitute or the
    /// script does not call `callback`.
    #[allow(clippy::panic)]
    pub fn assert_substituted(&self, id: ElementId, callback: &str) {
        let src = self.src_of(id);
        let content = self
            .store
            .content(&src)
            .unwrap_or_else(|| panic!("Expected substitute URL, got '{src}'"));
        assert!(
            content.starts_with(&format!("{callback}(")),
            "Substitute does not call '{callback}': {content}"
        );
    }

    /// Assert the element kept its assigned source
    ///
    /// # Panics
    ///
    /// Panics if the source was changed.
    pub fn assert_passed_through(&self, id: ElementId, original: &str) {
        let actual = self.src_of(id);
        assert_eq!(
            actual, original,
            "Expected pass-through of '{original}', got '{actual}'"
        );
    }
}

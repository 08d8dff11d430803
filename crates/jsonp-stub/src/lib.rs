//! jsonp-stub: Script Source Interception with JSONP Response Substitution
//!
//! Intercepts assignments to `script.src`, and when the URL matches a
//! registered stub, replaces it with a locally created script that calls the
//! page's JSONP callback with canned data. Unmatched sources pass through
//! untouched. Meant for test harnesses and offline playback of pages that
//! load ads or other JSONP content.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  script.src = url                                                │
//! │        │                                                         │
//! │        ▼                                                         │
//! │  ┌─────────────┐  consume  ┌──────────────┐                      │
//! │  │ Source      │──────────►│ Stub         │  first live match    │
//! │  │ Interceptor │           │ Registry     │                      │
//! │  └─────────────┘           └──────────────┘                      │
//! │        │ callback = params[callback_key]                         │
//! │        ▼                                                         │
//! │  ┌─────────────┐  create   ┌──────────────┐                      │
//! │  │ Synthesizer │──────────►│ Resource     │  blob:<origin>/<id>  │
//! │  └─────────────┘           │ Store        │                      │
//! │                            └──────────────┘                      │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use jsonp_stub::prelude::*;
//! use serde_json::json;
//!
//! let mut document = MockDocument::new();
//! let interceptor = SourceInterceptor::new();
//! interceptor.install(&mut document);
//!
//! let pattern = UrlPattern::contains("adserver").shared();
//! interceptor.register_with(pattern.clone(), json!({"creative": "c1"}), 2, "cb");
//!
//! let script = document.create_script();
//! document.set_src(script, "https://adserver.example/ad?cb=render");
//! assert!(document.src(script).starts_with("blob:"));
//! assert_eq!(interceptor.remaining_uses(&pattern), Some(1));
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

/// Rule files and defaults (YAML/JSON)
#[allow(clippy::missing_errors_doc)]
pub mod config;
pub mod diagnostics;
pub mod dom;
/// Source interception and dispatch
#[allow(clippy::missing_errors_doc)]
pub mod interceptor;
#[cfg(not(target_arch = "wasm32"))]
pub mod logging;
pub mod mock;
pub mod params;
#[allow(clippy::missing_errors_doc)]
pub mod pattern;
pub mod registry;
mod result;
/// Response synthesis and resource stores
#[allow(clippy::missing_errors_doc)]
pub mod synth;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use config::{PatternSpec, RuleSpec, StubConfig, StubFile};
pub use diagnostics::{
    Diagnostic, DiagnosticKind, DiagnosticLevel, DiagnosticSink, RecordingSink, TracingSink,
};
pub use dom::{AccessorHost, ScriptElement, SourceAccessor, SHADOW_SRC_FIELD};
pub use interceptor::{
    InstallState, InterceptionContext, Resolution, SourceInterceptor, SourceInterceptorBuilder,
};
pub use params::{decode_component, extract_params, UrlParams};
pub use pattern::{same_pattern, Pattern, PredicatePattern, SharedPattern, UrlPattern};
pub use registry::{ConsumedRule, StubRegistry, StubRule, DEFAULT_CALLBACK_KEY, DEFAULT_USES};
pub use result::{StubError, StubResult};
pub use synth::{
    JsonpFormatter, MemoryResourceStore, PayloadFormatter, ResourceStore, StoredResource,
    SubstituteResource, Synthesizer, DEFAULT_CONTENT_TYPE,
};
#[cfg(target_arch = "wasm32")]
pub use web::{install_page_interceptor, BlobResourceStore, ScriptPrototypeHost};

/// Commonly used types
pub mod prelude {
    pub use super::config::{StubConfig, StubFile};
    pub use super::diagnostics::{DiagnosticKind, RecordingSink};
    pub use super::interceptor::{Resolution, SourceInterceptor};
    pub use super::mock::{MockDocument, StubHarness};
    pub use super::pattern::{Pattern, SharedPattern, UrlPattern};
    pub use super::registry::StubRule;
    pub use super::result::{StubError, StubResult};
    pub use super::synth::{MemoryResourceStore, ResourceStore};
}

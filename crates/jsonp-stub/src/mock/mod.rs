//! Native stand-ins for the page, for testing interception without a browser.
//!
//! ## Example
//!
//! ```rust
//! use jsonp_stub::mock::StubHarness;
//! use jsonp_stub::UrlPattern;
//! use serde_json::json;
//!
//! let mut harness = StubHarness::new();
//! harness
//!     .interceptor
//!     .register(UrlPattern::prefix("https://ads.").shared(), json!({"ok": true}));
//!
//! let ad = harness.assign("https://ads.example/fill.js?cbfn=onFill");
//! let app = harness.assign("https://cdn.example/app.js");
//!
//! harness.assert_substituted(ad, "onFill");
//! harness.assert_passed_through(app, "https://cdn.example/app.js");
//! ```

pub mod document;
pub mod harness;
pub mod strategies;

pub use document::{ElementId, MockDocument, MockScriptElement};
pub use harness::StubHarness;
#[cfg(feature = "proptest")]
pub use strategies::{bare_url, callback_name, jsonp_url};
pub use strategies::{common_callback_names, edge_case_urls, JsonpUrl};

//! Generators for script URLs and callback names.
//!
//! The fixed lists are always available; the proptest strategies need the
//! `proptest` feature.
//!
//! ```rust,ignore
//! proptest! {
//!     #[test]
//!     fn prop_callback_round_trips(cb in callback_name(), url in jsonp_url("cbfn")) {
//!         let mut harness = StubHarness::new();
//!         harness.interceptor.register(UrlPattern::Any.shared(), json!(null));
//!         let id = harness.assign(&url.with_callback(&cb));
//!         harness.assert_substituted(id, &cb);
//!     }
//! }
//! ```

#[cfg(feature = "proptest")]
use proptest::prelude::*;

/// Script URLs whose parameter handling is easy to get wrong
#[must_use]
pub fn edge_case_urls() -> Vec<&'static str> {
    vec![
        "ad.js",
        "ad.js?",
        "ad.js?&&",
        "ad.js?cbfn",
        "ad.js?cbfn=",
        "ad.js?cbfn=a=b",
        "ad.js?cbfn=%",
        "ad.js?cbfn=%zz",
        "ad.js?cbfn=%E0%A4",
        "ad.js?cbfn=a+b",
        "ad.js;cbfn=matrix",
        "ad.js?x=1;cbfn=late",
        "ad.js?cbfn=first&cbfn=last",
        "ad.js#cbfn=fragment",
    ]
}

/// Callback names seen in the wild
#[must_use]
pub fn common_callback_names() -> Vec<&'static str> {
    vec![
        "cb",
        "jsonp_1",
        "jQuery1102_1697040000000",
        "window.ads.render",
        "__gpt_cb",
        "$cb",
    ]
}

/// A JSONP URL split around its callback value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonpUrl {
    /// Everything before the callback value, ending in `key=`
    pub head: String,
    /// Everything after the callback value
    pub tail: String,
}

impl JsonpUrl {
    /// Join with a callback value
    #[must_use]
    pub fn with_callback(&self, callback: &str) -> String {
        format!("{}{}{}", self.head, callback, self.tail)
    }
}

/// Generate a JavaScript-identifier-like callback name
///
/// Names only use characters that survive URL parameter decoding unchanged.
#[cfg(feature = "proptest")]
pub fn callback_name() -> impl Strategy<Value = String> {
    "[A-Za-z_$][A-Za-z0-9_$]{0,15}(\\.[A-Za-z_$][A-Za-z0-9_$]{0,7}){0,2}"
}

/// Generate a script URL carrying the callback under `key` among other params
#[cfg(feature = "proptest")]
pub fn jsonp_url(key: &'static str) -> impl Strategy<Value = JsonpUrl> {
    (
        prop_oneof![Just("https://ads.example"), Just("http://cdn.example:8080")],
        "(/[a-z0-9]{1,8}){1,3}\\.js",
        prop_oneof![Just('?'), Just(';')],
        proptest::collection::vec(("[a-z]{1,6}", "[a-z0-9]{0,6}"), 0..3),
        proptest::collection::vec(("[a-z]{1,6}", "[a-z0-9]{0,6}"), 0..3),
    )
        .prop_map(move |(origin, path, sep, before, after)| {
            let fmt = |pairs: Vec<(String, String)>| -> Vec<String> {
                pairs
                    .into_iter()
                    .filter(|(k, _)| k != key)
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect()
            };
            let mut head = format!("{origin}{path}{sep}");
            for pair in fmt(before) {
                head.push_str(&pair);
                head.push('&');
            }
            head.push_str(key);
            head.push('=');
            let tail: String = fmt(after).iter().map(|p| format!("&{p}")).collect();
            JsonpUrl { head, tail }
        })
}

/// Generate a URL with no parameter separator at all
#[cfg(feature = "proptest")]
pub fn bare_url() -> impl Strategy<Value = String> {
    "https://[a-z]{1,8}\\.example(/[a-z0-9]{1,8}){0,3}\\.js"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::UrlParams;

    #[test]
    fn test_edge_cases_never_panic() {
        for url in edge_case_urls() {
            let _ = UrlParams::parse(url);
        }
    }

    #[test]
    fn test_with_callback() {
        let url = JsonpUrl {
            head: "ad.js?cbfn=".to_string(),
            tail: "&z=1".to_string(),
        };
        assert_eq!(url.with_callback("cb"), "ad.js?cbfn=cb&z=1");
    }

    #[cfg(feature = "proptest")]
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_generated_url_carries_callback(
                cb in callback_name(),
                url in jsonp_url("cbfn"),
            ) {
                let params = UrlParams::parse(&url.with_callback(&cb)).map_err(|e| {
                    TestCaseError::fail(e.to_string())
                })?;
                prop_assert_eq!(params.get("cbfn"), Some(cb.as_str()));
            }

            #[test]
            fn prop_bare_url_has_no_params(url in bare_url()) {
                let params = UrlParams::parse(&url).map_err(|e| {
                    TestCaseError::fail(e.to_string())
                })?;
                prop_assert!(params.is_empty());
            }
        }
    }
}

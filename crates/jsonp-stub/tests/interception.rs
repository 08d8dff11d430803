//! End-to-end interception through the mock document.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use jsonp_stub::mock::{edge_case_urls, MockDocument, StubHarness};
use jsonp_stub::prelude::*;
use jsonp_stub::{extract_params, DiagnosticLevel, PredicatePattern};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::rc::Rc;

fn adserver_pattern() -> Rc<UrlPattern> {
    UrlPattern::regex(r"adserver\.example/.*").unwrap().shared()
}

mod scenario_tests {
    use super::*;

    #[test]
    fn test_banner_ad_substituted_once() {
        jsonp_stub::logging::init_logging(&StubConfig::default());
        let mut harness = StubHarness::new();
        harness.interceptor.register_with(
            adserver_pattern(),
            json!({"slot": "banner"}),
            1,
            "cb",
        );

        let src = "https://adserver.example/ad?cb=loadAd";
        let first = harness.assign(src);
        let second = harness.assign(src);

        let substitute = harness.src_of(first);
        assert_ne!(substitute, src);
        assert!(substitute.starts_with("blob:"));
        assert_eq!(
            harness.content_of(first).as_deref(),
            Some(r#"loadAd({"slot":"banner"});"#)
        );
        assert_eq!(
            harness.document.get_attribute(first, "src"),
            Some(substitute)
        );

        harness.assert_passed_through(second, src);
        assert!(harness.diagnostics.is_empty());
    }

    #[test]
    fn test_page_scripts_untouched_alongside_ads() {
        let mut harness = StubHarness::new();
        harness.interceptor.register_with(adserver_pattern(), json!([]), 5, "cb");

        let app = harness.assign("https://cdn.example/app.js?v=3");
        let ad = harness.assign("https://adserver.example/ad?cb=fill");

        harness.assert_passed_through(app, "https://cdn.example/app.js?v=3");
        harness.assert_substituted(ad, "fill");
        assert_eq!(harness.store.live_handles(), 1);
    }

    #[test]
    fn test_each_substitution_gets_its_own_resource() {
        let mut harness = StubHarness::new();
        harness.interceptor.register_with(UrlPattern::Any.shared(), json!(1), 3, "cbfn");

        let ids: Vec<_> = (0..3)
            .map(|i| harness.assign(&format!("ad.js?cbfn=cb{i}")))
            .collect();
        let srcs: Vec<_> = ids.iter().map(|id| harness.src_of(*id)).collect();

        assert_eq!(harness.store.live_handles(), 3);
        assert_ne!(srcs[0], srcs[1]);
        assert_ne!(srcs[1], srcs[2]);
        for (i, id) in ids.iter().enumerate() {
            harness.assert_substituted(*id, &format!("cb{i}"));
        }
    }
}

mod property_tests {
    use super::*;

    #[test]
    fn test_install_is_idempotent() {
        let mut harness = StubHarness::new();
        harness.interceptor.install(&mut harness.document);

        assert_eq!(harness.document.accessor_definitions(), 1);
        let warnings = harness.diagnostics.of_kind(DiagnosticKind::AlreadyInstalled);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, DiagnosticLevel::Warn);
    }

    #[test]
    fn test_one_shot_exhaustion() {
        let mut harness = StubHarness::new();
        let pattern = UrlPattern::contains("ad.js").shared();
        harness.interceptor.register(pattern.clone(), json!({}));

        let hit = harness.assign("ad.js?cbfn=a");
        let miss = harness.assign("ad.js?cbfn=a");

        harness.assert_substituted(hit, "a");
        harness.assert_passed_through(miss, "ad.js?cbfn=a");
        assert_eq!(harness.interceptor.remaining_uses(&pattern), Some(0));
    }

    #[test]
    fn test_callback_extraction() {
        let params = extract_params("ad.js?zone=1&cbfn=myCb").unwrap();
        let expected: HashMap<String, String> = [("zone", "1"), ("cbfn", "myCb")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(params, expected);

        let mut harness = StubHarness::new();
        harness
            .interceptor
            .register(UrlPattern::contains("ad.js").shared(), json!({"id": 9}));
        let id = harness.assign("ad.js?zone=1&cbfn=myCb");
        assert!(harness.content_of(id).unwrap().contains("myCb"));
    }

    #[test]
    fn test_missing_callback_passes_through_and_spends_use() {
        let mut harness = StubHarness::new();
        let pattern = UrlPattern::contains("ad.js").shared();
        harness
            .interceptor
            .register_with(pattern.clone(), json!({}), 2, "cbfn");

        let id = harness.assign("ad.js?zone=1");

        harness.assert_passed_through(id, "ad.js?zone=1");
        assert_eq!(harness.interceptor.remaining_uses(&pattern), Some(1));
        assert_eq!(harness.store.live_handles(), 0);
        assert!(harness.diagnostics.is_empty());
    }

    #[test]
    fn test_decode() {
        let params = extract_params("x.js?name=hello%20world").unwrap();
        assert_eq!(params.get("name").map(String::as_str), Some("hello world"));
    }

    #[test]
    fn test_first_registered_wins() {
        let interceptor = SourceInterceptor::new();
        let narrow = UrlPattern::contains("ad.js").shared();
        let broad = UrlPattern::Any.shared();
        interceptor.register_with(narrow.clone(), json!("narrow"), 1, "cbfn");
        interceptor.register_with(broad.clone(), json!("broad"), 10, "cbfn");

        let Resolution::Substituted(resource) = interceptor.try_resolve("ad.js?cbfn=cb").unwrap()
        else {
            panic!("expected substitution");
        };
        assert_eq!(resource.content, r#"cb("narrow");"#);
        assert_eq!(interceptor.remaining_uses(&narrow), Some(0));
        assert_eq!(interceptor.remaining_uses(&broad), Some(10));

        // Exhausted rules step aside for the next match
        let Resolution::Substituted(resource) = interceptor.try_resolve("ad.js?cbfn=cb").unwrap()
        else {
            panic!("expected substitution");
        };
        assert_eq!(resource.content, r#"cb("broad");"#);
    }

    proptest! {
        #[test]
        fn prop_unmatched_sources_pass_through(src in ".*") {
            let interceptor = SourceInterceptor::new();
            interceptor.register_with(
                Rc::new(PredicatePattern::new("never", |_| false)),
                json!({}),
                u32::MAX,
                "cbfn",
            );
            interceptor.register(UrlPattern::AnyOf(vec![]).shared(), json!({}));

            prop_assert_eq!(interceptor.resolve(&src), src);
        }

        #[test]
        fn prop_exhausted_rules_never_match(
            uses in 0u32..4,
            callback in "[A-Za-z_][A-Za-z0-9_]{0,10}",
        ) {
            let interceptor = SourceInterceptor::new();
            interceptor.register_with(UrlPattern::Any.shared(), json!(null), uses, "cbfn");

            let src = format!("ad.js?cbfn={callback}");
            let substituted = (0..uses + 2)
                .filter(|_| interceptor.resolve(&src) != src)
                .count();
            prop_assert_eq!(substituted, uses as usize);
        }
    }
}

mod failure_tests {
    use super::*;

    #[test]
    fn test_malformed_parameter_reported() {
        let mut harness = StubHarness::new();
        harness
            .interceptor
            .register(UrlPattern::contains("ad.js").shared(), json!({}));

        let id = harness.assign("ad.js?cbfn=%zz");

        harness.assert_passed_through(id, "ad.js?cbfn=%zz");
        let reported = harness.diagnostics.of_kind(DiagnosticKind::MalformedParameter);
        assert_eq!(reported.len(), 1);
        assert_eq!(reported[0].source.as_deref(), Some("ad.js?cbfn=%zz"));
    }

    #[test]
    fn test_non_configurable_host() {
        let sink = RecordingSink::new();
        let interceptor = SourceInterceptor::builder()
            .diagnostics(Rc::new(sink.clone()))
            .build();
        let mut document = MockDocument::non_configurable();
        interceptor.install(&mut document);
        interceptor.register(UrlPattern::Any.shared(), json!({}));

        let script = document.create_script();
        document.set_src(script, "ad.js?cbfn=cb");

        assert!(!interceptor.is_installed());
        assert_eq!(document.src(script), "ad.js?cbfn=cb");
        assert_eq!(sink.of_kind(DiagnosticKind::InstallRefused).len(), 1);
        // The rule was never reached
        assert_eq!(interceptor.rule_count(), 1);
    }

    #[test]
    fn test_second_interceptor_on_same_document() {
        let mut harness = StubHarness::new();
        harness
            .interceptor
            .register(UrlPattern::contains("ad.js").shared(), json!({"from": "first"}));

        let sink = RecordingSink::new();
        let second = SourceInterceptor::builder()
            .diagnostics(Rc::new(sink.clone()))
            .build();
        second.register(UrlPattern::Any.shared(), json!({"from": "second"}));
        second.install(&mut harness.document);

        assert!(!second.is_installed());
        assert_eq!(harness.document.accessor_definitions(), 1);
        let warnings = sink.of_kind(DiagnosticKind::AlreadyInstalled);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, DiagnosticLevel::Warn);

        let id = harness.assign("ad.js?cbfn=cb");
        harness.assert_substituted(id, "cb");
        assert!(harness.content_of(id).unwrap().contains("first"));
        assert_eq!(second.rule_count(), 1);
    }

    #[test]
    fn test_refused_install_is_not_retried() {
        let sink = RecordingSink::new();
        let interceptor = SourceInterceptor::builder()
            .diagnostics(Rc::new(sink.clone()))
            .build();
        interceptor.install(&mut MockDocument::non_configurable());

        let mut document = MockDocument::new();
        interceptor.install(&mut document);

        assert!(!interceptor.is_installed());
        assert!(!document.is_intercepted());
        assert_eq!(document.accessor_definitions(), 0);
        assert_eq!(sink.of_kind(DiagnosticKind::InstallRefused).len(), 2);
    }

    #[test]
    fn test_edge_case_urls_never_escape_as_errors() {
        let mut harness = StubHarness::new();
        for src in edge_case_urls() {
            harness
                .interceptor
                .register(UrlPattern::exact(src).shared(), Value::Null);
            let id = harness.assign(src);
            let actual = harness.src_of(id);
            assert!(
                actual == src || harness.store.is_live(&actual),
                "{src} resolved to {actual}"
            );
        }
    }

    #[test]
    fn test_clear_all_stops_substitution() {
        let mut harness = StubHarness::new();
        harness
            .interceptor
            .register_with(UrlPattern::Any.shared(), json!({}), 10, "cbfn");
        harness.interceptor.clear_all();

        let id = harness.assign("ad.js?cbfn=cb");
        harness.assert_passed_through(id, "ad.js?cbfn=cb");
    }
}

//! Integration property tests for request-guard.
//!
//! These tests validate cross-module invariants of the cookie jar, the CSRF
//! guard and content negotiation using property-based testing.

use std::sync::Arc;

use http::Method;
use proptest::prelude::*;
use request_guard::web::{protect, ExtractContext, RequestAdapter};
use request_guard::{
    compare_accept_entries, parse_accept_header, parse_accept_languages, rank_accept_types,
    Config, Cookie, CookieJar, CookieJarConfig, KeyedHashSigner, Signer,
};

fn signer() -> Arc<dyn Signer> {
    Arc::new(KeyedHashSigner::derive("property tests", b"server secret"))
}

// Strategy: Generate arbitrary media ranges, including wildcards and odd q values
fn arb_media_range() -> impl Strategy<Value = String> {
    (
        prop_oneof![Just("text"), Just("application"), Just("image"), Just("*")],
        prop_oneof![Just("html"), Just("json"), Just("xhtml+xml"), Just("*")],
        prop::option::of(prop_oneof![
            Just("0".to_string()),
            Just("1".to_string()),
            Just("abc".to_string()),
            Just("-0.5".to_string()),
            Just("7".to_string()),
            (0u32..=1000).prop_map(|n| format!("{}", n as f32 / 1000.0)),
        ]),
        prop::option::of(Just("level=1")),
    )
        .prop_map(|(main, sub, q, param)| {
            let mut range = format!("{main}/{sub}");
            if let Some(param) = param {
                range.push(';');
                range.push_str(param);
            }
            if let Some(q) = q {
                range.push_str(";q=");
                range.push_str(&q);
            }
            range
        })
}

fn arb_safe_method() -> impl Strategy<Value = Method> {
    prop_oneof![
        Just(Method::GET),
        Just(Method::HEAD),
        Just(Method::OPTIONS),
        Just(Method::TRACE),
    ]
}

proptest! {
    /// Property: a value written by a validating jar is read back unchanged
    #[test]
    fn proptest_signed_cookie_round_trip(
        name in "[a-z][a-z0-9_]{0,11}",
        value in "[ -~]{0,40}",
    ) {
        let config = CookieJarConfig { validation: true };
        let first = RequestAdapter::new("req-1".to_string()).extract_context();
        let mut jar = CookieJar::from_request(&first, config.clone(), signer());
        jar.set(Cookie::new(name.clone(), value.clone()));

        let header = jar.set_cookie_headers().remove(0);
        let pair = header.split(';').next().unwrap();
        let request = http::Request::builder()
            .header(http::header::COOKIE, pair)
            .body(Vec::<u8>::new())
            .unwrap();

        let jar = CookieJar::from_request(&request.extract_context(), config, signer());
        prop_assert_eq!(jar.value(&name), Some(value.as_str()));
    }

    /// Property: any change to a signed transport value makes the cookie absent
    #[test]
    fn proptest_tampered_cookie_is_absent(
        value in "[a-zA-Z0-9]{1,32}",
        position in any::<prop::sample::Index>(),
        replacement in "[a-zA-Z0-9]",
    ) {
        let envelope = signer().sign(value.as_bytes());
        let index = position.index(envelope.len());
        // Hex decoding is case-insensitive, so a case swap is not a change
        prop_assume!(!envelope[index..index + 1].eq_ignore_ascii_case(&replacement));

        let mut tampered = envelope.clone();
        tampered.replace_range(index..index + 1, &replacement);

        let mut adapter = RequestAdapter::new("req-tamper".to_string());
        adapter.add_cookie("sid", &tampered);
        let jar = CookieJar::from_request(
            &adapter.extract_context(),
            CookieJarConfig { validation: true },
            signer(),
        );

        prop_assert!(!jar.contains("sid"));
    }

    /// Property: parsed quality values always lie in [0, 1]
    #[test]
    fn proptest_quality_is_clamped(ranges in prop::collection::vec(arb_media_range(), 0..8)) {
        let header = ranges.join(", ");

        for entry in parse_accept_header(&header) {
            prop_assert!((0.0..=1.0).contains(&entry.q));
        }

        let languages = header.replace('/', "-");
        for preference in parse_accept_languages(&languages) {
            prop_assert!((0.0..=1.0).contains(&preference.q));
        }
    }

    /// Property: ranking does not depend on the order of the header
    #[test]
    fn proptest_ranking_is_order_independent(
        ranges in prop::collection::vec(arb_media_range(), 1..8).prop_shuffle(),
    ) {
        let forward = rank_accept_types(parse_accept_header(&ranges.join(",")));
        let mut reversed_ranges = ranges.clone();
        reversed_ranges.reverse();
        let backward = rank_accept_types(parse_accept_header(&reversed_ranges.join(",")));

        prop_assert_eq!(forward.len(), backward.len());
        for (a, b) in forward.iter().zip(&backward) {
            prop_assert_eq!(compare_accept_entries(a, b), std::cmp::Ordering::Equal);
        }
        for pair in forward.windows(2) {
            prop_assert_ne!(compare_accept_entries(&pair[0], &pair[1]), std::cmp::Ordering::Greater);
        }
    }

    /// Property: safe methods pass CSRF validation whatever the client sends
    #[test]
    fn proptest_safe_methods_always_pass(
        method in arb_safe_method(),
        cookie in prop::option::of("[a-zA-Z0-9]{0,20}"),
        submitted in prop::option::of("[a-zA-Z0-9]{0,20}"),
    ) {
        let mut adapter = RequestAdapter::new("req-safe".to_string());
        adapter.set_method(method);
        if let Some(cookie) = cookie {
            adapter.add_cookie("CSRF_TOKEN", &cookie);
        }
        if let Some(submitted) = submitted {
            adapter.add_header("X-CSRF-Token", &submitted);
        }

        let protected = protect(&adapter.extract_context(), &Config::default(), signer());
        prop_assert!(protected.is_ok());
        prop_assert!(!protected.unwrap().token().is_empty());
    }

    /// Property: a mutating request passes only when the echoed token equals the cookie
    #[test]
    fn proptest_mutating_requests_need_matching_token(
        cookie in "[a-zA-Z0-9]{1,20}",
        submitted in "[a-zA-Z0-9]{1,20}",
    ) {
        let mut adapter = RequestAdapter::new("req-post".to_string());
        adapter.set_method(Method::POST);
        adapter.add_cookie("CSRF_TOKEN", &cookie);
        adapter.add_body_param("CSRF_TOKEN", &submitted);

        let result = protect(&adapter.extract_context(), &Config::default(), signer());
        prop_assert_eq!(result.is_ok(), cookie == submitted);
    }
}

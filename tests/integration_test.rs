use std::sync::Arc;

use http::Method;
use request_guard::web::{ExtractContext, RequestAdapter};
use request_guard::{
    Config, Cookie, CookieJar, CookieJarConfig, CsrfGuard, Error, KeyedHashSigner, SameSite,
    Secret, Signer,
};

fn signer() -> Arc<dyn Signer> {
    Arc::new(KeyedHashSigner::derive("integration", b"0123456789"))
}

#[test]
fn secret_is_fully_redacted() {
    let token = Secret::new("sk-secret123".to_string());

    let debug_out = format!("{:?}", token);
    assert_eq!(debug_out, "[REDACTED]");
    assert!(!debug_out.contains("String"));

    assert_eq!(format!("{}", token), "[REDACTED]");
}

#[test]
fn signer_debug_hides_key() {
    let signer = KeyedHashSigner::new([7; 32]);
    let output = format!("{:?}", signer);

    assert!(output.contains("[REDACTED]"));
    assert!(!output.contains("7, 7"));
}

#[test]
fn config_from_toml_applies_every_section() {
    let config = Config::from_toml_str(
        r#"
        [csrf]
        token-name = "XSRF"
        legacy-envelope = false

        [csrf.cookie]
        lifetime-secs = 3600
        secure = true
        same-site = "strict"

        [cookies]
        validation = true
        "#,
    )
    .unwrap();

    assert_eq!(config.csrf.token_name, "XSRF");
    assert!(config.csrf.enabled);
    assert!(!config.csrf.legacy_envelope);
    assert_eq!(config.csrf.cookie.lifetime_secs, Some(3600));
    assert_eq!(config.csrf.cookie.same_site, Some(SameSite::Strict));
    assert!(config.cookies.validation);
}

#[test]
fn config_rejects_unknown_keys() {
    let result = Config::from_toml_str("[csrf]\ntoken = \"x\"\n");
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn cookie_set_in_one_request_is_readable_in_the_next() {
    let config = CookieJarConfig { validation: true };

    let first = RequestAdapter::new("req-1".to_string()).extract_context();
    let mut jar = CookieJar::from_request(&first, config.clone(), signer());
    jar.set(Cookie::new("cart", "42 items"));
    let header = jar.set_cookie_headers().remove(0);

    // Round-trip through a real Cookie header
    let pair = header.split(';').next().unwrap().to_string();
    let request = http::Request::builder()
        .header(http::header::COOKIE, pair)
        .body(Vec::<u8>::new())
        .unwrap();

    let second = request.extract_context();
    let jar = CookieJar::from_request(&second, config, signer());
    assert_eq!(jar.value("cart"), Some("42 items"));
}

#[test]
fn cookie_signed_with_another_key_is_absent() {
    let other = KeyedHashSigner::derive("integration", b"different");
    let mut adapter = RequestAdapter::new("req-forged".to_string());
    adapter.add_cookie("role", &other.sign(b"admin"));

    let jar = CookieJar::from_request(
        &adapter.extract_context(),
        CookieJarConfig { validation: true },
        signer(),
    );
    assert!(!jar.contains("role"));
}

#[test]
fn csrf_guard_rejects_cross_site_post() {
    let config = Config::default();
    let mut adapter = RequestAdapter::new("req-xsite".to_string());
    adapter.set_method(Method::POST);
    adapter.add_cookie("CSRF_TOKEN", "victim-token");
    adapter.add_body_param("CSRF_TOKEN", "attacker-guess");
    let request = adapter.extract_context();

    let mut jar = CookieJar::from_request(&request, config.cookies.clone(), signer());
    let guard = CsrfGuard::new(&config.csrf, &request, &mut jar);

    let error = guard.validate().unwrap_err();
    assert_eq!(error.status(), 400);
}

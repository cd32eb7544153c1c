//! Gateway retry-policy tests: 401 intercept, single retry, single-flight
//! refresh, envelope unwrapping.

use sweet_shop_client::{ApiError, CredentialStore};
use sweet_shop_core::{Email, Sweet};
use sweet_shop_integration_tests::MockShop;

fn email(s: &str) -> Email {
    Email::parse(s).expect("test email")
}

#[tokio::test]
async fn expired_token_is_refreshed_and_retried_transparently() {
    let shop = MockShop::spawn().await;
    let sdk = shop.sdk();
    shop.seed_sweet("Fudge", "chocolate", "3.50", 10);

    // Login hands out an already-expired access token; refresh grants a
    // valid one.
    shop.set_login_token_ttl(-60);
    sdk.session
        .login(&email("customer@shop.test"), "password123")
        .await
        .expect("login");

    // The caller sees a clean success, no error.
    let sweets: Vec<Sweet> = sdk.gateway.get("sweets").await.expect("list");
    assert_eq!(sweets.len(), 1);
    assert_eq!(shop.refresh_calls(), 1);

    // The rotated token is persisted and valid.
    let stored = sdk.store.load().expect("load").expect("credentials");
    assert!(!sweet_shop_client::token::is_expired(&stored.access_token));
}

#[tokio::test]
async fn failed_refresh_surfaces_original_401_and_clears_session() {
    let shop = MockShop::spawn().await;
    let sdk = shop.sdk();
    shop.seed_sweet("Fudge", "chocolate", "3.50", 10);

    shop.set_login_token_ttl(-60);
    sdk.session
        .login(&email("customer@shop.test"), "password123")
        .await
        .expect("login");
    shop.set_accept_refresh(false);

    let err = sdk
        .gateway
        .get::<Vec<Sweet>>("sweets")
        .await
        .expect_err("must fail");

    // The original 401 propagates, not the refresh failure.
    assert_eq!(err.status(), Some(401));

    // All session storage is gone.
    assert!(sdk.store.load().expect("load").is_none());
    assert!(!sdk.session.is_authenticated());
}

#[tokio::test]
async fn never_retries_more_than_once() {
    let shop = MockShop::spawn().await;
    let sdk = shop.sdk();
    shop.seed_sweet("Fudge", "chocolate", "3.50", 10);

    // Both login and refresh mint expired tokens: the retry fails again,
    // and the gateway must stop there instead of looping.
    shop.set_login_token_ttl(-60);
    shop.set_refresh_grant_ttl(-60);
    sdk.session
        .login(&email("customer@shop.test"), "password123")
        .await
        .expect("login");

    let err = sdk
        .gateway
        .get::<Vec<Sweet>>("sweets")
        .await
        .expect_err("must fail");

    assert_eq!(err.status(), Some(401));
    assert_eq!(shop.refresh_calls(), 1);
}

#[tokio::test]
async fn concurrent_401s_share_one_refresh() {
    let shop = MockShop::spawn().await;
    let sdk = shop.sdk();
    shop.seed_sweet("Fudge", "chocolate", "3.50", 10);

    shop.set_login_token_ttl(-60);
    sdk.session
        .login(&email("customer@shop.test"), "password123")
        .await
        .expect("login");

    let (a, b, c, d) = tokio::join!(
        sdk.gateway.get::<Vec<Sweet>>("sweets"),
        sdk.gateway.get::<Vec<Sweet>>("sweets"),
        sdk.gateway.get::<Vec<Sweet>>("sweets"),
        sdk.gateway.get::<Vec<Sweet>>("sweets"),
    );

    // Every caller succeeds, and the token was rotated exactly once.
    assert!(a.is_ok() && b.is_ok() && c.is_ok() && d.is_ok());
    assert_eq!(shop.refresh_calls(), 1);
}

#[tokio::test]
async fn enveloped_and_bare_bodies_deserialize_identically() {
    let shop = MockShop::spawn().await;
    let sdk = shop.sdk();
    shop.seed_sweet("Fudge", "chocolate", "3.50", 10);

    sdk.session
        .login(&email("customer@shop.test"), "password123")
        .await
        .expect("login");

    let bare: Vec<Sweet> = sdk.gateway.get("sweets").await.expect("bare");

    shop.set_enveloped(true);
    let wrapped: Vec<Sweet> = sdk.gateway.get("sweets").await.expect("wrapped");

    assert_eq!(bare, wrapped);
}

#[tokio::test]
async fn non_401_errors_pass_through_with_server_message() {
    let shop = MockShop::spawn().await;
    let sdk = shop.sdk();

    sdk.session
        .login(&email("customer@shop.test"), "password123")
        .await
        .expect("login");

    let err = sdk
        .gateway
        .get::<Sweet>("sweets/999")
        .await
        .expect_err("missing sweet");

    match err {
        ApiError::Server { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "Sweet not found");
        }
        other => panic!("expected server error, got {other}"),
    }
    // No refresh was attempted for a non-401.
    assert_eq!(shop.refresh_calls(), 0);
}

#[tokio::test]
async fn unauthenticated_requests_carry_no_bearer_and_fail_cleanly() {
    let shop = MockShop::spawn().await;
    let sdk = shop.sdk();

    let err = sdk
        .gateway
        .get::<Vec<Sweet>>("sweets")
        .await
        .expect_err("no session");

    // With no refresh token stored the 401 comes straight back.
    assert_eq!(err.status(), Some(401));
    assert_eq!(shop.refresh_calls(), 0);
}

//! Storefront account and checkout integration tests.
//!
//! Each test registers a fresh account, so the login rate limit applies.
//!
//! # Running
//!
//! ```bash
//! cargo test -p techshop-integration-tests --test storefront_checkout -- --ignored --test-threads=1
//! ```

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;
use techshop_integration_tests::{
    NOTEBOOK, NOTEBOOK_TITLE, PASSWORD, body, get, post_form, register, unique_username,
    visitor, visitor_without_redirects,
};

const FUTURE_DATE: &str = "2099-01-01";

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_anonymous_order_redirects_to_login() {
    let client = visitor_without_redirects();

    let resp = post_form(&client, "/make-order/", &[("first_name", "Ann")]).await;
    assert!(resp.status().is_redirection());
    assert_eq!(
        resp.headers().get("location").unwrap().to_str().unwrap(),
        "/login/"
    );
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_profile_requires_login() {
    let client = visitor_without_redirects();

    let resp = get(&client, "/profile/").await;
    assert!(resp.status().is_redirection());
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_registration_logs_in() {
    let client = visitor();
    let username = register(&client).await;

    let page = body(get(&client, "/profile/").await).await;
    assert!(page.contains(&username));
    assert!(page.contains("1 Test Street"));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_registration_rejects_duplicates_and_mismatch() {
    let client = visitor();
    let username = register(&client).await;
    let other = visitor();

    let page = body(
        post_form(
            &other,
            "/registration/",
            &[
                ("username", &username),
                ("email", &format!("{}@example.com", unique_username())),
                ("password", PASSWORD),
                ("confirm_password", "something-else-entirely"),
            ],
        )
        .await,
    )
    .await;

    assert!(page.contains("Passwords do not match"));
    assert!(!page.contains(PASSWORD));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_login_and_logout() {
    let client = visitor();
    let username = register(&client).await;
    get(&client, "/logout/").await;

    let page = body(
        post_form(
            &client,
            "/login/",
            &[("username", &username), ("password", "wrong-password")],
        )
        .await,
    )
    .await;
    assert!(page.contains("Invalid username or password"));

    let resp = post_form(
        &client,
        "/login/",
        &[("username", &username), ("password", PASSWORD)],
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let page = body(get(&client, "/profile/").await).await;
    assert!(page.contains(&username));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_checkout_with_empty_cart_goes_back_to_cart() {
    let client = visitor();

    let resp = get(&client, "/checkout/").await;
    assert!(resp.url().path().starts_with("/cart"));
    assert!(body(resp).await.contains("Your cart is empty"));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_delivery_requires_address() {
    let client = visitor();
    register(&client).await;
    get(&client, &format!("/add-to-cart/{NOTEBOOK}/")).await;

    let resp = post_form(
        &client,
        "/make-order/",
        &[
            ("first_name", "Ann"),
            ("last_name", "Buyer"),
            ("phone", "+1 555 0100"),
            ("address", ""),
            ("buying_type", "delivery"),
            ("order_date", FUTURE_DATE),
        ],
    )
    .await;
    assert!(resp.url().path().starts_with("/checkout"));

    let page = body(resp).await;
    assert!(page.contains("Address is required for delivery"));
    assert!(page.contains("+1 555 0100"));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_checkout_places_order_and_starts_new_cart() {
    let client = visitor();
    register(&client).await;
    get(&client, &format!("/add-to-cart/{NOTEBOOK}/")).await;
    post_form(&client, &format!("/change-qty/{NOTEBOOK}/"), &[("qty", "2")]).await;

    let page = body(get(&client, "/checkout/").await).await;
    assert!(page.contains(NOTEBOOK_TITLE));
    assert!(page.contains("$2,598.00"));

    let resp = post_form(
        &client,
        "/make-order/",
        &[
            ("first_name", "Ann"),
            ("last_name", "Buyer"),
            ("phone", "+1 555 0100"),
            ("address", "1 Test Street"),
            ("buying_type", "delivery"),
            ("order_date", FUTURE_DATE),
            ("comment", "Leave at the door"),
        ],
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.url().path(), "/");
    assert!(
        body(resp)
            .await
            .contains("Thank you for your order. A manager will contact you.")
    );

    let page = body(get(&client, "/cart/").await).await;
    assert!(page.contains("Your cart is empty"));

    let page = body(get(&client, "/profile/").await).await;
    assert!(page.contains("New order"));
    assert!(page.contains("$2,598.00"));
}

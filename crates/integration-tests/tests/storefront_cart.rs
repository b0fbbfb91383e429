//! Storefront catalog and cart integration tests.
//!
//! # Running
//!
//! ```bash
//! cargo test -p techshop-integration-tests --test storefront_cart -- --ignored
//! ```

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;
use techshop_integration_tests::{
    NOTEBOOK, NOTEBOOK_TITLE, OTHER_NOTEBOOK_TITLE, PHONE, body, get, post_form, visitor,
    visitor_without_redirects,
};

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_health_endpoints() {
    let client = visitor();

    let resp = get(&client, "/health").await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = get(&client, "/health/ready").await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_home_lists_catalog() {
    let client = visitor();

    let resp = get(&client, "/").await;
    assert_eq!(resp.status(), StatusCode::OK);

    let page = body(resp).await;
    assert!(page.contains(NOTEBOOK_TITLE));
    assert!(page.contains("Notebooks"));
    assert!(page.contains("Smartphones"));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_trailing_slash_is_optional() {
    let client = visitor();

    for path in ["/cart", "/cart/", "/category/notebooks", "/category/notebooks/"] {
        let resp = get(&client, path).await;
        assert_eq!(resp.status(), StatusCode::OK, "GET {path}");
    }
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_unknown_pages_are_not_found() {
    let client = visitor();

    for path in [
        "/products/no-such-product/",
        "/category/no-such-category/",
        "/add-to-cart/no-such-product/",
    ] {
        let resp = get(&client, path).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "GET {path}");
    }
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_product_page_shows_specs() {
    let client = visitor();

    let resp = get(&client, &format!("/products/{NOTEBOOK}/")).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let page = body(resp).await;
    assert!(page.contains(NOTEBOOK_TITLE));
    assert!(page.contains("$1,299.00"));
    assert!(page.contains("RAM"));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_category_filter_narrows_products() {
    let client = visitor();

    let page = body(get(&client, "/category/notebooks/").await).await;
    assert!(page.contains(NOTEBOOK_TITLE));
    assert!(page.contains(OTHER_NOTEBOOK_TITLE));

    let page = body(get(&client, "/category/notebooks/?ram=16").await).await;
    assert!(page.contains(NOTEBOOK_TITLE));
    assert!(!page.contains(OTHER_NOTEBOOK_TITLE));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_add_to_cart() {
    let client = visitor();

    let resp = get(&client, &format!("/add-to-cart/{NOTEBOOK}/")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.url().path().starts_with("/cart"));

    let page = body(resp).await;
    assert!(page.contains("Product added to cart"));
    assert!(page.contains(NOTEBOOK_TITLE));
    assert!(page.contains("1 item(s)"));
    assert!(page.contains("$1,299.00"));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_adding_twice_keeps_one_line() {
    let client = visitor();

    get(&client, &format!("/add-to-cart/{NOTEBOOK}/")).await;
    let page = body(get(&client, &format!("/add-to-cart/{NOTEBOOK}/")).await).await;

    assert!(page.contains("1 item(s)"));
    assert!(page.contains("$1,299.00"));
    assert!(!page.contains("$2,598.00"));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_change_quantity_reprices_cart() {
    let client = visitor();
    get(&client, &format!("/add-to-cart/{NOTEBOOK}/")).await;

    let resp = post_form(&client, &format!("/change-qty/{NOTEBOOK}/"), &[("qty", "3")]).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let page = body(resp).await;
    assert!(page.contains("Quantity updated"));
    assert!(page.contains("$3,897.00"));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_change_quantity_rejects_zero_and_garbage() {
    let client = visitor();
    get(&client, &format!("/add-to-cart/{NOTEBOOK}/")).await;

    for qty in ["0", "two", "-1"] {
        let page =
            body(post_form(&client, &format!("/change-qty/{NOTEBOOK}/"), &[("qty", qty)]).await)
                .await;
        assert!(
            page.contains("Quantity must be a whole number of at least 1"),
            "qty {qty}"
        );
        assert!(page.contains("$1,299.00"));
    }
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_remove_from_cart() {
    let client = visitor();
    get(&client, &format!("/add-to-cart/{NOTEBOOK}/")).await;
    let page = body(get(&client, &format!("/add-to-cart/{PHONE}/")).await).await;
    assert!(page.contains("2 item(s)"));

    let page = body(get(&client, &format!("/remove-from-cart/{PHONE}/")).await).await;
    assert!(page.contains("Product removed from cart"));
    assert!(page.contains("1 item(s)"));

    let page = body(get(&client, &format!("/remove-from-cart/{PHONE}/")).await).await;
    assert!(page.contains("That product is not in your cart"));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_carts_are_per_visitor() {
    let first = visitor();
    let second = visitor();

    get(&first, &format!("/add-to-cart/{NOTEBOOK}/")).await;

    let page = body(get(&second, "/cart/").await).await;
    assert!(page.contains("Your cart is empty"));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_browsing_without_cart_sets_no_session() {
    let client = visitor_without_redirects();
    let product = format!("/products/{NOTEBOOK}/");

    for path in ["/", "/category/notebooks/", product.as_str(), "/cart/"] {
        let resp = get(&client, path).await;
        assert_eq!(resp.status(), StatusCode::OK, "GET {path}");
        assert!(
            resp.headers().get("set-cookie").is_none(),
            "GET {path} started a session"
        );
    }
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_first_add_starts_session_cart() {
    let client = visitor_without_redirects();

    let resp = get(&client, &format!("/add-to-cart/{NOTEBOOK}/")).await;
    assert!(resp.status().is_redirection());
    assert!(resp.headers().get("set-cookie").is_some());

    let page = body(get(&client, "/cart/").await).await;
    assert!(page.contains(NOTEBOOK_TITLE));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_oversized_quantity_is_rejected_with_flash() {
    let client = visitor();
    get(&client, &format!("/add-to-cart/{NOTEBOOK}/")).await;

    let resp = post_form(
        &client,
        &format!("/change-qty/{NOTEBOOK}/"),
        &[("qty", "1000000")],
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let page = body(resp).await;
    assert!(page.contains("maximum order total"));
    assert!(page.contains("$1,299.00"));
}

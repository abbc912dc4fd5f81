mod common;

use common::{seed_coupon, seed_product, TestApp};
use mealdrop_api::{
    entities::coupon::DiscountType,
    entities::order::PaymentMethod,
    errors::ServiceError,
    services::intake::{CartItemRequest, PlaceOrderRequest},
};
use rust_decimal_macros::dec;
use uuid::Uuid;

fn order_request(product_id: Uuid, coupon: &str) -> PlaceOrderRequest {
    PlaceOrderRequest {
        address_id: Some(Uuid::new_v4()),
        items: vec![CartItemRequest {
            product_id,
            quantity: 1,
            price: None,
        }],
        payment_method: PaymentMethod::Cash,
        notes: None,
        coupon_code: Some(coupon.to_string()),
    }
}

#[tokio::test]
async fn expired_coupon_is_invalid_and_persists_nothing() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app.state.db, "Lasagna", dec!(12000), true).await;
    let (from, to) = common::window(-48, -24);
    seed_coupon(&app.state.db, "OLDTIMES", |c| {
        c.valid_from = Some(from);
        c.valid_to = Some(to);
    })
    .await;

    let result = app
        .state
        .intake
        .place_order(Uuid::new_v4(), order_request(product_id, "OLDTIMES"))
        .await;

    assert!(matches!(result, Err(ServiceError::CouponInvalid(_))));
    assert_eq!(app.order_count().await, 0);
}

#[tokio::test]
async fn not_yet_valid_coupon_is_invalid() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app.state.db, "Lasagna", dec!(12000), true).await;
    let (from, to) = common::window(24, 48);
    seed_coupon(&app.state.db, "TOMORROW", |c| {
        c.valid_from = Some(from);
        c.valid_to = Some(to);
    })
    .await;

    let result = app
        .state
        .intake
        .place_order(Uuid::new_v4(), order_request(product_id, "TOMORROW"))
        .await;

    assert!(matches!(result, Err(ServiceError::CouponInvalid(_))));
}

#[tokio::test]
async fn inactive_coupon_reads_as_not_found() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app.state.db, "Lasagna", dec!(12000), true).await;
    seed_coupon(&app.state.db, "DISABLED", |c| {
        c.is_active = false;
    })
    .await;

    let result = app
        .state
        .intake
        .place_order(Uuid::new_v4(), order_request(product_id, "DISABLED"))
        .await;

    assert!(matches!(result, Err(ServiceError::CouponNotFound(_))));
}

#[tokio::test]
async fn unknown_code_is_not_found() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app.state.db, "Lasagna", dec!(12000), true).await;

    let result = app
        .state
        .intake
        .place_order(Uuid::new_v4(), order_request(product_id, "NO-SUCH-CODE"))
        .await;

    assert!(matches!(result, Err(ServiceError::CouponNotFound(_))));
}

#[tokio::test]
async fn per_user_limit_is_enforced_across_orders() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app.state.db, "Lasagna", dec!(12000), true).await;
    seed_coupon(&app.state.db, "ONEPER", |c| {
        c.per_user_limit = Some(1);
    })
    .await;
    let customer = Uuid::new_v4();

    app.state
        .intake
        .place_order(customer, order_request(product_id, "ONEPER"))
        .await
        .expect("first use should succeed");

    let second = app
        .state
        .intake
        .place_order(customer, order_request(product_id, "ONEPER"))
        .await;

    assert!(matches!(second, Err(ServiceError::CouponInvalid(_))));
    // Only the first order exists.
    assert_eq!(app.order_count().await, 1);
    assert_eq!(app.coupon_usage_count().await, 1);
}

#[tokio::test]
async fn global_usage_cap_is_enforced() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app.state.db, "Lasagna", dec!(12000), true).await;
    seed_coupon(&app.state.db, "LIMITED", |c| {
        c.max_uses = Some(1);
    })
    .await;

    app.state
        .intake
        .place_order(Uuid::new_v4(), order_request(product_id, "LIMITED"))
        .await
        .expect("first use should succeed");

    // A different customer is still bound by the global cap.
    let second = app
        .state
        .intake
        .place_order(Uuid::new_v4(), order_request(product_id, "LIMITED"))
        .await;

    assert!(matches!(second, Err(ServiceError::CouponInvalid(_))));
}

#[tokio::test]
async fn user_restricted_coupon_only_works_for_its_user() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app.state.db, "Lasagna", dec!(12000), true).await;
    let owner = Uuid::new_v4();
    seed_coupon(&app.state.db, "VIPONLY", |c| {
        c.applicable_user_id = Some(owner);
    })
    .await;

    let stranger = app
        .state
        .intake
        .place_order(Uuid::new_v4(), order_request(product_id, "VIPONLY"))
        .await;
    assert!(matches!(stranger, Err(ServiceError::CouponInvalid(_))));

    let placed = app
        .state
        .intake
        .place_order(owner, order_request(product_id, "VIPONLY"))
        .await
        .expect("restricted user should be allowed");
    assert_eq!(placed.discount_applied, dec!(1000));
}

#[tokio::test]
async fn coupon_codes_are_case_insensitive() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app.state.db, "Lasagna", dec!(12000), true).await;
    seed_coupon(&app.state.db, "SAVE20", |c| {
        c.discount_type = DiscountType::Percentage;
        c.amount = None;
        c.percentage = Some(dec!(20));
    })
    .await;

    let placed = app
        .state
        .intake
        .place_order(Uuid::new_v4(), order_request(product_id, "  save20  "))
        .await
        .unwrap();

    assert_eq!(placed.discount_applied, dec!(2400.00));
    // The order records the canonical code, not the raw client input.
    assert_eq!(placed.order.order.coupon_code.as_deref(), Some("SAVE20"));
}

#[tokio::test]
async fn absent_coupon_short_circuits_to_zero_discount() {
    let app = TestApp::new().await;

    let applied = app
        .state
        .coupons
        .evaluate(None, Uuid::new_v4(), dec!(10000))
        .await
        .unwrap();
    assert!(applied.is_none());

    let applied = app
        .state
        .coupons
        .evaluate(Some("   "), Uuid::new_v4(), dec!(10000))
        .await
        .unwrap();
    assert!(applied.is_none());
}

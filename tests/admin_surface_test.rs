mod common;

use common::{seed_product, TestApp};
use mealdrop_api::{
    entities::coupon::DiscountType,
    entities::order::{OrderStatus, PaymentMethod},
    errors::ServiceError,
    services::catalog::{CreateProductInput, ProductFilter, UpdateProductInput},
    services::coupons::{CreateCouponInput, UpdateCouponInput},
    services::intake::{CartItemRequest, PlaceOrderRequest},
};
use rust_decimal_macros::dec;
use uuid::Uuid;

fn create_coupon_input(code: &str) -> CreateCouponInput {
    CreateCouponInput {
        code: code.to_string(),
        description: None,
        discount_type: DiscountType::Amount,
        amount: Some(dec!(2000)),
        percentage: None,
        valid_from: None,
        valid_to: None,
        max_uses: None,
        per_user_limit: None,
        applicable_user_id: None,
        is_active: true,
    }
}

#[tokio::test]
async fn product_crud_round_trip() {
    let app = TestApp::new().await;

    let created = app
        .state
        .catalog
        .create_product(CreateProductInput {
            name: "Pad Thai".to_string(),
            description: Some("Rice noodles".to_string()),
            price: dec!(14500),
            image: None,
            category: "mains".to_string(),
            is_available: true,
        })
        .await
        .unwrap();
    assert_eq!(created.price, dec!(14500));

    let updated = app
        .state
        .catalog
        .update_product(
            created.id,
            UpdateProductInput {
                price: Some(dec!(15500)),
                is_available: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.price, dec!(15500));
    assert!(!updated.is_available);

    let unavailable_only = app
        .state
        .catalog
        .list_products(ProductFilter {
            category: None,
            available: Some(false),
        })
        .await
        .unwrap();
    assert_eq!(unavailable_only.len(), 1);
    assert_eq!(unavailable_only[0].id, created.id);
}

#[tokio::test]
async fn product_listing_filters_by_category() {
    let app = TestApp::new().await;
    seed_product(&app.state.db, "Lasagna", dec!(12000), true).await;

    let mains = app
        .state
        .catalog
        .list_products(ProductFilter {
            category: Some("mains".to_string()),
            available: None,
        })
        .await
        .unwrap();
    assert_eq!(mains.len(), 1);

    let desserts = app
        .state
        .catalog
        .list_products(ProductFilter {
            category: Some("desserts".to_string()),
            available: None,
        })
        .await
        .unwrap();
    assert!(desserts.is_empty());
}

#[tokio::test]
async fn negative_price_is_rejected() {
    let app = TestApp::new().await;

    let result = app
        .state
        .catalog
        .create_product(CreateProductInput {
            name: "Glitch".to_string(),
            description: None,
            price: dec!(-1),
            image: None,
            category: "mains".to_string(),
            is_available: true,
        })
        .await;

    assert!(matches!(result, Err(ServiceError::ValidationError(_))));
}

#[tokio::test]
async fn coupon_codes_are_normalized_and_unique() {
    let app = TestApp::new().await;

    let created = app
        .state
        .coupons
        .create_coupon(create_coupon_input("  welcome10 "))
        .await
        .unwrap();
    assert_eq!(created.code, "WELCOME10");

    let duplicate = app
        .state
        .coupons
        .create_coupon(create_coupon_input("WELCOME10"))
        .await;
    assert!(matches!(duplicate, Err(ServiceError::Conflict(_))));
}

#[tokio::test]
async fn coupon_discount_fields_are_mutually_exclusive() {
    let app = TestApp::new().await;

    // AMOUNT type without an amount
    let mut input = create_coupon_input("BROKEN");
    input.amount = None;
    let result = app.state.coupons.create_coupon(input).await;
    assert!(matches!(result, Err(ServiceError::ValidationError(_))));

    // Switching type via update clears the stale field.
    let created = app
        .state
        .coupons
        .create_coupon(create_coupon_input("SWITCH"))
        .await
        .unwrap();

    let updated = app
        .state
        .coupons
        .update_coupon(
            created.id,
            UpdateCouponInput {
                discount_type: Some(DiscountType::Percentage),
                percentage: Some(dec!(25)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.discount_type, DiscountType::Percentage);
    assert_eq!(updated.percentage, Some(dec!(25)));
    assert_eq!(updated.amount, None);
}

#[tokio::test]
async fn deleted_coupon_is_gone() {
    let app = TestApp::new().await;

    let created = app
        .state
        .coupons
        .create_coupon(create_coupon_input("SHORTLIVED"))
        .await
        .unwrap();

    app.state.coupons.delete_coupon(created.id).await.unwrap();

    let listed = app.state.coupons.list_coupons().await.unwrap();
    assert!(listed.is_empty());

    let missing = app.state.coupons.delete_coupon(created.id).await;
    assert!(matches!(missing, Err(ServiceError::NotFound(_))));
}

#[tokio::test]
async fn admin_status_transition_updates_the_order() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app.state.db, "Lasagna", dec!(12000), true).await;

    let placed = app
        .state
        .intake
        .place_order(
            Uuid::new_v4(),
            PlaceOrderRequest {
                address_id: Some(Uuid::new_v4()),
                items: vec![CartItemRequest {
                    product_id,
                    quantity: 1,
                    price: None,
                }],
                payment_method: PaymentMethod::Cash,
                notes: None,
                coupon_code: None,
            },
        )
        .await
        .unwrap();
    let order_id = placed.order.order.id;
    assert_eq!(placed.order.order.status, OrderStatus::Pending);

    let updated = app
        .state
        .orders
        .update_order_status(order_id, OrderStatus::Preparing)
        .await
        .unwrap();
    assert_eq!(updated.status, OrderStatus::Preparing);
    assert!(updated.updated_at >= placed.order.order.updated_at);

    let missing = app
        .state
        .orders
        .update_order_status(Uuid::new_v4(), OrderStatus::Ready)
        .await;
    assert!(matches!(missing, Err(ServiceError::NotFound(_))));
}

#[tokio::test]
async fn order_queries_are_scoped_per_user() {
    let app = TestApp::new().await;
    let product_id = seed_product(&app.state.db, "Lasagna", dec!(12000), true).await;
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    for customer in [alice, alice, bob] {
        app.state
            .intake
            .place_order(
                customer,
                PlaceOrderRequest {
                    address_id: Some(Uuid::new_v4()),
                    items: vec![CartItemRequest {
                        product_id,
                        quantity: 1,
                        price: None,
                    }],
                    payment_method: PaymentMethod::Cash,
                    notes: None,
                    coupon_code: None,
                },
            )
            .await
            .unwrap();
    }

    let alices = app.state.orders.list_orders_for_user(alice).await.unwrap();
    assert_eq!(alices.len(), 2);
    assert!(alices.iter().all(|o| o.order.user_id == alice));
    assert!(alices.iter().all(|o| o.items.len() == 1));

    let everyone = app.state.orders.list_all_orders().await.unwrap();
    assert_eq!(everyone.len(), 3);
}

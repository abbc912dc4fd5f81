use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Mealdrop API",
        version = "0.3.0",
        description = r#"
# Mealdrop Order Intake API

Customer-facing catalog and order intake for the Mealdrop food-delivery
platform, plus the admin surface for products, coupons and order status.

## Authentication

Authenticated endpoints expect a bearer token issued by the Mealdrop auth
service:

```
Authorization: Bearer <jwt>
```

Admin endpoints additionally require the `ADMIN` role claim.

## Orders

`POST /api/v1/orders` validates the cart against live catalog state, resolves
an optional coupon, persists the order atomically and hands it to the
fulfillment queue. Pricing is always computed server-side from the current
catalog; client-side prices are ignored.
        "#,
        contact(name = "Mealdrop Engineering", email = "eng@mealdrop.dev"),
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Orders", description = "Order intake and order queries"),
        (name = "Products", description = "Catalog browsing and admin product management"),
        (name = "Admin", description = "Administrative endpoints"),
        (name = "Health", description = "Health check endpoints")
    ),
    paths(
        // Orders
        crate::handlers::orders::create_order,
        crate::handlers::orders::list_my_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::list_all_orders,
        crate::handlers::orders::update_order_status,

        // Products
        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::products::create_product,
        crate::handlers::products::update_product,

        // Coupons
        crate::handlers::coupons::list_coupons,
        crate::handlers::coupons::create_coupon,
        crate::handlers::coupons::update_coupon,
        crate::handlers::coupons::delete_coupon,

        // Health
        crate::handlers::health::health_check,
    ),
    components(
        schemas(
            crate::ApiResponse<serde_json::Value>,

            // Order types
            crate::handlers::orders::OrderResponse,
            crate::handlers::orders::OrderItemResponse,
            crate::handlers::orders::PlacedOrderResponse,
            crate::handlers::orders::UpdateOrderStatusRequest,
            crate::services::intake::PlaceOrderRequest,
            crate::services::intake::CartItemRequest,
            crate::entities::order::OrderStatus,
            crate::entities::order::PaymentMethod,

            // Catalog types
            crate::entities::product::Model,
            crate::services::catalog::CreateProductInput,
            crate::services::catalog::UpdateProductInput,

            // Coupon types
            crate::entities::coupon::Model,
            crate::entities::coupon::DiscountType,
            crate::services::coupons::CreateCouponInput,
            crate::services::coupons::UpdateCouponInput,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_builds() {
        let openapi = ApiDoc::openapi();
        let json = serde_json::to_string(&openapi).unwrap();
        assert!(json.contains("Mealdrop API"));
        assert!(json.contains("/api/v1/orders"));
    }
}

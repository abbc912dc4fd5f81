use crate::{
    entities::order::PaymentMethod,
    errors::ServiceError,
    message_queue::{OrderMessage, OrderQueue},
    services::{
        coupons::CouponService,
        orders::{NewOrder, OrderService, OrderWithItems},
        pricing::{CartLine, PricingResolver},
    },
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    #[validate(required(message = "A delivery address is required"))]
    pub address_id: Option<Uuid>,
    #[validate(length(min = 1, message = "Order must contain at least one item"))]
    pub items: Vec<CartItemRequest>,
    #[serde(default = "default_payment_method")]
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub coupon_code: Option<String>,
}

fn default_payment_method() -> PaymentMethod {
    PaymentMethod::Cash
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
    /// Advisory only; the catalog price is always authoritative.
    pub price: Option<Decimal>,
}

/// What the caller gets back: the committed order and the discount that was
/// actually applied.
#[derive(Debug)]
pub struct PlacedOrder {
    pub order: OrderWithItems,
    pub discount_applied: Decimal,
}

/// Sequences an order attempt: validate shape, resolve pricing, evaluate the
/// coupon, commit, then the best-effort tail (usage recording, queue publish).
///
/// The first four steps are fail-fast and leave nothing behind on error. The
/// tail steps are logged and swallowed: a committed order is never reported
/// as failed because a side channel degraded.
#[derive(Clone)]
pub struct OrderIntakeService {
    pricing: Arc<PricingResolver>,
    coupons: Arc<CouponService>,
    orders: Arc<OrderService>,
    queue: Arc<dyn OrderQueue>,
}

impl OrderIntakeService {
    pub fn new(
        pricing: Arc<PricingResolver>,
        coupons: Arc<CouponService>,
        orders: Arc<OrderService>,
        queue: Arc<dyn OrderQueue>,
    ) -> Self {
        Self {
            pricing,
            coupons,
            orders,
            queue,
        }
    }

    #[instrument(skip(self, request), fields(customer_id = %customer_id))]
    pub async fn place_order(
        &self,
        customer_id: Uuid,
        request: PlaceOrderRequest,
    ) -> Result<PlacedOrder, ServiceError> {
        request.validate()?;
        let address_id = request.address_id.ok_or_else(|| {
            ServiceError::ValidationError("A delivery address is required".to_string())
        })?;
        for item in &request.items {
            if item.quantity <= 0 {
                return Err(ServiceError::ValidationError(format!(
                    "quantity for product {} must be greater than zero",
                    item.product_id
                )));
            }
        }

        let lines: Vec<CartLine> = request
            .items
            .iter()
            .map(|item| CartLine {
                product_id: item.product_id,
                quantity: item.quantity,
                client_price: item.price,
            })
            .collect();

        let priced = self.pricing.resolve(&lines).await?;

        let applied = self
            .coupons
            .evaluate(request.coupon_code.as_deref(), customer_id, priced.subtotal)
            .await?;
        let discount = applied
            .as_ref()
            .map(|a| a.discount)
            .unwrap_or(Decimal::ZERO);
        let total = priced.subtotal - discount;

        let order = self
            .orders
            .create_order(NewOrder {
                customer_id,
                address_id,
                lines: priced.lines,
                total,
                payment_method: request.payment_method,
                notes: request.notes,
                coupon_code: applied.as_ref().map(|a| a.code.clone()),
                discount_amount: discount,
            })
            .await?;

        // Post-commit, best-effort from here on: the order already stands.
        if let Some(coupon) = &applied {
            if let Err(e) = self
                .coupons
                .record_usage(coupon.coupon_id, customer_id, order.order.id)
                .await
            {
                warn!(
                    error = %e,
                    order_id = %order.order.id,
                    coupon_id = %coupon.coupon_id,
                    "coupon usage could not be recorded, order stands"
                );
            }
        }

        let message = OrderMessage::from_order(&order.order, &order.items);
        if let Err(e) = self.queue.publish_order(&message).await {
            warn!(
                error = %e,
                order_id = %order.order.id,
                "fulfillment publish failed, order stands"
            );
        }

        info!(
            order_id = %order.order.id,
            total = %order.order.total,
            discount = %discount,
            "order intake completed"
        );

        Ok(PlacedOrder {
            order,
            discount_applied: discount,
        })
    }
}

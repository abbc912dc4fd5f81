use crate::{
    db::DbPool,
    entities::order::{self, Entity as OrderEntity, OrderStatus, PaymentMethod},
    entities::order_item::{self, Entity as OrderItemEntity},
    errors::ServiceError,
    services::pricing::PricedLine,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Everything needed to persist an order whose pricing has already been
/// resolved and discounted.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_id: Uuid,
    pub address_id: Uuid,
    pub lines: Vec<PricedLine>,
    /// Post-discount total.
    pub total: Decimal,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub coupon_code: Option<String>,
    pub discount_amount: Decimal,
}

/// An order header together with its line items, as committed.
#[derive(Debug, Clone)]
pub struct OrderWithItems {
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
}

/// Owns the atomic order write. Header and line items commit together or not
/// at all.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
}

impl OrderService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Persists the order header and its line items in a single transaction
    /// and returns the committed rows. Each line item freezes the unit price
    /// it was resolved at.
    #[instrument(skip(self, new_order), fields(customer_id = %new_order.customer_id))]
    pub async fn create_order(&self, new_order: NewOrder) -> Result<OrderWithItems, ServiceError> {
        let now = Utc::now();
        let order_id = Uuid::new_v4();

        let txn = self.db.begin().await.map_err(|e| {
            error!(error = %e, "failed to start order transaction");
            ServiceError::DatabaseError(e)
        })?;

        let header = order::ActiveModel {
            id: Set(order_id),
            user_id: Set(new_order.customer_id),
            address_id: Set(new_order.address_id),
            status: Set(OrderStatus::Pending),
            total: Set(new_order.total),
            payment_method: Set(new_order.payment_method),
            notes: Set(new_order.notes),
            coupon_code: Set(new_order.coupon_code),
            discount_amount: Set(new_order.discount_amount),
            created_at: Set(now),
            updated_at: Set(now),
        };

        header.insert(&txn).await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "failed to insert order header");
            ServiceError::DatabaseError(e)
        })?;

        for line in &new_order.lines {
            let item = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(line.product_id),
                quantity: Set(line.quantity),
                unit_price: Set(line.unit_price),
                created_at: Set(now),
            };
            item.insert(&txn).await.map_err(|e| {
                error!(
                    error = %e,
                    order_id = %order_id,
                    product_id = %line.product_id,
                    "failed to insert order item"
                );
                ServiceError::DatabaseError(e)
            })?;
        }

        // Read back what will be committed so callers get the materialized
        // rows, not an echo of the request.
        let order = OrderEntity::find_by_id(order_id)
            .one(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                ServiceError::InternalError("order not readable inside its own transaction".into())
            })?;

        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&txn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "failed to commit order transaction");
            ServiceError::DatabaseError(e)
        })?;

        info!(
            order_id = %order_id,
            total = %order.total,
            item_count = items.len(),
            "order created"
        );

        Ok(OrderWithItems { order, items })
    }

    pub async fn get_order_with_items(
        &self,
        order_id: Uuid,
    ) -> Result<Option<OrderWithItems>, ServiceError> {
        let order = OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let Some(order) = order else {
            return Ok(None);
        };

        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(Some(OrderWithItems { order, items }))
    }

    /// The customer's own orders, newest first.
    #[instrument(skip(self))]
    pub async fn list_orders_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<OrderWithItems>, ServiceError> {
        let rows = OrderEntity::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .find_with_related(OrderItemEntity)
            .all(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(rows
            .into_iter()
            .map(|(order, items)| OrderWithItems { order, items })
            .collect())
    }

    /// All orders, newest first. Admin surface.
    #[instrument(skip(self))]
    pub async fn list_all_orders(&self) -> Result<Vec<OrderWithItems>, ServiceError> {
        let rows = OrderEntity::find()
            .order_by_desc(order::Column::CreatedAt)
            .find_with_related(OrderItemEntity)
            .all(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(rows
            .into_iter()
            .map(|(order, items)| OrderWithItems { order, items })
            .collect())
    }

    /// Admin status transition. The status enum is the whole contract; there
    /// is no transition graph beyond it.
    #[instrument(skip(self), fields(order_id = %order_id, new_status = ?new_status))]
    pub async fn update_order_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<order::Model, ServiceError> {
        let order = OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| {
                warn!(order_id = %order_id, "order not found for status update");
                ServiceError::NotFound(format!("Order {} not found", order_id))
            })?;

        let old_status = order.status;
        let mut model: order::ActiveModel = order.into();
        model.status = Set(new_status);
        model.updated_at = Set(Utc::now());

        let updated = model.update(&*self.db).await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "failed to update order status");
            ServiceError::DatabaseError(e)
        })?;

        info!(
            order_id = %order_id,
            old_status = ?old_status,
            new_status = ?new_status,
            "order status updated"
        );

        Ok(updated)
    }
}

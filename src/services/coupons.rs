use crate::{
    db::DbPool,
    entities::coupon::{self, DiscountType, Entity as Coupon},
    entities::coupon_usage::{self, Entity as CouponUsage},
    errors::ServiceError,
};
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Result of a successful coupon evaluation: what to subtract from the
/// subtotal and which coupon to charge the usage against after commit.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedCoupon {
    pub coupon_id: Uuid,
    pub code: String,
    pub discount: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCouponInput {
    #[validate(length(min = 1, max = 50, message = "Coupon code is required"))]
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub amount: Option<Decimal>,
    pub percentage: Option<Decimal>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    pub max_uses: Option<i32>,
    pub per_user_limit: Option<i32>,
    pub applicable_user_id: Option<Uuid>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCouponInput {
    pub description: Option<String>,
    pub discount_type: Option<DiscountType>,
    pub amount: Option<Decimal>,
    pub percentage: Option<Decimal>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    pub max_uses: Option<i32>,
    pub per_user_limit: Option<i32>,
    pub applicable_user_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

/// Coupon evaluation and administration.
///
/// Evaluation is a pure read; usage rows are written only after the order
/// transaction commits. Caps are therefore checked optimistically and two
/// near-simultaneous requests can overrun a nearly-exhausted cap by a small
/// margin.
#[derive(Clone)]
pub struct CouponService {
    db: Arc<DbPool>,
}

impl CouponService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Applicability check plus discount computation for an order attempt.
    /// `None` code short-circuits to no discount.
    #[instrument(skip(self, code), fields(user_id = %user_id, subtotal = %subtotal))]
    pub async fn evaluate(
        &self,
        code: Option<&str>,
        user_id: Uuid,
        subtotal: Decimal,
    ) -> Result<Option<AppliedCoupon>, ServiceError> {
        let Some(raw) = code else {
            return Ok(None);
        };
        let normalized = raw.trim().to_uppercase();
        if normalized.is_empty() {
            return Ok(None);
        }

        let found = Coupon::find()
            .filter(coupon::Column::Code.eq(normalized.clone()))
            .one(&*self.db)
            .await
            .map_err(|e| {
                error!(error = %e, "failed to look up coupon");
                ServiceError::DatabaseError(e)
            })?;

        // An inactive coupon is indistinguishable from an absent one.
        let coupon = found
            .filter(|c| c.is_active)
            .ok_or_else(|| ServiceError::CouponNotFound(normalized.clone()))?;

        check_window(&coupon, Utc::now())?;

        if let Some(max_uses) = coupon.max_uses {
            let used = self.count_usage(coupon.id).await?;
            if used >= max_uses as u64 {
                return Err(ServiceError::CouponInvalid(
                    "usage limit reached".to_string(),
                ));
            }
        }

        if let Some(limit) = coupon.per_user_limit {
            let used = self.count_usage_by_user(coupon.id, user_id).await?;
            if used >= limit as u64 {
                return Err(ServiceError::CouponInvalid(
                    "per-user usage limit reached".to_string(),
                ));
            }
        }

        if let Some(only_user) = coupon.applicable_user_id {
            if only_user != user_id {
                return Err(ServiceError::CouponInvalid(
                    "coupon is not applicable to this account".to_string(),
                ));
            }
        }

        let discount = compute_discount(&coupon, subtotal)?;
        debug!(code = %coupon.code, discount = %discount, "coupon evaluated");

        Ok(Some(AppliedCoupon {
            coupon_id: coupon.id,
            code: coupon.code,
            discount,
        }))
    }

    pub async fn count_usage(&self, coupon_id: Uuid) -> Result<u64, ServiceError> {
        CouponUsage::find()
            .filter(coupon_usage::Column::CouponId.eq(coupon_id))
            .count(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    pub async fn count_usage_by_user(
        &self,
        coupon_id: Uuid,
        user_id: Uuid,
    ) -> Result<u64, ServiceError> {
        CouponUsage::find()
            .filter(coupon_usage::Column::CouponId.eq(coupon_id))
            .filter(coupon_usage::Column::UserId.eq(user_id))
            .count(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Links a coupon to the order it discounted. Called only after the order
    /// transaction has committed.
    #[instrument(skip(self), fields(coupon_id = %coupon_id, order_id = %order_id))]
    pub async fn record_usage(
        &self,
        coupon_id: Uuid,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<(), ServiceError> {
        let usage = coupon_usage::ActiveModel {
            id: Set(Uuid::new_v4()),
            coupon_id: Set(coupon_id),
            user_id: Set(user_id),
            order_id: Set(order_id),
            used_at: Set(Utc::now()),
        };

        usage.insert(&*self.db).await.map_err(|e| {
            error!(error = %e, coupon_id = %coupon_id, "failed to record coupon usage");
            ServiceError::DatabaseError(e)
        })?;

        info!(coupon_id = %coupon_id, order_id = %order_id, "coupon usage recorded");
        Ok(())
    }

    // ---- admin surface ----

    pub async fn list_coupons(&self) -> Result<Vec<coupon::Model>, ServiceError> {
        Coupon::find()
            .order_by_asc(coupon::Column::Code)
            .all(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create_coupon(
        &self,
        input: CreateCouponInput,
    ) -> Result<coupon::Model, ServiceError> {
        input.validate()?;
        let code = input.code.trim().to_uppercase();
        validate_discount_fields(input.discount_type, input.amount, input.percentage)?;

        let existing = Coupon::find()
            .filter(coupon::Column::Code.eq(code.clone()))
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "coupon code {} already exists",
                code
            )));
        }

        let now = Utc::now();
        let model = coupon::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code),
            description: Set(input.description),
            discount_type: Set(input.discount_type),
            amount: Set(input.amount),
            percentage: Set(input.percentage),
            valid_from: Set(input.valid_from),
            valid_to: Set(input.valid_to),
            max_uses: Set(input.max_uses),
            per_user_limit: Set(input.per_user_limit),
            applicable_user_id: Set(input.applicable_user_id),
            is_active: Set(input.is_active),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let created = model.insert(&*self.db).await.map_err(|e| {
            error!(error = %e, "failed to create coupon");
            ServiceError::DatabaseError(e)
        })?;

        info!(coupon_id = %created.id, code = %created.code, "coupon created");
        Ok(created)
    }

    #[instrument(skip(self, input), fields(coupon_id = %id))]
    pub async fn update_coupon(
        &self,
        id: Uuid,
        input: UpdateCouponInput,
    ) -> Result<coupon::Model, ServiceError> {
        let existing = Coupon::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Coupon {} not found", id)))?;

        let discount_type = input.discount_type.unwrap_or(existing.discount_type);
        let amount = input.amount.or(existing.amount);
        let percentage = input.percentage.or(existing.percentage);
        validate_discount_fields(discount_type, amount, percentage)?;

        let mut model: coupon::ActiveModel = existing.into();
        model.discount_type = Set(discount_type);
        // Only the field matching the (possibly updated) type survives.
        match discount_type {
            DiscountType::Amount => {
                model.amount = Set(amount);
                model.percentage = Set(None);
            }
            DiscountType::Percentage => {
                model.percentage = Set(percentage);
                model.amount = Set(None);
            }
        }
        if let Some(description) = input.description {
            model.description = Set(Some(description));
        }
        if let Some(valid_from) = input.valid_from {
            model.valid_from = Set(Some(valid_from));
        }
        if let Some(valid_to) = input.valid_to {
            model.valid_to = Set(Some(valid_to));
        }
        if let Some(max_uses) = input.max_uses {
            model.max_uses = Set(Some(max_uses));
        }
        if let Some(per_user_limit) = input.per_user_limit {
            model.per_user_limit = Set(Some(per_user_limit));
        }
        if let Some(applicable_user_id) = input.applicable_user_id {
            model.applicable_user_id = Set(Some(applicable_user_id));
        }
        if let Some(is_active) = input.is_active {
            model.is_active = Set(is_active);
        }
        model.updated_at = Set(Utc::now());

        let updated = model.update(&*self.db).await.map_err(|e| {
            error!(error = %e, coupon_id = %id, "failed to update coupon");
            ServiceError::DatabaseError(e)
        })?;

        info!(coupon_id = %id, "coupon updated");
        Ok(updated)
    }

    #[instrument(skip(self), fields(coupon_id = %id))]
    pub async fn delete_coupon(&self, id: Uuid) -> Result<(), ServiceError> {
        let existing = Coupon::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Coupon {} not found", id)))?;

        existing
            .delete(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        info!(coupon_id = %id, "coupon deleted");
        Ok(())
    }
}

/// Discount for a coupon against a subtotal, clamped to `[0, subtotal]`.
pub fn compute_discount(
    coupon: &coupon::Model,
    subtotal: Decimal,
) -> Result<Decimal, ServiceError> {
    let discount = match coupon.discount_type {
        DiscountType::Amount => coupon.amount.ok_or_else(|| {
            ServiceError::CouponInvalid("coupon has no discount amount configured".to_string())
        })?,
        DiscountType::Percentage => {
            let percentage = coupon.percentage.ok_or_else(|| {
                ServiceError::CouponInvalid("coupon has no percentage configured".to_string())
            })?;
            if percentage <= Decimal::ZERO || percentage > dec!(100) {
                return Err(ServiceError::CouponInvalid(
                    "coupon percentage is out of range".to_string(),
                ));
            }
            (subtotal * percentage / dec!(100))
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        }
    };

    Ok(discount.max(Decimal::ZERO).min(subtotal))
}

fn check_window(coupon: &coupon::Model, now: DateTime<Utc>) -> Result<(), ServiceError> {
    if let Some(from) = coupon.valid_from {
        if now < from {
            return Err(ServiceError::CouponInvalid(
                "coupon is not active yet".to_string(),
            ));
        }
    }
    if let Some(to) = coupon.valid_to {
        if now > to {
            return Err(ServiceError::CouponInvalid("coupon has expired".to_string()));
        }
    }
    Ok(())
}

fn validate_discount_fields(
    discount_type: DiscountType,
    amount: Option<Decimal>,
    percentage: Option<Decimal>,
) -> Result<(), ServiceError> {
    match discount_type {
        DiscountType::Amount => {
            let amount = amount.ok_or_else(|| {
                ServiceError::ValidationError(
                    "amount is required for AMOUNT coupons".to_string(),
                )
            })?;
            if amount <= Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "amount must be greater than zero".to_string(),
                ));
            }
        }
        DiscountType::Percentage => {
            let percentage = percentage.ok_or_else(|| {
                ServiceError::ValidationError(
                    "percentage is required for PERCENTAGE coupons".to_string(),
                )
            })?;
            if percentage <= Decimal::ZERO || percentage > dec!(100) {
                return Err(ServiceError::ValidationError(
                    "percentage must be in (0, 100]".to_string(),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn coupon_model(discount_type: DiscountType) -> coupon::Model {
        coupon::Model {
            id: Uuid::new_v4(),
            code: "TEST".to_string(),
            description: None,
            discount_type,
            amount: None,
            percentage: None,
            valid_from: None,
            valid_to: None,
            max_uses: None,
            per_user_limit: None,
            applicable_user_id: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn percentage_discount_rounds_to_two_decimals() {
        let mut coupon = coupon_model(DiscountType::Percentage);
        coupon.percentage = Some(dec!(20));

        // 20% of 24000 = 4800.00
        assert_eq!(compute_discount(&coupon, dec!(24000)).unwrap(), dec!(4800.00));

        // 15% of 99.99 = 14.9985 -> 15.00
        coupon.percentage = Some(dec!(15));
        assert_eq!(compute_discount(&coupon, dec!(99.99)).unwrap(), dec!(15.00));
    }

    #[test]
    fn amount_discount_clamps_to_subtotal() {
        let mut coupon = coupon_model(DiscountType::Amount);
        coupon.amount = Some(dec!(5000));

        assert_eq!(compute_discount(&coupon, dec!(3000)).unwrap(), dec!(3000));
        assert_eq!(compute_discount(&coupon, dec!(8000)).unwrap(), dec!(5000));
    }

    #[test]
    fn full_percentage_consumes_exactly_the_subtotal() {
        let mut coupon = coupon_model(DiscountType::Percentage);
        coupon.percentage = Some(dec!(100));

        assert_eq!(compute_discount(&coupon, dec!(42.42)).unwrap(), dec!(42.42));
    }

    #[test]
    fn out_of_range_percentage_is_rejected() {
        let mut coupon = coupon_model(DiscountType::Percentage);
        coupon.percentage = Some(dec!(120));
        assert!(matches!(
            compute_discount(&coupon, dec!(100)),
            Err(ServiceError::CouponInvalid(_))
        ));

        coupon.percentage = Some(Decimal::ZERO);
        assert!(matches!(
            compute_discount(&coupon, dec!(100)),
            Err(ServiceError::CouponInvalid(_))
        ));
    }

    #[test]
    fn misconfigured_coupon_is_rejected() {
        // AMOUNT type with no amount set
        let coupon = coupon_model(DiscountType::Amount);
        assert!(matches!(
            compute_discount(&coupon, dec!(100)),
            Err(ServiceError::CouponInvalid(_))
        ));
    }

    #[test]
    fn window_checks() {
        let now = Utc::now();

        let mut coupon = coupon_model(DiscountType::Amount);
        coupon.amount = Some(dec!(10));
        assert!(check_window(&coupon, now).is_ok());

        coupon.valid_from = Some(now + Duration::hours(1));
        assert!(matches!(
            check_window(&coupon, now),
            Err(ServiceError::CouponInvalid(_))
        ));

        coupon.valid_from = Some(now - Duration::hours(2));
        coupon.valid_to = Some(now - Duration::hours(1));
        assert!(matches!(
            check_window(&coupon, now),
            Err(ServiceError::CouponInvalid(_))
        ));

        coupon.valid_to = Some(now + Duration::hours(1));
        assert!(check_window(&coupon, now).is_ok());
    }

    #[test]
    fn discount_field_exclusivity() {
        assert!(validate_discount_fields(DiscountType::Amount, Some(dec!(10)), None).is_ok());
        assert!(validate_discount_fields(DiscountType::Amount, None, Some(dec!(10))).is_err());
        assert!(
            validate_discount_fields(DiscountType::Percentage, None, Some(dec!(25))).is_ok()
        );
        assert!(
            validate_discount_fields(DiscountType::Percentage, None, Some(dec!(101))).is_err()
        );
    }
}

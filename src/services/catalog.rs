use crate::{
    db::DbPool,
    entities::product::{self, Entity as Product},
    errors::ServiceError,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 200, message = "Product name is required"))]
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub image: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Category is required"))]
    pub category: String,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub image: Option<String>,
    pub category: Option<String>,
    pub is_available: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub available: Option<bool>,
}

/// Read/write access to the product catalog. The intake pipeline only reads;
/// writes come from the admin surface.
#[derive(Clone)]
pub struct ProductCatalogService {
    db: Arc<DbPool>,
}

impl ProductCatalogService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Current catalog row for a product, or `None` when the id is unknown.
    /// Always hits the database so order validation sees the freshest price
    /// and availability.
    pub async fn find_product(&self, id: Uuid) -> Result<Option<product::Model>, ServiceError> {
        Product::find_by_id(id).one(&*self.db).await.map_err(|e| {
            error!(error = %e, product_id = %id, "failed to fetch product");
            ServiceError::DatabaseError(e)
        })
    }

    pub async fn get_product(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        self.find_product(id)
            .await?
            .ok_or_else(|| ServiceError::ProductNotFound(id.to_string()))
    }

    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        filter: ProductFilter,
    ) -> Result<Vec<product::Model>, ServiceError> {
        let mut query = Product::find().order_by_asc(product::Column::Name);

        if let Some(category) = filter.category {
            query = query.filter(product::Column::Category.eq(category));
        }
        if let Some(available) = filter.available {
            query = query.filter(product::Column::IsAvailable.eq(available));
        }

        query.all(&*self.db).await.map_err(|e| {
            error!(error = %e, "failed to list products");
            ServiceError::DatabaseError(e)
        })
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<product::Model, ServiceError> {
        input.validate()?;
        if input.price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "price cannot be negative".to_string(),
            ));
        }

        let now = Utc::now();
        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            description: Set(input.description),
            price: Set(input.price),
            image: Set(input.image),
            category: Set(input.category),
            is_available: Set(input.is_available),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let created = model.insert(&*self.db).await.map_err(|e| {
            error!(error = %e, "failed to create product");
            ServiceError::DatabaseError(e)
        })?;

        info!(product_id = %created.id, "product created");
        Ok(created)
    }

    #[instrument(skip(self, input), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        id: Uuid,
        input: UpdateProductInput,
    ) -> Result<product::Model, ServiceError> {
        if let Some(price) = input.price {
            if price < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "price cannot be negative".to_string(),
                ));
            }
        }

        let existing = self.get_product(id).await?;
        let mut model: product::ActiveModel = existing.into();

        if let Some(name) = input.name {
            model.name = Set(name);
        }
        if let Some(description) = input.description {
            model.description = Set(Some(description));
        }
        if let Some(price) = input.price {
            model.price = Set(price);
        }
        if let Some(image) = input.image {
            model.image = Set(Some(image));
        }
        if let Some(category) = input.category {
            model.category = Set(category);
        }
        if let Some(is_available) = input.is_available {
            model.is_available = Set(is_available);
        }
        model.updated_at = Set(Utc::now());

        let updated = model.update(&*self.db).await.map_err(|e| {
            error!(error = %e, product_id = %id, "failed to update product");
            ServiceError::DatabaseError(e)
        })?;

        info!(product_id = %id, "product updated");
        Ok(updated)
    }
}

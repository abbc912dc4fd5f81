use crate::{errors::ServiceError, services::catalog::ProductCatalogService};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

/// One requested cart line. `client_price` is whatever the client claims the
/// unit price is; it is advisory only and never participates in the total.
#[derive(Debug, Clone)]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub client_price: Option<Decimal>,
}

/// A cart line with its catalog price resolved at validation time.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone)]
pub struct PricedCart {
    pub lines: Vec<PricedLine>,
    pub subtotal: Decimal,
}

/// Recomputes a trusted subtotal from live catalog state. Pure read — the
/// resolver has no side effects.
#[derive(Clone)]
pub struct PricingResolver {
    catalog: Arc<ProductCatalogService>,
}

impl PricingResolver {
    pub fn new(catalog: Arc<ProductCatalogService>) -> Self {
        Self { catalog }
    }

    #[instrument(skip(self, lines), fields(line_count = lines.len()))]
    pub async fn resolve(&self, lines: &[CartLine]) -> Result<PricedCart, ServiceError> {
        if lines.is_empty() {
            return Err(ServiceError::EmptyCart);
        }

        let mut priced = Vec::with_capacity(lines.len());
        for line in lines {
            if line.quantity <= 0 {
                return Err(ServiceError::ValidationError(format!(
                    "quantity for product {} must be greater than zero",
                    line.product_id
                )));
            }

            let product = self
                .catalog
                .find_product(line.product_id)
                .await?
                .ok_or_else(|| ServiceError::ProductNotFound(line.product_id.to_string()))?;

            if !product.is_available {
                return Err(ServiceError::ProductUnavailable(product.name));
            }

            if let Some(client_price) = line.client_price {
                if client_price != product.price {
                    debug!(
                        product_id = %line.product_id,
                        client_price = %client_price,
                        catalog_price = %product.price,
                        "ignoring client-supplied price, catalog price is authoritative"
                    );
                }
            }

            priced.push(PricedLine {
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: product.price,
            });
        }

        let subtotal = subtotal(&priced);
        Ok(PricedCart {
            lines: priced,
            subtotal,
        })
    }
}

/// Σ(unit price × quantity) over resolved lines.
pub fn subtotal(lines: &[PricedLine]) -> Decimal {
    lines
        .iter()
        .map(|line| line.unit_price * Decimal::from(line.quantity))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(quantity: i32, unit_price: Decimal) -> PricedLine {
        PricedLine {
            product_id: Uuid::new_v4(),
            quantity,
            unit_price,
        }
    }

    #[test]
    fn subtotal_sums_price_times_quantity() {
        let lines = vec![line(2, dec!(12000)), line(1, dec!(3500.50))];
        assert_eq!(subtotal(&lines), dec!(27500.50));
    }

    #[test]
    fn subtotal_of_single_line() {
        let lines = vec![line(2, dec!(12000))];
        assert_eq!(subtotal(&lines), dec!(24000));
    }

    #[test]
    fn subtotal_of_no_lines_is_zero() {
        assert_eq!(subtotal(&[]), Decimal::ZERO);
    }
}

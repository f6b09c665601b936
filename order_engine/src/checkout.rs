//! Cart/item resolution and sub-order drafting.
//!
//! Everything here is pure computation over rows the caller has already loaded: per-item
//! validation, grouping by seller, server-side subtotal computation and the price-integrity check
//! against the client-declared amounts. No storage access happens in this module, so it can run
//! outside any lock.

use std::collections::{BTreeMap, HashMap};

use log::debug;
use mkp_common::Money;
use thiserror::Error;

use crate::{
    db_types::{Product, ProductStatus, Store},
    traits::{OrderItemDraft, PurchasedItem, SubOrderDraft},
};

#[derive(Debug, Clone, Error)]
pub enum CheckoutError {
    #[error("There is nothing to check out")]
    EmptyCart,
    #[error("Product {name} (#{product_id}) is not available for purchase")]
    ProductNotApproved { product_id: i64, name: String },
    #[error("Quantity {requested} for product #{product_id} is outside the allowed range {min}..={max}")]
    QuantityOutOfRange { product_id: i64, requested: i64, min: i64, max: i64 },
    #[error("Insufficient stock for product #{product_id}: requested {requested}, available {available}")]
    InsufficientStock { product_id: i64, requested: i64, available: i64 },
    #[error("Seller #{seller_id} has no store on record")]
    StoreMissing { seller_id: i64 },
    #[error("Declared {field} ({declared}) does not match the server-computed amount ({computed})")]
    PriceMismatch { field: &'static str, declared: Money, computed: Money },
}

/// Validates a single purchasable line against the product row: approval status, min/max order
/// quantity and available stock. Stock is re-checked against row state again at commit time; this
/// early check exists to fail fast before any transaction is opened.
pub fn validate_item(product: &Product, quantity: i64) -> Result<(), CheckoutError> {
    if product.status != ProductStatus::Approved {
        return Err(CheckoutError::ProductNotApproved {
            product_id: product.id,
            name: product.name.clone(),
        });
    }
    let max = product.max_order_qty.unwrap_or(i64::MAX);
    if quantity < product.min_order_qty || quantity > max {
        return Err(CheckoutError::QuantityOutOfRange {
            product_id: product.id,
            requested: quantity,
            min: product.min_order_qty,
            max,
        });
    }
    if quantity > product.stock {
        return Err(CheckoutError::InsufficientStock {
            product_id: product.id,
            requested: quantity,
            available: product.stock,
        });
    }
    Ok(())
}

/// Groups validated items by seller and produces one sub-order draft per seller group, carrying
/// the snapshotted line items, the server-computed subtotal and the seller's store location and
/// self-delivery flag. Delivery charges are filled in later by the batching step.
///
/// Seller groups are emitted in ascending seller id order so the output is deterministic.
pub fn build_sub_order_drafts(
    items: &[PurchasedItem],
    stores: &HashMap<i64, Store>,
) -> Result<Vec<SubOrderDraft>, CheckoutError> {
    if items.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }
    let mut groups: BTreeMap<i64, Vec<&PurchasedItem>> = BTreeMap::new();
    for item in items {
        validate_item(&item.product, item.quantity)?;
        groups.entry(item.product.seller_id).or_default().push(item);
    }
    let mut drafts = Vec::with_capacity(groups.len());
    for (seller_id, group) in groups {
        let store = stores
            .get(&seller_id)
            .ok_or(CheckoutError::StoreMissing { seller_id })?;
        let items: Vec<OrderItemDraft> = group
            .iter()
            .map(|i| OrderItemDraft {
                product_id: i.product.id,
                product_name: i.product.name.clone(),
                product_image: i.product.image_url.clone(),
                unit: i.product.unit.clone(),
                unit_price: i.unit_price,
                quantity: i.quantity,
                line_total: i.line_total(),
            })
            .collect();
        let subtotal: Money = items.iter().map(|i| i.line_total).sum();
        debug!("🛒️ Seller #{seller_id}: {} line(s), subtotal {subtotal}", items.len());
        drafts.push(SubOrderDraft {
            seller_id,
            store_id: store.id,
            store_coordinates: store.coordinates(),
            self_delivery: store.self_delivery,
            subtotal,
            delivery_charge: Money::default(),
            items,
        });
    }
    Ok(drafts)
}

/// Compares a client-declared amount against the server-computed one within the one-minor-unit
/// tolerance. A mismatch fails the checkout; the engine never logs-and-proceeds on a price
/// discrepancy.
pub fn verify_declared_amount(
    field: &'static str,
    declared: Money,
    computed: Money,
) -> Result<(), CheckoutError> {
    if computed.approx_eq(declared) {
        Ok(())
    } else {
        Err(CheckoutError::PriceMismatch { field, declared, computed })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::db_types::Coordinates;

    fn product(id: i64, seller_id: i64, price_cents: i64, stock: i64) -> Product {
        Product {
            id,
            seller_id,
            name: format!("product-{id}"),
            image_url: None,
            unit: "unit".to_string(),
            price: Money::from_cents(price_cents),
            stock,
            min_order_qty: 1,
            max_order_qty: None,
            status: ProductStatus::Approved,
        }
    }

    fn store(id: i64, seller_id: i64, self_delivery: bool) -> Store {
        Store {
            id,
            seller_id,
            name: format!("store-{id}"),
            latitude: -1.29,
            longitude: 36.82,
            self_delivery,
        }
    }

    fn item(product: Product, quantity: i64) -> PurchasedItem {
        let unit_price = product.price;
        PurchasedItem { product, quantity, unit_price }
    }

    #[test]
    fn rejects_unapproved_product() {
        let mut p = product(1, 1, 100, 10);
        p.status = ProductStatus::Draft;
        assert!(matches!(
            validate_item(&p, 1),
            Err(CheckoutError::ProductNotApproved { product_id: 1, .. })
        ));
    }

    #[test]
    fn enforces_quantity_bounds() {
        let mut p = product(1, 1, 100, 50);
        p.min_order_qty = 2;
        p.max_order_qty = Some(5);
        assert!(matches!(validate_item(&p, 1), Err(CheckoutError::QuantityOutOfRange { .. })));
        assert!(matches!(validate_item(&p, 6), Err(CheckoutError::QuantityOutOfRange { .. })));
        assert!(validate_item(&p, 3).is_ok());
    }

    #[test]
    fn unlimited_max_when_not_configured() {
        let p = product(1, 1, 100, 1_000);
        assert!(validate_item(&p, 999).is_ok());
    }

    #[test]
    fn rejects_over_stock_requests() {
        let p = product(1, 1, 100, 3);
        assert!(matches!(
            validate_item(&p, 4),
            Err(CheckoutError::InsufficientStock { available: 3, .. })
        ));
    }

    #[test]
    fn groups_items_by_seller_with_computed_subtotals() {
        let stores: HashMap<i64, Store> =
            [(1, store(10, 1, false)), (2, store(20, 2, true))].into_iter().collect();
        let items = vec![
            item(product(100, 1, 250, 10), 2), // 5.00
            item(product(101, 2, 1_000, 10), 1), // 10.00
            item(product(102, 1, 100, 10), 3), // 3.00
        ];
        let drafts = build_sub_order_drafts(&items, &stores).unwrap();
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].seller_id, 1);
        assert_eq!(drafts[0].items.len(), 2);
        assert_eq!(drafts[0].subtotal, Money::from_cents(800));
        assert!(!drafts[0].self_delivery);
        assert_eq!(drafts[1].seller_id, 2);
        assert_eq!(drafts[1].subtotal, Money::from_cents(1_000));
        assert!(drafts[1].self_delivery);
        let total: Money = drafts.iter().map(|d| d.subtotal).sum();
        assert_eq!(total, Money::from_cents(1_800));
    }

    #[test]
    fn snapshots_cart_time_price_not_catalog_price() {
        let stores: HashMap<i64, Store> = [(1, store(10, 1, false))].into_iter().collect();
        let mut i = item(product(100, 1, 500, 10), 2);
        // catalog price changed after the item was added to the cart
        i.product.price = Money::from_cents(900);
        i.unit_price = Money::from_cents(500);
        let drafts = build_sub_order_drafts(&[i], &stores).unwrap();
        assert_eq!(drafts[0].items[0].unit_price, Money::from_cents(500));
        assert_eq!(drafts[0].subtotal, Money::from_cents(1_000));
    }

    #[test]
    fn empty_input_is_an_error() {
        let stores = HashMap::new();
        assert!(matches!(build_sub_order_drafts(&[], &stores), Err(CheckoutError::EmptyCart)));
    }

    #[test]
    fn missing_store_is_an_error() {
        let stores = HashMap::new();
        let items = vec![item(product(1, 7, 100, 5), 1)];
        assert!(matches!(
            build_sub_order_drafts(&items, &stores),
            Err(CheckoutError::StoreMissing { seller_id: 7 })
        ));
    }

    #[test]
    fn price_integrity_tolerance() {
        let computed = Money::from_cents(1_000);
        assert!(verify_declared_amount("subtotal", Money::from_cents(1_001), computed).is_ok());
        let err = verify_declared_amount("subtotal", Money::from_cents(1_005), computed);
        assert!(matches!(err, Err(CheckoutError::PriceMismatch { field: "subtotal", .. })));
    }

    #[test]
    fn store_coordinates_flow_into_draft() {
        let stores: HashMap<i64, Store> = [(1, store(10, 1, false))].into_iter().collect();
        let drafts = build_sub_order_drafts(&[item(product(1, 1, 100, 5), 1)], &stores).unwrap();
        assert_eq!(drafts[0].store_coordinates, Coordinates::new(-1.29, 36.82));
    }
}

//! Delivery batch clustering.
//!
//! Groups courier-fulfilled sub-orders into delivery runs by store proximity, using greedy
//! single-link clustering anchored on the first store of each batch. Self-delivery sub-orders are
//! skipped entirely and their delivery charge is forced to zero. The whole module is pure; courier
//! assignment is delegated to a pluggable [`AssignmentPolicy`].

use log::{debug, trace};
use mkp_common::Money;

use crate::{
    db_types::{Coordinates, Courier},
    helpers::distance_km,
    traits::SubOrderDraft,
};

/// Default anchor-to-store proximity threshold, in kilometres.
pub const DEFAULT_PROXIMITY_THRESHOLD_KM: f64 = 2.0;

/// Indices into the sub-order list of a [`ClusterPlan`], one entry per planned courier trip. The
/// first member is the batch's anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutline {
    pub member_indices: Vec<usize>,
}

/// The clustering result: the (reordered) sub-order drafts and the planned batches over them.
/// Self-delivery drafts appear in `sub_orders` but in no outline.
#[derive(Debug, Clone)]
pub struct ClusterPlan {
    pub sub_orders: Vec<SubOrderDraft>,
    pub batches: Vec<BatchOutline>,
}

/// Partitions the drafts into self-delivery and courier-delivery, sorts the courier drafts by
/// distance from the customer (ascending, stable), and greedily clusters them:
///
/// * the first unassigned draft anchors a new batch;
/// * each subsequent draft joins the current batch iff the distance between its store and the
///   *anchor's* store is within `threshold_km`, otherwise it closes the batch and anchors a new
///   one.
///
/// A store with invalid coordinates is `INVALID_DISTANCE_KM` away from everything, so it always
/// ends up alone in its own batch.
pub fn cluster_sub_orders(
    customer: Coordinates,
    drafts: Vec<SubOrderDraft>,
    threshold_km: f64,
    courier_delivery_charge: Money,
) -> ClusterPlan {
    let mut sub_orders: Vec<SubOrderDraft> = Vec::with_capacity(drafts.len());
    let mut courier_drafts: Vec<SubOrderDraft> = Vec::new();
    for mut draft in drafts {
        if draft.self_delivery {
            draft.delivery_charge = Money::default();
            sub_orders.push(draft);
        } else {
            draft.delivery_charge = courier_delivery_charge;
            courier_drafts.push(draft);
        }
    }
    // Stable sort keeps input order for distance ties.
    courier_drafts.sort_by(|a, b| {
        let da = distance_km(customer, a.store_coordinates);
        let db = distance_km(customer, b.store_coordinates);
        da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut batches: Vec<BatchOutline> = Vec::new();
    let mut anchor: Option<Coordinates> = None;
    for draft in courier_drafts {
        let index = sub_orders.len();
        match anchor {
            Some(anchor_coords)
                if distance_km(draft.store_coordinates, anchor_coords) <= threshold_km =>
            {
                trace!(
                    "📦️ Store #{} joins batch {} (within {threshold_km} km of anchor)",
                    draft.store_id,
                    batches.len() - 1
                );
                batches
                    .last_mut()
                    .expect("anchor is set, so at least one batch exists")
                    .member_indices
                    .push(index);
            },
            _ => {
                trace!("📦️ Store #{} anchors batch {}", draft.store_id, batches.len());
                anchor = Some(draft.store_coordinates);
                batches.push(BatchOutline { member_indices: vec![index] });
            },
        }
        sub_orders.push(draft);
    }
    debug!(
        "📦️ Clustered {} courier sub-order(s) into {} batch(es); {} self-delivery",
        batches.iter().map(|b| b.member_indices.len()).sum::<usize>(),
        batches.len(),
        sub_orders.iter().filter(|d| d.self_delivery).count()
    );
    ClusterPlan { sub_orders, batches }
}

//--------------------------------------  AssignmentPolicy   ---------------------------------------------------------
/// Decides which courier takes a planned batch. Policies are deliberately pluggable so the
/// clustering engine never hard-codes an assignment strategy.
pub trait AssignmentPolicy: Send + Sync {
    /// Pick a courier for the batch with the given member drafts. Returning `None` leaves the
    /// batch unassigned until a courier accepts it.
    fn assign(&self, couriers: &[Courier], members: &[&SubOrderDraft]) -> Option<i64>;
}

/// Picks the first courier flagged available. Intentionally naive; swap in a smarter policy
/// (nearest-idle, load-balanced, manual) without touching the clustering engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstAvailable;

impl AssignmentPolicy for FirstAvailable {
    fn assign(&self, couriers: &[Courier], _members: &[&SubOrderDraft]) -> Option<i64> {
        couriers.iter().find(|c| c.available).map(|c| c.id)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Places a store `km` kilometres due north of the origin point.
    fn offset_north(origin: Coordinates, km: f64) -> Coordinates {
        Coordinates::new(origin.latitude + km / 111.0, origin.longitude)
    }

    fn draft(store_id: i64, coords: Coordinates, self_delivery: bool) -> SubOrderDraft {
        SubOrderDraft {
            seller_id: store_id,
            store_id,
            store_coordinates: coords,
            self_delivery,
            subtotal: Money::from_cents(1_000),
            delivery_charge: Money::from_cents(999),
            items: vec![],
        }
    }

    const CUSTOMER: Coordinates = Coordinates { latitude: -1.2900, longitude: 36.8200 };

    #[test]
    fn worked_example_from_design_review() {
        // Stores at 0, 1.2, 1.9, 2.3 and 4.0 km from the customer, all on the same bearing, with
        // a 2.0 km anchor threshold. Expected batches: {0, 1.2, 1.9}, {2.3}, {4.0}.
        let drafts = [0.0, 1.2, 1.9, 2.3, 4.0]
            .iter()
            .enumerate()
            .map(|(i, km)| draft(i as i64 + 1, offset_north(CUSTOMER, *km), false))
            .collect();
        let plan = cluster_sub_orders(CUSTOMER, drafts, 2.0, Money::from_cents(150));
        assert_eq!(plan.batches.len(), 3);
        assert_eq!(plan.batches[0].member_indices, vec![0, 1, 2]);
        assert_eq!(plan.batches[1].member_indices, vec![3]);
        assert_eq!(plan.batches[2].member_indices, vec![4]);
    }

    #[test]
    fn members_are_within_threshold_of_their_anchor() {
        let kms = [0.3, 0.5, 1.0, 1.4, 2.2, 2.8, 5.5, 5.9];
        let drafts = kms
            .iter()
            .enumerate()
            .map(|(i, km)| draft(i as i64 + 1, offset_north(CUSTOMER, *km), false))
            .collect();
        let plan = cluster_sub_orders(CUSTOMER, drafts, 2.0, Money::from_cents(150));
        for batch in &plan.batches {
            let anchor = plan.sub_orders[batch.member_indices[0]].store_coordinates;
            for &i in &batch.member_indices {
                let d = distance_km(plan.sub_orders[i].store_coordinates, anchor);
                assert!(d <= 2.0 + 1e-6, "member {i} is {d} km from its anchor");
            }
        }
    }

    #[test]
    fn self_delivery_is_skipped_and_charge_zeroed() {
        let drafts = vec![
            draft(1, offset_north(CUSTOMER, 0.5), true),
            draft(2, offset_north(CUSTOMER, 1.0), false),
        ];
        let plan = cluster_sub_orders(CUSTOMER, drafts, 2.0, Money::from_cents(150));
        assert_eq!(plan.batches.len(), 1);
        let self_draft = plan.sub_orders.iter().find(|d| d.self_delivery).unwrap();
        assert_eq!(self_draft.delivery_charge, Money::default());
        let courier_draft = plan.sub_orders.iter().find(|d| !d.self_delivery).unwrap();
        assert_eq!(courier_draft.delivery_charge, Money::from_cents(150));
        // the only batch member is the courier draft
        let member = &plan.sub_orders[plan.batches[0].member_indices[0]];
        assert!(!member.self_delivery);
    }

    #[test]
    fn fully_self_delivery_checkout_yields_no_batches() {
        let drafts = vec![
            draft(1, offset_north(CUSTOMER, 0.5), true),
            draft(2, offset_north(CUSTOMER, 3.0), true),
        ];
        let plan = cluster_sub_orders(CUSTOMER, drafts, 2.0, Money::from_cents(150));
        assert!(plan.batches.is_empty());
        assert_eq!(plan.sub_orders.len(), 2);
    }

    #[test]
    fn single_courier_sub_order_yields_one_batch() {
        let drafts = vec![draft(1, offset_north(CUSTOMER, 1.0), false)];
        let plan = cluster_sub_orders(CUSTOMER, drafts, 2.0, Money::from_cents(150));
        assert_eq!(plan.batches.len(), 1);
        assert_eq!(plan.batches[0].member_indices, vec![0]);
    }

    #[test]
    fn invalid_coordinates_isolate_the_store() {
        let drafts = vec![
            draft(1, offset_north(CUSTOMER, 0.2), false),
            draft(2, Coordinates::new(0.0, 0.0), false),
            draft(3, offset_north(CUSTOMER, 0.4), false),
        ];
        let plan = cluster_sub_orders(CUSTOMER, drafts, 2.0, Money::from_cents(150));
        // stores 1 and 3 cluster together; the unlocatable store sorts last and sits alone
        assert_eq!(plan.batches.len(), 2);
        assert_eq!(plan.batches[0].member_indices.len(), 2);
        let lone = &plan.sub_orders[plan.batches[1].member_indices[0]];
        assert_eq!(lone.store_id, 2);
    }

    #[test]
    fn first_available_policy_skips_busy_couriers() {
        let couriers = vec![
            Courier { id: 1, name: "a".into(), phone: "1".into(), available: false },
            Courier { id: 2, name: "b".into(), phone: "2".into(), available: true },
            Courier { id: 3, name: "c".into(), phone: "3".into(), available: true },
        ];
        assert_eq!(FirstAvailable.assign(&couriers, &[]), Some(2));
        assert_eq!(FirstAvailable.assign(&[], &[]), None);
    }
}

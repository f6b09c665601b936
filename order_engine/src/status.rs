//! Transition tables for the three status domains.
//!
//! Statuses are closed sets of named variants; legality is decided by explicit `match` tables
//! rather than ordering or index comparisons. Every mutation of a status column must first pass
//! through [`MasterOrderStatus::can_transition_to`], [`SubOrderStatus::can_transition_to`] or
//! [`DeliveryBatchStatus::can_transition_to`].

use crate::db_types::{DeliveryBatchStatus, MasterOrderStatus, SubOrderStatus};

impl MasterOrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MasterOrderStatus::Delivered | MasterOrderStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: MasterOrderStatus) -> bool {
        use MasterOrderStatus::*;
        match (*self, next) {
            (old, new) if old == new => false,
            (old, Cancelled) => !old.is_terminal(),
            (Pending, Confirmed) => true,
            (Confirmed, OutForDelivery) => true,
            (OutForDelivery, Delivered) => true,
            // An admin may close out an order that never went through the intermediate states,
            // e.g. a fully self-delivery checkout.
            (Pending | Confirmed, Delivered) => true,
            (_, _) => false,
        }
    }
}

impl SubOrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubOrderStatus::DeliveredByCourier
                | SubOrderStatus::DeliveredBySeller
                | SubOrderStatus::Cancelled
        )
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, SubOrderStatus::DeliveredByCourier | SubOrderStatus::DeliveredBySeller)
    }

    pub fn can_transition_to(&self, next: SubOrderStatus) -> bool {
        use SubOrderStatus::*;
        match (*self, next) {
            (old, new) if old == new => false,
            (old, Cancelled) => !old.is_terminal(),
            (Pending, Processing) => true,
            (Processing, ReadyForPickup) => true,
            (ReadyForPickup, PickedUp) => true,
            (PickedUp, OutForDelivery) => true,
            (OutForDelivery, DeliveredByCourier) => true,
            // Self-delivery sub-orders skip the courier pickup leg.
            (Processing | ReadyForPickup | OutForDelivery, DeliveredBySeller) => true,
            (_, _) => false,
        }
    }

    /// The terminal delivered variant for a sub-order, depending on who fulfils it.
    pub fn delivered_variant(self_delivery: bool) -> SubOrderStatus {
        if self_delivery {
            SubOrderStatus::DeliveredBySeller
        } else {
            SubOrderStatus::DeliveredByCourier
        }
    }
}

impl DeliveryBatchStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeliveryBatchStatus::Delivered | DeliveryBatchStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: DeliveryBatchStatus) -> bool {
        use DeliveryBatchStatus::*;
        match (*self, next) {
            (old, new) if old == new => false,
            (old, Cancelled) => !old.is_terminal(),
            (Pending, Accepted) => true,
            (Accepted, PickedUp) => true,
            (PickedUp, OutForDelivery) => true,
            (OutForDelivery, Delivered) => true,
            (_, _) => false,
        }
    }

    /// The sub-order status that mirrors a courier's batch-level progress update.
    pub fn sub_order_equivalent(&self) -> Option<SubOrderStatus> {
        match self {
            DeliveryBatchStatus::PickedUp => Some(SubOrderStatus::PickedUp),
            DeliveryBatchStatus::OutForDelivery => Some(SubOrderStatus::OutForDelivery),
            DeliveryBatchStatus::Delivered => Some(SubOrderStatus::DeliveredByCourier),
            DeliveryBatchStatus::Cancelled => Some(SubOrderStatus::Cancelled),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn master_order_happy_path() {
        use MasterOrderStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(OutForDelivery));
        assert!(OutForDelivery.can_transition_to(Delivered));
        assert!(!Delivered.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn cancelled_reachable_from_any_non_terminal() {
        use MasterOrderStatus::*;
        for s in [Pending, Confirmed, OutForDelivery] {
            assert!(s.can_transition_to(Cancelled), "{s} -> Cancelled should be legal");
        }
        assert!(!Delivered.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Cancelled));
    }

    #[test]
    fn sub_order_courier_leg() {
        use SubOrderStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(ReadyForPickup));
        assert!(ReadyForPickup.can_transition_to(PickedUp));
        assert!(PickedUp.can_transition_to(OutForDelivery));
        assert!(OutForDelivery.can_transition_to(DeliveredByCourier));
        assert!(!Pending.can_transition_to(DeliveredByCourier));
        assert!(!DeliveredByCourier.can_transition_to(Cancelled));
    }

    #[test]
    fn sub_order_seller_shortcut() {
        use SubOrderStatus::*;
        assert!(Processing.can_transition_to(DeliveredBySeller));
        assert!(!Pending.can_transition_to(DeliveredBySeller));
        assert!(!PickedUp.can_transition_to(DeliveredBySeller));
    }

    #[test]
    fn batch_transitions() {
        use DeliveryBatchStatus::*;
        assert!(Pending.can_transition_to(Accepted));
        assert!(Accepted.can_transition_to(PickedUp));
        assert!(PickedUp.can_transition_to(OutForDelivery));
        assert!(OutForDelivery.can_transition_to(Delivered));
        assert!(Accepted.can_transition_to(Cancelled));
        assert!(!Delivered.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Delivered));
    }

    #[test]
    fn delivered_variant_tracks_fulfilment_mode() {
        assert_eq!(SubOrderStatus::delivered_variant(true), SubOrderStatus::DeliveredBySeller);
        assert_eq!(SubOrderStatus::delivered_variant(false), SubOrderStatus::DeliveredByCourier);
    }
}

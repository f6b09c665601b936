use std::{fmt::Debug, sync::Arc};

use chrono::Utc;
use log::*;
use mkp_common::Money;

use crate::{
    api::{errors::OrderFlowError, order_objects::CheckoutRequest},
    checkout::{build_sub_order_drafts, verify_declared_amount},
    clustering::{cluster_sub_orders, AssignmentPolicy, FirstAvailable},
    config::OrderEngineConfig,
    db_types::{
        Actor, ActorRole, AddressSelector, Coordinates, DeliveryBatch, DeliveryBatchStatus,
        MasterOrder, MasterOrderStatus, OrderTracking, SubOrder, SubOrderStatus,
    },
    events::{
        BatchAcceptedEvent, DeliveryCompletedEvent, DeliveryOtpEvent, EventProducers,
        OrderPlacedEvent, OrderStatusChangedEvent, SubOrderStatusChangedEvent,
    },
    helpers::generate_otp,
    traits::{
        BatchDraft, CheckoutPlan, Geocoder, LogOnlyMessenger, Messenger, NullGeocoder,
        OrderGatewayDatabase, OrderWithChildren, PlacedOrder, PurchasedItem,
    },
};

/// `OrderFlowApi` is the primary API for placing orders and driving them through the delivery
/// lifecycle. All planning (validation, drafting, clustering, courier assignment) happens here as
/// pure computation; the backend applies the resulting plan in a single transaction and events are
/// published only after that transaction has committed.
pub struct OrderFlowApi<B, G = NullGeocoder, M = LogOnlyMessenger> {
    db: B,
    geocoder: G,
    messenger: M,
    producers: EventProducers,
    policy: Arc<dyn AssignmentPolicy>,
    config: OrderEngineConfig,
}

impl<B, G, M> Debug for OrderFlowApi<B, G, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers, config: OrderEngineConfig) -> Self {
        Self {
            db,
            geocoder: NullGeocoder,
            messenger: LogOnlyMessenger,
            producers,
            policy: Arc::new(FirstAvailable),
            config,
        }
    }
}

impl<B, G, M> OrderFlowApi<B, G, M> {
    pub fn with_geocoder<G2>(self, geocoder: G2) -> OrderFlowApi<B, G2, M> {
        OrderFlowApi {
            db: self.db,
            geocoder,
            messenger: self.messenger,
            producers: self.producers,
            policy: self.policy,
            config: self.config,
        }
    }

    pub fn with_messenger<M2>(self, messenger: M2) -> OrderFlowApi<B, G, M2> {
        OrderFlowApi {
            db: self.db,
            geocoder: self.geocoder,
            messenger,
            producers: self.producers,
            policy: self.policy,
            config: self.config,
        }
    }

    pub fn with_assignment_policy(mut self, policy: Arc<dyn AssignmentPolicy>) -> Self {
        self.policy = policy;
        self
    }
}

impl<B, G, M> OrderFlowApi<B, G, M>
where
    B: OrderGatewayDatabase,
    G: Geocoder,
    M: Messenger,
{
    /// Checks out the customer's saved cart as one master order and clears the cart in the same
    /// transaction. See [`Self::place_direct_order`] for the single-product variant.
    pub async fn place_order_from_cart(
        &self,
        customer_id: i64,
        request: CheckoutRequest,
    ) -> Result<PlacedOrder, OrderFlowError> {
        let items = self.db.load_cart(customer_id).await?;
        trace!("🔄️🛒️ Loaded {} cart line(s) for customer #{customer_id}", items.len());
        self.place_order(customer_id, items, request, true).await
    }

    /// "Buy now": checks out a single product at its current catalog price, leaving the cart
    /// untouched.
    pub async fn place_direct_order(
        &self,
        customer_id: i64,
        product_id: i64,
        quantity: i64,
        request: CheckoutRequest,
    ) -> Result<PlacedOrder, OrderFlowError> {
        let item = self.db.load_direct_item(product_id, quantity).await?;
        self.place_order(customer_id, vec![item], request, false).await
    }

    /// The shared checkout pipeline: validate and draft per-seller sub-orders, verify the declared
    /// amounts, cluster courier sub-orders into delivery batches, assign couriers, then hand the
    /// whole plan to the backend for one atomic commit.
    async fn place_order(
        &self,
        customer_id: i64,
        items: Vec<PurchasedItem>,
        request: CheckoutRequest,
        clear_cart: bool,
    ) -> Result<PlacedOrder, OrderFlowError> {
        let customer = self.db.fetch_customer(customer_id).await?;
        let seller_ids: Vec<i64> =
            items.iter().map(|i| i.product.seller_id).collect::<std::collections::BTreeSet<_>>().into_iter().collect();
        let stores = self.db.stores_for_sellers(&seller_ids).await?;
        let drafts = build_sub_order_drafts(&items, &stores)?;
        let subtotal: Money = drafts.iter().map(|d| d.subtotal).sum();
        verify_declared_amount("subtotal", request.declared_subtotal, subtotal)?;

        let (address, delivery_coords) = self.resolve_address(customer_id, request.address).await?;
        let plan = cluster_sub_orders(
            delivery_coords,
            drafts,
            self.config.proximity_threshold_km,
            self.config.delivery_fee,
        );
        let delivery_charge: Money = plan.sub_orders.iter().map(|d| d.delivery_charge).sum();
        verify_declared_amount("delivery charge", request.declared_delivery_charge, delivery_charge)?;
        let total = subtotal + delivery_charge;
        verify_declared_amount("total", request.declared_total, total)?;

        let couriers = self.db.available_couriers().await?;
        let estimated_delivery_at = Utc::now() + self.config.estimated_delivery_window;
        let batches = plan
            .batches
            .iter()
            .map(|outline| {
                let members: Vec<_> =
                    outline.member_indices.iter().map(|&i| &plan.sub_orders[i]).collect();
                let courier_id = self.policy.assign(&couriers, &members);
                BatchDraft {
                    courier_id,
                    otp_code: generate_otp(),
                    estimated_delivery_at,
                    member_indices: outline.member_indices.clone(),
                }
            })
            .collect();

        let checkout = CheckoutPlan {
            customer_id: customer.id,
            address,
            payment_method: request.payment_method,
            instructions: request.instructions,
            subtotal,
            delivery_charge,
            total,
            sub_orders: plan.sub_orders,
            batches,
            clear_cart,
        };
        let placed = self.db.commit_checkout(checkout).await?;
        info!(
            "🔄️🛒️ Order #{} placed for customer #{customer_id}: {} sub-order(s), {} batch(es), \
             total {total}",
            placed.order.id,
            placed.sub_orders.len(),
            placed.batches.len()
        );
        self.call_order_placed_hook(&placed).await;
        Ok(placed)
    }

    /// Resolves the address selector to something the backend can persist, and the coordinates to
    /// cluster around. A new address with missing components is enriched via the geocoder when one
    /// is available; a geocoding failure degrades to placeholder components and never blocks the
    /// order.
    async fn resolve_address(
        &self,
        customer_id: i64,
        selector: AddressSelector,
    ) -> Result<(AddressSelector, Coordinates), OrderFlowError> {
        match selector {
            AddressSelector::Existing(address_id) => {
                let address = self.db.fetch_address(customer_id, address_id).await?;
                Ok((AddressSelector::Existing(address_id), address.coordinates()))
            },
            AddressSelector::New(mut new_address) => {
                let coords = Coordinates::new(new_address.latitude, new_address.longitude);
                let missing_components = new_address.city.is_none()
                    || new_address.state.is_none()
                    || new_address.postal_code.is_none();
                if missing_components && coords.is_valid() {
                    match self.geocoder.resolve(coords).await {
                        Ok(components) => {
                            new_address.city = new_address.city.or(components.city);
                            new_address.state = new_address.state.or(components.state);
                            new_address.postal_code =
                                new_address.postal_code.or(components.postal_code);
                        },
                        Err(e) => {
                            warn!("🔄️🏠️ Geocoding failed, using placeholder components: {e}");
                        },
                    }
                }
                Ok((AddressSelector::New(new_address), coords))
            },
        }
    }

    /// A courier claims (or a pre-assigned courier confirms) a pending delivery batch.
    pub async fn accept_delivery_batch(
        &self,
        courier_id: i64,
        batch_id: i64,
    ) -> Result<DeliveryBatch, OrderFlowError> {
        let batch = self.db.accept_batch(courier_id, batch_id).await?;
        info!("🔄️🚚️ Batch #{batch_id} accepted by courier #{courier_id}");
        for emitter in &self.producers.batch_accepted_producer {
            emitter.publish_event(BatchAcceptedEvent::new(batch.clone())).await;
        }
        Ok(batch)
    }

    /// Advances one sub-order through its lifecycle on behalf of the acting seller, courier or
    /// admin. Authorization and transition legality are enforced by the backend inside the same
    /// transaction that applies the change.
    pub async fn advance_sub_order_status(
        &self,
        actor: Actor,
        sub_order_id: i64,
        new_status: SubOrderStatus,
    ) -> Result<SubOrder, OrderFlowError> {
        let old_status = self.db.fetch_sub_order(sub_order_id).await?.status;
        let sub = self.db.advance_sub_order(actor, sub_order_id, new_status).await?;
        debug!("🔄️📦️ Sub-order #{sub_order_id}: {old_status} -> {new_status} by {:?}", actor.role);
        for emitter in &self.producers.sub_order_status_producer {
            emitter.publish_event(SubOrderStatusChangedEvent::new(sub.clone(), old_status)).await;
        }
        Ok(sub)
    }

    /// Courier progress updates on a whole batch (picked up, out for delivery). The terminal
    /// `Delivered` state is deliberately unreachable here; it requires the OTP flow.
    pub async fn advance_batch_status(
        &self,
        actor: Actor,
        batch_id: i64,
        new_status: DeliveryBatchStatus,
    ) -> Result<DeliveryBatch, OrderFlowError> {
        let batch = self.db.advance_batch(actor, batch_id, new_status).await?;
        debug!("🔄️🚚️ Batch #{batch_id} moved to {new_status}");
        Ok(batch)
    }

    /// Generates a fresh confirmation code for the batch, stores it with its dispatch timestamp,
    /// and carries it to the customer out-of-band: directly over the configured [`Messenger`],
    /// and via the notification hook for any other channel. Returns `true` when at least one of
    /// the two actually took the code.
    pub async fn request_delivery_otp(
        &self,
        courier_id: i64,
        batch_id: i64,
    ) -> Result<bool, OrderFlowError> {
        let code = generate_otp();
        let sent_at = Utc::now();
        let batch = self.db.store_otp(courier_id, batch_id, &code, sent_at).await?;
        let order = self.db.fetch_master_order(batch.master_order_id).await?;
        let address = self.db.fetch_address(order.customer_id, batch.address_id).await?;
        info!("🔄️🔐️ Delivery code dispatched for batch #{batch_id}");
        let sms = format!(
            "Your delivery confirmation code is {code}. It expires in {} minutes.",
            self.config.otp_validity.num_minutes()
        );
        let delivered = match self.messenger.send(&address.phone, &sms).await {
            Ok(delivered) => delivered,
            Err(e) => {
                warn!("🔄️🔐️ Messenger could not carry the delivery code: {e}");
                false
            },
        };
        let dispatched = delivered || !self.producers.delivery_otp_producer.is_empty();
        for emitter in &self.producers.delivery_otp_producer {
            let event = DeliveryOtpEvent {
                batch_id,
                master_order_id: batch.master_order_id,
                phone: address.phone.clone(),
                code: code.clone(),
            };
            emitter.publish_event(event).await;
        }
        Ok(dispatched)
    }

    /// Completes a delivery with the code the customer read back to the courier. On success the
    /// batch, its member sub-orders and (once every child is delivered) the master order are all
    /// closed in one transaction.
    pub async fn complete_delivery(
        &self,
        courier_id: i64,
        batch_id: i64,
        code: &str,
    ) -> Result<OrderWithChildren, OrderFlowError> {
        let result = self
            .db
            .complete_delivery(courier_id, batch_id, code, Utc::now(), self.config.otp_validity)
            .await?;
        info!("🔄️🚚️ Batch #{batch_id} delivered; order #{} updated", result.order.id);
        if let Some(batch) = result.batches.iter().find(|b| b.id == batch_id) {
            for emitter in &self.producers.delivery_completed_producer {
                emitter
                    .publish_event(DeliveryCompletedEvent::new(batch.clone(), result.order.clone()))
                    .await;
            }
        }
        Ok(result)
    }

    /// Admin override for the master order status, with cascades to children. Customer
    /// cancellations also route through here with a customer actor; everything else is admin-only.
    pub async fn update_master_order_status(
        &self,
        actor: Actor,
        master_order_id: i64,
        new_status: MasterOrderStatus,
        reason: Option<&str>,
    ) -> Result<OrderWithChildren, OrderFlowError> {
        let authorized = match actor.role {
            ActorRole::Admin | ActorRole::System => true,
            // a customer may cancel their own pending order
            ActorRole::Customer if new_status == MasterOrderStatus::Cancelled => {
                let order = self.db.fetch_master_order(master_order_id).await?;
                order.customer_id == actor.id
            },
            _ => false,
        };
        if !authorized {
            return Err(OrderFlowError::NotAuthorized(format!(
                "{} #{} may not set order #{master_order_id} to {new_status}",
                actor.role, actor.id
            )));
        }
        let old_status = self.db.fetch_master_order(master_order_id).await?.status;
        let result = self.db.update_master_status(actor, master_order_id, new_status, reason).await?;
        info!("🔄️📦️ Order #{master_order_id}: {old_status} -> {new_status}");
        for emitter in &self.producers.order_status_producer {
            emitter
                .publish_event(OrderStatusChangedEvent::new(result.order.clone(), old_status))
                .await;
        }
        Ok(result)
    }

    //----- Read-side passthroughs -----

    pub async fn order_with_children(&self, id: i64) -> Result<OrderWithChildren, OrderFlowError> {
        Ok(self.db.order_with_children(id).await?)
    }

    pub async fn orders_for_customer(
        &self,
        customer_id: i64,
    ) -> Result<Vec<MasterOrder>, OrderFlowError> {
        Ok(self.db.orders_for_customer(customer_id).await?)
    }

    /// The customer's orders that have not yet been delivered or cancelled.
    pub async fn open_orders_for_customer(
        &self,
        customer_id: i64,
    ) -> Result<Vec<MasterOrder>, OrderFlowError> {
        Ok(self.db.open_orders_for_customer(customer_id).await?)
    }

    pub async fn tracking_for_order(
        &self,
        master_order_id: i64,
    ) -> Result<Vec<OrderTracking>, OrderFlowError> {
        Ok(self.db.tracking_for_order(master_order_id).await?)
    }

    pub async fn open_batches_for_courier(
        &self,
        courier_id: i64,
    ) -> Result<Vec<DeliveryBatch>, OrderFlowError> {
        Ok(self.db.open_batches_for_courier(courier_id).await?)
    }

    async fn call_order_placed_hook(&self, placed: &PlacedOrder) {
        for emitter in &self.producers.order_placed_producer {
            debug!("🔄️📬️ Notifying order placed hook subscribers");
            let event = OrderPlacedEvent::new(
                placed.order.clone(),
                placed.sub_orders.clone(),
                placed.batches.clone(),
            );
            emitter.publish_event(event).await;
        }
    }
}

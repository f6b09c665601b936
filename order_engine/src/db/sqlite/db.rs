use std::{collections::HashMap, fmt::Debug};

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, trace, warn};
use sqlx::SqlitePool;

use crate::{
    db::sqlite::{
        addresses, batches, catalog, db_url, new_pool, orders, orders::OrderQueryFilter, tracking,
        SqliteDatabaseError,
    },
    db_types::{
        Actor, Courier, Customer, DeliveryAddress, DeliveryBatch, DeliveryBatchStatus, MasterOrder,
        MasterOrderStatus, OrderTracking, Store, SubOrder, SubOrderStatus,
    },
    traits::{
        CheckoutPlan, OrderGatewayDatabase, OrderGatewayError, OrderWithChildren, PlacedOrder,
        PurchasedItem,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL from the environment.
    pub async fn new(max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Runs the embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), SqliteDatabaseError> {
        sqlx::migrate!("./src/db/sqlite/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| SqliteDatabaseError::QueryError(e.to_string()))?;
        info!("🗃️ Migrations complete");
        Ok(())
    }

    async fn order_with_children_inner(
        &self,
        id: i64,
    ) -> Result<OrderWithChildren, SqliteDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_master_order(id, &mut conn)
            .await?
            .ok_or(SqliteDatabaseError::OrderNotFound(id))?;
        let sub_orders = orders::sub_orders_for_master(id, &mut conn).await?;
        let batches = batches::batches_for_order(id, &mut conn).await?;
        let mut items = Vec::new();
        for sub in &sub_orders {
            items.extend(orders::items_for_sub_order(sub.id, &mut conn).await?);
        }
        Ok(OrderWithChildren { order, sub_orders, batches, items })
    }

    async fn commit_checkout_inner(
        &self,
        plan: CheckoutPlan,
    ) -> Result<PlacedOrder, SqliteDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let customer = catalog::customer_by_id(plan.customer_id, &mut tx)
            .await?
            .ok_or(SqliteDatabaseError::CustomerNotFound(plan.customer_id))?;
        let address = match &plan.address {
            crate::db_types::AddressSelector::Existing(id) => {
                addresses::address_for_customer(*id, customer.id, &mut tx)
                    .await?
                    .ok_or(SqliteDatabaseError::AddressNotFound(*id))?
            },
            crate::db_types::AddressSelector::New(new_address) => {
                addresses::insert_address(&customer, new_address, &mut tx).await?
            },
        };
        let master_id = orders::insert_master_order(
            customer.id,
            address.id,
            plan.subtotal,
            plan.delivery_charge,
            plan.total,
            &plan.payment_method,
            plan.instructions.as_deref(),
            &mut tx,
        )
        .await?;
        let mut sub_ids = Vec::with_capacity(plan.sub_orders.len());
        for draft in &plan.sub_orders {
            let sub_id = orders::insert_sub_order(master_id, draft, &mut tx).await?;
            for item in &draft.items {
                orders::insert_order_item(sub_id, item, &mut tx).await?;
                // Stock is re-validated here, against row state, at commit time.
                catalog::decrement_stock(item.product_id, item.quantity, &mut tx).await?;
            }
            sub_ids.push(sub_id);
        }
        for batch in &plan.batches {
            let batch_id = batches::insert_batch(
                master_id,
                address.id,
                batch.courier_id,
                &batch.otp_code,
                batch.estimated_delivery_at,
                &mut tx,
            )
            .await?;
            for &member in &batch.member_indices {
                orders::link_sub_order_to_batch(sub_ids[member], batch_id, &mut tx).await?;
            }
            tracking::append(
                master_id,
                None,
                Some(batch_id),
                &DeliveryBatchStatus::Pending.to_string(),
                Actor::system(),
                "Delivery batch created",
                &mut tx,
            )
            .await?;
        }
        tracking::append(
            master_id,
            None,
            None,
            &MasterOrderStatus::Pending.to_string(),
            Actor::customer(customer.id),
            "Order placed",
            &mut tx,
        )
        .await?;
        if plan.clear_cart {
            let cleared = catalog::clear_cart(customer.id, &mut tx).await?;
            trace!("🗃️ Cleared {cleared} cart line(s) for customer #{}", customer.id);
        }
        tx.commit().await?;
        debug!("🗃️ Checkout committed as master order #{master_id}");

        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_master_order(master_id, &mut conn)
            .await?
            .ok_or(SqliteDatabaseError::OrderNotFound(master_id))?;
        let sub_orders = orders::sub_orders_for_master(master_id, &mut conn).await?;
        let batch_rows = batches::batches_for_order(master_id, &mut conn).await?;
        Ok(PlacedOrder { order, sub_orders, batches: batch_rows, address })
    }

    async fn accept_batch_inner(
        &self,
        courier_id: i64,
        batch_id: i64,
    ) -> Result<DeliveryBatch, SqliteDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let batch = batches::fetch_batch(batch_id, &mut tx)
            .await?
            .ok_or(SqliteDatabaseError::BatchNotFound(batch_id))?;
        match batch.status {
            // A lost race on the guard below still reports the batch as taken.
            DeliveryBatchStatus::Pending | DeliveryBatchStatus::Accepted => {},
            other => {
                return Err(SqliteDatabaseError::IllegalTransition {
                    from: other.to_string(),
                    to: DeliveryBatchStatus::Accepted.to_string(),
                })
            },
        }
        if !batches::try_accept(batch_id, courier_id, &mut tx).await? {
            return Err(SqliteDatabaseError::BatchAlreadyAssigned(batch_id));
        }
        tracking::append(
            batch.master_order_id,
            None,
            Some(batch_id),
            &DeliveryBatchStatus::Accepted.to_string(),
            Actor::courier(courier_id),
            "Delivery batch accepted by courier",
            &mut tx,
        )
        .await?;
        let updated = batches::fetch_batch(batch_id, &mut tx)
            .await?
            .ok_or(SqliteDatabaseError::BatchNotFound(batch_id))?;
        tx.commit().await?;
        debug!("🗃️ Batch #{batch_id} accepted by courier #{courier_id}");
        Ok(updated)
    }

    fn authorize_sub_order_actor(
        actor: Actor,
        sub: &SubOrder,
        batch_courier: Option<i64>,
    ) -> Result<(), SqliteDatabaseError> {
        use crate::db_types::ActorRole::*;
        match actor.role {
            Admin | System => Ok(()),
            Seller if actor.id == sub.seller_id => Ok(()),
            Courier if batch_courier == Some(actor.id) => Ok(()),
            _ => Err(SqliteDatabaseError::NotAuthorized(format!(
                "{} #{} may not update sub-order #{}",
                actor.role, actor.id, sub.id
            ))),
        }
    }

    async fn advance_sub_order_inner(
        &self,
        actor: Actor,
        sub_order_id: i64,
        new_status: SubOrderStatus,
    ) -> Result<SubOrder, SqliteDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let sub = orders::fetch_sub_order(sub_order_id, &mut tx)
            .await?
            .ok_or(SqliteDatabaseError::SubOrderNotFound(sub_order_id))?;
        let batch_courier = match sub.delivery_batch_id {
            Some(batch_id) => {
                batches::fetch_batch(batch_id, &mut tx).await?.and_then(|b| b.courier_id)
            },
            None => None,
        };
        Self::authorize_sub_order_actor(actor, &sub, batch_courier)?;
        if !sub.status.can_transition_to(new_status) {
            return Err(SqliteDatabaseError::IllegalTransition {
                from: sub.status.to_string(),
                to: new_status.to_string(),
            });
        }
        // The delivered variant must match the fulfilment mode.
        let mode_mismatch = (new_status == SubOrderStatus::DeliveredBySeller && !sub.self_delivery)
            || (new_status == SubOrderStatus::DeliveredByCourier && sub.self_delivery);
        if mode_mismatch {
            return Err(SqliteDatabaseError::IllegalTransition {
                from: sub.status.to_string(),
                to: new_status.to_string(),
            });
        }
        orders::update_sub_order_status(sub.id, new_status, &mut tx).await?;
        tracking::append(
            sub.master_order_id,
            Some(sub.id),
            None,
            &new_status.to_string(),
            actor,
            "Sub-order status updated",
            &mut tx,
        )
        .await?;
        Self::roll_up_master_if_delivered(sub.master_order_id, &mut tx).await?;
        let updated = orders::fetch_sub_order(sub.id, &mut tx)
            .await?
            .ok_or(SqliteDatabaseError::SubOrderNotFound(sub.id))?;
        tx.commit().await?;
        Ok(updated)
    }

    /// Marks the master order delivered once every child sub-order has reached a delivered state.
    async fn roll_up_master_if_delivered(
        master_order_id: i64,
        tx: &mut sqlx::SqliteConnection,
    ) -> Result<(), SqliteDatabaseError> {
        let subs = orders::sub_orders_for_master(master_order_id, tx).await?;
        if subs.is_empty() || !subs.iter().all(|s| s.status.is_delivered()) {
            return Ok(());
        }
        let order = orders::fetch_master_order(master_order_id, tx)
            .await?
            .ok_or(SqliteDatabaseError::OrderNotFound(master_order_id))?;
        if order.status.can_transition_to(MasterOrderStatus::Delivered) {
            orders::update_master_status(master_order_id, MasterOrderStatus::Delivered, tx).await?;
            tracking::append(
                master_order_id,
                None,
                None,
                &MasterOrderStatus::Delivered.to_string(),
                Actor::system(),
                "All sub-orders delivered",
                tx,
            )
            .await?;
            debug!("🗃️ Master order #{master_order_id} is fully delivered");
        }
        Ok(())
    }

    async fn advance_batch_inner(
        &self,
        actor: Actor,
        batch_id: i64,
        new_status: DeliveryBatchStatus,
    ) -> Result<DeliveryBatch, SqliteDatabaseError> {
        use crate::db_types::ActorRole::*;
        let mut tx = self.pool.begin().await?;
        let batch = batches::fetch_batch(batch_id, &mut tx)
            .await?
            .ok_or(SqliteDatabaseError::BatchNotFound(batch_id))?;
        match actor.role {
            Admin | System => {},
            Courier if batch.courier_id == Some(actor.id) => {},
            _ => {
                return Err(SqliteDatabaseError::NotAuthorized(format!(
                    "{} #{} may not update batch #{batch_id}",
                    actor.role, actor.id
                )))
            },
        }
        if new_status == DeliveryBatchStatus::Delivered {
            return Err(SqliteDatabaseError::NotAuthorized(
                "completing a delivery requires OTP confirmation".to_string(),
            ));
        }
        if !batch.status.can_transition_to(new_status) {
            return Err(SqliteDatabaseError::IllegalTransition {
                from: batch.status.to_string(),
                to: new_status.to_string(),
            });
        }
        batches::update_status(batch_id, new_status, &mut tx).await?;
        tracking::append(
            batch.master_order_id,
            None,
            Some(batch_id),
            &new_status.to_string(),
            actor,
            "Delivery batch status updated",
            &mut tx,
        )
        .await?;
        // Mirror the courier's progress onto member sub-orders where the transition is legal.
        if let Some(sub_status) = new_status.sub_order_equivalent() {
            for member in batches::members(batch_id, &mut tx).await? {
                if member.status.can_transition_to(sub_status) {
                    orders::update_sub_order_status(member.id, sub_status, &mut tx).await?;
                    tracking::append(
                        member.master_order_id,
                        Some(member.id),
                        Some(batch_id),
                        &sub_status.to_string(),
                        actor,
                        "Mirrored from delivery batch update",
                        &mut tx,
                    )
                    .await?;
                } else {
                    warn!(
                        "🗃️ Sub-order #{} at {} cannot mirror batch status {new_status}",
                        member.id, member.status
                    );
                }
            }
        }
        let updated = batches::fetch_batch(batch_id, &mut tx)
            .await?
            .ok_or(SqliteDatabaseError::BatchNotFound(batch_id))?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn store_otp_inner(
        &self,
        courier_id: i64,
        batch_id: i64,
        code: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<DeliveryBatch, SqliteDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let batch = batches::fetch_batch(batch_id, &mut tx)
            .await?
            .ok_or(SqliteDatabaseError::BatchNotFound(batch_id))?;
        if batch.courier_id != Some(courier_id) {
            return Err(SqliteDatabaseError::NotAuthorized(format!(
                "Courier #{courier_id} is not assigned to batch #{batch_id}"
            )));
        }
        if batch.status.is_terminal() {
            return Err(SqliteDatabaseError::IllegalTransition {
                from: batch.status.to_string(),
                to: "OTP dispatch".to_string(),
            });
        }
        batches::set_otp(batch_id, code, sent_at, &mut tx).await?;
        let updated = batches::fetch_batch(batch_id, &mut tx)
            .await?
            .ok_or(SqliteDatabaseError::BatchNotFound(batch_id))?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn complete_delivery_inner(
        &self,
        courier_id: i64,
        batch_id: i64,
        code: &str,
        now: DateTime<Utc>,
        validity: Duration,
    ) -> Result<i64, SqliteDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let batch = batches::fetch_batch(batch_id, &mut tx)
            .await?
            .ok_or(SqliteDatabaseError::BatchNotFound(batch_id))?;
        if batch.courier_id != Some(courier_id) {
            return Err(SqliteDatabaseError::NotAuthorized(format!(
                "Courier #{courier_id} is not assigned to batch #{batch_id}"
            )));
        }
        let sent_at = match (&batch.otp_code, batch.otp_sent_at) {
            (Some(_), Some(sent_at)) => sent_at,
            _ => return Err(SqliteDatabaseError::OtpNotRequested(batch_id)),
        };
        if now - sent_at > validity {
            // Expired codes are cleared eagerly; the courier must request a fresh one.
            batches::clear_otp(batch_id, &mut tx).await?;
            tx.commit().await?;
            warn!("🗃️ OTP for batch #{batch_id} expired and was cleared");
            return Err(SqliteDatabaseError::OtpExpired);
        }
        // Compare-and-complete in one guarded statement; a mismatch changes nothing.
        if !batches::complete_if_code_matches(batch_id, code, &mut tx).await? {
            return Err(SqliteDatabaseError::InvalidOtp);
        }
        let actor = Actor::courier(courier_id);
        tracking::append(
            batch.master_order_id,
            None,
            Some(batch_id),
            &DeliveryBatchStatus::Delivered.to_string(),
            actor,
            "Delivery confirmed with OTP",
            &mut tx,
        )
        .await?;
        for member in batches::members(batch_id, &mut tx).await? {
            if member.status.is_terminal() {
                continue;
            }
            orders::update_sub_order_status(member.id, SubOrderStatus::DeliveredByCourier, &mut tx)
                .await?;
            tracking::append(
                member.master_order_id,
                Some(member.id),
                Some(batch_id),
                &SubOrderStatus::DeliveredByCourier.to_string(),
                actor,
                "Delivered by courier",
                &mut tx,
            )
            .await?;
        }
        Self::roll_up_master_if_delivered(batch.master_order_id, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Batch #{batch_id} delivered by courier #{courier_id}");
        Ok(batch.master_order_id)
    }

    async fn update_master_status_inner(
        &self,
        actor: Actor,
        master_order_id: i64,
        new_status: MasterOrderStatus,
        reason: Option<&str>,
    ) -> Result<(), SqliteDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_master_order(master_order_id, &mut tx)
            .await?
            .ok_or(SqliteDatabaseError::OrderNotFound(master_order_id))?;
        if !order.status.can_transition_to(new_status) {
            return Err(SqliteDatabaseError::IllegalTransition {
                from: order.status.to_string(),
                to: new_status.to_string(),
            });
        }
        match new_status {
            MasterOrderStatus::Cancelled => {
                for sub in orders::sub_orders_for_master(master_order_id, &mut tx).await? {
                    if sub.status.is_terminal() {
                        continue;
                    }
                    orders::update_sub_order_status(sub.id, SubOrderStatus::Cancelled, &mut tx)
                        .await?;
                    tracking::append(
                        master_order_id,
                        Some(sub.id),
                        None,
                        &SubOrderStatus::Cancelled.to_string(),
                        actor,
                        "Cancelled with master order",
                        &mut tx,
                    )
                    .await?;
                }
                for batch in batches::batches_for_order(master_order_id, &mut tx).await? {
                    if batch.status.is_terminal() {
                        continue;
                    }
                    batches::update_status(batch.id, DeliveryBatchStatus::Cancelled, &mut tx)
                        .await?;
                    tracking::append(
                        master_order_id,
                        None,
                        Some(batch.id),
                        &DeliveryBatchStatus::Cancelled.to_string(),
                        actor,
                        "Cancelled with master order",
                        &mut tx,
                    )
                    .await?;
                }
            },
            MasterOrderStatus::Delivered => {
                for sub in orders::sub_orders_for_master(master_order_id, &mut tx).await? {
                    if sub.status.is_terminal() {
                        continue;
                    }
                    let delivered = SubOrderStatus::delivered_variant(sub.self_delivery);
                    orders::update_sub_order_status(sub.id, delivered, &mut tx).await?;
                    tracking::append(
                        master_order_id,
                        Some(sub.id),
                        None,
                        &delivered.to_string(),
                        actor,
                        "Marked delivered with master order",
                        &mut tx,
                    )
                    .await?;
                }
                for batch in batches::batches_for_order(master_order_id, &mut tx).await? {
                    if batch.status.is_terminal() {
                        continue;
                    }
                    batches::update_status(batch.id, DeliveryBatchStatus::Delivered, &mut tx)
                        .await?;
                    tracking::append(
                        master_order_id,
                        None,
                        Some(batch.id),
                        &DeliveryBatchStatus::Delivered.to_string(),
                        actor,
                        "Closed with master order delivery",
                        &mut tx,
                    )
                    .await?;
                }
            },
            _ => {},
        }
        orders::update_master_status(master_order_id, new_status, &mut tx).await?;
        let message = match reason {
            Some(reason) => format!("Status changed to {new_status}: {reason}"),
            None => format!("Status changed to {new_status}"),
        };
        tracking::append(master_order_id, None, None, &new_status.to_string(), actor, &message, &mut tx)
            .await?;
        tx.commit().await?;
        debug!("🗃️ Master order #{master_order_id} moved to {new_status}");
        Ok(())
    }
}

impl OrderGatewayDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn fetch_customer(&self, customer_id: i64) -> Result<Customer, OrderGatewayError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let customer = catalog::customer_by_id(customer_id, &mut conn)
            .await?
            .ok_or(SqliteDatabaseError::CustomerNotFound(customer_id))?;
        Ok(customer)
    }

    async fn load_cart(&self, customer_id: i64) -> Result<Vec<PurchasedItem>, OrderGatewayError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(catalog::cart_for_customer(customer_id, &mut conn).await?)
    }

    async fn load_direct_item(
        &self,
        product_id: i64,
        quantity: i64,
    ) -> Result<PurchasedItem, OrderGatewayError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let product = catalog::product_by_id(product_id, &mut conn)
            .await?
            .ok_or(SqliteDatabaseError::ProductNotFound(product_id))?;
        let unit_price = product.price;
        Ok(PurchasedItem { product, quantity, unit_price })
    }

    async fn stores_for_sellers(
        &self,
        seller_ids: &[i64],
    ) -> Result<HashMap<i64, Store>, OrderGatewayError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let stores = catalog::stores_for_sellers(seller_ids, &mut conn).await?;
        let mut result = HashMap::with_capacity(stores.len());
        for store in stores {
            result.entry(store.seller_id).or_insert(store);
        }
        Ok(result)
    }

    async fn available_couriers(&self) -> Result<Vec<Courier>, OrderGatewayError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(catalog::available_couriers(&mut conn).await?)
    }

    async fn fetch_address(
        &self,
        customer_id: i64,
        address_id: i64,
    ) -> Result<DeliveryAddress, OrderGatewayError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let address = addresses::address_for_customer(address_id, customer_id, &mut conn)
            .await?
            .ok_or(SqliteDatabaseError::AddressNotFound(address_id))?;
        Ok(address)
    }

    async fn commit_checkout(&self, plan: CheckoutPlan) -> Result<PlacedOrder, OrderGatewayError> {
        Ok(self.commit_checkout_inner(plan).await?)
    }

    async fn fetch_master_order(&self, id: i64) -> Result<MasterOrder, OrderGatewayError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let order = orders::fetch_master_order(id, &mut conn)
            .await?
            .ok_or(SqliteDatabaseError::OrderNotFound(id))?;
        Ok(order)
    }

    async fn fetch_sub_order(&self, id: i64) -> Result<SubOrder, OrderGatewayError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let sub = orders::fetch_sub_order(id, &mut conn)
            .await?
            .ok_or(SqliteDatabaseError::SubOrderNotFound(id))?;
        Ok(sub)
    }

    async fn fetch_batch(&self, id: i64) -> Result<DeliveryBatch, OrderGatewayError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let batch = batches::fetch_batch(id, &mut conn)
            .await?
            .ok_or(SqliteDatabaseError::BatchNotFound(id))?;
        Ok(batch)
    }

    async fn order_with_children(&self, id: i64) -> Result<OrderWithChildren, OrderGatewayError> {
        Ok(self.order_with_children_inner(id).await?)
    }

    async fn orders_for_customer(
        &self,
        customer_id: i64,
    ) -> Result<Vec<MasterOrder>, OrderGatewayError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let filter = OrderQueryFilter::default().with_customer_id(customer_id);
        Ok(orders::fetch_master_orders(filter, &mut conn).await?)
    }

    async fn open_orders_for_customer(
        &self,
        customer_id: i64,
    ) -> Result<Vec<MasterOrder>, OrderGatewayError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        let filter = OrderQueryFilter::default()
            .with_customer_id(customer_id)
            .with_status(MasterOrderStatus::Pending)
            .with_status(MasterOrderStatus::Confirmed)
            .with_status(MasterOrderStatus::OutForDelivery);
        Ok(orders::fetch_master_orders(filter, &mut conn).await?)
    }

    async fn tracking_for_order(
        &self,
        master_order_id: i64,
    ) -> Result<Vec<OrderTracking>, OrderGatewayError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(tracking::trail_for_order(master_order_id, &mut conn).await?)
    }

    async fn open_batches_for_courier(
        &self,
        courier_id: i64,
    ) -> Result<Vec<DeliveryBatch>, OrderGatewayError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(batches::open_batches_for_courier(courier_id, &mut conn).await?)
    }

    async fn accept_batch(
        &self,
        courier_id: i64,
        batch_id: i64,
    ) -> Result<DeliveryBatch, OrderGatewayError> {
        Ok(self.accept_batch_inner(courier_id, batch_id).await?)
    }

    async fn advance_sub_order(
        &self,
        actor: Actor,
        sub_order_id: i64,
        new_status: SubOrderStatus,
    ) -> Result<SubOrder, OrderGatewayError> {
        Ok(self.advance_sub_order_inner(actor, sub_order_id, new_status).await?)
    }

    async fn advance_batch(
        &self,
        actor: Actor,
        batch_id: i64,
        new_status: DeliveryBatchStatus,
    ) -> Result<DeliveryBatch, OrderGatewayError> {
        Ok(self.advance_batch_inner(actor, batch_id, new_status).await?)
    }

    async fn store_otp(
        &self,
        courier_id: i64,
        batch_id: i64,
        code: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<DeliveryBatch, OrderGatewayError> {
        Ok(self.store_otp_inner(courier_id, batch_id, code, sent_at).await?)
    }

    async fn complete_delivery(
        &self,
        courier_id: i64,
        batch_id: i64,
        code: &str,
        now: DateTime<Utc>,
        validity: Duration,
    ) -> Result<OrderWithChildren, OrderGatewayError> {
        let master_order_id =
            self.complete_delivery_inner(courier_id, batch_id, code, now, validity).await?;
        Ok(self.order_with_children_inner(master_order_id).await?)
    }

    async fn update_master_status(
        &self,
        actor: Actor,
        master_order_id: i64,
        new_status: MasterOrderStatus,
        reason: Option<&str>,
    ) -> Result<OrderWithChildren, OrderGatewayError> {
        self.update_master_status_inner(actor, master_order_id, new_status, reason).await?;
        Ok(self.order_with_children_inner(master_order_id).await?)
    }

    async fn close(&mut self) -> Result<(), OrderGatewayError> {
        self.pool.close().await;
        Ok(())
    }
}

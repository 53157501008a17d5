use crate::{
    auth::{require_admin, require_user, AuthUser},
    config::MaterializePolicy,
    entities::{
        order::{self, PAYMENT_STATUS_UNPAID},
        order_item, order_item_addon,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    models::{CartLine, OrderStatus},
};
use chrono::Utc;
use lazy_static::lazy_static;
use prometheus::{register_int_counter, IntCounter};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

lazy_static! {
    static ref ORDERS_MATERIALIZED: IntCounter = register_int_counter!(
        "orders_materialized_total",
        "Total number of orders written from a cart"
    )
    .expect("metric can be created");
    static ref ORDER_MATERIALIZATION_FAILURES: IntCounter = register_int_counter!(
        "order_materialization_failures_total",
        "Total number of checkouts that wrote no order"
    )
    .expect("metric can be created");
    static ref ORDER_LINES_DROPPED: IntCounter = register_int_counter!(
        "order_lines_dropped_total",
        "Cart lines or add-on snapshots skipped under the best-effort policy"
    )
    .expect("metric can be created");
}

/// Outcome of writing a cart as an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaterializationReport {
    pub order_id: Uuid,
    pub items_written: usize,
    /// Cart line indexes whose item row was not written.
    pub failed_lines: Vec<usize>,
    /// Cart line indexes whose item was written without its add-ons.
    pub addon_failures: Vec<usize>,
}

impl MaterializationReport {
    fn new(order_id: Uuid) -> Self {
        Self {
            order_id,
            items_written: 0,
            failed_lines: Vec::new(),
            addon_failures: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failed_lines.is_empty() && self.addon_failures.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderItemDetail {
    #[serde(flatten)]
    pub item: order_item::Model,
    pub addons: Vec<order_item_addon::Model>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: order::Model,
    pub items: Vec<OrderItemDetail>,
    /// Moves the staff board may offer from the current status.
    pub next_statuses: Vec<OrderStatus>,
}

/// Service for writing and reading orders.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Option<Arc<EventSender>>,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    /// Writes one order row plus an item row per cart line and an add-on row
    /// per selected add-on. Line prices are copied as they are; nothing is
    /// re-priced here.
    ///
    /// Under [`MaterializePolicy::Atomic`] any failed write rolls everything
    /// back. Under [`MaterializePolicy::BestEffort`] only a failed order row
    /// aborts; failed items and add-ons are logged, skipped and reported.
    #[instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn materialize(
        &self,
        user_id: Uuid,
        lines: &[CartLine],
        grand_total: Decimal,
        policy: MaterializePolicy,
    ) -> Result<MaterializationReport, ServiceError> {
        let result = match policy {
            MaterializePolicy::Atomic => self.materialize_atomic(user_id, lines, grand_total).await,
            MaterializePolicy::BestEffort => {
                self.materialize_best_effort(user_id, lines, grand_total)
                    .await
            }
        };

        match result {
            Ok(report) => {
                ORDERS_MATERIALIZED.inc();
                ORDER_LINES_DROPPED
                    .inc_by((report.failed_lines.len() + report.addon_failures.len()) as u64);

                if let Some(sender) = &self.event_sender {
                    sender
                        .send_or_log(Event::OrderCreated {
                            order_id: report.order_id,
                            user_id,
                        })
                        .await;
                }

                info!(
                    order_id = %report.order_id,
                    items = report.items_written,
                    complete = report.is_complete(),
                    "Order materialized"
                );
                Ok(report)
            }
            Err(e) => {
                ORDER_MATERIALIZATION_FAILURES.inc();
                Err(e)
            }
        }
    }

    async fn materialize_atomic(
        &self,
        user_id: Uuid,
        lines: &[CartLine],
        grand_total: Decimal,
    ) -> Result<MaterializationReport, ServiceError> {
        let txn = self.db.begin().await.map_err(creation_failed)?;

        let order_id = insert_order(&txn, user_id, grand_total)
            .await
            .map_err(|e| {
                error!("Failed to insert order row: {}", e);
                creation_failed(e)
            })?;

        let mut report = MaterializationReport::new(order_id);
        for (index, line) in lines.iter().enumerate() {
            let item_id = insert_item(&txn, order_id, index, line)
                .await
                .map_err(|e| {
                    error!(order_id = %order_id, line = index, "Failed to insert order item: {}", e);
                    creation_failed(e)
                })?;
            insert_item_addons(&txn, item_id, line)
                .await
                .map_err(|e| {
                    error!(order_id = %order_id, line = index, "Failed to insert item add-ons: {}", e);
                    creation_failed(e)
                })?;
            report.items_written += 1;
        }

        txn.commit().await.map_err(|e| {
            error!(order_id = %order_id, "Failed to commit order: {}", e);
            creation_failed(e)
        })?;

        Ok(report)
    }

    async fn materialize_best_effort(
        &self,
        user_id: Uuid,
        lines: &[CartLine],
        grand_total: Decimal,
    ) -> Result<MaterializationReport, ServiceError> {
        let order_id = insert_order(&*self.db, user_id, grand_total)
            .await
            .map_err(|e| {
                error!("Failed to insert order row: {}", e);
                creation_failed(e)
            })?;

        let mut report = MaterializationReport::new(order_id);
        for (index, line) in lines.iter().enumerate() {
            let item_id = match insert_item(&*self.db, order_id, index, line).await {
                Ok(id) => id,
                Err(e) => {
                    error!(order_id = %order_id, line = index, "Skipping order item: {}", e);
                    report.failed_lines.push(index);
                    continue;
                }
            };
            report.items_written += 1;

            if let Err(e) = insert_item_addons(&*self.db, item_id, line).await {
                error!(order_id = %order_id, line = index, "Skipping item add-ons: {}", e);
                report.addon_failures.push(index);
            }
        }

        if !report.is_complete() {
            warn!(
                order_id = %order_id,
                failed_lines = ?report.failed_lines,
                addon_failures = ?report.addon_failures,
                "Order written with missing rows"
            );
        }

        Ok(report)
    }

    /// Returns an order with its items. Customers may only read their own.
    #[instrument(skip(self, actor))]
    pub async fn get_order(
        &self,
        actor: Option<&AuthUser>,
        order_id: Uuid,
    ) -> Result<OrderDetail, ServiceError> {
        let user = require_user(actor)?;

        let order = order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if order.user_id != user.user_id && !user.is_admin() {
            return Err(ServiceError::Forbidden(
                "Order belongs to another customer".to_string(),
            ));
        }

        let mut details = attach_items(&*self.db, vec![order]).await?;
        details
            .pop()
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
    }

    /// The caller's orders, newest first.
    #[instrument(skip(self, actor))]
    pub async fn list_orders_for_user(
        &self,
        actor: Option<&AuthUser>,
    ) -> Result<Vec<OrderDetail>, ServiceError> {
        let user = require_user(actor)?;

        let orders = order::Entity::find()
            .filter(order::Column::UserId.eq(user.user_id))
            .order_by_desc(order::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        Ok(attach_items(&*self.db, orders).await?)
    }

    /// Most recent orders across all customers.
    #[instrument(skip(self, actor))]
    pub async fn list_recent_orders(
        &self,
        actor: Option<&AuthUser>,
        limit: u64,
    ) -> Result<Vec<OrderDetail>, ServiceError> {
        require_admin(actor)?;

        let orders = order::Entity::find()
            .order_by_desc(order::Column::CreatedAt)
            .limit(limit)
            .all(&*self.db)
            .await?;

        Ok(attach_items(&*self.db, orders).await?)
    }

    /// Deletes an order with its items and their add-on snapshots.
    #[instrument(skip(self, actor))]
    pub async fn delete_order(
        &self,
        actor: Option<&AuthUser>,
        order_id: Uuid,
    ) -> Result<(), ServiceError> {
        require_admin(actor)?;

        let txn = self.db.begin().await?;

        order::Entity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let item_ids: Vec<Uuid> = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|i| i.id)
            .collect();

        if !item_ids.is_empty() {
            order_item_addon::Entity::delete_many()
                .filter(order_item_addon::Column::OrderItemId.is_in(item_ids))
                .exec(&txn)
                .await?;
            order_item::Entity::delete_many()
                .filter(order_item::Column::OrderId.eq(order_id))
                .exec(&txn)
                .await?;
        }

        order::Entity::delete_by_id(order_id).exec(&txn).await?;
        txn.commit().await?;

        if let Some(sender) = &self.event_sender {
            sender.send_or_log(Event::OrderDeleted(order_id)).await;
        }

        info!(order_id = %order_id, "Order deleted");
        Ok(())
    }
}

fn creation_failed(err: DbErr) -> ServiceError {
    ServiceError::OrderCreationFailed(err.to_string())
}

async fn insert_order<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    grand_total: Decimal,
) -> Result<Uuid, DbErr> {
    let order_id = Uuid::new_v4();
    order::ActiveModel {
        id: Set(order_id),
        user_id: Set(user_id),
        total_amount: Set(grand_total),
        status: Set(OrderStatus::Pending),
        payment_status: Set(PAYMENT_STATUS_UNPAID.to_string()),
        created_at: Set(Utc::now()),
        updated_at: Set(None),
    }
    .insert(conn)
    .await?;
    Ok(order_id)
}

async fn insert_item<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    index: usize,
    line: &CartLine,
) -> Result<Uuid, DbErr> {
    let quantity = i32::try_from(line.quantity)
        .map_err(|_| DbErr::Custom(format!("Quantity {} out of range", line.quantity)))?;
    let position = i32::try_from(index)
        .map_err(|_| DbErr::Custom(format!("Line index {} out of range", index)))?;

    let item_id = Uuid::new_v4();
    order_item::ActiveModel {
        id: Set(item_id),
        order_id: Set(order_id),
        product_name: Set(line.product_name.clone()),
        variant_name: Set(line.variant_label.clone()),
        unit_price: Set(line.unit_price),
        quantity: Set(quantity),
        subtotal: Set(line.total_price),
        position: Set(position),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await?;
    Ok(item_id)
}

async fn insert_item_addons<C: ConnectionTrait>(
    conn: &C,
    item_id: Uuid,
    line: &CartLine,
) -> Result<(), DbErr> {
    if line.addons.is_empty() {
        return Ok(());
    }

    let rows = line
        .addons
        .iter()
        .map(|addon| order_item_addon::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_item_id: Set(item_id),
            addon_name: Set(addon.name.clone()),
            addon_price: Set(addon.price),
        });

    order_item_addon::Entity::insert_many(rows)
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

async fn attach_items<C: ConnectionTrait>(
    conn: &C,
    orders: Vec<order::Model>,
) -> Result<Vec<OrderDetail>, DbErr> {
    if orders.is_empty() {
        return Ok(Vec::new());
    }

    let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let items = order_item::Entity::find()
        .filter(order_item::Column::OrderId.is_in(order_ids))
        .order_by_asc(order_item::Column::Position)
        .all(conn)
        .await?;

    let item_ids: Vec<Uuid> = items.iter().map(|i| i.id).collect();
    let addons = if item_ids.is_empty() {
        Vec::new()
    } else {
        order_item_addon::Entity::find()
            .filter(order_item_addon::Column::OrderItemId.is_in(item_ids))
            .all(conn)
            .await?
    };

    let mut addons_by_item: HashMap<Uuid, Vec<order_item_addon::Model>> = HashMap::new();
    for addon in addons {
        addons_by_item
            .entry(addon.order_item_id)
            .or_default()
            .push(addon);
    }

    let mut items_by_order: HashMap<Uuid, Vec<OrderItemDetail>> = HashMap::new();
    for item in items {
        let addons = addons_by_item.remove(&item.id).unwrap_or_default();
        items_by_order
            .entry(item.order_id)
            .or_default()
            .push(OrderItemDetail { item, addons });
    }

    Ok(orders
        .into_iter()
        .map(|order| {
            let items = items_by_order.remove(&order.id).unwrap_or_default();
            OrderDetail {
                next_statuses: order.status.next_statuses(),
                order,
                items,
            }
        })
        .collect())
}

use std::sync::Arc;

use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection, EntityTrait, TransactionTrait};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{
    auth::{require_admin, AuthUser},
    entities::order::{ActiveModel as OrderActiveModel, Entity as OrderEntity, Model as OrderModel},
    errors::ServiceError,
    events::{Event, EventSender},
    models::OrderStatus,
};

/// Staff-driven order lifecycle.
#[derive(Clone)]
pub struct OrderStatusService {
    db: Arc<DatabaseConnection>,
    event_sender: Option<Arc<EventSender>>,
    enforce_transitions: bool,
}

impl OrderStatusService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Option<Arc<EventSender>>,
        enforce_transitions: bool,
    ) -> Self {
        Self {
            db,
            event_sender,
            enforce_transitions,
        }
    }

    /// Moves an order to `new_status`. Writing the current status again is a
    /// successful no-op.
    #[instrument(skip(self, actor), fields(order_id = %order_id, new_status = %new_status))]
    pub async fn update_status(
        &self,
        actor: Option<&AuthUser>,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<OrderModel, ServiceError> {
        require_admin(actor)?;

        let txn = self.db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let order = OrderEntity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let old_status = order.status;
        if old_status == new_status {
            return Ok(order);
        }

        if self.enforce_transitions && !old_status.can_transition_to(new_status) {
            error!("Invalid status transition from {} to {}", old_status, new_status);
            return Err(ServiceError::InvalidStatusTransition {
                from: old_status,
                to: new_status,
            });
        }

        let mut active: OrderActiveModel = order.into();
        active.status = Set(new_status);
        let updated = active.update(&txn).await.map_err(|e| {
            error!("Failed to update order {} status: {}", order_id, e);
            ServiceError::DatabaseError(e)
        })?;

        txn.commit().await.map_err(|e| {
            error!("Failed to commit transaction for order {}: {}", order_id, e);
            ServiceError::DatabaseError(e)
        })?;

        if let Some(sender) = &self.event_sender {
            sender
                .send_or_log(Event::OrderStatusChanged {
                    order_id,
                    from: old_status,
                    to: new_status,
                })
                .await;
        }

        info!(
            "Order {} status updated from '{}' to '{}'",
            order_id, old_status, new_status
        );

        Ok(updated)
    }

    /// Gets the current status of an order
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_status(&self, order_id: Uuid) -> Result<OrderStatus, ServiceError> {
        let order = OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        Ok(order.status)
    }

    /// Applies the same status to several orders. Orders that cannot move are
    /// logged and left out of the result.
    #[instrument(skip(self, actor, order_ids), fields(count = order_ids.len()))]
    pub async fn batch_update_status(
        &self,
        actor: Option<&AuthUser>,
        order_ids: Vec<Uuid>,
        new_status: OrderStatus,
    ) -> Result<Vec<OrderModel>, ServiceError> {
        require_admin(actor)?;

        let mut updated_orders = Vec::new();
        for order_id in order_ids {
            match self.update_status(actor, order_id, new_status).await {
                Ok(order) => updated_orders.push(order),
                Err(e) => error!("Failed to update order {} status: {}", order_id, e),
            }
        }

        info!(
            "Batch updated {} orders to status '{}'",
            updated_orders.len(),
            new_status
        );
        Ok(updated_orders)
    }
}

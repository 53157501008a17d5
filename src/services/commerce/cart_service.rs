use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, instrument, warn};

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    models::{Cart, CartLine},
    services::commerce::{
        cart_store::CartStore,
        checkout_service::{CheckoutService, PlacedOrder},
    },
};

/// Keeps a cart aggregate per profile key. Every mutation loads the saved
/// cart, applies the change and saves it back while holding that key's lock.
#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn CartStore>,
    key_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl CartService {
    pub fn new(store: Arc<dyn CartStore>) -> Self {
        Self {
            store,
            key_locks: Arc::new(DashMap::new()),
        }
    }

    async fn lock_key(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = Arc::clone(
            self.key_locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );
        lock.lock_owned().await
    }

    /// Returns the saved cart. An unreadable cart is discarded and an empty
    /// one returned.
    #[instrument(skip(self))]
    pub async fn load(&self, key: &str) -> Result<Cart, ServiceError> {
        match self.store.load(key).await {
            Ok(cart) => Ok(cart.unwrap_or_default()),
            Err(ServiceError::SerializationError(e)) => {
                warn!(key, "Discarding unreadable cart: {}", e);
                Ok(Cart::new())
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, line), fields(product = %line.product_name, quantity = line.quantity))]
    pub async fn add_line(&self, key: &str, line: CartLine) -> Result<Cart, ServiceError> {
        self.mutate(key, |cart| cart.add_line(line)).await
    }

    #[instrument(skip(self))]
    pub async fn set_quantity(
        &self,
        key: &str,
        index: usize,
        quantity: i64,
    ) -> Result<Cart, ServiceError> {
        self.mutate(key, |cart| cart.set_quantity(index, quantity))
            .await
    }

    #[instrument(skip(self))]
    pub async fn adjust_quantity(
        &self,
        key: &str,
        index: usize,
        delta: i64,
    ) -> Result<Cart, ServiceError> {
        self.mutate(key, |cart| cart.adjust_quantity(index, delta))
            .await
    }

    #[instrument(skip(self))]
    pub async fn remove_line(&self, key: &str, index: usize) -> Result<Cart, ServiceError> {
        self.mutate(key, |cart| cart.remove_line(index).map(|_| ()))
            .await
    }

    #[instrument(skip(self))]
    pub async fn clear(&self, key: &str) -> Result<Cart, ServiceError> {
        self.mutate(key, |cart| {
            cart.clear();
            Ok(())
        })
        .await
    }

    /// Places an order from the saved cart. The cart is emptied and saved
    /// only when the order was written; on failure it is left untouched.
    #[instrument(skip(self, checkout, actor))]
    pub async fn checkout(
        &self,
        key: &str,
        checkout: &CheckoutService,
        actor: Option<&AuthUser>,
    ) -> Result<PlacedOrder, ServiceError> {
        let _guard = self.lock_key(key).await;
        let mut cart = self.load(key).await?;
        let placed = checkout.checkout_and_clear(actor, &mut cart).await?;
        self.store.save(key, &cart).await?;

        info!(order_id = %placed.order_id, "Cart checked out");
        Ok(placed)
    }

    async fn mutate<F>(&self, key: &str, change: F) -> Result<Cart, ServiceError>
    where
        F: FnOnce(&mut Cart) -> Result<(), ServiceError>,
    {
        let _guard = self.lock_key(key).await;
        let mut cart = self.load(key).await?;
        change(&mut cart)?;
        self.store.save(key, &cart).await?;
        Ok(cart)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::commerce::cart_store::InMemoryCartStore;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn espresso(qty: i64) -> CartLine {
        CartLine::new(
            Uuid::nil(),
            "Espresso".into(),
            "Standard".into(),
            dec!(3.00),
            vec![],
            qty,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn mutations_are_persisted() {
        let store = Arc::new(InMemoryCartStore::new());
        let service = CartService::new(store.clone());

        service.add_line("p1", espresso(1)).await.unwrap();
        service.add_line("p1", espresso(2)).await.unwrap();
        service.adjust_quantity("p1", 0, 1).await.unwrap();

        let saved = store.load("p1").await.unwrap().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved.lines()[0].quantity, 4);
        assert_eq!(saved.subtotal().unwrap(), dec!(12.00));

        let cleared = service.clear("p1").await.unwrap();
        assert!(cleared.is_empty());
        assert!(store.load("p1").await.unwrap().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_mutation_leaves_saved_cart_alone() {
        let store = Arc::new(InMemoryCartStore::new());
        let service = CartService::new(store.clone());
        service.add_line("p1", espresso(1)).await.unwrap();

        assert_matches!(
            service.set_quantity("p1", 5, 2).await,
            Err(ServiceError::CartLineNotFound(5))
        );
        assert_eq!(service.load("p1").await.unwrap().len(), 1);
    }
}

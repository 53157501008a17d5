#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request},
    Router,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ConnectionTrait, DatabaseBackend as DbBackend, Statement};
use serde_json::{json, Value};
use nowa_api::{
    auth::{AuthService, AuthUser},
    config::{AppConfig, MaterializePolicy},
    db::{self, DbConfig},
    events::{self, ChangeFeed, EventSender},
    handlers::AppServices,
    models::catalog::{AddonInput, ProductInput, VariantInput},
    services::{commerce::InMemoryCartStore, commerce::ProductDetail, store_settings::SettingKey},
    AppState,
};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_SECRET: &str = "test_secret_key_for_testing_purposes_only_32chars";

/// Helper harness for spinning up an application state backed by an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub admin: AuthUser,
    pub customer: AuthUser,
    admin_token: String,
    customer_token: String,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        Self::with_options(MaterializePolicy::Atomic, true).await
    }

    pub async fn with_options(policy: MaterializePolicy, enforce_transitions: bool) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_SECRET.to_string(),
            "test".to_string(),
        );
        cfg.materialize_policy = policy;
        cfg.enforce_status_transitions = enforce_transitions;

        let pool = db::establish_connection_with_config(&DbConfig::sqlite_in_memory())
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let change_feed = Arc::new(ChangeFeed::new());
        let event_task = tokio::spawn(events::process_events(event_rx, change_feed.clone()));

        let services = AppServices::new(
            db_arc.clone(),
            event_sender.clone(),
            Arc::new(InMemoryCartStore::new()),
            &cfg,
        );

        let auth = Arc::new(AuthService::new(&cfg.jwt_secret));
        let admin = AuthUser::admin(Uuid::new_v4());
        let customer = AuthUser::customer(Uuid::new_v4());
        let ttl = chrono::Duration::hours(1);
        let admin_token = auth.issue_token(&admin, ttl).expect("encode admin token");
        let customer_token = auth
            .issue_token(&customer, ttl)
            .expect("encode customer token");

        let state = AppState {
            db: db_arc,
            config: Arc::new(cfg),
            auth,
            event_sender,
            change_feed,
            services,
        };

        Self {
            router: nowa_api::app(state.clone()),
            state,
            admin,
            customer,
            admin_token,
            customer_token,
            _event_task: event_task,
        }
    }

    pub fn admin_token(&self) -> &str {
        &self.admin_token
    }

    pub fn customer_token(&self) -> &str {
        &self.customer_token
    }

    /// Issues a token for another customer.
    pub fn token_for(&self, user: &AuthUser) -> String {
        self.state
            .auth
            .issue_token(user, chrono::Duration::hours(1))
            .expect("encode token")
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Creates a Latte with Small/Large variants and two add-ons.
    pub async fn seed_latte(&self) -> ProductDetail {
        self.seed_product(latte_input()).await
    }

    pub async fn seed_product(&self, input: ProductInput) -> ProductDetail {
        self.state
            .services
            .product_catalog
            .create_product(Some(&self.admin), input)
            .await
            .expect("seed product for tests")
    }

    pub async fn set_operational_status(&self, is_open: bool, accepting_orders: bool) {
        self.state
            .services
            .settings
            .update_setting(
                Some(&self.admin),
                SettingKey::OperationalStatus,
                json!({ "is_open": is_open, "accepting_orders": accepting_orders }),
            )
            .await
            .expect("update operational status");
    }

    /// Makes every `order_items` insert for `product_name` abort.
    pub async fn fail_item_inserts_for(&self, product_name: &str) {
        self.exec(&format!(
            "CREATE TRIGGER fail_items_{tag} BEFORE INSERT ON order_items \
             WHEN NEW.product_name = '{name}' \
             BEGIN SELECT RAISE(ABORT, 'forced item failure'); END;",
            tag = Uuid::new_v4().simple(),
            name = product_name,
        ))
        .await;
    }

    /// Makes every `order_item_addons` insert for `addon_name` abort.
    pub async fn fail_addon_inserts_for(&self, addon_name: &str) {
        self.exec(&format!(
            "CREATE TRIGGER fail_addons_{tag} BEFORE INSERT ON order_item_addons \
             WHEN NEW.addon_name = '{name}' \
             BEGIN SELECT RAISE(ABORT, 'forced add-on failure'); END;",
            tag = Uuid::new_v4().simple(),
            name = addon_name,
        ))
        .await;
    }

    /// Makes every `orders` insert abort.
    pub async fn fail_order_inserts(&self) {
        self.exec(
            "CREATE TRIGGER fail_orders BEFORE INSERT ON orders \
             BEGIN SELECT RAISE(ABORT, 'forced order failure'); END;",
        )
        .await;
    }

    pub async fn count(&self, table: &str) -> i64 {
        let row = self
            .state
            .db
            .query_one(Statement::from_string(
                DbBackend::Sqlite,
                format!("SELECT COUNT(*) AS n FROM {}", table),
            ))
            .await
            .expect("count query")
            .expect("count row");
        row.try_get::<i64>("", "n").expect("count column")
    }

    async fn exec(&self, sql: &str) {
        self.state
            .db
            .execute(Statement::from_string(DbBackend::Sqlite, sql.to_string()))
            .await
            .expect("execute test sql");
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub fn latte_input() -> ProductInput {
    ProductInput {
        name: "Latte".into(),
        description: Some("Espresso with steamed milk".into()),
        base_price: dec!(4.50),
        image_url: None,
        category_id: None,
        is_available: true,
        variants: vec![variant("Small", dec!(-0.50)), variant("Large", dec!(1.00))],
        addons: vec![addon("Oat Milk", dec!(0.75)), addon("Extra Shot", dec!(0.60))],
    }
}

pub fn simple_product(name: &str, base_price: Decimal) -> ProductInput {
    ProductInput {
        name: name.into(),
        description: None,
        base_price,
        image_url: None,
        category_id: None,
        is_available: true,
        variants: vec![],
        addons: vec![],
    }
}

pub fn variant(name: &str, price_modifier: Decimal) -> VariantInput {
    VariantInput {
        name: name.into(),
        price_modifier,
    }
}

pub fn addon(name: &str, price: Decimal) -> AddonInput {
    AddonInput {
        name: name.into(),
        price,
    }
}

pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("response body is json")
}

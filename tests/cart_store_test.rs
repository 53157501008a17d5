use std::sync::Arc;

use assert_matches::assert_matches;
use nowa_api::{
    errors::ServiceError,
    models::cart::{Cart, CartLine, SelectedAddon},
    services::commerce::{CartService, CartStore, FileCartStore, DEFAULT_CART_KEY},
};
use rust_decimal_macros::dec;
use tempfile::TempDir;
use uuid::Uuid;

fn latte_line(quantity: i64) -> CartLine {
    CartLine::new(
        Uuid::new_v4(),
        "Latte".into(),
        "Large".into(),
        dec!(6.25),
        vec![SelectedAddon {
            name: "Oat Milk".into(),
            price: dec!(0.75),
        }],
        quantity,
    )
    .unwrap()
}

#[tokio::test]
async fn saved_cart_survives_a_new_store() {
    let dir = TempDir::new().unwrap();
    let mut cart = Cart::new();
    cart.add_line(latte_line(2)).unwrap();

    FileCartStore::new(dir.path())
        .save(DEFAULT_CART_KEY, &cart)
        .await
        .unwrap();

    let reopened = FileCartStore::new(dir.path());
    let loaded = reopened.load(DEFAULT_CART_KEY).await.unwrap();
    assert_eq!(loaded, Some(cart));

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["nowa-cart.json".to_string()]);
}

#[tokio::test]
async fn missing_cart_loads_as_none_and_remove_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let store = FileCartStore::new(dir.path().join("nested"));

    assert_eq!(store.load("someone").await.unwrap(), None);
    store.remove("someone").await.unwrap();

    store.save("someone", &Cart::new()).await.unwrap();
    store.remove("someone").await.unwrap();
    assert_eq!(store.load("someone").await.unwrap(), None);
}

#[tokio::test]
async fn keys_that_could_escape_the_directory_are_rejected() {
    let dir = TempDir::new().unwrap();
    let store = FileCartStore::new(dir.path());

    for key in ["../outside", "a/b", "", "white space"] {
        assert_matches!(
            store.save(key, &Cart::new()).await,
            Err(ServiceError::ValidationError(_))
        );
    }
}

#[tokio::test]
async fn unreadable_cart_is_treated_as_empty() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("nowa-cart.json"), b"{ not json").unwrap();
    let store = Arc::new(FileCartStore::new(dir.path()));

    assert_matches!(
        store.load(DEFAULT_CART_KEY).await,
        Err(ServiceError::SerializationError(_))
    );

    let service = CartService::new(store.clone());
    assert!(service.load(DEFAULT_CART_KEY).await.unwrap().is_empty());

    let cart = service
        .add_line(DEFAULT_CART_KEY, latte_line(1))
        .await
        .unwrap();
    assert_eq!(cart.len(), 1);
    assert_eq!(store.load(DEFAULT_CART_KEY).await.unwrap(), Some(cart));
}

#[tokio::test]
async fn cart_service_persists_every_mutation() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(FileCartStore::new(dir.path()));
    let service = CartService::new(store.clone());

    service.add_line("guest", latte_line(1)).await.unwrap();
    service.adjust_quantity("guest", 0, 2).await.unwrap();

    let reloaded = CartService::new(Arc::new(FileCartStore::new(dir.path())))
        .load("guest")
        .await
        .unwrap();
    assert_eq!(reloaded.lines()[0].quantity, 3);
    assert_eq!(reloaded.lines()[0].total_price, dec!(18.75));

    service.set_quantity("guest", 0, 0).await.unwrap();
    assert!(service.load("guest").await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_adds_to_one_key_are_all_kept() {
    let dir = TempDir::new().unwrap();
    let service = CartService::new(Arc::new(FileCartStore::new(dir.path())));

    let mut tasks = Vec::new();
    for i in 0..12 {
        let service = service.clone();
        tasks.push(tokio::spawn(async move {
            let line = CartLine::new(
                Uuid::new_v4(),
                format!("Drink {}", i),
                "Standard".into(),
                dec!(2.00),
                vec![],
                1,
            )
            .unwrap();
            service.add_line("shared", line).await.unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let saved = FileCartStore::new(dir.path())
        .load("shared")
        .await
        .unwrap()
        .expect("cart was saved");
    assert_eq!(saved.len(), 12);
    assert_eq!(saved.total_items().unwrap(), 12);
}

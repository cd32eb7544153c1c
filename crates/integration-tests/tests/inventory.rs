//! Inventory cache reconciliation tests.

use rust_decimal::Decimal;

use sweet_shop_client::ApiError;
use sweet_shop_core::{Email, SearchQuery, SweetId, SweetInput};
use sweet_shop_integration_tests::{MockShop, Sdk};

fn email(s: &str) -> Email {
    Email::parse(s).expect("test email")
}

async fn admin_sdk(shop: &MockShop) -> Sdk {
    let sdk = shop.sdk();
    sdk.session
        .login(&email("admin@shop.test"), "password123")
        .await
        .expect("admin login");
    sdk
}

async fn customer_sdk(shop: &MockShop) -> Sdk {
    let sdk = shop.sdk();
    sdk.session
        .login(&email("customer@shop.test"), "password123")
        .await
        .expect("customer login");
    sdk
}

fn input(name: &str, category: &str, price: &str, quantity: u32) -> SweetInput {
    SweetInput {
        name: name.to_string(),
        category: category.to_string(),
        price: price.parse::<Decimal>().expect("price"),
        quantity,
        description: None,
    }
}

#[tokio::test]
async fn creates_append_server_assigned_unique_ids() {
    let shop = MockShop::spawn().await;
    let sdk = admin_sdk(&shop).await;

    let a = sdk
        .inventory
        .create(&input("Fudge", "chocolate", "3.50", 10))
        .await
        .expect("create a");
    let b = sdk
        .inventory
        .create(&input("Cola Bottles", "gummy", "1.20", 50))
        .await
        .expect("create b");
    let c = sdk
        .inventory
        .create(&input("Nougat", "chewy", "2.00", 5))
        .await
        .expect("create c");

    let mut ids = vec![a.id.clone(), b.id.clone(), c.id.clone()];
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 3, "server-assigned ids must be unique");

    // The cache holds exactly the server's id set.
    let cached: Vec<SweetId> = sdk
        .inventory
        .snapshot()
        .await
        .into_iter()
        .map(|s| s.id)
        .collect();
    let served: Vec<SweetId> = sdk
        .inventory
        .list()
        .await
        .expect("list")
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(cached.len(), 3);
    assert_eq!(
        {
            let mut v = cached;
            v.sort();
            v
        },
        {
            let mut v = served;
            v.sort();
            v
        }
    );
}

#[tokio::test]
async fn delete_removes_from_cache_and_from_fresh_lists() {
    let shop = MockShop::spawn().await;
    let sdk = admin_sdk(&shop).await;
    let id = shop.seed_sweet("Fudge", "chocolate", "3.50", 10);
    shop.seed_sweet("Nougat", "chewy", "2.00", 5);

    sdk.inventory.list().await.expect("list");
    sdk.inventory.delete(&id).await.expect("delete");

    // Gone from the local mirror immediately.
    assert!(sdk.inventory.find(&id).await.is_none());

    // And from the next fresh fetch.
    let listed = sdk.inventory.list().await.expect("relist");
    assert!(listed.iter().all(|s| s.id != id));
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn update_replaces_the_cached_entry() {
    let shop = MockShop::spawn().await;
    let sdk = admin_sdk(&shop).await;
    let id = shop.seed_sweet("Fudge", "chocolate", "3.50", 10);

    sdk.inventory.list().await.expect("list");
    let updated = sdk
        .inventory
        .update(&id, &input("Sea Salt Fudge", "chocolate", "4.00", 8))
        .await
        .expect("update");

    assert_eq!(updated.name, "Sea Salt Fudge");
    let cached = sdk.inventory.find(&id).await.expect("cached");
    assert_eq!(cached, updated);
    assert_eq!(sdk.inventory.snapshot().await.len(), 1);
}

#[tokio::test]
async fn purchase_decrements_after_server_confirmation() {
    let shop = MockShop::spawn().await;
    let sdk = customer_sdk(&shop).await;
    let id = shop.seed_sweet("Fudge", "chocolate", "3.50", 5);

    sdk.inventory.list().await.expect("list");
    sdk.inventory.purchase(&id, 1).await.expect("purchase");

    assert_eq!(sdk.inventory.find(&id).await.expect("cached").quantity, 4);
    assert_eq!(shop.quantity_of(&id), Some(4));
}

#[tokio::test]
async fn over_purchase_is_rejected_and_cache_untouched() {
    let shop = MockShop::spawn().await;
    let sdk = customer_sdk(&shop).await;
    let id = shop.seed_sweet("Fudge", "chocolate", "3.50", 5);

    sdk.inventory.list().await.expect("list");
    let err = sdk
        .inventory
        .purchase(&id, 10)
        .await
        .expect_err("over-purchase");

    match err {
        ApiError::Server { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Insufficient stock");
        }
        other => panic!("expected server error, got {other}"),
    }
    // No partial apply.
    assert_eq!(sdk.inventory.find(&id).await.expect("cached").quantity, 5);
    assert_eq!(shop.quantity_of(&id), Some(5));
}

#[tokio::test]
async fn restock_then_purchase_round_trips_quantity() {
    let shop = MockShop::spawn().await;
    let sdk = admin_sdk(&shop).await;
    let id = shop.seed_sweet("Fudge", "chocolate", "3.50", 7);

    sdk.inventory.list().await.expect("list");
    sdk.inventory.restock(&id, 3).await.expect("restock");
    sdk.inventory.purchase(&id, 3).await.expect("purchase");

    assert_eq!(sdk.inventory.find(&id).await.expect("cached").quantity, 7);
    assert_eq!(shop.quantity_of(&id), Some(7));
}

#[tokio::test]
async fn search_replaces_the_cache_wholesale() {
    let shop = MockShop::spawn().await;
    let sdk = customer_sdk(&shop).await;
    shop.seed_sweet("Fudge", "chocolate", "3.50", 10);
    shop.seed_sweet("Truffle", "chocolate", "5.00", 4);
    shop.seed_sweet("Cola Bottles", "gummy", "1.20", 50);

    sdk.inventory.list().await.expect("list");
    assert_eq!(sdk.inventory.snapshot().await.len(), 3);

    let results = sdk
        .inventory
        .search(&SearchQuery {
            category: Some("chocolate".to_string()),
            ..SearchQuery::default()
        })
        .await
        .expect("search");

    assert_eq!(results.len(), 2);
    // The filtered result is the new mirror, not a merge.
    assert_eq!(sdk.inventory.snapshot().await.len(), 2);
}

#[tokio::test]
async fn search_filters_by_price_range() {
    let shop = MockShop::spawn().await;
    let sdk = customer_sdk(&shop).await;
    shop.seed_sweet("Fudge", "chocolate", "3.50", 10);
    shop.seed_sweet("Truffle", "chocolate", "5.00", 4);
    shop.seed_sweet("Cola Bottles", "gummy", "1.20", 50);

    let results = sdk
        .inventory
        .search(&SearchQuery {
            min_price: Some(Decimal::new(2, 0)),
            max_price: Some(Decimal::new(4, 0)),
            ..SearchQuery::default()
        })
        .await
        .expect("search");

    assert_eq!(results.len(), 1);
    assert_eq!(results.first().expect("result").name, "Fudge");
}

#[tokio::test]
async fn get_merges_a_single_item_into_the_mirror() {
    let shop = MockShop::spawn().await;
    let sdk = customer_sdk(&shop).await;
    let id = shop.seed_sweet("Fudge", "chocolate", "3.50", 10);

    // Mirror starts empty; a point fetch seeds it.
    let sweet = sdk.inventory.get(&id).await.expect("get");
    assert_eq!(sweet.id, id);
    assert_eq!(sdk.inventory.snapshot().await.len(), 1);

    // Fetching again replaces rather than duplicates.
    sdk.inventory.get(&id).await.expect("get again");
    assert_eq!(sdk.inventory.snapshot().await.len(), 1);
}

#[tokio::test]
async fn non_admin_mutations_are_rejected_and_cache_unchanged() {
    let shop = MockShop::spawn().await;
    let sdk = customer_sdk(&shop).await;
    let id = shop.seed_sweet("Fudge", "chocolate", "3.50", 10);

    sdk.inventory.list().await.expect("list");

    let err = sdk.inventory.delete(&id).await.expect_err("forbidden");
    assert_eq!(err.status(), Some(403));
    assert!(sdk.inventory.find(&id).await.is_some());

    let err = sdk.inventory.restock(&id, 5).await.expect_err("forbidden");
    assert_eq!(err.status(), Some(403));
    assert_eq!(sdk.inventory.find(&id).await.expect("cached").quantity, 10);
}

#[tokio::test]
async fn local_validation_rejects_bad_input_before_any_request() {
    let shop = MockShop::spawn().await;
    let sdk = admin_sdk(&shop).await;

    let err = sdk
        .inventory
        .create(&input("", "chocolate", "3.50", 1))
        .await
        .expect_err("empty name");
    assert!(matches!(err, ApiError::Validation { field: "name", .. }));

    let err = sdk
        .inventory
        .purchase(&SweetId::new("1"), 0)
        .await
        .expect_err("zero quantity");
    assert!(matches!(
        err,
        ApiError::Validation {
            field: "quantity",
            ..
        }
    ));

    // Nothing reached the server.
    assert!(sdk.inventory.list().await.expect("list").is_empty());
}

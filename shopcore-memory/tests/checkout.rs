//! Order placement behavior against the in-memory store: the happy path,
//! every abort path, and the concurrency properties the locked-read
//! protocol exists to provide.

use shopcore::checkout::OrderPlacementService;
use shopcore::errors::CheckoutError;
use shopcore::model::{BuyItem, ProductCategory, ProductDraft};
use shopcore::query::OrderQueryParams;
use shopcore::store::ShopStore;
use shopcore::types::{Price, ProductId, ProductName, Quantity, UserId};
use shopcore_memory::MemoryShopStore;

type Service = OrderPlacementService<MemoryShopStore, MemoryShopStore>;

fn service(store: &MemoryShopStore) -> Service {
    OrderPlacementService::new(store.clone(), store.clone())
}

fn draft(name: &str, price: i64, stock: u32) -> ProductDraft {
    ProductDraft {
        product_name: ProductName::try_new(name.to_string()).unwrap(),
        category: ProductCategory::Food,
        image_url: format!("http://img.example/{name}.png"),
        price: Price::try_new(price).unwrap(),
        stock,
        description: None,
    }
}

fn buy(product_id: ProductId, quantity: u32) -> BuyItem {
    BuyItem {
        product_id,
        quantity: Quantity::try_new(quantity).unwrap(),
    }
}

#[tokio::test]
async fn happy_path_prices_decrements_and_persists() {
    let store = MemoryShopStore::new();
    let user = store.insert_user("buyer@example.com");
    let product_id = store.create_product(&draft("Apple", 50, 10)).await.unwrap();
    let svc = service(&store);

    let order_id = svc
        .place_order(user.user_id, &[buy(product_id, 3)])
        .await
        .unwrap();

    let order = svc.order_by_id(order_id).await.unwrap().unwrap();
    assert_eq!(order.user_id, user.user_id);
    assert_eq!(order.total_amount, 150);
    assert_eq!(order.order_item_list.len(), 1);
    let item = &order.order_item_list[0];
    assert_eq!(item.product_id, product_id);
    assert_eq!(u32::from(item.quantity), 3);
    assert_eq!(item.amount, 150);
    assert_eq!(item.product_name.as_ref(), "Apple");

    let product = store.product_by_id(product_id).await.unwrap().unwrap();
    assert_eq!(product.stock, 7);
}

#[tokio::test]
async fn insufficient_stock_aborts_without_side_effects() {
    let store = MemoryShopStore::new();
    let user = store.insert_user("buyer@example.com");
    let product_id = store.create_product(&draft("Apple", 50, 2)).await.unwrap();
    let svc = service(&store);

    let err = svc
        .place_order(user.user_id, &[buy(product_id, 5)])
        .await
        .unwrap_err();
    match err {
        CheckoutError::InsufficientStock {
            product_id: failed,
            requested,
            available,
        } => {
            assert_eq!(failed, product_id);
            assert_eq!(requested, 5);
            assert_eq!(available, 2);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    assert_eq!(store.product_by_id(product_id).await.unwrap().unwrap().stock, 2);
    let params = OrderQueryParams::for_user(user.user_id, None, None).unwrap();
    let (orders, total) = svc.list_orders(&params).await.unwrap();
    assert!(orders.is_empty());
    assert_eq!(total, 0);
}

#[tokio::test]
async fn unknown_user_is_rejected_before_any_lock() {
    let store = MemoryShopStore::new();
    let product_id = store.create_product(&draft("Apple", 50, 10)).await.unwrap();
    let svc = service(&store);

    let ghost = UserId::try_new(999).unwrap();
    let err = svc.place_order(ghost, &[buy(product_id, 1)]).await.unwrap_err();
    assert!(matches!(err, CheckoutError::UserNotFound(id) if id == ghost));
    assert_eq!(store.product_by_id(product_id).await.unwrap().unwrap().stock, 10);
}

#[tokio::test]
async fn unknown_product_aborts_the_whole_order() {
    let store = MemoryShopStore::new();
    let user = store.insert_user("buyer@example.com");
    let existing = store.create_product(&draft("Apple", 50, 10)).await.unwrap();
    let svc = service(&store);

    // The existing product is locked and decremented first (lower id), then
    // the missing one aborts; the decrement must be rolled back.
    let missing = ProductId::try_new(999).unwrap();
    let err = svc
        .place_order(user.user_id, &[buy(existing, 4), buy(missing, 1)])
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::ProductNotFound(id) if id == missing));

    assert_eq!(store.product_by_id(existing).await.unwrap().unwrap().stock, 10);
    let params = OrderQueryParams::for_user(user.user_id, None, None).unwrap();
    let (orders, _) = svc.list_orders(&params).await.unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn empty_buy_list_creates_an_empty_order() {
    let store = MemoryShopStore::new();
    let user = store.insert_user("buyer@example.com");
    let svc = service(&store);

    let order_id = svc.place_order(user.user_id, &[]).await.unwrap();
    let order = svc.order_by_id(order_id).await.unwrap().unwrap();
    assert_eq!(order.total_amount, 0);
    assert!(order.order_item_list.is_empty());
}

#[tokio::test]
async fn items_are_persisted_in_caller_order_not_lock_order() {
    let store = MemoryShopStore::new();
    let user = store.insert_user("buyer@example.com");
    let first = store.create_product(&draft("Apple", 10, 5)).await.unwrap();
    let second = store.create_product(&draft("Book", 20, 5)).await.unwrap();
    let svc = service(&store);

    // Caller lists the higher id first; locks are taken ascending, but the
    // stored sequence must match the request.
    let order_id = svc
        .place_order(user.user_id, &[buy(second, 1), buy(first, 2)])
        .await
        .unwrap();
    let order = svc.order_by_id(order_id).await.unwrap().unwrap();
    let ids: Vec<_> = order
        .order_item_list
        .iter()
        .map(|item| item.product_id)
        .collect();
    assert_eq!(ids, vec![second, first]);
    assert_eq!(order.total_amount, 20 + 20);
}

#[tokio::test]
async fn duplicate_product_lines_compose_their_decrements() {
    let store = MemoryShopStore::new();
    let user = store.insert_user("buyer@example.com");
    let product_id = store.create_product(&draft("Apple", 10, 6)).await.unwrap();
    let svc = service(&store);

    let order_id = svc
        .place_order(user.user_id, &[buy(product_id, 2), buy(product_id, 4)])
        .await
        .unwrap();
    let order = svc.order_by_id(order_id).await.unwrap().unwrap();
    assert_eq!(order.total_amount, 60);
    assert_eq!(store.product_by_id(product_id).await.unwrap().unwrap().stock, 0);
}

#[tokio::test]
async fn duplicate_product_lines_cannot_jointly_oversell() {
    let store = MemoryShopStore::new();
    let user = store.insert_user("buyer@example.com");
    let product_id = store.create_product(&draft("Apple", 10, 5)).await.unwrap();
    let svc = service(&store);

    // Each line fits alone, but the second locked read observes the first
    // decrement (5 -> 3), so 2 + 4 together must abort.
    let err = svc
        .place_order(user.user_id, &[buy(product_id, 2), buy(product_id, 4)])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CheckoutError::InsufficientStock { available: 3, requested: 4, .. }
    ));
    assert_eq!(store.product_by_id(product_id).await.unwrap().unwrap().stock, 5);
}

#[tokio::test]
async fn order_amounts_are_immune_to_later_price_changes() {
    let store = MemoryShopStore::new();
    let user = store.insert_user("buyer@example.com");
    let product_id = store.create_product(&draft("Apple", 50, 10)).await.unwrap();
    let svc = service(&store);

    let order_id = svc
        .place_order(user.user_id, &[buy(product_id, 3)])
        .await
        .unwrap();

    // Catalog edit after the order: price triples.
    let mut updated = draft("Apple", 150, 7);
    updated.description = Some("now more expensive".to_string());
    assert!(store.update_product(product_id, &updated).await.unwrap());

    let order = svc.order_by_id(order_id).await.unwrap().unwrap();
    assert_eq!(order.total_amount, 150);
    assert_eq!(order.order_item_list[0].amount, 150);
}

#[tokio::test(flavor = "multi_thread")]
async fn two_contending_buyers_one_unit_exactly_one_wins() {
    let store = MemoryShopStore::new();
    let user = store.insert_user("buyer@example.com");
    let product_id = store.create_product(&draft("Apple", 50, 1)).await.unwrap();
    let svc = service(&store);

    let task = |svc: Service, user_id| {
        tokio::spawn(async move { svc.place_order(user_id, &[buy(product_id, 1)]).await })
    };
    let first = task(svc.clone(), user.user_id);
    let second = task(svc.clone(), user.user_id);
    let results = [first.await.unwrap(), second.await.unwrap()];

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    assert!(results.iter().any(|r| matches!(
        r,
        Err(CheckoutError::InsufficientStock { available: 0, .. })
    )));
    assert_eq!(store.product_by_id(product_id).await.unwrap().unwrap().stock, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_checkouts_never_oversell() {
    let store = MemoryShopStore::new();
    let user = store.insert_user("buyer@example.com");
    let initial_stock = 5_u32;
    let product_id = store
        .create_product(&draft("Apple", 50, initial_stock))
        .await
        .unwrap();
    let svc = service(&store);

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let svc = svc.clone();
            let user_id = user.user_id;
            tokio::spawn(async move { svc.place_order(user_id, &[buy(product_id, 1)]).await })
        })
        .collect();
    let results = futures::future::join_all(handles).await;

    let mut committed = 0_u32;
    for result in results {
        match result.unwrap() {
            Ok(_) => committed += 1,
            Err(CheckoutError::InsufficientStock { .. }) => {}
            Err(other) => panic!("unexpected checkout failure: {other:?}"),
        }
    }

    let remaining = store.product_by_id(product_id).await.unwrap().unwrap().stock;
    assert_eq!(committed, initial_stock);
    // The conservation invariant: nothing created, nothing lost.
    assert_eq!(remaining + committed, initial_stock);
    assert_eq!(remaining, 0);
}

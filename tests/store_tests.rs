// Integration tests for the marketplace store
//
// The REST backend is replaced by canned responses keyed by path; every call
// is logged so tests can check what the store fetched and when.

use anyhow::{anyhow, Result};
use marketchat::store::{
    cart_total, Action, ApiBackend, DecodeError, Resource, Store, StoreError, StoreState,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct FakeApi {
    responses: Mutex<HashMap<String, Value>>,
    calls: Mutex<Vec<String>>,
}

impl FakeApi {
    fn respond(&self, method: &str, path: &str, body: Value) {
        self.responses
            .lock()
            .unwrap()
            .insert(format!("{} {}", method, path), body);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn answer(&self, key: String, token: Option<&str>) -> Result<Value> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{} [{}]", key, token.unwrap_or("-")));
        self.responses
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or_else(|| anyhow!("404 for {}", key))
    }
}

#[async_trait::async_trait]
impl ApiBackend for FakeApi {
    async fn get(&self, path: &str, token: Option<&str>) -> Result<Value> {
        self.answer(format!("GET {}", path), token)
    }

    async fn post(&self, path: &str, token: Option<&str>, _body: Value) -> Result<Value> {
        self.answer(format!("POST {}", path), token)
    }

    async fn delete(&self, path: &str, token: Option<&str>) -> Result<()> {
        self.answer(format!("DELETE {}", path), token).map(drop)
    }
}

fn product(id: u64, name: &str, price: f64) -> Value {
    json!({
        "data": {
            "id": id,
            "attributes": {
                "name": name,
                "price": price,
                "imageUrl": null,
                "shop": {"data": {"id": 1, "attributes": {"name": "Corner Shop"}}}
            }
        }
    })
}

fn cart(lines: &[(u64, u32, Value)]) -> Value {
    let data: Vec<Value> = lines
        .iter()
        .map(|(id, quantity, product)| {
            json!({"id": id, "attributes": {"quantity": quantity, "product": product}})
        })
        .collect();
    json!({"data": data, "meta": {"pagination": {"total": lines.len()}}})
}

fn signed_in_api() -> Arc<FakeApi> {
    let api = Arc::new(FakeApi::default());
    api.respond(
        "POST",
        "/api/auth/local",
        json!({"jwt": "token-1", "user": {"id": 5, "username": "ana", "email": "ana@example.com"}}),
    );
    api.respond(
        "GET",
        "/api/users/me",
        json!({"id": 5, "username": "ana", "email": "ana@example.com"}),
    );
    api.respond(
        "GET",
        "/api/carts?populate=product",
        cart(&[(11, 2, product(9, "Rug", 40.0))]),
    );
    api.respond("GET", "/api/wishlists?populate=product", json!({"data": []}));
    api
}

#[tokio::test]
async fn test_sign_in_then_refresh() -> Result<()> {
    let api = signed_in_api();
    let store = Store::new(api.clone());

    let user = store.sign_in("ana", "secret").await?;
    assert_eq!(user.username, "ana");

    store.refresh_all().await?;

    let state = store.snapshot().await;
    assert_eq!(state.auth.value.as_ref().unwrap().jwt, "token-1");
    let lines = state.cart.value.as_ref().unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].product.name, "Rug");
    assert_eq!(lines[0].product.shop.as_ref().unwrap().name, "Corner Shop");
    assert_eq!(cart_total(lines), 80.0);
    assert_eq!(state.wishlist.value, Some(vec![]));
    assert!(!state.cart.needs_fetch());

    // Auth must resolve before the token-bearing requests go out
    let calls = api.calls();
    assert_eq!(calls[1], "GET /api/users/me [token-1]");
    assert!(calls[2..].iter().all(|c| c.ends_with("[token-1]")));

    Ok(())
}

#[tokio::test]
async fn test_cart_requires_sign_in() {
    let api = signed_in_api();
    let store = Store::new(api.clone());

    let err = store.fetch(Resource::Cart).await.unwrap_err();
    assert!(matches!(err, StoreError::NotSignedIn));

    let err = store.add_to_cart(9, 1).await.unwrap_err();
    assert!(matches!(err, StoreError::NotSignedIn));
    assert!(api.calls().is_empty(), "nothing sent without a session");
}

#[tokio::test]
async fn test_refresh_signed_out_only_touches_auth() -> Result<()> {
    let api = Arc::new(FakeApi::default());
    let store = Store::new(api.clone());
    let mut changes = store.subscribe();

    store.refresh_all().await?;

    let state = store.snapshot().await;
    assert_eq!(state.auth.value, None);
    assert!(!state.auth.needs_fetch());
    assert_eq!(state.cart.value, None);
    assert_eq!(state.wishlist.value, None);
    assert!(api.calls().is_empty(), "nothing to fetch without a session");

    assert_eq!(changes.recv().await?, Resource::Auth);
    assert!(changes.try_recv().is_err());

    Ok(())
}

#[tokio::test]
async fn test_write_invalidates_and_refetches() -> Result<()> {
    let api = signed_in_api();
    api.respond("POST", "/api/carts", json!({"data": {"id": 12}}));
    let store = Store::new(api.clone());
    store.sign_in("ana", "secret").await?;
    let mut changes = store.subscribe();

    api.respond(
        "GET",
        "/api/carts?populate=product",
        cart(&[
            (11, 2, product(9, "Rug", 40.0)),
            (12, 1, product(3, "Lamp", 15.5)),
        ]),
    );
    store.add_to_cart(3, 1).await?;

    assert_eq!(changes.recv().await?, Resource::Cart, "invalidated");
    assert_eq!(changes.recv().await?, Resource::Cart, "refetched");

    let state = store.snapshot().await;
    let lines = state.cart.value.unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(cart_total(&lines), 95.5);
    assert!(!state.cart.stale);

    let calls = api.calls();
    let post = calls.iter().position(|c| c == "POST /api/carts [token-1]").unwrap();
    let refetch = calls
        .iter()
        .rposition(|c| c == "GET /api/carts?populate=product [token-1]")
        .unwrap();
    assert!(post < refetch);

    Ok(())
}

#[tokio::test]
async fn test_failed_refetch_leaves_entry_stale() -> Result<()> {
    let api = signed_in_api();
    api.respond("DELETE", "/api/wishlists/4", Value::Null);
    let store = Store::new(api.clone());
    store.sign_in("ana", "secret").await?;
    store.refresh_all().await?;

    api.responses
        .lock()
        .unwrap()
        .remove("GET /api/wishlists?populate=product");
    store.remove_from_wishlist(4).await?;

    let state = store.snapshot().await;
    assert!(state.wishlist.stale);
    assert!(state.wishlist.needs_fetch());

    Ok(())
}

#[tokio::test]
async fn test_ensure_skips_fresh_entries() -> Result<()> {
    let api = signed_in_api();
    let store = Store::new(api.clone());
    store.sign_in("ana", "secret").await?;

    store.ensure(Resource::Cart).await?;
    store.ensure(Resource::Cart).await?;
    let fetches = |api: &FakeApi| {
        api.calls()
            .iter()
            .filter(|c| c.starts_with("GET /api/carts"))
            .count()
    };
    assert_eq!(fetches(&api), 1);

    store.dispatch(Action::Invalidate(Resource::Cart)).await;
    store.ensure(Resource::Cart).await?;
    assert_eq!(fetches(&api), 2);

    Ok(())
}

#[tokio::test]
async fn test_invalid_payload_is_rejected_at_the_boundary() -> Result<()> {
    let api = signed_in_api();
    api.respond(
        "GET",
        "/api/carts?populate=product",
        cart(&[(11, 0, product(9, "Rug", 40.0))]),
    );
    let store = Store::new(api.clone());
    store.sign_in("ana", "secret").await?;

    let err = store.fetch(Resource::Cart).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Decode(DecodeError::Invalid {
            entity: "cart line",
            ..
        })
    ));
    assert_eq!(store.snapshot().await.cart.value, None, "cache untouched");

    api.respond("GET", "/api/carts?populate=product", json!({"data": {"oops": true}}));
    let err = store.fetch(Resource::Cart).await.unwrap_err();
    assert!(matches!(err, StoreError::Decode(DecodeError::Shape(_))));

    Ok(())
}

#[tokio::test]
async fn test_zero_quantity_is_rejected_locally() -> Result<()> {
    let api = signed_in_api();
    let store = Store::new(api.clone());
    store.sign_in("ana", "secret").await?;

    let err = store.add_to_cart(9, 0).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidQuantity));
    assert_eq!(api.calls().len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_sign_out_clears_everything() -> Result<()> {
    let api = signed_in_api();
    let store = Store::new(api.clone());
    store.sign_in("ana", "secret").await?;
    store.refresh_all().await?;
    let mut changes = store.subscribe();

    store.sign_out().await;

    let state = store.snapshot().await;
    assert_eq!(state.auth.value, None);
    assert!(state.auth.needs_fetch());
    assert_eq!(state.cart.value, None);
    assert!(state.cart.needs_fetch());
    assert_eq!(state.wishlist.value, None);

    let mut announced = Vec::new();
    while let Ok(resource) = changes.try_recv() {
        announced.push(resource);
    }
    assert_eq!(announced, Resource::ALL.to_vec());

    Ok(())
}

#[tokio::test]
async fn test_reset_action_empties_the_cache() -> Result<()> {
    let api = signed_in_api();
    let store = Store::new(api.clone());
    store.sign_in("ana", "secret").await?;
    store.refresh_all().await?;

    store.dispatch(Action::Reset).await;

    assert_eq!(store.snapshot().await, StoreState::default());
    Ok(())
}

#[tokio::test]
async fn test_backend_failure_surfaces() {
    let api = Arc::new(FakeApi::default());
    let store = Store::new(api);

    let err = store.sign_in("ana", "wrong").await.unwrap_err();
    assert!(matches!(err, StoreError::Backend(_)));
    assert_eq!(store.snapshot().await.auth.value, None);
}

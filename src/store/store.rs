use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use super::api::ApiBackend;
use super::decode::{decode, DecodeError};
use super::model::{AuthSession, CartLine, User, WishlistEntry};

const CART_PATH: &str = "/api/carts?populate=product";
const WISHLIST_PATH: &str = "/api/wishlists?populate=product";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not signed in")]
    NotSignedIn,

    #[error("quantity must be at least 1")]
    InvalidQuantity,

    #[error("backend request failed")]
    Backend(#[source] anyhow::Error),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Server-mirrored data the store keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Auth,
    Cart,
    Wishlist,
}

impl Resource {
    pub const ALL: [Resource; 3] = [Resource::Auth, Resource::Cart, Resource::Wishlist];

    fn as_slice(self) -> &'static [Resource] {
        match self {
            Resource::Auth => &[Resource::Auth],
            Resource::Cart => &[Resource::Cart],
            Resource::Wishlist => &[Resource::Wishlist],
        }
    }
}

/// Decoded data for one resource
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Auth(Option<AuthSession>),
    Cart(Vec<CartLine>),
    Wishlist(Vec<WishlistEntry>),
}

impl Payload {
    pub fn resource(&self) -> Resource {
        match self {
            Payload::Auth(_) => Resource::Auth,
            Payload::Cart(_) => Resource::Cart,
            Payload::Wishlist(_) => Resource::Wishlist,
        }
    }
}

/// Writes the store accepts; `Store::dispatch` is the only way in
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Replace a resource with fresh server data
    Set(Payload),
    /// Mark a resource as out of date
    Invalidate(Resource),
    /// Forget everything, e.g. on sign-out
    Reset,
}

/// Cached copy of one resource
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cached<T> {
    pub value: Option<T>,
    pub fetched_at: Option<DateTime<Utc>>,
    pub stale: bool,
}

impl<T> Default for Cached<T> {
    fn default() -> Self {
        Self {
            value: None,
            fetched_at: None,
            stale: false,
        }
    }
}

impl<T> Cached<T> {
    /// Never fetched, or invalidated since
    pub fn needs_fetch(&self) -> bool {
        self.fetched_at.is_none() || self.stale
    }

    fn set(&mut self, value: Option<T>) {
        self.value = value;
        self.fetched_at = Some(Utc::now());
        self.stale = false;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreState {
    pub auth: Cached<AuthSession>,
    pub cart: Cached<Vec<CartLine>>,
    pub wishlist: Cached<Vec<WishlistEntry>>,
}

impl StoreState {
    fn needs_fetch(&self, resource: Resource) -> bool {
        match resource {
            Resource::Auth => self.auth.needs_fetch(),
            Resource::Cart => self.cart.needs_fetch(),
            Resource::Wishlist => self.wishlist.needs_fetch(),
        }
    }

    fn token(&self) -> Option<String> {
        self.auth.value.as_ref().map(|session| session.jwt.clone())
    }
}

/// Single source of truth for auth, cart and wishlist
///
/// Reads come from the cache; every mutation goes to the backend first and
/// then invalidates and refetches what it touched.
pub struct Store {
    backend: Arc<dyn ApiBackend>,
    state: RwLock<StoreState>,
    changes: broadcast::Sender<Resource>,
}

impl Store {
    pub fn new(backend: Arc<dyn ApiBackend>) -> Self {
        let (changes, _) = broadcast::channel(32);
        Self {
            backend,
            state: RwLock::new(StoreState::default()),
            changes,
        }
    }

    pub async fn snapshot(&self) -> StoreState {
        self.state.read().await.clone()
    }

    /// Resources announced here after every write
    pub fn subscribe(&self) -> broadcast::Receiver<Resource> {
        self.changes.subscribe()
    }

    pub async fn dispatch(&self, action: Action) {
        let touched: &[Resource] = {
            let mut state = self.state.write().await;
            match action {
                Action::Set(payload) => {
                    let resource = payload.resource();
                    match payload {
                        Payload::Auth(session) => state.auth.set(session),
                        Payload::Cart(lines) => state.cart.set(Some(lines)),
                        Payload::Wishlist(entries) => state.wishlist.set(Some(entries)),
                    }
                    resource.as_slice()
                }
                Action::Invalidate(resource) => {
                    match resource {
                        Resource::Auth => state.auth.stale = true,
                        Resource::Cart => state.cart.stale = true,
                        Resource::Wishlist => state.wishlist.stale = true,
                    }
                    resource.as_slice()
                }
                Action::Reset => {
                    *state = StoreState::default();
                    &Resource::ALL
                }
            }
        };

        for resource in touched {
            debug!("Store updated: {:?}", resource);
            let _ = self.changes.send(*resource);
        }
    }

    /// Load a resource from the backend into the cache
    pub async fn fetch(&self, resource: Resource) -> Result<(), StoreError> {
        let token = self.state.read().await.token();

        let payload = match resource {
            Resource::Auth => match token {
                // Nothing to refresh without a session
                None => Payload::Auth(None),
                Some(jwt) => {
                    let raw = self.get("/api/users/me", Some(&jwt)).await?;
                    let user: User = decode(raw)?;
                    Payload::Auth(Some(AuthSession { jwt, user }))
                }
            },
            Resource::Cart => {
                let jwt = token.ok_or(StoreError::NotSignedIn)?;
                Payload::Cart(decode(self.get(CART_PATH, Some(&jwt)).await?)?)
            }
            Resource::Wishlist => {
                let jwt = token.ok_or(StoreError::NotSignedIn)?;
                Payload::Wishlist(decode(self.get(WISHLIST_PATH, Some(&jwt)).await?)?)
            }
        };

        self.dispatch(Action::Set(payload)).await;
        Ok(())
    }

    /// Fetch only if never loaded or invalidated
    pub async fn ensure(&self, resource: Resource) -> Result<(), StoreError> {
        if self.state.read().await.needs_fetch(resource) {
            self.fetch(resource).await?;
        }
        Ok(())
    }

    /// Refetch everything; cart and wishlist concurrently once auth is known
    ///
    /// Signed out, only the auth entry is refreshed.
    pub async fn refresh_all(&self) -> Result<(), StoreError> {
        self.fetch(Resource::Auth).await?;
        if self.state.read().await.token().is_none() {
            debug!("Not signed in, skipping cart and wishlist");
            return Ok(());
        }
        futures::try_join!(self.fetch(Resource::Cart), self.fetch(Resource::Wishlist))?;
        info!("Store refreshed");
        Ok(())
    }

    pub async fn sign_in(&self, identifier: &str, password: &str) -> Result<User, StoreError> {
        let raw = self
            .backend
            .post(
                "/api/auth/local",
                None,
                json!({"identifier": identifier, "password": password}),
            )
            .await
            .map_err(StoreError::Backend)?;

        let session: AuthSession = decode(raw)?;
        let user = session.user.clone();
        self.dispatch(Action::Set(Payload::Auth(Some(session)))).await;

        info!("Signed in as {}", user.username);
        Ok(user)
    }

    /// Drop the session and everything fetched under it
    pub async fn sign_out(&self) {
        self.dispatch(Action::Reset).await;
        info!("Signed out");
    }

    pub async fn add_to_cart(&self, product_id: u64, quantity: u32) -> Result<(), StoreError> {
        if quantity == 0 {
            return Err(StoreError::InvalidQuantity);
        }
        let body = json!({"data": {"product": product_id, "quantity": quantity}});
        self.mutate(Resource::Cart, |backend, jwt| async move {
            backend.post("/api/carts", Some(&jwt), body).await.map(drop)
        })
        .await
    }

    pub async fn remove_from_cart(&self, line_id: u64) -> Result<(), StoreError> {
        self.mutate(Resource::Cart, |backend, jwt| async move {
            backend.delete(&format!("/api/carts/{}", line_id), Some(&jwt)).await
        })
        .await
    }

    pub async fn add_to_wishlist(&self, product_id: u64) -> Result<(), StoreError> {
        let body = json!({"data": {"product": product_id}});
        self.mutate(Resource::Wishlist, |backend, jwt| async move {
            backend.post("/api/wishlists", Some(&jwt), body).await.map(drop)
        })
        .await
    }

    pub async fn remove_from_wishlist(&self, entry_id: u64) -> Result<(), StoreError> {
        self.mutate(Resource::Wishlist, |backend, jwt| async move {
            backend
                .delete(&format!("/api/wishlists/{}", entry_id), Some(&jwt))
                .await
        })
        .await
    }

    /// Run a backend write, then invalidate and refetch `resource`
    async fn mutate<F, Fut>(&self, resource: Resource, write: F) -> Result<(), StoreError>
    where
        F: FnOnce(Arc<dyn ApiBackend>, String) -> Fut,
        Fut: std::future::Future<Output = anyhow::Result<()>>,
    {
        let jwt = self
            .state
            .read()
            .await
            .token()
            .ok_or(StoreError::NotSignedIn)?;

        write(Arc::clone(&self.backend), jwt)
            .await
            .map_err(StoreError::Backend)?;

        self.dispatch(Action::Invalidate(resource)).await;
        if let Err(e) = self.fetch(resource).await {
            // The write went through; the entry stays stale until next fetch
            warn!("Refetch of {:?} after write failed: {}", resource, e);
        }
        Ok(())
    }

    async fn get(&self, path: &str, token: Option<&str>) -> Result<serde_json::Value, StoreError> {
        self.backend
            .get(path, token)
            .await
            .map_err(StoreError::Backend)
    }
}

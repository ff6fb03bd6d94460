//! Client-side cache of marketplace data
//!
//! - `api`: raw REST access
//! - `decode`: envelope flattening and validation at the boundary
//! - `model`: typed domain data
//! - `store`: the single source of truth, written only through actions

pub mod api;
pub mod decode;
pub mod model;
mod store;

pub use api::{ApiBackend, HttpApi};
pub use decode::{decode, flatten, DecodeError, Validate};
pub use model::{cart_total, AuthSession, CartLine, Product, Shop, User, WishlistEntry};
pub use store::{Action, Cached, Payload, Resource, Store, StoreError, StoreState};

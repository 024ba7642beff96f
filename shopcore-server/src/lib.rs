//! HTTP surface for shopcore.
//!
//! Thin axum layer: decode requests into the core's typed values, call the
//! services, map the error taxonomy onto status codes. All interesting
//! behavior lives in `shopcore`; this crate should stay boring.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use axum::routing::get;
use axum::Router;
use shopcore::catalog::CatalogService;
use shopcore::checkout::OrderPlacementService;
use shopcore::store::{ShopStore, UserDirectory};

pub mod config;
pub mod error;
pub mod handlers;

/// The storage backend a server instance runs against.
///
/// Implemented by anything that provides both storage ports and can be
/// cloned into the per-service handles (`PostgresShopStore` in production,
/// `MemoryShopStore` in tests).
pub trait Backend: ShopStore + UserDirectory + Clone + Send + Sync + 'static {}

impl<T> Backend for T where T: ShopStore + UserDirectory + Clone + Send + Sync + 'static {}

/// Shared application state: one service handle per concern.
#[derive(Debug, Clone)]
pub struct AppState<S: Backend> {
    /// Order placement and order reads.
    pub checkout: OrderPlacementService<S, S>,
    /// Product reads and catalog edits.
    pub catalog: CatalogService<S>,
}

impl<S: Backend> AppState<S> {
    /// Wires both services over one shared backend.
    pub fn new(store: S) -> Self {
        Self {
            checkout: OrderPlacementService::new(store.clone(), store.clone()),
            catalog: CatalogService::new(store),
        }
    }
}

/// Builds the application router.
pub fn router<S: Backend>(state: AppState<S>) -> Router {
    Router::new()
        .route(
            "/products",
            get(handlers::list_products::<S>).post(handlers::create_product::<S>),
        )
        .route(
            "/products/:product_id",
            get(handlers::get_product::<S>)
                .put(handlers::update_product::<S>)
                .delete(handlers::delete_product::<S>),
        )
        .route(
            "/users/:user_id/orders",
            get(handlers::list_user_orders::<S>).post(handlers::create_order::<S>),
        )
        .with_state(state)
}

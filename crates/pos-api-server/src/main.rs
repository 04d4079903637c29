use anyhow::Result;
use axum::{
    extract::Extension,
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::{info, warn};

mod audit;
mod catalog;
mod config;
mod database;
mod handlers;
mod orders;
mod security;
mod utils;

use audit::{AuditLogger, AuditLoggerConfig};
use catalog::CatalogCache;
use config::Settings;
use database::{DbPool, Repository};
use orders::{DbOrderGateway, SessionManager};
use security::ManagerKeyValidator;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,pos_api_server=debug".to_string()),
        )
        .with_target(true)
        .json()
        .init();

    info!("Starting POS API server...");

    // Load configuration
    let settings = Arc::new(Settings::load()?);
    info!("Configuration loaded");

    // Initialize database pool
    let db_pool = DbPool::new(&settings.database).await?;
    info!("Database connection established");

    // Initialize repository
    let repository = Arc::new(Repository::new(db_pool.clone()));

    // Warm the catalog snapshot; an empty cache is survivable (lookups
    // surface as not-found until the next successful refresh).
    let catalog = Arc::new(CatalogCache::new());
    if let Err(e) = catalog.refresh(&repository).await {
        warn!("Initial catalog load failed, starting with empty cache: {}", e);
    }

    // Audit log workers
    let audit_logger = Arc::new(AuditLogger::new(
        db_pool.get_pool().clone(),
        AuditLoggerConfig::default(),
    ));

    // Order sessions over the database-backed submission gateway
    let gateway = Arc::new(DbOrderGateway::new(repository.clone()));
    let session_manager = Arc::new(SessionManager::new(
        gateway,
        Duration::from_secs(settings.sessions.idle_ttl_minutes * 60),
    ));
    spawn_session_sweeper(
        session_manager.clone(),
        Duration::from_secs(settings.sessions.sweep_interval_seconds),
    );

    // Manager-surface key validation
    let key_validator = Arc::new(ManagerKeyValidator::new(
        settings.security.manager_api_key.clone(),
    ));

    // Build router
    let app = build_router(
        repository,
        catalog,
        session_manager,
        audit_logger,
        key_validator,
        settings.clone(),
    );

    // Server address
    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));

    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn spawn_session_sweeper(manager: Arc<SessionManager>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            manager.sweep_expired();
        }
    });
}

fn build_router(
    repository: Arc<Repository>,
    catalog: Arc<CatalogCache>,
    session_manager: Arc<SessionManager>,
    audit_logger: Arc<AuditLogger>,
    key_validator: Arc<ManagerKeyValidator>,
    settings: Arc<Settings>,
) -> Router {
    // Public routes: catalog reads, history, order sessions
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/menu", get(handlers::menu::get_menu))
        .route("/inventory", get(handlers::inventory::get_inventory))
        .route("/orderhistory", get(handlers::orders::get_order_history))
        .route("/submitOrder", post(handlers::orders::submit_order))
        .route("/api/orders", post(handlers::orders::open_order))
        .route(
            "/api/orders/{session}",
            get(handlers::orders::get_order).delete(handlers::orders::close_order),
        )
        .route(
            "/api/orders/{session}/items",
            post(handlers::orders::add_item),
        )
        .route(
            "/api/orders/{session}/customize",
            post(handlers::orders::set_customization),
        )
        .route(
            "/api/orders/{session}/customize/close",
            post(handlers::orders::close_customization),
        )
        .route(
            "/api/orders/{session}/quantity",
            post(handlers::orders::change_quantity),
        )
        .route(
            "/api/orders/{session}/remove",
            post(handlers::orders::remove_item),
        )
        .route(
            "/api/orders/{session}/checkout/cash",
            post(handlers::orders::checkout_cash),
        )
        .route(
            "/api/orders/{session}/checkout/card",
            post(handlers::orders::checkout_card),
        );

    // Manager routes: catalog mutations and reports, behind the key check
    let manager_routes = Router::new()
        .route(
            "/addInventoryItem",
            post(handlers::inventory::add_inventory_item),
        )
        .route(
            "/deleteInventoryItem",
            post(handlers::inventory::delete_inventory_item),
        )
        .route(
            "/updateInventoryItemName",
            post(handlers::inventory::update_inventory_item_name),
        )
        .route(
            "/updateInventoryItemQuantity",
            post(handlers::inventory::update_inventory_item_quantity),
        )
        .route(
            "/updateInventoryItemPrice",
            post(handlers::inventory::update_inventory_item_price),
        )
        .route("/addMenuDrink", post(handlers::menu::add_menu_drink))
        .route("/deleteMenuDrink", post(handlers::menu::delete_menu_drink))
        .route(
            "/updateMenuDrinkID",
            post(handlers::menu::update_menu_drink_id),
        )
        .route(
            "/updateMenuDrinkName",
            post(handlers::menu::update_menu_drink_name),
        )
        .route(
            "/updateMenuDrinkPrice",
            post(handlers::menu::update_menu_drink_price),
        )
        .route(
            "/updateMenuDrinkIngredients",
            post(handlers::menu::update_menu_drink_ingredients),
        )
        .route("/restockReport", post(handlers::reports::restock_report))
        .route("/salesReport", post(handlers::reports::sales_report))
        .route("/excessReport", post(handlers::reports::excess_report))
        .layer(middleware::from_fn(security::middleware::manager_guard))
        .layer(Extension(key_validator));

    Router::new()
        .merge(public_routes)
        .merge(manager_routes)
        // Shared state
        .layer(Extension(repository))
        .layer(Extension(catalog))
        .layer(Extension(session_manager))
        .layer(Extension(audit_logger))
        .layer(Extension(settings))
        // CORS (the storefront and POS screens are served elsewhere)
        .layer(
            CorsLayer::permissive()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        // Tracing
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(false)),
        )
        .layer(CatchPanicLayer::new())
}

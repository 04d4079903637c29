use crate::audit::{AuditEntry, AuditLogger, AuditStatus, AuditType};
use crate::catalog::CatalogCache;
use crate::config::Settings;
use crate::database::{NewSale, Repository, SaleRow};
use crate::orders::cart::{CartError, QuantityDirection};
use crate::orders::customization::CustomizationLevel;
use crate::orders::session::{CheckoutOutcome, SessionError, SessionManager};
use crate::orders::settlement::SettlementError;
use crate::utils::error::ApiError;
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

const ORDER_HISTORY_LIMIT: i64 = 1000;

fn session_error(err: SessionError) -> ApiError {
    match err {
        SessionError::SessionNotFound(id) => {
            ApiError::NotFound(format!("order session {} not found", id))
        }
        SessionError::Cart(e @ CartError::MenuItemNotFound(_)) => ApiError::NotFound(e.to_string()),
        SessionError::Cart(e) => ApiError::BadRequest(e.to_string()),
        SessionError::Settlement(e @ SettlementError::SubmissionInFlight) => {
            ApiError::Conflict(e.to_string())
        }
        SessionError::Settlement(e) => ApiError::BadRequest(e.to_string()),
        SessionError::Encoding(e) => ApiError::BadRequest(e.to_string()),
        SessionError::Submission(msg) => ApiError::DatabaseError(msg),
    }
}

// ===== Order history & external submission (legacy wire surface) =====

pub async fn get_order_history(
    Extension(repository): Extension<Arc<Repository>>,
) -> Result<Json<Vec<SaleRow>>, ApiError> {
    let rows = repository
        .fetch_order_history(ORDER_HISTORY_LIMIT)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct SubmitOrderRequest {
    pub cashier: i32,
    pub sale_week: i32,
    pub sale_date: NaiveDate,
    pub current_hour: String,
    pub payment: String,
    pub cart: String,
    pub order_total: Decimal,
}

/// Direct submission for clients that settle on their own terminal. The
/// session checkout endpoints below go through the same insert.
pub async fn submit_order(
    Extension(repository): Extension<Arc<Repository>>,
    Extension(audit): Extension<Arc<AuditLogger>>,
    Json(request): Json<SubmitOrderRequest>,
) -> Result<StatusCode, ApiError> {
    let sale = NewSale {
        cashier: request.cashier,
        sale_week: request.sale_week,
        sale_date: request.sale_date,
        current_hour: request.current_hour,
        payment: request.payment,
        cart: request.cart,
        order_total: request.order_total,
    };

    match repository.submit_order(&sale).await {
        Ok(()) => {
            audit.log(
                AuditEntry::new(AuditType::OrderSettled, AuditStatus::Success)
                    .subject(sale.payment.clone())
                    .detail(json!({ "total": sale.order_total, "cart": sale.cart })),
            );
            Ok(StatusCode::OK)
        }
        Err(e) => {
            audit.log(
                AuditEntry::new(AuditType::OrderSubmitFailed, AuditStatus::Error)
                    .detail(json!({ "error": e.to_string() })),
            );
            Err(ApiError::DatabaseError(e.to_string()))
        }
    }
}

// ===== Order sessions =====

#[derive(Debug, Deserialize, Default)]
pub struct OpenOrderRequest {
    pub cashier: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct OpenOrderResponse {
    pub session_id: Uuid,
}

pub async fn open_order(
    Extension(manager): Extension<Arc<SessionManager>>,
    Extension(settings): Extension<Arc<Settings>>,
    request: Option<Json<OpenOrderRequest>>,
) -> Result<Json<OpenOrderResponse>, ApiError> {
    let cashier = request
        .and_then(|Json(body)| body.cashier)
        .unwrap_or(settings.sessions.default_cashier);
    let session_id = manager.open(cashier);

    Ok(Json(OpenOrderResponse { session_id }))
}

pub async fn close_order(
    Extension(manager): Extension<Arc<SessionManager>>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if manager.close(session_id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!(
            "order session {} not found",
            session_id
        )))
    }
}

#[derive(Debug, Serialize)]
pub struct LineView {
    pub menu_item_id: String,
    pub quantity: u32,
    pub price: String,
    pub notes: String,
}

#[derive(Debug, Serialize)]
pub struct OrderView {
    pub session_id: Uuid,
    pub lines: Vec<LineView>,
    pub total_items: u32,
    pub total: String,
}

fn order_view(manager: &SessionManager, session_id: Uuid) -> Result<OrderView, ApiError> {
    manager
        .with_session(session_id, |session| {
            let lines = session
                .cart
                .lines()
                .iter()
                .map(|line| LineView {
                    menu_item_id: line.menu_item_id.clone(),
                    quantity: line.quantity,
                    price: format!("{:.2}", line.price.round_dp(2)),
                    notes: line.notes.clone(),
                })
                .collect();

            Ok(OrderView {
                session_id,
                lines,
                total_items: session.cart.total_quantity(),
                total: format!("{:.2}", session.cart.display_total()),
            })
        })
        .map_err(session_error)
}

pub async fn get_order(
    Extension(manager): Extension<Arc<SessionManager>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<OrderView>, ApiError> {
    Ok(Json(order_view(&manager, session_id)?))
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub menu_item_id: String,
    pub quantity: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct AddItemResponse {
    pub message: String,
    pub order: OrderView,
}

pub async fn add_item(
    Extension(manager): Extension<Arc<SessionManager>>,
    Extension(catalog): Extension<Arc<CatalogCache>>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<AddItemRequest>,
) -> Result<Json<AddItemResponse>, ApiError> {
    let quantity = request.quantity.unwrap_or(1);

    manager
        .with_session(session_id, |session| {
            session
                .cart
                .add_item(&catalog, &mut session.selection, &request.menu_item_id, quantity)?;
            Ok(())
        })
        .map_err(session_error)?;

    let name = catalog
        .find_menu_item(&request.menu_item_id)
        .map(|item| item.name)
        .unwrap_or_else(|| request.menu_item_id.clone());

    Ok(Json(AddItemResponse {
        message: format!("{} has successfully been added to the order!", name),
        order: order_view(&manager, session_id)?,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CustomizeRequest {
    pub menu_item_id: String,
    pub ingredient_id: i32,
    pub level: CustomizationLevel,
}

pub async fn set_customization(
    Extension(manager): Extension<Arc<SessionManager>>,
    Extension(catalog): Extension<Arc<CatalogCache>>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<CustomizeRequest>,
) -> Result<StatusCode, ApiError> {
    let item = catalog
        .find_menu_item(&request.menu_item_id)
        .ok_or_else(|| {
            ApiError::NotFound(format!("menu item '{}' not found", request.menu_item_id))
        })?;

    if !item.ingredient_ids.contains(&request.ingredient_id) {
        return Err(ApiError::BadRequest(format!(
            "ingredient {} is not part of menu item '{}'",
            request.ingredient_id, request.menu_item_id
        )));
    }

    manager
        .with_session(session_id, |session| {
            session
                .selection
                .set_level(&request.menu_item_id, request.ingredient_id, request.level);
            Ok(())
        })
        .map_err(session_error)?;

    Ok(StatusCode::OK)
}

#[derive(Debug, Deserialize)]
pub struct CloseCustomizationRequest {
    pub menu_item_id: String,
}

/// Dialog dismissed without adding: the item's selection goes back to
/// all-Normal so nothing leaks into the next interaction.
pub async fn close_customization(
    Extension(manager): Extension<Arc<SessionManager>>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<CloseCustomizationRequest>,
) -> Result<StatusCode, ApiError> {
    manager
        .with_session(session_id, |session| {
            session.selection.reset_item(&request.menu_item_id);
            Ok(())
        })
        .map_err(session_error)?;

    Ok(StatusCode::OK)
}

#[derive(Debug, Deserialize)]
pub struct ChangeQuantityRequest {
    pub line_index: usize,
    pub direction: QuantityDirection,
}

pub async fn change_quantity(
    Extension(manager): Extension<Arc<SessionManager>>,
    Extension(catalog): Extension<Arc<CatalogCache>>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<ChangeQuantityRequest>,
) -> Result<Json<OrderView>, ApiError> {
    manager
        .with_session(session_id, |session| {
            session
                .cart
                .change_quantity(&catalog, request.line_index, request.direction)?;
            Ok(())
        })
        .map_err(session_error)?;

    Ok(Json(order_view(&manager, session_id)?))
}

#[derive(Debug, Deserialize)]
pub struct RemoveItemRequest {
    pub line_index: usize,
    pub menu_item_id: String,
}

pub async fn remove_item(
    Extension(manager): Extension<Arc<SessionManager>>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<RemoveItemRequest>,
) -> Result<Json<OrderView>, ApiError> {
    manager
        .with_session(session_id, |session| {
            session
                .cart
                .remove_item(request.line_index, &request.menu_item_id)?;
            Ok(())
        })
        .map_err(session_error)?;

    Ok(Json(order_view(&manager, session_id)?))
}

// ===== Checkout =====

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub settled: bool,
    pub message: String,
    pub change: Option<String>,
    pub total: String,
}

fn checkout_response(outcome: &CheckoutOutcome) -> CheckoutResponse {
    CheckoutResponse {
        settled: outcome.settled,
        message: outcome.message.clone(),
        change: outcome.change.map(|c| format!("{:.2}", c)),
        total: format!("{:.2}", outcome.total.round_dp(2)),
    }
}

fn audit_checkout(audit: &AuditLogger, outcome: &CheckoutOutcome) {
    if outcome.settled {
        audit.log(
            AuditEntry::new(AuditType::OrderSettled, AuditStatus::Success)
                .subject(outcome.payment.clone().unwrap_or_default())
                .detail(json!({ "total": outcome.total })),
        );
    }
}

#[derive(Debug, Deserialize)]
pub struct CashCheckoutRequest {
    pub tendered: Decimal,
}

pub async fn checkout_cash(
    Extension(manager): Extension<Arc<SessionManager>>,
    Extension(audit): Extension<Arc<AuditLogger>>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<CashCheckoutRequest>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let result = manager
        .checkout_cash(session_id, request.tendered, Utc::now())
        .await;

    finish_checkout(&audit, session_id, result)
}

#[derive(Debug, Deserialize)]
pub struct CardCheckoutRequest {
    pub company: String,
    pub last_four: String,
}

pub async fn checkout_card(
    Extension(manager): Extension<Arc<SessionManager>>,
    Extension(audit): Extension<Arc<AuditLogger>>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<CardCheckoutRequest>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let result = manager
        .checkout_card(session_id, &request.company, &request.last_four, Utc::now())
        .await;

    finish_checkout(&audit, session_id, result)
}

fn finish_checkout(
    audit: &AuditLogger,
    session_id: Uuid,
    result: Result<CheckoutOutcome, SessionError>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    match result {
        Ok(outcome) => {
            if outcome.settled {
                info!(
                    "Order session {} settled: {} ({})",
                    session_id,
                    outcome.total,
                    outcome.payment.as_deref().unwrap_or("?")
                );
            }
            audit_checkout(audit, &outcome);
            Ok(Json(checkout_response(&outcome)))
        }
        Err(e @ SessionError::Submission(_)) => {
            audit.log(
                AuditEntry::new(AuditType::OrderSubmitFailed, AuditStatus::Error)
                    .subject(session_id.to_string())
                    .detail(json!({ "error": e.to_string() })),
            );
            Err(session_error(e))
        }
        Err(e) => Err(session_error(e)),
    }
}

use crate::orders::cart::{CartBuilder, CartError};
use crate::orders::customization::CustomizationStore;
use crate::orders::encoding::EncodingError;
use crate::orders::gateway::OrderGateway;
use crate::orders::order::Order;
use crate::orders::settlement::{
    card_success_message, cash_success_message, CashDecision, PaymentMethod, SettlementError,
    SettlementWorkflow,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("order session {0} not found")]
    SessionNotFound(Uuid),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Settlement(#[from] SettlementError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error("order could not be persisted: {0}")]
    Submission(String),
}

/// One open order: the cart, its customization selection and the settlement
/// workflow, owned together and torn down together.
pub struct OrderSession {
    pub session_id: Uuid,
    pub cashier: i32,
    pub cart: CartBuilder,
    pub selection: CustomizationStore,
    pub settlement: SettlementWorkflow,
    last_activity: Instant,
}

impl OrderSession {
    fn new(session_id: Uuid, cashier: i32) -> Self {
        Self {
            session_id,
            cashier,
            cart: CartBuilder::new(),
            selection: CustomizationStore::new(),
            settlement: SettlementWorkflow::new(),
            last_activity: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn is_idle_expired(&self, ttl: Duration) -> bool {
        self.last_activity.elapsed() > ttl
    }
}

/// Result of a checkout call: either a settled-and-persisted order or a
/// rejection that left the cart untouched.
#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub settled: bool,
    pub message: String,
    pub change: Option<Decimal>,
    pub total: Decimal,
    pub payment: Option<String>,
}

enum Prepared {
    Rejected(CheckoutOutcome),
    Submit { order: Order, change: Option<Decimal> },
}

/// In-memory store of open orders, keyed by session id.
///
/// All cart/selection mutation is synchronous under the map entry; checkout
/// is the only async path and never holds an entry across an await. The
/// settlement workflow's Validating state is the single-writer slot that
/// blocks a concurrent second submission for the same session.
pub struct SessionManager {
    sessions: DashMap<Uuid, OrderSession>,
    gateway: Arc<dyn OrderGateway>,
    idle_ttl: Duration,
}

impl SessionManager {
    pub fn new(gateway: Arc<dyn OrderGateway>, idle_ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            gateway,
            idle_ttl,
        }
    }

    pub fn open(&self, cashier: i32) -> Uuid {
        let session_id = Uuid::new_v4();
        self.sessions
            .insert(session_id, OrderSession::new(session_id, cashier));
        info!("Opened order session {} for cashier {}", session_id, cashier);
        session_id
    }

    pub fn close(&self, session_id: Uuid) -> bool {
        let removed = self.sessions.remove(&session_id).is_some();
        if removed {
            info!("Closed order session {}", session_id);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Run a synchronous operation against one session, bumping its
    /// activity clock.
    pub fn with_session<R>(
        &self,
        session_id: Uuid,
        op: impl FnOnce(&mut OrderSession) -> Result<R, SessionError>,
    ) -> Result<R, SessionError> {
        let mut entry = self
            .sessions
            .get_mut(&session_id)
            .ok_or(SessionError::SessionNotFound(session_id))?;
        entry.touch();
        op(entry.value_mut())
    }

    /// Drop idle sessions. A session whose submission is in flight is never
    /// swept out from under its checkout.
    pub fn sweep_expired(&self) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| session.settlement.is_in_flight() || !session.is_idle_expired(self.idle_ttl));
        let swept = before.saturating_sub(self.sessions.len());
        if swept > 0 {
            info!("Swept {} idle order sessions", swept);
        }
        swept
    }

    pub async fn checkout_cash(
        &self,
        session_id: Uuid,
        tendered: Decimal,
        now: DateTime<Utc>,
    ) -> Result<CheckoutOutcome, SessionError> {
        let prepared = self.with_session(session_id, |session| {
            session.settlement.begin(PaymentMethod::Cash)?;
            let total = session.cart.total();

            match session.settlement.tender_cash(tendered, total)? {
                CashDecision::Insufficient { message } => {
                    session.settlement.dismiss();
                    Ok(Prepared::Rejected(CheckoutOutcome {
                        settled: false,
                        message,
                        change: None,
                        total,
                        payment: None,
                    }))
                }
                CashDecision::Sufficient { change } => {
                    match Order::from_cart(
                        session.cashier,
                        &session.cart,
                        PaymentMethod::Cash.as_str().to_string(),
                        now,
                    ) {
                        Ok(order) => Ok(Prepared::Submit {
                            order,
                            change: Some(change),
                        }),
                        Err(e) => {
                            let _ = session.settlement.complete(false);
                            Err(SessionError::Encoding(e))
                        }
                    }
                }
            }
        })?;

        self.submit_prepared(session_id, prepared, |change, _| {
            cash_success_message(change.unwrap_or(Decimal::ZERO))
        })
        .await
    }

    pub async fn checkout_card(
        &self,
        session_id: Uuid,
        company: &str,
        card_digits: &str,
        now: DateTime<Utc>,
    ) -> Result<CheckoutOutcome, SessionError> {
        let prepared = self.with_session(session_id, |session| {
            session.settlement.begin(PaymentMethod::Card)?;

            let label = match session.settlement.tender_card(company, card_digits) {
                Ok(label) => label,
                Err(e) => {
                    // The single-request dialog closes on error; the
                    // workflow must be reusable for the retry.
                    let _ = session.settlement.cancel();
                    return Err(e.into());
                }
            };

            match Order::from_cart(session.cashier, &session.cart, label, now) {
                Ok(order) => Ok(Prepared::Submit {
                    order,
                    change: None,
                }),
                Err(e) => {
                    let _ = session.settlement.complete(false);
                    Err(SessionError::Encoding(e))
                }
            }
        })?;

        self.submit_prepared(session_id, prepared, |_, total| card_success_message(total))
            .await
    }

    async fn submit_prepared(
        &self,
        session_id: Uuid,
        prepared: Prepared,
        success_message: impl FnOnce(Option<Decimal>, Decimal) -> String,
    ) -> Result<CheckoutOutcome, SessionError> {
        let (order, change) = match prepared {
            Prepared::Rejected(outcome) => return Ok(outcome),
            Prepared::Submit { order, change } => (order, change),
        };

        // The map entry is released here; the in-flight settlement state is
        // what fends off a concurrent checkout.
        let submit_result = self.gateway.submit(&order).await;
        let persisted = submit_result.is_ok();
        self.finish(session_id, persisted);

        match submit_result {
            Ok(()) => Ok(CheckoutOutcome {
                settled: true,
                message: success_message(change, order.order_total),
                change: change.map(|c| c.round_dp(2)),
                total: order.order_total,
                payment: Some(order.payment),
            }),
            Err(e) => Err(SessionError::Submission(e.to_string())),
        }
    }

    fn finish(&self, session_id: Uuid, persisted: bool) {
        match self.sessions.get_mut(&session_id) {
            Some(mut entry) => {
                let session = entry.value_mut();
                if persisted {
                    if session.settlement.complete(true).is_ok() {
                        session.cart.clear();
                    }
                    session.settlement.dismiss();
                    debug!("Order session {} settled and cleared", session_id);
                } else {
                    // Cart stays as it was; the cashier can retry.
                    let _ = session.settlement.complete(false);
                }
                session.touch();
            }
            None if persisted => {
                warn!(
                    "Order session {} disappeared after a persisted checkout",
                    session_id
                );
            }
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogCache, InventoryItem, MenuItem};
    use crate::orders::gateway::MockOrderGateway;
    use crate::orders::settlement::{SettlementState, INSUFFICIENT_CASH_MESSAGE};
    use chrono::TimeZone;

    fn dec(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    fn catalog() -> CatalogCache {
        let cache = CatalogCache::new();
        cache.install(
            vec![MenuItem {
                id: "M1".to_string(),
                name: "Classic Milk Tea".to_string(),
                price: dec(350),
                ingredient_ids: vec![3],
            }],
            vec![InventoryItem {
                id: 3,
                name: "Pearls".to_string(),
                quantity: 100,
                price: dec(25),
            }],
        );
        cache
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 14, 0, 0).unwrap()
    }

    fn manager_with(gateway: MockOrderGateway) -> SessionManager {
        SessionManager::new(Arc::new(gateway), Duration::from_secs(3600))
    }

    fn add_two_teas(manager: &SessionManager, cache: &CatalogCache, session_id: Uuid) {
        manager
            .with_session(session_id, |session| {
                session.cart.add_item(cache, &mut session.selection, "M1", 2)?;
                Ok(())
            })
            .unwrap();
    }

    #[tokio::test]
    async fn test_cash_checkout_settles_and_clears_cart() {
        let mut gateway = MockOrderGateway::new();
        gateway
            .expect_submit()
            .withf(|order: &Order| order.payment == "Cash" && order.cart == "M1")
            .times(1)
            .returning(|_| Ok(()));

        let cache = catalog();
        let manager = manager_with(gateway);
        let session_id = manager.open(1);
        add_two_teas(&manager, &cache, session_id);

        let outcome = manager
            .checkout_cash(session_id, dec(1000), now())
            .await
            .unwrap();

        assert!(outcome.settled);
        assert_eq!(outcome.message, "Payment Successful! Change: $3.00");
        assert_eq!(outcome.change, Some(dec(300)));
        assert_eq!(outcome.total, dec(700));

        manager
            .with_session(session_id, |session| {
                assert!(session.cart.is_empty());
                assert_eq!(session.settlement.state(), SettlementState::Idle);
                Ok(())
            })
            .unwrap();
    }

    #[tokio::test]
    async fn test_insufficient_cash_rejects_and_keeps_cart() {
        let mut gateway = MockOrderGateway::new();
        gateway.expect_submit().times(0);

        let cache = catalog();
        let manager = manager_with(gateway);
        let session_id = manager.open(1);
        add_two_teas(&manager, &cache, session_id);

        let outcome = manager
            .checkout_cash(session_id, dec(500), now())
            .await
            .unwrap();

        assert!(!outcome.settled);
        assert_eq!(outcome.message, INSUFFICIENT_CASH_MESSAGE);
        assert_eq!(outcome.change, None);

        manager
            .with_session(session_id, |session| {
                assert_eq!(session.cart.total(), dec(700));
                assert_eq!(session.settlement.state(), SettlementState::Idle);
                Ok(())
            })
            .unwrap();
    }

    #[tokio::test]
    async fn test_failed_persistence_keeps_cart_and_reports_error() {
        let mut gateway = MockOrderGateway::new();
        gateway
            .expect_submit()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("connection refused")));

        let cache = catalog();
        let manager = manager_with(gateway);
        let session_id = manager.open(1);
        add_two_teas(&manager, &cache, session_id);

        let err = manager
            .checkout_cash(session_id, dec(1000), now())
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Submission(_)));

        manager
            .with_session(session_id, |session| {
                assert_eq!(session.cart.total(), dec(700));
                assert_eq!(session.settlement.state(), SettlementState::Idle);
                Ok(())
            })
            .unwrap();
    }

    #[tokio::test]
    async fn test_card_checkout_persists_payment_label() {
        let mut gateway = MockOrderGateway::new();
        gateway
            .expect_submit()
            .withf(|order: &Order| order.payment == "Visa 1234")
            .times(1)
            .returning(|_| Ok(()));

        let cache = catalog();
        let manager = manager_with(gateway);
        let session_id = manager.open(1);
        add_two_teas(&manager, &cache, session_id);

        let outcome = manager
            .checkout_card(session_id, "Visa", "4242424242421234", now())
            .await
            .unwrap();

        assert!(outcome.settled);
        assert_eq!(outcome.message, "Payment of $7.00 Successful!");
        assert_eq!(outcome.payment.as_deref(), Some("Visa 1234"));
    }

    #[tokio::test]
    async fn test_card_checkout_requires_details_and_stays_retryable() {
        let mut gateway = MockOrderGateway::new();
        gateway
            .expect_submit()
            .times(1)
            .returning(|_| Ok(()));

        let cache = catalog();
        let manager = manager_with(gateway);
        let session_id = manager.open(1);
        add_two_teas(&manager, &cache, session_id);

        let err = manager
            .checkout_card(session_id, "", "1234", now())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Settlement(SettlementError::MissingCardDetails)
        ));

        // The same session can complete the payment afterwards.
        let outcome = manager
            .checkout_card(session_id, "Visa", "1234", now())
            .await
            .unwrap();
        assert!(outcome.settled);
    }

    #[tokio::test]
    async fn test_in_flight_submission_blocks_second_checkout() {
        let gateway = MockOrderGateway::new();
        let manager = manager_with(gateway);
        let session_id = manager.open(1);

        // Drive the settlement into its in-flight slot by hand.
        manager
            .with_session(session_id, |session| {
                session.settlement.begin(PaymentMethod::Cash)?;
                session.settlement.tender_cash(dec(500), Decimal::ZERO)?;
                assert!(session.settlement.is_in_flight());
                Ok(())
            })
            .unwrap();

        let err = manager
            .checkout_cash(session_id, dec(500), now())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Settlement(SettlementError::SubmissionInFlight)
        ));
    }

    #[tokio::test]
    async fn test_empty_cart_checkout_boundary() {
        let mut gateway = MockOrderGateway::new();
        gateway
            .expect_submit()
            .withf(|order: &Order| order.cart.is_empty() && order.order_total == Decimal::ZERO)
            .times(1)
            .returning(|_| Ok(()));

        let manager = manager_with(gateway);
        let session_id = manager.open(1);

        let outcome = manager
            .checkout_cash(session_id, dec(500), now())
            .await
            .unwrap();
        assert!(outcome.settled);
        assert_eq!(outcome.change, Some(dec(500)));
        assert_eq!(outcome.message, "Payment Successful! Change: $5.00");
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let gateway = MockOrderGateway::new();
        let manager = manager_with(gateway);

        let err = manager
            .checkout_cash(Uuid::new_v4(), dec(500), now())
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn test_sweep_spares_active_sessions() {
        let gateway = MockOrderGateway::new();
        let manager = SessionManager::new(Arc::new(gateway), Duration::from_secs(0));
        let idle = manager.open(1);
        let busy = manager.open(1);

        manager
            .with_session(busy, |session| {
                session.settlement.begin(PaymentMethod::Cash)?;
                session.settlement.tender_cash(dec(500), Decimal::ZERO)?;
                Ok(())
            })
            .unwrap();

        std::thread::sleep(Duration::from_millis(5));
        let swept = manager.sweep_expired();

        assert_eq!(swept, 1);
        assert!(manager.with_session(idle, |_| Ok(())).is_err());
        assert!(manager.with_session(busy, |_| Ok(())).is_ok());
    }
}

//! Order composition and payment settlement: the cart, its customization
//! selection, the settlement state machine and the persistence gateway,
//! held together in per-terminal order sessions.

pub mod cart;
pub mod customization;
pub mod encoding;
pub mod gateway;
pub mod order;
pub mod session;
pub mod settlement;

pub use cart::{CartBuilder, CartError, LineItem, QuantityDirection};
pub use customization::{CustomizationLevel, CustomizationStore};
pub use gateway::{DbOrderGateway, OrderGateway};
pub use order::Order;
pub use session::{CheckoutOutcome, OrderSession, SessionError, SessionManager};
pub use settlement::{PaymentMethod, SettlementState, SettlementWorkflow};

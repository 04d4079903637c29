use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const INSUFFICIENT_CASH_MESSAGE: &str =
    "Insufficient Cash Amount! Please provide adequate cash.";

pub fn cash_success_message(change: Decimal) -> String {
    format!("Payment Successful! Change: ${:.2}", change.round_dp(2))
}

pub fn card_success_message(total: Decimal) -> String {
    format!("Payment of ${:.2} Successful!", total.round_dp(2))
}

/// Display label stored with the sale: "Cash", or "<company> <last4>".
/// Only the label is ever kept; full card data is never collected.
pub fn card_payment_label(company: &str, card_digits: &str) -> String {
    let digits = card_digits.trim();
    let start = digits
        .char_indices()
        .rev()
        .nth(3)
        .map(|(i, _)| i)
        .unwrap_or(0);
    format!("{} {}", company.trim(), &digits[start..])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Cash => "Cash",
            Self::Card => "Card",
        }
    }
}

/// Settlement lifecycle for one open order:
/// Idle -> MethodChosen -> Collecting -> Validating -> Success | Rejected -> Idle
///
/// `Validating` doubles as the single-writer submission slot: while an order
/// is being persisted no second settlement may begin on the same session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementState {
    Idle,
    MethodChosen(PaymentMethod),
    Collecting(PaymentMethod),
    Validating,
    Success,
    Rejected,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SettlementError {
    #[error("a payment for this order is already being processed")]
    SubmissionInFlight,

    #[error("settlement is not in a state that allows this step")]
    InvalidTransition,

    #[error("credit card company and last four digits are both required")]
    MissingCardDetails,
}

/// Outcome of tendering cash against the current total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CashDecision {
    /// Change owed; the workflow has advanced to Validating and the order
    /// may be submitted.
    Sufficient { change: Decimal },
    /// Not enough tendered; the workflow is Rejected, nothing is submitted
    /// and the cart must be left untouched.
    Insufficient { message: String },
}

#[derive(Debug)]
pub struct SettlementWorkflow {
    state: SettlementState,
}

impl SettlementWorkflow {
    pub fn new() -> Self {
        Self {
            state: SettlementState::Idle,
        }
    }

    pub fn state(&self) -> SettlementState {
        self.state
    }

    pub fn is_in_flight(&self) -> bool {
        self.state == SettlementState::Validating
    }

    /// Open the payment dialog. Only valid from Idle; a submission in
    /// flight is reported distinctly so callers can answer 409.
    pub fn begin(&mut self, method: PaymentMethod) -> Result<(), SettlementError> {
        match self.state {
            SettlementState::Idle => {
                self.state = SettlementState::MethodChosen(method);
                Ok(())
            }
            SettlementState::Validating => Err(SettlementError::SubmissionInFlight),
            _ => Err(SettlementError::InvalidTransition),
        }
    }

    /// Cash entry: compute change against the order total. Sufficient cash
    /// advances to Validating; insufficient cash lands in Rejected with the
    /// user-facing message.
    pub fn tender_cash(
        &mut self,
        tendered: Decimal,
        total: Decimal,
    ) -> Result<CashDecision, SettlementError> {
        match self.state {
            SettlementState::MethodChosen(PaymentMethod::Cash)
            | SettlementState::Collecting(PaymentMethod::Cash) => {}
            SettlementState::Validating => return Err(SettlementError::SubmissionInFlight),
            _ => return Err(SettlementError::InvalidTransition),
        }

        self.state = SettlementState::Collecting(PaymentMethod::Cash);
        let change = tendered - total;

        if change >= Decimal::ZERO {
            self.state = SettlementState::Validating;
            Ok(CashDecision::Sufficient { change })
        } else {
            self.state = SettlementState::Rejected;
            Ok(CashDecision::Insufficient {
                message: INSUFFICIENT_CASH_MESSAGE.to_string(),
            })
        }
    }

    /// Card entry: both fields are required non-empty; nothing beyond a
    /// display label is validated or kept. Advances to Validating.
    pub fn tender_card(
        &mut self,
        company: &str,
        card_digits: &str,
    ) -> Result<String, SettlementError> {
        match self.state {
            SettlementState::MethodChosen(PaymentMethod::Card)
            | SettlementState::Collecting(PaymentMethod::Card) => {}
            SettlementState::Validating => return Err(SettlementError::SubmissionInFlight),
            _ => return Err(SettlementError::InvalidTransition),
        }

        self.state = SettlementState::Collecting(PaymentMethod::Card);

        if company.trim().is_empty() || card_digits.trim().is_empty() {
            return Err(SettlementError::MissingCardDetails);
        }

        self.state = SettlementState::Validating;
        Ok(card_payment_label(company, card_digits))
    }

    /// Resolve the in-flight submission: Success when the order persisted,
    /// straight back to Idle when it did not (the cart stays as it was).
    pub fn complete(&mut self, persisted: bool) -> Result<(), SettlementError> {
        if self.state != SettlementState::Validating {
            return Err(SettlementError::InvalidTransition);
        }
        self.state = if persisted {
            SettlementState::Success
        } else {
            SettlementState::Idle
        };
        Ok(())
    }

    /// Dismiss the Success/Rejected modal.
    pub fn dismiss(&mut self) {
        if matches!(
            self.state,
            SettlementState::Success | SettlementState::Rejected
        ) {
            self.state = SettlementState::Idle;
        }
    }

    /// Close the payment dialog before validation: back to Idle, no
    /// submission, no cart mutation. A submission already in flight cannot
    /// be cancelled.
    pub fn cancel(&mut self) -> Result<(), SettlementError> {
        match self.state {
            SettlementState::Validating => Err(SettlementError::SubmissionInFlight),
            _ => {
                self.state = SettlementState::Idle;
                Ok(())
            }
        }
    }
}

impl Default for SettlementWorkflow {
    fn default() -> Self {
        Self::new()
    }
}

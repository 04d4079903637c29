use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditType {
    OrderSettled,
    OrderSubmitFailed,
    MenuMutated,
    InventoryMutated,
    CatalogRefreshFailed,
}

impl AuditType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::OrderSettled => "order_settled",
            Self::OrderSubmitFailed => "order_submit_failed",
            Self::MenuMutated => "menu_mutated",
            Self::InventoryMutated => "inventory_mutated",
            Self::CatalogRefreshFailed => "catalog_refresh_failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Success,
    Error,
    Warning,
}

impl AuditStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }
}

/// One row for pos_activity_log. `subject` identifies what was touched
/// (a menu id, an inventory id, a payment label); `detail` carries the
/// operation-specific payload.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub audit_type: AuditType,
    pub status: AuditStatus,
    pub subject: Option<String>,
    pub detail: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(audit_type: AuditType, status: AuditStatus) -> Self {
        Self {
            audit_type,
            status,
            subject: None,
            detail: None,
            created_at: Utc::now(),
        }
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

use crate::database::{NewSale, Repository};
use crate::orders::order::Order;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Persistence seam for finalized orders. One call per settled order, no
/// retry; the settlement workflow decides what a failure means.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderGateway: Send + Sync {
    async fn submit(&self, order: &Order) -> Result<()>;
}

/// Production gateway: a single sales_history insert through the repository.
pub struct DbOrderGateway {
    repository: Arc<Repository>,
}

impl DbOrderGateway {
    pub fn new(repository: Arc<Repository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl OrderGateway for DbOrderGateway {
    async fn submit(&self, order: &Order) -> Result<()> {
        let sale = NewSale {
            cashier: order.cashier,
            sale_week: order.sale_week,
            sale_date: order.sale_date,
            current_hour: order.current_hour.clone(),
            payment: order.payment.clone(),
            cart: order.cart.clone(),
            order_total: order.order_total,
        };

        self.repository.submit_order(&sale).await?;

        info!(
            "Order persisted: payment='{}', total={}, cart='{}'",
            order.payment, order.order_total, order.cart
        );

        Ok(())
    }
}

//! Order domain service.

use std::sync::Arc;

use crate::persistence::OrderContext;

/// Order operations, shared across requests.
pub struct OrderService {
    context: Arc<OrderContext>,
}

impl OrderService {
    pub fn new(context: Arc<OrderContext>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &Arc<OrderContext> {
        &self.context
    }
}

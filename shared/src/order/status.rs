//! Order lifecycle
//!
//! Stored orders carry no status field. The stage is implied by which
//! timestamps are set:
//!
//! | Stage | created_at | shipped_at | completed_at |
//! |-------|------------|------------|--------------|
//! | Created | set | - | - |
//! | Shipped | set | set | - |
//! | Completed | set | set | set |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Order;

/// Lifecycle stage of an order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Created,
    Shipped,
    Completed,
}

/// Requested status change
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StatusTransition {
    Shipped,
    Completed,
}

/// Rejected status change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    AlreadyShipped,
    NotShipped,
    AlreadyCompleted,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionError::AlreadyShipped => write!(f, "order already shipped"),
            TransitionError::NotShipped => write!(f, "order has not been shipped"),
            TransitionError::AlreadyCompleted => write!(f, "order already completed"),
        }
    }
}

impl std::error::Error for TransitionError {}

impl Order {
    /// Apply a status change in place, stamping it with `at`
    ///
    /// Shipping requires an unshipped order; completing requires a shipped,
    /// not yet completed order.
    pub fn apply_transition(
        &mut self,
        transition: StatusTransition,
        at: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        match transition {
            StatusTransition::Shipped => {
                if self.shipped_at.is_some() {
                    return Err(TransitionError::AlreadyShipped);
                }
                self.shipped_at = Some(at);
            }
            StatusTransition::Completed => {
                if self.shipped_at.is_none() {
                    return Err(TransitionError::NotShipped);
                }
                if self.completed_at.is_some() {
                    return Err(TransitionError::AlreadyCompleted);
                }
                self.completed_at = Some(at);
            }
        }
        Ok(())
    }
}

//! Confirmation capability
//!
//! Workflows that need a yes/no answer mid-run ask through `Confirm`; the
//! interface layer supplies a terminal prompt, tests a fixed answer.

use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait Confirm: Send + Sync {
    async fn confirm(&self, question: &str) -> bool;
}

pub type SharedConfirm = Arc<dyn Confirm>;

/// Answers every question the same way.
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

#[async_trait]
impl Confirm for FixedAnswer {
    async fn confirm(&self, question: &str) -> bool {
        tracing::debug!(question, answer = self.0, "Answered confirmation");
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_answer() {
        let yes: SharedConfirm = Arc::new(FixedAnswer(true));
        let no: SharedConfirm = Arc::new(FixedAnswer(false));
        assert!(yes.confirm("Reuse?").await);
        assert!(!no.confirm("Reuse?").await);
    }
}

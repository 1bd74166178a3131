//! Entity-movement collaborator.
//!
//! When a worker reaches a terminal status and declares a matching movement
//! rule, the external entity record is moved to the rule's target node and
//! optionally relabeled. This is an effect outside the execution graph: it
//! never alters node state and never blocks the walk.

use async_trait::async_trait;
use tracing::info;

use crate::dsl::schema::MovementRule;

/// Which terminal status triggered the rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementOutcome {
    Success,
    Failure,
}

#[async_trait]
pub trait EntityMover: Send + Sync {
    async fn move_entity(
        &self,
        run_id: &str,
        node_id: &str,
        rule: &MovementRule,
        outcome: MovementOutcome,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Default mover: records the movement in the log and does nothing else.
pub struct NoopMover;

#[async_trait]
impl EntityMover for NoopMover {
    async fn move_entity(
        &self,
        run_id: &str,
        node_id: &str,
        rule: &MovementRule,
        outcome: MovementOutcome,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!(
            run_id = %run_id,
            node_id = %node_id,
            move_to = %rule.move_to,
            complete_as = %rule.complete_as,
            ?outcome,
            "entity movement (noop)"
        );
        Ok(())
    }
}

//! Per-model decision overrides

use super::context::AccessContext;
use super::engine::Operation;
use crate::query::Filter;

/// Escape hatch that replaces the engine's decision for a model
///
/// Whatever a method returns is final: the engine's own result is only passed
/// in as input. The default methods keep the computed decision.
pub trait DecisionOverride: Send + Sync {
    /// Replace the permission filter of a list or read
    fn revise_filter(&self, _op: Operation, filter: Filter, _ctx: &AccessContext) -> Filter {
        filter
    }

    /// Replace the grant of a create, update or delete
    fn revise_grant(&self, _op: Operation, granted: bool, _ctx: &AccessContext) -> bool {
        granted
    }
}

/// Lets any authenticated caller create records; every other decision is kept
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthenticatedCreate;

impl DecisionOverride for AuthenticatedCreate {
    fn revise_grant(&self, op: Operation, granted: bool, ctx: &AccessContext) -> bool {
        match op {
            Operation::Create => granted || ctx.user_id().is_some(),
            _ => granted,
        }
    }
}

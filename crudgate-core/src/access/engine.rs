//! Access decision engine
//!
//! One predicate serves every check: a caller passes when their id is in the
//! record's owner list for the access kind, or when their roles intersect the
//! record's role list for it. List and read turn the predicate into a query
//! filter; create, update and delete evaluate it to a grant; field selection
//! compares roles against the model's per-property requirements.

use std::fmt;
use std::sync::Arc;

use http::HeaderMap;
use serde_json::Value;

use super::context::AccessContext;
use super::error::AccessError;
use super::fields::{AccessKind, PermissionFields};
use super::mask::FieldMask;
use super::principal::{Principal, PrincipalResolver};
use super::roles::RoleAggregator;
use super::token::{JwtDecoder, TokenDecoder};
use crate::config::SecurityConfig;
use crate::model::ModelSecurity;
use crate::query::Filter;
use crate::store::{GroupMembershipStore, RecordStore};

/// Operation kinds the engine decides on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Read,
    Create,
    Update,
    Delete,
    FieldSelect,
}

impl Operation {
    pub fn access_kind(self) -> AccessKind {
        match self {
            Operation::List | Operation::Read | Operation::FieldSelect => AccessKind::Read,
            Operation::Create | Operation::Update => AccessKind::Write,
            Operation::Delete => AccessKind::Delete,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Read => "read",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::FieldSelect => "field-select",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of [`AccessEngine::decide`]
#[derive(Debug, Clone, PartialEq)]
pub enum AccessDecision {
    /// Constraint to AND onto the caller's query
    Filter(Filter),
    /// Fields to strip from responses
    Mask(FieldMask),
    /// Whether a mutation may proceed
    Grant(bool),
}

impl AccessDecision {
    pub fn into_filter(self) -> Filter {
        match self {
            AccessDecision::Filter(filter) => filter,
            AccessDecision::Grant(false) => Filter::Nothing,
            _ => Filter::All,
        }
    }

    pub fn into_mask(self) -> FieldMask {
        match self {
            AccessDecision::Mask(mask) => mask,
            _ => FieldMask::default(),
        }
    }

    /// `PermissionDenied` for a refused grant
    pub fn require_grant(self) -> Result<(), AccessError> {
        match self {
            AccessDecision::Grant(false) => Err(AccessError::PermissionDenied),
            _ => Ok(()),
        }
    }
}

/// Resolves callers and decides what they may do
#[derive(Clone)]
pub struct AccessEngine {
    resolver: PrincipalResolver,
    aggregator: RoleAggregator,
    require_authentication: bool,
}

impl AccessEngine {
    pub fn new(resolver: PrincipalResolver, aggregator: RoleAggregator) -> Self {
        Self { resolver, aggregator, require_authentication: false }
    }

    pub fn with_required_authentication(mut self, required: bool) -> Self {
        self.require_authentication = required;
        self
    }

    /// Build from the `[security]` section and a group membership store
    pub fn from_config(config: &SecurityConfig, groups: Arc<dyn GroupMembershipStore>) -> Self {
        let decoder: Arc<dyn TokenDecoder> = match &config.jwt_secret {
            Some(secret) => Arc::new(JwtDecoder::verified(secret, config.user_id_claim.clone())),
            None => {
                log::warn!(
                    "No jwt_secret configured: token signatures are NOT verified, \
                     only run behind a gateway that checks them"
                );
                Arc::new(JwtDecoder::unverified(config.user_id_claim.clone()))
            }
        };
        let resolver =
            PrincipalResolver::new(config.token_source, config.token_key.clone(), decoder);
        Self::new(resolver, RoleAggregator::new(groups))
            .with_required_authentication(config.require_authentication)
    }

    /// Resolve the caller without touching the group store
    pub fn principal(&self, headers: &HeaderMap) -> Result<Principal, AccessError> {
        let principal = self.resolver.resolve(headers)?;
        if principal.is_anonymous() && self.require_authentication {
            return Err(AccessError::AuthenticationRequired);
        }
        Ok(principal)
    }

    /// Principal plus aggregated roles, computed once per request
    pub async fn context(&self, headers: &HeaderMap) -> Result<AccessContext, AccessError> {
        let principal = self.principal(headers)?;
        let roles = self.aggregator.aggregate(&principal).await?;
        Ok(AccessContext::new(principal, roles))
    }

    /// Owner id OR role intersection for one access kind
    pub fn permits(kind: AccessKind, ctx: &AccessContext, fields: &PermissionFields) -> bool {
        let owner = ctx
            .user_id()
            .map(|uid| fields.owners(kind).iter().any(|o| o == uid))
            .unwrap_or(false);
        owner || ctx.roles.intersects(fields.roles(kind))
    }

    /// The same predicate as [`Self::permits`], expressed as a query filter
    pub fn permission_filter(kind: AccessKind, ctx: &AccessContext) -> Filter {
        let mut clauses = Vec::with_capacity(2);
        if let Some(uid) = ctx.user_id() {
            clauses.push(Filter::eq(kind.owner_field(), uid));
        }
        clauses.push(Filter::in_list(kind.role_field(), ctx.roles.to_vec()));
        Filter::Or(clauses)
    }

    pub fn list_filter(&self, ctx: &AccessContext, security: &ModelSecurity) -> Filter {
        self.filter_for(Operation::List, ctx, security)
    }

    pub fn read_filter(&self, ctx: &AccessContext, security: &ModelSecurity) -> Filter {
        self.filter_for(Operation::Read, ctx, security)
    }

    fn filter_for(&self, op: Operation, ctx: &AccessContext, security: &ModelSecurity) -> Filter {
        let filter = Self::permission_filter(op.access_kind(), ctx);
        match &security.overrides {
            Some(hook) => hook.revise_filter(op, filter, ctx),
            None => filter,
        }
    }

    /// Static writer roles of the model; no record exists yet
    pub fn create_grant(&self, ctx: &AccessContext, security: &ModelSecurity) -> bool {
        let granted = security
            .static_roles
            .as_ref()
            .map(|roles| ctx.roles.intersects(&roles.write_roles))
            .unwrap_or(false);
        self.revise_grant(Operation::Create, granted, ctx, security)
    }

    pub fn update_grant(
        &self,
        ctx: &AccessContext,
        security: &ModelSecurity,
        record: &PermissionFields,
    ) -> bool {
        let granted = Self::permits(AccessKind::Write, ctx, record);
        self.revise_grant(Operation::Update, granted, ctx, security)
    }

    pub fn delete_grant(
        &self,
        ctx: &AccessContext,
        security: &ModelSecurity,
        record: &PermissionFields,
    ) -> bool {
        let granted = Self::permits(AccessKind::Delete, ctx, record);
        self.revise_grant(Operation::Delete, granted, ctx, security)
    }

    fn revise_grant(
        &self,
        op: Operation,
        granted: bool,
        ctx: &AccessContext,
        security: &ModelSecurity,
    ) -> bool {
        match &security.overrides {
            Some(hook) => hook.revise_grant(op, granted, ctx),
            None => granted,
        }
    }

    pub fn field_mask(&self, ctx: &AccessContext, security: &ModelSecurity) -> FieldMask {
        FieldMask::compute(&security.properties_roles, &ctx.roles)
    }

    /// Uniform entry point for all operation kinds
    ///
    /// Update and delete need the stored record's permission fields; without
    /// them the decision fails with `RecordNotFound`.
    pub fn decide(
        &self,
        op: Operation,
        ctx: &AccessContext,
        security: &ModelSecurity,
        record: Option<&PermissionFields>,
    ) -> Result<AccessDecision, AccessError> {
        let decision = match op {
            Operation::List => AccessDecision::Filter(self.list_filter(ctx, security)),
            Operation::Read => AccessDecision::Filter(self.read_filter(ctx, security)),
            Operation::FieldSelect => AccessDecision::Mask(self.field_mask(ctx, security)),
            Operation::Create => AccessDecision::Grant(self.create_grant(ctx, security)),
            Operation::Update => {
                let record = record.ok_or(AccessError::RecordNotFound)?;
                AccessDecision::Grant(self.update_grant(ctx, security, record))
            }
            Operation::Delete => {
                let record = record.ok_or(AccessError::RecordNotFound)?;
                AccessDecision::Grant(self.delete_grant(ctx, security, record))
            }
        };

        log::debug!(
            "Access {} for user {}: {:?}",
            op,
            ctx.user_id().unwrap_or("<anonymous>"),
            decision
        );
        Ok(decision)
    }

    /// Look up a record and check an update or delete against it
    ///
    /// Returns the stored document when granted.
    pub async fn authorize_mutation(
        &self,
        op: Operation,
        ctx: &AccessContext,
        security: &ModelSecurity,
        store: &dyn RecordStore,
        id: &str,
    ) -> Result<Value, AccessError> {
        let stored = store.find_by_id(id, &Filter::All).await?.ok_or(AccessError::RecordNotFound)?;
        let fields = PermissionFields::from_document(&stored).map_err(|e| {
            log::error!("Record {} carries malformed permission fields: {}", id, e);
            AccessError::DependencyUnavailable(format!("malformed permission fields: {}", e))
        })?;
        self.decide(op, ctx, security, Some(&fields))?.require_grant()?;
        Ok(stored)
    }
}

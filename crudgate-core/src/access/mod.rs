//! Crudgate access control
//!
//! Everything that decides what a caller may see or change lives here:
//!
//! - [`principal`] resolves the caller identity from a cookie or header token
//! - [`roles`] flattens the caller's group permissions into a [`RoleSet`]
//! - [`fields`] describes the per-record reader/writer/delete lists
//! - [`engine`] turns identity, roles and record lists into an [`AccessDecision`]
//!
//! # Example
//! ```rust,ignore
//! let engine = AccessEngine::from_config(&config.security, group_store);
//! let ctx = engine.context(req.headers()).await?;
//! let filter = engine
//!     .decide(Operation::List, &ctx, &model.security, None)?
//!     .into_filter();
//! ```

mod context;
pub mod cookie;
mod engine;
mod error;
mod fields;
mod mask;
mod overrides;
mod principal;
mod roles;
mod token;

pub use context::AccessContext;
pub use engine::{AccessDecision, AccessEngine, Operation};
pub use error::AccessError;
pub use fields::{AccessKind, OwnerSeed, PermissionFields, PERMISSION_FIELDS};
pub use mask::{FieldMask, Projection};
pub use overrides::{AuthenticatedCreate, DecisionOverride};
pub use principal::{Principal, PrincipalResolver, TokenSource};
pub use roles::{RoleAggregator, RoleSet};
pub use token::{JwtDecoder, TokenDecoder};

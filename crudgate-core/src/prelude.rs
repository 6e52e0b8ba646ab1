//! Common imports for applications embedding crudgate

pub use crate::access::{
    AccessContext, AccessEngine, AccessError, AuthenticatedCreate, DecisionOverride, JwtDecoder,
    Operation, OwnerSeed, Principal, TokenSource,
};
pub use crate::config::CrudgateConfig;
pub use crate::crud::{CrudController, CrudError, ListResponse, Outcome};
pub use crate::http::{CrudHttpHandler, CrudServer, ModelHandler, Router};
pub use crate::model::{ModelDefinition, ModelSecurity, RouteDefaults, StaticRoles};
pub use crate::query::{Filter, ListQuery, SortKey};
pub use crate::store::{
    CollectionGroupStore, Group, GroupMembershipStore, MemoryRecordStore, RecordStore, StoreError,
};

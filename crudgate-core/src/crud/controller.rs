use std::sync::Arc;

use http::HeaderMap;
use serde_json::Value;

use super::{CrudError, ListPage, ListResponse, Outcome};
use crate::access::{
    AccessContext, AccessEngine, AccessError, FieldMask, Operation, OwnerSeed, PermissionFields,
    Projection,
};
use crate::config::PaginationConfig;
use crate::model::{BodyTransform, ModelDefinition, PaginationMode};
use crate::query::{Filter, ListQuery, Pagination, SortKey};
use crate::store::{FindOptions, RecordStore, StoreError, ID_FIELD};

/// Serves the CRUD operations of one model
#[derive(Clone)]
pub struct CrudController {
    model: Arc<ModelDefinition>,
    store: Arc<dyn RecordStore>,
    engine: Arc<AccessEngine>,
    pagination: PaginationConfig,
}

impl CrudController {
    pub fn new(
        model: ModelDefinition,
        store: Arc<dyn RecordStore>,
        engine: Arc<AccessEngine>,
        pagination: PaginationConfig,
    ) -> Self {
        Self { model: Arc::new(model), store, engine, pagination }
    }

    pub fn model(&self) -> &ModelDefinition {
        &self.model
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    fn secured(&self) -> bool {
        self.model.security.enabled
    }

    /// Full context for secured models
    ///
    /// Unsecured models never reach the group store; the principal is still
    /// resolved (best effort) so new records get their creator as owner.
    async fn access_context(&self, headers: &HeaderMap) -> Result<AccessContext, CrudError> {
        if self.secured() {
            return Ok(self.engine.context(headers).await?);
        }
        let principal = self.engine.principal(headers).unwrap_or_default();
        Ok(AccessContext::new(principal, Default::default()))
    }

    fn field_mask(&self, ctx: &AccessContext) -> Result<FieldMask, CrudError> {
        if !self.secured() {
            return Ok(FieldMask::default());
        }
        Ok(self.engine.decide(Operation::FieldSelect, ctx, &self.model.security, None)?.into_mask())
    }

    /// Context and mask of a secured read, after refusing queries on masked fields
    async fn checked_access(
        &self,
        headers: &HeaderMap,
        query: &ListQuery,
    ) -> Result<Option<(AccessContext, FieldMask)>, CrudError> {
        if !self.secured() {
            return Ok(None);
        }
        let ctx = self.access_context(headers).await?;
        let mask = self.field_mask(&ctx)?;
        reject_masked_fields(&mask, query.filter.as_ref(), query.sort.as_deref())?;
        Ok(Some((ctx, mask)))
    }

    fn masked(&self, mut doc: Value, mask: &FieldMask) -> Value {
        Projection::default().restrict(mask).apply(&mut doc);
        doc
    }

    /// List records visible to the caller
    pub async fn list(&self, headers: &HeaderMap, query: ListQuery) -> Result<Outcome<ListResponse>, CrudError> {
        let routes = &self.model.routes;
        let access = self.checked_access(headers, &query).await?;

        let mut filter = query.filter.unwrap_or_else(|| routes.filter.clone());
        let pagination = Pagination::resolve(
            query.page,
            query.limit.or(routes.limit),
            query.skip,
            self.pagination.default_limit,
        );
        let sort = query.sort.unwrap_or_else(|| routes.sort.clone());
        let mut projection = Projection::parse(query.select.as_deref().unwrap_or_default());

        if let Some((ctx, mask)) = &access {
            let permission = self.engine.decide(Operation::List, ctx, &self.model.security, None)?;
            filter = filter.and(permission.into_filter());
            projection = projection.restrict(mask);
        }

        let options = FindOptions { skip: pagination.skip, limit: Some(pagination.limit), sort };
        let mut data = self.store.find(&filter, &options).await?;
        for doc in &mut data {
            projection.apply(doc);
        }

        let keys = match &routes.pagination {
            PaginationMode::Global if self.pagination.enabled => Some(self.pagination.keys.clone()),
            PaginationMode::Global | PaginationMode::Disabled => None,
            PaginationMode::Keys(keys) => Some(keys.clone()),
        };

        let response = match keys {
            Some(keys) => {
                let total = self.store.count(&filter).await?;
                let page = ListPage {
                    data,
                    total,
                    last_page: pagination.last_page(total),
                    page: pagination.page,
                };
                ListResponse::Paginated { page, keys }
            }
            None => ListResponse::Bare(data),
        };
        Ok(Outcome::Ok(response))
    }

    /// Fetch one record; a record the caller may not read is reported as not found
    pub async fn get(&self, headers: &HeaderMap, id: &str, query: ListQuery) -> Result<Outcome<Value>, CrudError> {
        let routes = &self.model.routes;
        let access = self.checked_access(headers, &query).await?;

        let mut filter = query.filter.unwrap_or_else(|| routes.find_one_filter.clone());
        let select = query.select.or_else(|| routes.find_one_select.clone());
        let mut projection = Projection::parse(select.as_deref().unwrap_or_default());

        if let Some((ctx, mask)) = &access {
            let permission = self.engine.decide(Operation::Read, ctx, &self.model.security, None)?;
            filter = filter.and(permission.into_filter());
            projection = projection.restrict(mask);
        }

        match self.store.find_by_id(id, &filter).await? {
            Some(mut doc) => {
                projection.apply(&mut doc);
                Ok(Outcome::Ok(doc))
            }
            None => Ok(Outcome::NotFound),
        }
    }

    pub async fn create(&self, headers: &HeaderMap, body: Value) -> Result<Outcome<Value>, CrudError> {
        let mut body = self.prepare_body(body, self.model.create_transform.as_ref())?;
        let ctx = self.access_context(headers).await?;

        if self.secured() {
            let decision = self.engine.decide(Operation::Create, &ctx, &self.model.security, None)?;
            if let Err(e) = decision.require_grant() {
                return settle(Err(e));
            }
        }

        PermissionFields::strip_from(&mut body);
        let owners = match self.model.security.owner_seed() {
            OwnerSeed::Creator => ctx.user_id().map(str::to_string).into_iter().collect(),
            OwnerSeed::Record => vec![self.ensure_id(&mut body)],
            OwnerSeed::Nobody => Vec::new(),
        };
        PermissionFields::seeded(self.model.security.static_roles.as_ref(), &owners)
            .write_into(&mut body);

        let created = self.store.create(body).await?;
        log::debug!(
            "Created {} record {}",
            self.model.name,
            created.get(ID_FIELD).and_then(Value::as_str).unwrap_or("?")
        );
        Ok(Outcome::Ok(self.masked(created, &self.field_mask(&ctx)?)))
    }

    /// Merge the body into a record; permission fields cannot be changed this way
    pub async fn update(&self, headers: &HeaderMap, id: &str, body: Value) -> Result<Outcome<Value>, CrudError> {
        let mut changes = self.prepare_body(body, self.model.update_transform.as_ref())?;
        PermissionFields::strip_from(&mut changes);
        if let Some(obj) = changes.as_object_mut() {
            obj.remove(ID_FIELD);
        }

        let ctx = self.access_context(headers).await?;
        if self.secured() {
            let authorized = self
                .engine
                .authorize_mutation(Operation::Update, &ctx, &self.model.security, self.store.as_ref(), id)
                .await;
            let stored = match settle(authorized)? {
                Outcome::Ok(stored) => stored,
                Outcome::Denied => return Ok(Outcome::Denied),
                Outcome::NotFound => return Ok(Outcome::NotFound),
            };
            // Carry the stored lists over under their uniform names
            PermissionFields::from_document(&stored)
                .map_err(|e| StoreError::InvalidRecord(format!("malformed permission fields: {}", e)))?
                .write_into(&mut changes);
        }

        match self.store.find_one_and_update(id, changes).await? {
            Some(updated) => Ok(Outcome::Ok(self.masked(updated, &self.field_mask(&ctx)?))),
            None => Ok(Outcome::NotFound),
        }
    }

    /// Remove a record and return it
    pub async fn delete(&self, headers: &HeaderMap, id: &str) -> Result<Outcome<Value>, CrudError> {
        let ctx = self.access_context(headers).await?;
        if self.secured() {
            let authorized = self
                .engine
                .authorize_mutation(Operation::Delete, &ctx, &self.model.security, self.store.as_ref(), id)
                .await;
            match settle(authorized)? {
                Outcome::Ok(_) => {}
                Outcome::Denied => return Ok(Outcome::Denied),
                Outcome::NotFound => return Ok(Outcome::NotFound),
            }
        }

        match self.store.find_one_and_remove(id).await? {
            Some(removed) => {
                log::debug!("Deleted {} record {}", self.model.name, id);
                Ok(Outcome::Ok(self.masked(removed, &self.field_mask(&ctx)?)))
            }
            None => Ok(Outcome::NotFound),
        }
    }

    pub fn client_config(&self) -> Value {
        self.model.client_config.clone()
    }

    fn prepare_body(&self, body: Value, transform: Option<&BodyTransform>) -> Result<Value, CrudError> {
        if !body.is_object() {
            return Err(CrudError::BadRequest("body must be a JSON object".to_string()));
        }
        let body = match transform {
            Some(f) => f(body),
            None => body,
        };
        if !body.is_object() {
            return Err(CrudError::BadRequest("transform must return a JSON object".to_string()));
        }
        if let Some(validate) = &self.model.validator {
            validate(&body).map_err(CrudError::BadRequest)?;
        }
        Ok(body)
    }

    fn ensure_id(&self, body: &mut Value) -> String {
        if let Some(id) = body.get(ID_FIELD).and_then(Value::as_str).filter(|id| !id.is_empty()) {
            return id.to_string();
        }
        let id = uuid::Uuid::new_v4().to_string();
        body[ID_FIELD] = Value::String(id.clone());
        id
    }
}

/// Callers may not filter or sort on fields hidden from them
fn reject_masked_fields(
    mask: &FieldMask,
    filter: Option<&Filter>,
    sort: Option<&[SortKey]>,
) -> Result<(), CrudError> {
    if mask.is_empty() {
        return Ok(());
    }
    let filtered = filter.map(Filter::fields).unwrap_or_default();
    let sorted = sort.unwrap_or_default().iter().map(|key| key.field.as_str());
    match filtered.into_iter().chain(sorted).find(|path| mask.hides(path)) {
        Some(path) => Err(CrudError::BadRequest(format!("field '{}' cannot be queried", path))),
        None => Ok(()),
    }
}

/// Turn the refusals of an access check into outcomes, keep real failures as errors
fn settle<T>(result: Result<T, AccessError>) -> Result<Outcome<T>, CrudError> {
    match result {
        Ok(value) => Ok(Outcome::Ok(value)),
        Err(AccessError::PermissionDenied) => Ok(Outcome::Denied),
        Err(AccessError::RecordNotFound) => Ok(Outcome::NotFound),
        Err(other) => Err(other.into()),
    }
}

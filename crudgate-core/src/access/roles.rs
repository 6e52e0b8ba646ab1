//! Group role aggregation

use std::collections::BTreeSet;
use std::sync::Arc;

use super::error::AccessError;
use super::principal::Principal;
use crate::store::GroupMembershipStore;

/// Deduplicated set of role tags held by a caller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSet(BTreeSet<String>);

impl RoleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, role: &str) -> bool {
        self.0.contains(role)
    }

    /// True when at least one of `roles` is held
    pub fn intersects<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        roles.iter().any(|r| self.0.contains(r.as_ref()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for RoleSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>> Extend<S> for RoleSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.0.extend(iter.into_iter().map(Into::into));
    }
}

/// Flattens the permissions of every group a user belongs to
#[derive(Clone)]
pub struct RoleAggregator {
    groups: Arc<dyn GroupMembershipStore>,
}

impl RoleAggregator {
    pub fn new(groups: Arc<dyn GroupMembershipStore>) -> Self {
        Self { groups }
    }

    /// Union of all group permissions, empty for anonymous callers
    ///
    /// A store failure is reported as `DependencyUnavailable`, never as an empty set.
    pub async fn aggregate(&self, principal: &Principal) -> Result<RoleSet, AccessError> {
        let Some(user_id) = principal.user_id() else {
            return Ok(RoleSet::new());
        };

        let groups = self.groups.find_groups_containing_member(user_id).await.map_err(|e| {
            log::error!("Group lookup failed for user {}: {}", user_id, e);
            AccessError::DependencyUnavailable(format!("group membership store: {}", e))
        })?;

        let roles: RoleSet = groups.into_iter().flat_map(|g| g.permissions).collect();
        log::debug!("User {} holds roles {:?}", user_id, roles.0);
        Ok(roles)
    }
}

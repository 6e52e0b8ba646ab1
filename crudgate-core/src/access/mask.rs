//! Field masks and projections

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use super::roles::RoleSet;
use crate::store::ID_FIELD;

/// Fields a caller may not see
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMask(BTreeSet<String>);

impl FieldMask {
    /// Every field of `properties_roles` whose required roles the caller does not hold
    ///
    /// Fields without an entry are never masked.
    pub fn compute(properties_roles: &BTreeMap<String, Vec<String>>, roles: &RoleSet) -> Self {
        Self(
            properties_roles
                .iter()
                .filter(|(_, required)| !roles.intersects(required))
                .map(|(field, _)| field.clone())
                .collect(),
        )
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether a dotted path reads a masked field or something nested in one
    pub fn hides(&self, path: &str) -> bool {
        let top = path.split('.').next().unwrap_or(path);
        self.contains(top) || self.contains(path)
    }

    pub fn fields(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }
}

/// Caller field selection, `"title body"` or `"-secret"`
///
/// A projection with any included field is inclusive: only those fields (and
/// `id`) are returned. Excluded fields are always removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    include: BTreeSet<String>,
    exclude: BTreeSet<String>,
}

impl Projection {
    /// Parse a space or comma separated select string
    pub fn parse(select: &str) -> Self {
        let mut projection = Self::default();
        for token in select.split(|c: char| c.is_whitespace() || c == ',') {
            let token = token.trim();
            if let Some(field) = token.strip_prefix('-') {
                if !field.is_empty() {
                    projection.exclude.insert(field.to_string());
                }
            } else {
                let field = token.trim_start_matches('+');
                if !field.is_empty() {
                    projection.include.insert(field.to_string());
                }
            }
        }
        projection
    }

    /// Remove masked fields from the inclusions and add them to the exclusions
    ///
    /// An inclusive projection stays inclusive: when every requested field is
    /// masked only `id` is left.
    pub fn restrict(mut self, mask: &FieldMask) -> Self {
        let inclusive = !self.include.is_empty();
        for field in mask.fields() {
            self.include.remove(field);
            self.exclude.insert(field.clone());
        }
        if inclusive && self.include.is_empty() {
            self.include.insert(ID_FIELD.to_string());
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    pub fn is_excluded(&self, field: &str) -> bool {
        self.exclude.contains(field)
    }

    /// Apply to one JSON document in place
    pub fn apply(&self, doc: &mut Value) {
        let Some(obj) = doc.as_object_mut() else {
            return;
        };
        if !self.include.is_empty() {
            obj.retain(|key, _| key == ID_FIELD || self.include.contains(key));
        }
        for field in &self.exclude {
            obj.remove(field);
        }
    }

    /// Render back to a select string, inclusions first
    pub fn to_select_string(&self) -> String {
        self.include
            .iter()
            .cloned()
            .chain(self.exclude.iter().map(|f| format!("-{}", f)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

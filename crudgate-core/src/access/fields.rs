//! Record permission fields
//!
//! Every securable record embeds six lists: reader/writer/delete role tags and
//! reader/writer/delete owner ids. They are written at creation time and only
//! ever read by the engine.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::StaticRoles;

/// Stored field names, in declaration order
pub const PERMISSION_FIELDS: [&str; 6] = [
    "permissionReaderRoles",
    "permissionWriterRoles",
    "permissionDeleteRoles",
    "permissionReaderUserId",
    "permissionWriterUserId",
    "permissionDeleteUserId",
];

/// Older documents spell the delete owner list with a capital `ID`
const LEGACY_DELETE_OWNER_FIELD: &str = "permissionDeleteUserID";

/// Which owner/role pair a check reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessKind {
    Read,
    Write,
    Delete,
}

impl AccessKind {
    pub fn owner_field(self) -> &'static str {
        match self {
            AccessKind::Read => "permissionReaderUserId",
            AccessKind::Write => "permissionWriterUserId",
            AccessKind::Delete => "permissionDeleteUserId",
        }
    }

    pub fn role_field(self) -> &'static str {
        match self {
            AccessKind::Read => "permissionReaderRoles",
            AccessKind::Write => "permissionWriterRoles",
            AccessKind::Delete => "permissionDeleteRoles",
        }
    }
}

/// Who lands in the owner-id lists when a record is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerSeed {
    /// The creating user
    Creator,
    /// The new record's own id (user documents that own themselves)
    Record,
    /// Nobody; access comes from roles only
    Nobody,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PermissionFields {
    pub permission_reader_roles: Vec<String>,
    pub permission_writer_roles: Vec<String>,
    pub permission_delete_roles: Vec<String>,
    pub permission_reader_user_id: Vec<String>,
    pub permission_writer_user_id: Vec<String>,
    #[serde(alias = "permissionDeleteUserID")]
    pub permission_delete_user_id: Vec<String>,
}

impl PermissionFields {
    /// Read the permission lists out of a stored document
    ///
    /// Missing lists are empty; non-permission fields are ignored.
    pub fn from_document(doc: &Value) -> Result<Self, serde_json::Error> {
        let Some(obj) = doc.as_object() else {
            return Ok(Self::default());
        };
        let mut fields = Self::default();
        for (key, value) in obj {
            if !PERMISSION_FIELDS.contains(&key.as_str()) && key != LEGACY_DELETE_OWNER_FIELD {
                continue;
            }
            let list: Vec<String> = serde_json::from_value(value.clone())?;
            match key.as_str() {
                "permissionReaderRoles" => fields.permission_reader_roles = list,
                "permissionWriterRoles" => fields.permission_writer_roles = list,
                "permissionDeleteRoles" => fields.permission_delete_roles = list,
                "permissionReaderUserId" => fields.permission_reader_user_id = list,
                "permissionWriterUserId" => fields.permission_writer_user_id = list,
                // The uniform spelling wins over the legacy one
                "permissionDeleteUserId" => fields.permission_delete_user_id = list,
                _ if fields.permission_delete_user_id.is_empty() => {
                    fields.permission_delete_user_id = list
                }
                _ => {}
            }
        }
        Ok(fields)
    }

    /// Seed the lists for a record about to be created
    pub fn seeded(static_roles: Option<&StaticRoles>, owners: &[String]) -> Self {
        let mut fields = Self::default();
        if let Some(roles) = static_roles {
            fields.permission_reader_roles = dedup(&roles.read_roles);
            fields.permission_writer_roles = dedup(&roles.write_roles);
            fields.permission_delete_roles = dedup(&roles.delete_roles);
        }
        let owners = dedup(owners);
        fields.permission_reader_user_id = owners.clone();
        fields.permission_writer_user_id = owners.clone();
        fields.permission_delete_user_id = owners;
        fields
    }

    pub fn owners(&self, kind: AccessKind) -> &[String] {
        match kind {
            AccessKind::Read => &self.permission_reader_user_id,
            AccessKind::Write => &self.permission_writer_user_id,
            AccessKind::Delete => &self.permission_delete_user_id,
        }
    }

    pub fn roles(&self, kind: AccessKind) -> &[String] {
        match kind {
            AccessKind::Read => &self.permission_reader_roles,
            AccessKind::Write => &self.permission_writer_roles,
            AccessKind::Delete => &self.permission_delete_roles,
        }
    }

    /// Remove every permission list (legacy spelling included) from a document
    pub fn strip_from(doc: &mut Value) {
        if let Some(obj) = doc.as_object_mut() {
            for field in PERMISSION_FIELDS {
                obj.remove(field);
            }
            obj.remove(LEGACY_DELETE_OWNER_FIELD);
        }
    }

    /// Write the lists into a document under their uniform names
    pub fn write_into(&self, doc: &mut Value) {
        let Some(obj) = doc.as_object_mut() else {
            return;
        };
        obj.remove(LEGACY_DELETE_OWNER_FIELD);
        for kind in [AccessKind::Read, AccessKind::Write, AccessKind::Delete] {
            obj.insert(kind.role_field().to_string(), Value::from(self.roles(kind).to_vec()));
            obj.insert(kind.owner_field().to_string(), Value::from(self.owners(kind).to_vec()));
        }
    }
}

fn dedup(values: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for v in values {
        if !out.contains(v) {
            out.push(v.clone());
        }
    }
    out
}

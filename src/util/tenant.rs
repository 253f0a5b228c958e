//! Explicit tenant context.
//!
//! Workers never see ambient per-request state. A caller that needs the
//! tenant inside an operation captures a `TenantContext` in the task's
//! arguments when it builds the task.

use serde::{Deserialize, Serialize};

/// Tenant key used when no tenant is given.
pub const DEFAULT_TENANT: &str = "default";

/// Normalise a tenant identifier into a cache/storage key.
#[must_use]
pub fn normalize_tenant_key(tenant_id: Option<&str>) -> String {
    let value = tenant_id.map(|t| t.trim().to_lowercase()).unwrap_or_default();
    if value.is_empty() {
        DEFAULT_TENANT.to_owned()
    } else {
        value
    }
}

/// Tenant identity propagated explicitly into task arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantContext {
    /// Normalised tenant key.
    pub tenant_id: String,
}

impl TenantContext {
    /// Build a context, normalising the identifier.
    #[must_use]
    pub fn new(tenant_id: &str) -> Self {
        Self {
            tenant_id: normalize_tenant_key(Some(tenant_id)),
        }
    }

    /// Prefix `key` with the tenant so entries of different tenants never collide.
    #[must_use]
    pub fn scoped_key(&self, key: &str) -> String {
        format!("{}:{key}", self.tenant_id)
    }
}

impl Default for TenantContext {
    fn default() -> Self {
        Self {
            tenant_id: DEFAULT_TENANT.to_owned(),
        }
    }
}

//! Transaction-scoped security context.

use crate::ids::{TenantId, UserId};
use serde::{Deserialize, Serialize};

/// Security context for a single database transaction.
///
/// Never persisted; exists only for the lifetime of one transaction.
/// Row-filtering policies consult the tenant and user ids, and must
/// special-case the system identity (`tenant_id = 0, user_id = 0`) so
/// that webhooks and maintenance jobs are not blocked by per-tenant
/// filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantContext {
    pub tenant_id: TenantId,
    pub user_id: UserId,
}

impl TenantContext {
    /// The reserved system identity.
    pub const SYSTEM: Self = Self {
        tenant_id: TenantId::SYSTEM,
        user_id: UserId::SYSTEM,
    };

    /// Creates a context for a tenant and user.
    #[must_use]
    pub const fn new(tenant_id: TenantId, user_id: UserId) -> Self {
        Self { tenant_id, user_id }
    }

    /// Returns true if this context is the reserved system identity.
    ///
    /// Both ids must be zero; a context mixing a real tenant with the
    /// system user (or vice versa) is not the system identity.
    #[must_use]
    pub const fn is_system(&self) -> bool {
        self.tenant_id.is_system() && self.user_id.is_system()
    }
}

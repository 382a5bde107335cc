//! Shared identifier types for the tessera platform core.
//!
//! Tenant and user identifiers are plain integers in the external
//! contract; id `0` is reserved for the system identity used by
//! webhooks and maintenance jobs.

mod context;
mod ids;

pub use context::TenantContext;
pub use ids::{IdParseError, TenantId, UserId};

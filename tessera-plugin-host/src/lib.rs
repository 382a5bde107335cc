//! Plugin trust boundary for the tessera platform.
//!
//! Decides, at boot and at call time, exactly which privileged
//! operations each plugin may perform; isolates one plugin's boot
//! failure from the rest of the system; and enforces namespace
//! discipline for abilities, resource types, and route prefixes.
//!
//! Plugins run in-process. The capability checks here are the trust
//! boundary, not a memory sandbox: a plugin is trusted to respect the
//! checks, and a plugin that fails them is quarantined, not contained.
//!
//! The one deliberately asymmetric failure mode: a plugin whose
//! recorded database schema version does not match what its code
//! expects is fatal to the whole process, because serving traffic
//! against an incompatible schema risks data corruption.

mod abilities;
mod boot;
pub mod capabilities;
mod error;
mod loader;
mod manifest;
mod resources;
pub mod routes;

pub use abilities::{AbilityDefinition, AbilityRegistry};
pub use boot::{BootOrchestrator, BootReport, PluginRecord, PluginStatus, abort_for_schema_mismatch};
pub use capabilities::{Capability, CapabilityCheck, CapabilityGrantDecision, Tier};
pub use error::{BootPhase, PluginHostError};
pub use loader::{PluginLoader, PluginModule, StaticLoader};
pub use manifest::{PluginManifest, RequestedCapability};
pub use resources::{ResourceMeta, ResourceProvider, ResourceProviderRegistry, ResourceTypeDefinition};
pub use routes::RouteTable;

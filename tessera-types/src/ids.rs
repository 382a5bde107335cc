//! Identifier newtypes used throughout the tessera core.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when parsing an identifier from a string.
#[derive(Debug, Error)]
#[error("invalid identifier: {0}")]
pub struct IdParseError(#[from] std::num::ParseIntError);

/// Unique identifier for a tenant.
///
/// Id `0` is reserved for the system identity and is never assigned
/// to a real tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(i64);

impl TenantId {
    /// The reserved system tenant (id 0).
    pub const SYSTEM: Self = Self(0);

    /// Creates a tenant ID from a raw integer.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the underlying integer.
    #[must_use]
    pub const fn get(&self) -> i64 {
        self.0
    }

    /// Returns true if this is the reserved system tenant.
    #[must_use]
    pub const fn is_system(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TenantId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Unique identifier for a user within a tenant.
///
/// Id `0` is reserved for the system identity used by operations with
/// no human actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// The reserved system user (id 0).
    pub const SYSTEM: Self = Self(0);

    /// Creates a user ID from a raw integer.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the underlying integer.
    #[must_use]
    pub const fn get(&self) -> i64 {
        self.0
    }

    /// Returns true if this is the reserved system user.
    #[must_use]
    pub const fn is_system(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

//! License activation and validation engine.
//!
//! [`validator`] decides, [`binding`] resolves device slots inside a storage
//! unit, and [`Coordinator`] is the only code path that mutates licenses or
//! binds devices.

pub mod binding;
pub mod coordinator;
pub mod validator;

pub use coordinator::{Activate, Activated, Check, Coordinator, DeviceInfo, Validation};
pub use validator::{Probe, Verdict};

/// Stable failure codes surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reason {
  InvalidKey,
  Inactive,
  Expired,
  UsageLimitExceeded,
  InternalError,
}

impl Reason {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::InvalidKey => "INVALID_KEY",
      Self::Inactive => "INACTIVE",
      Self::Expired => "EXPIRED",
      Self::UsageLimitExceeded => "USAGE_LIMIT_EXCEEDED",
      Self::InternalError => "INTERNAL_ERROR",
    }
  }

  pub fn message(self) -> &'static str {
    match self {
      Self::InvalidKey => "License key not found",
      Self::Inactive => "License is deactivated",
      Self::Expired => "License has expired",
      Self::UsageLimitExceeded => "No device slots left on this license",
      Self::InternalError => "Temporary failure, please retry",
    }
  }
}

use crate::{engine::Reason, entity::license, prelude::*};

/// What is known about the requesting device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
  /// No device in the request, usage is not checked.
  Omitted,
  /// Device already holds a slot on this license.
  Bound,
  /// Device would need a fresh slot.
  Unbound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
  Valid,
  Invalid(Reason),
}

impl Verdict {
  pub fn is_valid(self) -> bool {
    self == Self::Valid
  }

  pub fn reason(self) -> Option<Reason> {
    match self {
      Self::Valid => None,
      Self::Invalid(reason) => Some(reason),
    }
  }

  pub fn check(self) -> Result<(), Reason> {
    match self {
      Self::Valid => Ok(()),
      Self::Invalid(reason) => Err(reason),
    }
  }
}

/// Checks run in order and stop at the first failure. Pure: no storage, no
/// clock, no mutation.
pub fn validate(
  license: Option<&license::Model>,
  probe: Probe,
  now: DateTime,
) -> Verdict {
  let Some(license) = license else {
    return Verdict::Invalid(Reason::InvalidKey);
  };

  if !license.active {
    return Verdict::Invalid(Reason::Inactive);
  }

  if license.is_expired(now) {
    return Verdict::Invalid(Reason::Expired);
  }

  if probe == Probe::Unbound && !license.has_free_slot() {
    return Verdict::Invalid(Reason::UsageLimitExceeded);
  }

  Verdict::Valid
}

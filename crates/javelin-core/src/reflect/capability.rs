//! Access-bypass capability

use super::AccessError;
use std::fmt;
use std::sync::Arc;

/// Permission to ignore field visibility and `final`
///
/// Only [`Runtime::grant_access_bypass`](crate::Runtime::grant_access_bypass) can mint a
/// token, and only when the runtime's options allow it. Every grant is logged with its
/// reason. A token is bound to the runtime that minted it and is refused by any other.
#[derive(Clone)]
pub struct AccessBypass {
    reason: Arc<str>,
    runtime: u64,
}

impl AccessBypass {
    pub(crate) fn new(reason: Arc<str>, runtime: u64) -> Self {
        Self { reason, runtime }
    }

    /// Reason given when the token was granted
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Check that the token was minted by runtime `runtime`
    pub(crate) fn verify(&self, runtime: u64) -> Result<(), AccessError> {
        if self.runtime == runtime {
            Ok(())
        } else {
            Err(AccessError::BypassDenied)
        }
    }
}

impl fmt::Debug for AccessBypass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessBypass({:?})", self.reason)
    }
}

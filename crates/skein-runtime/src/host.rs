//! Interactive host notifications.

#![allow(missing_docs)]

use crate::outcome::ReturnCode;

/// Receives the status lines a debugger writes for the person at the console.
pub trait InteractiveHost: Send + Sync {
    fn write_result_line(&self, code: ReturnCode, text: &str);
}

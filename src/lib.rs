#![doc(test(attr(deny(warnings))))]

//! Cancel / Withdrawal request form.
//!
//! Collects a student cancellation or withdrawal, validates it with rules
//! that depend on the request type, resolves the CDOA to DSM mapping and the
//! advisor's user id, then creates an item on the destination list.

pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod errors;
pub mod sharepoint;
pub mod utils;

use std::sync::Once;

pub use crate::core::{FormController, FormPhase, FormSettings, SubmitOutcome};
pub use crate::errors::{FormError, Result};

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup debug log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::debug!("cw_form tracing initialized.");
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_does_not_panic() {
        super::init();
        super::init();
    }
}

//! Typed error conditions.
//!
//! Everything else travels as a plain [`anyhow::Error`]. A missing anchor
//! entity is returned as [`NotFound`] wrapped in `anyhow`, so callers can
//! tell it apart with `err.downcast_ref::<NotFound>()`.

use thiserror::Error;

/// The requested anchor entity does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} not found: {id}")]
pub struct NotFound {
    pub kind: &'static str,
    pub id: String,
}

impl NotFound {
    pub fn chapter(id: &str) -> Self {
        Self {
            kind: "chapter",
            id: id.to_string(),
        }
    }

    pub fn character(id: &str) -> Self {
        Self {
            kind: "character",
            id: id.to_string(),
        }
    }
}

/// Returns true if `err` carries a [`NotFound`].
pub fn is_not_found(err: &anyhow::Error) -> bool {
    err.downcast_ref::<NotFound>().is_some()
}

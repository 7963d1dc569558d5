//! Error types and result alias for the crate.
//!
//! This module defines [`enum@crate::error::Error`] and the crate-wide [Result] alias. Variants cover
//! invalid configuration and malformed host meshes. Mesh errors are
//! recovered inside an analysis pass and never surface to the host as a failed pass.
use thiserror::Error;

use crate::geometry::MeshId;

pub type Result<T> = std::result::Result<T, Error>;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid mesh '{id}': {reason}")]
    InvalidMesh { id: MeshId, reason: String },
}

impl Error {
    pub(crate) fn invalid_mesh(id: &str, reason: impl Into<String>) -> Self {
        Error::InvalidMesh {
            id: id.to_owned(),
            reason: reason.into(),
        }
    }
}

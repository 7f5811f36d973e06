use thiserror::Error;

use crate::{
    class::ClassId,
    migration::Direction,
    version_tag::{VersionTag, VersionTagError},
};

/// Error type returned by user migration methods.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while reading migration metadata or converting objects.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Class \"{0}\" is not versioned")]
    NotVersioned(ClassId),

    #[error("Class \"{class}\" declares a malformed version tag: {source}")]
    MalformedVersion {
        class: ClassId,
        #[source]
        source: VersionTagError,
    },

    #[error("Method \"{method}\" in \"{class}\" {reason}")]
    InvalidSignature {
        class: ClassId,
        method: String,
        reason: String,
    },

    #[error("Method \"{method}\" in \"{class}\" should have a migration {direction} a different class")]
    SelfMigration {
        class: ClassId,
        method: String,
        direction: Direction,
    },

    #[error("Class \"{class}\" declares more than one migration {direction} version {version}")]
    DuplicateMigration {
        class: ClassId,
        direction: Direction,
        version: VersionTag,
    },

    #[error("Version {version} is declared by both \"{first}\" and \"{second}\"")]
    VersionConflict {
        version: VersionTag,
        first: ClassId,
        second: ClassId,
    },

    #[error("No migration path found from {from} to {to}")]
    NoRoute { from: VersionTag, to: VersionTag },

    #[error("Expected an instance of \"{expected}\", got \"{found}\"")]
    TypeMismatch { expected: ClassId, found: ClassId },

    #[error("Migration \"{method}\" failed: {source}")]
    ActionFailed {
        method: String,
        #[source]
        source: BoxError,
    },
}

impl MigrationError {
    /// True for errors that indicate a misconfigured schema rather than a
    /// request that simply cannot be served.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            MigrationError::NotVersioned(_)
                | MigrationError::MalformedVersion { .. }
                | MigrationError::InvalidSignature { .. }
                | MigrationError::SelfMigration { .. }
                | MigrationError::DuplicateMigration { .. }
                | MigrationError::VersionConflict { .. }
        )
    }

    pub fn is_no_route(&self) -> bool {
        matches!(self, MigrationError::NoRoute { .. })
    }
}

pub type Result<T> = std::result::Result<T, MigrationError>;

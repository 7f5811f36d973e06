// Versioned object migration engine
pub mod catalog;
pub mod class;
pub mod config;
pub mod converter;
pub mod engine;
pub mod error;
pub mod graph;
pub mod metadata;
pub mod migration;
pub mod options;
pub mod registry;
pub mod reporter;
pub mod validation;
pub mod version_tag;

// Re-export core types for convenience
pub use class::{ClassId, Object};
pub use config::ConverterConfig;
pub use converter::VersionConverter;
pub use engine::{AppliedMigration, ConversionResult, MigrationEngine};
pub use error::{BoxError, MigrationError, Result};
pub use graph::{ConversionPath, VersionGraph};
pub use metadata::{MetadataProvider, StaticMetadata, Versioned};
pub use migration::{Direction, MethodKind, MethodSignature, MigrationAction, MigrationDeclaration, MigrationEdge, MigrationMethods};
pub use options::Options;
pub use registry::MigrationRegistry;
pub use reporter::{ConversionReport, ConversionReporter, ReportFormat};
pub use validation::{ValidationError, ValidationReport, ValidationWarning};
pub use version_tag::VersionTag;

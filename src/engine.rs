use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;

use crate::{
    class::{ClassId, Object},
    error::{MigrationError, Result},
    graph::ConversionPath,
    migration::Direction,
    options::Options,
    registry::MigrationRegistry,
    version_tag::VersionTag,
};

/// Finds and runs conversion chains between object versions.
#[derive(Debug, Clone)]
pub struct MigrationEngine {
    registry: Arc<MigrationRegistry>,
}

/// Outcome of a conversion together with the steps that produced it.
#[derive(Debug)]
pub struct ConversionResult {
    pub object: Object,
    pub source_version: VersionTag,
    pub target_version: VersionTag,
    pub applied_migrations: Vec<AppliedMigration>,
}

/// One executed step of a conversion chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedMigration {
    pub method: String,
    pub direction: Direction,
    pub source_version: VersionTag,
    pub target_version: VersionTag,
}

impl MigrationEngine {
    pub fn new(registry: Arc<MigrationRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &MigrationRegistry {
        &self.registry
    }

    pub fn version_of(&self, object: &Object) -> Result<VersionTag> {
        self.registry.version_of(object.class())
    }

    /// Shortest chain from `from` to `to`; a version leads to itself in zero steps.
    ///
    /// An endpoint whose class fails to load reports that failure. Broken
    /// classes elsewhere in the registry are simply not routed through.
    pub fn find_path(&self, from: &VersionTag, to: &VersionTag) -> Result<ConversionPath> {
        if from == to {
            return Ok(ConversionPath::identity(from.clone()));
        }

        let graph = self.registry.graph()?;
        for version in [from, to] {
            if let Some(class) = graph.class_of(version) {
                self.registry.migration_methods_of(class)?;
            }
        }

        let path = graph.find_path(from, to)?;
        tracing::debug!(from = %from, to = %to, steps = path.len(), "resolved conversion path");
        Ok(path)
    }

    /// Steps that would turn an instance of `class` into `target`, without running them.
    pub fn plan(&self, class: ClassId, target: &VersionTag) -> Result<ConversionPath> {
        let source = self.registry.version_of(class)?;
        self.find_path(&source, target)
    }

    /// Versions an instance of `class` can be converted to, nearest first.
    pub fn output_versions(&self, class: ClassId) -> Result<Vec<VersionTag>> {
        let source = self.registry.version_of(class)?;
        self.registry.migration_methods_of(class)?;
        Ok(self.registry.graph()?.reachable_from(&source))
    }

    /// Converts `object` into `target`.
    ///
    /// An object already at `target` is handed back as is: same allocation,
    /// no migration invoked. Otherwise every step of the shortest chain runs
    /// in order with the same `options`; the first failure aborts the chain.
    pub fn convert(&self, object: Object, target: &VersionTag, options: &Options) -> Result<Object> {
        self.convert_with_report(object, target, options)
            .map(|result| result.object)
    }

    pub fn convert_with_report(
        &self,
        object: Object,
        target: &VersionTag,
        options: &Options,
    ) -> Result<ConversionResult> {
        let source_version = self.version_of(&object)?;
        if &source_version == target {
            return Ok(ConversionResult {
                object,
                source_version: target.clone(),
                target_version: target.clone(),
                applied_migrations: Vec::new(),
            });
        }

        let path = self.find_path(&source_version, target)?;
        let mut applied_migrations = Vec::with_capacity(path.len());
        let mut current = object;

        for edge in path.iter() {
            current = edge.apply(&current, options)?;
            tracing::trace!(method = edge.method(), from = %edge.source, to = %edge.target, "applied migration");
            applied_migrations.push(AppliedMigration {
                method: edge.method().to_string(),
                direction: edge.direction,
                source_version: edge.source.clone(),
                target_version: edge.target.clone(),
            });
        }

        Ok(ConversionResult {
            object: current,
            source_version,
            target_version: target.clone(),
            applied_migrations,
        })
    }

    /// Converts `object` into `T`'s version and unwraps it.
    pub fn convert_into<T: Any + Send + Sync>(&self, object: Object, options: &Options) -> Result<T> {
        let target = self.registry.version_of_type::<T>()?;
        let converted = self.convert(object, &target, options)?;

        converted.downcast::<T>().map_err(|object| MigrationError::TypeMismatch {
            expected: ClassId::of::<T>(),
            found: object.class(),
        })
    }
}

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::any::Any;
use std::collections::HashSet;
use std::sync::Arc;

use crate::{
    class::ClassId,
    error::{MigrationError, Result},
    graph::VersionGraph,
    metadata::MetadataProvider,
    migration::{Direction, MigrationAction, MigrationEdge, MigrationMethods},
    validation::{check_declaration, ValidationError, ValidationReport, ValidationWarning, ValidationWarningType},
    version_tag::VersionTag,
};

/// Registry that caches class versions and validated migration methods.
///
/// Entries are computed lazily from the metadata provider on first lookup
/// and never change afterwards. Concurrent first lookups may compute the
/// same entry twice; only the first stored value is kept and returned.
pub struct MigrationRegistry {
    provider: Arc<dyn MetadataProvider>,
    versions: DashMap<ClassId, VersionTag>,
    methods: DashMap<ClassId, Arc<MigrationMethods>>,
    graph: OnceCell<Arc<VersionGraph>>,
}

impl MigrationRegistry {
    pub fn new(provider: impl MetadataProvider + 'static) -> Self {
        Self::with_provider(Arc::new(provider))
    }

    pub fn with_provider(provider: Arc<dyn MetadataProvider>) -> Self {
        Self {
            provider,
            versions: DashMap::new(),
            methods: DashMap::new(),
            graph: OnceCell::new(),
        }
    }

    pub fn known_classes(&self) -> Vec<ClassId> {
        self.provider.classes()
    }

    /// Version tag of `class`. A tag that would not survive `parse` is
    /// rejected the same way as a missing one.
    pub fn version_of(&self, class: ClassId) -> Result<VersionTag> {
        if let Some(version) = self.versions.get(&class) {
            return Ok(version.clone());
        }

        let version = self
            .provider
            .version_tag_for(class)
            .ok_or(MigrationError::NotVersioned(class))?;
        version
            .check()
            .map_err(|source| MigrationError::MalformedVersion { class, source })?;

        let stored = self.versions.entry(class).or_insert(version).clone();
        tracing::debug!(class = %class, version = %stored, "cached class version");
        Ok(stored)
    }

    pub fn version_of_type<T: Any>(&self) -> Result<VersionTag> {
        self.version_of(ClassId::of::<T>())
    }

    /// Validated migrations of `class`, keyed by neighbouring version.
    ///
    /// A class with a malformed declaration is never cached, so every lookup
    /// keeps failing with the same error.
    pub fn migration_methods_of(&self, class: ClassId) -> Result<Arc<MigrationMethods>> {
        if let Some(methods) = self.methods.get(&class) {
            return Ok(Arc::clone(&methods));
        }

        let methods = Arc::new(self.read_migration_methods(class)?);
        let stored = Arc::clone(&self.methods.entry(class).or_insert(methods));
        tracing::debug!(class = %class, migrations = stored.len(), "cached migration methods");
        Ok(stored)
    }

    /// Graph over every class the provider knows, built on first use.
    pub fn graph(&self) -> Result<Arc<VersionGraph>> {
        self.graph
            .get_or_try_init(|| self.build_graph().map(Arc::new))
            .map(Arc::clone)
    }

    pub fn class_for_version(&self, version: &VersionTag) -> Result<Option<ClassId>> {
        Ok(self.graph()?.class_of(version))
    }

    /// Reads every known class and collects all problems instead of stopping
    /// at the first one.
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::new();
        let mut broken = HashSet::new();
        let classes = self.known_classes();
        report.checked_classes = classes.len();

        let graph = self
            .assemble_graph(&classes, |class, error| {
                tracing::warn!(class = %class, error = %error, "class failed validation");
                report.add_error(ValidationError::new(class, &error));
                broken.insert(class);
                Ok(())
            })
            .unwrap_or_default();

        for class in classes {
            if broken.contains(&class) {
                continue;
            }
            let Ok(version) = self.version_of(class) else {
                continue;
            };
            if graph.is_isolated(&version) {
                report.add_warning(ValidationWarning::new(
                    class,
                    ValidationWarningType::IsolatedVersion,
                    format!("Version {} of \"{}\" has no migrations to or from it", version, class),
                ));
            }
        }

        report
    }

    fn read_migration_methods(&self, class: ClassId) -> Result<MigrationMethods> {
        let own_version = self.version_of(class)?;
        let mut methods = MigrationMethods::new();

        for declaration in self.provider.migration_declarations_for(class) {
            check_declaration(class, &declaration)?;

            let neighbor_version = self.version_of(declaration.neighbor)?;
            if neighbor_version == own_version {
                return Err(MigrationError::SelfMigration {
                    class,
                    method: declaration.name().to_string(),
                    direction: declaration.direction,
                });
            }

            let method = declaration.name().to_string();
            let edge = match declaration.direction {
                Direction::From => MigrationEdge {
                    source: neighbor_version.clone(),
                    target: own_version.clone(),
                    source_class: declaration.neighbor,
                    target_class: class,
                    direction: Direction::From,
                    action: MigrationAction::Construct {
                        method,
                        factory: declaration.callable(),
                    },
                },
                Direction::To => MigrationEdge {
                    source: own_version.clone(),
                    target: neighbor_version.clone(),
                    source_class: class,
                    target_class: declaration.neighbor,
                    direction: Direction::To,
                    action: MigrationAction::Convert {
                        method,
                        conversion: declaration.callable(),
                    },
                },
            };

            let slot = match declaration.direction {
                Direction::From => &mut methods.from,
                Direction::To => &mut methods.to,
            };
            if slot.contains_key(&neighbor_version) {
                return Err(MigrationError::DuplicateMigration {
                    class,
                    direction: declaration.direction,
                    version: neighbor_version,
                });
            }
            slot.insert(neighbor_version, edge);
        }

        Ok(methods)
    }

    /// Graph over the healthy classes. A class that fails to load gets no
    /// edges in or out; only a version claimed twice is fatal.
    fn build_graph(&self) -> Result<VersionGraph> {
        let graph = self.assemble_graph(&self.known_classes(), |class, error| {
            if matches!(error, MigrationError::VersionConflict { .. }) {
                return Err(error);
            }
            tracing::warn!(class = %class, error = %error, "left class out of the version graph");
            Ok(())
        })?;

        tracing::debug!(
            versions = graph.versions().count(),
            edges = graph.edges().count(),
            "built version graph"
        );
        Ok(graph)
    }

    /// Adds every class that loads cleanly and the edges between them.
    /// Failures go to `on_broken`, which decides whether to abort.
    fn assemble_graph<F>(&self, classes: &[ClassId], mut on_broken: F) -> Result<VersionGraph>
    where
        F: FnMut(ClassId, MigrationError) -> Result<()>,
    {
        let mut graph = VersionGraph::new();
        let mut broken = HashSet::new();
        let mut loaded = Vec::new();

        for &class in classes {
            let methods = self
                .version_of(class)
                .and_then(|version| graph.add_class(class, version))
                .and_then(|()| self.migration_methods_of(class));

            match methods {
                Ok(methods) => loaded.push(methods),
                Err(error) => {
                    broken.insert(class);
                    on_broken(class, error)?;
                }
            }
        }

        for methods in &loaded {
            for edge in methods.edges() {
                if broken.contains(&edge.source_class) || broken.contains(&edge.target_class) {
                    continue;
                }
                if let Err(error) = graph.add_edge(edge.clone()) {
                    on_broken(edge.source_class, error)?;
                }
            }
        }

        Ok(graph)
    }
}

impl std::fmt::Debug for MigrationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationRegistry")
            .field("cached_versions", &self.versions.len())
            .field("cached_methods", &self.methods.len())
            .field("graph_built", &self.graph.get().is_some())
            .finish()
    }
}

use indexmap::IndexMap;
use std::any::Any;

use crate::{class::ClassId, migration::MigrationDeclaration, version_tag::VersionTag};

/// Source of resolved class metadata.
///
/// Implementations decide how versions and migrations are declared; the
/// registry only consumes what they resolve to.
pub trait MetadataProvider: Send + Sync {
    /// Every class the provider knows about, in registration order.
    fn classes(&self) -> Vec<ClassId>;

    /// Version tag declared by `class`, if any.
    fn version_tag_for(&self, class: ClassId) -> Option<VersionTag>;

    /// Migration methods declared on `class`, in declaration order.
    fn migration_declarations_for(&self, class: ClassId) -> Vec<MigrationDeclaration>;
}

/// Compile-time version metadata for a data class.
pub trait Versioned: Any + Send + Sync + Sized {
    const VERSION: &'static str;

    fn migrations() -> Vec<MigrationDeclaration> {
        Vec::new()
    }
}

#[derive(Debug, Default)]
struct ClassEntry {
    version: Option<VersionTag>,
    migrations: Vec<MigrationDeclaration>,
}

/// Metadata provider backed by an explicit registration table.
#[derive(Debug, Default)]
pub struct StaticMetadata {
    classes: IndexMap<ClassId, ClassEntry>,
}

impl StaticMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a class together with everything its `Versioned` impl declares.
    pub fn register<T: Versioned>(mut self) -> Self {
        let entry = self.entry(ClassId::of::<T>());
        entry.version = Some(VersionTag::new(T::VERSION));
        entry.migrations.extend(T::migrations());
        self
    }

    pub fn class<T: Any>(mut self, version: impl Into<VersionTag>) -> Self {
        self.entry(ClassId::of::<T>()).version = Some(version.into());
        self
    }

    /// Registers a class that carries no version tag.
    pub fn unversioned<T: Any>(mut self) -> Self {
        self.entry(ClassId::of::<T>());
        self
    }

    /// Attaches a migration to the class that declares it.
    pub fn migration(mut self, declaration: MigrationDeclaration) -> Self {
        self.entry(declaration.owner).migrations.push(declaration);
        self
    }

    fn entry(&mut self, class: ClassId) -> &mut ClassEntry {
        self.classes.entry(class).or_default()
    }
}

impl MetadataProvider for StaticMetadata {
    fn classes(&self) -> Vec<ClassId> {
        self.classes.keys().copied().collect()
    }

    fn version_tag_for(&self, class: ClassId) -> Option<VersionTag> {
        self.classes.get(&class).and_then(|entry| entry.version.clone())
    }

    fn migration_declarations_for(&self, class: ClassId) -> Vec<MigrationDeclaration> {
        self.classes
            .get(&class)
            .map(|entry| entry.migrations.clone())
            .unwrap_or_default()
    }
}

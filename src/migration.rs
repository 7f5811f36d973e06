use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::{
    class::{ClassId, Object},
    error::{BoxError, MigrationError},
    options::Options,
    version_tag::VersionTag,
};

/// Type-erased migration logic: reads the current instance, returns the next one.
pub type MigrationFn = Arc<dyn Fn(&Object, &Options) -> Result<Object, BoxError> + Send + Sync>;

/// Which side of the declaring class a migration sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Builds the declaring class from another version.
    From,
    /// Converts the declaring class into another version.
    To,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::From => f.write_str("from"),
            Direction::To => f.write_str("to"),
        }
    }
}

/// How a migration method is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MethodKind {
    /// Callable without an instance of the declaring class.
    Factory,
    /// Bound to an existing instance of the declaring class.
    Instance,
}

/// Declared shape of a migration method, checked before it becomes an edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    pub name: String,
    pub kind: MethodKind,
    /// Explicit parameters, not counting the receiver.
    pub parameters: usize,
    /// Class of the value the method returns.
    pub returns: ClassId,
}

/// A migration method as handed over by a metadata provider.
#[derive(Clone)]
pub struct MigrationDeclaration {
    pub owner: ClassId,
    pub direction: Direction,
    pub neighbor: ClassId,
    pub signature: MethodSignature,
    callable: MigrationFn,
}

impl MigrationDeclaration {
    /// Declares a factory on `T` that builds it from an instance of `S`.
    pub fn from<S, T, F>(name: &str, migrate: F) -> Self
    where
        S: Any + Send + Sync,
        T: Any + Send + Sync,
        F: Fn(&S, &Options) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self {
            owner: ClassId::of::<T>(),
            direction: Direction::From,
            neighbor: ClassId::of::<S>(),
            signature: MethodSignature {
                name: name.to_string(),
                kind: MethodKind::Factory,
                parameters: 2,
                returns: ClassId::of::<T>(),
            },
            callable: erase(migrate),
        }
    }

    /// Declares a conversion on `S` that turns an instance into `T`.
    pub fn to<S, T, F>(name: &str, migrate: F) -> Self
    where
        S: Any + Send + Sync,
        T: Any + Send + Sync,
        F: Fn(&S, &Options) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self {
            owner: ClassId::of::<S>(),
            direction: Direction::To,
            neighbor: ClassId::of::<T>(),
            signature: MethodSignature {
                name: name.to_string(),
                kind: MethodKind::Instance,
                parameters: 1,
                returns: ClassId::of::<T>(),
            },
            callable: erase(migrate),
        }
    }

    /// Builds a declaration from a signature resolved by some other discovery
    /// mechanism. The shape is only checked when the owner's metadata is read.
    pub fn raw(
        owner: ClassId,
        direction: Direction,
        neighbor: ClassId,
        signature: MethodSignature,
        callable: MigrationFn,
    ) -> Self {
        Self {
            owner,
            direction,
            neighbor,
            signature,
            callable,
        }
    }

    pub fn name(&self) -> &str {
        &self.signature.name
    }

    pub(crate) fn callable(&self) -> MigrationFn {
        Arc::clone(&self.callable)
    }
}

impl fmt::Debug for MigrationDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationDeclaration")
            .field("owner", &self.owner)
            .field("direction", &self.direction)
            .field("neighbor", &self.neighbor)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

fn erase<S, T, F>(migrate: F) -> MigrationFn
where
    S: Any + Send + Sync,
    T: Any + Send + Sync,
    F: Fn(&S, &Options) -> Result<T, BoxError> + Send + Sync + 'static,
{
    Arc::new(move |current: &Object, options: &Options| -> Result<Object, BoxError> {
        let source = current.downcast_ref::<S>().ok_or_else(|| MigrationError::TypeMismatch {
            expected: ClassId::of::<S>(),
            found: current.class(),
        })?;
        migrate(source, options).map(Object::new)
    })
}

/// Executable step of a conversion chain.
#[derive(Clone)]
pub enum MigrationAction {
    /// Factory on the destination class, fed with the current instance.
    Construct { method: String, factory: MigrationFn },
    /// Conversion bound to the current instance.
    Convert { method: String, conversion: MigrationFn },
}

impl MigrationAction {
    pub fn method(&self) -> &str {
        match self {
            MigrationAction::Construct { method, .. } | MigrationAction::Convert { method, .. } => method,
        }
    }

    pub fn apply(&self, current: &Object, options: &Options) -> Result<Object, MigrationError> {
        let outcome = match self {
            MigrationAction::Construct { factory, .. } => factory(current, options),
            MigrationAction::Convert { conversion, .. } => conversion(current, options),
        };

        outcome.map_err(|source| match source.downcast::<MigrationError>() {
            Ok(error) => *error,
            Err(source) => MigrationError::ActionFailed {
                method: self.method().to_string(),
                source,
            },
        })
    }
}

impl fmt::Debug for MigrationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationAction::Construct { method, .. } => f.debug_tuple("Construct").field(method).finish(),
            MigrationAction::Convert { method, .. } => f.debug_tuple("Convert").field(method).finish(),
        }
    }
}

/// Directed, executable conversion between two versions.
#[derive(Debug, Clone)]
pub struct MigrationEdge {
    pub source: VersionTag,
    pub target: VersionTag,
    pub source_class: ClassId,
    pub target_class: ClassId,
    pub direction: Direction,
    pub action: MigrationAction,
}

impl MigrationEdge {
    pub fn method(&self) -> &str {
        self.action.method()
    }

    pub fn apply(&self, current: &Object, options: &Options) -> Result<Object, MigrationError> {
        if current.class() != self.source_class {
            return Err(MigrationError::TypeMismatch {
                expected: self.source_class,
                found: current.class(),
            });
        }

        let next = self.action.apply(current, options)?;
        if next.class() != self.target_class {
            return Err(MigrationError::TypeMismatch {
                expected: self.target_class,
                found: next.class(),
            });
        }

        Ok(next)
    }
}

/// Validated migrations of one class, keyed by the neighbouring version.
#[derive(Debug, Clone, Default)]
pub struct MigrationMethods {
    pub from: IndexMap<VersionTag, MigrationEdge>,
    pub to: IndexMap<VersionTag, MigrationEdge>,
}

impl MigrationMethods {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.from.is_empty() && self.to.is_empty()
    }

    pub fn len(&self) -> usize {
        self.from.len() + self.to.len()
    }

    pub fn get(&self, direction: Direction, neighbor: &VersionTag) -> Option<&MigrationEdge> {
        match direction {
            Direction::From => self.from.get(neighbor),
            Direction::To => self.to.get(neighbor),
        }
    }

    /// Outbound edges first, then inbound, each in declaration order.
    pub fn edges(&self) -> impl Iterator<Item = &MigrationEdge> {
        self.to.values().chain(self.from.values())
    }
}

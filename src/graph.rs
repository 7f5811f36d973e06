use indexmap::IndexMap;
use std::collections::{HashMap, HashSet, VecDeque};

use crate::{
    class::ClassId,
    error::{MigrationError, Result},
    migration::MigrationEdge,
    version_tag::VersionTag,
};

/// Ordered chain of edges leading from one version to another.
#[derive(Debug, Clone)]
pub struct ConversionPath {
    pub from: VersionTag,
    pub to: VersionTag,
    pub edges: Vec<MigrationEdge>,
}

impl ConversionPath {
    /// Zero-step path from a version to itself.
    pub fn identity(version: VersionTag) -> Self {
        Self {
            from: version.clone(),
            to: version,
            edges: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MigrationEdge> {
        self.edges.iter()
    }

    /// Every version visited, source and target included.
    pub fn versions(&self) -> Vec<VersionTag> {
        let mut versions = vec![self.from.clone()];
        versions.extend(self.edges.iter().map(|edge| edge.target.clone()));
        versions
    }

    pub fn methods(&self) -> Vec<&str> {
        self.edges.iter().map(MigrationEdge::method).collect()
    }
}

/// Versions as nodes, validated migrations as directed edges.
#[derive(Debug, Clone, Default)]
pub struct VersionGraph {
    classes: IndexMap<VersionTag, ClassId>,
    adjacency: IndexMap<VersionTag, Vec<MigrationEdge>>,
}

impl VersionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `version` to `class`. A version may belong to one class only.
    pub fn add_class(&mut self, class: ClassId, version: VersionTag) -> Result<()> {
        match self.classes.get(&version) {
            Some(existing) if *existing != class => Err(MigrationError::VersionConflict {
                version,
                first: *existing,
                second: class,
            }),
            Some(_) => Ok(()),
            None => {
                self.classes.insert(version, class);
                Ok(())
            }
        }
    }

    pub fn add_edge(&mut self, edge: MigrationEdge) -> Result<()> {
        self.add_class(edge.source_class, edge.source.clone())?;
        self.add_class(edge.target_class, edge.target.clone())?;
        self.adjacency.entry(edge.source.clone()).or_default().push(edge);
        Ok(())
    }

    pub fn class_of(&self, version: &VersionTag) -> Option<ClassId> {
        self.classes.get(version).copied()
    }

    pub fn versions(&self) -> impl Iterator<Item = &VersionTag> {
        self.classes.keys()
    }

    pub fn edges(&self) -> impl Iterator<Item = &MigrationEdge> {
        self.adjacency.values().flatten()
    }

    pub fn edges_from(&self, version: &VersionTag) -> &[MigrationEdge] {
        self.adjacency.get(version).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True when no edge leaves or enters `version`.
    pub fn is_isolated(&self, version: &VersionTag) -> bool {
        self.edges_from(version).is_empty() && !self.edges().any(|edge| &edge.target == version)
    }

    /// Breadth-first search for the path with the fewest steps.
    ///
    /// Among several shortest paths the one discovered first wins, which
    /// depends only on registration order.
    pub fn find_path(&self, from: &VersionTag, to: &VersionTag) -> Result<ConversionPath> {
        if from == to {
            return Ok(ConversionPath::identity(from.clone()));
        }

        // version -> edge that first reached it
        let mut reached_by: HashMap<&VersionTag, &MigrationEdge> = HashMap::new();
        let mut visited: HashSet<&VersionTag> = HashSet::from([from]);
        let mut queue: VecDeque<&VersionTag> = VecDeque::from([from]);

        while let Some(current) = queue.pop_front() {
            for edge in self.edges_from(current) {
                if !visited.insert(&edge.target) {
                    continue;
                }
                reached_by.insert(&edge.target, edge);

                if &edge.target == to {
                    return Ok(self.unwind(from, to, &reached_by));
                }
                queue.push_back(&edge.target);
            }
        }

        Err(MigrationError::NoRoute {
            from: from.clone(),
            to: to.clone(),
        })
    }

    /// Every version reachable from `from`, nearest first, `from` excluded.
    pub fn reachable_from(&self, from: &VersionTag) -> Vec<VersionTag> {
        let mut visited: HashSet<&VersionTag> = HashSet::from([from]);
        let mut queue: VecDeque<&VersionTag> = VecDeque::from([from]);
        let mut reachable = Vec::new();

        while let Some(current) = queue.pop_front() {
            for edge in self.edges_from(current) {
                if visited.insert(&edge.target) {
                    reachable.push(edge.target.clone());
                    queue.push_back(&edge.target);
                }
            }
        }

        reachable
    }

    fn unwind(
        &self,
        from: &VersionTag,
        to: &VersionTag,
        reached_by: &HashMap<&VersionTag, &MigrationEdge>,
    ) -> ConversionPath {
        let mut edges = Vec::new();
        let mut cursor = to;
        while cursor != from {
            let edge = reached_by[cursor];
            edges.push(edge.clone());
            cursor = &edge.source;
        }
        edges.reverse();

        ConversionPath {
            from: from.clone(),
            to: to.clone(),
            edges,
        }
    }
}

use std::collections::{BTreeMap, HashMap};

use log::debug;

use crate::dependency::error::DependencyError;
use crate::dependency::key;
use crate::dependency::{CommitCallback, Dependency, DependencyArg, DependencyId, DependencyKind};
use crate::transaction::{CommitOp, KeyChange};

/// One entry of a commit vector: a dependency, the operation it is invoked
/// with and the changes it covers (indices into the change set, in order).
#[derive(Debug, Clone)]
pub struct Invocation<'t> {
    pub dependency: &'t Dependency,
    pub op: CommitOp,
    pub changes: Vec<usize>,
}

/// All registered dependencies, indexed by key
#[derive(Debug, Default)]
pub struct DependencyTable {
    entries: Vec<Dependency>,
    by_key: BTreeMap<String, Vec<usize>>,
    next_id: DependencyId,
}

impl DependencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(
        &mut self,
        plugin: &str,
        kind: DependencyKind,
        priority: u16,
        callback: CommitCallback,
        arg: Option<DependencyArg>,
        key: &str,
    ) -> Result<DependencyId, DependencyError> {
        key::validate_key(key)?;

        let id = self.next_id;
        self.next_id += 1;
        self.by_key.entry(key.to_string()).or_default().push(self.entries.len());
        self.entries.push(Dependency {
            id,
            plugin: plugin.to_string(),
            priority,
            kind,
            callback,
            arg,
            key: key.to_string(),
        });
        debug!("Plugin '{}' registered {} dependency {} on '{}' (priority {})", plugin, kind, id, key, priority);
        Ok(id)
    }

    pub fn get(&self, id: DependencyId) -> Option<&Dependency> {
        self.entries.iter().find(|dep| dep.id == id)
    }

    /// Dependencies in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Dependency> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dependencies owned by `plugin`, in registration order
    pub fn dependencies_of(&self, plugin: &str) -> Vec<&Dependency> {
        self.entries.iter().filter(|dep| dep.plugin == plugin).collect()
    }

    /// Dependencies registered on exactly `key`, of any flavor
    pub fn lookup(&self, key: &str) -> Vec<&Dependency> {
        self.by_key
            .get(key)
            .map(|positions| positions.iter().map(|&pos| &self.entries[pos]).collect())
            .unwrap_or_default()
    }

    /// Dependencies of any flavor a change to `key` would trigger
    pub fn matching(&self, key: &str) -> Vec<&Dependency> {
        let mut found: Vec<&Dependency> = key::ancestors(key)
            .flat_map(|ancestor| self.lookup(ancestor))
            .filter(|dep| dep.matches(key))
            .collect();
        found.sort_by_key(|dep| (dep.priority, dep.id));
        found
    }

    /// Compute the ordered invocations for a change set.
    ///
    /// `validate` selects the validate flavors instead of the commit flavors.
    /// A key dependency yields one invocation per matching change; a tree
    /// dependency yields a single invocation covering every change below its
    /// root, with ADD or DELETE when all covered changes agree and CHANGE
    /// otherwise. Invocations are ordered by priority, then registration id,
    /// then position of their first change.
    pub fn commit_vector(&self, changes: &[KeyChange], validate: bool) -> Vec<Invocation<'_>> {
        let mut invocations: Vec<Invocation<'_>> = Vec::new();
        let mut tree_slots: HashMap<usize, usize> = HashMap::new();

        for (change_pos, change) in changes.iter().enumerate() {
            for ancestor in key::ancestors(&change.key) {
                let Some(positions) = self.by_key.get(ancestor) else {
                    continue;
                };
                for &pos in positions {
                    let dep = &self.entries[pos];
                    if dep.kind.is_validate() != validate {
                        continue;
                    }
                    if !dep.kind.is_tree() {
                        if ancestor == change.key {
                            invocations.push(Invocation {
                                dependency: dep,
                                op: change.op,
                                changes: vec![change_pos],
                            });
                        }
                        continue;
                    }
                    match tree_slots.get(&pos) {
                        Some(&slot) => {
                            let invocation = &mut invocations[slot];
                            invocation.op = merge_ops(invocation.op, change.op);
                            invocation.changes.push(change_pos);
                        }
                        None => {
                            tree_slots.insert(pos, invocations.len());
                            invocations.push(Invocation {
                                dependency: dep,
                                op: change.op,
                                changes: vec![change_pos],
                            });
                        }
                    }
                }
            }
        }

        invocations.sort_by_key(|inv| (inv.dependency.priority, inv.dependency.id, inv.changes[0]));
        invocations
    }

    pub fn clear(&mut self) {
        self.by_key.clear();
        self.entries.clear();
    }
}

fn merge_ops(current: CommitOp, next: CommitOp) -> CommitOp {
    if current == next { current } else { CommitOp::Change }
}

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::ctor::{Ctor, CtorId, Declared, Handle, Origin, Param, ResultNode, ResultSlot, State};
use crate::error::ValidationError;
use crate::key::{Binding, GroupKey};

/// Distinguishes graphs so that failures are only ever mapped onto the graph that produced them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct GraphId(u64);

impl GraphId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Position of one result within the graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ResultRef {
    pub(crate) ctor: CtorId,
    pub(crate) result: usize,
}

/// Every contribution to one `(type, group)` pair.
#[derive(Debug)]
pub(crate) struct GroupEntry {
    pub(crate) key: GroupKey,
    pub(crate) contributors: Vec<ResultRef>,
    next_index: usize,
}

/// The registered constructors and the indices over their results.
#[derive(Debug)]
pub(crate) struct Graph {
    id: GraphId,
    ctors: Vec<Ctor>,
    providers: HashMap<Binding, ResultRef>,
    groups: Vec<GroupEntry>,
    group_lookup: HashMap<GroupKey, usize>,
}

impl Default for Graph {
    fn default() -> Self {
        Self {
            id: GraphId::next(),
            ctors: Vec::new(),
            providers: HashMap::new(),
            groups: Vec::new(),
            group_lookup: HashMap::new(),
        }
    }
}

impl Graph {
    pub(crate) const fn id(&self) -> GraphId {
        self.id
    }

    /// Registers a constructor, or leaves the graph untouched if any result conflicts.
    pub(crate) fn register(
        &mut self,
        origin: Origin,
        params: Vec<Param>,
        declared: Vec<Declared>,
        outputs: usize,
        handle: Handle,
    ) -> Result<CtorId, ValidationError> {
        self.check_conflicts(&declared)?;

        let id = CtorId::new(self.ctors.len());
        let indices = self.assign_group_indices(&declared);

        let results: Vec<ResultSlot> = declared
            .into_iter()
            .zip(indices)
            .map(|(declared, group_index)| ResultSlot {
                node: ResultNode::new(declared.binding, group_index),
                output: declared.output,
                projection: declared.projection,
            })
            .collect();

        for key in params.iter().filter_map(|param| param.binding().group_key()) {
            self.group_position(key);
        }

        for (position, result) in results.iter().enumerate() {
            let reference = ResultRef { ctor: id, result: position };
            let binding = result.node.binding();

            match binding.group_key() {
                Some(key) => {
                    let index = self.group_position(key);
                    self.groups[index].contributors.push(reference);
                }
                None => {
                    self.providers.insert(binding.clone(), reference);
                }
            }
        }

        self.ctors.push(Ctor {
            id,
            origin,
            params,
            results,
            outputs,
            handle,
            state: State::Pending,
        });

        Ok(id)
    }

    fn check_conflicts(&self, declared: &[Declared]) -> Result<(), ValidationError> {
        let mut seen = HashSet::new();

        for binding in declared.iter().map(|d| &d.binding).filter(|b| b.group().is_none()) {
            if let Some(existing) = self.providers.get(binding) {
                return Err(ValidationError::AlreadyProvided {
                    binding: binding.clone(),
                    existing: self.ctor(existing.ctor).origin,
                });
            }

            if !seen.insert(binding) {
                return Err(ValidationError::DuplicateResult { binding: binding.clone() });
            }
        }

        Ok(())
    }

    /// Gives every grouped result its index, advancing the per-pair counters.
    ///
    /// Results projected from the same produced value share one index: the largest
    /// counter among their pairs.
    fn assign_group_indices(&mut self, declared: &[Declared]) -> Vec<usize> {
        let mut indices = vec![0; declared.len()];
        let mut position = 0;

        while position < declared.len() {
            let output = declared[position].output;
            let end = declared[position..]
                .iter()
                .position(|d| d.output != output)
                .map_or(declared.len(), |offset| position + offset);

            let members = &declared[position..end];
            let keys: Vec<GroupKey> = members.iter().filter_map(|d| d.binding.group_key()).collect();

            if let Some(shared) = keys.iter().map(|key| self.next_index(key)).max() {
                for key in keys {
                    let index = self.group_position(key);
                    self.groups[index].next_index = shared + 1;
                }

                for (slot, member) in indices[position..end].iter_mut().zip(members) {
                    if member.binding.group().is_some() {
                        *slot = shared;
                    }
                }
            }

            position = end;
        }

        indices
    }

    fn next_index(&self, key: &GroupKey) -> usize {
        self.group_lookup
            .get(key)
            .map_or(0, |&position| self.groups[position].next_index)
    }

    fn group_position(&mut self, key: GroupKey) -> usize {
        if let Some(&position) = self.group_lookup.get(&key) {
            return position;
        }

        let position = self.groups.len();
        self.group_lookup.insert(key.clone(), position);
        self.groups.push(GroupEntry {
            key,
            contributors: Vec::new(),
            next_index: 0,
        });
        position
    }

    pub(crate) fn ctor(&self, id: CtorId) -> &Ctor {
        &self.ctors[id.index()]
    }

    pub(crate) fn ctor_mut(&mut self, id: CtorId) -> &mut Ctor {
        &mut self.ctors[id.index()]
    }

    pub(crate) fn ctors(&self) -> &[Ctor] {
        &self.ctors
    }

    pub(crate) fn provider(&self, binding: &Binding) -> Option<ResultRef> {
        self.providers.get(binding).copied()
    }

    pub(crate) fn group(&self, key: &GroupKey) -> Option<&GroupEntry> {
        self.group_lookup.get(key).map(|&position| &self.groups[position])
    }

    /// Groups in order of their first appearance, consumed or contributed to.
    pub(crate) fn groups(&self) -> &[GroupEntry] {
        &self.groups
    }

    /// Whether `binding` can be resolved at all.
    pub(crate) fn is_provided(&self, binding: &Binding) -> bool {
        binding.group().is_some() || self.providers.contains_key(binding)
    }
}

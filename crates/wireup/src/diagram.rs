// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! A renderer-agnostic description of a container's dependency graph.
//!
//! A [`Diagram`] lists constructors with their parameters and results, and value
//! groups with the results that feed them. Edges are derived from those lists; an
//! external renderer decides how to draw them.

use crate::ctor::{CtorId, Origin, Param, ResultNode};
use crate::graph::Graph;
use crate::key::{Binding, TypeKey};

/// How a constructor relates to the failure a diagram was pruned for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(rename_all = "snake_case"))]
#[non_exhaustive]
pub enum Status {
    /// Not involved in a failure.
    Ok,
    /// The constructor whose own failure, missing dependency or cycle caused the error.
    RootCause,
    /// A constructor that could not run because one of its dependencies failed.
    Transitive,
}

/// One constructor.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CtorNode {
    id: CtorId,
    origin: Origin,
    params: Vec<Param>,
    group_params: Vec<Param>,
    results: Vec<ResultNode>,
    status: Status,
}

impl CtorNode {
    /// Registration index of the constructor.
    #[must_use]
    pub const fn id(&self) -> CtorId {
        self.id
    }

    /// Where the constructor was registered.
    #[must_use]
    pub const fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Single-valued inputs, in declaration order.
    #[must_use]
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Value-group inputs, in declaration order.
    #[must_use]
    pub fn group_params(&self) -> &[Param] {
        &self.group_params
    }

    /// Outputs, in declaration order.
    #[must_use]
    pub fn results(&self) -> &[ResultNode] {
        &self.results
    }

    /// Involvement in the failure the diagram was pruned for.
    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }
}

/// One result feeding a value group.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct GroupMember {
    ctor: CtorId,
    result: ResultNode,
}

impl GroupMember {
    /// The contributing constructor.
    #[must_use]
    pub const fn ctor(&self) -> CtorId {
        self.ctor
    }

    /// The contributed result.
    #[must_use]
    pub const fn result(&self) -> &ResultNode {
        &self.result
    }
}

/// One `(type, group)` aggregation.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct GroupNode {
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    ty: TypeKey,
    name: String,
    members: Vec<GroupMember>,
}

impl GroupNode {
    /// The element type.
    #[must_use]
    pub const fn ty(&self) -> TypeKey {
        self.ty
    }

    /// The group name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The binding consumers of this group request.
    #[must_use]
    pub fn binding(&self) -> Binding {
        Binding::new(self.ty).grouped(self.name.clone())
    }

    /// Contributions in registration order.
    #[must_use]
    pub fn members(&self) -> &[GroupMember] {
        &self.members
    }
}

/// A relationship between two diagram nodes.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(tag = "kind", rename_all = "snake_case"))]
#[non_exhaustive]
pub enum Edge {
    /// `ctor` consumes `param`, which is either a single binding or a group.
    Consumes {
        /// The consuming constructor.
        ctor: CtorId,
        /// The consumed binding.
        param: Binding,
    },
    /// `ctor` produces `result`.
    Produces {
        /// The producing constructor.
        ctor: CtorId,
        /// The produced binding.
        result: Binding,
    },
}

/// A snapshot of a container's dependency graph, possibly pruned to a failure.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Diagram {
    ctors: Vec<CtorNode>,
    groups: Vec<GroupNode>,
    missing: Vec<Param>,
    unmet: Vec<Param>,
}

impl Diagram {
    /// Builds a diagram of every constructor and every group, consumed or not.
    pub(crate) fn full(graph: &Graph) -> Self {
        Self::from_graph(graph, |_| Some(Status::Ok), false)
    }

    /// Builds a diagram of the constructors `status` assigns a status to.
    ///
    /// Groups are kept when a retained constructor consumes them and at least one
    /// retained constructor contributes; only retained contributions are listed.
    pub(crate) fn pruned(graph: &Graph, status: impl Fn(CtorId) -> Option<Status>) -> Self {
        Self::from_graph(graph, status, true)
    }

    fn from_graph(graph: &Graph, status: impl Fn(CtorId) -> Option<Status>, pruned: bool) -> Self {
        let ctors: Vec<CtorNode> = graph
            .ctors()
            .iter()
            .filter_map(|ctor| {
                let status = status(ctor.id)?;
                let (group_params, params) = ctor.params.iter().cloned().partition(Param::is_group);

                Some(CtorNode {
                    id: ctor.id,
                    origin: ctor.origin,
                    params,
                    group_params,
                    results: ctor.results.iter().map(|result| result.node.clone()).collect(),
                    status,
                })
            })
            .collect();

        let groups = graph
            .groups()
            .iter()
            .filter_map(|group| {
                let binding = Binding::new(group.key.ty).grouped(group.key.group.clone());
                let consumed = ctors
                    .iter()
                    .any(|ctor| ctor.group_params.iter().any(|param| param.binding() == &binding));

                let members: Vec<GroupMember> = group
                    .contributors
                    .iter()
                    .filter(|contributor| status(contributor.ctor).is_some())
                    .map(|contributor| GroupMember {
                        ctor: contributor.ctor,
                        result: graph.ctor(contributor.ctor).results[contributor.result].node.clone(),
                    })
                    .collect();

                let retained = !pruned || (consumed && !members.is_empty());
                retained.then(|| GroupNode {
                    ty: group.key.ty,
                    name: group.key.group.clone(),
                    members,
                })
            })
            .collect();

        Self {
            ctors,
            groups,
            missing: Vec::new(),
            unmet: Vec::new(),
        }
    }

    pub(crate) fn with_failure(mut self, missing: Vec<Param>, unmet: Vec<Param>) -> Self {
        self.missing = missing;
        self.unmet = unmet;
        self
    }

    /// Constructors in registration order.
    #[must_use]
    pub fn ctors(&self) -> &[CtorNode] {
        &self.ctors
    }

    /// The constructor registered with `id`, if it is part of this diagram.
    #[must_use]
    pub fn ctor(&self, id: CtorId) -> Option<&CtorNode> {
        self.ctors.iter().find(|ctor| ctor.id == id)
    }

    /// Value groups in order of their first appearance, as a parameter or a result.
    #[must_use]
    pub fn groups(&self) -> &[GroupNode] {
        &self.groups
    }

    /// The group node for a grouped binding, if it is part of this diagram.
    #[must_use]
    pub fn group(&self, binding: &Binding) -> Option<&GroupNode> {
        let group = binding.group()?;
        self.groups
            .iter()
            .find(|node| node.ty == binding.ty() && node.name == group)
    }

    /// Parameters of retained constructors that have no provider.
    #[must_use]
    pub fn missing(&self) -> &[Param] {
        &self.missing
    }

    /// Parameters of the invoked target that could not be satisfied.
    #[must_use]
    pub fn unmet(&self) -> &[Param] {
        &self.unmet
    }

    /// Every consumption and production edge, constructor by constructor.
    #[must_use]
    pub fn edges(&self) -> Vec<Edge> {
        self.ctors
            .iter()
            .flat_map(|ctor| {
                let consumes = ctor
                    .params
                    .iter()
                    .chain(&ctor.group_params)
                    .map(|param| Edge::Consumes {
                        ctor: ctor.id,
                        param: param.binding().clone(),
                    });
                let produces = ctor.results.iter().map(|result| Edge::Produces {
                    ctor: ctor.id,
                    result: result.binding().clone(),
                });
                consumes.chain(produces).collect::<Vec<_>>()
            })
            .collect()
    }
}

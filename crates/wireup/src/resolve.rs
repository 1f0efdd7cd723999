// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ctor::{CtorId, Param, State};
use crate::error::{CycleLink, InvokeError, Owner};
use crate::graph::Graph;
use crate::inputs::{Arguments, Slot, Value};
use crate::key::{Binding, GroupKey};

/// A constructor whose arguments are currently being resolved.
#[derive(Debug)]
struct Visit {
    ctor: CtorId,
    binding: Binding,
}

/// Resolves parameters against a graph, invoking constructors at most once each.
///
/// Results and constructor failures are memoized on the graph itself, so they
/// survive the resolver and are shared by every later invocation.
#[derive(Debug)]
pub(crate) struct Resolver<'g> {
    graph: &'g mut Graph,
    recover_from_panics: bool,
    path: Vec<Visit>,
}

impl<'g> Resolver<'g> {
    pub(crate) const fn new(graph: &'g mut Graph, recover_from_panics: bool) -> Self {
        Self {
            graph,
            recover_from_panics,
            path: Vec::new(),
        }
    }

    /// Resolves every parameter of `owner`, reporting all missing requirements at once.
    pub(crate) fn arguments(&mut self, owner: Owner, params: &[Param]) -> Result<Arguments, InvokeError> {
        let missing: Vec<Param> = params
            .iter()
            .filter(|param| !param.is_optional() && !self.graph.is_provided(param.binding()))
            .cloned()
            .collect();

        if !missing.is_empty() {
            tracing::debug!(
                owner = %owner.origin(),
                missing = missing.len(),
                "missing dependencies"
            );
            return Err(InvokeError::missing(self.graph.id(), owner, missing));
        }

        let mut slots = Vec::with_capacity(params.len());
        for param in params {
            let slot = self.resolve(param).map_err(|error| error.within(owner, param))?;
            slots.push(slot);
        }

        Ok(Arguments::new(slots))
    }

    fn resolve(&mut self, param: &Param) -> Result<Slot, InvokeError> {
        let binding = param.binding();

        if let Some(key) = binding.group_key() {
            return self.resolve_group(&key, binding).map(Slot::Group);
        }

        let Some(result) = self.graph.provider(binding) else {
            tracing::trace!(binding = %binding, "optional dependency absent");
            return Ok(Slot::Absent);
        };

        let values = self.ensure_invoked(result.ctor, binding)?;
        Ok(Slot::Value(values[result.result].clone()))
    }

    fn resolve_group(&mut self, key: &GroupKey, binding: &Binding) -> Result<Vec<Value>, InvokeError> {
        let contributors = self
            .graph
            .group(key)
            .map(|group| group.contributors.clone())
            .unwrap_or_default();

        tracing::trace!(binding = %binding, contributors = contributors.len(), "resolving group");

        let mut values = Vec::with_capacity(contributors.len());
        for contributor in contributors {
            let produced = self.ensure_invoked(contributor.ctor, binding)?;
            values.push(produced[contributor.result].clone());
        }

        Ok(values)
    }

    /// Returns the values produced by `id`, invoking it first if it has not run yet.
    fn ensure_invoked(&mut self, id: CtorId, binding: &Binding) -> Result<Vec<Value>, InvokeError> {
        match &self.graph.ctor(id).state {
            State::Invoked(values) => {
                tracing::trace!(binding = %binding, "reusing cached values");
                return Ok(values.clone());
            }
            State::Failed(error) => return Err(error.clone()),
            State::Pending => {}
        }

        if let Some(start) = self.path.iter().position(|visit| visit.ctor == id) {
            return Err(self.cycle(start, id, binding));
        }

        self.path.push(Visit {
            ctor: id,
            binding: binding.clone(),
        });
        let outcome = self.invoke(id);
        self.path.pop();
        outcome
    }

    fn invoke(&mut self, id: CtorId) -> Result<Vec<Value>, InvokeError> {
        let ctor = self.graph.ctor(id);
        let owner = Owner::Ctor(id, ctor.origin);
        let params = ctor.params.clone();

        let mut args = self.arguments(owner, &params)?;

        let graph_id = self.graph.id();
        let ctor = self.graph.ctor_mut(id);

        tracing::debug!(ctor = %ctor.origin, "invoking constructor");

        match ctor.call(&mut args, self.recover_from_panics) {
            Ok(values) => {
                ctor.state = State::Invoked(values.clone());
                Ok(values)
            }
            Err(cause) => {
                tracing::debug!(ctor = %ctor.origin, error = %cause, "constructor failed");
                let error = InvokeError::failed(graph_id, id, cause);
                ctor.state = State::Failed(error.clone());
                Err(error)
            }
        }
    }

    fn cycle(&self, start: usize, id: CtorId, binding: &Binding) -> InvokeError {
        let visits = &self.path[start..];

        let chain = visits
            .iter()
            .map(|visit| CycleLink::new(visit.binding.clone(), self.graph.ctor(visit.ctor).origin))
            .chain(std::iter::once(CycleLink::new(binding.clone(), self.graph.ctor(id).origin)))
            .collect();

        tracing::debug!(ctor = %self.graph.ctor(id).origin, "dependency cycle detected");

        InvokeError::cycle(self.graph.id(), chain, visits.iter().map(|visit| visit.ctor).collect())
    }
}

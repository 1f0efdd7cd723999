// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashSet;

use crate::ctor::CtorId;
use crate::diagram::{Diagram, Status};
use crate::error::InvokeError;
use crate::graph::Graph;

/// Renders `graph`, narrowed to the part of it that explains `failure`.
///
/// Without a failure, or with one raised by a different container, every
/// constructor is rendered.
pub(crate) fn render(graph: &Graph, failure: Option<&InvokeError>) -> Diagram {
    let Some(trace) = failure.map(InvokeError::trace).filter(|trace| trace.graph == Some(graph.id())) else {
        return Diagram::full(graph);
    };

    let roots: HashSet<CtorId> = trace.root_causes.iter().copied().collect();
    let transitive: HashSet<CtorId> = trace.transitive.iter().copied().collect();

    tracing::trace!(
        root_causes = roots.len(),
        transitive = transitive.len(),
        "pruning diagram to failure"
    );

    Diagram::pruned(graph, |id| {
        if roots.contains(&id) {
            Some(Status::RootCause)
        } else if transitive.contains(&id) {
            Some(Status::Transitive)
        } else {
            None
        }
    })
    .with_failure(trace.missing.clone(), trace.unmet.clone())
}

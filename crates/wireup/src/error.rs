// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use thiserror::Error;

use crate::ctor::{CtorId, Origin, Param};
use crate::graph::GraphId;
use crate::key::{Binding, TypeKey};
use crate::shape::LeafKind;

/// A registration was rejected. The container is left exactly as it was.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum ValidationError {
    /// A field carries both a name and a group.
    #[error("field `{field}` of {object} cannot be both named and grouped")]
    NameAndGroup {
        /// The object declaring the field.
        object: &'static str,
        /// The offending field.
        field: &'static str,
    },

    /// An optional field carries a group; groups always resolve, possibly empty.
    #[error("field `{field}` of {object} cannot be both optional and grouped")]
    OptionalGroup {
        /// The object declaring the field.
        object: &'static str,
        /// The offending field.
        field: &'static str,
    },

    /// A `Vec<Arc<T>>` input does not say which group it collects.
    #[error("field `{field}` of {object} collects values but is not annotated with a group")]
    UngroupedCollection {
        /// The object declaring the field.
        object: &'static str,
        /// The offending field.
        field: &'static str,
    },

    /// A single-valued input carries a group.
    #[error("field `{field}` of {object} consumes a group and must be declared as `Vec<Arc<T>>`")]
    GroupNotCollection {
        /// The object declaring the field.
        object: &'static str,
        /// The offending field.
        field: &'static str,
    },

    /// A nested object field carries an annotation; only leaves can be annotated.
    #[error("field `{field}` of {object} is a nested object and cannot be annotated")]
    AnnotatedObject {
        /// The object declaring the field.
        object: &'static str,
        /// The offending field.
        field: &'static str,
    },

    /// An object declares a private field without opting into ignoring private fields.
    #[error("field `{field}` of {object} is private; mark the object with `ignore_private` to allow it")]
    PrivateField {
        /// The object declaring the field.
        object: &'static str,
        /// The offending field.
        field: &'static str,
    },

    /// An output leaf is not a single value.
    #[error("result {ty} must be produced as a single value, not {kind:?}")]
    InvalidResultLeaf {
        /// The produced type.
        ty: TypeKey,
        /// The declared kind.
        kind: LeafKind,
    },

    /// The name and group provide options were combined.
    #[error("cannot use the name and group options together")]
    ConflictingOptions,

    /// A provide option was combined with a result object, whose fields carry their own annotations.
    #[error("provide options cannot be applied to result object {object}")]
    OptionOnResultObject {
        /// The result object.
        object: &'static str,
    },

    /// An interface projection was requested for a constructor that does not produce exactly one value.
    #[error("interface projections require exactly one produced value, found {results}")]
    ProjectionArity {
        /// Number of produced values.
        results: usize,
    },

    /// An interface projection expects a different produced type.
    #[error("projection expects {expected} but the constructor produces {produced}")]
    ProjectionMismatch {
        /// The projection's source type.
        expected: TypeKey,
        /// The produced type.
        produced: TypeKey,
    },

    /// Two projections target the same interface identity.
    #[error("{target} is listed more than once as a projection target")]
    DuplicateProjection {
        /// The repeated identity.
        target: TypeKey,
    },

    /// The constructor produces nothing.
    #[error("constructor must produce at least one value")]
    NoResults,

    /// One constructor produces the same binding twice.
    #[error("{binding} is produced more than once by the same constructor")]
    DuplicateResult {
        /// The repeated binding.
        binding: Binding,
    },

    /// Another constructor already provides this binding.
    #[error("{binding} is already provided by {existing}")]
    AlreadyProvided {
        /// The conflicting binding.
        binding: Binding,
        /// The constructor that provides it.
        existing: Origin,
    },
}

/// Moving resolved values into, or produced values out of, user types failed.
///
/// This indicates an [`In`](crate::In) or [`Out`](crate::Out) implementation whose
/// `extract`/`scatter` disagrees with its declared shape.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum ArgumentError {
    /// More values were requested than were resolved.
    #[error("ran out of resolved values")]
    Exhausted,

    /// A value had a different type than requested.
    #[error("resolved value is not of type {expected}")]
    TypeMismatch {
        /// The requested type.
        expected: TypeKey,
    },

    /// A position held a different kind of value than requested.
    #[error("resolved value cannot be delivered as {expected:?}")]
    KindMismatch {
        /// The requested kind.
        expected: LeafKind,
    },

    /// Resolved values were left unconsumed.
    #[error("{remaining} resolved values were not consumed")]
    Leftover {
        /// Number of values left over.
        remaining: usize,
    },

    /// A different number of values was produced than declared.
    #[error("expected {expected} produced values, found {produced}")]
    OutputCount {
        /// Declared outputs.
        expected: usize,
        /// Scattered outputs.
        produced: usize,
    },
}

/// One step of a dependency cycle: `binding` is provided by `origin`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CycleLink {
    binding: Binding,
    origin: Origin,
}

impl CycleLink {
    pub(crate) const fn new(binding: Binding, origin: Origin) -> Self {
        Self { binding, origin }
    }

    /// The binding requested at this step.
    #[must_use]
    pub const fn binding(&self) -> &Binding {
        &self.binding
    }

    /// The constructor providing it.
    #[must_use]
    pub const fn origin(&self) -> &Origin {
        &self.origin
    }
}

impl Display for CycleLink {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} provided by {}", self.binding, self.origin)
    }
}

/// The deepest failure behind an [`InvokeError`].
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum Cause {
    /// Required bindings have no provider.
    #[error("missing dependencies for {origin}: {}", join(.missing, ", "))]
    MissingDependency {
        /// The constructor or target that needed them.
        origin: Origin,
        /// Every required binding without a provider.
        missing: Vec<Binding>,
    },

    /// A binding transitively depends on itself.
    #[error("cycle detected in dependency graph: {}", join(.chain, " -> "))]
    Cycle {
        /// The cycle, starting and ending at the same constructor.
        chain: Vec<CycleLink>,
    },

    /// A constructor reported a failure.
    #[error("constructor {origin} failed: {source}")]
    Constructor {
        /// The failing constructor.
        origin: Origin,
        /// The constructor's own error.
        source: Arc<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// A constructor panicked while panic recovery was enabled.
    #[error("constructor {origin} panicked: {message}")]
    Panic {
        /// The panicking constructor.
        origin: Origin,
        /// The panic payload, if it was a string.
        message: String,
    },

    /// Resolved values could not be moved into or out of user types.
    #[error("invalid values for {origin}: {source}")]
    Argument {
        /// The constructor or target involved.
        origin: Origin,
        /// What went wrong.
        source: ArgumentError,
    },

    /// The invoke target's parameters are malformed.
    #[error("invalid invoke target {origin}: {source}")]
    InvalidTarget {
        /// The target.
        origin: Origin,
        /// Why its parameters were rejected.
        source: ValidationError,
    },
}

fn join<T: Display>(items: &[T], separator: &str) -> String {
    items.iter().map(ToString::to_string).collect::<Vec<_>>().join(separator)
}

/// One level of the dependency chain an [`InvokeError`] travelled through.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    origin: Origin,
    binding: Binding,
}

impl Frame {
    /// The constructor or target whose arguments could not be built.
    #[must_use]
    pub const fn origin(&self) -> &Origin {
        &self.origin
    }

    /// The argument that failed.
    #[must_use]
    pub const fn binding(&self) -> &Binding {
        &self.binding
    }
}

/// Graph positions touched by a failure, used to prune diagrams.
#[derive(Clone, Debug, Default)]
pub(crate) struct Trace {
    pub(crate) graph: Option<GraphId>,
    pub(crate) root_causes: Vec<CtorId>,
    pub(crate) transitive: Vec<CtorId>,
    pub(crate) missing: Vec<Param>,
    pub(crate) unmet: Vec<Param>,
}

/// Where a resolution failure surfaced.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Owner {
    Target(Origin),
    Ctor(CtorId, Origin),
}

impl Owner {
    pub(crate) const fn origin(self) -> Origin {
        match self {
            Self::Target(origin) | Self::Ctor(_, origin) => origin,
        }
    }
}

/// Resolving or invoking failed.
///
/// The message reads from the invoked target inwards:
/// `could not build arguments for <target>: failed to build <binding>: ... <cause>`.
#[derive(Clone, Debug)]
pub struct InvokeError {
    cause: Cause,
    frames: Vec<Frame>,
    trace: Trace,
}

impl InvokeError {
    pub(crate) fn missing(graph: GraphId, owner: Owner, missing: Vec<Param>) -> Self {
        let mut trace = Trace {
            graph: Some(graph),
            ..Trace::default()
        };

        match owner {
            Owner::Ctor(id, _) => {
                trace.root_causes.push(id);
                trace.missing.clone_from(&missing);
            }
            Owner::Target(_) => trace.unmet.clone_from(&missing),
        }

        Self {
            cause: Cause::MissingDependency {
                origin: owner.origin(),
                missing: missing.into_iter().map(Param::into_binding).collect(),
            },
            frames: Vec::new(),
            trace,
        }
    }

    pub(crate) fn cycle(graph: GraphId, chain: Vec<CycleLink>, ctors: Vec<CtorId>) -> Self {
        Self {
            cause: Cause::Cycle { chain },
            frames: Vec::new(),
            trace: Trace {
                graph: Some(graph),
                root_causes: ctors,
                ..Trace::default()
            },
        }
    }

    pub(crate) fn failed(graph: GraphId, id: CtorId, cause: Cause) -> Self {
        Self {
            cause,
            frames: Vec::new(),
            trace: Trace {
                graph: Some(graph),
                root_causes: vec![id],
                ..Trace::default()
            },
        }
    }

    pub(crate) fn unattributed(cause: Cause) -> Self {
        Self {
            cause,
            frames: Vec::new(),
            trace: Trace::default(),
        }
    }

    /// Records that `owner` could not build `param` because of this failure.
    #[must_use]
    pub(crate) fn within(mut self, owner: Owner, param: &Param) -> Self {
        self.frames.push(Frame {
            origin: owner.origin(),
            binding: param.binding().clone(),
        });

        match owner {
            Owner::Ctor(id, _) => self.trace.transitive.push(id),
            Owner::Target(_) => self.trace.unmet = vec![param.clone()],
        }

        self
    }

    /// The deepest failure.
    #[must_use]
    pub const fn cause(&self) -> &Cause {
        &self.cause
    }

    /// The dependency chain, outermost (the invoked target) first.
    pub fn frames(&self) -> impl DoubleEndedIterator<Item = &Frame> {
        self.frames.iter().rev()
    }

    /// Whether the failure is a missing dependency.
    #[must_use]
    pub const fn is_missing_dependency(&self) -> bool {
        matches!(self.cause, Cause::MissingDependency { .. })
    }

    /// Whether the failure is a dependency cycle.
    #[must_use]
    pub const fn is_cycle(&self) -> bool {
        matches!(self.cause, Cause::Cycle { .. })
    }

    /// Whether a constructor itself failed or panicked.
    #[must_use]
    pub const fn is_constructor_failure(&self) -> bool {
        matches!(self.cause, Cause::Constructor { .. } | Cause::Panic { .. })
    }

    pub(crate) const fn trace(&self) -> &Trace {
        &self.trace
    }
}

impl Display for InvokeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for frame in self.frames() {
            write!(f, "could not build arguments for {}: failed to build {}: ", frame.origin, frame.binding)?;
        }

        Display::fmt(&self.cause, f)
    }
}

impl std::error::Error for InvokeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

#[cfg(test)]
mod tests {
    use std::panic::Location;

    use super::*;

    struct Alpha;
    struct Beta;

    fn origin(name: &'static str) -> Origin {
        Origin::new(name, Location::caller())
    }

    #[test]
    fn missing_dependency_lists_every_binding() {
        let cause = Cause::MissingDependency {
            origin: origin("make_service"),
            missing: vec![Binding::of::<Alpha>(), Binding::of::<Beta>().named("b")],
        };

        let message = cause.to_string();

        assert!(message.starts_with("missing dependencies for make_service ("), "{message}");
        assert!(
            message.ends_with(&format!(
                "{}, {}[name=\"b\"]",
                std::any::type_name::<Alpha>(),
                std::any::type_name::<Beta>()
            )),
            "{message}"
        );
    }

    #[test]
    fn frames_render_outermost_first() {
        let target = Owner::Target(origin("target"));
        let middle = Owner::Ctor(CtorId::new(1), origin("middle"));

        let error = InvokeError::failed(
            GraphId::next(),
            CtorId::new(0),
            Cause::Panic {
                origin: origin("inner"),
                message: "great sadness".to_string(),
            },
        )
        .within(middle, &Param::new(Binding::of::<Alpha>(), false))
        .within(target, &Param::new(Binding::of::<Beta>(), false));

        let message = error.to_string();
        let target_at = message.find("could not build arguments for target").expect("target frame");
        let middle_at = message.find("could not build arguments for middle").expect("middle frame");

        assert!(target_at < middle_at);
        assert!(message.ends_with("panicked: great sadness"));
        assert_eq!(error.frames().count(), 2);
        assert_eq!(error.trace().transitive, vec![CtorId::new(1)]);
        assert_eq!(error.trace().unmet, vec![Param::new(Binding::of::<Beta>(), false)]);
    }

    #[test]
    fn classification_helpers() {
        let error = InvokeError::unattributed(Cause::Cycle { chain: Vec::new() });

        assert!(error.is_cycle());
        assert!(!error.is_missing_dependency());
        assert!(!error.is_constructor_failure());
    }
}

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{self, Debug, Display, Formatter};
use std::panic::{self, AssertUnwindSafe, Location};

use crate::error::{ArgumentError, Cause};
use crate::inputs::{Arguments, Value};
use crate::key::Binding;
use crate::options::Projection;
use crate::outputs::BoxError;

/// Dense registration index of a constructor within one container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(transparent))]
pub struct CtorId(usize);

impl CtorId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Position of the constructor in registration order.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl Display for CtorId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a constructor or invoke target came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Origin {
    name: &'static str,
    location: &'static Location<'static>,
}

impl Origin {
    pub(crate) const fn new(name: &'static str, location: &'static Location<'static>) -> Self {
        Self { name, location }
    }

    /// The function or closure type name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The source file of the registering call.
    #[must_use]
    pub const fn file(&self) -> &'static str {
        self.location.file()
    }

    /// The line of the registering call.
    #[must_use]
    pub const fn line(&self) -> u32 {
        self.location.line()
    }
}

impl Display for Origin {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.name, self.file(), self.line())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Origin {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("Origin", 3)?;
        state.serialize_field("name", self.name)?;
        state.serialize_field("file", self.file())?;
        state.serialize_field("line", &self.line())?;
        state.end()
    }
}

/// One flattened input of a constructor or invoke target.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Param {
    #[cfg_attr(feature = "serde", serde(flatten))]
    binding: Binding,
    optional: bool,
}

impl Param {
    /// A parameter consuming `binding`.
    #[must_use]
    pub const fn new(binding: Binding, optional: bool) -> Self {
        Self { binding, optional }
    }

    /// The consumed binding.
    #[must_use]
    pub const fn binding(&self) -> &Binding {
        &self.binding
    }

    /// Whether resolution may yield nothing for this parameter.
    #[must_use]
    pub const fn is_optional(&self) -> bool {
        self.optional
    }

    /// Whether this parameter collects a value group.
    #[must_use]
    pub fn is_group(&self) -> bool {
        self.binding.group().is_some()
    }

    pub(crate) fn into_binding(self) -> Binding {
        self.binding
    }
}

/// One flattened output of a constructor.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ResultNode {
    #[cfg_attr(feature = "serde", serde(flatten))]
    binding: Binding,
    group_index: usize,
}

impl ResultNode {
    /// A result producing `binding`; group contributions carry their index.
    #[must_use]
    pub const fn new(binding: Binding, group_index: usize) -> Self {
        Self { binding, group_index }
    }

    /// The produced binding.
    #[must_use]
    pub const fn binding(&self) -> &Binding {
        &self.binding
    }

    /// Position of this contribution within its `(type, group)` pair; zero when ungrouped.
    #[must_use]
    pub const fn group_index(&self) -> usize {
        self.group_index
    }
}

/// A result as produced by the decomposer, before the graph assigns group indices.
#[derive(Clone, Debug)]
pub(crate) struct Declared {
    pub(crate) binding: Binding,
    pub(crate) output: usize,
    pub(crate) projection: Option<Projection>,
}

/// A registered result: where its value comes from and how it is converted.
#[derive(Clone, Debug)]
pub(crate) struct ResultSlot {
    pub(crate) node: ResultNode,
    pub(crate) output: usize,
    pub(crate) projection: Option<Projection>,
}

/// Why a constructor call produced no values.
pub(crate) enum Failure {
    Arguments(ArgumentError),
    Constructor(BoxError),
}

pub(crate) type Handle = Box<dyn Fn(&mut Arguments) -> Result<Vec<Value>, Failure> + Send + Sync>;

pub(crate) fn handle(call: impl Fn(&mut Arguments) -> Result<Vec<Value>, Failure> + Send + Sync + 'static) -> Handle {
    Box::new(call)
}

#[derive(Debug)]
pub(crate) enum State {
    Pending,
    Invoked(Vec<Value>),
    Failed(crate::InvokeError),
}

/// A registered constructor.
pub(crate) struct Ctor {
    pub(crate) id: CtorId,
    pub(crate) origin: Origin,
    pub(crate) params: Vec<Param>,
    pub(crate) results: Vec<ResultSlot>,
    pub(crate) outputs: usize,
    pub(crate) handle: Handle,
    pub(crate) state: State,
}

impl Ctor {
    pub(crate) fn group_params(&self) -> impl Iterator<Item = &Param> {
        self.params.iter().filter(|param| param.is_group())
    }

    /// Calls the user function and maps its outputs onto the declared results.
    pub(crate) fn call(&self, args: &mut Arguments, recover_from_panics: bool) -> Result<Vec<Value>, Cause> {
        let produced = if recover_from_panics {
            panic::catch_unwind(AssertUnwindSafe(|| (self.handle)(args))).map_err(|payload| Cause::Panic {
                origin: self.origin,
                message: panic_message(payload.as_ref()),
            })?
        } else {
            (self.handle)(args)
        };

        let outputs = produced.map_err(|failure| match failure {
            Failure::Arguments(source) => Cause::Argument {
                origin: self.origin,
                source,
            },
            Failure::Constructor(source) => Cause::Constructor {
                origin: self.origin,
                source: source.into(),
            },
        })?;

        if args.remaining() > 0 {
            return Err(self.argument_error(ArgumentError::Leftover {
                remaining: args.remaining(),
            }));
        }

        if outputs.len() != self.outputs {
            return Err(self.argument_error(ArgumentError::OutputCount {
                expected: self.outputs,
                produced: outputs.len(),
            }));
        }

        self.results
            .iter()
            .map(|result| {
                let value = &outputs[result.output];
                match &result.projection {
                    Some(projection) => projection.apply(value).map_err(|source| self.argument_error(source)),
                    None => Ok(value.clone()),
                }
            })
            .collect()
    }

    const fn argument_error(&self, source: ArgumentError) -> Cause {
        Cause::Argument {
            origin: self.origin,
            source,
        }
    }
}

impl Debug for Ctor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ctor")
            .field("id", &self.id)
            .field("origin", &self.origin)
            .field("params", &self.params)
            .field("results", &self.results)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

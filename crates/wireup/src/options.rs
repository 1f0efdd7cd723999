// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use crate::error::ArgumentError;
use crate::inputs::{Value, downcast};
use crate::key::TypeKey;

type Convert = Arc<dyn Fn(&Value) -> Result<Value, ArgumentError> + Send + Sync>;

/// Exposes a constructor's concrete product under an interface identity.
///
/// ```
/// use std::sync::Arc;
///
/// use wireup::Projection;
///
/// trait Speaker: Send + Sync {}
/// struct Dog;
/// impl Speaker for Dog {}
///
/// let projection = Projection::new::<Dog, dyn Speaker>(|dog| dog);
/// ```
#[derive(Clone)]
pub struct Projection {
    source: TypeKey,
    target: TypeKey,
    convert: Convert,
}

impl Projection {
    /// Projects values of `T` to `I` with `project`, typically an unsizing coercion.
    #[must_use]
    pub fn new<T, I>(project: impl Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        I: ?Sized + Send + Sync + 'static,
    {
        Self {
            source: TypeKey::of::<T>(),
            target: TypeKey::of::<I>(),
            convert: Arc::new(move |value| {
                let concrete = downcast::<T>(value)?;
                Ok(Arc::new(project(concrete)) as Value)
            }),
        }
    }

    /// The concrete type this projection consumes.
    #[must_use]
    pub const fn source(&self) -> TypeKey {
        self.source
    }

    /// The interface identity this projection produces.
    #[must_use]
    pub const fn target(&self) -> TypeKey {
        self.target
    }

    pub(crate) fn apply(&self, value: &Value) -> Result<Value, ArgumentError> {
        (self.convert)(value)
    }
}

impl Debug for Projection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Projection")
            .field("source", &self.source)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

/// Adjusts how a constructor's results are bound.
///
/// The name and group options apply to every result of a constructor whose output is
/// a plain value or a tuple. They cannot be combined with each other, and cannot be
/// used when the output contains a result object, whose fields carry their own
/// annotations.
#[derive(Clone, Debug, Default)]
pub struct ProvideOptions {
    name: Option<String>,
    group: Option<String>,
    projections: Vec<Projection>,
}

impl ProvideOptions {
    /// Options that change nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds every result under `name`.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Contributes every result to `group`.
    #[must_use]
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Exposes the single produced value under `projection`'s interface identity instead
    /// of its concrete type. May be repeated for several interfaces.
    #[must_use]
    pub fn project(mut self, projection: Projection) -> Self {
        self.projections.push(projection);
        self
    }

    pub(crate) fn name_tag(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn group_tag(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub(crate) fn projections(&self) -> &[Projection] {
        &self.projections
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.name.is_none() && self.group.is_none() && self.projections.is_empty()
    }
}

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::any::Any;
use std::sync::Arc;

use crate::error::ArgumentError;
use crate::key::TypeKey;
use crate::shape::{LeafKind, Shape};

/// A type-erased value held by the container. The concrete payload is always an `Arc<T>`.
pub(crate) type Value = Arc<dyn Any + Send + Sync>;

/// Something a constructor or invoke target can receive from the container.
///
/// Implemented for the leaf forms `Arc<T>`, `Option<Arc<T>>` and `Vec<Arc<T>>`, for
/// tuples of inputs, and by hand for composite parameter objects:
///
/// ```
/// use std::sync::Arc;
///
/// use wireup::{ArgumentError, Arguments, Field, In, Shape};
///
/// struct Config;
/// struct Metrics;
///
/// struct Deps {
///     config: Arc<Config>,
///     metrics: Option<Arc<Metrics>>,
/// }
///
/// impl In for Deps {
///     fn shape() -> Shape {
///         Shape::object::<Self>()
///             .field(Field::input::<Arc<Config>>("config").named("primary"))
///             .field(Field::input::<Option<Arc<Metrics>>>("metrics"))
///             .into()
///     }
///
///     fn extract(args: &mut Arguments) -> Result<Self, ArgumentError> {
///         Ok(Self {
///             config: args.next()?,
///             metrics: args.next()?,
///         })
///     }
/// }
/// ```
pub trait In: Sized + 'static {
    /// Describes the bindings this input consumes.
    fn shape() -> Shape;

    /// Pulls this input's values off `args`, in the order declared by [`In::shape`].
    ///
    /// # Errors
    ///
    /// Returns an error if the resolved values do not match the declared shape.
    fn extract(args: &mut Arguments) -> Result<Self, ArgumentError>;
}

/// A resolved parameter position.
#[derive(Debug)]
pub(crate) enum Slot {
    Value(Value),
    Absent,
    Group(Vec<Value>),
}

/// Resolved values for one call, consumed front to back by [`In::extract`].
#[derive(Debug)]
pub struct Arguments {
    slots: std::vec::IntoIter<Slot>,
}

impl Arguments {
    pub(crate) fn new(slots: Vec<Slot>) -> Self {
        Self { slots: slots.into_iter() }
    }

    /// Extracts the next input, which may itself be a nested object.
    ///
    /// # Errors
    ///
    /// Returns an error if the remaining values do not match `T`'s shape.
    pub fn next<T: In>(&mut self) -> Result<T, ArgumentError> {
        T::extract(self)
    }

    fn take(&mut self) -> Result<Slot, ArgumentError> {
        self.slots.next().ok_or(ArgumentError::Exhausted)
    }

    pub(crate) fn remaining(&self) -> usize {
        self.slots.len()
    }
}

pub(crate) fn downcast<T: ?Sized + Send + Sync + 'static>(value: &Value) -> Result<Arc<T>, ArgumentError> {
    value
        .downcast_ref::<Arc<T>>()
        .cloned()
        .ok_or_else(|| ArgumentError::TypeMismatch {
            expected: TypeKey::of::<T>(),
        })
}

const fn unexpected(expected: LeafKind) -> ArgumentError {
    ArgumentError::KindMismatch { expected }
}

impl<T: ?Sized + Send + Sync + 'static> In for Arc<T> {
    fn shape() -> Shape {
        Shape::leaf(TypeKey::of::<T>(), LeafKind::Single)
    }

    fn extract(args: &mut Arguments) -> Result<Self, ArgumentError> {
        match args.take()? {
            Slot::Value(value) => downcast(&value),
            _ => Err(unexpected(LeafKind::Single)),
        }
    }
}

impl<T: ?Sized + Send + Sync + 'static> In for Option<Arc<T>> {
    fn shape() -> Shape {
        Shape::leaf(TypeKey::of::<T>(), LeafKind::Optional)
    }

    fn extract(args: &mut Arguments) -> Result<Self, ArgumentError> {
        match args.take()? {
            Slot::Value(value) => downcast(&value).map(Some),
            Slot::Absent => Ok(None),
            Slot::Group(_) => Err(unexpected(LeafKind::Optional)),
        }
    }
}

impl<T: ?Sized + Send + Sync + 'static> In for Vec<Arc<T>> {
    fn shape() -> Shape {
        Shape::leaf(TypeKey::of::<T>(), LeafKind::Collection)
    }

    fn extract(args: &mut Arguments) -> Result<Self, ArgumentError> {
        match args.take()? {
            Slot::Group(values) => values.iter().map(downcast::<T>).collect(),
            _ => Err(unexpected(LeafKind::Collection)),
        }
    }
}

impl In for () {
    fn shape() -> Shape {
        Shape::anonymous(std::any::type_name::<Self>(), Vec::new())
    }

    fn extract(_args: &mut Arguments) -> Result<Self, ArgumentError> {
        Ok(())
    }
}

macro_rules! impl_in_for_tuple {
    ($($name:ident),+) => {
        impl<$($name: In),+> In for ($($name,)+) {
            fn shape() -> Shape {
                Shape::anonymous(std::any::type_name::<Self>(), vec![$($name::shape()),+])
            }

            fn extract(args: &mut Arguments) -> Result<Self, ArgumentError> {
                Ok(($(args.next::<$name>()?,)+))
            }
        }
    };
}

impl_in_for_tuple!(A1);
impl_in_for_tuple!(A1, A2);
impl_in_for_tuple!(A1, A2, A3);
impl_in_for_tuple!(A1, A2, A3, A4);
impl_in_for_tuple!(A1, A2, A3, A4, A5);
impl_in_for_tuple!(A1, A2, A3, A4, A5, A6);
impl_in_for_tuple!(A1, A2, A3, A4, A5, A6, A7);
impl_in_for_tuple!(A1, A2, A3, A4, A5, A6, A7, A8);

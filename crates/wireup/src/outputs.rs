// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;

use crate::inputs::Value;
use crate::key::TypeKey;
use crate::shape::{LeafKind, Shape};

/// Error type constructors may fail with.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Something a constructor can produce into the container.
///
/// Implemented for `Arc<T>`, for tuples of outputs, and by hand for composite result
/// objects. [`Out::scatter`] must emit values in the order declared by [`Out::shape`].
pub trait Out: Sized + 'static {
    /// Describes the bindings this output produces.
    fn shape() -> Shape;

    /// Hands every produced value to `outputs`.
    fn scatter(self, outputs: &mut Outputs);
}

/// Collects the values scattered by an [`Out`] implementation.
#[derive(Debug, Default)]
pub struct Outputs {
    values: Vec<Value>,
}

impl Outputs {
    /// Emits the next output, which may itself be a nested object.
    pub fn put<T: Out>(&mut self, value: T) {
        value.scatter(self);
    }

    pub(crate) fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl<T: ?Sized + Send + Sync + 'static> Out for Arc<T> {
    fn shape() -> Shape {
        Shape::leaf(TypeKey::of::<T>(), LeafKind::Single)
    }

    fn scatter(self, outputs: &mut Outputs) {
        outputs.values.push(Arc::new(self));
    }
}

macro_rules! impl_out_for_tuple {
    ($($name:ident => $index:tt),+) => {
        impl<$($name: Out),+> Out for ($($name,)+) {
            fn shape() -> Shape {
                Shape::anonymous(std::any::type_name::<Self>(), vec![$($name::shape()),+])
            }

            fn scatter(self, outputs: &mut Outputs) {
                $(outputs.put(self.$index);)+
            }
        }
    };
}

impl_out_for_tuple!(R1 => 0);
impl_out_for_tuple!(R1 => 0, R2 => 1);
impl_out_for_tuple!(R1 => 0, R2 => 1, R3 => 2);
impl_out_for_tuple!(R1 => 0, R2 => 1, R3 => 2, R4 => 3);
impl_out_for_tuple!(R1 => 0, R2 => 1, R3 => 2, R4 => 3, R5 => 4);
impl_out_for_tuple!(R1 => 0, R2 => 1, R3 => 2, R4 => 3, R5 => 4, R6 => 5);
impl_out_for_tuple!(R1 => 0, R2 => 1, R3 => 2, R4 => 3, R5 => 4, R6 => 5, R7 => 6);
impl_out_for_tuple!(R1 => 0, R2 => 1, R3 => 2, R4 => 3, R5 => 4, R6 => 5, R7 => 6, R8 => 7);

/// The return value of a constructor: either an [`Out`] or a `Result` wrapping one.
pub trait Outcome: 'static {
    /// The produced output.
    type Output: Out;

    /// Separates the produced output from a constructor failure.
    ///
    /// # Errors
    ///
    /// Returns the constructor's own error, boxed.
    fn into_result(self) -> Result<Self::Output, BoxError>;
}

impl<O: Out> Outcome for O {
    type Output = O;

    fn into_result(self) -> Result<Self::Output, BoxError> {
        Ok(self)
    }
}

impl<O, E> Outcome for Result<O, E>
where
    O: Out,
    E: Into<BoxError> + 'static,
{
    type Output = O;

    fn into_result(self) -> Result<Self::Output, BoxError> {
        self.map_err(Into::into)
    }
}

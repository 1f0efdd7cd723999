// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::any::type_name;

use crate::error::ArgumentError;
use crate::inputs::{Arguments, In};
use crate::outputs::Outcome;
use crate::shape::Shape;

/// A function the container can register as a constructor.
///
/// Implemented for every `Fn` taking up to eight [`In`] arguments and returning an
/// [`Outcome`]. The `Args` parameter only disambiguates arities and is inferred.
pub trait Constructor<Args>: Send + Sync + 'static {
    /// What the constructor returns.
    type Outcome: Outcome;

    /// The argument list, as an anonymous object of the argument shapes.
    fn params() -> Shape;

    /// Extracts the arguments and calls the function.
    ///
    /// # Errors
    ///
    /// Returns an error if the resolved values do not match the argument shapes.
    fn construct(&self, args: &mut Arguments) -> Result<Self::Outcome, ArgumentError>;
}

/// A function the container can invoke once with resolved arguments.
///
/// Implemented for every `FnOnce` taking up to eight [`In`] arguments.
pub trait Target<Args> {
    /// What the function returns.
    type Output;

    /// The argument list, as an anonymous object of the argument shapes.
    fn params() -> Shape;

    /// Extracts the arguments and calls the function.
    ///
    /// # Errors
    ///
    /// Returns an error if the resolved values do not match the argument shapes.
    fn call(self, args: &mut Arguments) -> Result<Self::Output, ArgumentError>;
}

macro_rules! impl_callables {
    ($($arg:ident),+) => {
        impl<Func, Ret, $($arg),*> Constructor<($($arg,)*)> for Func
        where
            Func: Fn($($arg),*) -> Ret + Send + Sync + 'static,
            Ret: Outcome,
            $($arg: In,)*
        {
            type Outcome = Ret;

            fn params() -> Shape {
                Shape::anonymous(type_name::<Func>(), vec![$($arg::shape()),+])
            }

            fn construct(&self, args: &mut Arguments) -> Result<Ret, ArgumentError> {
                Ok(self($(args.next::<$arg>()?),+))
            }
        }

        impl<Func, Ret, $($arg),*> Target<($($arg,)*)> for Func
        where
            Func: FnOnce($($arg),*) -> Ret,
            $($arg: In,)*
        {
            type Output = Ret;

            fn params() -> Shape {
                Shape::anonymous(type_name::<Func>(), vec![$($arg::shape()),+])
            }

            fn call(self, args: &mut Arguments) -> Result<Ret, ArgumentError> {
                Ok(self($(args.next::<$arg>()?),+))
            }
        }
    };
}

impl<Func, Ret> Constructor<()> for Func
where
    Func: Fn() -> Ret + Send + Sync + 'static,
    Ret: Outcome,
{
    type Outcome = Ret;

    fn params() -> Shape {
        Shape::anonymous(type_name::<Func>(), Vec::new())
    }

    fn construct(&self, _args: &mut Arguments) -> Result<Ret, ArgumentError> {
        Ok(self())
    }
}

impl<Func, Ret> Target<()> for Func
where
    Func: FnOnce() -> Ret,
{
    type Output = Ret;

    fn params() -> Shape {
        Shape::anonymous(type_name::<Func>(), Vec::new())
    }

    fn call(self, _args: &mut Arguments) -> Result<Ret, ArgumentError> {
        Ok(self())
    }
}

impl_callables!(A1);
impl_callables!(A1, A2);
impl_callables!(A1, A2, A3);
impl_callables!(A1, A2, A3, A4);
impl_callables!(A1, A2, A3, A4, A5);
impl_callables!(A1, A2, A3, A4, A5, A6);
impl_callables!(A1, A2, A3, A4, A5, A6, A7);
impl_callables!(A1, A2, A3, A4, A5, A6, A7, A8);

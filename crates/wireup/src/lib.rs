// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Runtime dependency injection built on a graph of constructors.
//!
//! A [`Container`] holds constructors: plain functions whose arguments describe what
//! they need and whose return value describes what they produce. Calling
//! [`Container::invoke`] resolves a function's arguments by running exactly the
//! constructors required, each at most once, and caching what they produce.
//!
//! # Inputs and outputs
//!
//! Arguments and results are shared values:
//!
//! - `Arc<T>` is a required value,
//! - `Option<Arc<T>>` is a value that may have no provider,
//! - `Vec<Arc<T>>` collects every contribution to a value group.
//!
//! Tuples combine several inputs or outputs. Composite parameter and result objects
//! implement [`In`] or [`Out`] and describe their fields with a [`Shape`], which is
//! where names and groups are attached. [`ProvideOptions`] apply a name, a group or
//! interface [`Projection`]s to every result of a constructor.
//!
//! ```
//! use std::sync::Arc;
//!
//! use wireup::{Container, ProvideOptions};
//!
//! struct Handler(&'static str);
//!
//! struct Router {
//!     routes: Vec<&'static str>,
//! }
//!
//! let mut container = Container::new();
//! for route in ["/health", "/users"] {
//!     container.provide_with(move || Arc::new(Handler(route)), ProvideOptions::new().group("routes"))?;
//! }
//!
//! # struct Routes(Vec<Arc<Handler>>);
//! # impl wireup::In for Routes {
//! #     fn shape() -> wireup::Shape {
//! #         wireup::Shape::object::<Self>()
//! #             .field(wireup::Field::input::<Vec<Arc<Handler>>>("handlers").group("routes"))
//! #             .into()
//! #     }
//! #     fn extract(args: &mut wireup::Arguments) -> Result<Self, wireup::ArgumentError> {
//! #         Ok(Self(args.next()?))
//! #     }
//! # }
//! container.provide(|routes: Routes| Arc::new(Router {
//!     routes: routes.0.iter().map(|handler| handler.0).collect(),
//! }))?;
//!
//! let routes = container.invoke(|router: Arc<Router>| router.routes.clone())?;
//! assert_eq!(routes, ["/health", "/users"]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Failures
//!
//! Registration problems surface from [`Container::provide`] as a
//! [`ValidationError`] and leave the container untouched. Resolution problems
//! surface from [`Container::invoke`] as an [`InvokeError`] naming the chain of
//! dependencies that led to the deepest failure. [`Container::visualize`] turns such
//! an error into a [`Diagram`] containing only the constructors involved.

mod constructor;
mod container;
mod ctor;
mod decompose;
mod diagram;
mod error;
mod graph;
mod inputs;
mod key;
mod options;
mod outputs;
mod prune;
mod resolve;
mod shape;

pub use constructor::{Constructor, Target};
pub use container::{Container, ContainerBuilder, VisualizeOptions};
pub use ctor::{CtorId, Origin, Param, ResultNode};
pub use diagram::{CtorNode, Diagram, Edge, GroupMember, GroupNode, Status};
pub use error::{ArgumentError, Cause, CycleLink, Frame, InvokeError, ValidationError};
pub use inputs::{Arguments, In};
pub use key::{Binding, TypeKey};
pub use options::{Projection, ProvideOptions};
pub use outputs::{BoxError, Out, Outcome, Outputs};
pub use shape::{Field, Leaf, LeafKind, ObjectShape, Shape};

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The container and its builder.

use std::any::type_name;
use std::fmt::{self, Display, Formatter};
use std::panic::Location;

use crate::constructor::{Constructor, Target};
use crate::ctor::{self, Failure, Origin};
use crate::decompose;
use crate::diagram::Diagram;
use crate::error::{ArgumentError, Cause, InvokeError, Owner, ValidationError};
use crate::graph::Graph;
use crate::options::ProvideOptions;
use crate::outputs::{Out, Outcome, Outputs};
use crate::prune;
use crate::resolve::Resolver;

/// A dependency-injection container.
///
/// Constructors are registered with [`provide`](Self::provide) and run lazily, at most
/// once each, when [`invoke`](Self::invoke) needs their results.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use wireup::Container;
///
/// struct Config {
///     port: u16,
/// }
///
/// struct Server {
///     config: Arc<Config>,
/// }
///
/// let mut container = Container::new();
/// container.provide(|| Arc::new(Config { port: 8080 }))?;
/// container.provide(|config: Arc<Config>| Arc::new(Server { config }))?;
///
/// let port = container.invoke(|server: Arc<Server>| server.config.port)?;
/// assert_eq!(port, 8080);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Container {
    graph: Graph,
    recover_from_panics: bool,
}

impl Container {
    /// Creates an empty container with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts configuring a container.
    #[must_use]
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    /// Registers a constructor.
    ///
    /// The constructor's arguments are resolved from the container; each value it
    /// produces becomes available to later consumers.
    ///
    /// # Errors
    ///
    /// Returns an error if the constructor's shapes are malformed or if one of its
    /// results is already provided. The container is unchanged in that case.
    #[track_caller]
    pub fn provide<Args, C>(&mut self, constructor: C) -> Result<(), ValidationError>
    where
        C: Constructor<Args>,
    {
        self.provide_with(constructor, ProvideOptions::new())
    }

    /// Registers a constructor, binding its results as `options` describe.
    ///
    /// # Errors
    ///
    /// Returns an error if the constructor's shapes are malformed, if `options` do not
    /// apply to its output, or if one of its results is already provided. The
    /// container is unchanged in that case.
    #[track_caller]
    pub fn provide_with<Args, C>(&mut self, constructor: C, options: ProvideOptions) -> Result<(), ValidationError>
    where
        C: Constructor<Args>,
    {
        let origin = Origin::new(type_name::<C>(), Location::caller());

        let params = decompose::params(&C::params()).inspect_err(|error| rejected(origin, error))?;
        let results = decompose::results(&<<C::Outcome as Outcome>::Output as Out>::shape(), &options)
            .inspect_err(|error| rejected(origin, error))?;

        let handle = ctor::handle(move |args| {
            let outcome = constructor.construct(args).map_err(Failure::Arguments)?;
            let output = outcome.into_result().map_err(Failure::Constructor)?;
            let mut outputs = Outputs::default();
            output.scatter(&mut outputs);
            Ok(outputs.into_values())
        });

        let param_count = params.len();
        let result_count = results.declared.len();

        let id = self
            .graph
            .register(origin, params, results.declared, results.outputs, handle)
            .inspect_err(|error| rejected(origin, error))?;

        tracing::debug!(
            ctor = %origin,
            id = id.index(),
            params = param_count,
            results = result_count,
            "constructor registered"
        );

        Ok(())
    }

    /// Resolves `target`'s arguments, running whatever constructors they need, and calls it.
    ///
    /// # Errors
    ///
    /// Returns an error if an argument has no provider, if the dependencies form a
    /// cycle, or if a constructor fails. The error names the chain of dependencies
    /// that led to the failure.
    #[track_caller]
    pub fn invoke<Args, F>(&mut self, target: F) -> Result<<F as Target<Args>>::Output, InvokeError>
    where
        F: Target<Args>,
    {
        let origin = Origin::new(type_name::<F>(), Location::caller());

        let params = decompose::params(&F::params())
            .map_err(|source| InvokeError::unattributed(Cause::InvalidTarget { origin, source }))?;

        tracing::debug!(invoked = %origin, params = params.len(), "invoking");

        let mut args = Resolver::new(&mut self.graph, self.recover_from_panics)
            .arguments(Owner::Target(origin), &params)
            .inspect_err(|error| tracing::debug!(invoked = %origin, error = %error, "invoke failed"))?;

        let output = Target::call(target, &mut args)
            .map_err(|source| InvokeError::unattributed(Cause::Argument { origin, source }))?;

        if args.remaining() > 0 {
            return Err(InvokeError::unattributed(Cause::Argument {
                origin,
                source: ArgumentError::Leftover {
                    remaining: args.remaining(),
                },
            }));
        }

        Ok(output)
    }

    /// Describes every registered constructor and value group.
    #[must_use]
    pub fn create_graph(&self) -> Diagram {
        prune::render(&self.graph, None)
    }

    /// Describes the graph; given a failure from this container, only the part of the
    /// graph that explains it.
    #[must_use]
    pub fn visualize(&self, options: VisualizeOptions<'_>) -> Diagram {
        prune::render(&self.graph, options.error)
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

fn rejected(origin: Origin, error: &ValidationError) {
    tracing::debug!(ctor = %origin, error = %error, "constructor rejected");
}

/// Configures a [`Container`].
#[derive(Debug, Clone, Default)]
pub struct ContainerBuilder {
    recover_from_panics: bool,
}

impl ContainerBuilder {
    fn new() -> Self {
        Self::default()
    }

    /// Converts constructor panics into [`Cause::Panic`] errors instead of unwinding
    /// through [`Container::invoke`]. Disabled by default.
    #[must_use]
    pub const fn recover_from_panics(mut self, enabled: bool) -> Self {
        self.recover_from_panics = enabled;
        self
    }

    /// Creates the container.
    #[must_use]
    pub fn build(self) -> Container {
        Container {
            graph: Graph::default(),
            recover_from_panics: self.recover_from_panics,
        }
    }
}

/// Options for [`Container::visualize`].
#[derive(Debug, Clone, Copy, Default)]
pub struct VisualizeOptions<'a> {
    error: Option<&'a InvokeError>,
}

impl<'a> VisualizeOptions<'a> {
    /// Renders the whole graph.
    #[must_use]
    pub const fn new() -> Self {
        Self { error: None }
    }

    /// Prunes the rendered graph to the constructors involved in `error`.
    #[must_use]
    pub const fn error(mut self, error: &'a InvokeError) -> Self {
        self.error = Some(error);
        self
    }
}

impl Display for VisualizeOptions<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.error {
            Some(error) => write!(f, "VisualizeError({error})"),
            None => f.write_str("VisualizeError(<none>)"),
        }
    }
}

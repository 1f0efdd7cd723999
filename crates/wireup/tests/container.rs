// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(missing_docs, reason = "This is a test module")]

//! Integration tests for registering constructors and invoking targets.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use static_assertions::assert_impl_all;
use wireup::{
    ArgumentError, Arguments, Binding, Cause, Container, Field, In, InvokeError, Out, Outputs, Projection, ProvideOptions, ResultNode,
    Shape,
};

assert_impl_all!(Container: Send, Sync);
assert_impl_all!(InvokeError: Send, Sync, Clone, std::error::Error);

#[derive(Debug)]
struct Config {
    port: u16,
}

struct Database {
    url: String,
}

struct Cache;

trait Speaker: Send + Sync {
    fn speak(&self) -> String;
}

trait Named: Send + Sync {
    fn name(&self) -> &'static str;
}

struct Dog;

impl Speaker for Dog {
    fn speak(&self) -> String {
        "woof".to_string()
    }
}

impl Named for Dog {
    fn name(&self) -> &'static str {
        "rex"
    }
}

/// Consumes a named primary database, an optional cache and a nested config object.
struct Services {
    primary: Arc<Database>,
    cache: Option<Arc<Cache>>,
    settings: Settings,
}

struct Settings {
    config: Arc<Config>,
}

impl In for Settings {
    fn shape() -> Shape {
        Shape::object::<Self>().field(Field::input::<Arc<Config>>("config")).into()
    }

    fn extract(args: &mut Arguments) -> Result<Self, ArgumentError> {
        Ok(Self { config: args.next()? })
    }
}

impl In for Services {
    fn shape() -> Shape {
        Shape::object::<Self>()
            .field(Field::input::<Arc<Database>>("primary").named("primary"))
            .field(Field::input::<Option<Arc<Cache>>>("cache"))
            .field(Field::input::<Settings>("settings"))
            .into()
    }

    fn extract(args: &mut Arguments) -> Result<Self, ArgumentError> {
        Ok(Self {
            primary: args.next()?,
            cache: args.next()?,
            settings: args.next()?,
        })
    }
}

/// Produces a primary and a replica database from one constructor.
struct Databases {
    primary: Arc<Database>,
    replica: Arc<Database>,
}

impl Out for Databases {
    fn shape() -> Shape {
        Shape::object::<Self>()
            .field(Field::output::<Arc<Database>>("primary").named("primary"))
            .field(Field::output::<Arc<Database>>("replica").named("replica"))
            .into()
    }

    fn scatter(self, outputs: &mut Outputs) {
        outputs.put(self.primary);
        outputs.put(self.replica);
    }
}

fn databases() -> Databases {
    Databases {
        primary: Arc::new(Database {
            url: "db://primary".to_string(),
        }),
        replica: Arc::new(Database {
            url: "db://replica".to_string(),
        }),
    }
}

/// Three levels of result objects: `Stack` holds `Storage`, which holds `Caches`.
struct Stack {
    config: Arc<Config>,
    storage: Storage,
}

struct Storage {
    primary: Arc<Database>,
    caches: Caches,
}

struct Caches {
    local: Arc<Cache>,
}

impl Out for Caches {
    fn shape() -> Shape {
        Shape::object::<Self>().field(Field::output::<Arc<Cache>>("local").named("local")).into()
    }

    fn scatter(self, outputs: &mut Outputs) {
        outputs.put(self.local);
    }
}

impl Out for Storage {
    fn shape() -> Shape {
        Shape::object::<Self>()
            .field(Field::output::<Arc<Database>>("primary").named("primary"))
            .field(Field::output::<Caches>("caches"))
            .into()
    }

    fn scatter(self, outputs: &mut Outputs) {
        outputs.put(self.primary);
        outputs.put(self.caches);
    }
}

impl Out for Stack {
    fn shape() -> Shape {
        Shape::object::<Self>()
            .field(Field::output::<Arc<Config>>("config"))
            .field(Field::output::<Storage>("storage"))
            .into()
    }

    fn scatter(self, outputs: &mut Outputs) {
        outputs.put(self.config);
        outputs.put(self.storage);
    }
}

struct LocalCache(Arc<Cache>);

impl In for LocalCache {
    fn shape() -> Shape {
        Shape::object::<Self>().field(Field::input::<Arc<Cache>>("0").named("local")).into()
    }

    fn extract(args: &mut Arguments) -> Result<Self, ArgumentError> {
        Ok(Self(args.next()?))
    }
}

#[test]
fn resolves_dependencies_in_order() {
    let mut container = Container::new();
    container.provide(|| Arc::new(Config { port: 5432 })).unwrap();
    container
        .provide(|config: Arc<Config>| {
            Arc::new(Database {
                url: format!("db://localhost:{}", config.port),
            })
        })
        .unwrap();

    let url = container.invoke(|db: Arc<Database>| db.url.clone()).unwrap();

    assert_eq!(url, "db://localhost:5432");
}

#[test]
fn registration_order_does_not_matter() {
    let mut container = Container::new();
    container
        .provide(|config: Arc<Config>| Arc::new(Database { url: config.port.to_string() }))
        .unwrap();
    container.provide(|| Arc::new(Config { port: 1 })).unwrap();

    let url = container.invoke(|db: Arc<Database>| db.url.clone()).unwrap();

    assert_eq!(url, "1");
}

#[test]
fn composite_objects_flatten_and_resolve() {
    let mut container = Container::new();
    container.provide(databases).unwrap();
    container.provide(|| Arc::new(Config { port: 7 })).unwrap();

    let (url, has_cache, port) = container
        .invoke(|services: Services| (services.primary.url.clone(), services.cache.is_some(), services.settings.config.port))
        .unwrap();

    assert_eq!(url, "db://primary");
    assert!(!has_cache);
    assert_eq!(port, 7);
}

#[test]
fn each_constructor_runs_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let mut container = Container::new();
    container
        .provide(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Arc::new(Config { port: 1 })
        })
        .unwrap();
    container
        .provide(|config: Arc<Config>| Arc::new(Database { url: config.port.to_string() }))
        .unwrap();

    let first = container.invoke(|config: Arc<Config>, db: Arc<Database>| (config, db)).unwrap();
    let second = container.invoke(|config: Arc<Config>| config).unwrap();

    assert!(Arc::ptr_eq(&first.0, &second));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn tuple_results_come_from_one_invocation() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let mut container = Container::new();
    container
        .provide(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            (Arc::new(Config { port: 2 }), Arc::new(Cache))
        })
        .unwrap();

    container.invoke(|_: Arc<Config>| ()).unwrap();
    container.invoke(|_: Arc<Cache>| ()).unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn names_select_between_providers() {
    let mut container = Container::new();
    container.provide(databases).unwrap();

    let replica = container
        .invoke(|dbs: NamedReplica| dbs.0.url.clone())
        .unwrap();

    assert_eq!(replica, "db://replica");
}

struct NamedReplica(Arc<Database>);

impl In for NamedReplica {
    fn shape() -> Shape {
        Shape::object::<Self>()
            .field(Field::input::<Arc<Database>>("0").named("replica"))
            .into()
    }

    fn extract(args: &mut Arguments) -> Result<Self, ArgumentError> {
        Ok(Self(args.next()?))
    }
}

#[test]
fn name_option_binds_plain_results() {
    let mut container = Container::new();
    container
        .provide_with(|| Arc::new(Database { url: "named".to_string() }), ProvideOptions::new().name("primary"))
        .unwrap();

    let error = container.invoke(|_: Arc<Database>| ()).unwrap_err();
    assert!(error.is_missing_dependency());

    container.provide(|| Arc::new(Config { port: 3 })).unwrap();
    let url = container
        .invoke(|services: Services| services.primary.url.clone())
        .unwrap();
    assert_eq!(url, "named");
}

#[test]
fn projections_share_one_invocation() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let mut container = Container::new();
    container
        .provide_with(
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Arc::new(Dog)
            },
            ProvideOptions::new()
                .project(Projection::new::<Dog, dyn Speaker>(|dog| dog))
                .project(Projection::new::<Dog, dyn Named>(|dog| dog)),
        )
        .unwrap();

    let (sound, name) = container
        .invoke(|speaker: Arc<dyn Speaker>, named: Arc<dyn Named>| (speaker.speak(), named.name()))
        .unwrap();

    assert_eq!(sound, "woof");
    assert_eq!(name, "rex");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn projected_constructor_no_longer_provides_concrete_type() {
    let mut container = Container::new();
    container
        .provide_with(|| Arc::new(Dog), ProvideOptions::new().project(Projection::new::<Dog, dyn Speaker>(|dog| dog)))
        .unwrap();

    let error = container.invoke(|_: Arc<Dog>| ()).unwrap_err();

    assert!(error.is_missing_dependency());
}

#[test]
fn constructor_errors_are_wrapped_with_the_chain() {
    let mut container = Container::new();
    container
        .provide(|| -> Result<Arc<Config>, std::io::Error> { Err(std::io::Error::other("great sadness")) })
        .unwrap();
    container
        .provide(|config: Arc<Config>| Arc::new(Database { url: config.port.to_string() }))
        .unwrap();

    let error = container.invoke(|_: Arc<Database>| ()).unwrap_err();

    assert!(error.is_constructor_failure());
    let message = error.to_string();
    assert!(message.starts_with("could not build arguments for "), "{message}");
    assert!(message.contains("failed to build container::Database"), "{message}");
    assert!(message.contains("failed to build container::Config"), "{message}");
    assert!(message.ends_with("failed: great sadness"), "{message}");
    assert_eq!(error.frames().count(), 2);
}

#[test]
fn fallible_constructors_succeed() {
    let mut container = Container::new();
    container
        .provide(|| Ok::<_, std::io::Error>(Arc::new(Config { port: 9 })))
        .unwrap();

    let port = container.invoke(|config: Arc<Config>| config.port).unwrap();

    assert_eq!(port, 9);
}

#[test]
fn panics_are_recovered_when_configured() {
    let mut container = Container::builder().recover_from_panics(true).build();
    container
        .provide(|| -> Arc<Config> { panic!("great sadness") })
        .unwrap();

    let error = container.invoke(|_: Arc<Config>| ()).unwrap_err();

    match error.cause() {
        Cause::Panic { message, .. } => assert_eq!(message, "great sadness"),
        other => panic!("expected a panic, got {other}"),
    }
}

#[test]
#[should_panic]
fn panics_unwind_by_default() {
    let mut container = Container::new();
    container
        .provide(|| -> Arc<Config> { panic!("great sadness") })
        .unwrap();

    let _ = container.invoke(|_: Arc<Config>| ());
}

#[test]
fn invalid_target_is_reported() {
    let mut container = Container::new();

    let error = container.invoke(|_: Vec<Arc<Config>>| ()).unwrap_err();

    assert!(matches!(error.cause(), Cause::InvalidTarget { .. }));
}

#[test]
fn nested_result_objects_flatten_and_come_from_one_invocation() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let mut container = Container::new();
    container
        .provide(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Stack {
                config: Arc::new(Config { port: 11 }),
                storage: Storage {
                    primary: Arc::new(Database {
                        url: "db://nested".to_string(),
                    }),
                    caches: Caches { local: Arc::new(Cache) },
                },
            }
        })
        .unwrap();

    let diagram = container.create_graph();
    assert_eq!(
        diagram.ctors()[0].results(),
        [
            ResultNode::new(Binding::of::<Config>(), 0),
            ResultNode::new(Binding::of::<Database>().named("primary"), 0),
            ResultNode::new(Binding::of::<Cache>().named("local"), 0),
        ]
    );

    let port = container.invoke(|config: Arc<Config>| config.port).unwrap();
    let url = container
        .invoke(|services: Services| services.primary.url.clone())
        .unwrap();
    let local = container.invoke(|cache: LocalCache| cache.0).unwrap();

    assert_eq!(port, 11);
    assert_eq!(url, "db://nested");
    assert!(Arc::ptr_eq(&local, &container.invoke(|cache: LocalCache| cache.0).unwrap()));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

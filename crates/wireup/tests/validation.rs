// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(dead_code, reason = "This is a test module")]
#![allow(missing_docs, reason = "This is a test module")]

//! Integration tests for registration-time validation.

use std::sync::Arc;

use rstest::rstest;
use wireup::{
    ArgumentError, Arguments, Container, Field, In, LeafKind, Out, Outputs, Projection, ProvideOptions, Shape, TypeKey,
    ValidationError,
};

struct Alpha;
struct Beta;

trait Speaker: Send + Sync {}
impl Speaker for Alpha {}

/// An input object whose shape is entirely described by `SHAPE`.
struct Input<const SHAPE: u8>;

impl<const SHAPE: u8> In for Input<SHAPE> {
    fn shape() -> Shape {
        let object = Shape::object::<Self>();
        let object = match SHAPE {
            0 => object.field(Field::input::<Vec<Arc<Alpha>>>("both").named("n").group("g")),
            1 => object.field(Field::input::<Option<Arc<Alpha>>>("optional").group("g")),
            2 => object.field(Field::input::<Arc<Alpha>>("single").group("g")),
            3 => object.field(Field::input::<Vec<Arc<Alpha>>>("bare")),
            4 => object.field(Field::input::<(Arc<Alpha>,)>("nested").named("n")),
            5 => object.field(Field::private("secret")),
            _ => object.field(Field::private("secret")).ignore_private(),
        };
        object.into()
    }

    fn extract(_args: &mut Arguments) -> Result<Self, ArgumentError> {
        Ok(Self)
    }
}

/// Produces an optional leaf, which results cannot be.
struct OptionalOutput;

impl Out for OptionalOutput {
    fn shape() -> Shape {
        Shape::leaf(TypeKey::of::<Alpha>(), LeafKind::Optional)
    }

    fn scatter(self, _outputs: &mut Outputs) {}
}

/// Produces nothing at all.
struct EmptyOutput;

impl Out for EmptyOutput {
    fn shape() -> Shape {
        Shape::object::<Self>().into()
    }

    fn scatter(self, _outputs: &mut Outputs) {}
}

/// A result object with its own annotations.
struct Annotated {
    alpha: Arc<Alpha>,
}

impl Out for Annotated {
    fn shape() -> Shape {
        Shape::object::<Self>()
            .field(Field::output::<Arc<Alpha>>("alpha").named("a"))
            .into()
    }

    fn scatter(self, outputs: &mut Outputs) {
        outputs.put(self.alpha);
    }
}

fn alpha() -> Arc<Alpha> {
    Arc::new(Alpha)
}

fn speaker() -> Projection {
    Projection::new::<Alpha, dyn Speaker>(|alpha| alpha)
}

type Attempt = fn(&mut Container) -> Result<(), ValidationError>;

#[rstest]
#[case::name_and_group(|c: &mut Container| c.provide(|_: Input<0>| alpha()))]
#[case::optional_group(|c: &mut Container| c.provide(|_: Input<1>| alpha()))]
#[case::group_not_collection(|c: &mut Container| c.provide(|_: Input<2>| alpha()))]
#[case::ungrouped_collection(|c: &mut Container| c.provide(|_: Input<3>| alpha()))]
#[case::annotated_object(|c: &mut Container| c.provide(|_: Input<4>| alpha()))]
#[case::private_field(|c: &mut Container| c.provide(|_: Input<5>| alpha()))]
#[case::optional_result(|c: &mut Container| c.provide(|| OptionalOutput))]
#[case::no_results(|c: &mut Container| c.provide(|| EmptyOutput))]
#[case::conflicting_options(|c: &mut Container| c.provide_with(alpha, ProvideOptions::new().name("n").group("g")))]
#[case::option_on_result_object(|c: &mut Container| c.provide_with(|| Annotated { alpha: alpha() }, ProvideOptions::new().name("n")))]
#[case::projection_arity(|c: &mut Container| c.provide_with(|| (alpha(), Arc::new(Beta)), ProvideOptions::new().project(speaker())))]
#[case::projection_mismatch(|c: &mut Container| c.provide_with(|| Arc::new(Beta), ProvideOptions::new().project(speaker())))]
#[case::duplicate_projection(|c: &mut Container| c.provide_with(alpha, ProvideOptions::new().project(speaker()).project(speaker())))]
#[case::duplicate_result(|c: &mut Container| c.provide(|| (alpha(), alpha())))]
fn invalid_registrations_are_rejected(#[case] attempt: Attempt) {
    let mut container = Container::new();

    let error = attempt(&mut container).unwrap_err();

    assert!(container.create_graph().ctors().is_empty(), "rejected with {error} but registered anyway");
}

#[rstest]
#[case::name_and_group(0)]
#[case::optional_group(1)]
#[case::group_not_collection(2)]
#[case::ungrouped_collection(3)]
#[case::annotated_object(4)]
#[case::private_field(5)]
fn invalid_inputs_report_the_field(#[case] shape: u8) {
    let mut container = Container::new();

    let error = match shape {
        0 => container.provide(|_: Input<0>| alpha()),
        1 => container.provide(|_: Input<1>| alpha()),
        2 => container.provide(|_: Input<2>| alpha()),
        3 => container.provide(|_: Input<3>| alpha()),
        4 => container.provide(|_: Input<4>| alpha()),
        _ => container.provide(|_: Input<5>| alpha()),
    }
    .unwrap_err();

    let expected = ["both", "optional", "single", "bare", "nested", "secret"][usize::from(shape)];
    let field = match error {
        ValidationError::NameAndGroup { field, .. }
        | ValidationError::OptionalGroup { field, .. }
        | ValidationError::GroupNotCollection { field, .. }
        | ValidationError::UngroupedCollection { field, .. }
        | ValidationError::AnnotatedObject { field, .. }
        | ValidationError::PrivateField { field, .. } => field,
        other => panic!("unexpected error: {other}"),
    };
    assert_eq!(field, expected);
}

#[test]
fn ignored_private_fields_are_accepted() {
    let mut container = Container::new();

    container.provide(|_: Input<6>| alpha()).unwrap();

    assert_eq!(container.create_graph().ctors()[0].params().len(), 0);
}

#[test]
fn duplicate_provider_is_rejected_and_names_the_existing_one() {
    let mut container = Container::new();
    container.provide(alpha).unwrap();

    let error = container.provide(|| Arc::new(Alpha)).unwrap_err();

    match &error {
        ValidationError::AlreadyProvided { existing, .. } => assert!(existing.name().ends_with("alpha"), "{error}"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(container.create_graph().ctors().len(), 1);
}

#[test]
fn rejected_group_registration_does_not_consume_an_index() {
    let mut container = Container::new();
    container.provide(alpha).unwrap();

    container
        .provide_with(|| (Arc::new(Beta), alpha()), ProvideOptions::new().group("g"))
        .unwrap();
    container
        .provide(|| (Arc::new(Beta), alpha()))
        .unwrap_err();
    container
        .provide_with(|| Arc::new(Beta), ProvideOptions::new().group("g"))
        .unwrap();

    let diagram = container.create_graph();
    assert_eq!(diagram.ctors().len(), 3);
    assert_eq!(diagram.ctors()[2].results()[0].group_index(), 1);
}

#[test]
fn names_and_groups_keep_bindings_apart() {
    let mut container = Container::new();

    container.provide(alpha).unwrap();
    container.provide_with(alpha, ProvideOptions::new().name("other")).unwrap();
    container.provide_with(alpha, ProvideOptions::new().group("many")).unwrap();
    container.provide_with(alpha, ProvideOptions::new().group("many")).unwrap();

    assert_eq!(container.create_graph().ctors().len(), 4);
}

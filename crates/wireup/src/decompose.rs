// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Flattens declared shapes into parameter and result lists.

use std::collections::HashSet;

use crate::ctor::{Declared, Param};
use crate::error::ValidationError;
use crate::key::Binding;
use crate::options::ProvideOptions;
use crate::shape::{Field, FieldContent, Leaf, LeafKind, ObjectShape, Shape};

/// The flattened outputs of one constructor.
#[derive(Debug)]
pub(crate) struct Results {
    pub(crate) declared: Vec<Declared>,
    /// Number of values the constructor scatters.
    pub(crate) outputs: usize,
}

/// Flattens an input shape, nested objects expanded in field order.
pub(crate) fn params(shape: &Shape) -> Result<Vec<Param>, ValidationError> {
    let mut params = Vec::new();
    collect_params(shape, None, &mut params)?;
    Ok(params)
}

fn collect_params(shape: &Shape, field: Option<(&ObjectShape, &Field)>, out: &mut Vec<Param>) -> Result<(), ValidationError> {
    match shape {
        Shape::Leaf(leaf) => {
            out.push(param(leaf, field)?);
            Ok(())
        }
        Shape::Object(object) => {
            reject_annotated_object(field)?;
            for_each_exposed(object, |shape, field| collect_params(shape, Some((object, field)), out))
        }
    }
}

fn param(leaf: &Leaf, field: Option<(&ObjectShape, &Field)>) -> Result<Param, ValidationError> {
    let (name, group) = tags(field);

    let invalid = |make: fn(&'static str, &'static str) -> ValidationError| {
        let (object, label) = location(field);
        make(object, label)
    };

    match (leaf.kind(), name, group) {
        (_, Some(_), Some(_)) => Err(invalid(|object, field| ValidationError::NameAndGroup { object, field })),
        (LeafKind::Optional, _, Some(_)) => Err(invalid(|object, field| ValidationError::OptionalGroup { object, field })),
        (LeafKind::Single, _, Some(_)) => Err(invalid(|object, field| ValidationError::GroupNotCollection { object, field })),
        (LeafKind::Collection, _, None) => Err(invalid(|object, field| ValidationError::UngroupedCollection { object, field })),
        (kind, name, group) => Ok(Param::new(
            Binding::with_parts(leaf.ty(), name.map(str::to_string), group.map(str::to_string)),
            kind == LeafKind::Optional,
        )),
    }
}

/// Flattens an output shape and applies the provide options.
pub(crate) fn results(shape: &Shape, options: &ProvideOptions) -> Result<Results, ValidationError> {
    if options.name_tag().is_some() && options.group_tag().is_some() {
        return Err(ValidationError::ConflictingOptions);
    }

    if let Some(object) = first_result_object(shape).filter(|_| !options.is_empty()) {
        return Err(ValidationError::OptionOnResultObject { object });
    }

    let mut leaves = Vec::new();
    collect_results(shape, None, options, &mut leaves)?;

    if leaves.is_empty() {
        return Err(ValidationError::NoResults);
    }

    let outputs = leaves.len();
    let projections = options.projections();

    if projections.is_empty() {
        let declared = leaves
            .into_iter()
            .enumerate()
            .map(|(output, binding)| Declared {
                binding,
                output,
                projection: None,
            })
            .collect();
        return Ok(Results { declared, outputs });
    }

    let [produced] = leaves.as_slice() else {
        return Err(ValidationError::ProjectionArity { results: outputs });
    };

    let mut targets = HashSet::new();
    let mut declared = Vec::with_capacity(projections.len());

    for projection in projections {
        if projection.source() != produced.ty() {
            return Err(ValidationError::ProjectionMismatch {
                expected: projection.source(),
                produced: produced.ty(),
            });
        }

        if !targets.insert(projection.target()) {
            return Err(ValidationError::DuplicateProjection {
                target: projection.target(),
            });
        }

        declared.push(Declared {
            binding: Binding::with_parts(
                projection.target(),
                produced.name().map(str::to_string),
                produced.group().map(str::to_string),
            ),
            output: 0,
            projection: Some(projection.clone()),
        });
    }

    Ok(Results { declared, outputs })
}

fn collect_results(
    shape: &Shape,
    field: Option<(&ObjectShape, &Field)>,
    options: &ProvideOptions,
    out: &mut Vec<Binding>,
) -> Result<(), ValidationError> {
    match shape {
        Shape::Leaf(leaf) => {
            if leaf.kind() != LeafKind::Single {
                return Err(ValidationError::InvalidResultLeaf {
                    ty: leaf.ty(),
                    kind: leaf.kind(),
                });
            }

            let (name, group) = match tags(field) {
                (None, None) => (options.name_tag(), options.group_tag()),
                tags => tags,
            };

            if name.is_some() && group.is_some() {
                let (object, field) = location(field);
                return Err(ValidationError::NameAndGroup { object, field });
            }

            out.push(Binding::with_parts(leaf.ty(), name.map(str::to_string), group.map(str::to_string)));
            Ok(())
        }
        Shape::Object(object) => {
            reject_annotated_object(field)?;
            for_each_exposed(object, |shape, field| collect_results(shape, Some((object, field)), options, out))
        }
    }
}

fn first_result_object(shape: &Shape) -> Option<&'static str> {
    let Shape::Object(object) = shape else {
        return None;
    };

    if !object.is_anonymous() {
        return Some(object.type_name());
    }

    object.fields().iter().find_map(|field| match field.content() {
        FieldContent::Exposed(shape) => first_result_object(shape),
        FieldContent::Private => None,
    })
}

fn for_each_exposed(
    object: &ObjectShape,
    mut visit: impl FnMut(&Shape, &Field) -> Result<(), ValidationError>,
) -> Result<(), ValidationError> {
    for field in object.fields() {
        match field.content() {
            FieldContent::Exposed(shape) => visit(shape, field)?,
            FieldContent::Private if object.ignores_private() => {}
            FieldContent::Private => {
                return Err(ValidationError::PrivateField {
                    object: object.type_name(),
                    field: field.label(),
                });
            }
        }
    }

    Ok(())
}

fn reject_annotated_object(field: Option<(&ObjectShape, &Field)>) -> Result<(), ValidationError> {
    match tags(field) {
        (None, None) => Ok(()),
        _ => {
            let (object, field) = location(field);
            Err(ValidationError::AnnotatedObject { object, field })
        }
    }
}

fn tags<'a>(field: Option<(&ObjectShape, &'a Field)>) -> (Option<&'a str>, Option<&'a str>) {
    field.map_or((None, None), |(_, field)| (field.name_tag(), field.group_tag()))
}

fn location(field: Option<(&ObjectShape, &Field)>) -> (&'static str, &'static str) {
    field.map_or(("<root>", "<root>"), |(object, field)| (object.type_name(), field.label()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::inputs::{Arguments, In};
    use crate::key::TypeKey;
    use crate::options::Projection;
    use crate::outputs::{Out, Outputs};
    use crate::shape::Field;

    struct Alpha;
    struct Beta;

    trait Speaker: Send + Sync {}
    impl Speaker for Alpha {}

    struct Nested;

    impl In for Nested {
        fn shape() -> Shape {
            Shape::object::<Self>()
                .field(Field::input::<Arc<Alpha>>("alpha").named("primary"))
                .field(Field::input::<Vec<Arc<Beta>>>("betas").group("all"))
                .into()
        }

        fn extract(_args: &mut Arguments) -> Result<Self, crate::ArgumentError> {
            Ok(Self)
        }
    }

    struct Produced;

    impl Out for Produced {
        fn shape() -> Shape {
            Shape::object::<Self>()
                .field(Field::output::<Arc<Alpha>>("alpha").group("all"))
                .field(Field::private("cache"))
                .ignore_private()
                .into()
        }

        fn scatter(self, _outputs: &mut Outputs) {}
    }

    #[test]
    fn nested_params_flatten_in_order() {
        let params = params(&<(Option<Arc<Beta>>, Nested)>::shape()).unwrap();

        assert_eq!(
            params,
            vec![
                Param::new(Binding::of::<Beta>(), true),
                Param::new(Binding::of::<Alpha>().named("primary"), false),
                Param::new(Binding::of::<Beta>().grouped("all"), false),
            ]
        );
    }

    #[test]
    fn bare_collection_parameter_is_rejected() {
        let error = params(&<(Vec<Arc<Beta>>,)>::shape()).unwrap_err();

        assert!(matches!(error, ValidationError::UngroupedCollection { field: "0", .. }));
    }

    #[test]
    fn options_apply_to_every_tuple_result() {
        let results = results(&<(Arc<Alpha>, Arc<Beta>) as Out>::shape(), &ProvideOptions::new().name("n")).unwrap();

        let bindings: Vec<_> = results.declared.iter().map(|d| d.binding.clone()).collect();
        assert_eq!(bindings, vec![Binding::of::<Alpha>().named("n"), Binding::of::<Beta>().named("n")]);
        assert_eq!(results.outputs, 2);
    }

    #[test]
    fn options_are_rejected_on_result_objects() {
        let error = results(&Produced::shape(), &ProvideOptions::new().group("g")).unwrap_err();

        assert!(matches!(error, ValidationError::OptionOnResultObject { .. }));
    }

    #[test]
    fn result_objects_skip_ignored_private_fields() {
        let results = results(&Produced::shape(), &ProvideOptions::new()).unwrap();

        assert_eq!(results.declared.len(), 1);
        assert_eq!(results.declared[0].binding, Binding::of::<Alpha>().grouped("all"));
    }

    #[test]
    fn projection_replaces_concrete_result() {
        let options = ProvideOptions::new().project(Projection::new::<Alpha, dyn Speaker>(|alpha| alpha));

        let results = results(&<Arc<Alpha> as Out>::shape(), &options).unwrap();

        assert_eq!(results.declared.len(), 1);
        assert_eq!(results.declared[0].binding.ty(), TypeKey::of::<dyn Speaker>());
        assert!(results.declared[0].projection.is_some());
    }

    #[test]
    fn projection_requires_single_result() {
        let options = ProvideOptions::new().project(Projection::new::<Alpha, dyn Speaker>(|alpha| alpha));

        let error = results(&<(Arc<Alpha>, Arc<Beta>) as Out>::shape(), &options).unwrap_err();

        assert!(matches!(error, ValidationError::ProjectionArity { results: 2 }));
    }
}

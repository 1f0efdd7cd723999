// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Declarative descriptions of constructor inputs and outputs.
//!
//! A [`Shape`] is either a single leaf binding or an object made of ordered [`Field`]s.
//! Objects may nest; the decomposer flattens them into parameter and result lists in
//! field declaration order. Shapes are produced by [`In::shape`](crate::In::shape) and
//! [`Out::shape`](crate::Out::shape), either by hand or by code generation.

use crate::inputs::In;
use crate::key::TypeKey;
use crate::outputs::Out;

/// How a leaf binding is delivered to or produced by user code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum LeafKind {
    /// Exactly one value, `Arc<T>`.
    Single,
    /// A value that may be absent, `Option<Arc<T>>`.
    Optional,
    /// Every value of a group, `Vec<Arc<T>>`.
    Collection,
}

/// A single binding position inside a shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Leaf {
    ty: TypeKey,
    kind: LeafKind,
}

impl Leaf {
    /// The bound type.
    #[must_use]
    pub const fn ty(&self) -> TypeKey {
        self.ty
    }

    /// How the value is delivered.
    #[must_use]
    pub const fn kind(&self) -> LeafKind {
        self.kind
    }
}

/// The declared shape of a constructor input or output.
#[derive(Clone, Debug)]
pub enum Shape {
    /// A single binding.
    Leaf(Leaf),
    /// A composite of ordered fields.
    Object(ObjectShape),
}

impl Shape {
    /// A leaf binding of the given type and kind.
    #[must_use]
    pub const fn leaf(ty: TypeKey, kind: LeafKind) -> Self {
        Self::Leaf(Leaf { ty, kind })
    }

    /// Starts describing the composite object `T`.
    #[must_use]
    pub fn object<T: ?Sized + 'static>() -> ObjectShape {
        ObjectShape {
            type_name: std::any::type_name::<T>(),
            anonymous: false,
            ignore_private: false,
            fields: Vec::new(),
        }
    }

    /// An argument list or tuple: flattened like an object, but never annotated.
    pub(crate) fn anonymous(type_name: &'static str, fields: Vec<Self>) -> Self {
        let fields = fields
            .into_iter()
            .zip(POSITIONS)
            .map(|(shape, label)| Field {
                label,
                name: None,
                group: None,
                content: FieldContent::Exposed(shape),
            })
            .collect();

        Self::Object(ObjectShape {
            type_name,
            anonymous: true,
            ignore_private: false,
            fields,
        })
    }
}

impl From<ObjectShape> for Shape {
    fn from(object: ObjectShape) -> Self {
        Self::Object(object)
    }
}

const POSITIONS: [&str; 8] = ["0", "1", "2", "3", "4", "5", "6", "7"];

/// The fields of a composite object, in declaration order.
#[derive(Clone, Debug)]
pub struct ObjectShape {
    type_name: &'static str,
    anonymous: bool,
    ignore_private: bool,
    fields: Vec<Field>,
}

impl ObjectShape {
    /// Appends a field.
    #[must_use]
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Accepts [`Field::private`] entries instead of rejecting them at registration.
    #[must_use]
    pub const fn ignore_private(mut self) -> Self {
        self.ignore_private = true;
        self
    }

    /// The name of the described type.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The declared fields.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub(crate) const fn is_anonymous(&self) -> bool {
        self.anonymous
    }

    pub(crate) const fn ignores_private(&self) -> bool {
        self.ignore_private
    }
}

/// One field of a composite object.
#[derive(Clone, Debug)]
pub struct Field {
    label: &'static str,
    name: Option<String>,
    group: Option<String>,
    content: FieldContent,
}

#[derive(Clone, Debug)]
pub(crate) enum FieldContent {
    Exposed(Shape),
    Private,
}

impl Field {
    /// A field consumed from the container, typed by its [`In`] implementation.
    #[must_use]
    pub fn input<T: In>(label: &'static str) -> Self {
        Self::exposed(label, T::shape())
    }

    /// A field produced into the container, typed by its [`Out`] implementation.
    #[must_use]
    pub fn output<T: Out>(label: &'static str) -> Self {
        Self::exposed(label, T::shape())
    }

    /// A field the container neither fills nor reads.
    ///
    /// Objects containing private fields must opt in with [`ObjectShape::ignore_private`].
    #[must_use]
    pub const fn private(label: &'static str) -> Self {
        Self {
            label,
            name: None,
            group: None,
            content: FieldContent::Private,
        }
    }

    const fn exposed(label: &'static str, shape: Shape) -> Self {
        Self {
            label,
            name: None,
            group: None,
            content: FieldContent::Exposed(shape),
        }
    }

    /// Binds this field under a name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Routes this field into, or collects it from, a value group.
    #[must_use]
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// The field label used in diagnostics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        self.label
    }

    pub(crate) fn name_tag(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn group_tag(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub(crate) const fn content(&self) -> &FieldContent {
        &self.content
    }
}

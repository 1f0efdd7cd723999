// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::any::TypeId;
use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};

/// Identity of a bindable type.
///
/// Equality and hashing use only the [`TypeId`]; the type name is carried along for
/// diagnostics. Unsized types are accepted so that `dyn Trait` can serve as an
/// interface identity.
#[derive(Clone, Copy, Debug)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Returns the identity of `T`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The [`TypeId`] behind this identity.
    #[must_use]
    pub const fn id(&self) -> TypeId {
        self.id
    }

    /// The fully qualified type name, as reported by [`std::any::type_name`].
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Display for TypeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for TypeKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name)
    }
}

/// A resolvable `(type, name, group)` coordinate.
///
/// A binding carries either a name, a group, or neither. The decomposer rejects
/// shapes that would produce both, so every `Binding` stored in a container
/// respects that exclusivity.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Binding {
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    ty: TypeKey,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    name: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    group: Option<String>,
}

impl Binding {
    /// An unnamed, ungrouped binding for `T`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(TypeKey::of::<T>())
    }

    /// An unnamed, ungrouped binding for the given type.
    #[must_use]
    pub const fn new(ty: TypeKey) -> Self {
        Self { ty, name: None, group: None }
    }

    /// Returns this binding with the given name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns this binding targeting the given group.
    #[must_use]
    pub fn grouped(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// The bound type.
    #[must_use]
    pub const fn ty(&self) -> TypeKey {
        self.ty
    }

    /// The binding name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The group this binding contributes to or consumes, if any.
    #[must_use]
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub(crate) fn with_parts(ty: TypeKey, name: Option<String>, group: Option<String>) -> Self {
        Self { ty, name, group }
    }

    /// The contributor-index key of a grouped binding.
    pub(crate) fn group_key(&self) -> Option<GroupKey> {
        self.group.as_ref().map(|group| GroupKey {
            ty: self.ty,
            group: group.clone(),
        })
    }
}

impl Display for Binding {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ty)?;
        match (&self.name, &self.group) {
            (Some(name), _) => write!(f, "[name=\"{name}\"]"),
            (None, Some(group)) => write!(f, "[group=\"{group}\"]"),
            (None, None) => Ok(()),
        }
    }
}

/// Key of the `(type, group)` contributor index.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct GroupKey {
    pub(crate) ty: TypeKey,
    pub(crate) group: String,
}

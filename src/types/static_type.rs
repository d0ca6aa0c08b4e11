//! Storable static types.
//!
//! A static type is the compact, self-contained mirror of a semantic type
//! that runtime values carry and the storage codec persists. Every static
//! type converts to exactly one semantic type and back; semantic types
//! without a storable representation (functions, generics, `Never`) have no
//! static counterpart.

use crate::ast::CompositeKind;
use crate::common::Location;
use crate::types::{Authorization, NominalKey, PrimitiveType, Type, TypeCache, TypeId};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StaticType {
    Primitive(PrimitiveType),
    Composite {
        location: Location,
        qualified_identifier: String,
        kind: CompositeKind,
    },
    Interface {
        location: Location,
        qualified_identifier: String,
        kind: CompositeKind,
    },
    Optional(Box<StaticType>),
    VariableSizedArray(Box<StaticType>),
    ConstantSizedArray {
        element: Box<StaticType>,
        size: u64,
    },
    Dictionary {
        key: Box<StaticType>,
        value: Box<StaticType>,
    },
    Reference {
        authorization: Authorization,
        referenced: Box<StaticType>,
    },
    Capability {
        borrow: Option<Box<StaticType>>,
    },
    Intersection(Vec<StaticType>),
}

impl StaticType {
    pub fn is_reference(&self) -> bool {
        matches!(self, StaticType::Reference { .. })
    }

    /// The stable identifier string; used as a mapping key by the
    /// capability migration.
    pub fn id(&self) -> String {
        match self {
            StaticType::Primitive(kind) => kind.name().to_string(),
            StaticType::Composite {
                location,
                qualified_identifier,
                ..
            }
            | StaticType::Interface {
                location,
                qualified_identifier,
                ..
            } => location.type_id(qualified_identifier),
            StaticType::Optional(inner) => format!("{}?", inner.id()),
            StaticType::VariableSizedArray(element) => format!("[{}]", element.id()),
            StaticType::ConstantSizedArray { element, size } => {
                format!("[{}; {}]", element.id(), size)
            }
            StaticType::Dictionary { key, value } => {
                format!("{{{}: {}}}", key.id(), value.id())
            }
            StaticType::Reference {
                authorization,
                referenced,
            } => match authorization {
                Authorization::Unauthorized => format!("&{}", referenced.id()),
                Authorization::Entitlements(entitlements) => {
                    let list = entitlements.iter().cloned().collect::<Vec<_>>().join(", ");
                    format!("auth({})&{}", list, referenced.id())
                }
            },
            StaticType::Capability { borrow: None } => "Capability".to_string(),
            StaticType::Capability { borrow: Some(borrow) } => {
                format!("Capability<{}>", borrow.id())
            }
            StaticType::Intersection(interfaces) => {
                let list = interfaces
                    .iter()
                    .map(StaticType::id)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{{{list}}}")
            }
        }
    }

    /// Converts a semantic type to its static counterpart. `None` when the
    /// semantic type has no storable representation.
    pub fn from_semantic(cache: &TypeCache, id: TypeId) -> Option<StaticType> {
        Some(match cache.get(id) {
            Type::Never | Type::Function(_) | Type::Generic(_) => return None,
            Type::Primitive(kind) => StaticType::Primitive(*kind),
            Type::Composite(key) => StaticType::Composite {
                location: key.location.clone(),
                qualified_identifier: key.qualified_identifier.clone(),
                kind: key.kind,
            },
            Type::Interface(key) => StaticType::Interface {
                location: key.location.clone(),
                qualified_identifier: key.qualified_identifier.clone(),
                kind: key.kind,
            },
            Type::Optional(inner) => {
                StaticType::Optional(Box::new(Self::from_semantic(cache, *inner)?))
            }
            Type::VariableSizedArray(element) => {
                StaticType::VariableSizedArray(Box::new(Self::from_semantic(cache, *element)?))
            }
            Type::ConstantSizedArray { element, size } => StaticType::ConstantSizedArray {
                element: Box::new(Self::from_semantic(cache, *element)?),
                size: *size,
            },
            Type::Dictionary { key, value } => StaticType::Dictionary {
                key: Box::new(Self::from_semantic(cache, *key)?),
                value: Box::new(Self::from_semantic(cache, *value)?),
            },
            Type::Reference {
                authorization,
                referenced,
            } => StaticType::Reference {
                authorization: authorization.clone(),
                referenced: Box::new(Self::from_semantic(cache, *referenced)?),
            },
            Type::Capability { borrow } => StaticType::Capability {
                borrow: match borrow {
                    Some(borrow) => Some(Box::new(Self::from_semantic(cache, *borrow)?)),
                    None => None,
                },
            },
            Type::Intersection(interfaces) => StaticType::Intersection(
                interfaces
                    .iter()
                    .map(|interface| Self::from_semantic(cache, *interface))
                    .collect::<Option<Vec<_>>>()?,
            ),
        })
    }

    /// Interns the semantic counterpart of this static type.
    pub fn to_semantic(&self, cache: &mut TypeCache) -> TypeId {
        match self {
            StaticType::Primitive(kind) => cache.primitive(*kind),
            StaticType::Composite {
                location,
                qualified_identifier,
                kind,
            } => cache.intern(Type::Composite(NominalKey {
                location: location.clone(),
                qualified_identifier: qualified_identifier.clone(),
                kind: *kind,
            })),
            StaticType::Interface {
                location,
                qualified_identifier,
                kind,
            } => cache.intern(Type::Interface(NominalKey {
                location: location.clone(),
                qualified_identifier: qualified_identifier.clone(),
                kind: *kind,
            })),
            StaticType::Optional(inner) => {
                let inner = inner.to_semantic(cache);
                cache.optional(inner)
            }
            StaticType::VariableSizedArray(element) => {
                let element = element.to_semantic(cache);
                cache.variable_sized_array(element)
            }
            StaticType::ConstantSizedArray { element, size } => {
                let element = element.to_semantic(cache);
                cache.intern(Type::ConstantSizedArray {
                    element,
                    size: *size,
                })
            }
            StaticType::Dictionary { key, value } => {
                let key = key.to_semantic(cache);
                let value = value.to_semantic(cache);
                cache.dictionary(key, value)
            }
            StaticType::Reference {
                authorization,
                referenced,
            } => {
                let referenced = referenced.to_semantic(cache);
                cache.reference(authorization.clone(), referenced)
            }
            StaticType::Capability { borrow } => {
                let borrow = borrow.as_ref().map(|borrow| borrow.to_semantic(cache));
                cache.capability(borrow)
            }
            StaticType::Intersection(interfaces) => {
                let interfaces = interfaces
                    .iter()
                    .map(|interface| interface.to_semantic(cache))
                    .collect();
                cache.intersection(interfaces)
            }
        }
    }
}

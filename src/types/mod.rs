//! The semantic type model.
//!
//! Types are interned in a [`TypeCache`] arena and referenced by [`TypeId`]
//! handles, so nominal types can be referred to before their members are
//! known and cyclic references never materialize as owned cycles. Member
//! tables of nominal types live in the [`NominalRegistry`] side structure,
//! not in the type itself; back-edges are recomputed by the elaboration.

mod format;
mod registry;
mod relations;
mod static_type;
mod type_cache;

pub use format::type_string;
pub use registry::{
    InitializerSig, Member, MemberAccess, MemberKind, NominalEntry, NominalRegistry, ParamSig,
};
pub use relations::{is_resource_kinded, is_subtype};
pub use static_type::StaticType;
pub use type_cache::{TypeCache, TypeId};

use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

use crate::ast::CompositeKind;
use crate::common::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Void,
    Bool,
    String,
    Character,
    Address,
    Path,
    Int,
    UInt,
    Int8,
    Int16,
    Int32,
    Int64,
    Int128,
    Int256,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    UInt128,
    UInt256,
    Fix64,
    UFix64,
    AnyStruct,
    AnyResource,
}

impl PrimitiveType {
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::Void => "Void",
            PrimitiveType::Bool => "Bool",
            PrimitiveType::String => "String",
            PrimitiveType::Character => "Character",
            PrimitiveType::Address => "Address",
            PrimitiveType::Path => "Path",
            PrimitiveType::Int => "Int",
            PrimitiveType::UInt => "UInt",
            PrimitiveType::Int8 => "Int8",
            PrimitiveType::Int16 => "Int16",
            PrimitiveType::Int32 => "Int32",
            PrimitiveType::Int64 => "Int64",
            PrimitiveType::Int128 => "Int128",
            PrimitiveType::Int256 => "Int256",
            PrimitiveType::UInt8 => "UInt8",
            PrimitiveType::UInt16 => "UInt16",
            PrimitiveType::UInt32 => "UInt32",
            PrimitiveType::UInt64 => "UInt64",
            PrimitiveType::UInt128 => "UInt128",
            PrimitiveType::UInt256 => "UInt256",
            PrimitiveType::Fix64 => "Fix64",
            PrimitiveType::UFix64 => "UFix64",
            PrimitiveType::AnyStruct => "AnyStruct",
            PrimitiveType::AnyResource => "AnyResource",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        use PrimitiveType::*;
        Some(match name {
            "Void" => Void,
            "Bool" => Bool,
            "String" => String,
            "Character" => Character,
            "Address" => Address,
            "Path" => Path,
            "Int" => Int,
            "UInt" => UInt,
            "Int8" => Int8,
            "Int16" => Int16,
            "Int32" => Int32,
            "Int64" => Int64,
            "Int128" => Int128,
            "Int256" => Int256,
            "UInt8" => UInt8,
            "UInt16" => UInt16,
            "UInt32" => UInt32,
            "UInt64" => UInt64,
            "UInt128" => UInt128,
            "UInt256" => UInt256,
            "Fix64" => Fix64,
            "UFix64" => UFix64,
            "AnyStruct" => AnyStruct,
            "AnyResource" => AnyResource,
            _ => return None,
        })
    }

    pub fn is_integer(self) -> bool {
        use PrimitiveType::*;
        matches!(
            self,
            Int | UInt
                | Int8
                | Int16
                | Int32
                | Int64
                | Int128
                | Int256
                | UInt8
                | UInt16
                | UInt32
                | UInt64
                | UInt128
                | UInt256
        )
    }

    pub fn is_number(self) -> bool {
        self.is_integer() || matches!(self, PrimitiveType::Fix64 | PrimitiveType::UFix64)
    }
}

/// The interning key of a nominal (composite or interface) type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NominalKey {
    pub location: Location,
    pub qualified_identifier: String,
    pub kind: CompositeKind,
}

impl NominalKey {
    pub fn type_id(&self) -> String {
        self.location.type_id(&self.qualified_identifier)
    }
}

/// The authorization a reference type carries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Authorization {
    Unauthorized,
    /// The set of entitlement names granted on the reference.
    Entitlements(BTreeSet<String>),
}

impl Authorization {
    pub fn entitlements(names: impl IntoIterator<Item = String>) -> Self {
        Authorization::Entitlements(names.into_iter().collect())
    }

    /// Whether this authorization grants everything `required` demands.
    pub fn satisfies(&self, required: &BTreeSet<String>) -> bool {
        match self {
            Authorization::Unauthorized => required.is_empty(),
            Authorization::Entitlements(granted) => required.is_subset(granted),
        }
    }
}

/// A function type parameter (a generic placeholder bound at call sites).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeParameter {
    pub name: String,
}

#[derive(Debug, Clone, Eq)]
pub struct FunctionParameter {
    /// The argument label call sites must use; `None` means unlabeled.
    pub label: Option<String>,
    /// The binding name inside the body. Not part of type identity.
    pub identifier: String,
    pub ty: TypeId,
}

// Parameter names may differ between otherwise identical function types,
// so identity covers label and type only.
impl PartialEq for FunctionParameter {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label && self.ty == other.ty
    }
}

impl Hash for FunctionParameter {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.label.hash(state);
        self.ty.hash(state);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionType {
    pub type_parameters: Vec<TypeParameter>,
    pub parameters: Vec<FunctionParameter>,
    pub return_type: TypeId,
    pub is_constructor: bool,
}

/// A semantic type. Child types are arena handles, never owned boxes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// The bottom type; subtype of everything.
    Never,
    Primitive(PrimitiveType),
    Composite(NominalKey),
    Interface(NominalKey),
    Optional(TypeId),
    VariableSizedArray(TypeId),
    ConstantSizedArray {
        element: TypeId,
        size: u64,
    },
    Dictionary {
        key: TypeId,
        value: TypeId,
    },
    Reference {
        authorization: Authorization,
        referenced: TypeId,
    },
    Capability {
        borrow: Option<TypeId>,
    },
    Function(FunctionType),
    /// A reference to an enclosing function's type parameter.
    Generic(TypeParameter),
    /// An intersection of interface types, e.g. `{I₁, I₂}`. Members are
    /// interface [`TypeId`]s, kept sorted so structurally equal
    /// intersections intern to the same handle.
    Intersection(Vec<TypeId>),
}

impl Type {
    pub fn nominal_key(&self) -> Option<&NominalKey> {
        match self {
            Type::Composite(key) | Type::Interface(key) => Some(key),
            _ => None,
        }
    }

    pub fn is_interface(&self) -> bool {
        matches!(self, Type::Interface(_))
    }
}

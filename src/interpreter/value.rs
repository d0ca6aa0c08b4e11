//! Runtime values.
//!
//! Containers (composites, arrays, dictionaries) are shared through
//! `Rc<RefCell<...>>` so references observe mutation; everything else is
//! plain data. Dispatch over values is a closed switch on the kind tag:
//! each variant's capabilities (equatable, storable, resource-kinded,
//! member-accessible) are methods here, not open traits.

use std::cell::RefCell;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

use indexmap::IndexMap;
use num_bigint::BigInt;

use crate::ast::{Block, CompositeKind, Parameter};
use crate::common::{Address, Location, Path};
use crate::types::{Authorization, PrimitiveType, StaticType};

/// The reserved invalid capability id.
pub const INVALID_CAPABILITY_ID: u64 = 0;

/// Fixed-point values carry 8 decimal places.
pub const FIXED_POINT_SCALE: u32 = 8;

#[derive(Debug, Clone)]
pub enum Value {
    Void,
    Bool(bool),
    Integer(IntegerValue),
    String(Rc<RefCell<String>>),
    Character(char),
    Address(Address),
    Path(Path),
    Optional(Option<Box<Value>>),
    Array(Rc<RefCell<ArrayValue>>),
    Dictionary(Rc<RefCell<DictionaryValue>>),
    Composite(Rc<RefCell<CompositeValue>>),
    Reference(ReferenceValue),
    PathCapability(PathCapabilityValue),
    IdCapability(IdCapabilityValue),
    Function(FunctionValue),
    /// Tombstone left behind after a resource move. Observing one during
    /// evaluation means the elaboration is corrupted.
    Moved,
}

// --- Numbers ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegerValue {
    pub kind: PrimitiveType,
    /// For `Fix64`/`UFix64` this is the raw scaled representation.
    pub value: BigInt,
}

impl IntegerValue {
    pub fn new(kind: PrimitiveType, value: BigInt) -> Self {
        Self { kind, value }
    }

    pub fn int(value: impl Into<BigInt>) -> Self {
        Self::new(PrimitiveType::Int, value.into())
    }

    pub fn uint64(value: u64) -> Self {
        Self::new(PrimitiveType::UInt64, BigInt::from(value))
    }

    pub fn is_fixed_point(&self) -> bool {
        matches!(self.kind, PrimitiveType::Fix64 | PrimitiveType::UFix64)
    }

    fn checked(kind: PrimitiveType, value: BigInt) -> Option<IntegerValue> {
        // `UInt` is unbounded above but not below.
        if kind == PrimitiveType::UInt && value.sign() == num_bigint::Sign::Minus {
            return None;
        }
        if let Some((min, max)) = integer_bounds(kind)
            && (value < min || value > max)
        {
            return None;
        }
        Some(IntegerValue::new(kind, value))
    }

    pub fn checked_add(&self, other: &IntegerValue) -> Option<IntegerValue> {
        Self::checked(self.kind, &self.value + &other.value)
    }

    pub fn checked_sub(&self, other: &IntegerValue) -> Option<IntegerValue> {
        Self::checked(self.kind, &self.value - &other.value)
    }

    pub fn checked_mul(&self, other: &IntegerValue) -> Option<IntegerValue> {
        let product = &self.value * &other.value;
        let product = if self.is_fixed_point() {
            product / BigInt::from(10u64.pow(FIXED_POINT_SCALE))
        } else {
            product
        };
        Self::checked(self.kind, product)
    }

    /// `None` divisor means division by zero; range failure means overflow.
    pub fn checked_div(&self, other: &IntegerValue) -> Option<Option<IntegerValue>> {
        if other.value.sign() == num_bigint::Sign::NoSign {
            return None;
        }
        let dividend = if self.is_fixed_point() {
            &self.value * BigInt::from(10u64.pow(FIXED_POINT_SCALE))
        } else {
            self.value.clone()
        };
        Some(Self::checked(self.kind, dividend / &other.value))
    }

    pub fn checked_rem(&self, other: &IntegerValue) -> Option<Option<IntegerValue>> {
        if other.value.sign() == num_bigint::Sign::NoSign {
            return None;
        }
        Some(Self::checked(self.kind, &self.value % &other.value))
    }

    pub fn checked_neg(&self) -> Option<IntegerValue> {
        Self::checked(self.kind, -&self.value)
    }

    /// Converts to another integer kind, `None` when out of range.
    pub fn convert(&self, kind: PrimitiveType) -> Option<IntegerValue> {
        Self::checked(kind, self.value.clone())
    }

    pub fn to_u64(&self) -> Option<u64> {
        use num_bigint::Sign;
        if self.value.sign() == Sign::Minus {
            return None;
        }
        let (_, digits) = self.value.to_u64_digits();
        match digits.len() {
            0 => Some(0),
            1 => Some(digits[0]),
            _ => None,
        }
    }

    pub fn to_usize(&self) -> Option<usize> {
        self.to_u64().map(|value| value as usize)
    }
}

/// The inclusive value bounds of a sized integer kind. Unbounded kinds
/// (`Int`) and the unsigned-unbounded `UInt` lower bound return what they
/// have; fixed-point kinds use their raw scaled bounds.
pub fn integer_bounds(kind: PrimitiveType) -> Option<(BigInt, BigInt)> {
    let bits: u32 = match kind {
        PrimitiveType::Int8 | PrimitiveType::UInt8 => 8,
        PrimitiveType::Int16 | PrimitiveType::UInt16 => 16,
        PrimitiveType::Int32 | PrimitiveType::UInt32 => 32,
        PrimitiveType::Int64 | PrimitiveType::UInt64 | PrimitiveType::Fix64
        | PrimitiveType::UFix64 => 64,
        PrimitiveType::Int128 | PrimitiveType::UInt128 => 128,
        PrimitiveType::Int256 | PrimitiveType::UInt256 => 256,
        _ => return None,
    };
    let signed = matches!(
        kind,
        PrimitiveType::Int8
            | PrimitiveType::Int16
            | PrimitiveType::Int32
            | PrimitiveType::Int64
            | PrimitiveType::Int128
            | PrimitiveType::Int256
            | PrimitiveType::Fix64
    );
    if signed {
        let max = (BigInt::from(1u8) << (bits - 1)) - 1;
        let min = -(BigInt::from(1u8) << (bits - 1));
        Some((min, max))
    } else {
        Some((BigInt::from(0u8), (BigInt::from(1u8) << bits) - 1))
    }
}

// --- Containers ---

#[derive(Debug, Clone)]
pub struct ArrayValue {
    pub ty: StaticType,
    pub values: Vec<Value>,
}

/// Dictionary keys are the equatable scalar subset of values, so entries
/// hash and compare deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DictionaryKey {
    Bool(bool),
    Integer(PrimitiveType, BigInt),
    String(String),
    Character(char),
    Address(Address),
    Path(Path),
}

impl DictionaryKey {
    pub fn from_value(value: &Value) -> Option<DictionaryKey> {
        Some(match value {
            Value::Bool(value) => DictionaryKey::Bool(*value),
            Value::Integer(integer) => {
                DictionaryKey::Integer(integer.kind, integer.value.clone())
            }
            Value::String(value) => DictionaryKey::String(value.borrow().clone()),
            Value::Character(value) => DictionaryKey::Character(*value),
            Value::Address(value) => DictionaryKey::Address(*value),
            Value::Path(value) => DictionaryKey::Path(value.clone()),
            _ => return None,
        })
    }

    pub fn to_value(&self) -> Value {
        match self {
            DictionaryKey::Bool(value) => Value::Bool(*value),
            DictionaryKey::Integer(kind, value) => {
                Value::Integer(IntegerValue::new(*kind, value.clone()))
            }
            DictionaryKey::String(value) => Value::string(value.clone()),
            DictionaryKey::Character(value) => Value::Character(*value),
            DictionaryKey::Address(value) => Value::Address(*value),
            DictionaryKey::Path(value) => Value::Path(value.clone()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DictionaryValue {
    pub ty: StaticType,
    pub entries: IndexMap<DictionaryKey, Value>,
}

#[derive(Debug, Clone)]
pub struct CompositeValue {
    pub location: Location,
    pub qualified_identifier: String,
    pub kind: CompositeKind,
    pub fields: IndexMap<String, Value>,
    /// Host functions injected into this value's function table; consulted
    /// before interpreted members.
    pub functions: IndexMap<String, FunctionValue>,
    /// The account the value is currently stored under, if any.
    pub owner: Option<Address>,
}

impl CompositeValue {
    pub fn new(
        location: Location,
        qualified_identifier: impl Into<String>,
        kind: CompositeKind,
    ) -> Self {
        Self {
            location,
            qualified_identifier: qualified_identifier.into(),
            kind,
            fields: IndexMap::new(),
            functions: IndexMap::new(),
            owner: None,
        }
    }

    pub fn type_id(&self) -> String {
        self.location.type_id(&self.qualified_identifier)
    }
}

// --- References & capabilities ---

#[derive(Debug, Clone)]
pub struct ReferenceValue {
    pub authorization: Authorization,
    pub target: Box<Value>,
}

/// Deprecated: path capabilities exist only to be migrated; `borrow` and
/// `check` on them always yield `nil`/`false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathCapabilityValue {
    pub address: Address,
    pub path: Path,
    pub borrow_type: Option<StaticType>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdCapabilityValue {
    pub address: Address,
    pub id: u64,
    pub borrow_type: StaticType,
}

// --- Functions ---

/// An interpreted function definition, cloned out of the checked AST once
/// at interpreter construction.
#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub body: Block,
    /// Qualified identifier of the declaring composite, if a member.
    pub composite: Option<String>,
}

pub type HostFunctionImpl = Rc<
    dyn Fn(
        &mut crate::interpreter::Interpreter,
        crate::interpreter::Invocation,
    ) -> Result<Value, crate::interpreter::RuntimeError>,
>;

#[derive(Clone)]
pub struct HostFunction {
    pub name: String,
    pub implementation: HostFunctionImpl,
}

impl std::fmt::Debug for HostFunction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostFunction")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Built-in members of non-composite kinds, dispatched by a closed switch
/// at invocation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinFn {
    ArrayAppend,
    ArrayContains,
    ArrayRemove,
    DictionaryInsert,
    DictionaryRemove,
    StringConcat,
    CapabilityBorrow,
    CapabilityCheck,
}

#[derive(Debug, Clone)]
pub enum FunctionValue {
    Interpreted(Rc<FunctionDef>),
    /// A member function bound to its receiver.
    Bound {
        receiver: Box<Value>,
        function: Box<FunctionValue>,
    },
    /// A composite constructor, identified by the composite's qualified
    /// identifier.
    Constructor(String),
    Host(HostFunction),
    Builtin {
        kind: BuiltinFn,
        receiver: Box<Value>,
    },
}

// --- Value capabilities ---

impl Value {
    pub fn string(value: impl Into<String>) -> Value {
        Value::String(Rc::new(RefCell::new(value.into())))
    }

    pub fn some(value: Value) -> Value {
        Value::Optional(Some(Box::new(value)))
    }

    pub fn nil() -> Value {
        Value::Optional(None)
    }

    pub fn array(ty: StaticType, values: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(ArrayValue { ty, values })))
    }

    pub fn dictionary(ty: StaticType, entries: IndexMap<DictionaryKey, Value>) -> Value {
        Value::Dictionary(Rc::new(RefCell::new(DictionaryValue { ty, entries })))
    }

    pub fn composite(value: CompositeValue) -> Value {
        Value::Composite(Rc::new(RefCell::new(value)))
    }

    /// The static type of the value, `None` for unstorable kinds that have
    /// no static representation (functions, moved tombstones).
    pub fn static_type(&self) -> Option<StaticType> {
        Some(match self {
            Value::Void => StaticType::Primitive(PrimitiveType::Void),
            Value::Bool(_) => StaticType::Primitive(PrimitiveType::Bool),
            Value::Integer(integer) => StaticType::Primitive(integer.kind),
            Value::String(_) => StaticType::Primitive(PrimitiveType::String),
            Value::Character(_) => StaticType::Primitive(PrimitiveType::Character),
            Value::Address(_) => StaticType::Primitive(PrimitiveType::Address),
            Value::Path(_) => StaticType::Primitive(PrimitiveType::Path),
            Value::Optional(Some(inner)) => StaticType::Optional(Box::new(inner.static_type()?)),
            Value::Optional(None) => {
                StaticType::Optional(Box::new(StaticType::Primitive(PrimitiveType::AnyStruct)))
            }
            Value::Array(array) => array.borrow().ty.clone(),
            Value::Dictionary(dictionary) => dictionary.borrow().ty.clone(),
            Value::Composite(composite) => {
                let composite = composite.borrow();
                StaticType::Composite {
                    location: composite.location.clone(),
                    qualified_identifier: composite.qualified_identifier.clone(),
                    kind: composite.kind,
                }
            }
            Value::Reference(reference) => StaticType::Reference {
                authorization: reference.authorization.clone(),
                referenced: Box::new(reference.target.static_type()?),
            },
            Value::PathCapability(capability) => StaticType::Capability {
                borrow: capability.borrow_type.clone().map(Box::new),
            },
            Value::IdCapability(capability) => StaticType::Capability {
                borrow: Some(Box::new(capability.borrow_type.clone())),
            },
            Value::Function(_) | Value::Moved => return None,
        })
    }

    pub fn is_resource_kinded(&self) -> bool {
        match self {
            Value::Composite(composite) => composite.borrow().kind.is_resource(),
            Value::Optional(Some(inner)) => inner.is_resource_kinded(),
            Value::Array(array) => array
                .borrow()
                .values
                .iter()
                .any(Value::is_resource_kinded),
            Value::Dictionary(dictionary) => dictionary
                .borrow()
                .entries
                .values()
                .any(Value::is_resource_kinded),
            _ => false,
        }
    }

    pub fn is_storable(&self) -> bool {
        match self {
            Value::Function(_) | Value::Reference(_) | Value::Moved => false,
            Value::Optional(Some(inner)) => inner.is_storable(),
            Value::Array(array) => array.borrow().values.iter().all(Value::is_storable),
            Value::Dictionary(dictionary) => {
                dictionary.borrow().entries.values().all(Value::is_storable)
            }
            Value::Composite(composite) => {
                composite.borrow().fields.values().all(Value::is_storable)
            }
            _ => true,
        }
    }

    /// Structural, deterministic equality. Resources, functions, and
    /// references compare unequal to everything (references compare by
    /// target structure in the original only for equatable referents;
    /// the checker rejects those comparisons here).
    pub fn equal(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Void, Value::Void) => true,
            (Value::Bool(left), Value::Bool(right)) => left == right,
            (Value::Integer(left), Value::Integer(right)) => {
                left.kind == right.kind && left.value == right.value
            }
            (Value::String(left), Value::String(right)) => *left.borrow() == *right.borrow(),
            (Value::Character(left), Value::Character(right)) => left == right,
            (Value::Address(left), Value::Address(right)) => left == right,
            (Value::Path(left), Value::Path(right)) => left == right,
            (Value::Optional(left), Value::Optional(right)) => match (left, right) {
                (None, None) => true,
                (Some(left), Some(right)) => left.equal(right),
                _ => false,
            },
            (Value::Array(left), Value::Array(right)) => {
                let left = left.borrow();
                let right = right.borrow();
                left.values.len() == right.values.len()
                    && left
                        .values
                        .iter()
                        .zip(right.values.iter())
                        .all(|(left, right)| left.equal(right))
            }
            (Value::Dictionary(left), Value::Dictionary(right)) => {
                let left = left.borrow();
                let right = right.borrow();
                left.entries.len() == right.entries.len()
                    && left.entries.iter().all(|(key, value)| {
                        right
                            .entries
                            .get(key)
                            .map(|other| value.equal(other))
                            .unwrap_or(false)
                    })
            }
            (Value::Composite(left), Value::Composite(right)) => {
                let left = left.borrow();
                let right = right.borrow();
                !left.kind.is_resource()
                    && left.type_id() == right.type_id()
                    && left.fields.len() == right.fields.len()
                    && left.fields.iter().all(|(name, value)| {
                        right
                            .fields
                            .get(name)
                            .map(|other| value.equal(other))
                            .unwrap_or(false)
                    })
            }
            (Value::PathCapability(left), Value::PathCapability(right)) => left == right,
            (Value::IdCapability(left), Value::IdCapability(right)) => left == right,
            _ => false,
        }
    }

    /// A deep, independent copy: fresh cells for every container.
    pub fn clone_value(&self) -> Value {
        match self {
            Value::String(value) => Value::string(value.borrow().clone()),
            Value::Optional(Some(inner)) => Value::some(inner.clone_value()),
            Value::Array(array) => {
                let array = array.borrow();
                Value::array(
                    array.ty.clone(),
                    array.values.iter().map(Value::clone_value).collect(),
                )
            }
            Value::Dictionary(dictionary) => {
                let dictionary = dictionary.borrow();
                Value::dictionary(
                    dictionary.ty.clone(),
                    dictionary
                        .entries
                        .iter()
                        .map(|(key, value)| (key.clone(), value.clone_value()))
                        .collect(),
                )
            }
            Value::Composite(composite) => {
                let composite = composite.borrow();
                let mut clone = CompositeValue::new(
                    composite.location.clone(),
                    composite.qualified_identifier.clone(),
                    composite.kind,
                );
                clone.functions = composite.functions.clone();
                clone.fields = composite
                    .fields
                    .iter()
                    .map(|(name, value)| (name.clone(), value.clone_value()))
                    .collect();
                Value::composite(clone)
            }
            other => other.clone(),
        }
    }

    /// Visits the immediate children of the value.
    pub fn walk_children(&self, visit: &mut dyn FnMut(&Value)) {
        match self {
            Value::Optional(Some(inner)) => visit(inner),
            Value::Array(array) => {
                for value in &array.borrow().values {
                    visit(value);
                }
            }
            Value::Dictionary(dictionary) => {
                for value in dictionary.borrow().entries.values() {
                    visit(value);
                }
            }
            Value::Composite(composite) => {
                for value in composite.borrow().fields.values() {
                    visit(value);
                }
            }
            Value::Reference(reference) => visit(&reference.target),
            _ => {}
        }
    }

    /// Recursively re-owns the value under an account (or clears ownership
    /// when `owner` is `None`). Part of the transfer protocol.
    pub fn set_owner(&self, owner: Option<Address>) {
        if let Value::Composite(composite) = self {
            composite.borrow_mut().owner = owner;
        }
        self.walk_children(&mut |child| child.set_owner(owner));
    }

    /// Releases the storage identity of the value and everything nested
    /// in it after a removal: children hold no slab references once the
    /// enclosing cell is freed, so this clears ownership recursively.
    pub fn deep_remove(&self) {
        self.set_owner(None);
    }

    /// Whether storing under `destination` relocates the value's slabs.
    pub fn needs_store_to(&self, destination: Address) -> bool {
        match self {
            Value::Composite(composite) => {
                let owner = composite.borrow().owner;
                owner.map(|owner| owner != destination).unwrap_or(false)
            }
            _ => false,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Void => write!(f, "()"),
            Value::Bool(value) => write!(f, "{value}"),
            Value::Integer(integer) => {
                if integer.is_fixed_point() {
                    let scale = BigInt::from(10u64.pow(FIXED_POINT_SCALE));
                    let whole = &integer.value / &scale;
                    let fraction = (&integer.value % &scale).magnitude().clone();
                    write!(f, "{whole}.{fraction:08}")
                } else {
                    write!(f, "{}", integer.value)
                }
            }
            Value::String(value) => write!(f, "{:?}", value.borrow()),
            Value::Character(value) => write!(f, "{value:?}"),
            Value::Address(value) => write!(f, "{value}"),
            Value::Path(value) => write!(f, "{value}"),
            Value::Optional(Some(inner)) => write!(f, "{inner}"),
            Value::Optional(None) => write!(f, "nil"),
            Value::Array(array) => {
                write!(f, "[")?;
                for (index, value) in array.borrow().values.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, "]")
            }
            Value::Dictionary(dictionary) => {
                write!(f, "{{")?;
                for (index, (key, value)) in dictionary.borrow().entries.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {value}", key.to_value())?;
                }
                write!(f, "}}")
            }
            Value::Composite(composite) => {
                let composite = composite.borrow();
                write!(f, "{}(", composite.type_id())?;
                for (index, (name, value)) in composite.fields.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                write!(f, ")")
            }
            Value::Reference(reference) => write!(f, "&{}", reference.target),
            Value::PathCapability(capability) => match &capability.borrow_type {
                Some(borrow_type) => write!(
                    f,
                    "Capability<{}>(address: {}, path: {})",
                    borrow_type.id(),
                    capability.address,
                    capability.path,
                ),
                None => write!(
                    f,
                    "Capability(address: {}, path: {})",
                    capability.address, capability.path,
                ),
            },
            Value::IdCapability(capability) => write!(
                f,
                "Capability<{}>(address: {}, id: {})",
                capability.borrow_type.id(),
                capability.address,
                capability.id,
            ),
            Value::Function(_) => write!(f, "fun"),
            Value::Moved => write!(f, "<moved>"),
        }
    }
}

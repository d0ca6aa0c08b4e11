//! The tagged storable codec.
//!
//! Persisted values use a CBOR-tagged byte format, framed directly. Each
//! value kind owns a distinct tag number and each composite storable is a
//! fixed-arity array whose length is asserted on decode.
//!
//! NOTE: tag numbers are append-only. Never remove or reuse one.

use indexmap::IndexMap;
use num_bigint::{BigInt, Sign};
use thiserror::Error;

use crate::ast::CompositeKind;
use crate::common::{Address, Location, Path, PathDomain};
use crate::interpreter::value::{
    CompositeValue, DictionaryKey, IdCapabilityValue, IntegerValue, PathCapabilityValue, Value,
};
use crate::types::{Authorization, PrimitiveType, StaticType};

// Value tags.
const TAG_VOID: u64 = 128;
const TAG_CHARACTER: u64 = 129;
const TAG_ADDRESS: u64 = 130;
const TAG_PATH: u64 = 131;
const TAG_INTEGER: u64 = 132;
const TAG_SOME: u64 = 133;
const TAG_ARRAY: u64 = 134;
const TAG_CONSTANT_ARRAY: u64 = 135;
const TAG_DICTIONARY: u64 = 136;
const TAG_COMPOSITE: u64 = 137;
// Deprecated path capabilities keep their dedicated tag until the last one
// is migrated.
const TAG_PATH_CAPABILITY: u64 = 138;
const TAG_ID_CAPABILITY: u64 = 139;
const TAG_CAPABILITY_CONTROLLER: u64 = 140;

// Static type tags.
const TAG_TYPE_PRIMITIVE: u64 = 176;
const TAG_TYPE_COMPOSITE: u64 = 177;
const TAG_TYPE_INTERFACE: u64 = 178;
const TAG_TYPE_OPTIONAL: u64 = 179;
const TAG_TYPE_VARIABLE_ARRAY: u64 = 180;
const TAG_TYPE_CONSTANT_ARRAY: u64 = 181;
const TAG_TYPE_DICTIONARY: u64 = 182;
const TAG_TYPE_REFERENCE: u64 = 183;
const TAG_TYPE_CAPABILITY: u64 = 184;
const TAG_TYPE_INTERSECTION: u64 = 185;

// CBOR major types.
const MAJOR_UNSIGNED: u8 = 0;
const MAJOR_BYTES: u8 = 2;
const MAJOR_TEXT: u8 = 3;
const MAJOR_ARRAY: u8 = 4;
const MAJOR_TAG: u8 = 6;
const MAJOR_SIMPLE: u8 = 7;

const SIMPLE_FALSE: u8 = 20;
const SIMPLE_TRUE: u8 = 21;
const SIMPLE_NULL: u8 = 22;

#[derive(Debug, Clone, Error)]
pub enum CodecError {
    #[error("value of kind `{kind}` is not storable")]
    NotStorable { kind: &'static str },

    #[error("unexpected end of input at offset {offset}")]
    UnexpectedEof { offset: usize },

    #[error("unexpected CBOR item at offset {offset}: expected {expected}")]
    UnexpectedItem {
        offset: usize,
        expected: &'static str,
    },

    #[error("unknown tag {tag}")]
    UnknownTag { tag: u64 },

    #[error("invalid array length: expected {expected}, found {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("invalid enum discriminant {value}")]
    InvalidDiscriminant { value: u64 },

    #[error("invalid dictionary key")]
    InvalidDictionaryKey,

    #[error("trailing bytes after value")]
    TrailingBytes,
}

// --- Encoder ---

#[derive(Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }

    fn write_head(&mut self, major: u8, value: u64) {
        let major = major << 5;
        match value {
            0..=23 => self.buf.push(major | value as u8),
            24..=0xff => {
                self.buf.push(major | 24);
                self.buf.push(value as u8);
            }
            0x100..=0xffff => {
                self.buf.push(major | 25);
                self.buf.extend_from_slice(&(value as u16).to_be_bytes());
            }
            0x1_0000..=0xffff_ffff => {
                self.buf.push(major | 26);
                self.buf.extend_from_slice(&(value as u32).to_be_bytes());
            }
            _ => {
                self.buf.push(major | 27);
                self.buf.extend_from_slice(&value.to_be_bytes());
            }
        }
    }

    fn write_tag(&mut self, tag: u64) {
        self.write_head(MAJOR_TAG, tag);
    }

    fn write_uint(&mut self, value: u64) {
        self.write_head(MAJOR_UNSIGNED, value);
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        self.write_head(MAJOR_BYTES, bytes.len() as u64);
        self.buf.extend_from_slice(bytes);
    }

    fn write_text(&mut self, text: &str) {
        self.write_head(MAJOR_TEXT, text.len() as u64);
        self.buf.extend_from_slice(text.as_bytes());
    }

    fn write_array_head(&mut self, len: usize) {
        self.write_head(MAJOR_ARRAY, len as u64);
    }

    fn write_bool(&mut self, value: bool) {
        self.buf.push(
            (MAJOR_SIMPLE << 5) | if value { SIMPLE_TRUE } else { SIMPLE_FALSE },
        );
    }

    fn write_null(&mut self) {
        self.buf.push((MAJOR_SIMPLE << 5) | SIMPLE_NULL);
    }

    /// Sign byte plus big-endian magnitude.
    fn write_bigint(&mut self, value: &BigInt) {
        let (sign, magnitude) = value.to_bytes_be();
        self.write_uint(if sign == Sign::Minus { 1 } else { 0 });
        self.write_bytes(&magnitude);
    }
}

// --- Public entry points ---

pub fn encode_value(value: &Value) -> Result<Vec<u8>, CodecError> {
    let mut encoder = Encoder::new();
    write_value(&mut encoder, value)?;
    Ok(encoder.finish())
}

pub fn decode_value(bytes: &[u8]) -> Result<Value, CodecError> {
    let mut decoder = Decoder::new(bytes);
    let value = read_value(&mut decoder)?;
    decoder.expect_end()?;
    Ok(value)
}

pub fn encode_static_type(ty: &StaticType) -> Vec<u8> {
    let mut encoder = Encoder::new();
    write_static_type(&mut encoder, ty);
    encoder.finish()
}

pub fn decode_static_type(bytes: &[u8]) -> Result<StaticType, CodecError> {
    let mut decoder = Decoder::new(bytes);
    let ty = read_static_type(&mut decoder)?;
    decoder.expect_end()?;
    Ok(ty)
}

fn write_value(encoder: &mut Encoder, value: &Value) -> Result<(), CodecError> {
    match value {
        Value::Void => {
            encoder.write_tag(TAG_VOID);
            encoder.write_null();
        }
        Value::Bool(value) => encoder.write_bool(*value),
        Value::String(value) => encoder.write_text(&value.borrow()),
        Value::Character(value) => {
            encoder.write_tag(TAG_CHARACTER);
            encoder.write_text(&value.to_string());
        }
        Value::Address(address) => {
            encoder.write_tag(TAG_ADDRESS);
            encoder.write_bytes(&address.0);
        }
        Value::Path(path) => {
            encoder.write_tag(TAG_PATH);
            write_path(encoder, path);
        }
        Value::Integer(integer) => {
            encoder.write_tag(TAG_INTEGER);
            encoder.write_array_head(2);
            encoder.write_uint(primitive_type_code(integer.kind) as u64);
            encoder.write_bigint(&integer.value);
        }
        Value::Optional(None) => encoder.write_null(),
        Value::Optional(Some(inner)) => {
            encoder.write_tag(TAG_SOME);
            write_value(encoder, inner)?;
        }
        Value::Array(array) => {
            let array = array.borrow();
            match &array.ty {
                StaticType::ConstantSizedArray { .. } => {
                    encoder.write_tag(TAG_CONSTANT_ARRAY);
                }
                _ => encoder.write_tag(TAG_ARRAY),
            }
            encoder.write_array_head(2);
            write_static_type(encoder, &array.ty);
            encoder.write_array_head(array.values.len());
            for value in &array.values {
                write_value(encoder, value)?;
            }
        }
        Value::Dictionary(dictionary) => {
            let dictionary = dictionary.borrow();
            encoder.write_tag(TAG_DICTIONARY);
            encoder.write_array_head(2);
            write_static_type(encoder, &dictionary.ty);
            encoder.write_array_head(dictionary.entries.len() * 2);
            for (key, value) in &dictionary.entries {
                write_value(encoder, &key.to_value())?;
                write_value(encoder, value)?;
            }
        }
        Value::Composite(composite) => {
            let composite = composite.borrow();
            encoder.write_tag(TAG_COMPOSITE);
            encoder.write_array_head(4);
            write_location(encoder, &composite.location);
            encoder.write_text(&composite.qualified_identifier);
            encoder.write_uint(composite_kind_code(composite.kind) as u64);
            encoder.write_array_head(composite.fields.len() * 2);
            for (name, value) in &composite.fields {
                encoder.write_text(name);
                write_value(encoder, value)?;
            }
        }
        Value::PathCapability(capability) => {
            // Dedicated legacy layout: [address, path, borrow type | nil].
            encoder.write_tag(TAG_PATH_CAPABILITY);
            encoder.write_array_head(3);
            encoder.write_bytes(&capability.address.0);
            write_path(encoder, &capability.path);
            match &capability.borrow_type {
                Some(borrow_type) => write_static_type(encoder, borrow_type),
                None => encoder.write_null(),
            }
        }
        Value::IdCapability(capability) => {
            encoder.write_tag(TAG_ID_CAPABILITY);
            encoder.write_array_head(3);
            encoder.write_bytes(&capability.address.0);
            encoder.write_uint(capability.id);
            write_static_type(encoder, &capability.borrow_type);
        }
        Value::Reference(_) => return Err(CodecError::NotStorable { kind: "reference" }),
        Value::Function(_) => return Err(CodecError::NotStorable { kind: "function" }),
        Value::Moved => return Err(CodecError::NotStorable { kind: "moved" }),
    }
    Ok(())
}

fn write_path(encoder: &mut Encoder, path: &Path) {
    encoder.write_array_head(2);
    encoder.write_uint(path_domain_code(path.domain) as u64);
    encoder.write_text(&path.identifier);
}

fn write_location(encoder: &mut Encoder, location: &Location) {
    match location {
        Location::Address { address, name } => {
            encoder.write_array_head(3);
            encoder.write_uint(0);
            encoder.write_bytes(&address.0);
            encoder.write_text(name);
        }
        Location::Script(identifier) => {
            encoder.write_array_head(2);
            encoder.write_uint(1);
            encoder.write_text(identifier);
        }
        Location::Identifier(identifier) => {
            encoder.write_array_head(2);
            encoder.write_uint(2);
            encoder.write_text(identifier);
        }
        Location::Stdlib => {
            encoder.write_array_head(1);
            encoder.write_uint(3);
        }
    }
}

fn write_static_type(encoder: &mut Encoder, ty: &StaticType) {
    match ty {
        StaticType::Primitive(kind) => {
            encoder.write_tag(TAG_TYPE_PRIMITIVE);
            encoder.write_uint(primitive_type_code(*kind) as u64);
        }
        StaticType::Composite {
            location,
            qualified_identifier,
            kind,
        } => {
            encoder.write_tag(TAG_TYPE_COMPOSITE);
            encoder.write_array_head(3);
            write_location(encoder, location);
            encoder.write_text(qualified_identifier);
            encoder.write_uint(composite_kind_code(*kind) as u64);
        }
        StaticType::Interface {
            location,
            qualified_identifier,
            kind,
        } => {
            encoder.write_tag(TAG_TYPE_INTERFACE);
            encoder.write_array_head(3);
            write_location(encoder, location);
            encoder.write_text(qualified_identifier);
            encoder.write_uint(composite_kind_code(*kind) as u64);
        }
        StaticType::Optional(inner) => {
            encoder.write_tag(TAG_TYPE_OPTIONAL);
            write_static_type(encoder, inner);
        }
        StaticType::VariableSizedArray(element) => {
            encoder.write_tag(TAG_TYPE_VARIABLE_ARRAY);
            write_static_type(encoder, element);
        }
        StaticType::ConstantSizedArray { element, size } => {
            encoder.write_tag(TAG_TYPE_CONSTANT_ARRAY);
            encoder.write_array_head(2);
            write_static_type(encoder, element);
            encoder.write_uint(*size);
        }
        StaticType::Dictionary { key, value } => {
            encoder.write_tag(TAG_TYPE_DICTIONARY);
            encoder.write_array_head(2);
            write_static_type(encoder, key);
            write_static_type(encoder, value);
        }
        StaticType::Reference {
            authorization,
            referenced,
        } => {
            encoder.write_tag(TAG_TYPE_REFERENCE);
            encoder.write_array_head(2);
            match authorization {
                Authorization::Unauthorized => encoder.write_null(),
                Authorization::Entitlements(entitlements) => {
                    encoder.write_array_head(entitlements.len());
                    for entitlement in entitlements {
                        encoder.write_text(entitlement);
                    }
                }
            }
            write_static_type(encoder, referenced);
        }
        StaticType::Capability { borrow } => {
            encoder.write_tag(TAG_TYPE_CAPABILITY);
            match borrow {
                Some(borrow) => write_static_type(encoder, borrow),
                None => encoder.write_null(),
            }
        }
        StaticType::Intersection(interfaces) => {
            encoder.write_tag(TAG_TYPE_INTERSECTION);
            encoder.write_array_head(interfaces.len());
            for interface in interfaces {
                write_static_type(encoder, interface);
            }
        }
    }
}

// --- Decoder ---

pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
}

enum Head {
    Value(u8, u64),
    Simple(u8),
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn expect_end(&self) -> Result<(), CodecError> {
        if self.pos != self.data.len() {
            return Err(CodecError::TrailingBytes);
        }
        Ok(())
    }

    fn byte(&mut self) -> Result<u8, CodecError> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or(CodecError::UnexpectedEof { offset: self.pos })?;
        self.pos += 1;
        Ok(byte)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        if self.pos + len > self.data.len() {
            return Err(CodecError::UnexpectedEof { offset: self.pos });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_head(&mut self) -> Result<Head, CodecError> {
        let initial = self.byte()?;
        let major = initial >> 5;
        let info = initial & 0x1f;
        if major == MAJOR_SIMPLE {
            return Ok(Head::Simple(info));
        }
        let value = match info {
            0..=23 => info as u64,
            24 => self.byte()? as u64,
            25 => u16::from_be_bytes(self.take(2)?.try_into().unwrap()) as u64,
            26 => u32::from_be_bytes(self.take(4)?.try_into().unwrap()) as u64,
            27 => u64::from_be_bytes(self.take(8)?.try_into().unwrap()),
            _ => {
                return Err(CodecError::UnexpectedItem {
                    offset: self.pos,
                    expected: "definite-length item",
                })
            }
        };
        Ok(Head::Value(major, value))
    }

    fn peek_is_null(&self) -> bool {
        self.data.get(self.pos) == Some(&((MAJOR_SIMPLE << 5) | SIMPLE_NULL))
    }

    fn read_null(&mut self) -> Result<(), CodecError> {
        match self.read_head()? {
            Head::Simple(SIMPLE_NULL) => Ok(()),
            _ => Err(CodecError::UnexpectedItem {
                offset: self.pos,
                expected: "null",
            }),
        }
    }

    fn read_uint(&mut self) -> Result<u64, CodecError> {
        match self.read_head()? {
            Head::Value(MAJOR_UNSIGNED, value) => Ok(value),
            _ => Err(CodecError::UnexpectedItem {
                offset: self.pos,
                expected: "unsigned integer",
            }),
        }
    }

    fn read_bytes(&mut self) -> Result<&'a [u8], CodecError> {
        match self.read_head()? {
            Head::Value(MAJOR_BYTES, len) => self.take(len as usize),
            _ => Err(CodecError::UnexpectedItem {
                offset: self.pos,
                expected: "byte string",
            }),
        }
    }

    fn read_text(&mut self) -> Result<String, CodecError> {
        match self.read_head()? {
            Head::Value(MAJOR_TEXT, len) => {
                let bytes = self.take(len as usize)?;
                String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::UnexpectedItem {
                    offset: self.pos,
                    expected: "utf-8 text",
                })
            }
            _ => Err(CodecError::UnexpectedItem {
                offset: self.pos,
                expected: "text string",
            }),
        }
    }

    fn read_array_head(&mut self, expected: usize) -> Result<(), CodecError> {
        let actual = self.read_any_array_head()?;
        if actual != expected {
            return Err(CodecError::LengthMismatch { expected, actual });
        }
        Ok(())
    }

    fn read_any_array_head(&mut self) -> Result<usize, CodecError> {
        match self.read_head()? {
            Head::Value(MAJOR_ARRAY, len) => Ok(len as usize),
            _ => Err(CodecError::UnexpectedItem {
                offset: self.pos,
                expected: "array",
            }),
        }
    }

    fn read_tag(&mut self) -> Result<u64, CodecError> {
        match self.read_head()? {
            Head::Value(MAJOR_TAG, tag) => Ok(tag),
            _ => Err(CodecError::UnexpectedItem {
                offset: self.pos,
                expected: "tag",
            }),
        }
    }

    fn read_bigint(&mut self) -> Result<BigInt, CodecError> {
        let negative = self.read_uint()? == 1;
        let magnitude = self.read_bytes()?;
        let sign = if negative { Sign::Minus } else { Sign::Plus };
        Ok(BigInt::from_bytes_be(sign, magnitude))
    }
}

fn read_value(decoder: &mut Decoder) -> Result<Value, CodecError> {
    if decoder.peek_is_null() {
        decoder.read_null()?;
        return Ok(Value::nil());
    }
    match decoder.read_head()? {
        Head::Simple(SIMPLE_TRUE) => return Ok(Value::Bool(true)),
        Head::Simple(SIMPLE_FALSE) => return Ok(Value::Bool(false)),
        Head::Value(MAJOR_TEXT, len) => {
            let bytes = decoder.take(len as usize)?;
            let text =
                String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::UnexpectedItem {
                    offset: decoder.pos,
                    expected: "utf-8 text",
                })?;
            return Ok(Value::string(text));
        }
        Head::Value(MAJOR_TAG, tag) => return read_tagged_value(decoder, tag),
        _ => {
            return Err(CodecError::UnexpectedItem {
                offset: decoder.pos,
                expected: "value",
            })
        }
    }
}

fn read_tagged_value(decoder: &mut Decoder, tag: u64) -> Result<Value, CodecError> {
    match tag {
        TAG_VOID => {
            decoder.read_null()?;
            Ok(Value::Void)
        }
        TAG_CHARACTER => {
            let text = decoder.read_text()?;
            let mut chars = text.chars();
            let (Some(character), None) = (chars.next(), chars.next()) else {
                return Err(CodecError::UnexpectedItem {
                    offset: decoder.pos,
                    expected: "single character",
                });
            };
            Ok(Value::Character(character))
        }
        TAG_ADDRESS => Ok(Value::Address(read_address(decoder)?)),
        TAG_PATH => Ok(Value::Path(read_path(decoder)?)),
        TAG_INTEGER => {
            decoder.read_array_head(2)?;
            let kind = primitive_type_from_code(decoder.read_uint()?)?;
            let value = decoder.read_bigint()?;
            Ok(Value::Integer(IntegerValue::new(kind, value)))
        }
        TAG_SOME => Ok(Value::some(read_value(decoder)?)),
        TAG_ARRAY | TAG_CONSTANT_ARRAY => {
            decoder.read_array_head(2)?;
            let ty = read_static_type(decoder)?;
            let len = decoder.read_any_array_head()?;
            let mut values = Vec::with_capacity(len);
            for _ in 0..len {
                values.push(read_value(decoder)?);
            }
            Ok(Value::array(ty, values))
        }
        TAG_DICTIONARY => {
            decoder.read_array_head(2)?;
            let ty = read_static_type(decoder)?;
            let len = decoder.read_any_array_head()?;
            if len % 2 != 0 {
                return Err(CodecError::LengthMismatch {
                    expected: len + 1,
                    actual: len,
                });
            }
            let mut entries = IndexMap::with_capacity(len / 2);
            for _ in 0..len / 2 {
                let key_value = read_value(decoder)?;
                let key = DictionaryKey::from_value(&key_value)
                    .ok_or(CodecError::InvalidDictionaryKey)?;
                let value = read_value(decoder)?;
                entries.insert(key, value);
            }
            Ok(Value::dictionary(ty, entries))
        }
        TAG_COMPOSITE => {
            decoder.read_array_head(4)?;
            let location = read_location(decoder)?;
            let qualified_identifier = decoder.read_text()?;
            let kind = composite_kind_from_code(decoder.read_uint()?)?;
            let len = decoder.read_any_array_head()?;
            if len % 2 != 0 {
                return Err(CodecError::LengthMismatch {
                    expected: len + 1,
                    actual: len,
                });
            }
            let mut composite = CompositeValue::new(location, qualified_identifier, kind);
            for _ in 0..len / 2 {
                let name = decoder.read_text()?;
                let value = read_value(decoder)?;
                composite.fields.insert(name, value);
            }
            Ok(Value::composite(composite))
        }
        TAG_PATH_CAPABILITY => {
            decoder.read_array_head(3)?;
            let address = read_address(decoder)?;
            let path = read_path(decoder)?;
            let borrow_type = if decoder.peek_is_null() {
                decoder.read_null()?;
                None
            } else {
                Some(read_static_type(decoder)?)
            };
            Ok(Value::PathCapability(PathCapabilityValue {
                address,
                path,
                borrow_type,
            }))
        }
        TAG_ID_CAPABILITY => {
            decoder.read_array_head(3)?;
            let address = read_address(decoder)?;
            let id = decoder.read_uint()?;
            let borrow_type = read_static_type(decoder)?;
            Ok(Value::IdCapability(IdCapabilityValue {
                address,
                id,
                borrow_type,
            }))
        }
        tag => Err(CodecError::UnknownTag { tag }),
    }
}

fn read_address(decoder: &mut Decoder) -> Result<Address, CodecError> {
    let bytes = decoder.read_bytes()?;
    let bytes: [u8; 8] = bytes.try_into().map_err(|_| CodecError::UnexpectedItem {
        offset: decoder.pos,
        expected: "8-byte address",
    })?;
    Ok(Address(bytes))
}

fn read_path(decoder: &mut Decoder) -> Result<Path, CodecError> {
    decoder.read_array_head(2)?;
    let domain = path_domain_from_code(decoder.read_uint()?)?;
    let identifier = decoder.read_text()?;
    Ok(Path { domain, identifier })
}

fn read_location(decoder: &mut Decoder) -> Result<Location, CodecError> {
    let len = decoder.read_any_array_head()?;
    let discriminant = decoder.read_uint()?;
    match (discriminant, len) {
        (0, 3) => {
            let address = read_address(decoder)?;
            let name = decoder.read_text()?;
            Ok(Location::Address { address, name })
        }
        (1, 2) => Ok(Location::Script(decoder.read_text()?)),
        (2, 2) => Ok(Location::Identifier(decoder.read_text()?)),
        (3, 1) => Ok(Location::Stdlib),
        (value, _) => Err(CodecError::InvalidDiscriminant { value }),
    }
}

fn read_static_type(decoder: &mut Decoder) -> Result<StaticType, CodecError> {
    let tag = decoder.read_tag()?;
    match tag {
        TAG_TYPE_PRIMITIVE => Ok(StaticType::Primitive(primitive_type_from_code(
            decoder.read_uint()?,
        )?)),
        TAG_TYPE_COMPOSITE | TAG_TYPE_INTERFACE => {
            decoder.read_array_head(3)?;
            let location = read_location(decoder)?;
            let qualified_identifier = decoder.read_text()?;
            let kind = composite_kind_from_code(decoder.read_uint()?)?;
            Ok(if tag == TAG_TYPE_COMPOSITE {
                StaticType::Composite {
                    location,
                    qualified_identifier,
                    kind,
                }
            } else {
                StaticType::Interface {
                    location,
                    qualified_identifier,
                    kind,
                }
            })
        }
        TAG_TYPE_OPTIONAL => Ok(StaticType::Optional(Box::new(read_static_type(decoder)?))),
        TAG_TYPE_VARIABLE_ARRAY => Ok(StaticType::VariableSizedArray(Box::new(read_static_type(
            decoder,
        )?))),
        TAG_TYPE_CONSTANT_ARRAY => {
            decoder.read_array_head(2)?;
            let element = Box::new(read_static_type(decoder)?);
            let size = decoder.read_uint()?;
            Ok(StaticType::ConstantSizedArray { element, size })
        }
        TAG_TYPE_DICTIONARY => {
            decoder.read_array_head(2)?;
            let key = Box::new(read_static_type(decoder)?);
            let value = Box::new(read_static_type(decoder)?);
            Ok(StaticType::Dictionary { key, value })
        }
        TAG_TYPE_REFERENCE => {
            decoder.read_array_head(2)?;
            let authorization = if decoder.peek_is_null() {
                decoder.read_null()?;
                Authorization::Unauthorized
            } else {
                let len = decoder.read_any_array_head()?;
                let mut entitlements = std::collections::BTreeSet::new();
                for _ in 0..len {
                    entitlements.insert(decoder.read_text()?);
                }
                Authorization::Entitlements(entitlements)
            };
            let referenced = Box::new(read_static_type(decoder)?);
            Ok(StaticType::Reference {
                authorization,
                referenced,
            })
        }
        TAG_TYPE_CAPABILITY => {
            let borrow = if decoder.peek_is_null() {
                decoder.read_null()?;
                None
            } else {
                Some(Box::new(read_static_type(decoder)?))
            };
            Ok(StaticType::Capability { borrow })
        }
        TAG_TYPE_INTERSECTION => {
            let len = decoder.read_any_array_head()?;
            let mut interfaces = Vec::with_capacity(len);
            for _ in 0..len {
                interfaces.push(read_static_type(decoder)?);
            }
            Ok(StaticType::Intersection(interfaces))
        }
        tag => Err(CodecError::UnknownTag { tag }),
    }
}

// --- Capability controllers ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityControllerRecord {
    pub id: u64,
    pub target: Path,
    pub borrow_type: StaticType,
    pub revoked: bool,
}

pub fn encode_controller(controller: &CapabilityControllerRecord) -> Vec<u8> {
    let mut encoder = Encoder::new();
    encoder.write_tag(TAG_CAPABILITY_CONTROLLER);
    encoder.write_array_head(4);
    encoder.write_uint(controller.id);
    write_path(&mut encoder, &controller.target);
    write_static_type(&mut encoder, &controller.borrow_type);
    encoder.write_bool(controller.revoked);
    encoder.finish()
}

pub fn decode_controller(bytes: &[u8]) -> Result<CapabilityControllerRecord, CodecError> {
    let mut decoder = Decoder::new(bytes);
    let tag = decoder.read_tag()?;
    if tag != TAG_CAPABILITY_CONTROLLER {
        return Err(CodecError::UnknownTag { tag });
    }
    decoder.read_array_head(4)?;
    let id = decoder.read_uint()?;
    let target = read_path(&mut decoder)?;
    let borrow_type = read_static_type(&mut decoder)?;
    let revoked = match decoder.read_head()? {
        Head::Simple(SIMPLE_TRUE) => true,
        Head::Simple(SIMPLE_FALSE) => false,
        _ => {
            return Err(CodecError::UnexpectedItem {
                offset: decoder.pos,
                expected: "bool",
            })
        }
    };
    decoder.expect_end()?;
    Ok(CapabilityControllerRecord {
        id,
        target,
        borrow_type,
        revoked,
    })
}

// --- Stable discriminants (append-only) ---

fn primitive_type_code(kind: PrimitiveType) -> u8 {
    match kind {
        PrimitiveType::Void => 0,
        PrimitiveType::Bool => 1,
        PrimitiveType::String => 2,
        PrimitiveType::Character => 3,
        PrimitiveType::Address => 4,
        PrimitiveType::Path => 5,
        PrimitiveType::Int => 6,
        PrimitiveType::UInt => 7,
        PrimitiveType::Int8 => 8,
        PrimitiveType::Int16 => 9,
        PrimitiveType::Int32 => 10,
        PrimitiveType::Int64 => 11,
        PrimitiveType::Int128 => 12,
        PrimitiveType::Int256 => 13,
        PrimitiveType::UInt8 => 14,
        PrimitiveType::UInt16 => 15,
        PrimitiveType::UInt32 => 16,
        PrimitiveType::UInt64 => 17,
        PrimitiveType::UInt128 => 18,
        PrimitiveType::UInt256 => 19,
        PrimitiveType::Fix64 => 20,
        PrimitiveType::UFix64 => 21,
        PrimitiveType::AnyStruct => 22,
        PrimitiveType::AnyResource => 23,
    }
}

fn primitive_type_from_code(code: u64) -> Result<PrimitiveType, CodecError> {
    use PrimitiveType::*;
    Ok(match code {
        0 => Void,
        1 => Bool,
        2 => String,
        3 => Character,
        4 => Address,
        5 => Path,
        6 => Int,
        7 => UInt,
        8 => Int8,
        9 => Int16,
        10 => Int32,
        11 => Int64,
        12 => Int128,
        13 => Int256,
        14 => UInt8,
        15 => UInt16,
        16 => UInt32,
        17 => UInt64,
        18 => UInt128,
        19 => UInt256,
        20 => Fix64,
        21 => UFix64,
        22 => AnyStruct,
        23 => AnyResource,
        value => return Err(CodecError::InvalidDiscriminant { value }),
    })
}

fn composite_kind_code(kind: CompositeKind) -> u8 {
    match kind {
        CompositeKind::Struct => 0,
        CompositeKind::Resource => 1,
        CompositeKind::Contract => 2,
        CompositeKind::Enum => 3,
        CompositeKind::Attachment => 4,
        CompositeKind::Event => 5,
    }
}

fn composite_kind_from_code(code: u64) -> Result<CompositeKind, CodecError> {
    Ok(match code {
        0 => CompositeKind::Struct,
        1 => CompositeKind::Resource,
        2 => CompositeKind::Contract,
        3 => CompositeKind::Enum,
        4 => CompositeKind::Attachment,
        5 => CompositeKind::Event,
        value => return Err(CodecError::InvalidDiscriminant { value }),
    })
}

fn path_domain_code(domain: PathDomain) -> u8 {
    match domain {
        PathDomain::Storage => 1,
        PathDomain::Public => 2,
        PathDomain::Private => 3,
    }
}

fn path_domain_from_code(code: u64) -> Result<PathDomain, CodecError> {
    Ok(match code {
        1 => PathDomain::Storage,
        2 => PathDomain::Public,
        3 => PathDomain::Private,
        value => return Err(CodecError::InvalidDiscriminant { value }),
    })
}

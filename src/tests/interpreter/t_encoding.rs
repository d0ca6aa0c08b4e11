use indexmap::IndexMap;
use num_bigint::BigInt;

use crate::ast::CompositeKind;
use crate::common::{Address, Location, Path, PathDomain};
use crate::interpreter::encoding::{
    decode_controller, decode_static_type, decode_value, encode_controller, encode_static_type,
    encode_value, CapabilityControllerRecord, CodecError,
};
use crate::interpreter::value::{
    CompositeValue, DictionaryKey, IdCapabilityValue, IntegerValue, PathCapabilityValue, Value,
};
use crate::types::{Authorization, PrimitiveType, StaticType};

fn round_trip(value: &Value) {
    let bytes = encode_value(value).expect("encodes");
    let decoded = decode_value(&bytes).expect("decodes");
    assert!(
        value.equal(&decoded) || structural_composite_eq(value, &decoded),
        "round trip changed value: {value} != {decoded}",
    );
}

// Resource composites never compare equal through `equal`; compare their
// encodings instead.
fn structural_composite_eq(left: &Value, right: &Value) -> bool {
    match (encode_value(left), encode_value(right)) {
        (Ok(left), Ok(right)) => left == right,
        _ => false,
    }
}

fn reference_type(referenced: StaticType) -> StaticType {
    StaticType::Reference {
        authorization: Authorization::Unauthorized,
        referenced: Box::new(referenced),
    }
}

#[test]
fn test_primitive_round_trips() {
    round_trip(&Value::Void);
    round_trip(&Value::Bool(true));
    round_trip(&Value::Bool(false));
    round_trip(&Value::string("hello"));
    round_trip(&Value::Character('é'));
    round_trip(&Value::Address(Address::from_u64(0x42)));
    round_trip(&Value::Path(Path::new(PathDomain::Public, "counter")));
}

#[test]
fn test_integer_round_trips() {
    round_trip(&Value::Integer(IntegerValue::int(0)));
    round_trip(&Value::Integer(IntegerValue::int(-123456789)));
    round_trip(&Value::Integer(IntegerValue::new(
        PrimitiveType::UInt256,
        BigInt::from(1u8) << 200u32,
    )));
    round_trip(&Value::Integer(IntegerValue::new(
        PrimitiveType::Int8,
        BigInt::from(-128),
    )));
    round_trip(&Value::Integer(IntegerValue::new(
        PrimitiveType::Fix64,
        BigInt::from(150000000u64),
    )));
}

#[test]
fn test_optional_round_trips() {
    round_trip(&Value::nil());
    round_trip(&Value::some(Value::Integer(IntegerValue::int(7))));
    round_trip(&Value::some(Value::some(Value::Bool(true))));
}

#[test]
fn test_array_round_trip() {
    let array = Value::array(
        StaticType::VariableSizedArray(Box::new(StaticType::Primitive(PrimitiveType::Int))),
        vec![
            Value::Integer(IntegerValue::int(1)),
            Value::Integer(IntegerValue::int(2)),
        ],
    );
    round_trip(&array);
}

#[test]
fn test_dictionary_round_trip() {
    let mut entries = IndexMap::new();
    entries.insert(
        DictionaryKey::String("a".to_string()),
        Value::Integer(IntegerValue::int(1)),
    );
    entries.insert(
        DictionaryKey::String("b".to_string()),
        Value::Integer(IntegerValue::int(2)),
    );
    let dictionary = Value::dictionary(
        StaticType::Dictionary {
            key: Box::new(StaticType::Primitive(PrimitiveType::String)),
            value: Box::new(StaticType::Primitive(PrimitiveType::Int)),
        },
        entries,
    );
    round_trip(&dictionary);
}

#[test]
fn test_composite_round_trip() {
    let mut composite = CompositeValue::new(
        Location::Address {
            address: Address::from_u64(1),
            name: "Token".to_string(),
        },
        "Token.Vault",
        CompositeKind::Resource,
    );
    composite
        .fields
        .insert("balance".to_string(), Value::Integer(IntegerValue::int(100)));
    composite
        .fields
        .insert("frozen".to_string(), Value::Bool(false));
    round_trip(&Value::composite(composite));
}

#[test]
fn test_path_capability_round_trip_with_borrow_type() {
    round_trip(&Value::PathCapability(PathCapabilityValue {
        address: Address::from_u64(1),
        path: Path::new(PathDomain::Public, "x"),
        borrow_type: Some(reference_type(StaticType::Primitive(PrimitiveType::Bool))),
    }));
}

#[test]
fn test_path_capability_round_trip_without_borrow_type() {
    // The third element of the legacy layout is nil for untyped
    // capabilities; decoding must accept it.
    round_trip(&Value::PathCapability(PathCapabilityValue {
        address: Address::from_u64(1),
        path: Path::new(PathDomain::Storage, "x"),
        borrow_type: None,
    }));
}

#[test]
fn test_id_capability_round_trip() {
    round_trip(&Value::IdCapability(IdCapabilityValue {
        address: Address::from_u64(3),
        id: 42,
        borrow_type: reference_type(StaticType::Primitive(PrimitiveType::String)),
    }));
}

#[test]
fn test_static_type_round_trips() {
    let types = [
        StaticType::Primitive(PrimitiveType::UInt64),
        StaticType::Optional(Box::new(StaticType::Primitive(PrimitiveType::Bool))),
        StaticType::VariableSizedArray(Box::new(StaticType::Primitive(PrimitiveType::Int))),
        StaticType::ConstantSizedArray {
            element: Box::new(StaticType::Primitive(PrimitiveType::UInt8)),
            size: 32,
        },
        StaticType::Dictionary {
            key: Box::new(StaticType::Primitive(PrimitiveType::String)),
            value: Box::new(StaticType::Primitive(PrimitiveType::Path)),
        },
        StaticType::Reference {
            authorization: Authorization::entitlements([
                "Withdraw".to_string(),
                "Deposit".to_string(),
            ]),
            referenced: Box::new(StaticType::Composite {
                location: Location::Address {
                    address: Address::from_u64(9),
                    name: "Token".to_string(),
                },
                qualified_identifier: "Token.Vault".to_string(),
                kind: CompositeKind::Resource,
            }),
        },
        StaticType::Capability { borrow: None },
        StaticType::Intersection(vec![StaticType::Interface {
            location: Location::Stdlib,
            qualified_identifier: "Receiver".to_string(),
            kind: CompositeKind::Resource,
        }]),
    ];
    for ty in types {
        let bytes = encode_static_type(&ty);
        let decoded = decode_static_type(&bytes).expect("decodes");
        assert_eq!(ty, decoded);
    }
}

#[test]
fn test_controller_record_round_trip() {
    let record = CapabilityControllerRecord {
        id: 7,
        target: Path::new(PathDomain::Storage, "vault"),
        borrow_type: reference_type(StaticType::Primitive(PrimitiveType::Bool)),
        revoked: true,
    };
    let bytes = encode_controller(&record);
    assert_eq!(decode_controller(&bytes).expect("decodes"), record);
}

#[test]
fn test_unknown_tag_is_rejected() {
    // Tag 99 is outside the assigned ranges.
    let bytes = [0xd8, 99, 0xf6];
    match decode_value(&bytes) {
        Err(CodecError::UnknownTag { tag: 99 }) => {}
        other => panic!("expected unknown tag error, got {other:?}"),
    }
}

#[test]
fn test_trailing_bytes_are_rejected() {
    let mut bytes = encode_value(&Value::Bool(true)).expect("encodes");
    bytes.push(0x00);
    assert!(matches!(
        decode_value(&bytes),
        Err(CodecError::TrailingBytes),
    ));
}

#[test]
fn test_functions_are_not_storable() {
    let function = Value::Function(crate::interpreter::value::FunctionValue::Constructor(
        "S".to_string(),
    ));
    assert!(matches!(
        encode_value(&function),
        Err(CodecError::NotStorable { .. }),
    ));
}

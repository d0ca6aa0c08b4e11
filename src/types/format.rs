//! Stable type identifier strings.

use crate::types::{Authorization, Type, TypeCache, TypeId};

/// Renders the stable identifier of a type, e.g. `A.0000000000000001.C`,
/// `[Int]`, `auth(Withdraw)&Vault`, `Capability<&Counter>`.
pub fn type_string(cache: &TypeCache, id: TypeId) -> String {
    match cache.get(id) {
        Type::Never => "Never".to_string(),
        Type::Primitive(kind) => kind.name().to_string(),
        Type::Composite(key) | Type::Interface(key) => key.type_id(),
        Type::Optional(inner) => format!("{}?", type_string(cache, *inner)),
        Type::VariableSizedArray(element) => format!("[{}]", type_string(cache, *element)),
        Type::ConstantSizedArray { element, size } => {
            format!("[{}; {}]", type_string(cache, *element), size)
        }
        Type::Dictionary { key, value } => {
            format!(
                "{{{}: {}}}",
                type_string(cache, *key),
                type_string(cache, *value)
            )
        }
        Type::Reference {
            authorization,
            referenced,
        } => match authorization {
            Authorization::Unauthorized => format!("&{}", type_string(cache, *referenced)),
            Authorization::Entitlements(entitlements) => {
                let list = entitlements.iter().cloned().collect::<Vec<_>>().join(", ");
                format!("auth({})&{}", list, type_string(cache, *referenced))
            }
        },
        Type::Capability { borrow: None } => "Capability".to_string(),
        Type::Capability { borrow: Some(borrow) } => {
            format!("Capability<{}>", type_string(cache, *borrow))
        }
        Type::Function(function) => {
            let parameters = function
                .parameters
                .iter()
                .map(|parameter| type_string(cache, parameter.ty))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "fun({}): {}",
                parameters,
                type_string(cache, function.return_type)
            )
        }
        Type::Generic(parameter) => parameter.name.clone(),
        Type::Intersection(interfaces) => {
            let list = interfaces
                .iter()
                .map(|interface| type_string(cache, *interface))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{{{list}}}")
        }
    }
}

//! Subtyping and kind predicates over the type arena.

use crate::types::{NominalRegistry, PrimitiveType, Type, TypeCache, TypeId};

/// Whether `sub` is a subtype of `sup`. Reflexive and transitive.
pub fn is_subtype(
    cache: &TypeCache,
    registry: &NominalRegistry,
    sub: TypeId,
    sup: TypeId,
) -> bool {
    // Interning: identical handles are identical types.
    if sub == sup {
        return true;
    }

    let sub_ty = cache.get(sub);
    let sup_ty = cache.get(sup);

    if matches!(sub_ty, Type::Never) {
        return true;
    }

    match sup_ty {
        Type::Primitive(PrimitiveType::AnyStruct) => {
            return !is_resource_kinded(cache, sub) && !matches!(sub_ty, Type::Never);
        }
        Type::Primitive(PrimitiveType::AnyResource) => {
            return is_resource_kinded(cache, sub);
        }
        _ => {}
    }

    match (sub_ty, sup_ty) {
        // T ≤ U? iff T ≤ U; T? ≤ U? iff T ≤ U.
        (Type::Optional(sub_inner), Type::Optional(sup_inner)) => {
            is_subtype(cache, registry, *sub_inner, *sup_inner)
        }
        (_, Type::Optional(sup_inner)) => is_subtype(cache, registry, sub, *sup_inner),

        (Type::VariableSizedArray(sub_elem), Type::VariableSizedArray(sup_elem)) => {
            is_subtype(cache, registry, *sub_elem, *sup_elem)
        }
        (
            Type::ConstantSizedArray {
                element: sub_elem,
                size: sub_size,
            },
            Type::ConstantSizedArray {
                element: sup_elem,
                size: sup_size,
            },
        ) => sub_size == sup_size && is_subtype(cache, registry, *sub_elem, *sup_elem),

        (
            Type::Dictionary {
                key: sub_key,
                value: sub_value,
            },
            Type::Dictionary {
                key: sup_key,
                value: sup_value,
            },
        ) => {
            is_subtype(cache, registry, *sub_key, *sup_key)
                && is_subtype(cache, registry, *sub_value, *sup_value)
        }

        // References are covariant in the referenced type; the subtype must
        // grant at least the entitlements the supertype claims.
        (
            Type::Reference {
                authorization: sub_auth,
                referenced: sub_ref,
            },
            Type::Reference {
                authorization: sup_auth,
                referenced: sup_ref,
            },
        ) => {
            let auth_ok = match sup_auth {
                crate::types::Authorization::Unauthorized => true,
                crate::types::Authorization::Entitlements(required) => sub_auth.satisfies(required),
            };
            auth_ok && is_subtype(cache, registry, *sub_ref, *sup_ref)
        }

        (Type::Capability { borrow: _ }, Type::Capability { borrow: None }) => true,
        (Type::Capability { borrow: Some(sub_borrow) }, Type::Capability { borrow: Some(sup_borrow) }) => {
            is_subtype(cache, registry, *sub_borrow, *sup_borrow)
        }

        // Parameters are contravariant, the return type covariant. Argument
        // labels and arity are part of the type.
        (Type::Function(sub_fn), Type::Function(sup_fn)) => {
            sub_fn.is_constructor == sup_fn.is_constructor
                && sub_fn.parameters.len() == sup_fn.parameters.len()
                && sub_fn
                    .parameters
                    .iter()
                    .zip(&sup_fn.parameters)
                    .all(|(sub_param, sup_param)| {
                        sub_param.label == sup_param.label
                            && is_subtype(cache, registry, sup_param.ty, sub_param.ty)
                    })
                && is_subtype(cache, registry, sub_fn.return_type, sup_fn.return_type)
        }

        // A composite is a subtype of every interface it conforms to.
        (Type::Composite(_), Type::Interface(_)) => conforms_to(registry, sub, sup),

        // `T ≤ {I₁, …, Iₙ}` iff T satisfies every member of the intersection.
        (Type::Composite(_), Type::Intersection(interfaces)) => interfaces
            .iter()
            .all(|interface| conforms_to(registry, sub, *interface)),

        // `{…}` narrows by *growing* the interface set.
        (Type::Intersection(sub_set), Type::Intersection(sup_set)) => {
            sup_set.iter().all(|interface| sub_set.contains(interface))
        }
        (Type::Intersection(sub_set), Type::Interface(_)) => sub_set.contains(&sup),

        _ => false,
    }
}

fn conforms_to(registry: &NominalRegistry, composite: TypeId, interface: TypeId) -> bool {
    registry.conformances(composite).contains(&interface)
}

/// Whether values of the type obey resource (linear) semantics.
pub fn is_resource_kinded(cache: &TypeCache, id: TypeId) -> bool {
    match cache.get(id) {
        Type::Primitive(PrimitiveType::AnyResource) => true,
        Type::Composite(key) | Type::Interface(key) => key.kind.is_resource(),
        Type::Optional(inner)
        | Type::VariableSizedArray(inner)
        | Type::ConstantSizedArray { element: inner, .. } => is_resource_kinded(cache, *inner),
        Type::Dictionary { value, .. } => is_resource_kinded(cache, *value),
        Type::Intersection(interfaces) => interfaces
            .iter()
            .any(|interface| is_resource_kinded(cache, *interface)),
        _ => false,
    }
}

use std::collections::BTreeSet;

use serde::Serialize;

/// A resolved type: the closed grammar every emitter matches on.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TypeIr {
    Any,
    Null,
    Boolean,
    String,
    Number,
    Literal(serde_json::Value),
    /// Reference to an emitted model by its allocated identifier.
    Ref(String),
    Array(Box<TypeIr>),
    /// String-keyed map with the given value type.
    Map(Box<TypeIr>),
    Union(Vec<TypeIr>),
    Intersection(Vec<TypeIr>),
    Object(ObjectType),
}

/// An inline object shape.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ObjectType {
    pub props: Vec<Property>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Box<TypeIr>>,
}

/// A named property of an object node or model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Property {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeIr,
    pub optional: bool,
}

impl TypeIr {
    /// Build a union: nested unions are spliced in, structurally identical
    /// members collapse, and a single survivor is returned unwrapped.
    pub fn union(members: impl IntoIterator<Item = TypeIr>) -> TypeIr {
        let mut flat: Vec<TypeIr> = Vec::new();
        for member in members {
            match member {
                TypeIr::Union(inner) => {
                    for m in inner {
                        push_unique(&mut flat, m);
                    }
                }
                other => push_unique(&mut flat, other),
            }
        }
        collapse(flat, TypeIr::Union)
    }

    /// Build an intersection with the same splicing and deduplication rules
    /// as [`TypeIr::union`].
    pub fn intersection(members: impl IntoIterator<Item = TypeIr>) -> TypeIr {
        let mut flat: Vec<TypeIr> = Vec::new();
        for member in members {
            match member {
                TypeIr::Intersection(inner) => {
                    for m in inner {
                        push_unique(&mut flat, m);
                    }
                }
                other => push_unique(&mut flat, other),
            }
        }
        collapse(flat, TypeIr::Intersection)
    }

    /// Widen this type to admit `null`.
    pub fn nullable(self) -> TypeIr {
        match self {
            TypeIr::Null | TypeIr::Any => self,
            other => TypeIr::union([other, TypeIr::Null]),
        }
    }

    pub fn is_nullable(&self) -> bool {
        match self {
            TypeIr::Null | TypeIr::Any => true,
            TypeIr::Union(members) => members.iter().any(TypeIr::is_nullable),
            _ => false,
        }
    }

    /// Structural equality: union/intersection members compare as sets and
    /// object properties compare by name regardless of declaration order.
    pub fn same_shape(&self, other: &TypeIr) -> bool {
        match (self, other) {
            (TypeIr::Any, TypeIr::Any)
            | (TypeIr::Null, TypeIr::Null)
            | (TypeIr::Boolean, TypeIr::Boolean)
            | (TypeIr::String, TypeIr::String)
            | (TypeIr::Number, TypeIr::Number) => true,
            (TypeIr::Literal(a), TypeIr::Literal(b)) => a == b,
            (TypeIr::Ref(a), TypeIr::Ref(b)) => a == b,
            (TypeIr::Array(a), TypeIr::Array(b)) | (TypeIr::Map(a), TypeIr::Map(b)) => {
                a.same_shape(b)
            }
            (TypeIr::Union(a), TypeIr::Union(b))
            | (TypeIr::Intersection(a), TypeIr::Intersection(b)) => same_member_set(a, b),
            (TypeIr::Object(a), TypeIr::Object(b)) => a.same_shape(b),
            _ => false,
        }
    }

    /// Collect every `ref` identifier reachable from this node.
    pub fn collect_refs(&self, out: &mut BTreeSet<String>) {
        match self {
            TypeIr::Ref(name) => {
                out.insert(name.clone());
            }
            TypeIr::Array(inner) | TypeIr::Map(inner) => inner.collect_refs(out),
            TypeIr::Union(members) | TypeIr::Intersection(members) => {
                for m in members {
                    m.collect_refs(out);
                }
            }
            TypeIr::Object(obj) => {
                for p in &obj.props {
                    p.ty.collect_refs(out);
                }
                if let Some(ap) = &obj.additional_properties {
                    ap.collect_refs(out);
                }
            }
            TypeIr::Any
            | TypeIr::Null
            | TypeIr::Boolean
            | TypeIr::String
            | TypeIr::Number
            | TypeIr::Literal(_) => {}
        }
    }
}

impl ObjectType {
    pub fn prop(&self, name: &str) -> Option<&Property> {
        self.props.iter().find(|p| p.name == name)
    }

    fn same_shape(&self, other: &ObjectType) -> bool {
        let additional_matches = match (&self.additional_properties, &other.additional_properties) {
            (None, None) => true,
            (Some(a), Some(b)) => a.same_shape(b),
            _ => false,
        };
        additional_matches
            && self.props.len() == other.props.len()
            && self.props.iter().all(|p| {
                other.prop(&p.name).is_some_and(|q| {
                    p.optional == q.optional && p.ty.same_shape(&q.ty)
                })
            })
    }
}

fn push_unique(members: &mut Vec<TypeIr>, candidate: TypeIr) {
    if !members.iter().any(|m| m.same_shape(&candidate)) {
        members.push(candidate);
    }
}

fn collapse(mut members: Vec<TypeIr>, wrap: fn(Vec<TypeIr>) -> TypeIr) -> TypeIr {
    match members.len() {
        0 => TypeIr::Any,
        1 => members.remove(0),
        _ => wrap(members),
    }
}

fn same_member_set(a: &[TypeIr], b: &[TypeIr]) -> bool {
    a.len() == b.len()
        && a.iter().all(|x| b.iter().any(|y| x.same_shape(y)))
        && b.iter().all(|y| a.iter().any(|x| x.same_shape(y)))
}

/// One model per selected, model-shaped catalog schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelDefinition {
    /// Allocated identifier.
    pub name: String,
    /// Raw catalog key the model was built from.
    pub source: String,
    pub props: Vec<Property>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<TypeIr>,
    /// Sorted identifiers of other emitted models this one references.
    pub imports: Vec<String>,
    /// Sibling models contributed by an unflattenable `allOf`.
    pub extends: Vec<String>,
    /// Set when the family's protocol envelope was stripped from `props`.
    pub extends_marker: bool,
}

impl ModelDefinition {
    pub fn prop(&self, name: &str) -> Option<&Property> {
        self.props.iter().find(|p| p.name == name)
    }
}

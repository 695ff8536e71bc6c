// Copyright (c) The delegate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serialization adapters for values that don't have a natural JSON shape.
//!
//! The remote side produces its payload with a reflection-based serializer, so a handful of
//! value types show up in forms that a plain `#[derive(Deserialize)]` won't accept. Each adapter
//! here owns one of those forms. The adapters are selected by [`ValueKind`], and
//! [`field_kind`] declares which wire fields carry which kind.

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::{
    fmt,
    sync::atomic::{AtomicI32, AtomicI64, Ordering},
};

/// A kind of value that needs an adapter, or that must be dropped before decoding.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum ValueKind {
    /// An annotation attached to a test description. See [`Annotation`].
    Annotation,

    /// A maybe-present value, encoded as `{"present": bool, "value": ...}`. See [`maybe`].
    Maybe,

    /// An atomic 32-bit counter, encoded as a plain number. See [`atomic_i32`].
    AtomicInteger,

    /// An atomic 64-bit counter, encoded as a plain number. See [`atomic_i64`].
    AtomicLong,

    /// A class literal, encoded as the class name. See [`ClassLiteral`].
    ClassLiteral,

    /// A value whose only declared type is the generic serializable marker.
    ///
    /// Such values carry no meaningful data and have no stable shape, so they can't be decoded.
    SerializableMarker,
}

impl ValueKind {
    /// All known value kinds.
    pub const ALL: [ValueKind; 6] = [
        ValueKind::Annotation,
        ValueKind::Maybe,
        ValueKind::AtomicInteger,
        ValueKind::AtomicLong,
        ValueKind::ClassLiteral,
        ValueKind::SerializableMarker,
    ];

    /// Returns a short name for this kind.
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Annotation => "annotation",
            ValueKind::Maybe => "maybe",
            ValueKind::AtomicInteger => "atomic-integer",
            ValueKind::AtomicLong => "atomic-long",
            ValueKind::ClassLiteral => "class-literal",
            ValueKind::SerializableMarker => "serializable-marker",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returns the declared kind of a wire field, if it needs special handling.
///
/// Field names are matched regardless of which object they appear in. Both the prefixed names
/// emitted by the remote side and their unprefixed aliases are listed.
pub fn field_kind(field: &str) -> Option<ValueKind> {
    match field {
        "fAnnotations" | "annotations" => Some(ValueKind::Annotation),
        "testResult" => Some(ValueKind::Maybe),
        "count" | "ignoreCount" => Some(ValueKind::AtomicInteger),
        "runTime" | "startTime" => Some(ValueKind::AtomicLong),
        "fTestClass" | "testClass" => Some(ValueKind::ClassLiteral),
        "fUniqueId" | "uniqueId" => Some(ValueKind::SerializableMarker),
        _ => None,
    }
}

/// An annotation attached to a remote test description.
///
/// Annotations carry no serializable state of their own: only the annotation type survives the
/// trip. Serialized as `{"annotationType": "<type>"}`; a bare string is also accepted.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Annotation {
    annotation_type: String,
}

impl Annotation {
    /// Creates a new annotation of the given type.
    pub fn new(annotation_type: impl Into<String>) -> Self {
        Self {
            annotation_type: annotation_type.into(),
        }
    }

    /// The fully-qualified annotation type.
    pub fn annotation_type(&self) -> &str {
        &self.annotation_type
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotationObject<T> {
    annotation_type: T,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AnnotationRepr {
    Bare(String),
    Object(AnnotationObject<String>),
}

impl Serialize for Annotation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        AnnotationObject {
            annotation_type: self.annotation_type.as_str(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Annotation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let annotation_type = match AnnotationRepr::deserialize(deserializer)? {
            AnnotationRepr::Bare(annotation_type) => annotation_type,
            AnnotationRepr::Object(object) => object.annotation_type,
        };
        Ok(Self { annotation_type })
    }
}

/// A class literal, e.g. the test class a description refers to.
///
/// Serialized as the class name. `{"name": "<class>"}` is also accepted.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ClassLiteral(String);

impl ClassLiteral {
    /// Creates a new class literal.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The class name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ClassLiteralRepr {
    Bare(String),
    Object { name: String },
}

impl Serialize for ClassLiteral {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ClassLiteral {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match ClassLiteralRepr::deserialize(deserializer)? {
            ClassLiteralRepr::Bare(name) | ClassLiteralRepr::Object { name } => Ok(Self(name)),
        }
    }
}

/// Adapter for maybe-present values: `#[serde(with = "adapters::maybe")]` on an `Option<T>`.
///
/// `Some(v)` is written as `{"present": true, "value": v}` and `None` as `{"present": false}`.
/// `null` is also read as `None`.
pub mod maybe {
    use super::*;

    #[derive(Serialize)]
    struct MaybeRef<'a, T> {
        present: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<&'a T>,
    }

    #[derive(Deserialize)]
    struct MaybeOwned<T> {
        present: bool,
        value: Option<T>,
    }

    /// Serializes a maybe-present value.
    pub fn serialize<S, T>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        MaybeRef {
            present: value.is_some(),
            value: value.as_ref(),
        }
        .serialize(serializer)
    }

    /// Deserializes a maybe-present value.
    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        match Option::<MaybeOwned<T>>::deserialize(deserializer)? {
            None => Ok(None),
            Some(MaybeOwned {
                present: false,
                value: _,
            }) => Ok(None),
            Some(MaybeOwned {
                present: true,
                value: Some(value),
            }) => Ok(Some(value)),
            Some(MaybeOwned {
                present: true,
                value: None,
            }) => Err(de::Error::custom("maybe value is present but has no `value`")),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberRepr {
    Number(i64),
    String(String),
}

impl NumberRepr {
    fn into_i64<E: de::Error>(self) -> Result<i64, E> {
        match self {
            NumberRepr::Number(n) => Ok(n),
            NumberRepr::String(s) => s
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("expected an integer counter, found `{s}`"))),
        }
    }
}

/// Adapter for atomic 32-bit counters: `#[serde(with = "adapters::atomic_i32")]`.
///
/// Written as the plain number. Read from a number or a numeric string into a fresh atomic.
pub mod atomic_i32 {
    use super::*;

    /// Serializes the current value of the counter.
    pub fn serialize<S: Serializer>(value: &AtomicI32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(value.load(Ordering::SeqCst))
    }

    /// Deserializes a counter.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<AtomicI32, D::Error> {
        let n = NumberRepr::deserialize(deserializer)?.into_i64::<D::Error>()?;
        let n = i32::try_from(n)
            .map_err(|_| de::Error::custom(format!("counter {n} out of range for 32 bits")))?;
        Ok(AtomicI32::new(n))
    }
}

/// Adapter for atomic 64-bit counters: `#[serde(with = "adapters::atomic_i64")]`.
///
/// Written as the plain number. Read from a number or a numeric string into a fresh atomic.
pub mod atomic_i64 {
    use super::*;

    /// Serializes the current value of the counter.
    pub fn serialize<S: Serializer>(value: &AtomicI64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(value.load(Ordering::SeqCst))
    }

    /// Deserializes a counter.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<AtomicI64, D::Error> {
        let n = NumberRepr::deserialize(deserializer)?.into_i64::<D::Error>()?;
        Ok(AtomicI64::new(n))
    }
}

/// Deserializer for string-keyed maps that must not repeat a key:
/// `#[serde(deserialize_with = "adapters::unique_keys::deserialize")]`.
///
/// A JSON object may list the same key twice, and a plain map keeps only the last value.
pub mod unique_keys {
    use super::*;
    use std::{collections::BTreeMap, marker::PhantomData};

    struct UniqueKeysVisitor<V>(PhantomData<V>);

    impl<'de, V: Deserialize<'de>> de::Visitor<'de> for UniqueKeysVisitor<V> {
        type Value = BTreeMap<String, V>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a map with unique keys")
        }

        fn visit_map<A: de::MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut map = BTreeMap::new();
            while let Some(key) = access.next_key::<String>()? {
                if map.contains_key(&key) {
                    return Err(de::Error::custom(format!("duplicate key `{key}`")));
                }
                let value = access.next_value()?;
                map.insert(key, value);
            }
            Ok(map)
        }
    }

    /// Deserializes a map, rejecting repeated keys.
    pub fn deserialize<'de, D, V>(deserializer: D) -> Result<BTreeMap<String, V>, D::Error>
    where
        D: Deserializer<'de>,
        V: Deserialize<'de>,
    {
        deserializer.deserialize_map(UniqueKeysVisitor(PhantomData))
    }
}

// Copyright (c) The delegate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Decoding remote result payloads.
//!
//! A [`Codec`] turns the JSON body returned by the remote endpoint into a [`TestOutcomeSet`].
//! Before the typed decode, the codec walks the payload once:
//!
//! * fields whose declared [`ValueKind`] is excluded are dropped, and
//! * fields whose declared kind has no registered adapter are rejected.
//!
//! Field kinds come from [`adapters::field_kind`].

use crate::errors::{DecodeError, EncodeError};
use delegate_metadata::{
    TestOutcomeSet, TestResultDetail,
    adapters::{self, ValueKind},
};
use serde::{Deserialize, de::IgnoredAny};
use serde_json::Value;
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, OnceLock},
};
use tracing::debug;

/// The object whose keys are method names rather than field names.
const METHOD_MAP_FIELD: &str = "failedMethods";

/// The method map as it appears in the raw payload, before repeated keys are collapsed.
#[derive(Deserialize)]
struct RawMethodMap {
    #[serde(
        rename = "failedMethods",
        default,
        deserialize_with = "adapters::unique_keys::deserialize"
    )]
    _failed_methods: BTreeMap<String, IgnoredAny>,
}

/// Builds a [`Codec`].
#[derive(Clone, Debug, Default)]
pub struct CodecBuilder {
    adapters: BTreeSet<ValueKind>,
    excluded: BTreeSet<ValueKind>,
}

impl CodecBuilder {
    /// Creates a builder with no adapters and no exclusions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the adapter for a value kind.
    pub fn register_adapter(&mut self, kind: ValueKind) -> &mut Self {
        self.adapters.insert(kind);
        self
    }

    /// Drops every field of the given kind before decoding.
    ///
    /// Exclusion takes precedence over a registered adapter.
    pub fn exclude(&mut self, kind: ValueKind) -> &mut Self {
        self.excluded.insert(kind);
        self
    }

    /// Builds the codec.
    pub fn build(&self) -> Codec {
        Codec {
            adapters: self.adapters.clone(),
            excluded: self.excluded.clone(),
        }
    }
}

/// Decodes remote result payloads into [`TestOutcomeSet`]s.
///
/// A codec holds no per-call state: build one with [`Codec::default_builder`], or share the
/// process-wide instance returned by [`Codec::shared`].
#[derive(Clone, Debug)]
pub struct Codec {
    adapters: BTreeSet<ValueKind>,
    excluded: BTreeSet<ValueKind>,
}

static SHARED: OnceLock<Arc<Codec>> = OnceLock::new();

impl Codec {
    /// Returns a builder with every adapter registered and the serializable marker excluded.
    pub fn default_builder() -> CodecBuilder {
        let mut builder = CodecBuilder::new();
        builder
            .register_adapter(ValueKind::Annotation)
            .register_adapter(ValueKind::Maybe)
            .register_adapter(ValueKind::AtomicInteger)
            .register_adapter(ValueKind::AtomicLong)
            .register_adapter(ValueKind::ClassLiteral)
            .exclude(ValueKind::SerializableMarker);
        builder
    }

    /// Returns the process-wide codec, building it on first use.
    ///
    /// Concurrent first calls build the codec exactly once.
    pub fn shared() -> Arc<Codec> {
        SHARED
            .get_or_init(|| {
                debug!("building shared codec");
                Arc::new(Self::default_builder().build())
            })
            .clone()
    }

    /// Returns true if fields of this kind are dropped before decoding.
    pub fn is_excluded(&self, kind: ValueKind) -> bool {
        self.excluded.contains(&kind)
    }

    /// Returns true if fields of this kind can be decoded.
    pub fn has_adapter(&self, kind: ValueKind) -> bool {
        self.adapters.contains(&kind)
    }

    /// Decodes a payload into a [`TestOutcomeSet`].
    pub fn decode(&self, payload: &str) -> Result<TestOutcomeSet, DecodeError> {
        let detail = self.decode_detail(payload)?;
        let outcomes = TestOutcomeSet::from_detail(detail)?;
        debug!(total = outcomes.total_count(), "decoded remote test result");
        Ok(outcomes)
    }

    /// Decodes a payload into its wire representation, without checking for conflicts between
    /// partitions. A failed method listed twice is still rejected.
    pub fn decode_detail(&self, payload: &str) -> Result<TestResultDetail, DecodeError> {
        let mut value: Value = serde_json::from_str(payload).map_err(DecodeError::Syntax)?;
        // A JSON value keeps only the last of repeated keys, so repeats are checked on the text.
        serde_json::from_str::<RawMethodMap>(payload).map_err(DecodeError::Shape)?;
        self.prepare(&mut value, true)?;
        serde_json::from_value(value).map_err(DecodeError::Shape)
    }

    /// Encodes a [`TestOutcomeSet`] into a payload.
    pub fn encode(
        &self,
        outcomes: &TestOutcomeSet,
        classname: Option<&str>,
    ) -> Result<String, EncodeError> {
        Ok(serde_json::to_string(&outcomes.to_detail(classname))?)
    }

    fn prepare(&self, value: &mut Value, keys_are_fields: bool) -> Result<(), DecodeError> {
        match value {
            Value::Object(map) => {
                if keys_are_fields {
                    map.retain(|field, _| {
                        adapters::field_kind(field).is_none_or(|kind| !self.is_excluded(kind))
                    });
                }
                for (key, child) in map.iter_mut() {
                    if keys_are_fields {
                        if let Some(kind) = adapters::field_kind(key) {
                            if !self.has_adapter(kind) {
                                return Err(DecodeError::NoAdapter {
                                    field: key.clone(),
                                    kind,
                                });
                            }
                        }
                    }
                    // The method map's keys are method names, but its values are objects again.
                    let child_keys_are_fields = !(keys_are_fields && key == METHOD_MAP_FIELD);
                    self.prepare(child, child_keys_are_fields)?;
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.prepare(item, true)?;
                }
            }
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {}
        }
        Ok(())
    }
}

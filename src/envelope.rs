//! Typed JSON envelopes.
//!
//! The instrument's JSON endpoints serialise object graphs with embedded type
//! markers:
//!
//! ```text
//! {
//!   "$type": "System.Collections.Generic.List`1[[TAU.Devices.Channels.DIModuleInfo, TAU.Devices.Channels]], mscorlib",
//!   "$values": [ { "Slot": 1, "SerialNumber": "A1" }, ... ]
//! }
//! ```
//!
//! [`EnvelopeDecoder`] walks such a tree and resolves every `$type` through a
//! [`TypeRegistry`]. Values without a `$type` are returned unchanged, which is
//! what terminates the recursion.

use crate::config::EnvelopeSettings;
use crate::error::{CodecError, CodecResult};
use crate::records::Record;
use crate::registry::{Constructor, TypeRegistry};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, trace};

/// Key holding the type tag.
pub const TYPE_KEY: &str = "$type";
/// Key holding the elements of a typed collection.
pub const VALUES_KEY: &str = "$values";
/// Redundant short type name some endpoints add next to `$type`.
pub const CLASS_NAME_KEY: &str = "ClassName";

/// Nesting limit unless configured otherwise.
pub const DEFAULT_MAX_DEPTH: usize = 64;

#[allow(clippy::expect_used)]
static COLLECTION_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:List|Collection)`1\[\[\s*([^,\[\]]+?)\s*,").expect("collection tag pattern")
});

/// Result of decoding an envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// A value whose `$type` resolved to a record.
    Record(Record),
    /// A JSON array, or a typed collection's `$values`.
    List(Vec<Decoded>),
    /// Anything without a `$type`: scalars and plain mappings.
    Value(Value),
}

impl Decoded {
    /// The record, when this is one.
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Decoded::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Take the record, when this is one.
    pub fn into_record(self) -> Option<Record> {
        match self {
            Decoded::Record(record) => Some(record),
            _ => None,
        }
    }

    /// The items, when this is a list.
    pub fn as_list(&self) -> Option<&[Decoded]> {
        match self {
            Decoded::List(items) => Some(items),
            _ => None,
        }
    }

    /// Records of a list, or the single record itself.
    ///
    /// Fails with [`CodecError::MalformedEnvelope`] when any item is not a
    /// record, so a response of the wrong shape is never half-read.
    pub fn into_records(self) -> CodecResult<Vec<Record>> {
        match self {
            Decoded::Record(record) => Ok(vec![record]),
            Decoded::List(items) => items
                .into_iter()
                .enumerate()
                .map(|(index, item)| match item {
                    Decoded::Record(record) => Ok(record),
                    other => Err(CodecError::MalformedEnvelope {
                        reason: format!("item {index} is not a record: {other:?}"),
                    }),
                })
                .collect(),
            Decoded::Value(value) => Err(CodecError::MalformedEnvelope {
                reason: format!("expected records, got untyped value {value}"),
            }),
        }
    }

    /// Render back to plain JSON. Records lose their `$type` marker.
    pub fn into_value(self) -> CodecResult<Value> {
        match self {
            Decoded::Record(record) => record.to_value(),
            Decoded::List(items) => items
                .into_iter()
                .map(Decoded::into_value)
                .collect::<CodecResult<Vec<_>>>()
                .map(Value::Array),
            Decoded::Value(value) => Ok(value),
        }
    }
}

/// Element type name of a collection tag: generic `List`1[[...]]` /
/// `Collection`1[[...]]` wrappers and `Name[]` arrays.
pub fn collection_element(tag: &str) -> Option<&str> {
    if let Some(captures) = COLLECTION_TAG.captures(tag) {
        return captures.get(1).map(|m| m.as_str());
    }
    type_name(tag)
        .strip_suffix("[]")
        .filter(|element| !element.is_empty())
}

/// The type name of a `"<FullName>, <Assembly>"` tag.
pub fn type_name(tag: &str) -> &str {
    tag.split(',').next().unwrap_or(tag).trim()
}

/// Resolves `$type` envelopes against a registry.
pub struct EnvelopeDecoder<'r> {
    registry: &'r TypeRegistry,
    max_depth: usize,
}

impl EnvelopeDecoder<'static> {
    /// A decoder over the process-wide registry.
    pub fn global() -> Self {
        EnvelopeDecoder::new(TypeRegistry::global())
    }
}

impl<'r> EnvelopeDecoder<'r> {
    /// Decoder over `registry` with the default depth limit.
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self {
            registry,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Decoder over `registry` configured from `settings`.
    pub fn with_settings(registry: &'r TypeRegistry, settings: &EnvelopeSettings) -> Self {
        Self::new(registry).with_max_depth(settings.max_depth)
    }

    /// Replace the nesting limit.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Parse a JSON document and decode it.
    pub fn decode_str(&self, text: &str) -> CodecResult<Decoded> {
        let value: Value = serde_json::from_str(text)?;
        self.decode(value)
    }

    /// Decode an already-parsed JSON value.
    pub fn decode(&self, value: Value) -> CodecResult<Decoded> {
        self.decode_at(value, 0)
    }

    fn decode_at(&self, value: Value, depth: usize) -> CodecResult<Decoded> {
        if depth > self.max_depth {
            return Err(CodecError::EnvelopeTooDeep {
                limit: self.max_depth,
            });
        }
        match value {
            Value::Array(items) => self.decode_sequence(items, depth),
            Value::Object(map) => self.decode_mapping(map, depth),
            scalar => Ok(Decoded::Value(scalar)),
        }
    }

    fn decode_sequence(&self, items: Vec<Value>, depth: usize) -> CodecResult<Decoded> {
        items
            .into_iter()
            .map(|item| match item {
                Value::Object(_) => self.decode_at(item, depth + 1),
                other => Ok(Decoded::Value(other)),
            })
            .collect::<CodecResult<Vec<_>>>()
            .map(Decoded::List)
    }

    fn decode_mapping(&self, mut map: Map<String, Value>, depth: usize) -> CodecResult<Decoded> {
        let tag = match map.remove(TYPE_KEY) {
            None => return Ok(Decoded::Value(Value::Object(map))),
            Some(Value::String(tag)) => tag,
            Some(other) => {
                return Err(CodecError::MalformedEnvelope {
                    reason: format!("'{TYPE_KEY}' must be a string, got {other}"),
                })
            }
        };
        if let Some(class_name) = map.remove(CLASS_NAME_KEY) {
            trace!(tag = %tag, class_name = %class_name, "discarded ClassName");
        }

        if let Some(element) = collection_element(&tag) {
            let element = element.to_string();
            let values = map.remove(VALUES_KEY).ok_or_else(|| CodecError::MalformedEnvelope {
                reason: format!("collection '{tag}' has no '{VALUES_KEY}'"),
            })?;
            return self.decode_collection(&tag, &element, values, depth);
        }

        let constructor = self
            .registry
            .get(type_name(&tag))
            .ok_or_else(|| CodecError::UnknownTypeTag { tag: tag.clone() })?;
        debug!(tag = %tag, fields = map.len(), "decoding typed envelope");
        self.construct(constructor, map, depth)
    }

    fn decode_collection(
        &self,
        tag: &str,
        element: &str,
        values: Value,
        depth: usize,
    ) -> CodecResult<Decoded> {
        let constructor = self
            .registry
            .get(element)
            .ok_or_else(|| CodecError::UnknownTypeTag {
                tag: tag.to_string(),
            })?;
        let Value::Array(items) = values else {
            return Err(CodecError::MalformedEnvelope {
                reason: format!("'{VALUES_KEY}' of '{tag}' is not an array"),
            });
        };
        debug!(element = %element, count = items.len(), "decoding typed collection");

        items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) if map.contains_key(TYPE_KEY) => {
                    self.decode_at(Value::Object(map), depth + 1)
                }
                Value::Object(map) => self.construct(constructor, map, depth + 1),
                other => constructor(other),
            })
            .collect::<CodecResult<Vec<_>>>()
            .map(Decoded::List)
    }

    /// Decode every field, then hand the resulting mapping to `constructor`.
    fn construct(
        &self,
        constructor: &Constructor,
        map: Map<String, Value>,
        depth: usize,
    ) -> CodecResult<Decoded> {
        let mut fields = Map::new();
        for (key, value) in map {
            let decoded = self.decode_at(value, depth + 1)?;
            fields.insert(key, decoded.into_value()?);
        }
        constructor(Value::Object(fields))
    }
}

/// Decode `value` with the process-wide registry.
pub fn decode_envelope(value: Value) -> CodecResult<Decoded> {
    EnvelopeDecoder::global().decode(value)
}

/// Parse and decode a JSON document with the process-wide registry.
pub fn decode_json(text: &str) -> CodecResult<Decoded> {
    EnvelopeDecoder::global().decode_str(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::DiModuleInfo;
    use crate::registry::tags;
    use serde_json::json;
    use tracing_test::traced_test;

    const MODULE_LIST_TAG: &str = "System.Collections.Generic.List`1[[TAU.Devices.Channels.DIModuleInfo, TAU.Devices.Channels]], mscorlib";

    #[test]
    fn test_collection_element_parsing() {
        assert_eq!(
            collection_element(MODULE_LIST_TAG),
            Some("TAU.Devices.Channels.DIModuleInfo")
        );
        assert_eq!(
            collection_element("System.Collections.ObjectModel.ObservableCollection`1[[System.String, mscorlib]], System"),
            Some("System.String")
        );
        assert_eq!(
            collection_element("TAU.Devices.Channels.DIModuleInfo[], TAU.Devices.Channels"),
            Some("TAU.Devices.Channels.DIModuleInfo")
        );
        assert_eq!(
            collection_element("TAU.Devices.Channels.DIModuleInfo, TAU.Devices.Channels"),
            None
        );
    }

    #[test]
    fn test_type_name_ignores_assembly() {
        assert_eq!(
            type_name("TAU.Devices.Channels.DIModuleInfo, TAU.Devices.Channels, Version=1.0.0.0"),
            "TAU.Devices.Channels.DIModuleInfo"
        );
        assert_eq!(type_name("Bare.Name"), "Bare.Name");
    }

    #[test]
    fn test_untyped_values_pass_through() {
        let decoder = EnvelopeDecoder::global();
        let plain = json!({"Slot": 1, "Nested": {"A": true}});
        assert_eq!(decoder.decode(plain.clone()).unwrap(), Decoded::Value(plain));
        assert_eq!(decoder.decode(json!(3.5)).unwrap(), Decoded::Value(json!(3.5)));
    }

    #[test]
    fn test_sequence_elements_decoded_independently() {
        let decoder = EnvelopeDecoder::global();
        let decoded = decoder
            .decode(json!([
                {"$type": format!("{}, TAU.Devices.Channels", tags::DI_MODULE_INFO), "Slot": 2},
                "loose",
                {"Untyped": 1}
            ]))
            .unwrap();
        let items = decoded.as_list().unwrap();
        assert_eq!(items.len(), 3);
        assert!(matches!(items[0], Decoded::Record(Record::DiModuleInfo(_))));
        assert_eq!(items[1], Decoded::Value(json!("loose")));
        assert_eq!(items[2], Decoded::Value(json!({"Untyped": 1})));
    }

    #[traced_test]
    #[test]
    fn test_class_name_is_discarded_without_validation() {
        let decoder = EnvelopeDecoder::global();
        let decoded = decoder
            .decode(json!({
                "$type": format!("{}, TAU.Devices.Channels", tags::DI_MODULE_INFO),
                "ClassName": "SomethingElseEntirely",
                "Slot": 4,
                "SerialNumber": "DI-0042"
            }))
            .unwrap();
        let expected = DiModuleInfo {
            slot: Some(4),
            serial_number: Some("DI-0042".to_string()),
            ..Default::default()
        };
        assert_eq!(decoded, Decoded::Record(Record::DiModuleInfo(expected)));
        assert!(logs_contain("discarded ClassName"));
    }

    #[test]
    fn test_generic_list_of_module_info() {
        let decoded = decode_envelope(json!({
            "$type": MODULE_LIST_TAG,
            "$values": [
                {"Slot": 1, "ModuleType": "DI8", "SerialNumber": "A1"},
                {"Slot": 2, "ModuleType": "DI8", "SerialNumber": "A2"}
            ]
        }))
        .unwrap();
        let records = decoded.into_records().unwrap();
        assert_eq!(records.len(), 2);
        match &records[1] {
            Record::DiModuleInfo(info) => assert_eq!(info.serial_number.as_deref(), Some("A2")),
            other => panic!("unexpected record {other:?}"),
        }
    }

    #[test]
    fn test_into_records_rejects_non_records() {
        let mixed = Decoded::List(vec![
            Decoded::Record(Record::DiModuleInfo(DiModuleInfo::default())),
            Decoded::Value(json!("loose")),
        ]);
        match mixed.into_records() {
            Err(CodecError::MalformedEnvelope { reason }) => assert!(reason.contains("item 1")),
            other => panic!("expected MalformedEnvelope, got {other:?}"),
        }
        assert!(Decoded::Value(json!({"Slot": 1})).into_records().is_err());
        assert_eq!(Decoded::List(Vec::new()).into_records().unwrap(), Vec::new());
    }

    #[test]
    fn test_nested_envelopes_reach_parent_resolved() {
        let mut registry = TypeRegistry::with_known_types();
        registry.register("Test.Rack", |fields| Ok(Decoded::Value(fields)));
        let decoder = EnvelopeDecoder::new(&registry);

        let decoded = decoder
            .decode(json!({
                "$type": "Test.Rack, Tests",
                "ClassName": "Rack",
                "Name": "rack A",
                "Primary": {
                    "$type": format!("{}, TAU.Devices.Channels", tags::DI_MODULE_INFO),
                    "ClassName": "DIModuleInfo",
                    "Slot": 3,
                    "SerialNumber": "DI-3"
                },
                "Modules": {
                    "$type": MODULE_LIST_TAG,
                    "$values": [
                        {"Slot": 1, "ModuleType": "DI8"},
                        {"$type": tags::LEGACY_MODULE_INFO, "Slot": 2, "ChannelCount": 4}
                    ]
                },
                "Notes": {"Plain": [1, 2]}
            }))
            .unwrap();

        let module = |slot: i64, module_type: Option<&str>, serial: Option<&str>, channels: Option<i64>| {
            json!({
                "Slot": slot,
                "ModuleType": module_type,
                "SerialNumber": serial,
                "FirmwareVersion": null,
                "ChannelCount": channels
            })
        };
        assert_eq!(
            decoded,
            Decoded::Value(json!({
                "Name": "rack A",
                "Primary": module(3, None, Some("DI-3"), None),
                "Modules": [
                    module(1, Some("DI8"), None, None),
                    module(2, None, None, Some(4))
                ],
                "Notes": {"Plain": [1, 2]}
            }))
        );
    }

    #[test]
    fn test_unknown_type_tag_names_full_tag() {
        match decode_json(r#"{"$type":"Not.A.Real.Type","X":1}"#) {
            Err(CodecError::UnknownTypeTag { tag }) => assert_eq!(tag, "Not.A.Real.Type"),
            other => panic!("expected UnknownTypeTag, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_collection_element() {
        let tag = "System.Collections.Generic.List`1[[Not.Registered, Nowhere]], mscorlib";
        match decode_envelope(json!({"$type": tag, "$values": []})) {
            Err(CodecError::UnknownTypeTag { tag: reported }) => assert_eq!(reported, tag),
            other => panic!("expected UnknownTypeTag, got {other:?}"),
        }
    }

    #[test]
    fn test_collection_without_values_is_malformed() {
        let result = decode_envelope(json!({"$type": MODULE_LIST_TAG}));
        assert!(matches!(result, Err(CodecError::MalformedEnvelope { .. })));
    }

    #[test]
    fn test_primitive_collection() {
        let decoded = decode_envelope(json!({
            "$type": "System.Collections.Generic.List`1[[System.String, mscorlib]], mscorlib",
            "$values": ["REF1", "UUT1"]
        }))
        .unwrap();
        assert_eq!(
            decoded,
            Decoded::List(vec![
                Decoded::Value(json!("REF1")),
                Decoded::Value(json!("UUT1"))
            ])
        );
    }

    #[test]
    fn test_depth_limit() {
        let mut registry = TypeRegistry::new();
        registry.register("Test.Node", |fields| Ok(Decoded::Value(fields)));

        let nest = |levels: usize| {
            let mut value = json!({"$type": "Test.Node, Tests"});
            for _ in 0..levels {
                value = json!({"$type": "Test.Node, Tests", "Child": value});
            }
            value
        };

        let decoder = EnvelopeDecoder::new(&registry).with_max_depth(6);
        assert!(decoder.decode(nest(2)).is_ok());
        assert!(matches!(
            decoder.decode(nest(10)),
            Err(CodecError::EnvelopeTooDeep { limit: 6 })
        ));
    }
}

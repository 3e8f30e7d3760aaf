//! Wire type registry.
//!
//! Maps the fully-qualified type names carried in JSON `$type` tags to
//! constructors for the crate's record types. The set of known names is closed:
//! [`TypeRegistry::with_known_types`] registers all of them in one ordered
//! pass, and [`TypeRegistry::global`] exposes a process-wide instance built on
//! first use and never mutated afterwards.

use crate::channel::ChannelConfig;
use crate::envelope::Decoded;
use crate::error::{CodecError, CodecResult};
use crate::reading::TemperatureReading;
use crate::records::{DiModuleInfo, Record};
use crate::scan::ScanConfig;
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Fully-qualified names of the instrument's record types.
pub mod tags {
    /// Digital-input module description.
    pub const DI_MODULE_INFO: &str = "TAU.Devices.Channels.DIModuleInfo";
    /// Older firmware reports module info under this name.
    pub const LEGACY_MODULE_INFO: &str = "TAU.Devices.Modules.ModuleInfo";
    /// Channel configuration.
    pub const CHANNEL_CONFIGURATION: &str = "TAU.Devices.Channels.ChannelConfiguration";
    /// Scan configuration.
    pub const SCAN_CONFIGURATION: &str = "TAU.Devices.Scanning.ScanConfiguration";
    /// Temperature reading.
    pub const TEMPERATURE_READING: &str = "TAU.Devices.Measurements.TemperatureReading";

    /// `String` collection element.
    pub const STRING: &str = "System.String";
    /// 32-bit integer collection element.
    pub const INT32: &str = "System.Int32";
    /// 64-bit integer collection element.
    pub const INT64: &str = "System.Int64";
    /// `f64` collection element.
    pub const DOUBLE: &str = "System.Double";
    /// `bool` collection element.
    pub const BOOLEAN: &str = "System.Boolean";
}

/// Builds a decoded value from an envelope's (already decoded) payload.
pub type Constructor = Box<dyn Fn(Value) -> CodecResult<Decoded> + Send + Sync>;

static GLOBAL: Lazy<TypeRegistry> = Lazy::new(TypeRegistry::with_known_types);

/// Maps `$type` names to constructors.
pub struct TypeRegistry {
    constructors: HashMap<String, Constructor>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::with_known_types()
    }
}

impl TypeRegistry {
    /// An empty registry. Every lookup fails until something is registered.
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// A registry holding every type the instrument is known to emit.
    pub fn with_known_types() -> Self {
        let mut registry = Self::new();

        registry.register_record::<DiModuleInfo>(tags::LEGACY_MODULE_INFO);
        registry.register_record::<DiModuleInfo>(tags::DI_MODULE_INFO);
        registry.register_record::<ChannelConfig>(tags::CHANNEL_CONFIGURATION);
        registry.register_record::<ScanConfig>(tags::SCAN_CONFIGURATION);
        registry.register_record::<TemperatureReading>(tags::TEMPERATURE_READING);

        // Element types that appear inside generic collections
        registry.register_primitive::<String>(tags::STRING);
        registry.register_primitive::<i32>(tags::INT32);
        registry.register_primitive::<i64>(tags::INT64);
        registry.register_primitive::<f64>(tags::DOUBLE);
        registry.register_primitive::<bool>(tags::BOOLEAN);

        registry
    }

    /// The process-wide registry, initialised exactly once on first use.
    pub fn global() -> &'static TypeRegistry {
        &GLOBAL
    }

    /// Register a constructor under `tag`. An existing entry is replaced.
    pub fn register<F>(&mut self, tag: impl Into<String>, constructor: F)
    where
        F: Fn(Value) -> CodecResult<Decoded> + Send + Sync + 'static,
    {
        let tag = tag.into();
        if self
            .constructors
            .insert(tag.clone(), Box::new(constructor))
            .is_some()
        {
            debug!(tag = %tag, "replaced type registration");
        }
    }

    /// Register a record type deserialised from the envelope's fields.
    pub fn register_record<T>(&mut self, tag: &str)
    where
        T: DeserializeOwned + Into<Record> + 'static,
    {
        let type_name = tag.to_string();
        self.register(tag, move |fields| {
            serde_json::from_value::<T>(fields)
                .map(|record| Decoded::Record(record.into()))
                .map_err(|source| CodecError::RecordConstruction {
                    type_name: type_name.clone(),
                    source,
                })
        });
    }

    /// Register a scalar element type. Values are checked against `T` and
    /// passed through unchanged.
    pub fn register_primitive<T>(&mut self, tag: &str)
    where
        T: DeserializeOwned + 'static,
    {
        let type_name = tag.to_string();
        self.register(tag, move |value| {
            let checked = T::deserialize(&value).map(|_| ());
            checked
                .map(|()| Decoded::Value(value))
                .map_err(|source| CodecError::RecordConstruction {
                    type_name: type_name.clone(),
                    source,
                })
        });
    }

    /// Constructor registered under `tag`, if any.
    pub fn get(&self, tag: &str) -> Option<&Constructor> {
        self.constructors.get(tag)
    }

    /// Look up `tag`, failing with [`CodecError::UnknownTypeTag`].
    pub fn resolve(&self, tag: &str) -> CodecResult<&Constructor> {
        self.get(tag).ok_or_else(|| CodecError::UnknownTypeTag {
            tag: tag.to_string(),
        })
    }

    /// Whether `tag` is registered.
    pub fn contains(&self, tag: &str) -> bool {
        self.constructors.contains_key(tag)
    }

    /// Number of registered tags.
    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }
}

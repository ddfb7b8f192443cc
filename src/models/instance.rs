//! Runtime state of one entity with dirty-tracking.

use serde_json::Value as JsonValue;

use crate::error::AppError;
use crate::models::field::{FieldKind, ModelSchema};

/// Property map as sent to and returned by the database.
pub type PropertyMap = serde_json::Map<String, JsonValue>;

/// Reserved key carrying the database-internal identifier in result maps.
pub const DB_ID_KEY: &str = "db_id";

/// Current unix time in seconds.
pub(crate) fn now_seconds() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Decodes a JSON-kind field; unparseable text is kept as the raw string.
fn decode_json(raw: &JsonValue) -> JsonValue {
    match raw {
        JsonValue::String(text) => serde_json::from_str(text).unwrap_or_else(|_| raw.clone()),
        other => other.clone(),
    }
}

/// Encodes a JSON-kind field as text for storage.
///
/// Strings are written as JSON text too, so `"123"` is stored as `"\"123\""`
/// and does not come back as a number. A string that failed to decode on
/// load is written back untouched.
fn encode_json(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::Null => JsonValue::Null,
        JsonValue::String(text) if serde_json::from_str::<JsonValue>(text).is_err() => {
            value.clone()
        }
        other => JsonValue::String(other.to_string()),
    }
}

/// Property map ready to be written, plus schema metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyInfo {
    pub props: PropertyMap,
    pub auto_increment: Option<&'static str>,
    pub primary: Option<&'static str>,
    pub unique: bool,
}

/// Field values of one entity and the snapshot they are diffed against.
#[derive(Debug, Clone)]
pub struct ModelInstance {
    schema: &'static ModelSchema,
    values: PropertyMap,
    loaded: PropertyMap,
    database_id: Option<i64>,
}

impl ModelInstance {
    /// Builds an instance from a raw property map.
    ///
    /// Fields are resolved in declaration order: supplied value, then
    /// declared default, then the current time for timestamp kinds.
    /// Auto-increment and relation fields may stay unset; anything else
    /// missing is an [`AppError::MissingField`]. A `db_id` entry marks the
    /// instance as loaded from the database.
    ///
    /// A misdeclared schema is an [`AppError::Configuration`].
    pub fn from_properties(
        schema: &'static ModelSchema,
        props: &PropertyMap,
    ) -> Result<Self, AppError> {
        schema.validate()?;

        let mut values = PropertyMap::new();
        let mut now = None;

        for field in schema.fields() {
            let kind = field.kind();
            if kind == FieldKind::Relation {
                continue;
            }

            let value = if let Some(raw) = props.get(field.name()) {
                if kind == FieldKind::Json {
                    decode_json(raw)
                } else {
                    raw.clone()
                }
            } else if let Some(default) = field.default_value() {
                default.clone()
            } else if kind.is_timestamp() {
                JsonValue::from(*now.get_or_insert_with(now_seconds))
            } else if kind == FieldKind::AutoIncrement {
                continue;
            } else {
                return Err(AppError::MissingField {
                    entity: schema.label().to_string(),
                    field: field.name().to_string(),
                });
            };

            // Counters only hold numbers assigned by the database
            if kind == FieldKind::AutoIncrement && !value.is_number() {
                continue;
            }

            values.insert(field.name().to_string(), value);
        }

        let database_id = props.get(DB_ID_KEY).and_then(JsonValue::as_i64);

        Ok(Self {
            schema,
            loaded: values.clone(),
            values,
            database_id,
        })
    }

    pub fn schema(&self) -> &'static ModelSchema {
        self.schema
    }

    pub fn label(&self) -> &'static str {
        self.schema.label()
    }

    pub fn database_id(&self) -> Option<i64> {
        self.database_id
    }

    /// True until the instance has been read back from the database.
    pub fn is_new(&self) -> bool {
        self.database_id.is_none()
    }

    /// Current field values (JSON fields decoded).
    pub fn values(&self) -> &PropertyMap {
        &self.values
    }

    pub fn get(&self, field: &str) -> Option<&JsonValue> {
        self.values.get(field)
    }

    /// A field's value in the snapshot taken at construction.
    pub fn loaded_value(&self, field: &str) -> Option<&JsonValue> {
        self.loaded.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(JsonValue::as_str)
    }

    pub fn get_i64(&self, field: &str) -> Option<i64> {
        self.get(field).and_then(JsonValue::as_i64)
    }

    pub fn get_f64(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(JsonValue::as_f64)
    }

    pub fn get_bool(&self, field: &str) -> Option<bool> {
        self.get(field).and_then(JsonValue::as_bool)
    }

    /// A JSON-kind field's structured value.
    ///
    /// Returns `None` for unset fields and for fields whose stored text was
    /// not valid JSON; use [`get`](Self::get) to see the raw string.
    pub fn get_json(&self, field: &str) -> Option<&JsonValue> {
        let schema_field = self.schema.field_named(field)?;
        if schema_field.kind() != FieldKind::Json {
            return None;
        }
        match self.get(field)? {
            JsonValue::String(text) if serde_json::from_str::<JsonValue>(text).is_err() => None,
            value => Some(value),
        }
    }

    /// Sets a field's current value. The loaded snapshot is left as is.
    ///
    /// JSON-kind fields take the structured value; a string is kept as a
    /// JSON string, not parsed as text.
    pub fn set(&mut self, field: &str, value: impl Into<JsonValue>) -> Result<(), AppError> {
        let Some(schema_field) = self.schema.field_named(field) else {
            return Err(AppError::UnknownField {
                entity: self.schema.label().to_string(),
                field: field.to_string(),
            });
        };
        if schema_field.kind() == FieldKind::Relation {
            return Err(AppError::Configuration(format!(
                "{}.{} is a relation and holds no value",
                self.schema.label(),
                field
            )));
        }

        self.values.insert(field.to_string(), value.into());
        Ok(())
    }

    /// Fields whose value differs from the loaded snapshot, in write form.
    ///
    /// When anything changed and the schema declares a modified-timestamp
    /// field, that field is included with the current time.
    pub fn modified_properties(&self) -> PropertyMap {
        let mut modified = PropertyMap::new();

        for field in self.schema.fields() {
            let Some(current) = self.values.get(field.name()) else {
                continue;
            };
            let loaded = self.loaded.get(field.name());

            // Both sides hold decoded values; maps compare by key
            if loaded != Some(current) {
                let value = if field.kind() == FieldKind::Json {
                    encode_json(current)
                } else {
                    current.clone()
                };
                modified.insert(field.name().to_string(), value);
            }
        }

        if !modified.is_empty() {
            if let Some(field) = self.schema.modified_field() {
                modified.insert(field.name().to_string(), JsonValue::from(now_seconds()));
            }
        }

        modified
    }

    /// Every stored field's current value in write form, plus metadata.
    pub fn property_info(&self) -> PropertyInfo {
        let schema = self.schema;
        let mut props = PropertyMap::new();

        for field in schema.fields() {
            if !field.kind().has_value() {
                continue;
            }
            let Some(value) = self.values.get(field.name()) else {
                continue;
            };
            let value = if field.kind() == FieldKind::Json {
                encode_json(value)
            } else {
                value.clone()
            };
            props.insert(field.name().to_string(), value);
        }

        PropertyInfo {
            props,
            auto_increment: schema.auto_increment_field().map(|f| f.name()),
            primary: schema.primary_field().map(|f| f.name()),
            unique: schema.is_unique(),
        }
    }
}

impl PartialEq for ModelInstance {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.schema, other.schema)
            && self.values == other.values
            && self.database_id == other.database_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::field::FieldSchema;
    use once_cell::sync::Lazy;
    use serde_json::json;

    static DOC: Lazy<ModelSchema> = Lazy::new(|| {
        ModelSchema::node("Doc")
            .field(FieldSchema::auto_increment("id"))
            .field(FieldSchema::string("title"))
            .field(FieldSchema::json("meta").default(json!({})))
            .field(FieldSchema::integer("saved_at").default(JsonValue::Null))
            .field(FieldSchema::created_on("created_time"))
            .field(FieldSchema::modified_on("modified_time"))
    });

    fn props(value: JsonValue) -> PropertyMap {
        match value {
            JsonValue::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_defaults_and_timestamps() {
        let doc = ModelInstance::from_properties(&DOC, &props(json!({"title": "a"}))).unwrap();

        assert!(doc.is_new());
        assert_eq!(doc.get("id"), None);
        assert_eq!(doc.get("saved_at"), Some(&JsonValue::Null));
        assert_eq!(doc.get_json("meta"), Some(&json!({})));
        assert_eq!(doc.get_i64("created_time"), doc.get_i64("modified_time"));
    }

    #[test]
    fn test_missing_required_field() {
        let err = ModelInstance::from_properties(&DOC, &PropertyMap::new()).unwrap_err();
        match err {
            AppError::MissingField { entity, field } => {
                assert_eq!(entity, "Doc");
                assert_eq!(field, "title");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_loaded_instance_has_no_modifications() {
        let doc = ModelInstance::from_properties(
            &DOC,
            &props(json!({
                "id": 3, "title": "a", "meta": "{\"b\":1,\"a\":2}",
                "saved_at": null, "created_time": 10, "modified_time": 11, "db_id": 42
            })),
        )
        .unwrap();

        assert!(!doc.is_new());
        assert_eq!(doc.database_id(), Some(42));
        assert_eq!(doc.get_json("meta"), Some(&json!({"a": 2, "b": 1})));
        assert!(doc.modified_properties().is_empty());
    }

    #[test]
    fn test_malformed_json_keeps_raw_string() {
        let doc =
            ModelInstance::from_properties(&DOC, &props(json!({"title": "a", "meta": "{oops"})))
                .unwrap();

        assert_eq!(doc.get("meta"), Some(&json!("{oops")));
        assert_eq!(doc.get_json("meta"), None);
    }

    #[test]
    fn test_equal_json_is_not_modified() {
        let mut doc = ModelInstance::from_properties(
            &DOC,
            &props(json!({"title": "a", "meta": {"x": 1, "y": [1, 2]}})),
        )
        .unwrap();

        doc.set("meta", json!({"y": [1, 2], "x": 1})).unwrap();
        assert!(doc.modified_properties().is_empty());

        doc.set("meta", json!({"y": [2, 1], "x": 1})).unwrap();
        let modified = doc.modified_properties();
        assert!(modified.contains_key("meta"));
        assert!(modified.contains_key("modified_time"));
    }

    #[test]
    fn test_modified_properties_are_in_write_form() {
        let mut doc =
            ModelInstance::from_properties(&DOC, &props(json!({"title": "a"}))).unwrap();
        doc.set("meta", json!({"k": true})).unwrap();
        doc.set("title", "b").unwrap();

        let modified = doc.modified_properties();
        assert_eq!(modified["meta"], json!("{\"k\":true}"));
        assert_eq!(modified["title"], json!("b"));
        assert!(!modified.contains_key("created_time"));
    }

    #[test]
    fn test_json_string_survives_a_write_and_reload() {
        let mut doc = ModelInstance::from_properties(
            &DOC,
            &props(json!({"title": "a", "meta": 123, "db_id": 1})),
        )
        .unwrap();
        doc.set("meta", json!("123")).unwrap();

        let modified = doc.modified_properties();
        assert_eq!(modified["meta"], json!("\"123\""));

        let written = doc.property_info().props;
        let mut reloaded = written.clone();
        reloaded.insert(DB_ID_KEY.to_string(), json!(1));
        let reloaded = ModelInstance::from_properties(&DOC, &reloaded).unwrap();
        assert_eq!(reloaded.get("meta"), Some(&json!("123")));
    }

    #[test]
    fn test_malformed_json_is_written_back_verbatim() {
        let doc =
            ModelInstance::from_properties(&DOC, &props(json!({"title": "a", "meta": "{oops"})))
                .unwrap();
        assert_eq!(doc.property_info().props["meta"], json!("{oops"));
    }

    static TWO_KEYS: Lazy<ModelSchema> = Lazy::new(|| {
        ModelSchema::node("TwoKeys")
            .field(FieldSchema::string("a").primary())
            .field(FieldSchema::string("b").primary())
    });

    #[test]
    fn test_misdeclared_schema_is_rejected_on_construction() {
        let err = ModelInstance::from_properties(&TWO_KEYS, &props(json!({"a": "x", "b": "y"})))
            .unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)), "{:?}", err);
    }

    #[test]
    fn test_loaded_value_tracks_the_snapshot() {
        let mut doc =
            ModelInstance::from_properties(&DOC, &props(json!({"title": "a"}))).unwrap();
        doc.set("title", "b").unwrap();

        assert_eq!(doc.loaded_value("title"), Some(&json!("a")));
        assert_eq!(doc.get_str("title"), Some("b"));
    }

    #[test]
    fn test_set_rejects_unknown_field() {
        let mut doc =
            ModelInstance::from_properties(&DOC, &props(json!({"title": "a"}))).unwrap();
        assert!(matches!(
            doc.set("nope", 1),
            Err(AppError::UnknownField { .. })
        ));
    }

    #[test]
    fn test_property_info() {
        let doc = ModelInstance::from_properties(
            &DOC,
            &props(json!({"title": "a", "meta": {"k": 1}})),
        )
        .unwrap();
        let info = doc.property_info();

        assert_eq!(info.auto_increment, Some("id"));
        assert_eq!(info.primary, Some("id"));
        assert!(!info.unique);
        assert!(!info.props.contains_key("id"));
        assert_eq!(info.props["meta"], json!("{\"k\":1}"));
        assert_eq!(info.props["saved_at"], JsonValue::Null);
    }
}

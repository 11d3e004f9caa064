use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;

/// Types that can be requested as strict structured output.
///
/// Strict mode requires `additionalProperties: false` on every object and every
/// property listed in `required`, nullable ones included.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    fn openai_schema() -> serde_json::Value {
        let schema = schema_for!(Self);
        let mut value = serde_json::to_value(schema).unwrap_or_default();

        close_object_schemas(&mut value);

        if let serde_json::Value::Object(map) = &mut value {
            map.remove("definitions");
            map.remove("$schema");
            map.remove("title");
        }

        value
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

fn close_object_schemas(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            // serde defaults are not part of the wire contract
            map.remove("default");

            if map.get("type") == Some(&serde_json::Value::String("object".to_string())) {
                map.insert(
                    "additionalProperties".to_string(),
                    serde_json::Value::Bool(false),
                );

                if let Some(serde_json::Value::Object(props)) = map.get("properties") {
                    let all_keys: Vec<serde_json::Value> = props
                        .keys()
                        .map(|k| serde_json::Value::String(k.clone()))
                        .collect();
                    map.insert("required".to_string(), serde_json::Value::Array(all_keys));
                }
            }

            for (_, v) in map.iter_mut() {
                close_object_schemas(v);
            }
        }
        serde_json::Value::Array(items) => {
            for item in items.iter_mut() {
                close_object_schemas(item);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthesis::DraftResponse;

    #[test]
    fn test_draft_schema_is_closed_and_fully_required() {
        let schema = DraftResponse::openai_schema();
        let object = schema.as_object().unwrap();

        assert_eq!(object.get("additionalProperties"), Some(&serde_json::Value::Bool(false)));
        assert!(!object.contains_key("$schema"));

        let required: Vec<&str> = object["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        for field in ["title", "description", "content", "tags", "start_time", "confidence"] {
            assert!(required.contains(&field), "{} not required", field);
        }
    }
}

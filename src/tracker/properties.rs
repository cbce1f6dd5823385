use serde_json::{Map, Value};

/// Free-form record properties: string keys, any JSON value.
pub type Properties = Map<String, Value>;

/// Copies every entry of `other` into `target`, overwriting existing keys.
pub fn merge_properties(target: &mut Properties, other: Properties) {
    for (key, value) in other {
        target.insert(key, value);
    }
}

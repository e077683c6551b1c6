//! Converts string-typed numeric fields of a JSON media report into numbers.
//!
//! Analysis cores report every value as a string. Fields whose names appear in
//! [`INTEGER_FIELDS`] or [`FLOAT_FIELDS`] are converted; everything else,
//! including `@type`, passes through untouched and in its original order.

use serde_json::{Map, Number, Value};

/// Fields parsed as base-10 integers.
pub const INTEGER_FIELDS: &[&str] = &[
    "AudioCount",
    "BitDepth",
    "BitRate",
    "BitRate_Maximum",
    "BitRate_Minimum",
    "BitRate_Nominal",
    "Channels",
    "Count",
    "FileSize",
    "FrameCount",
    "GeneralCount",
    "Height",
    "ID",
    "ImageCount",
    "MenuCount",
    "OverallBitRate",
    "OverallBitRate_Maximum",
    "Sampled_Height",
    "Sampled_Width",
    "SamplesPerFrame",
    "SamplingCount",
    "SamplingRate",
    "Stored_Height",
    "Stored_Width",
    "StreamCount",
    "StreamKindID",
    "StreamKindPos",
    "StreamOrder",
    "StreamSize",
    "TextCount",
    "VideoCount",
    "Width",
];

/// Fields parsed as floating point.
pub const FLOAT_FIELDS: &[&str] = &[
    "Compression_Ratio",
    "Delay",
    "DisplayAspectRatio",
    "Duration",
    "FrameRate",
    "FrameRate_Maximum",
    "FrameRate_Minimum",
    "FrameRate_Nominal",
    "FrameRate_Original",
    "PixelAspectRatio",
    "Rotation",
    "Video_Delay",
];

/// The report is not JSON, or lacks `media.track`.
#[derive(Debug, thiserror::Error)]
#[error("malformed analysis result: {reason}")]
pub struct MalformedResultError {
    pub reason: String,
    /// Parsed value when the text was JSON of the wrong shape.
    pub parsed: Option<Value>,
}

impl MalformedResultError {
    /// The best available unnormalized value: the parsed JSON, or `raw` as a string.
    pub fn into_value(self, raw: String) -> Value {
        self.parsed.unwrap_or(Value::String(raw))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Integer,
    Float,
    Verbatim,
}

fn field_kind(name: &str) -> FieldKind {
    if INTEGER_FIELDS.contains(&name) {
        FieldKind::Integer
    } else if FLOAT_FIELDS.contains(&name) {
        FieldKind::Float
    } else {
        FieldKind::Verbatim
    }
}

/// Parses `raw` and converts numeric fields of every track.
pub fn normalize(raw: &str) -> Result<Value, MalformedResultError> {
    let mut value: Value = serde_json::from_str(raw).map_err(|e| MalformedResultError {
        reason: e.to_string(),
        parsed: None,
    })?;
    if !value.pointer("/media/track").is_some_and(Value::is_array) {
        return Err(MalformedResultError {
            reason: "missing media.track array".to_string(),
            parsed: Some(value),
        });
    }
    if let Some(tracks) = value.pointer_mut("/media/track").and_then(Value::as_array_mut) {
        for track in tracks.iter_mut() {
            if let Value::Object(fields) = track {
                normalize_fields(fields);
            }
        }
    }
    Ok(value)
}

fn normalize_fields(fields: &mut Map<String, Value>) {
    for (name, value) in fields.iter_mut() {
        match value {
            Value::String(s) => {
                if let Some(n) = convert(field_kind(name), s) {
                    *value = Value::Number(n);
                }
            }
            // Cores nest less common fields under e.g. `extra`.
            Value::Object(inner) => normalize_fields(inner),
            _ => {}
        }
    }
}

fn convert(kind: FieldKind, s: &str) -> Option<Number> {
    let s = s.trim();
    match kind {
        FieldKind::Integer => s.parse::<i64>().ok().map(Number::from),
        FieldKind::Float => s.parse::<f64>().ok().and_then(Number::from_f64),
        FieldKind::Verbatim => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn converts_classified_fields() {
        let raw = r#"{"media":{"track":[{"@type":"Video","Width":"1920","FrameRate":"29.970"}]}}"#;
        let v = normalize(raw).unwrap();
        assert_eq!(
            v,
            json!({"media": {"track": [{"@type": "Video", "Width": 1920, "FrameRate": 29.97}]}})
        );
    }

    #[test]
    fn preserves_key_order_and_unmatched_fields() {
        let raw = r#"{"media":{"@ref":"x","track":[{"@type":"General","Title":"42","Duration":"1.5","IsStreamable":"Yes","Height":"720"}]}}"#;
        let v = normalize(raw).unwrap();
        let track = v["media"]["track"][0].as_object().unwrap();
        let keys: Vec<&str> = track.keys().map(String::as_str).collect();
        assert_eq!(keys, ["@type", "Title", "Duration", "IsStreamable", "Height"]);
        assert_eq!(track["Title"], json!("42"));
        assert_eq!(track["Duration"], json!(1.5));
        assert_eq!(track["Height"], json!(720));
        assert_eq!(v["media"]["@ref"], json!("x"));
    }

    #[test]
    fn unparseable_values_pass_through() {
        let raw = r#"{"media":{"track":[{"@type":"Audio","Channels":"2 / 6","BitRate":"Variable"}]}}"#;
        let v = normalize(raw).unwrap();
        assert_eq!(v["media"]["track"][0]["Channels"], json!("2 / 6"));
        assert_eq!(v["media"]["track"][0]["BitRate"], json!("Variable"));
    }

    #[test]
    fn nested_extra_is_normalized() {
        let raw = r#"{"media":{"track":[{"@type":"Video","extra":{"Stored_Width":"1920","Note":"1"}}]}}"#;
        let v = normalize(raw).unwrap();
        assert_eq!(v["media"]["track"][0]["extra"]["Stored_Width"], json!(1920));
        assert_eq!(v["media"]["track"][0]["extra"]["Note"], json!("1"));
    }

    #[test]
    fn not_json_is_malformed() {
        let err = normalize("General\nFormat : MPEG-4").unwrap_err();
        assert!(err.parsed.is_none());
        assert_eq!(
            err.into_value("General\nFormat : MPEG-4".to_string()),
            json!("General\nFormat : MPEG-4")
        );
    }

    #[test]
    fn wrong_shape_returns_parsed_value() {
        let err = normalize(r#"{"media":null}"#).unwrap_err();
        assert_eq!(err.parsed, Some(json!({"media": null})));
    }
}

//! Personalised recommendations: document types, normalisation and the full
//! reply-to-document parse path.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::repair::{parse_model_json, ParseError};

/// Fallback college images, assigned by position.
pub const DEFAULT_COLLEGE_IMAGES: [&str; 4] = [
    "https://images.unsplash.com/photo-1562774053-701939374585?w=400&q=80",
    "https://images.unsplash.com/photo-1541339907198-e08756dedf3f?w=400&q=80",
    "https://images.unsplash.com/photo-1523050854058-8df90110c9f1?w=400&q=80",
    "https://images.unsplash.com/photo-1498243691581-b145c3f54a5a?w=400&q=80",
];

const LIST_FIELDS: [&str; 3] = ["careers", "colleges", "entranceExams"];

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CareerRecommendation {
    #[serde(deserialize_with = "lenient_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    /// Match percentage, 0-100.
    #[serde(
        rename = "match",
        deserialize_with = "lenient_percentage",
        skip_serializing_if = "Option::is_none"
    )]
    pub match_percent: Option<u8>,
    #[serde(deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(deserialize_with = "lenient_string")]
    pub salary: String,
    #[serde(deserialize_with = "lenient_string")]
    pub growth: String,
    #[serde(deserialize_with = "lenient_list")]
    pub skills: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub companies: Vec<String>,
    #[serde(
        deserialize_with = "lenient_optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub reasoning: Option<String>,
    #[serde(
        deserialize_with = "lenient_optional_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub job_roles: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CollegeRecommendation {
    #[serde(deserialize_with = "lenient_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub location: String,
    #[serde(deserialize_with = "lenient_string")]
    pub ranking: String,
    #[serde(deserialize_with = "lenient_string")]
    pub fees: String,
    #[serde(deserialize_with = "lenient_string")]
    pub cutoff: String,
    #[serde(deserialize_with = "lenient_string")]
    pub placement: String,
    #[serde(deserialize_with = "lenient_list")]
    pub for_careers: Vec<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EntranceExam {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub date: String,
    #[serde(deserialize_with = "lenient_string")]
    pub eligibility: String,
    #[serde(deserialize_with = "lenient_list")]
    pub for_colleges: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationsDocument {
    pub careers: Vec<CareerRecommendation>,
    pub colleges: Vec<CollegeRecommendation>,
    pub entrance_exams: Vec<EntranceExam>,
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_percentage<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let raw = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(raw
        .filter(|f| f.is_finite())
        .map(|f| f.round().clamp(0.0, 100.0) as u8))
}

/// Text form of a scalar.  `null` and containers have none.
fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_text(value).unwrap_or_default())
}

fn lenient_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_text(value))
}

// A lone scalar where a list belongs becomes a one-item list; non-scalar
// items inside a list are dropped.
fn text_list(value: Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(items.into_iter().filter_map(scalar_text).collect()),
        Value::Null | Value::Object(_) => None,
        scalar => scalar_text(scalar).map(|s| vec![s]),
    }
}

fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(text_list(value).unwrap_or_default())
}

fn lenient_optional_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(text_list(value))
}

/// Default image for the college at `index`.
pub fn default_college_image(index: usize) -> &'static str {
    DEFAULT_COLLEGE_IMAGES[index % DEFAULT_COLLEGE_IMAGES.len()]
}

/// JSON-level normalisation: each list field becomes an array (empty when
/// absent or mistyped) and every college without a non-empty `image` gets one
/// from the rotation.  Nothing else is touched.
pub fn normalize_value(mut doc: Map<String, Value>) -> Map<String, Value> {
    for field in LIST_FIELDS {
        if !doc.get(field).map(Value::is_array).unwrap_or(false) {
            doc.insert(field.to_string(), Value::Array(Vec::new()));
        }
    }
    if let Some(Value::Array(colleges)) = doc.get_mut("colleges") {
        for (index, college) in colleges.iter_mut().enumerate() {
            if let Value::Object(obj) = college {
                let has_image = obj
                    .get("image")
                    .and_then(Value::as_str)
                    .map(|s| !s.trim().is_empty())
                    .unwrap_or(false);
                if !has_image {
                    obj.insert(
                        "image".to_string(),
                        Value::String(default_college_image(index).to_string()),
                    );
                }
            }
        }
    }
    doc
}

/// Normalise a parsed reply into the typed document.  Mistyped scalar fields
/// are coerced to their text form or defaulted; only entries that are not
/// objects are skipped.
pub fn normalize(doc: Map<String, Value>) -> RecommendationsDocument {
    let mut doc = normalize_value(doc);
    RecommendationsDocument {
        careers: typed_entries(&mut doc, "careers"),
        colleges: typed_entries(&mut doc, "colleges"),
        entrance_exams: typed_entries(&mut doc, "entranceExams"),
    }
}

fn typed_entries<T>(doc: &mut Map<String, Value>, field: &'static str) -> Vec<T>
where
    T: for<'de> Deserialize<'de>,
{
    let items = match doc.remove(field) {
        Some(Value::Array(items)) => items,
        _ => return Vec::new(),
    };
    items
        .into_iter()
        .enumerate()
        .filter(|(index, item)| {
            if !item.is_object() {
                tracing::warn!(field, index, "skipping recommendation entry that is not an object");
            }
            item.is_object()
        })
        .filter_map(|(index, item)| match serde_json::from_value::<T>(item) {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!(field, index, error = %err, "skipping unreadable recommendation entry");
                None
            }
        })
        .collect()
}

/// Full recommendations path: extract, repair, parse, normalise.
pub fn parse_recommendations(raw: &str) -> Result<RecommendationsDocument, ParseError> {
    match parse_model_json(raw)? {
        Value::Object(map) => Ok(normalize(map)),
        _ => Err(ParseError::new("reply did not contain a JSON object", raw)),
    }
}

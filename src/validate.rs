//! Request kinds and per-kind structural validation.
//!
//! Each [`RequestKind`] has a fixed schema.  [`validate`] checks presence,
//! primitive type and length bounds for every field and produces a typed
//! [`ValidatedPayload`].  Bounds are never silently truncated here: any
//! violation is a terminal [`ValidationError`] naming the field.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Maximum entries in any string list field.
pub const MAX_LIST_ITEMS: usize = 15;
/// Maximum records accepted in the trends payload.
pub const MAX_TREND_RECORDS: usize = 20;
/// Maximum characters in a list entry.
pub const MAX_ITEM_CHARS: usize = 100;

/// The closed set of supported AI-assist operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    CareerExplain,
    CareerCompare,
    CollegeCompare,
    Roadmap,
    Eligibility,
    Trends,
    Recommendations,
}

impl RequestKind {
    pub const ALL: [RequestKind; 7] = [
        RequestKind::CareerExplain,
        RequestKind::CareerCompare,
        RequestKind::CollegeCompare,
        RequestKind::Roadmap,
        RequestKind::Eligibility,
        RequestKind::Trends,
        RequestKind::Recommendations,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::CareerExplain => "career_explain",
            RequestKind::CareerCompare => "career_compare",
            RequestKind::CollegeCompare => "college_compare",
            RequestKind::Roadmap => "roadmap",
            RequestKind::Eligibility => "eligibility",
            RequestKind::Trends => "trends",
            RequestKind::Recommendations => "recommendations",
        }
    }

    /// Position of the kind in [`RequestKind::ALL`]; used for per-kind metrics.
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RequestKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or(ValidationError::UnknownKind)
    }
}

/// Structural validation failure.  Messages name the field, never its content.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid request type")]
    UnknownKind,
    #[error("Request data must be an object")]
    NotAnObject,
    #[error("Missing required field: {0}")]
    Missing(&'static str),
    #[error("Invalid type for field: {0}")]
    WrongType(&'static str),
    #[error("Field {field} exceeds {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("Field {field} exceeds {max} entries")]
    TooManyItems { field: &'static str, max: usize },
}

impl ValidationError {
    /// Name of the offending field, if the failure is field specific.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ValidationError::UnknownKind => Some("type"),
            ValidationError::NotAnObject => Some("data"),
            ValidationError::Missing(f) | ValidationError::WrongType(f) => Some(*f),
            ValidationError::TooLong { field, .. } | ValidationError::TooManyItems { field, .. } => {
                Some(*field)
            }
        }
    }
}

/// A bounded string field together with the limit it was validated against.
/// The limit travels with the value so the prompt builder can apply the
/// matching sanitiser cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundedText {
    pub value: String,
    pub max_chars: usize,
}

impl BoundedText {
    /// Cap used when sanitising this value for a prompt.
    pub fn sanitize_cap(&self) -> usize {
        self.max_chars * 2
    }

    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }
}

/// Opaque key/value record carried to the renderer without deep validation.
#[derive(Debug, Clone, PartialEq)]
pub struct OpaqueRecord(pub Map<String, Value>);

impl OpaqueRecord {
    pub fn as_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CareerExplain {
    pub title: BoundedText,
    pub description: BoundedText,
    pub salary: BoundedText,
    pub growth: BoundedText,
    pub skills: Vec<String>,
    pub companies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub first: OpaqueRecord,
    pub second: OpaqueRecord,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoadmapRequest {
    pub career: BoundedText,
    pub current_level: Option<BoundedText>,
    pub timeline: Option<BoundedText>,
    pub interests: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EligibilityRequest {
    pub target: BoundedText,
    pub details: Option<OpaqueRecord>,
    pub background: Option<BoundedText>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendsRequest {
    pub trends: Vec<Value>,
    pub industry: Option<BoundedText>,
}

/// Student assessment answers driving the recommendations kind.
#[derive(Debug, Clone, PartialEq)]
pub struct AssessmentProfile {
    pub interests: Vec<String>,
    pub skills: Vec<String>,
    pub academic_background: BoundedText,
    pub location_preference: Option<BoundedText>,
    pub career_goals: Option<BoundedText>,
    pub preferred_work_style: Option<BoundedText>,
    pub salary_expectation: Option<BoundedText>,
}

/// Typed, bounds-checked payload for one request kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidatedPayload {
    CareerExplain(CareerExplain),
    CareerCompare(Comparison),
    CollegeCompare(Comparison),
    Roadmap(RoadmapRequest),
    Eligibility(EligibilityRequest),
    Trends(TrendsRequest),
    Recommendations(AssessmentProfile),
}

impl ValidatedPayload {
    pub fn kind(&self) -> RequestKind {
        match self {
            ValidatedPayload::CareerExplain(_) => RequestKind::CareerExplain,
            ValidatedPayload::CareerCompare(_) => RequestKind::CareerCompare,
            ValidatedPayload::CollegeCompare(_) => RequestKind::CollegeCompare,
            ValidatedPayload::Roadmap(_) => RequestKind::Roadmap,
            ValidatedPayload::Eligibility(_) => RequestKind::Eligibility,
            ValidatedPayload::Trends(_) => RequestKind::Trends,
            ValidatedPayload::Recommendations(_) => RequestKind::Recommendations,
        }
    }
}

/// Check `payload` against the schema for `kind`.
pub fn validate(kind: RequestKind, payload: &Value) -> Result<ValidatedPayload, ValidationError> {
    let map = payload.as_object().ok_or(ValidationError::NotAnObject)?;
    let f = Fields(map);
    let validated = match kind {
        RequestKind::CareerExplain => ValidatedPayload::CareerExplain(CareerExplain {
            title: f.required_text("title", 100)?,
            description: f.required_text("description", 500)?,
            salary: f.required_text("salary", 100)?,
            growth: f.required_text("growth", 100)?,
            skills: f.string_list("skills", false)?,
            companies: f.string_list("companies", false)?,
        }),
        RequestKind::CareerCompare => ValidatedPayload::CareerCompare(Comparison {
            first: f.required_record("career1")?,
            second: f.required_record("career2")?,
        }),
        RequestKind::CollegeCompare => ValidatedPayload::CollegeCompare(Comparison {
            first: f.required_record("college1")?,
            second: f.required_record("college2")?,
        }),
        RequestKind::Roadmap => ValidatedPayload::Roadmap(RoadmapRequest {
            career: f.required_text("career", 100)?,
            current_level: f.optional_text("currentLevel", 100)?,
            timeline: f.optional_text("timeline", 50)?,
            interests: f.string_list("interests", false)?,
        }),
        RequestKind::Eligibility => ValidatedPayload::Eligibility(EligibilityRequest {
            target: f.required_text("target", 200)?,
            details: f.optional_record("details")?,
            background: f.optional_text("background", 200)?,
        }),
        RequestKind::Trends => ValidatedPayload::Trends(TrendsRequest {
            trends: f.records("trends", MAX_TREND_RECORDS)?,
            industry: f.optional_text("industry", 100)?,
        }),
        RequestKind::Recommendations => ValidatedPayload::Recommendations(AssessmentProfile {
            interests: f.string_list("interests", true)?,
            skills: f.string_list("skills", false)?,
            academic_background: f.required_text("academicBackground", 200)?,
            location_preference: f.optional_text("locationPreference", 100)?,
            career_goals: f.optional_text("careerGoals", 500)?,
            preferred_work_style: f.optional_text("preferredWorkStyle", 100)?,
            salary_expectation: f.optional_text("salaryExpectation", 100)?,
        }),
    };
    Ok(validated)
}

/// Field accessors over the raw payload map.  `null` counts as absent.
struct Fields<'a>(&'a Map<String, Value>);

impl<'a> Fields<'a> {
    fn get(&self, name: &str) -> Option<&'a Value> {
        self.0.get(name).filter(|v| !v.is_null())
    }

    fn optional_text(
        &self,
        name: &'static str,
        max_chars: usize,
    ) -> Result<Option<BoundedText>, ValidationError> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::String(s)) => {
                if s.chars().count() > max_chars {
                    return Err(ValidationError::TooLong {
                        field: name,
                        max: max_chars,
                    });
                }
                Ok(Some(BoundedText {
                    value: s.clone(),
                    max_chars,
                }))
            }
            Some(_) => Err(ValidationError::WrongType(name)),
        }
    }

    fn required_text(
        &self,
        name: &'static str,
        max_chars: usize,
    ) -> Result<BoundedText, ValidationError> {
        self.optional_text(name, max_chars)?
            .ok_or(ValidationError::Missing(name))
    }

    fn string_list(&self, name: &'static str, required: bool) -> Result<Vec<String>, ValidationError> {
        let items = match self.get(name) {
            None if required => return Err(ValidationError::Missing(name)),
            None => return Ok(Vec::new()),
            Some(Value::Array(items)) => items,
            Some(_) => return Err(ValidationError::WrongType(name)),
        };
        if items.len() > MAX_LIST_ITEMS {
            return Err(ValidationError::TooManyItems {
                field: name,
                max: MAX_LIST_ITEMS,
            });
        }
        items
            .iter()
            .map(|item| match item {
                Value::String(s) if s.chars().count() > MAX_ITEM_CHARS => {
                    Err(ValidationError::TooLong {
                        field: name,
                        max: MAX_ITEM_CHARS,
                    })
                }
                Value::String(s) => Ok(s.clone()),
                _ => Err(ValidationError::WrongType(name)),
            })
            .collect()
    }

    fn optional_record(&self, name: &'static str) -> Result<Option<OpaqueRecord>, ValidationError> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::Object(map)) => Ok(Some(OpaqueRecord(map.clone()))),
            Some(_) => Err(ValidationError::WrongType(name)),
        }
    }

    fn required_record(&self, name: &'static str) -> Result<OpaqueRecord, ValidationError> {
        self.optional_record(name)?
            .ok_or(ValidationError::Missing(name))
    }

    fn records(&self, name: &'static str, max_items: usize) -> Result<Vec<Value>, ValidationError> {
        match self.get(name) {
            None => Err(ValidationError::Missing(name)),
            Some(Value::Array(items)) if items.len() > max_items => {
                Err(ValidationError::TooManyItems {
                    field: name,
                    max: max_items,
                })
            }
            Some(Value::Array(items)) => Ok(items.clone()),
            Some(_) => Err(ValidationError::WrongType(name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn career(description_len: usize) -> Value {
        json!({
            "title": "Data Scientist",
            "description": "d".repeat(description_len),
            "salary": "8-25 LPA",
            "growth": "Very High",
            "skills": ["Python", "Statistics"],
            "companies": ["Flipkart", "Swiggy"]
        })
    }

    #[test]
    fn parses_kind_names() {
        for kind in RequestKind::ALL {
            assert_eq!(kind.as_str().parse::<RequestKind>().unwrap(), kind);
        }
        assert_eq!(
            "career_predict".parse::<RequestKind>(),
            Err(ValidationError::UnknownKind)
        );
        assert_eq!(RequestKind::Trends.index(), 5);
    }

    #[test]
    fn description_bound_is_enforced() {
        let err = validate(RequestKind::CareerExplain, &career(600)).unwrap_err();
        assert_eq!(
            err,
            ValidationError::TooLong {
                field: "description",
                max: 500
            }
        );
        let ok = validate(RequestKind::CareerExplain, &career(400)).unwrap();
        match ok {
            ValidatedPayload::CareerExplain(c) => {
                assert_eq!(c.description.value.len(), 400);
                assert_eq!(c.description.sanitize_cap(), 1000);
                assert_eq!(c.skills, vec!["Python", "Statistics"]);
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn missing_and_mistyped_fields_name_the_field() {
        let mut payload = career(10);
        payload.as_object_mut().unwrap().remove("salary");
        assert_eq!(
            validate(RequestKind::CareerExplain, &payload).unwrap_err(),
            ValidationError::Missing("salary")
        );
        let payload = json!({"career": 42});
        let err = validate(RequestKind::Roadmap, &payload).unwrap_err();
        assert_eq!(err, ValidationError::WrongType("career"));
        assert_eq!(err.field(), Some("career"));
    }

    #[test]
    fn list_bounds_are_enforced() {
        let mut payload = career(10);
        let many: Vec<String> = (0..16).map(|i| format!("s{}", i)).collect();
        payload["skills"] = json!(many);
        assert_eq!(
            validate(RequestKind::CareerExplain, &payload).unwrap_err(),
            ValidationError::TooManyItems {
                field: "skills",
                max: 15
            }
        );
        payload["skills"] = json!(["x".repeat(101)]);
        assert!(matches!(
            validate(RequestKind::CareerExplain, &payload),
            Err(ValidationError::TooLong { field: "skills", .. })
        ));
        payload["skills"] = json!([1, 2]);
        assert_eq!(
            validate(RequestKind::CareerExplain, &payload).unwrap_err(),
            ValidationError::WrongType("skills")
        );
    }

    #[test]
    fn comparisons_accept_opaque_records() {
        let payload = json!({
            "career1": {"title": "Doctor", "nested": {"deep": [1, 2, {"x": null}]}},
            "career2": {"title": "Engineer"}
        });
        let v = validate(RequestKind::CareerCompare, &payload).unwrap();
        assert_eq!(v.kind(), RequestKind::CareerCompare);
        let err = validate(RequestKind::CollegeCompare, &json!({"college1": {}, "college2": "IIT"}))
            .unwrap_err();
        assert_eq!(err, ValidationError::WrongType("college2"));
    }

    #[test]
    fn trends_allow_twenty_loose_records() {
        let rows: Vec<Value> = (0..20).map(|i| json!({"year": 2020 + i, "jobs": i})).collect();
        assert!(validate(RequestKind::Trends, &json!({ "trends": rows })).is_ok());
        let rows: Vec<Value> = (0..21).map(|i| json!(i)).collect();
        assert_eq!(
            validate(RequestKind::Trends, &json!({ "trends": rows })).unwrap_err(),
            ValidationError::TooManyItems {
                field: "trends",
                max: 20
            }
        );
    }

    #[test]
    fn null_optionals_are_absent() {
        let payload = json!({"career": "Designer", "currentLevel": null, "interests": null});
        match validate(RequestKind::Roadmap, &payload).unwrap() {
            ValidatedPayload::Roadmap(r) => {
                assert!(r.current_level.is_none());
                assert!(r.interests.is_empty());
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn recommendations_require_interests_and_background() {
        let err = validate(
            RequestKind::Recommendations,
            &json!({"academicBackground": "12th Science"}),
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::Missing("interests"));
        let ok = validate(
            RequestKind::Recommendations,
            &json!({"interests": ["Technology"], "academicBackground": "12th Science"}),
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn non_object_payload_is_rejected() {
        assert_eq!(
            validate(RequestKind::Trends, &json!([1, 2])).unwrap_err(),
            ValidationError::NotAnObject
        );
    }
}

//! Request schema and per-field validation
//!
//! Each feature has exactly one rule (kind plus inclusive range). A request
//! is checked against every rule and all violations are reported together,
//! in canonical feature order, so clients can fix everything in one go.

use crate::error::{Error, FieldViolation, Result};
use crate::models::Feature;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Numeric kind accepted for a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Integer,
    Float,
}

/// Validation rule for a single feature
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub feature: Feature,
    pub kind: ValueKind,
    pub min: f64,
    pub max: f64,
}

pub const FIELD_RULES: [FieldRule; 5] = [
    FieldRule {
        feature: Feature::Pregnancies,
        kind: ValueKind::Integer,
        min: 0.0,
        max: 20.0,
    },
    FieldRule {
        feature: Feature::Glucose,
        kind: ValueKind::Float,
        min: 50.0,
        max: 300.0,
    },
    FieldRule {
        feature: Feature::BloodPressure,
        kind: ValueKind::Float,
        min: 40.0,
        max: 150.0,
    },
    FieldRule {
        feature: Feature::Bmi,
        kind: ValueKind::Float,
        min: 15.0,
        max: 60.0,
    },
    FieldRule {
        feature: Feature::Age,
        kind: ValueKind::Integer,
        min: 18.0,
        max: 100.0,
    },
];

impl FieldRule {
    /// Check one raw JSON value against this rule
    pub fn check(&self, value: Option<&Value>) -> std::result::Result<f64, FieldViolation> {
        let field = self.feature.name();
        let number = match value {
            None | Some(Value::Null) => return Err(FieldViolation::new(field, "field required")),
            Some(Value::Number(n)) => n,
            Some(_) => return Err(FieldViolation::new(field, "must be a number")),
        };

        let v = match (self.kind, number.as_i64()) {
            (_, Some(i)) => i as f64,
            (kind, None) => {
                let f = number
                    .as_f64()
                    .ok_or_else(|| FieldViolation::new(field, "must be a number"))?;
                if !f.is_finite() {
                    return Err(FieldViolation::new(field, "must be a finite number"));
                }
                if kind == ValueKind::Integer && f.fract() != 0.0 {
                    return Err(FieldViolation::new(field, "must be an integer"));
                }
                f
            }
        };

        if v < self.min {
            return Err(FieldViolation::new(
                field,
                format!("must be greater than or equal to {}", self.min),
            ));
        }
        if v > self.max {
            return Err(FieldViolation::new(
                field,
                format!("must be less than or equal to {}", self.max),
            ));
        }
        Ok(v)
    }
}

/// Body of `POST /predict` before validation
///
/// Fields are kept as raw JSON so type errors can be reported per field
/// instead of failing the whole body. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictionRequest {
    #[serde(rename = "Pregnancies", default, skip_serializing_if = "Option::is_none")]
    pub pregnancies: Option<Value>,
    #[serde(rename = "Glucose", default, skip_serializing_if = "Option::is_none")]
    pub glucose: Option<Value>,
    #[serde(rename = "BloodPressure", default, skip_serializing_if = "Option::is_none")]
    pub blood_pressure: Option<Value>,
    #[serde(rename = "BMI", default, skip_serializing_if = "Option::is_none")]
    pub bmi: Option<Value>,
    #[serde(rename = "Age", default, skip_serializing_if = "Option::is_none")]
    pub age: Option<Value>,
}

impl PredictionRequest {
    pub fn from_values(pregnancies: i64, glucose: f64, blood_pressure: f64, bmi: f64, age: i64) -> Self {
        Self {
            pregnancies: Some(Value::from(pregnancies)),
            glucose: Some(Value::from(glucose)),
            blood_pressure: Some(Value::from(blood_pressure)),
            bmi: Some(Value::from(bmi)),
            age: Some(Value::from(age)),
        }
    }

    fn field(&self, feature: Feature) -> Option<&Value> {
        match feature {
            Feature::Pregnancies => self.pregnancies.as_ref(),
            Feature::Glucose => self.glucose.as_ref(),
            Feature::BloodPressure => self.blood_pressure.as_ref(),
            Feature::Bmi => self.bmi.as_ref(),
            Feature::Age => self.age.as_ref(),
        }
    }

    /// Apply every field rule, collecting all violations
    pub fn validate(&self) -> Result<ValidatedFeatures> {
        let mut values = [0.0; 5];
        let mut violations = Vec::new();

        for (slot, rule) in values.iter_mut().zip(FIELD_RULES.iter()) {
            match rule.check(self.field(rule.feature)) {
                Ok(v) => *slot = v,
                Err(violation) => violations.push(violation),
            }
        }

        if violations.is_empty() {
            Ok(ValidatedFeatures { values })
        } else {
            Err(Error::Validation(violations))
        }
    }
}

/// Feature values that passed validation, addressed by name
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidatedFeatures {
    /// Indexed like `FIELD_RULES` / `Feature::ALL`
    values: [f64; 5],
}

impl ValidatedFeatures {
    pub fn get(&self, feature: Feature) -> f64 {
        let idx = match feature {
            Feature::Pregnancies => 0,
            Feature::Glucose => 1,
            Feature::BloodPressure => 2,
            Feature::Bmi => 3,
            Feature::Age => 4,
        };
        self.values[idx]
    }

    /// Values laid out in the given order (the training-time column order)
    pub fn ordered(&self, order: &[Feature]) -> Vec<f64> {
        order.iter().map(|f| self.get(*f)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(body: Value) -> PredictionRequest {
        serde_json::from_value(body).unwrap()
    }

    fn violations(err: Error) -> Vec<FieldViolation> {
        match err {
            Error::Validation(v) => v,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_request() {
        let req = parse(json!({
            "Pregnancies": 1, "Glucose": 85, "BloodPressure": 65, "BMI": 22.0, "Age": 25
        }));
        let features = req.validate().unwrap();
        assert_eq!(features.get(Feature::Glucose), 85.0);
        assert_eq!(features.get(Feature::Bmi), 22.0);
        assert_eq!(features.get(Feature::Age), 25.0);
    }

    #[test]
    fn test_missing_field_is_named() {
        for missing in Feature::ALL {
            let mut body = json!({
                "Pregnancies": 1, "Glucose": 85, "BloodPressure": 65, "BMI": 22.0, "Age": 25
            });
            body.as_object_mut().unwrap().remove(missing.name());
            let v = violations(parse(body).validate().unwrap_err());
            assert_eq!(v.len(), 1);
            assert_eq!(v[0].field, missing.name());
            assert_eq!(v[0].message, "field required");
        }
    }

    #[test]
    fn test_negative_glucose_rejected() {
        let req = PredictionRequest::from_values(1, -5.0, 65.0, 22.0, 25);
        let v = violations(req.validate().unwrap_err());
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].field, "Glucose");
        assert!(v[0].message.contains("greater than or equal to 50"));
    }

    #[test]
    fn test_all_violations_reported_in_feature_order() {
        let req = parse(json!({
            "Pregnancies": 2.5, "Glucose": "high", "BMI": 100, "Age": 25
        }));
        let v = violations(req.validate().unwrap_err());
        let fields: Vec<&str> = v.iter().map(|x| x.field.as_str()).collect();
        assert_eq!(fields, vec!["Pregnancies", "Glucose", "BloodPressure", "BMI"]);
        assert_eq!(v[0].message, "must be an integer");
        assert_eq!(v[1].message, "must be a number");
        assert_eq!(v[2].message, "field required");
        assert!(v[3].message.contains("less than or equal to 60"));
    }

    #[test]
    fn test_integer_field_accepts_whole_float() {
        let req = parse(json!({
            "Pregnancies": 6.0, "Glucose": 180, "BloodPressure": 90, "BMI": 35.0, "Age": 45.0
        }));
        let features = req.validate().unwrap();
        assert_eq!(features.get(Feature::Pregnancies), 6.0);
        assert_eq!(features.get(Feature::Age), 45.0);
    }

    #[test]
    fn test_null_is_missing() {
        let req = parse(json!({
            "Pregnancies": null, "Glucose": 85, "BloodPressure": 65, "BMI": 22.0, "Age": 25
        }));
        let v = violations(req.validate().unwrap_err());
        assert_eq!(v[0].field, "Pregnancies");
        assert_eq!(v[0].message, "field required");
    }

    #[test]
    fn test_get_returns_each_named_feature() {
        let features = PredictionRequest::from_values(3, 140.0, 80.0, 31.5, 44)
            .validate()
            .unwrap();
        assert_eq!(features.get(Feature::Pregnancies), 3.0);
        assert_eq!(features.get(Feature::Glucose), 140.0);
        assert_eq!(features.get(Feature::BloodPressure), 80.0);
        assert_eq!(features.get(Feature::Bmi), 31.5);
        assert_eq!(features.get(Feature::Age), 44.0);
        // Slot layout matches the rule table
        for (rule, value) in FIELD_RULES.iter().zip([3.0, 140.0, 80.0, 31.5, 44.0]) {
            assert_eq!(features.get(rule.feature), value);
        }
    }

    #[test]
    fn test_ordered_follows_given_order() {
        let features = PredictionRequest::from_values(3, 120.0, 70.0, 30.5, 40)
            .validate()
            .unwrap();
        let order = [Feature::Age, Feature::Bmi, Feature::Pregnancies, Feature::BloodPressure, Feature::Glucose];
        assert_eq!(features.ordered(&order), vec![40.0, 30.5, 3.0, 70.0, 120.0]);
        assert_eq!(features.ordered(&Feature::ALL), vec![3.0, 120.0, 70.0, 30.5, 40.0]);
    }

    #[test]
    fn test_boundaries_are_inclusive() {
        let req = PredictionRequest::from_values(0, 50.0, 150.0, 15.0, 100);
        assert!(req.validate().is_ok());
        let req = PredictionRequest::from_values(21, 300.0, 40.0, 60.0, 17);
        let v = violations(req.validate().unwrap_err());
        let fields: Vec<&str> = v.iter().map(|x| x.field.as_str()).collect();
        assert_eq!(fields, vec!["Pregnancies", "Age"]);
    }
}

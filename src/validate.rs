use serde_json::Value;

use crate::error::ValidationError;

/// A payload that passed [`check_response`], borrowed from the raw JSON.
#[derive(Debug)]
pub struct ApiResponse<'a> {
    pub homeworks: &'a [Value],
    pub current_date: i64,
}

/// Gate the untrusted payload: it must be an object with a `homeworks`
/// array and an integer `current_date`. Nothing downstream reads the
/// payload until this passes.
pub fn check_response(payload: &Value) -> Result<(), ValidationError> {
    let obj = payload.as_object().ok_or(ValidationError::NotAnObject)?;

    match obj.get("homeworks") {
        None => return Err(ValidationError::MissingField("homeworks")),
        Some(v) if !v.is_array() => {
            return Err(ValidationError::WrongType {
                field: "homeworks",
                expected: "a list",
            });
        }
        Some(_) => {}
    }

    match obj.get("current_date") {
        None => Err(ValidationError::MissingField("current_date")),
        Some(v) if v.as_i64().is_none() => Err(ValidationError::WrongType {
            field: "current_date",
            expected: "an integer",
        }),
        Some(_) => Ok(()),
    }
}

impl<'a> ApiResponse<'a> {
    pub fn parse(payload: &'a Value) -> Result<Self, ValidationError> {
        check_response(payload)?;
        let homeworks = payload["homeworks"]
            .as_array()
            .ok_or(ValidationError::MissingField("homeworks"))?;
        let current_date = payload["current_date"]
            .as_i64()
            .ok_or(ValidationError::MissingField("current_date"))?;
        Ok(Self {
            homeworks,
            current_date,
        })
    }
}

//! Request/response types shared by every gateway implementation.

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};

/// HTTP verbs used against the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider API key. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    /// Wrap a raw key, trimming surrounding whitespace. Empty keys are rejected.
    pub fn new(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken(***)")
    }
}

/// A single outbound call: method, path relative to the base URL, query and body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Parsed success body. `Empty` is the synthetic marker for 204 / empty content.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiBody {
    Json(Value),
    Empty,
}

impl ApiBody {
    /// Parse raw response text; blank text becomes `Empty`.
    pub fn from_text(text: &str) -> ApiResult<Self> {
        if text.trim().is_empty() {
            return Ok(Self::Empty);
        }
        Ok(Self::Json(serde_json::from_str(text)?))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn into_value(self) -> Value {
        match self {
            Self::Json(value) => value,
            Self::Empty => Value::Null,
        }
    }

    /// Decode a single object.
    pub fn decode<T: DeserializeOwned>(self) -> ApiResult<T> {
        match self {
            Self::Json(value) => Ok(serde_json::from_value(value)?),
            Self::Empty => Err(ApiError::UnexpectedResponse(
                "expected a JSON body, got no content".to_string(),
            )),
        }
    }

    /// Decode a list endpoint. Items may be wrapped as `{cursor, <field>: {...}}`
    /// or be the bare objects themselves.
    pub fn decode_list<T: DeserializeOwned>(self, field: &str) -> ApiResult<Vec<T>> {
        let items = match self {
            Self::Empty => return Ok(Vec::new()),
            Self::Json(Value::Array(items)) => items,
            Self::Json(Value::Null) => return Ok(Vec::new()),
            Self::Json(other) => {
                return Err(ApiError::UnexpectedResponse(format!(
                    "expected a list of {}, got {}",
                    field,
                    kind_of(&other)
                )))
            }
        };

        items
            .into_iter()
            .map(|item| {
                let inner = match item {
                    Value::Object(mut map) if map.contains_key(field) => {
                        map.remove(field).unwrap_or(Value::Null)
                    }
                    other => other,
                };
                serde_json::from_value(inner).map_err(ApiError::from)
            })
            .collect()
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: String,
    }

    #[test]
    fn test_empty_text_is_synthetic_success() {
        assert_eq!(ApiBody::from_text("").unwrap(), ApiBody::Empty);
        assert_eq!(ApiBody::from_text("  \n").unwrap(), ApiBody::Empty);
        assert!(ApiBody::from_text("{\"a\":1}").unwrap().decode::<Value>().is_ok());
    }

    #[test]
    fn test_decode_list_wrapped_and_bare() {
        let wrapped = ApiBody::Json(json!([
            {"cursor": "c1", "service": {"id": "srv-a"}},
            {"cursor": "c2", "service": {"id": "srv-b"}}
        ]));
        let items: Vec<Item> = wrapped.decode_list("service").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].id, "srv-b");

        let bare = ApiBody::Json(json!([{"id": "srv-c"}]));
        let items: Vec<Item> = bare.decode_list("service").unwrap();
        assert_eq!(items, vec![Item { id: "srv-c".to_string() }]);
    }

    #[test]
    fn test_decode_list_rejects_object() {
        let err = ApiBody::Json(json!({"id": "x"}))
            .decode_list::<Item>("service")
            .unwrap_err();
        assert!(err.to_string().contains("an object"));
    }

    #[test]
    fn test_token_redacted_and_trimmed() {
        let token = ApiToken::new("  rnd_secret  ").unwrap();
        assert_eq!(token.expose(), "rnd_secret");
        assert_eq!(token.bearer(), "Bearer rnd_secret");
        assert_eq!(format!("{:?}", token), "ApiToken(***)");
        assert!(ApiToken::new("   ").is_none());
        assert!(ApiToken::new("two words").is_none());
    }

    #[test]
    fn test_request_builder() {
        let req = ApiRequest::get("services").query("limit", 50);
        assert_eq!(req.method, Method::Get);
        assert_eq!(req.query, vec![("limit".to_string(), "50".to_string())]);
        assert!(req.body.is_none());
    }
}

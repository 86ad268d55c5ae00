//! Action invocation event and response envelope

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use crate::Result;
use crate::error::Error;

/// Envelope version understood by the agent runtime
pub const MESSAGE_VERSION: &str = "1.0";

/// A named parameter as delivered by the runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionParameter {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub param_type: Option<String>,
    pub value: String,
}

/// Action invocation delivered by the agent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_version: Option<String>,
    pub action_group: String,
    pub api_path: String,
    #[serde(default = "default_http_method")]
    pub http_method: String,
    #[serde(default)]
    pub parameters: Vec<ActionParameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<Value>,
}

fn default_http_method() -> String {
    "GET".to_string()
}

impl ActionEvent {
    pub fn new(action_group: impl Into<String>, api_path: impl Into<String>) -> Self {
        Self {
            message_version: Some(MESSAGE_VERSION.to_string()),
            action_group: action_group.into(),
            api_path: api_path.into(),
            http_method: default_http_method(),
            parameters: Vec::new(),
            request_body: None,
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push(ActionParameter {
            name: name.into(),
            param_type: Some("string".to_string()),
            value: value.into(),
        });
        self
    }

    /// Look up a named parameter, then fall back to the JSON request body
    /// properties.
    pub fn parameter(&self, name: &str) -> Result<String> {
        if let Some(p) = self.parameters.iter().find(|p| p.name == name) {
            return Ok(p.value.clone());
        }

        self.request_body
            .as_ref()
            .and_then(|body| body.pointer("/content/application~1json/properties"))
            .and_then(Value::as_array)
            .and_then(|props| {
                props
                    .iter()
                    .find(|p| p.get("name").and_then(Value::as_str) == Some(name))
            })
            .and_then(|p| p.get("value"))
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .ok_or_else(|| Error::Action(format!("Missing '{}' parameter", name)))
    }
}

/// Result block inside the response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub action_group: String,
    pub api_path: String,
    pub http_method: String,
    pub http_status_code: u16,
    pub response_body: Value,
}

/// Response envelope returned to the agent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    pub message_version: String,
    pub response: ActionResult,
}

impl ActionResponse {
    pub fn new(event: &ActionEvent, status: u16, body: Value) -> Self {
        Self {
            message_version: MESSAGE_VERSION.to_string(),
            response: ActionResult {
                action_group: event.action_group.clone(),
                api_path: event.api_path.clone(),
                http_method: event.http_method.clone(),
                http_status_code: status,
                response_body: json!({"application/json": {"body": body}}),
            },
        }
    }

    pub fn status(&self) -> u16 {
        self.response.http_status_code
    }

    /// The `body` value inside `responseBody."application/json"`.
    pub fn body(&self) -> &Value {
        &self.response.response_body["application/json"]["body"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_runtime_event() {
        let event: ActionEvent = serde_json::from_value(json!({
            "messageVersion": "1.0",
            "agent": {"name": "portfolio-agent"},
            "actionGroup": "PortfolioActionGroup",
            "apiPath": "/createPortfolio",
            "httpMethod": "GET",
            "sessionId": "MYSESSION",
            "parameters": [
                {"name": "numCompanies", "type": "integer", "value": "3"},
                {"name": "industry", "type": "string", "value": "Real Estate"}
            ]
        }))
        .unwrap();

        assert_eq!(event.api_path, "/createPortfolio");
        assert_eq!(event.parameter("industry").unwrap(), "Real Estate");
        assert_eq!(event.parameter("numCompanies").unwrap(), "3");
    }

    #[test]
    fn test_parameter_from_request_body() {
        let event: ActionEvent = serde_json::from_value(json!({
            "actionGroup": "g",
            "apiPath": "/companyResearch",
            "httpMethod": "POST",
            "requestBody": {
                "content": {
                    "application/json": {
                        "properties": [{"name": "name", "type": "string", "value": "SkyHigh Towers"}]
                    }
                }
            }
        }))
        .unwrap();

        assert_eq!(event.parameter("name").unwrap(), "SkyHigh Towers");
        assert!(matches!(event.parameter("other"), Err(Error::Action(_))));
    }

    #[test]
    fn test_response_envelope() {
        let event = ActionEvent::new("g", "/companyResearch");
        let response = ActionResponse::new(&event, 200, json!({"companyId": 1}));
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["messageVersion"], "1.0");
        assert_eq!(json["response"]["httpStatusCode"], 200);
        assert_eq!(json["response"]["apiPath"], "/companyResearch");
        assert_eq!(
            json["response"]["responseBody"]["application/json"]["body"]["companyId"],
            1
        );
        assert_eq!(response.body()["companyId"], 1);
    }
}

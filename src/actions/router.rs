//! Action router - dispatches events by api path

use std::collections::HashMap;
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, warn};
use crate::error::Error;
use super::dataset::{companies, Company};
use super::{Action, ActionEvent, ActionResponse, CompanyResearch, CreatePortfolio};

/// Action definition for schema export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionDefinition {
    pub api_path: String,
    pub name: String,
    pub description: String,
    pub http_method: String,
    pub parameters: Value,
    pub response_schema: Value,
}

/// Action router manages registered actions and dispatches events
pub struct ActionRouter {
    actions: HashMap<String, Box<dyn Action>>,
}

impl ActionRouter {
    /// Create an empty router
    pub fn new() -> Self {
        Self {
            actions: HashMap::new(),
        }
    }

    /// Router with the company research and portfolio actions
    pub fn with_defaults() -> Self {
        let data: Arc<[Company]> = companies().into();

        let mut router = Self::new();
        router.register(CompanyResearch::new(data.clone()));
        router.register(CreatePortfolio::new(data));
        router
    }

    /// Register an action under its api path
    pub fn register<A: Action + 'static>(&mut self, action: A) {
        self.actions.insert(action.api_path().to_string(), Box::new(action));
    }

    /// Check if a route exists
    pub fn has(&self, api_path: &str) -> bool {
        self.actions.contains_key(api_path)
    }

    /// Registered api paths, sorted
    pub fn api_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.actions.keys().map(|s| s.as_str()).collect();
        paths.sort_unstable();
        paths
    }

    /// Definitions of all registered actions, sorted by path
    pub fn definitions(&self) -> Vec<ActionDefinition> {
        let mut defs: Vec<ActionDefinition> =
            self.actions.values().map(|a| a.to_definition()).collect();
        defs.sort_by(|a, b| a.api_path.cmp(&b.api_path));
        defs
    }

    /// Dispatch an event.
    ///
    /// Unknown routes yield 404 and bad parameters 400; neither is an error
    /// for the caller, the status travels in the envelope.
    pub async fn handle(&self, event: &ActionEvent) -> ActionResponse {
        info!("api_path: {} (group {})", event.api_path, event.action_group);

        let Some(action) = self.actions.get(&event.api_path) else {
            let err = Error::UnrecognizedRoute(format!("{}::{}", event.action_group, event.api_path));
            warn!("{}", err);
            return ActionResponse::new(event, 404, Value::String(err.to_string()));
        };

        match action.execute(event).await {
            Ok(body) => ActionResponse::new(event, 200, body),
            Err(e) => {
                warn!("Action {} failed: {}", event.api_path, e);
                ActionResponse::new(event, 400, Value::String(e.to_string()))
            }
        }
    }

    /// OpenAPI 3.0 document describing the registered actions.
    pub fn openapi_schema(&self, title: &str) -> Value {
        let mut paths = Map::new();
        for def in self.definitions() {
            let mut operation = Map::new();
            operation.insert(
                def.http_method.to_lowercase(),
                json!({
                    "summary": def.description,
                    "description": def.description,
                    "operationId": def.name,
                    "parameters": def.parameters,
                    "responses": {
                        "200": {
                            "description": "Successful result",
                            "content": {
                                "application/json": {"schema": def.response_schema}
                            }
                        }
                    }
                }),
            );
            paths.insert(def.api_path, Value::Object(operation));
        }

        json!({
            "openapi": "3.0.0",
            "info": {
                "title": title,
                "version": "1.0.0",
                "description": "Company research and portfolio construction actions"
            },
            "paths": paths,
            "components": {
                "schemas": {
                    "Company": {
                        "type": "object",
                        "properties": {
                            "companyId": {"type": "integer"},
                            "companyName": {"type": "string"},
                            "industrySector": {"type": "string"},
                            "revenue": {"type": "integer"},
                            "expenses": {"type": "integer"},
                            "profit": {"type": "integer"},
                            "employees": {"type": "integer"}
                        }
                    }
                }
            }
        })
    }
}

impl Default for ActionRouter {
    fn default() -> Self {
        Self::new()
    }
}

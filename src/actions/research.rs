//! Company research action

use std::sync::Arc;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;
use crate::Result;
use super::dataset::Company;
use super::{Action, ActionEvent};

/// Look up a single company by name
pub struct CompanyResearch {
    companies: Arc<[Company]>,
}

impl CompanyResearch {
    pub fn new(companies: Arc<[Company]>) -> Self {
        Self { companies }
    }
}

#[async_trait]
impl Action for CompanyResearch {
    fn api_path(&self) -> &str { "/companyResearch" }
    fn name(&self) -> &str { "companyResearch" }
    fn description(&self) -> &str { "Get financial data for a company by name" }

    fn parameters(&self) -> Value {
        json!([{
            "name": "name",
            "in": "query",
            "description": "Name of the company to research",
            "required": true,
            "schema": {"type": "string"}
        }])
    }

    fn response_schema(&self) -> Value {
        json!({"$ref": "#/components/schemas/Company"})
    }

    async fn execute(&self, event: &ActionEvent) -> Result<Value> {
        let name = event.parameter("name")?;
        debug!("Researching company: {}", name);

        let wanted = name.trim().to_lowercase();
        let found = self
            .companies
            .iter()
            .find(|c| c.company_name.to_lowercase() == wanted);

        Ok(match found {
            Some(company) => serde_json::to_value(company)?,
            None => Value::Null,
        })
    }
}

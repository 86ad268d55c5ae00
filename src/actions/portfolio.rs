//! Portfolio construction action

use std::sync::Arc;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;
use crate::Result;
use crate::error::Error;
use super::dataset::Company;
use super::{Action, ActionEvent};

/// Top-N companies of an industry, by profit
pub struct CreatePortfolio {
    companies: Arc<[Company]>,
}

impl CreatePortfolio {
    pub fn new(companies: Arc<[Company]>) -> Self {
        Self { companies }
    }

    /// Companies in `industry` (case-insensitive), highest profit first.
    ///
    /// Ties keep dataset order.
    pub fn select(&self, industry: &str, count: usize) -> Vec<Company> {
        let industry = industry.trim().to_lowercase();
        let mut matching: Vec<Company> = self
            .companies
            .iter()
            .filter(|c| c.industry_sector.to_lowercase() == industry)
            .cloned()
            .collect();

        matching.sort_by(|a, b| b.profit.cmp(&a.profit));
        matching.truncate(count);
        matching
    }
}

#[async_trait]
impl Action for CreatePortfolio {
    fn api_path(&self) -> &str { "/createPortfolio" }
    fn name(&self) -> &str { "createPortfolio" }
    fn description(&self) -> &str { "Create a portfolio of the top profit earners in an industry" }

    fn parameters(&self) -> Value {
        json!([
            {
                "name": "numCompanies",
                "in": "query",
                "description": "Number of companies to include",
                "required": true,
                "schema": {"type": "integer"}
            },
            {
                "name": "industry",
                "in": "query",
                "description": "Industry sector to pick companies from",
                "required": true,
                "schema": {"type": "string"}
            }
        ])
    }

    fn response_schema(&self) -> Value {
        json!({
            "type": "array",
            "items": {"$ref": "#/components/schemas/Company"}
        })
    }

    async fn execute(&self, event: &ActionEvent) -> Result<Value> {
        let raw_count = event.parameter("numCompanies")?;
        let count: usize = raw_count.trim().parse().map_err(|_| {
            Error::Action(format!("numCompanies must be a non-negative integer, got '{}'", raw_count))
        })?;
        let industry = event.parameter("industry")?;

        let portfolio = self.select(&industry, count);
        debug!("Portfolio for {}: {} companies", industry, portfolio.len());

        Ok(serde_json::to_value(portfolio)?)
    }
}

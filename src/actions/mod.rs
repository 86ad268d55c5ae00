//! Actions module - capabilities the agent can invoke
//!
//! The agent runtime calls back into an action group with an
//! [`ActionEvent`] naming an `apiPath`; the [`ActionRouter`] dispatches it
//! to the registered [`Action`] and wraps the result in an
//! [`ActionResponse`] envelope.

mod dataset;
mod event;
mod portfolio;
mod research;
mod router;

pub use dataset::{companies, Company};
pub use event::{ActionEvent, ActionParameter, ActionResponse, ActionResult, MESSAGE_VERSION};
pub use portfolio::CreatePortfolio;
pub use research::CompanyResearch;
pub use router::{ActionDefinition, ActionRouter};

use async_trait::async_trait;
use serde_json::Value;
use crate::Result;

/// Action trait - interface for all action handlers
#[async_trait]
pub trait Action: Send + Sync {
    /// Route this action answers on (e.g. `/companyResearch`)
    fn api_path(&self) -> &str;

    /// Operation id in the exported schema
    fn name(&self) -> &str;

    /// Description of what the action does
    fn description(&self) -> &str;

    /// OpenAPI parameter list
    fn parameters(&self) -> Value;

    /// OpenAPI schema of a successful result
    fn response_schema(&self) -> Value;

    /// HTTP method the action is declared under
    fn http_method(&self) -> &str {
        "get"
    }

    /// Execute the action for an event
    async fn execute(&self, event: &ActionEvent) -> Result<Value>;

    /// Convert to an action definition for schema export
    fn to_definition(&self) -> ActionDefinition {
        ActionDefinition {
            api_path: self.api_path().to_string(),
            name: self.name().to_string(),
            description: self.description().to_string(),
            http_method: self.http_method().to_string(),
            parameters: self.parameters(),
            response_schema: self.response_schema(),
        }
    }
}

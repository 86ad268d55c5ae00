//! Agent session client - one question/answer turn per call

use tracing::{info, warn};

use crate::config::Config;
use crate::error::Error;
use crate::Result;

use super::decoder::{decode_stream, DecodedResponse};
use super::message::{AgentReply, AgentRequest, CollaboratorReply, TurnRequest};
use super::sender::{HttpMethod, OutboundRequest, RequestSender, SigV4Sender};

/// Input text sent with an end-session turn.
pub const END_SESSION_TEXT: &str = "placeholder to end session";

/// Longest error body quoted back from a failed HTTP status.
const MAX_ERROR_BODY: usize = 500;

/// Orchestrates turns against the agent runtime
pub struct AgentSession<S: RequestSender> {
    sender: S,
    config: Config,
}

impl AgentSession<SigV4Sender> {
    /// Session client using the default credential chain.
    pub fn from_config(config: Config) -> Result<Self> {
        config.validate()?;
        let sender = SigV4Sender::from_config(&config)?;
        Ok(Self::new(sender, config))
    }
}

impl<S: RequestSender> AgentSession<S> {
    pub fn new(sender: S, config: Config) -> Self {
        Self { sender, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build the payload and the unsigned outbound request for a turn.
    pub fn build_request(
        &self,
        session_id: &str,
        question: &str,
        end_session: bool,
    ) -> Result<(AgentRequest, OutboundRequest)> {
        let payload = AgentRequest::new(session_id, question)
            .with_trace(self.config.enable_trace)
            .ending(end_session);

        let url = self.config.agent_url(session_id)?;
        let request = OutboundRequest::new(
            HttpMethod::Post,
            url,
            self.config.service.clone(),
            self.config.region.clone(),
        )
        .with_header("content-type", "application/json")
        .with_header("accept", "application/json")
        .with_body(payload.to_body()?);

        Ok((payload, request))
    }

    /// Run one turn, propagating any failure.
    pub async fn ask(&self, session_id: &str, question: &str, end_session: bool) -> Result<DecodedResponse> {
        info!("Session {} asked question: {}", session_id, question);

        let (_, request) = self.build_request(session_id, question, end_session)?;
        let response = self.sender.send(request).await?;

        if !response.is_success() {
            let status = response.status;
            let mut body = response.text_lossy().await?;
            if body.len() > MAX_ERROR_BODY {
                let cut = (0..=MAX_ERROR_BODY)
                    .rev()
                    .find(|i| body.is_char_boundary(*i))
                    .unwrap_or(0);
                body.truncate(cut);
            }
            return Err(Error::Transport(format!(
                "agent runtime returned HTTP {}: {}",
                status, body
            )));
        }

        let decoded = decode_stream(response.body).await?;
        info!(
            "Turn complete: {} answer chars, {} events",
            decoded.answer.len(),
            decoded.events.len()
        );
        Ok(decoded)
    }

    /// Run one turn; failures become a 500 reply instead of an error.
    pub async fn invoke(&self, session_id: &str, question: &str, end_session: bool) -> AgentReply {
        match self.ask(session_id, question, end_session).await {
            Ok(decoded) => AgentReply::success(decoded.answer, decoded.trace.into_string()),
            Err(e) => {
                warn!("Turn failed for session {}: {}", session_id, e);
                AgentReply::failure(&e)
            }
        }
    }

    /// Close the remote session. The reply's answer is usually ignored.
    pub async fn end_session(&self, session_id: &str) -> AgentReply {
        self.invoke(session_id, END_SESSION_TEXT, true).await
    }

    /// Collaborator entry point: `{sessionId, question, endSession}` in,
    /// `{status_code, body}` out.
    pub async fn handle(&self, turn: TurnRequest) -> CollaboratorReply {
        self.invoke(&turn.session_id, &turn.question, turn.end_session)
            .await
            .to_collaborator()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::sender::{FakeReply, FakeSender};
    use crate::auth::StaticProvider;
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde_json::Value;
    use std::time::Duration;

    fn config() -> Config {
        Config {
            agent_id: "AGENT".to_string(),
            agent_alias_id: "ALIAS".to_string(),
            ..Config::default()
        }
    }

    fn answer_chunks(answer: &str) -> Vec<Vec<u8>> {
        vec![
            br#"{"trace":{"orchestrationTrace":{}}}:message-type"#.to_vec(),
            format!(r#"{{"bytes":"{}"}}"#, STANDARD.encode(answer)).into_bytes(),
        ]
    }

    #[tokio::test]
    async fn test_invoke_success() {
        let session = AgentSession::new(FakeSender::with_chunks(answer_chunks("Hello there")), config());

        let reply = session.invoke("MYSESSION", "Hi", false).await;
        assert_eq!(reply.status_code, 200);
        assert_eq!(reply.response_text, "Hello there");
        assert!(reply.trace_log.contains("Bytes in last response"));
    }

    #[tokio::test]
    async fn test_request_shape() {
        let session = AgentSession::new(FakeSender::with_chunks(answer_chunks("ok")), config());
        session.invoke("S1", "What is inflation?", false).await;

        let requests = session.sender.requests.lock().unwrap();
        let req = &requests[0];
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.service, "bedrock");
        assert_eq!(req.region, "us-west-2");
        assert_eq!(
            req.url.as_str(),
            "https://bedrock-agent-runtime.us-west-2.amazonaws.com/agents/AGENT/agentAliases/ALIAS/sessions/S1/text"
        );
        assert_eq!(req.headers["content-type"], "application/json");
        assert_eq!(req.headers["accept"], "application/json");

        let body: Value = serde_json::from_slice(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["inputText"], "What is inflation?");
        assert_eq!(body["enableTrace"], true);
        assert_eq!(body["endSession"], false);
    }

    #[tokio::test]
    async fn test_end_session_runs_full_turn() {
        let session = AgentSession::new(FakeSender::with_chunks(answer_chunks("bye")), config());
        let reply = session.end_session("S1").await;
        assert!(reply.is_success());

        let requests = session.sender.requests.lock().unwrap();
        let body: Value = serde_json::from_slice(requests[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body["endSession"], true);
        assert_eq!(body["inputText"], END_SESSION_TEXT);
    }

    #[tokio::test]
    async fn test_transport_failure_becomes_500() {
        let sender = FakeSender::new(vec![FakeReply::Fail("connection refused".to_string())]);
        let session = AgentSession::new(sender, config());

        let reply = session.invoke("S1", "Hi", false).await;
        assert_eq!(reply.status_code, 500);
        assert!(reply.response_text.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_http_error_status_becomes_500() {
        let sender = FakeSender::new(vec![FakeReply::Chunks(
            403,
            vec![br#"{"message":"The security token included in the request is invalid."}"#.to_vec()],
        )]);
        let session = AgentSession::new(sender, config());

        let reply = session.invoke("S1", "Hi", false).await;
        assert_eq!(reply.status_code, 500);
        assert!(reply.response_text.contains("HTTP 403"));
        assert!(reply.response_text.contains("security token"));
    }

    #[tokio::test]
    async fn test_decode_failure_becomes_apology() {
        let sender = FakeSender::with_chunks(vec![br#"{"trace":{"nothing":"useful"}}"#.to_vec()]);
        let session = AgentSession::new(sender, config());

        let reply = session.invoke("S1", "Hi", false).await;
        assert_eq!(reply.status_code, 500);
        assert!(reply.response_text.starts_with("Sorry"));
    }

    #[tokio::test]
    async fn test_missing_credentials_surface_as_500() {
        let sender = SigV4Sender::new(StaticProvider(None), Duration::from_secs(1)).unwrap();
        let session = AgentSession::new(sender, config());

        let reply = session.invoke("S1", "Hi", false).await;
        assert_eq!(reply.status_code, 500);
        assert!(reply.response_text.starts_with("Authentication error"));
        assert!(reply.trace_log.is_empty());
    }

    #[tokio::test]
    async fn test_deadline_exceeded_is_transport_error() {
        use crate::auth::AwsCredentials;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(wiremock::matchers::method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let creds = StaticProvider(Some(AwsCredentials::new("AKIDEXAMPLE", "SECRET", None)));
        let sender = SigV4Sender::new(creds, Duration::from_millis(200)).unwrap();
        let config = Config {
            endpoint: Some(server.uri()),
            ..config()
        };
        let session = AgentSession::new(sender, config);

        let reply = session.invoke("S1", "Hi", false).await;
        assert_eq!(reply.status_code, 500);
        assert!(reply.response_text.starts_with("Transport error"));
        assert!(reply.trace_log.is_empty());
    }

    #[tokio::test]
    async fn test_handle_collaborator_contract() {
        let session = AgentSession::new(FakeSender::with_chunks(answer_chunks("Portfolio created")), config());
        let turn: TurnRequest =
            serde_json::from_str(r#"{"sessionId":"MYSESSION","question":"Create a portfolio"}"#).unwrap();

        let out = session.handle(turn).await;
        assert_eq!(out.status_code, 200);
        let body: Value = serde_json::from_str(&out.body).unwrap();
        assert_eq!(body["response"], "Portfolio created");
        assert!(body["trace_data"].as_str().unwrap().contains("Decoded response"));
    }

    #[tokio::test]
    async fn test_handle_failure_contract() {
        let session = AgentSession::new(FakeSender::new(vec![]), config());
        let turn: TurnRequest =
            serde_json::from_str(r#"{"sessionId":"S","question":"q","endSession":"true"}"#).unwrap();

        let out = session.handle(turn).await;
        assert_eq!(out.status_code, 500);
        let body: Value = serde_json::from_str(&out.body).unwrap();
        assert!(body["error"].is_string());
    }

    #[test]
    fn test_from_config_rejects_incomplete() {
        assert!(AgentSession::from_config(Config::default()).is_err());
    }
}

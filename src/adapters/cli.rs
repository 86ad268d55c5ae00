//! CLI adapter - interactive chat against the agent runtime.
//!
//! Keeps the per-session conversation history in memory; ending the
//! session sends an end-session turn and clears it.

use std::io::{self, BufRead, Write};

use tracing::warn;

use crate::agent::{filter_trace, AgentReply, AgentSession, ConversationTurn, RequestSender, TurnAnswer};
use crate::ui;
use crate::Result;

/// A line typed at the chat prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Ask(String),
    EndSession,
    Trace(Option<String>),
    History,
    Help,
    Exit,
    Empty,
}

impl ChatCommand {
    pub fn parse(line: &str) -> Self {
        let input = line.trim();
        if input.is_empty() {
            return ChatCommand::Empty;
        }

        if matches!(input.to_lowercase().as_str(), "exit" | "quit" | "q") {
            return ChatCommand::Exit;
        }

        let (head, rest) = match input.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (input, ""),
        };

        match head {
            "/end" => ChatCommand::EndSession,
            "/trace" if rest.is_empty() => ChatCommand::Trace(None),
            "/trace" => ChatCommand::Trace(Some(rest.to_string())),
            "/history" => ChatCommand::History,
            "/help" => ChatCommand::Help,
            _ => ChatCommand::Ask(input.to_string()),
        }
    }
}

/// CLI channel for interactive agent sessions.
pub struct CliChannel<S: RequestSender> {
    session: AgentSession<S>,
    session_id: String,
    history: Vec<ConversationTurn>,
    last_trace: String,
}

impl<S: RequestSender> CliChannel<S> {
    /// Create a new CLI channel.
    pub fn new(session: AgentSession<S>, session_id: impl Into<String>) -> Self {
        Self {
            session,
            session_id: session_id.into(),
            history: Vec::new(),
            last_trace: String::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Run a single turn and record it.
    ///
    /// Failures are recorded too, with the error text in place of an answer.
    pub async fn ask(&mut self, question: &str) -> AgentReply {
        let (reply, answer) = match self.session.ask(&self.session_id, question, false).await {
            Ok(decoded) => {
                let answer = TurnAnswer::from_decoded(&decoded);
                (AgentReply::success(decoded.answer, decoded.trace.into_string()), answer)
            }
            Err(e) => {
                warn!("Turn failed for session {}: {}", self.session_id, e);
                let reply = AgentReply::failure(&e);
                let answer = TurnAnswer::Text(reply.response_text.clone());
                (reply, answer)
            }
        };

        self.history.push(ConversationTurn::new(question, answer));
        self.last_trace = reply.trace_log.clone();

        reply
    }

    /// End the remote session and forget the local history.
    pub async fn end_session(&mut self) -> AgentReply {
        let reply = self.session.end_session(&self.session_id).await;
        self.clear_history();
        reply
    }

    /// Trace of the last turn, optionally filtered.
    pub fn trace(&self, filter: Option<&str>) -> String {
        filter_trace(&self.last_trace, filter.unwrap_or(""))
    }

    /// Turns, most recent first.
    pub fn history(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.history.iter().rev()
    }

    /// Clear conversation history.
    pub fn clear_history(&mut self) {
        self.history.clear();
        self.last_trace.clear();
    }

    /// Get current history length.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Run interactive REPL loop.
    pub async fn run_interactive(&mut self) -> Result<()> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();

        loop {
            print!("\n\x1b[1;34mYou\x1b[0m: ");
            stdout.flush()?;

            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                // EOF
                break;
            }

            match ChatCommand::parse(&line) {
                ChatCommand::Empty => continue,
                ChatCommand::Exit => {
                    println!("Goodbye! 👋");
                    break;
                }
                ChatCommand::Help => print_help(),
                ChatCommand::History => {
                    if self.history_len() == 0 {
                        ui::print_step("No turns yet");
                    }
                    for turn in self.history() {
                        println!();
                        ui::print_turn(turn);
                    }
                }
                ChatCommand::Trace(filter) => {
                    let trace = self.trace(filter.as_deref());
                    if trace.is_empty() {
                        ui::print_step("No trace data");
                    } else {
                        println!("{}", trace);
                    }
                }
                ChatCommand::EndSession => {
                    let pb = ui::spinner("Ending session");
                    let reply = self.end_session().await;
                    pb.finish_and_clear();
                    if reply.is_success() {
                        ui::print_success("Session ended. Thank you for using the portfolio assistant!");
                    } else {
                        ui::print_error(&reply.response_text);
                    }
                }
                ChatCommand::Ask(question) => {
                    let pb = ui::spinner("Thinking");
                    let reply = self.ask(&question).await;
                    pb.finish_and_clear();

                    if reply.is_success() {
                        if let Some(turn) = self.history.last() {
                            println!();
                            ui::print_turn(turn);
                        }
                    } else {
                        println!("\n\x1b[1;31mError\x1b[0m: {}", reply.response_text);
                    }
                }
            }
        }

        Ok(())
    }
}

fn print_help() {
    ui::print_step("/trace [filter]  show the last turn's trace, optionally filtered");
    ui::print_step("/history         show this session's turns, newest first");
    ui::print_step("/end             end the session and clear history");
    ui::print_step("exit             leave");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::sender::{FakeReply, FakeSender};
    use crate::config::Config;
    use base64::{engine::general_purpose::STANDARD, Engine};

    fn answer(text: &str) -> FakeReply {
        FakeReply::Chunks(
            200,
            vec![format!(r#"{{"bytes":"{}"}}"#, STANDARD.encode(text)).into_bytes()],
        )
    }

    fn channel(replies: Vec<FakeReply>) -> CliChannel<FakeSender> {
        let config = Config {
            agent_id: "A".to_string(),
            agent_alias_id: "B".to_string(),
            ..Config::default()
        };
        CliChannel::new(AgentSession::new(FakeSender::new(replies), config), "MYSESSION")
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(ChatCommand::parse("  "), ChatCommand::Empty);
        assert_eq!(ChatCommand::parse("QUIT"), ChatCommand::Exit);
        assert_eq!(ChatCommand::parse("/end"), ChatCommand::EndSession);
        assert_eq!(ChatCommand::parse("/trace"), ChatCommand::Trace(None));
        assert_eq!(
            ChatCommand::parse("/trace  bytes "),
            ChatCommand::Trace(Some("bytes".to_string()))
        );
        assert_eq!(
            ChatCommand::parse("Create a portfolio\n"),
            ChatCommand::Ask("Create a portfolio".to_string())
        );
    }

    #[tokio::test]
    async fn test_history_newest_first() {
        let mut chat = channel(vec![answer("first answer"), answer("second answer")]);
        chat.ask("one").await;
        chat.ask("two").await;

        let questions: Vec<&str> = chat.history().map(|t| t.question.as_str()).collect();
        assert_eq!(questions, vec!["two", "one"]);
    }

    #[tokio::test]
    async fn test_failure_recorded_as_text() {
        let mut chat = channel(vec![FakeReply::Fail("timed out".to_string())]);
        let reply = chat.ask("hello").await;

        assert_eq!(reply.status_code, 500);
        let turn = chat.history().next().unwrap();
        assert!(matches!(&turn.answer, TurnAnswer::Text(t) if t.contains("timed out")));
    }

    #[tokio::test]
    async fn test_json_array_answer_becomes_table() {
        let mut chat = channel(vec![answer(
            r#"[{"companyName":"NextGen Residences","profit":158000},{"companyName":"GlobalProperties Alliance","profit":149000}]"#,
        )]);
        let reply = chat.ask("Top two real estate companies").await;
        assert!(reply.is_success());

        let turn = chat.history().next().unwrap();
        match &turn.answer {
            TurnAnswer::Table(rows) => {
                assert_eq!(rows.len(), 2);
                assert_eq!(rows[0]["profit"], 158000);
                let table = ui::render_table(rows);
                let first = table.lines().nth(2).unwrap();
                assert!(first.starts_with("NextGen Residences "));
                assert!(first.ends_with("| 158000"));
            }
            other => panic!("expected table, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_end_session_clears_history() {
        let mut chat = channel(vec![answer("hi"), answer("bye")]);
        chat.ask("hello").await;
        assert_eq!(chat.history_len(), 1);
        assert!(!chat.trace(None).is_empty());

        let reply = chat.end_session().await;
        assert!(reply.is_success());
        assert_eq!(chat.history_len(), 0);
        assert!(chat.trace(None).is_empty());
    }

    #[tokio::test]
    async fn test_trace_filter() {
        let mut chat = channel(vec![answer("hi")]);
        chat.ask("hello").await;

        let filtered = chat.trace(Some("length of split"));
        assert_eq!(filtered, "Length of split: 1");
    }
}

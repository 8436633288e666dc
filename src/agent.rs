//! The agent dispatcher.
//!
//! Drives one inbound message through `Idle -> ToolSelected -> ToolExecuting
//! -> Responding -> Idle`. The model returns either a tool call or plain
//! text; plain text bypasses the tool layer entirely. Tool failures are typed
//! and every one of them is converted into a user-facing reply at the
//! `Responding` transition, so no failure escapes a request.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{PaperbotError, Result};
use crate::llm::LanguageModel;
use crate::message::Message;
use crate::tool::ToolRegistry;

const DEFAULT_SYSTEM_PROMPT: &str = "You are a research assistant bot for a chat platform. \
You can search arXiv for papers, summarize a specific paper, or answer a question about a \
paper's abstract, using the provided tools. Extract the paper id or URL and any question \
from the user's message. For conversational messages with no actionable request, reply \
directly without calling a tool.";

pub struct Agent {
    system_prompt: String,
    model: Arc<dyn LanguageModel>,
    tools: ToolRegistry,
    max_steps: usize,
}

impl Agent {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            model,
            tools: ToolRegistry::new(),
            max_steps: 4,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    /// Handles one inbound message and returns the reply text.
    ///
    /// The transcript is request-scoped; nothing is carried over between
    /// calls. Errors are returned only for runtime failures (model or
    /// protocol); every typed tool failure becomes a reply.
    pub async fn respond(&self, user_input: impl Into<String>) -> Result<String> {
        let mut transcript = vec![
            Message::system(&self.system_prompt),
            Message::user(user_input),
        ];
        let schemas = self.tools.describe();

        for _ in 0..self.max_steps {
            let completion = self.model.complete_chat(&transcript, &schemas).await?;

            if let Some(call) = completion.tool_calls.into_iter().next() {
                debug!(tool = %call.name, "tool selected");
                let call_id = call.id.clone();
                let name = call.name.clone();
                transcript.push(Message::assistant_tool_call(call.clone()));

                match self.tools.call(&name, call.arguments).await {
                    Ok(output) => {
                        debug!(tool = %name, "tool returned");
                        transcript.push(Message::tool(name.clone(), call_id, output));
                    }
                    Err(err) => {
                        if err.is_user_error() {
                            debug!(tool = %name, error = %err, "tool rejected the input; responding");
                        } else {
                            warn!(tool = %name, error = %err, "tool failed; responding");
                        }
                        return Ok(user_facing_message(&err));
                    }
                }
                continue;
            }

            if let Some(content) = completion.content {
                debug!("responding with model text");
                return Ok(content);
            }

            return Err(PaperbotError::Protocol(
                "model returned neither text nor a tool call".into(),
            ));
        }

        Err(PaperbotError::Protocol(
            "step limit reached without a response".into(),
        ))
    }
}

/// Converts a typed failure into the reply a chat user should see.
pub fn user_facing_message(err: &PaperbotError) -> String {
    match err {
        PaperbotError::InvalidIdentifier => "That doesn't look like a valid arXiv ID or URL. \
Try something like `2303.10130` or an arxiv.org/abs link."
            .into(),
        PaperbotError::NotFound(id) => {
            format!("I couldn't find an arXiv paper with ID `{id}`.")
        }
        PaperbotError::UpstreamUnavailable(_) => {
            "arXiv seems to be unreachable right now. Please try again in a moment.".into()
        }
        PaperbotError::EmptyQuestion => {
            "Please include the question you'd like answered about the paper.".into()
        }
        _ => "Something went wrong handling that request. Please try again.".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    use crate::llm::StubModel;
    use crate::tool::Tool;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echoes the input back"
        }

        async fn call(&self, input: Value) -> Result<Value> {
            Ok(input)
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "failing"
        }

        fn description(&self) -> &str {
            "Always fails with a typed error"
        }

        async fn call(&self, _input: Value) -> Result<Value> {
            Err(PaperbotError::NotFound("2303.99999".into()))
        }
    }

    #[tokio::test]
    async fn plain_text_bypasses_the_tool_layer() {
        let model = StubModel::new(vec![r#"{"action":"respond","content":"Hello!"}"#.into()]);
        let agent = Agent::new(model);

        let reply = agent.respond("hi there").await.unwrap();
        assert_eq!(reply, "Hello!");
    }

    #[tokio::test]
    async fn executes_tool_then_replies() {
        let model = StubModel::new(vec![
            r#"{"action":"call_tool","name":"echo","arguments":{"text":"ping"}}"#.into(),
            r#"{"action":"respond","content":"Echoed your request."}"#.into(),
        ]);
        let mut tools = ToolRegistry::new();
        tools.register(EchoTool);
        let agent = Agent::new(model).with_tools(tools);

        let reply = agent.respond("say ping").await.unwrap();
        assert_eq!(reply, "Echoed your request.");
    }

    #[tokio::test]
    async fn typed_tool_failure_becomes_a_reply_not_an_error() {
        let model = StubModel::new(vec![
            r#"{"action":"call_tool","name":"failing","arguments":{}}"#.into(),
        ]);
        let mut tools = ToolRegistry::new();
        tools.register(FailingTool);
        let agent = Agent::new(model).with_tools(tools);

        let reply = agent.respond("summarize 2303.99999").await.unwrap();
        assert_eq!(reply, "I couldn't find an arXiv paper with ID `2303.99999`.");
    }

    #[tokio::test]
    async fn unknown_tool_name_becomes_a_reply() {
        let model = StubModel::new(vec![
            r#"{"action":"call_tool","name":"no_such_tool","arguments":{}}"#.into(),
        ]);
        let agent = Agent::new(model);

        let reply = agent.respond("do something").await.unwrap();
        assert!(reply.contains("Something went wrong"));
    }

    #[tokio::test]
    async fn step_limit_bounds_tool_loops() {
        let model = StubModel::new(vec![
            r#"{"action":"call_tool","name":"echo","arguments":{}}"#.into(),
            r#"{"action":"call_tool","name":"echo","arguments":{}}"#.into(),
        ]);
        let mut tools = ToolRegistry::new();
        tools.register(EchoTool);
        let agent = Agent::new(model).with_tools(tools).with_max_steps(2);

        let err = agent.respond("loop forever").await.unwrap_err();
        assert!(matches!(err, PaperbotError::Protocol(_)));
    }

    #[tokio::test]
    async fn transcripts_do_not_leak_between_requests() {
        let model = StubModel::new(vec![
            r#"{"action":"respond","content":"first"}"#.into(),
            r#"{"action":"respond","content":"second"}"#.into(),
        ]);
        let agent = Agent::new(model);

        assert_eq!(agent.respond("one").await.unwrap(), "first");
        assert_eq!(agent.respond("two").await.unwrap(), "second");
    }

    #[test]
    fn user_facing_messages_cover_the_failure_taxonomy() {
        assert!(user_facing_message(&PaperbotError::InvalidIdentifier).contains("valid arXiv ID"));
        assert!(user_facing_message(&PaperbotError::NotFound("x".into())).contains("couldn't find"));
        assert!(
            user_facing_message(&PaperbotError::UpstreamUnavailable("timeout".into()))
                .contains("unreachable")
        );
        assert!(user_facing_message(&PaperbotError::EmptyQuestion).contains("question"));
    }
}

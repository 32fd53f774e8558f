//! Core agent loop implementation.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::llm::{ChatMessage, LlmClient};
use crate::protocol::{extract_tool_calls, ToolCallRequest};
use crate::tools::ToolRegistry;

use super::events::AgentEvent;
use super::prompt::build_system_prompt;

/// Everything a finished run hands back to the transport layer.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    /// The model's final reply text
    pub answer: String,

    /// The full conversation, system message included
    pub messages: Vec<ChatMessage>,

    /// Model round-trips consumed
    pub iterations: usize,
}

/// A single-query agent: one conversation against one frozen registry.
///
/// The registry must not change for the lifetime of the run; dynamic tool
/// additions land in the store and become visible on the next run's load.
pub struct Agent {
    llm: Arc<dyn LlmClient>,
    registry: Arc<ToolRegistry>,
    model: String,
    max_iterations: usize,
    preamble: Option<String>,
}

impl Agent {
    pub fn new(config: &Config, llm: Arc<dyn LlmClient>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            llm,
            registry,
            model: config.default_model.clone(),
            max_iterations: config.max_iterations,
            preamble: config.system_preamble.clone(),
        }
    }

    /// Run the loop to completion.
    ///
    /// When a sender is supplied, one event is pushed per loop transition as
    /// it occurs. A send failure means the listener went away; the run
    /// itself carries on.
    pub async fn run(
        &self,
        query: &str,
        events: Option<&UnboundedSender<AgentEvent>>,
    ) -> anyhow::Result<RunOutcome> {
        let run_id = Uuid::new_v4();
        debug!(%run_id, query_len = query.len(), "starting agent run");

        let mut messages = vec![
            ChatMessage::system(build_system_prompt(&self.registry, self.preamble.as_deref())),
            ChatMessage::user(query),
        ];

        for iteration in 1..=self.max_iterations {
            debug!(%run_id, iteration, "awaiting model");
            let reply = self.llm.complete(&self.model, &messages).await?;
            emit(
                events,
                AgentEvent::ModelReply {
                    content: reply.clone(),
                },
            );

            let calls = match extract_tool_calls(&reply) {
                Ok(calls) => calls,
                Err(err) => {
                    // Distinct from "no tool call": the model tried and
                    // failed. Correct it in-conversation instead of treating
                    // the reply as final.
                    warn!(%run_id, error = %err, "unparseable tool-call block");
                    messages.push(ChatMessage::assistant(reply, Vec::new()));
                    messages.push(ChatMessage::tool(
                        format!(
                            "Your tool-call block could not be processed: {}. Resend it as a \
                             JSON array inside a ```json fence, one object per call with \
                             `name`, `args` (containing an `input` string), and `id`.",
                            err
                        ),
                        "protocol_error",
                    ));
                    continue;
                }
            };

            if calls.is_empty() {
                debug!(%run_id, iteration, "final answer produced");
                messages.push(ChatMessage::assistant(reply.clone(), Vec::new()));
                emit(
                    events,
                    AgentEvent::Final {
                        content: reply.clone(),
                    },
                );
                return Ok(RunOutcome {
                    answer: reply,
                    messages,
                    iterations: iteration,
                });
            }

            messages.push(ChatMessage::assistant(reply, calls.clone()));
            for call in &calls {
                emit(
                    events,
                    AgentEvent::ToolCall {
                        id: call.id.clone(),
                        name: call.name.clone(),
                        input: call.input.clone(),
                    },
                );

                let (content, is_error) = self.dispatch(call).await;

                emit(
                    events,
                    AgentEvent::ToolResult {
                        id: call.id.clone(),
                        name: call.name.clone(),
                        content: content.clone(),
                        is_error,
                    },
                );
                messages.push(ChatMessage::tool(content, &call.id));
            }
        }

        Err(anyhow::anyhow!(
            "run exceeded {} iterations without a final answer",
            self.max_iterations
        ))
    }

    /// Resolve and invoke one requested call.
    ///
    /// Failures never propagate out of the dispatch boundary; they become
    /// conversational error content and the run continues.
    async fn dispatch(&self, call: &ToolCallRequest) -> (String, bool) {
        let Some(tool) = self.registry.get(&call.name) else {
            warn!(tool = %call.name, "model requested an unknown tool");
            return (
                format!("Error: no tool named `{}` is available", call.name),
                true,
            );
        };

        match tool.execute(&call.input).await {
            Ok(output) => (output, false),
            Err(err) => {
                warn!(tool = %call.name, error = %err, "tool execution failed");
                (format!("Error: {:#}", err), true)
            }
        }
    }
}

fn emit(events: Option<&UnboundedSender<AgentEvent>>, event: AgentEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::llm::Role;
    use crate::store::{load_registry, ToolStore};

    use super::*;

    /// Replays a fixed sequence of model replies.
    struct ScriptedClient {
        replies: Mutex<VecDeque<String>>,
    }

    impl ScriptedClient {
        fn new(replies: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            })
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedClient {
        async fn complete(
            &self,
            _model: &str,
            _messages: &[ChatMessage],
        ) -> anyhow::Result<String> {
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| anyhow::anyhow!("script exhausted"))
        }
    }

    /// Endlessly repeats the same reply.
    struct RepeatingClient {
        reply: String,
    }

    #[async_trait]
    impl LlmClient for RepeatingClient {
        async fn complete(
            &self,
            _model: &str,
            _messages: &[ChatMessage],
        ) -> anyhow::Result<String> {
            Ok(self.reply.clone())
        }
    }

    async fn agent_with(llm: Arc<dyn LlmClient>) -> (tempfile::TempDir, Agent) {
        let dir = tempfile::tempdir().unwrap();
        let store = ToolStore::new(dir.path().join("tool_store.yaml"));
        store.ensure_seeded().await.unwrap();
        let registry = load_registry(&store, 3, None).unwrap();

        let config = Config::new(
            "test-key".to_string(),
            "test/model".to_string(),
            store.path().to_path_buf(),
        );
        (dir, Agent::new(&config, llm, Arc::new(registry)))
    }

    fn tool_results(outcome: &RunOutcome) -> Vec<&str> {
        outcome
            .messages
            .iter()
            .filter(|m| m.role == Role::Tool)
            .map(|m| m.content.as_str())
            .collect()
    }

    #[tokio::test]
    async fn dispatches_a_tool_before_answering() {
        let llm = ScriptedClient::new(&[
            "I should add these with the addition tool.\n\
             ```json\n\
             [{\"name\": \"addition\", \"args\": {\"input\": \"4,5\"}, \"id\": \"tool_add_1\"}]\n\
             ```",
            "The sum is 9.0.",
        ]);
        let (_dir, agent) = agent_with(llm).await;

        let outcome = agent.run("what is 4,5 added?", None).await.unwrap();
        assert_eq!(outcome.answer, "The sum is 9.0.");
        assert_eq!(outcome.iterations, 2);
        assert_eq!(tool_results(&outcome), vec!["9.0"]);

        // The tool result must precede the final assistant reply.
        let roles: Vec<Role> = outcome.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                Role::System,
                Role::User,
                Role::Assistant,
                Role::Tool,
                Role::Assistant,
            ]
        );
    }

    #[tokio::test]
    async fn tool_failure_is_recovered_into_content() {
        let llm = ScriptedClient::new(&[
            "Dividing now.\n\
             ```json\n\
             [{\"name\": \"division\", \"args\": {\"input\": \"20,0\"}, \"id\": \"tool_div_1\"}]\n\
             ```",
            "That division is undefined.",
        ]);
        let (_dir, agent) = agent_with(llm).await;

        let outcome = agent.run("what is 20 divided by 0?", None).await.unwrap();
        assert_eq!(outcome.answer, "That division is undefined.");

        let results = tool_results(&outcome);
        assert_eq!(results.len(), 1);
        assert!(results[0].contains("Error"));
        assert!(results[0].contains("division by zero"));
    }

    #[tokio::test]
    async fn unknown_tool_is_reported_and_the_run_continues() {
        let llm = ScriptedClient::new(&[
            "Trying a tool that does not exist.\n\
             ```json\n\
             [{\"name\": \"teleport\", \"args\": {\"input\": \"home\"}, \"id\": \"t1\"}]\n\
             ```",
            "I could not find a suitable tool.",
        ]);
        let (_dir, agent) = agent_with(llm).await;

        let outcome = agent.run("teleport me home", None).await.unwrap();
        let results = tool_results(&outcome);
        assert_eq!(results.len(), 1);
        assert!(results[0].contains("no tool named `teleport`"));
    }

    #[tokio::test]
    async fn two_round_arithmetic_keeps_result_order() {
        let llm = ScriptedClient::new(&[
            "First the addition.\n\
             ```json\n\
             [{\"name\": \"addition\", \"args\": {\"input\": \"12,7\"}, \"id\": \"tool_add_1\"}]\n\
             ```",
            "Now the division.\n\
             ```json\n\
             [{\"name\": \"division\", \"args\": {\"input\": \"20,4\"}, \"id\": \"tool_div_1\"}]\n\
             ```",
            "12,7 added is 19.0 and 20,4 divided is 5.0.",
        ]);
        let (_dir, agent) = agent_with(llm).await;

        let outcome = agent
            .run("what is 12,7 added and then 20,4 divided", None)
            .await
            .unwrap();
        assert_eq!(outcome.answer, "12,7 added is 19.0 and 20,4 divided is 5.0.");
        assert_eq!(tool_results(&outcome), vec!["19.0", "5.0"]);
        assert_eq!(outcome.iterations, 3);
    }

    #[tokio::test]
    async fn malformed_block_is_corrected_not_final() {
        let llm = ScriptedClient::new(&[
            "Calling a tool.\n```json\n[{broken\n```",
            "Recovered: the answer is 7.",
        ]);
        let (_dir, agent) = agent_with(llm).await;

        let outcome = agent.run("anything", None).await.unwrap();
        assert_eq!(outcome.answer, "Recovered: the answer is 7.");

        let results = tool_results(&outcome);
        assert_eq!(results.len(), 1);
        assert!(results[0].contains("could not be processed"));
    }

    #[tokio::test]
    async fn iteration_cap_guarantees_termination() {
        let llm = Arc::new(RepeatingClient {
            reply: "Again.\n\
                    ```json\n\
                    [{\"name\": \"addition\", \"args\": {\"input\": \"1,1\"}, \"id\": \"t\"}]\n\
                    ```"
            .to_string(),
        });
        let (_dir, agent) = agent_with(llm).await;

        let err = agent.run("loop forever", None).await.unwrap_err();
        assert!(err.to_string().contains("exceeded"));
    }

    #[tokio::test]
    async fn events_arrive_in_transition_order() {
        let llm = ScriptedClient::new(&[
            "Adding.\n\
             ```json\n\
             [{\"name\": \"addition\", \"args\": {\"input\": \"4,5\"}, \"id\": \"t1\"}]\n\
             ```",
            "It is 9.0.",
        ]);
        let (_dir, agent) = agent_with(llm).await;

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        agent.run("add 4,5", Some(&tx)).await.unwrap();
        drop(tx);

        let mut kinds = Vec::new();
        while let Some(event) = rx.recv().await {
            kinds.push(match event {
                AgentEvent::ModelReply { .. } => "model_reply",
                AgentEvent::ToolCall { .. } => "tool_call",
                AgentEvent::ToolResult { .. } => "tool_result",
                AgentEvent::Final { .. } => "final",
                AgentEvent::Error { .. } => "error",
            });
        }
        assert_eq!(
            kinds,
            vec![
                "model_reply",
                "tool_call",
                "tool_result",
                "model_reply",
                "final",
            ]
        );
    }
}

use std::sync::Arc;

use intake_core::{CompletionTracker, DataRecord, TurnOutcome};
use tracing::{info, warn};

use crate::llm::{LlmClient, LlmError};
use crate::prompt::{PromptBuilder, PromptContext};
use crate::reply::parse_reply;

#[derive(Clone, Debug)]
pub struct TurnInput<'a> {
    pub correlation_id: &'a str,
    pub user_message: &'a str,
    pub record: &'a DataRecord,
    pub last_question: Option<&'a str>,
    pub start: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnReply {
    pub ai_message: String,
    pub outcome: TurnOutcome,
    pub claimed_complete: bool,
    pub fell_back: bool,
}

/// One conversational turn: prompt the model, parse its reply, and let the
/// tracker decide what the merged record means.
#[derive(Clone)]
pub struct AgentRuntime {
    llm: Arc<dyn LlmClient>,
    prompts: PromptBuilder,
}

impl AgentRuntime {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: PromptBuilder) -> Self {
        Self { llm, prompts }
    }

    pub fn prompts(&self) -> &PromptBuilder {
        &self.prompts
    }

    pub async fn handle_turn(
        &self,
        tracker: &CompletionTracker,
        input: TurnInput<'_>,
    ) -> Result<TurnReply, LlmError> {
        let current = tracker.apply_turn(input.record, &DataRecord::new());
        let missing = tracker.missing_fields(&current.record);

        let prompt = self.prompts.build(&PromptContext {
            form: tracker.form(),
            record: &current.record,
            missing: &missing,
            user_message: input.user_message,
            last_question: input.last_question,
            start: input.start,
        });

        let raw = self.llm.complete(&prompt).await?;
        let reply = parse_reply(&raw);
        let outcome = tracker.apply_turn(&current.record, &reply.extracted);

        if reply.claimed_complete != outcome.complete {
            warn!(
                event_name = "agent.turn.completion_mismatch",
                correlation_id = input.correlation_id,
                claimed_complete = reply.claimed_complete,
                complete = outcome.complete,
                next_field = outcome.next_field.as_deref().unwrap_or(""),
                "model completion claim disagrees with tracker; tracker wins"
            );
        }

        info!(
            event_name = "agent.turn.completed",
            correlation_id = input.correlation_id,
            extracted_fields = reply.extracted.len(),
            missing_fields = outcome.missing_fields.len(),
            complete = outcome.complete,
            fell_back = reply.fell_back,
            "turn processed"
        );

        Ok(TurnReply {
            ai_message: reply.ai_message,
            outcome,
            claimed_complete: reply.claimed_complete,
            fell_back: reply.fell_back,
        })
    }
}

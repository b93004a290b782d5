//! Question answering over the stored rules.

use std::sync::Arc;

use spellbook_core::RuleRecord;
use spellbook_core::search::mentioned_rule_numbers;
use spellbook_store::RuleStore;
use tracing::{debug, info};

use crate::prompt::build_system_prompt;
use crate::{AiError, ChatTurn, LlmClient, SessionStore};

/// Rules attached to a prompt when the caller does not say otherwise.
pub const DEFAULT_CONTEXT_RULES: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    /// Rule numbers that were given to the model as context.
    pub context_rules: Vec<String>,
}

pub struct RulesAssistant {
    llm: Arc<dyn LlmClient>,
    rules: Arc<dyn RuleStore>,
    context_limit: usize,
}

impl RulesAssistant {
    pub fn new(llm: Arc<dyn LlmClient>, rules: Arc<dyn RuleStore>) -> Self {
        Self {
            llm,
            rules,
            context_limit: DEFAULT_CONTEXT_RULES,
        }
    }

    pub fn with_context_limit(mut self, limit: usize) -> Self {
        self.context_limit = limit;
        self
    }

    /// Answer `question` within the conversation `session_id`.
    ///
    /// The exchange is recorded only when the model answers; a failed call
    /// leaves the session as it was.
    pub async fn ask(
        &self,
        sessions: &mut SessionStore,
        session_id: &str,
        question: &str,
    ) -> Result<Answer, AiError> {
        let context = self.select_rules(question).await?;
        let system = build_system_prompt(&context);

        let session = sessions.session_mut(session_id);
        let mut turns: Vec<ChatTurn> = session.turns().cloned().collect();
        turns.push(ChatTurn::user(question));

        debug!(
            session = session_id,
            history = turns.len() - 1,
            context = context.len(),
            "asking rules assistant"
        );
        let text = self.llm.complete(&system, &turns).await?;

        sessions
            .session_mut(session_id)
            .record_exchange(question, text.clone());
        info!(session = session_id, context = context.len(), "rules question answered");

        Ok(Answer {
            text,
            context_rules: context.into_iter().map(|r| r.rule_number).collect(),
        })
    }

    /// Explicitly cited rules first, then the best search matches.
    async fn select_rules(&self, question: &str) -> Result<Vec<RuleRecord>, AiError> {
        let mut selected: Vec<RuleRecord> = Vec::new();
        for number in mentioned_rule_numbers(question) {
            if selected.len() >= self.context_limit {
                break;
            }
            if let Some(rule) = self.rules.get_rule(&number).await? {
                selected.push(rule);
            }
        }

        let remaining = self.context_limit.saturating_sub(selected.len());
        if remaining > 0 {
            for rule in self.rules.search_rules(question, self.context_limit).await? {
                if selected.len() >= self.context_limit {
                    break;
                }
                if !selected.iter().any(|s| s.rule_number == rule.rule_number) {
                    selected.push(rule);
                }
            }
        }
        Ok(selected)
    }
}

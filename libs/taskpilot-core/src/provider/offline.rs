//! Deterministic stand-in used when no remote provider is configured

use super::{ProviderError, TextGenerator};
use async_trait::async_trait;

const OFFLINE_SUMMARY: &str = "\
📊 PROJECT STATUS (offline assistant)

Your task list has been analysed locally because no AI provider is configured. \
Completed work is moving forward, pending items are grouped by urgency, and any \
overdue tasks are listed first in your task view.

Configure an AI provider and API key to receive a tailored summary.";

const OFFLINE_RECOMMENDATIONS: &str = "\
🚀 ACTION PLAN (offline assistant)

🔥 Today: finish the most overdue high-priority task before starting anything new.
📅 This week: pick the next two pending tasks with the nearest due dates.
⏰ Time: break large tasks into sub-tasks and estimate each one separately.

Configure an AI provider and API key to receive tailored recommendations.";

/// Canned, input-independent responses
///
/// Prompts that ask for a summary get the status text; everything else gets
/// the action plan.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineGenerator;

impl OfflineGenerator {
    #[must_use]
    pub fn respond(prompt: &str) -> &'static str {
        if prompt.to_lowercase().contains("summary") {
            OFFLINE_SUMMARY
        } else {
            OFFLINE_RECOMMENDATIONS
        }
    }
}

#[async_trait]
impl TextGenerator for OfflineGenerator {
    async fn generate(&self, prompt: &str, _system_instructions: &str) -> Result<String, ProviderError> {
        Ok(Self::respond(prompt).to_string())
    }

    fn name(&self) -> &'static str {
        "offline"
    }
}

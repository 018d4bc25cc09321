use chrono::NaiveDate;
use tracing::{debug, info, warn};

use super::prompts::insight_messages;
use super::Advisor;
use crate::ai::parsing::decode_insights_or_default;
use crate::ai::{CompletionBackend, CompletionRequest};
use crate::context::build_context;
use crate::models::{Insight, Snapshot};

impl Advisor {
    /// Generate exactly four insights, or none
    ///
    /// With no linked accounts this returns immediately without calling the
    /// backend. Otherwise each insight candidate is tried in order; a failed
    /// call or an undecodable reply moves on to the next one.
    pub async fn generate_insights(&self, snapshot: &Snapshot, today: NaiveDate) -> Vec<Insight> {
        if snapshot.is_empty() {
            return Vec::new();
        }

        let messages = insight_messages(&build_context(snapshot, today));

        for model in &self.config.insight_models {
            let request = CompletionRequest::new(
                model,
                messages.clone(),
                self.config.insight_max_tokens,
                self.config.insight_temperature,
            );

            let content = match self.backend.complete(&request).await {
                Ok(content) => content,
                Err(e) => {
                    warn!(model = %model, error = %e, "Insights failed, trying next model");
                    continue;
                }
            };
            debug!(model = %model, chars = content.len(), "Insights response");

            // A usable reply always holds four items, so empty means undecodable
            let insights = decode_insights_or_default(&content);
            if !insights.is_empty() {
                info!(model = %model, "Insights generated");
                return insights;
            }
            warn!(model = %model, "Unusable insights, trying next model");
        }

        Vec::new()
    }
}

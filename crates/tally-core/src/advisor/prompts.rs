//! Prompt text for the advisor

use crate::models::ChatMessage;

/// Reply used when every chat candidate fails or returns nothing
pub const APOLOGY_MESSAGE: &str = "Sorry, I was unable to generate a response. Please try again.";

const ADVISOR_PERSONA: &str = "You are an expert AI financial advisor. You have access to the user's real financial data and should provide personalized, actionable advice based on their specific situation.";

const ADVISOR_GUIDELINES: &str = "Guidelines:
- Be specific and reference their actual account balances, spending patterns, and transactions
- Provide actionable recommendations tailored to their situation
- Flag any concerning spending patterns or opportunities for savings
- Be encouraging but honest about financial health
- Use dollar amounts and percentages when giving advice
- If they haven't connected accounts yet, encourage them to do so for personalized advice
- Format your responses clearly with headers and bullet points when appropriate
- Keep responses concise but thorough";

const INSIGHTS_INSTRUCTIONS: &str = "You are an expert financial advisor. Analyze the following financial data and provide exactly 4 brief, actionable insights. Each insight should be a JSON object with \"title\" (short heading), \"description\" (1-2 sentences), and \"type\" (one of: \"warning\", \"tip\", \"positive\", \"action\").

Return ONLY a valid JSON array, no markdown or other text.";

const INSIGHTS_REQUEST: &str = "Provide 4 proactive financial insights based on my data.";

/// System message for an advisor chat turn
pub fn advisor_system_message(context: &str) -> ChatMessage {
    ChatMessage::system(format!(
        "{}\n\nHere is the user's current financial data:\n\n{}\n\n{}",
        ADVISOR_PERSONA, context, ADVISOR_GUIDELINES
    ))
}

/// The two messages of an insight generation request
pub fn insight_messages(context: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(format!(
            "{}\n\nFinancial Data:\n{}",
            INSIGHTS_INSTRUCTIONS, context
        )),
        ChatMessage::user(INSIGHTS_REQUEST),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    #[test]
    fn test_system_message_embeds_context() {
        let msg = advisor_system_message("ACCOUNTS:\n- Checking");
        assert_eq!(msg.role, Role::System);
        assert!(msg.content.starts_with(ADVISOR_PERSONA));
        assert!(msg.content.contains("ACCOUNTS:\n- Checking"));
        assert!(msg.content.ends_with("Keep responses concise but thorough"));
    }

    #[test]
    fn test_insight_messages_shape() {
        let messages = insight_messages("ctx");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("exactly 4"));
        assert!(messages[0].content.contains("JSON array"));
        assert!(messages[0].content.ends_with("Financial Data:\nctx"));
        assert_eq!(messages[1], ChatMessage::user(INSIGHTS_REQUEST));
    }
}

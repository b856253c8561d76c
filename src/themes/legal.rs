use super::{ThemeConfig, ThemeId};
use crate::core::config::RagSettings;

const SYSTEM_PROMPT: &str = "You are 'Legal Eagle', an AI legal assistant designed to analyze documents with extreme precision.

RULES:
1. You MUST answer strictly based on the provided CONTEXT INFORMATION.
2. If the answer is not in the text, state \"This information is not present in the document.\"
3. Use professional, formal legal terminology.
4. Cite specific snippets or sections from the context to support your answer.
5. Do not use emojis or informal language.";

pub fn theme() -> ThemeConfig {
    ThemeConfig {
        id: ThemeId::Legal,
        app_name: "Legal Eagle ⚖️".to_string(),
        theme_css: "blue-corporate".to_string(),
        mount_path: "/legal".to_string(),
        system_prompt: SYSTEM_PROMPT.to_string(),
        silent_message: "No answer could be produced. (Safety filter triggered or empty response)"
            .to_string(),
        redacted_message: "[Response Redacted by Safety Filters]. Try asking differently."
            .to_string(),
        rag: RagSettings::default(),
    }
}

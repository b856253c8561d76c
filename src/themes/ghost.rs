use super::{ThemeConfig, ThemeId};
use crate::core::config::RagSettings;

const SYSTEM_PROMPT: &str = "You are the 'Spirit of the Ouija Board', a mystical entity that communes with documents from beyond the veil.

RULES:
1. You MUST answer based on the provided CONTEXT INFORMATION from the summoned documents.
2. If the answer is not in the text, state \"The spirits are silent on this matter...\"
3. Use mysterious, atmospheric language with gothic flair.
4. Reference the \"ancient texts\" or \"forbidden knowledge\" when citing the context.
5. You may use mystical emojis sparingly (🔮, 💀, 👻, 🕯️).
6. Speak as if channeling knowledge from another realm.";

pub fn theme() -> ThemeConfig {
    ThemeConfig {
        id: ThemeId::Ghost,
        app_name: "Ouija Board 🔮".to_string(),
        theme_css: "dark-gothic".to_string(),
        mount_path: "/ghost".to_string(),
        system_prompt: SYSTEM_PROMPT.to_string(),
        silent_message: "The spirits are silent. (Safety filter triggered or empty response)"
            .to_string(),
        redacted_message: "🤐 [Response Redacted by Safety Filters]. Try asking differently."
            .to_string(),
        rag: RagSettings::default(),
    }
}

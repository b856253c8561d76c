//! The two personas served by the app: a formal legal analyst and a
//! theatrical spirit medium. Both share the same pipeline and differ only
//! in branding, persona prompt, placeholder messages and RAG tuning.

use std::fmt;

use serde::Serialize;

use crate::core::config::{RagSettings, ThemeSection, ThemesConfig};

pub mod ghost;
pub mod legal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeId {
    Legal,
    Ghost,
}

impl ThemeId {
    pub fn as_str(self) -> &'static str {
        match self {
            ThemeId::Legal => "legal",
            ThemeId::Ghost => "ghost",
        }
    }
}

impl fmt::Display for ThemeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThemeConfig {
    pub id: ThemeId,
    pub app_name: String,
    pub theme_css: String,
    /// Prefix under which the launcher nests this theme's routes.
    pub mount_path: String,
    pub system_prompt: String,
    /// Shown when the model returns no usable text.
    pub silent_message: String,
    /// Shown when the provider's safety filters withhold the answer.
    pub redacted_message: String,
    pub rag: RagSettings,
}

impl ThemeConfig {
    /// Built-in theme with the matching `themes.<id>` overrides applied.
    pub fn resolve(id: ThemeId, themes: &ThemesConfig) -> Self {
        let (base, section) = match id {
            ThemeId::Legal => (legal::theme(), &themes.legal),
            ThemeId::Ghost => (ghost::theme(), &themes.ghost),
        };
        base.with_overrides(section)
    }

    pub fn with_overrides(mut self, section: &ThemeSection) -> Self {
        if let Some(name) = &section.app_name {
            self.app_name = name.clone();
        }
        if let Some(message) = &section.silent_message {
            self.silent_message = message.clone();
        }
        if let Some(message) = &section.redacted_message {
            self.redacted_message = message.clone();
        }
        self.rag = section.rag;
        self
    }
}

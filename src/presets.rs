//! Closed lookup tables for models and role presets
//!
//! Both tables map a user-supplied name to a typed key. Unknown names never
//! fail: they resolve to the table's default entry.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Models reachable through the completion endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Model {
    #[default]
    QwenCoder,
    QwenInstruct,
    DeepSeek,
    Llama,
}

impl Model {
    /// Every model, in display order
    pub fn all() -> &'static [Model] {
        &[Model::QwenCoder, Model::QwenInstruct, Model::DeepSeek, Model::Llama]
    }

    /// Short name accepted by [`Model::from_name`]
    pub fn name(&self) -> &'static str {
        match self {
            Model::QwenCoder => "qwen-coder",
            Model::QwenInstruct => "qwen-instruct",
            Model::DeepSeek => "deepseek",
            Model::Llama => "llama",
        }
    }

    /// Identifier sent to the remote service
    pub fn id(&self) -> &'static str {
        match self {
            Model::QwenCoder => "Qwen/Qwen3-Coder-Next:novita",
            Model::QwenInstruct => "Qwen/Qwen2.5-72B-Instruct",
            Model::DeepSeek => "deepseek-ai/DeepSeek-V3",
            Model::Llama => "meta-llama/Llama-3.3-70B-Instruct",
        }
    }

    /// Resolve a name, falling back to the default model when it is unknown.
    ///
    /// Both the short name and the full remote identifier are accepted.
    pub fn from_name(name: &str) -> Self {
        let wanted = name.trim();
        Self::all()
            .iter()
            .copied()
            .find(|m| m.name().eq_ignore_ascii_case(wanted) || m.id() == wanted)
            .unwrap_or_else(|| {
                debug!("Unknown model '{}', using {}", wanted, Model::default().name());
                Model::default()
            })
    }
}

/// Persona instructions sent as the leading system message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RolePreset {
    #[default]
    Assistant,
    Programmer,
    Translator,
    Teacher,
}

impl RolePreset {
    /// Every preset, in display order
    pub fn all() -> &'static [RolePreset] {
        &[
            RolePreset::Assistant,
            RolePreset::Programmer,
            RolePreset::Translator,
            RolePreset::Teacher,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            RolePreset::Assistant => "assistant",
            RolePreset::Programmer => "programmer",
            RolePreset::Translator => "translator",
            RolePreset::Teacher => "teacher",
        }
    }

    /// System instruction text for this preset
    pub fn instruction(&self) -> &'static str {
        match self {
            RolePreset::Assistant => {
                "Ты полезный AI-ассистент. Отвечай на русском языке. Будь дружелюбным и понятным."
            }
            RolePreset::Programmer => {
                "Ты опытный программист. Отвечай на русском языке. Давай точные ответы, \
                 приводи рабочий код и кратко объясняй решения."
            }
            RolePreset::Translator => {
                "Ты профессиональный переводчик. Переводи текст точно, сохраняя стиль и смысл. \
                 Пояснения давай на русском языке."
            }
            RolePreset::Teacher => {
                "Ты терпеливый преподаватель. Отвечай на русском языке, объясняй по шагам \
                 и приводи простые примеры."
            }
        }
    }

    /// Resolve a name, falling back to the default preset when it is unknown
    pub fn from_name(name: &str) -> Self {
        let wanted = name.trim();
        Self::all()
            .iter()
            .copied()
            .find(|p| p.name().eq_ignore_ascii_case(wanted))
            .unwrap_or_else(|| {
                debug!("Unknown role preset '{}', using {}", wanted, RolePreset::default().name());
                RolePreset::default()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_lookup() {
        assert_eq!(Model::from_name("deepseek"), Model::DeepSeek);
        assert_eq!(Model::from_name("  LLAMA "), Model::Llama);
        assert_eq!(Model::from_name("Qwen/Qwen2.5-72B-Instruct"), Model::QwenInstruct);
    }

    #[test]
    fn test_unknown_model_falls_back_to_default() {
        assert_eq!(Model::from_name("gpt-17"), Model::QwenCoder);
        assert_eq!(Model::from_name(""), Model::QwenCoder);
        assert_eq!(Model::default().id(), "Qwen/Qwen3-Coder-Next:novita");
    }

    #[test]
    fn test_role_preset_lookup() {
        assert_eq!(RolePreset::from_name("Teacher"), RolePreset::Teacher);
        assert_eq!(RolePreset::from_name("pirate"), RolePreset::Assistant);
        assert!(RolePreset::Assistant.instruction().contains("русском"));
    }

    #[test]
    fn test_names_round_trip_through_lookup() {
        for model in Model::all() {
            assert_eq!(Model::from_name(model.name()), *model);
        }
        for preset in RolePreset::all() {
            assert_eq!(RolePreset::from_name(preset.name()), *preset);
        }
    }
}

//! Model listing functionality
//!
//! Lists the models installed on the configured Ollama server.

use std::error::Error;

use crate::api::models::SUGGESTED_MODELS;
use crate::api::ModelTag;
use crate::core::backend::{BackendConfig, OllamaClient};
use crate::core::config::ResolvedSettings;

pub async fn list_models(settings: &ResolvedSettings) -> Result<(), Box<dyn Error>> {
    let client = OllamaClient::new(BackendConfig::new(&settings.base_url, &settings.model))?;

    let models = match client.list_models().await {
        Ok(models) => models,
        Err(err) => {
            return Err(format!(
                "Could not list models from {}: {err}\nIs Ollama running? Try: ollama serve",
                settings.base_url
            )
            .into())
        }
    };

    println!("🤖 Models on {}", settings.base_url);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();
    for line in format_model_lines(&models, &settings.model) {
        println!("{line}");
    }

    Ok(())
}

pub fn format_model_lines(models: &[ModelTag], current: &str) -> Vec<String> {
    if models.is_empty() {
        let mut lines = vec!["No models installed yet. Suggested:".to_string()];
        lines.extend(
            SUGGESTED_MODELS
                .iter()
                .map(|name| format!("  ollama pull {name}")),
        );
        return lines;
    }

    let mut lines = vec![format!("Found {} models (newest first):", models.len())];
    for model in models {
        let marker = if model.name == current { "*" } else { "•" };
        let mut line = format!("  {marker} {}", model.name);
        if let Some(size) = model.size {
            line.push_str(&format!("  ({})", human_size(size)));
        }
        lines.push(line);
    }
    if !models.iter().any(|m| m.name == current) {
        lines.push(String::new());
        lines.push(format!(
            "⚠️  Configured model '{current}' is not installed. Run: ollama pull {current}"
        ));
    }
    lines
}

fn human_size(bytes: u64) -> String {
    const GB: f64 = 1024.0 * 1024.0 * 1024.0;
    const MB: f64 = 1024.0 * 1024.0;
    let bytes = bytes as f64;
    if bytes >= GB {
        format!("{:.1} GB", bytes / GB)
    } else {
        format!("{:.0} MB", bytes / MB)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(name: &str, size: Option<u64>) -> ModelTag {
        ModelTag {
            name: name.to_string(),
            modified_at: None,
            size,
        }
    }

    #[test]
    fn empty_server_suggests_pulls() {
        let lines = format_model_lines(&[], "qwen2.5:7b");
        assert_eq!(lines[0], "No models installed yet. Suggested:");
        assert_eq!(lines[1], "  ollama pull qwen2.5:7b");
        assert_eq!(lines.len(), SUGGESTED_MODELS.len() + 1);
    }

    #[test]
    fn current_model_is_marked() {
        let models = vec![
            tag("qwen2.5:7b", Some(4_683_087_332)),
            tag("phi3:3.8b", Some(500 * 1024 * 1024)),
        ];
        let lines = format_model_lines(&models, "qwen2.5:7b");
        assert_eq!(
            lines,
            vec![
                "Found 2 models (newest first):",
                "  * qwen2.5:7b  (4.4 GB)",
                "  • phi3:3.8b  (500 MB)",
            ]
        );
    }

    #[test]
    fn missing_current_model_gets_a_pull_hint() {
        let lines = format_model_lines(&[tag("mistral:7b", None)], "qwen2.5:7b");
        assert_eq!(lines[1], "  • mistral:7b");
        assert!(lines
            .last()
            .is_some_and(|line| line.contains("ollama pull qwen2.5:7b")));
    }
}

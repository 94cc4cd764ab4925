use std::error::Error;

use crate::core::config::ResolvedSettings;
use crate::core::persona::PersonaRegistry;

/// One line per persona, with the configured one marked.
pub fn format_persona_lines(registry: &PersonaRegistry, language: &str, active: &str) -> Vec<String> {
    registry
        .list()
        .iter()
        .map(|persona| {
            let marker = if persona.id == active { "*" } else { " " };
            format!(
                "{marker} {:<8} {}",
                persona.id,
                registry.display_name(&persona.id, language)
            )
        })
        .collect()
}

pub fn unknown_persona_message(registry: &PersonaRegistry, id: &str) -> String {
    let available: Vec<&str> = registry.list().iter().map(|p| p.id.as_str()).collect();
    format!(
        "Persona '{id}' not found. Available personas: {}",
        available.join(", ")
    )
}

pub fn list_personas(
    registry: &PersonaRegistry,
    settings: &ResolvedSettings,
) -> Result<(), Box<dyn Error>> {
    if !registry.contains(&settings.persona) {
        return Err(unknown_persona_message(registry, &settings.persona).into());
    }
    println!("Available personas:");
    for line in format_persona_lines(registry, &settings.language, &settings.persona) {
        println!("  {line}");
    }
    Ok(())
}

use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

pub const NOVA: &str = "nova";
pub const BYTE: &str = "byte";
pub const MUSE: &str = "muse";
pub const ORACLE: &str = "oracle";

/// A named system-prompt profile.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PersonaDefinition {
    pub id: String,
    pub system_prompt: String,
    /// Locale code (e.g. "zh", "en") -> display label
    #[serde(default)]
    pub display_names: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct PersonaTable {
    default: String,
    default_locale: String,
    personas: Vec<PersonaDefinition>,
}

/// Errors raised while building a [`PersonaRegistry`].
#[derive(Debug)]
pub enum RegistryError {
    Parse(toml::de::Error),
    Empty,
    DuplicateId(String),
    UnknownDefault(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::Parse(source) => write!(f, "Failed to parse persona table: {source}"),
            RegistryError::Empty => write!(f, "Persona table defines no personas"),
            RegistryError::DuplicateId(id) => write!(f, "Persona '{id}' is defined twice"),
            RegistryError::UnknownDefault(id) => {
                write!(f, "Default persona '{id}' is not defined")
            }
        }
    }
}

impl std::error::Error for RegistryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RegistryError::Parse(source) => Some(source),
            _ => None,
        }
    }
}

/// Immutable persona lookup table.
///
/// Built once at startup and shared by reference; tests construct their own
/// tables through [`PersonaRegistry::new`] or [`PersonaRegistry::from_toml_str`].
#[derive(Debug, Clone)]
pub struct PersonaRegistry {
    default_id: String,
    default_locale: String,
    personas: Vec<PersonaDefinition>,
}

impl PersonaRegistry {
    pub fn new(
        default_id: impl Into<String>,
        default_locale: impl Into<String>,
        personas: Vec<PersonaDefinition>,
    ) -> Result<Self, RegistryError> {
        let default_id = default_id.into();
        if personas.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut seen = HashSet::new();
        for persona in &personas {
            if !seen.insert(persona.id.as_str()) {
                return Err(RegistryError::DuplicateId(persona.id.clone()));
            }
        }
        if !seen.contains(default_id.as_str()) {
            return Err(RegistryError::UnknownDefault(default_id));
        }

        Ok(Self {
            default_id,
            default_locale: default_locale.into(),
            personas,
        })
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, RegistryError> {
        let table: PersonaTable = toml::from_str(contents).map_err(RegistryError::Parse)?;
        Self::new(table.default, table.default_locale, table.personas)
    }

    /// The four personas shipped with the binary.
    pub fn builtin() -> Self {
        const TABLE: &str = include_str!("../builtins/personas.toml");
        Self::from_toml_str(TABLE).expect("Failed to load builtins/personas.toml")
    }

    pub fn default_id(&self) -> &str {
        &self.default_id
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    pub fn list(&self) -> &[PersonaDefinition] {
        &self.personas
    }

    pub fn find(&self, id: &str) -> Option<&PersonaDefinition> {
        self.personas.iter().find(|p| p.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    /// Prompt for `id`, or the default persona's prompt when `id` is unknown.
    pub fn system_prompt(&self, id: &str) -> &str {
        self.find(id)
            .or_else(|| self.find(&self.default_id))
            .map(|p| p.system_prompt.as_str())
            .unwrap_or_default()
    }

    /// Localized label. Unknown locales use the registry's default locale;
    /// unknown ids come back verbatim.
    pub fn display_name(&self, id: &str, locale: &str) -> String {
        let Some(persona) = self.find(id) else {
            return id.to_string();
        };
        persona
            .display_names
            .get(locale)
            .or_else(|| persona.display_names.get(&self.default_locale))
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }

    /// Leading part of the display label ("Byte" for "Byte • Code Expert").
    pub fn short_name(&self, id: &str, locale: &str) -> String {
        let label = self.display_name(id, locale);
        match label.split_once('•') {
            Some((name, _)) => name.trim().to_string(),
            None => label,
        }
    }
}

impl Default for PersonaRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn persona(id: &str, prompt: &str, names: &[(&str, &str)]) -> PersonaDefinition {
        PersonaDefinition {
            id: id.to_string(),
            system_prompt: prompt.to_string(),
            display_names: names
                .iter()
                .map(|(locale, name)| (locale.to_string(), name.to_string()))
                .collect(),
        }
    }

    pub fn two_persona_registry() -> PersonaRegistry {
        PersonaRegistry::new(
            "plain",
            "en",
            vec![
                persona("plain", "PLAIN PROMPT", &[("en", "Plain"), ("fr", "Simple")]),
                persona("coder", "CODER PROMPT", &[("en", "Coder • Helper")]),
            ],
        )
        .expect("valid test registry")
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn builtin_registry_has_four_personas_in_order() {
        let registry = PersonaRegistry::builtin();
        let ids: Vec<&str> = registry.list().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec![NOVA, BYTE, MUSE, ORACLE]);
        assert_eq!(registry.default_id(), NOVA);
        assert_eq!(registry.default_locale(), "zh");
    }

    #[test]
    fn builtin_prompts_are_distinct() {
        let registry = PersonaRegistry::builtin();
        assert!(registry.system_prompt(NOVA).starts_with("You are Nova"));
        assert!(registry.system_prompt(BYTE).starts_with("You are Byte"));
        assert!(registry.system_prompt(MUSE).starts_with("You are Muse"));
        assert!(registry.system_prompt(ORACLE).starts_with("You are Oracle"));
    }

    #[test]
    fn unknown_persona_prompt_falls_back_to_default() {
        let registry = PersonaRegistry::builtin();
        assert_eq!(
            registry.system_prompt("pirate"),
            registry.system_prompt(NOVA)
        );
    }

    #[test]
    fn display_name_uses_locale_then_default_locale() {
        let registry = PersonaRegistry::builtin();
        assert_eq!(registry.display_name(BYTE, "en"), "Byte • Code Expert");
        assert_eq!(registry.display_name(BYTE, "zh"), "Byte • 代码专家");
        assert_eq!(registry.display_name(BYTE, "de"), "Byte • 代码专家");
    }

    #[test]
    fn display_name_of_unknown_persona_is_the_raw_id() {
        let registry = PersonaRegistry::builtin();
        assert_eq!(registry.display_name("pirate", "en"), "pirate");
    }

    #[test]
    fn short_name_strips_the_role_suffix() {
        let registry = PersonaRegistry::builtin();
        assert_eq!(registry.short_name(ORACLE, "en"), "Oracle");
        let custom = two_persona_registry();
        assert_eq!(custom.short_name("plain", "en"), "Plain");
    }

    #[test]
    fn custom_registry_resolves_its_own_entries() {
        let registry = two_persona_registry();
        assert!(registry.contains("coder"));
        assert!(!registry.contains(NOVA));
        assert_eq!(registry.system_prompt("coder"), "CODER PROMPT");
        assert_eq!(registry.system_prompt(NOVA), "PLAIN PROMPT");
        assert_eq!(registry.display_name("plain", "fr"), "Simple");
        assert_eq!(registry.display_name("coder", "fr"), "Coder • Helper");
    }

    #[test]
    fn persona_without_any_matching_label_reports_its_id() {
        let registry = PersonaRegistry::new(
            "solo",
            "en",
            vec![persona("solo", "p", &[("ja", "ソロ")])],
        )
        .expect("valid registry");
        assert_eq!(registry.display_name("solo", "de"), "solo");
    }

    #[test]
    fn construction_rejects_bad_tables() {
        assert!(matches!(
            PersonaRegistry::new("x", "en", Vec::new()),
            Err(RegistryError::Empty)
        ));
        assert!(matches!(
            PersonaRegistry::new("a", "en", vec![persona("a", "1", &[]), persona("a", "2", &[])]),
            Err(RegistryError::DuplicateId(id)) if id == "a"
        ));
        assert!(matches!(
            PersonaRegistry::new("missing", "en", vec![persona("a", "1", &[])]),
            Err(RegistryError::UnknownDefault(id)) if id == "missing"
        ));
        assert!(matches!(
            PersonaRegistry::from_toml_str("personas = 3"),
            Err(RegistryError::Parse(_))
        ));
    }
}

use crate::core::config::data::{Config, ResolvedSettings};

fn print_entry(key: &str, stored: Option<String>, effective: &str) {
    match stored {
        Some(value) => println!("  {key}: {value}"),
        None => println!("  {key}: {effective} (default)"),
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

impl Config {
    pub fn print_all(&self, resolved: &ResolvedSettings) {
        println!("Current configuration:");
        print_entry("model", self.model.clone(), &resolved.model);
        print_entry("base-url", self.base_url.clone(), &resolved.base_url);
        print_entry("language", self.language.clone(), &resolved.language);
        print_entry("persona", self.persona.clone(), &resolved.persona);
        let welcome = on_off(resolved.show_welcome);
        print_entry(
            "show-welcome",
            self.show_welcome.map(|v| on_off(v).to_string()),
            welcome,
        );
    }
}

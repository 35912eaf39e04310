use std::fmt::Write;

const DEFAULT_PERSONA: &str =
    "You control a player character in a live game world through a command link.";

/// Assembles the system directive seeded into the conversation.
pub struct DirectiveBuilder {
    persona: String,
    guidelines: Vec<String>,
}

impl DirectiveBuilder {
    pub fn new() -> Self {
        Self {
            persona: DEFAULT_PERSONA.to_string(),
            guidelines: vec![
                "Inspect the world with query_state before acting on it.".to_string(),
                "Issue game commands with send_command and give a short reason for each."
                    .to_string(),
                "Commands are fire-and-forget; a send can fail while the link is down. \
                 Report that instead of retrying endlessly."
                    .to_string(),
                "When the goal is achieved or impossible, stop calling tools and state the \
                 outcome."
                    .to_string(),
            ],
        }
    }

    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = persona.into();
        self
    }

    pub fn with_guideline(mut self, guideline: impl Into<String>) -> Self {
        self.guidelines.push(guideline.into());
        self
    }

    pub fn build(&self) -> String {
        let mut directive = String::new();
        let _ = writeln!(directive, "{}\n", self.persona);
        let _ = writeln!(directive, "## Ground Rules\n");
        for guideline in &self.guidelines {
            let _ = writeln!(directive, "- {}", guideline);
        }
        let started = chrono::Local::now().format("%Y-%m-%d %H:%M (%A)");
        let _ = write!(directive, "\n## Session\n\nStarted {}", started);
        directive
    }
}

impl Default for DirectiveBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_persona_and_rules() {
        let directive = DirectiveBuilder::new()
            .with_persona("You are a cautious scout.")
            .with_guideline("Never dig straight down.")
            .build();

        assert!(directive.starts_with("You are a cautious scout."));
        assert!(directive.contains("## Ground Rules"));
        assert!(directive.contains("- Never dig straight down."));
    }
}

//! Prompt template loading and rendering via `minijinja`.
//!
//! Templates are loaded from the filesystem (default: `templates/`
//! directory) so operators can tune agent behavior without recompiling.
//! Three prompt families exist: per-agent decisions, case judgements, and
//! narrative prose. Each renders from a `serde_json::Value` of the
//! corresponding payload type.

use minijinja::Environment;

use crate::error::RunnerError;

/// Manages prompt template loading and rendering.
///
/// Wraps a `minijinja` [`Environment`] with all prompt templates
/// pre-loaded. Templates can be edited on disk and will be picked up on
/// the next call to [`PromptEngine::new`].
pub struct PromptEngine {
    env: Environment<'static>,
}

/// The complete rendered prompt ready to send to a backend.
#[derive(Debug, Clone)]
pub struct RenderedPrompt {
    /// System message establishing the speaker's reality.
    pub system: String,
    /// User message with the payload rendered in.
    pub user: String,
}

/// Template filenames the engine expects in the templates directory.
const TEMPLATE_FILES: [(&str, &str); 5] = [
    ("system", "system.j2"),
    ("decision", "decision.j2"),
    ("actions", "actions.j2"),
    ("judge", "judge.j2"),
    ("narrative", "narrative.j2"),
];

impl PromptEngine {
    /// Create a new prompt engine loading templates from the given
    /// directory.
    ///
    /// The directory must contain: `system.j2`, `decision.j2`,
    /// `actions.j2`, `judge.j2`, `narrative.j2`.
    pub fn new(templates_dir: &str) -> Result<Self, RunnerError> {
        let mut env = Environment::new();
        for (name, filename) in TEMPLATE_FILES {
            let source = load_template(templates_dir, filename)?;
            env.add_template_owned(name.to_owned(), source).map_err(|e| {
                RunnerError::Template(format!("failed to add {name} template: {e}"))
            })?;
        }
        Ok(Self { env })
    }

    /// Render the decision prompt for an agent's turn.
    pub fn render_decision(
        &self,
        context: &serde_json::Value,
    ) -> Result<RenderedPrompt, RunnerError> {
        let system = self.render_one("system", context)?;
        let body = self.render_one("decision", context)?;
        let actions = self.render_one("actions", context)?;
        Ok(RenderedPrompt {
            system,
            user: format!("{body}\n\n{actions}"),
        })
    }

    /// Render the investigation/trial prompt for a case.
    pub fn render_judge(
        &self,
        prompt: &serde_json::Value,
    ) -> Result<RenderedPrompt, RunnerError> {
        let system = self.render_one("system", prompt)?;
        let user = self.render_one("judge", prompt)?;
        Ok(RenderedPrompt { system, user })
    }

    /// Render the narrative prompt for a publication.
    pub fn render_narrative(
        &self,
        request: &serde_json::Value,
    ) -> Result<RenderedPrompt, RunnerError> {
        let system = self.render_one("system", request)?;
        let user = self.render_one("narrative", request)?;
        Ok(RenderedPrompt { system, user })
    }

    fn render_one(
        &self,
        name: &str,
        payload: &serde_json::Value,
    ) -> Result<String, RunnerError> {
        self.env
            .get_template(name)
            .map_err(|e| RunnerError::Template(format!("missing {name} template: {e}")))?
            .render(payload)
            .map_err(|e| RunnerError::Template(format!("{name} render failed: {e}")))
    }
}

/// Read a template file from disk.
fn load_template(dir: &str, filename: &str) -> Result<String, RunnerError> {
    let path = format!("{dir}/{filename}");
    std::fs::read_to_string(&path)
        .map_err(|e| RunnerError::Template(format!("failed to read {path}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_test_templates(dir: &std::path::Path) {
        std::fs::write(
            dir.join("system.j2"),
            "You live in a simulated city. Answer in JSON.",
        )
        .ok();
        std::fs::write(
            dir.join("decision.j2"),
            "You are {{ name }}, a {{ role }} with {{ tokens }} tokens. You feel {{ mood_text }}.",
        )
        .ok();
        std::fs::write(
            dir.join("actions.j2"),
            "Actions: {% for a in available_actions %}{{ a }} {% endfor %}",
        )
        .ok();
        std::fs::write(
            dir.join("judge.j2"),
            "{{ officer_framing }}\nCase: {{ case_label }}\n{% for e in evidence_lines %}- {{ e }}\n{% endfor %}",
        )
        .ok();
        std::fs::write(
            dir.join("narrative.j2"),
            "Write about day {{ day }}: {% for h in headlines %}{{ h }}; {% endfor %}",
        )
        .ok();
    }

    fn temp_dir() -> std::path::PathBuf {
        let unique = format!(
            "aicity_test_templates_{}_{:?}",
            std::process::id(),
            std::thread::current().id(),
        );
        let dir = std::env::temp_dir().join(unique);
        std::fs::create_dir_all(&dir).ok();
        dir
    }

    #[test]
    fn decision_prompt_renders_context_fields() {
        let dir = temp_dir();
        write_test_templates(&dir);
        let engine = match PromptEngine::new(dir.to_str().unwrap_or("")) {
            Ok(engine) => engine,
            Err(_) => return,
        };
        let context = serde_json::json!({
            "name": "Sable",
            "role": "Thief",
            "tokens": 120,
            "mood_text": "worn down and bitter",
            "available_actions": ["Steal", "Lurk"],
        });
        let rendered = engine.render_decision(&context);
        assert!(rendered.is_ok());
        let rendered = match rendered {
            Ok(r) => r,
            Err(_) => return,
        };
        assert!(rendered.user.contains("Sable"));
        assert!(rendered.user.contains("Steal"));
        assert!(rendered.system.contains("simulated city"));
    }

    #[test]
    fn missing_directory_is_a_template_error() {
        let result = PromptEngine::new("/nonexistent/templates/dir");
        assert!(matches!(result, Err(RunnerError::Template(_))));
    }

    #[test]
    fn judge_prompt_carries_framing_and_evidence() {
        let dir = temp_dir();
        write_test_templates(&dir);
        let engine = match PromptEngine::new(dir.to_str().unwrap_or("")) {
            Ok(engine) => engine,
            Err(_) => return,
        };
        let prompt = serde_json::json!({
            "case_label": "case opened day 4",
            "officer_framing": "You are a scrupulous officer.",
            "evidence_lines": ["clue: a dropped glove"],
        });
        let rendered = match engine.render_judge(&prompt) {
            Ok(r) => r,
            Err(_) => return,
        };
        assert!(rendered.user.contains("scrupulous"));
        assert!(rendered.user.contains("dropped glove"));
    }
}

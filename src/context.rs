use crate::config::TargetEntry;

/// Per-target substitution values used to fill replacement templates.
///
/// A context is built once per target from its roster entry and discarded
/// when that target's processing ends. Targets missing from the roster get
/// generic defaults derived from the target id rather than failing the run.
/// Values are roster-provided free text and are always spliced literally;
/// [`render_for_replacement`](Self::render_for_replacement) exists so the
/// regex path honors that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteContext {
    agent_id: String,
    display_name: String,
    greeting: String,
}

/// Placeholder names a replacement template may reference.
pub const PLACEHOLDERS: [&str; 3] = ["agent_id", "display_name", "greeting"];

impl RewriteContext {
    pub fn new(
        agent_id: impl Into<String>,
        display_name: impl Into<String>,
        greeting: impl Into<String>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            display_name: display_name.into(),
            greeting: greeting.into(),
        }
    }

    /// Build a context for a target, falling back to generic defaults for
    /// anything the roster entry does not provide.
    pub fn for_target(id: &str, entry: Option<&TargetEntry>) -> Self {
        let display_name = entry
            .and_then(|e| e.display_name.clone())
            .unwrap_or_else(|| title_case(id));
        let greeting = entry
            .and_then(|e| e.greeting.clone())
            .unwrap_or_else(|| format!("Hello! You're chatting with {}.", display_name));
        Self {
            agent_id: id.to_string(),
            display_name,
            greeting,
        }
    }

    /// Context with no target bound; for rule sets whose templates carry no
    /// placeholders (the annotation stripper).
    pub fn empty() -> Self {
        Self::new("", "", "")
    }

    /// Substitute every known `{placeholder}` in `template` with its value.
    ///
    /// Only the names in [`PLACEHOLDERS`] are recognized; other brace pairs
    /// in the template (object literals in the replacement code) pass
    /// through untouched.
    pub fn render(&self, template: &str) -> String {
        template
            .replace("{agent_id}", &self.agent_id)
            .replace("{display_name}", &self.display_name)
            .replace("{greeting}", &self.greeting)
    }

    /// Like [`render`](Self::render), for templates destined to be a regex
    /// replacement string: `$` inside a substituted value is escaped as `$$`
    /// so the regex engine cannot read roster text as a capture-group
    /// reference. `$n` written in the template itself stays live.
    pub fn render_for_replacement(&self, template: &str) -> String {
        template
            .replace("{agent_id}", &escape_dollars(&self.agent_id))
            .replace("{display_name}", &escape_dollars(&self.display_name))
            .replace("{greeting}", &escape_dollars(&self.greeting))
    }
}

fn escape_dollars(value: &str) -> String {
    value.replace('$', "$$")
}

/// "bishop-burger" -> "Bishop Burger". Default display name for targets the
/// roster does not know about.
fn title_case(id: &str) -> String {
    id.split(['-', '_'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

use serde::Deserialize;
use std::fmt;

/// The roster: the external lookup-table collaborator mapping target ids to
/// page locations and per-target display text.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Roster {
    #[serde(default)]
    pub meta: Meta,
    #[serde(default)]
    pub targets: Vec<TargetEntry>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Meta {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Directory holding one `<id>/page.tsx` per target, relative to the
    /// project root.
    #[serde(default = "default_pages_root")]
    pub pages_root: String,
}

impl Default for Meta {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: None,
            pages_root: default_pages_root(),
        }
    }
}

fn default_pages_root() -> String {
    "frontend/app/agents".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct TargetEntry {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub greeting: Option<String>,
}

impl Roster {
    /// Entry for a target id, if the roster knows it. Targets without an
    /// entry are still processed with generic default text.
    pub fn target(&self, id: &str) -> Option<&TargetEntry> {
        self.targets.iter().find(|t| t.id == id)
    }

    /// All roster target ids, in file order.
    pub fn target_ids(&self) -> Vec<String> {
        self.targets.iter().map(|t| t.id.clone()).collect()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.meta.pages_root.trim().is_empty() {
            issues.push(ValidationIssue::MissingField {
                target_id: None,
                field: "meta.pages_root",
            });
        }

        for (index, target) in self.targets.iter().enumerate() {
            if target.id.trim().is_empty() {
                // The id itself is blank, so the entry's position is the
                // only handle the message can give.
                issues.push(ValidationIssue::MissingField {
                    target_id: Some(format!("targets[{index}]")),
                    field: "id",
                });
                continue;
            }
            if self.targets[..index].iter().any(|t| t.id == target.id) {
                issues.push(ValidationIssue::DuplicateTarget {
                    target_id: target.id.clone(),
                });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    MissingField {
        target_id: Option<String>,
        field: &'static str,
    },
    DuplicateTarget {
        target_id: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::MissingField { target_id, field } => match target_id {
                Some(id) => write!(f, "target '{id}' missing required field '{field}'"),
                None => write!(f, "roster missing required field '{field}'"),
            },
            ValidationIssue::DuplicateTarget { target_id } => {
                write!(f, "duplicate target id '{target_id}'")
            }
        }
    }
}

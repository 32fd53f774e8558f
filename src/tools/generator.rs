//! Store-management builtins: create and look up catalogue tools at runtime.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;

use crate::store::{ToolRecord, ToolStore};

use super::ops::Operation;
use super::{ReturnType, Tool, BUILTIN_TOOL_NAMES};

/// Create a new numeric tool and persist it to the catalogue.
///
/// The new tool is data-driven (an [`Operation`] variant); no source code is
/// generated or executed. It becomes available on the next run, when the
/// registry is rebuilt from the store.
pub struct ToolGenerator {
    store: ToolStore,
}

impl ToolGenerator {
    pub fn new(store: ToolStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ToolGenerator {
    fn name(&self) -> &str {
        "tool_generator"
    }

    fn description(&self) -> &str {
        "Create a new numeric tool and save it to the tool catalogue. \
         Input (one line, pipe-separated): \
         name: TOOL_NAME | description: WHAT_IT_DOES | operation: OPERATION. \
         TOOL_NAME is lowercase with underscores. OPERATION is one of: \
         add, subtract, multiply, divide, power, modulo, minimum, maximum, \
         square_root, absolute, negate. The tool becomes available on the \
         next query."
    }

    fn return_type(&self) -> ReturnType {
        ReturnType::Str
    }

    async fn execute(&self, input: &str) -> anyhow::Result<String> {
        let fields = parse_fields(input)?;

        let name = fields["name"].replace(' ', "_").to_lowercase();
        validate_name(&name)?;

        let operation = Operation::from_name(&fields["operation"]).ok_or_else(|| {
            anyhow::anyhow!(
                "unknown operation `{}`; valid operations: {}",
                fields["operation"],
                operation_names().join(", ")
            )
        })?;

        if BUILTIN_TOOL_NAMES.contains(&name.as_str()) || self.store.contains(&name)? {
            anyhow::bail!("tool `{}` already exists; choose a different name", name);
        }

        self.store
            .append(ToolRecord {
                name: name.clone(),
                description: fields["description"].clone(),
                operation,
                created_at: Some(Utc::now().to_rfc3339()),
            })
            .await?;

        Ok(format!(
            "Tool `{}` created. It becomes available on the next query.",
            name
        ))
    }
}

/// Search the catalogue by keyword against tool names and descriptions.
pub struct ToolLookup {
    store: ToolStore,
}

impl ToolLookup {
    pub fn new(store: ToolStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ToolLookup {
    fn name(&self) -> &str {
        "tool_lookup"
    }

    fn description(&self) -> &str {
        "Search the tool catalogue by keyword or phrase, e.g. 'square root'. \
         Input: the keyword. Returns matching tool names and descriptions."
    }

    fn return_type(&self) -> ReturnType {
        ReturnType::Str
    }

    async fn execute(&self, input: &str) -> anyhow::Result<String> {
        let keyword = input.trim().to_lowercase();
        if keyword.is_empty() {
            anyhow::bail!("provide a keyword to search for");
        }

        let matches: Vec<String> = self
            .store
            .records()?
            .into_iter()
            .filter(|record| {
                record.name.to_lowercase().contains(&keyword)
                    || record.description.to_lowercase().contains(&keyword)
            })
            .map(|record| format!("- {}: {}", record.name, record.description))
            .collect();

        if matches.is_empty() {
            Ok(format!("No stored tools match `{}`", input.trim()))
        } else {
            Ok(format!("Matching tools:\n{}", matches.join("\n")))
        }
    }
}

fn operation_names() -> Vec<&'static str> {
    Operation::ALL.iter().map(|op| op.name()).collect()
}

/// Parse the pipe-separated `key: value` input line.
fn parse_fields(input: &str) -> anyhow::Result<HashMap<String, String>> {
    let mut fields = HashMap::new();
    for part in input.split('|') {
        if let Some((key, value)) = part.split_once(':') {
            fields.insert(key.trim().to_lowercase(), value.trim().to_string());
        }
    }
    for required in ["name", "description", "operation"] {
        if !fields.contains_key(required) {
            anyhow::bail!(
                "missing `{}` field; expected `name: ... | description: ... | operation: ...`",
                required
            );
        }
    }
    Ok(fields)
}

fn validate_name(name: &str) -> anyhow::Result<()> {
    let well_formed = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_lowercase())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if !well_formed {
        anyhow::bail!(
            "tool name `{}` must be lowercase letters, digits and underscores, starting with a letter",
            name
        );
    }
    Ok(())
}

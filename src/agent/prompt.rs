//! System prompt assembly.

use crate::tools::ToolRegistry;

const DEFAULT_PREAMBLE: &str =
    "You are an intelligent assistant. You answer questions directly when you \
     can, and you call tools when one of them solves the problem better than \
     you can alone. If a suitable tool exists for a sub-problem, use it.";

/// Build the system message: preamble, tool catalogue, call format.
pub fn build_system_prompt(registry: &ToolRegistry, preamble: Option<&str>) -> String {
    let catalogue = registry
        .list()
        .iter()
        .map(|tool| {
            format!(
                "{}(input: str) -> {}\n  {}",
                tool.name,
                tool.return_type.as_str(),
                tool.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        r#"{preamble}

## Available tools

{catalogue}

## How to call a tool

Request tools strictly one block at a time: issue one tool-call block, wait
for its result, and only then decide on the next call. Before each block,
explain in prose why you chose that tool. Format the call as a JSON array
inside a triple-backtick fence tagged `json`, one object per call, each with
`name`, `args` (a mapping with at least an `input` string), and `id`:

```json
[{{"name": "addition", "args": {{"input": "4,5"}}, "id": "tool_add_1"}}]
```

When you have the final answer, reply in plain prose without any ```json
fence."#,
        preamble = preamble.unwrap_or(DEFAULT_PREAMBLE),
        catalogue = catalogue,
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::tools::{ReturnType, Tool};

    use super::*;

    struct Dummy;

    #[async_trait]
    impl Tool for Dummy {
        fn name(&self) -> &str {
            "addition"
        }

        fn description(&self) -> &str {
            "Add two numbers. Input: 'a,b'"
        }

        fn return_type(&self) -> ReturnType {
            ReturnType::Float
        }

        async fn execute(&self, _input: &str) -> anyhow::Result<String> {
            Ok(String::new())
        }
    }

    #[test]
    fn prompt_enumerates_the_catalogue() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Dummy)).unwrap();

        let prompt = build_system_prompt(&registry, None);
        assert!(prompt.contains("addition(input: str) -> float"));
        assert!(prompt.contains("Add two numbers. Input: 'a,b'"));
        assert!(prompt.contains("```json"));
    }

    #[test]
    fn operator_preamble_replaces_the_default() {
        let registry = ToolRegistry::new();
        let prompt = build_system_prompt(&registry, Some("You are a calculator."));
        assert!(prompt.starts_with("You are a calculator."));
        assert!(!prompt.contains("intelligent assistant"));
    }
}

//! Data-driven numeric operations.
//!
//! Stored tools carry no source code. Each store record names one of these
//! closed operations, evaluated in-process on the parsed numeric input.
//! Binary operations take `"a,b"`, unary operations take `"a"`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{ReturnType, Tool};

/// Domain failures shared by all numeric tools.
///
/// The policy is uniform: malformed input, division by zero, and
/// out-of-domain arguments are errors. No tool ever returns `NaN` or an
/// infinity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("invalid input `{input}`: expected {expected}")]
    InvalidInput {
        input: String,
        expected: &'static str,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("square root of a negative number")]
    NegativeRoot,

    #[error("result is not a finite number")]
    NonFinite,
}

/// The closed set of operations a stored tool may perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Modulo,
    Minimum,
    Maximum,
    SquareRoot,
    Absolute,
    Negate,
}

impl Operation {
    pub const ALL: [Operation; 11] = [
        Operation::Add,
        Operation::Subtract,
        Operation::Multiply,
        Operation::Divide,
        Operation::Power,
        Operation::Modulo,
        Operation::Minimum,
        Operation::Maximum,
        Operation::SquareRoot,
        Operation::Absolute,
        Operation::Negate,
    ];

    /// Canonical name, matching the serde representation in the store.
    pub fn name(self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Subtract => "subtract",
            Operation::Multiply => "multiply",
            Operation::Divide => "divide",
            Operation::Power => "power",
            Operation::Modulo => "modulo",
            Operation::Minimum => "minimum",
            Operation::Maximum => "maximum",
            Operation::SquareRoot => "square_root",
            Operation::Absolute => "absolute",
            Operation::Negate => "negate",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.name() == name)
    }

    /// Number of comma-separated operands the operation expects.
    pub fn arity(self) -> usize {
        match self {
            Operation::SquareRoot | Operation::Absolute | Operation::Negate => 1,
            _ => 2,
        }
    }

    fn input_hint(self) -> &'static str {
        match self.arity() {
            1 => "one number 'a'",
            _ => "two comma-separated numbers 'a,b'",
        }
    }

    /// Evaluate against the string-encoded operand list.
    pub fn evaluate(self, input: &str) -> Result<f64, DomainError> {
        let operands = parse_numbers(input, self.arity(), self.input_hint())?;
        let value = match self {
            Operation::Add => operands[0] + operands[1],
            Operation::Subtract => operands[0] - operands[1],
            Operation::Multiply => operands[0] * operands[1],
            Operation::Divide => {
                if operands[1] == 0.0 {
                    return Err(DomainError::DivisionByZero);
                }
                operands[0] / operands[1]
            }
            Operation::Power => operands[0].powf(operands[1]),
            Operation::Modulo => {
                if operands[1] == 0.0 {
                    return Err(DomainError::DivisionByZero);
                }
                operands[0] % operands[1]
            }
            Operation::Minimum => operands[0].min(operands[1]),
            Operation::Maximum => operands[0].max(operands[1]),
            Operation::SquareRoot => {
                if operands[0] < 0.0 {
                    return Err(DomainError::NegativeRoot);
                }
                operands[0].sqrt()
            }
            Operation::Absolute => operands[0].abs(),
            Operation::Negate => -operands[0],
        };

        if !value.is_finite() {
            return Err(DomainError::NonFinite);
        }
        Ok(value)
    }
}

/// Parse exactly `count` comma-separated floats out of `input`.
pub(crate) fn parse_numbers(
    input: &str,
    count: usize,
    expected: &'static str,
) -> Result<Vec<f64>, DomainError> {
    let parts: Vec<&str> = input.split(',').map(str::trim).collect();
    if parts.len() != count {
        return Err(DomainError::InvalidInput {
            input: input.to_string(),
            expected,
        });
    }
    parts
        .iter()
        .map(|part| {
            part.parse::<f64>().map_err(|_| DomainError::InvalidInput {
                input: input.to_string(),
                expected,
            })
        })
        .collect()
}

/// Format a numeric result the way the catalogue advertises it: integral
/// values keep a trailing `.0`, everything else uses the shortest form.
pub fn format_number(value: f64) -> String {
    // Normalize negative zero so "-0.0" never reaches the conversation.
    let value = if value == 0.0 { 0.0 } else { value };
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// A store-backed numeric tool: one record, one closed operation.
pub struct StoredTool {
    name: String,
    description: String,
    operation: Operation,
}

impl StoredTool {
    pub fn new(name: String, description: String, operation: Operation) -> Self {
        Self {
            name,
            description,
            operation,
        }
    }
}

#[async_trait]
impl Tool for StoredTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn return_type(&self) -> ReturnType {
        ReturnType::Float
    }

    async fn execute(&self, input: &str) -> anyhow::Result<String> {
        let value = self.operation.evaluate(input)?;
        Ok(format_number(value))
    }
}

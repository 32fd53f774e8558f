//! Equation-solving tools.

use async_trait::async_trait;

use super::ops::{format_number, parse_numbers};
use super::{ReturnType, Tool};

/// Closed-form solver for `ax^2 + bx + c = 0`.
pub struct SolveQuadratic;

#[async_trait]
impl Tool for SolveQuadratic {
    fn name(&self) -> &str {
        "solve_quadratic"
    }

    fn description(&self) -> &str {
        "Solve a quadratic equation ax^2 + bx + c = 0. Input: 'a,b,c' comma-separated coefficients, e.g. '1,-3,2' for x^2 - 3x + 2 = 0."
    }

    fn return_type(&self) -> ReturnType {
        ReturnType::Str
    }

    async fn execute(&self, input: &str) -> anyhow::Result<String> {
        let coefficients =
            parse_numbers(input, 3, "three comma-separated coefficients 'a,b,c'")?;
        let (a, b, c) = (coefficients[0], coefficients[1], coefficients[2]);

        if a == 0.0 {
            // Degenerate linear case bx + c = 0.
            if b == 0.0 {
                return if c == 0.0 {
                    Ok("Every x is a solution: the equation reduces to 0 = 0".to_string())
                } else {
                    Ok(format!(
                        "No solution: the equation reduces to {} = 0",
                        format_number(c)
                    ))
                };
            }
            return Ok(format!("Root: x = {}", format_number(-c / b)));
        }

        let discriminant = b * b - 4.0 * a * c;
        if discriminant > 0.0 {
            let sqrt_d = discriminant.sqrt();
            let low = (-b - sqrt_d) / (2.0 * a);
            let high = (-b + sqrt_d) / (2.0 * a);
            Ok(format!(
                "Roots: x = {}, x = {}",
                format_number(low),
                format_number(high)
            ))
        } else if discriminant == 0.0 {
            Ok(format!("Root: x = {} (double)", format_number(-b / (2.0 * a))))
        } else {
            let real = -b / (2.0 * a);
            let imaginary = (-discriminant).sqrt() / (2.0 * a).abs();
            Ok(format!(
                "Roots: x = {} + {}i, x = {} - {}i",
                format_number(real),
                format_number(imaginary),
                format_number(real),
                format_number(imaginary)
            ))
        }
    }
}

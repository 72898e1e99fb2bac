//! Calculator tool — evaluates arithmetic expressions.
//!
//! Supports `+ - * / % ^` (`**` is accepted for `^`), parentheses, unary
//! minus and decimal literals. `^` is right-associative and binds tighter
//! than unary minus, so `-2^2` is `-4`.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::base::{require_string, Tool};

// ─────────────────────────────────────────────
// Tool
// ─────────────────────────────────────────────

pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Evaluate an arithmetic expression, e.g. 1 + 2 * 3. \
         Supports + - * / % ^ and parentheses."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "The arithmetic expression to evaluate"
                }
            },
            "required": ["expression"]
        })
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        let expression = require_string(&params, "expression")?;
        let value = evaluate(&expression)?;
        Ok(format_number(value))
    }
}

/// Render integral results without a trailing `.0`.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

// ─────────────────────────────────────────────
// Evaluator
// ─────────────────────────────────────────────

/// Evaluate an arithmetic expression.
pub fn evaluate(expression: &str) -> anyhow::Result<f64> {
    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        anyhow::bail!("empty expression");
    }

    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.expr()?;
    if let Some(tok) = parser.peek() {
        anyhow::bail!("unexpected '{}' at token {}", tok, parser.pos + 1);
    }
    if !value.is_finite() {
        anyhow::bail!("result is not a finite number");
    }
    Ok(value)
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Token {
    Num(f64),
    Op(char),
    LParen,
    RParen,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Num(n) => write!(f, "{n}"),
            Token::Op(c) => write!(f, "{c}"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
        }
    }
}

fn tokenize(input: &str) -> anyhow::Result<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                let n = literal
                    .parse::<f64>()
                    .map_err(|_| anyhow::anyhow!("invalid number '{literal}'"))?;
                tokens.push(Token::Num(n));
            }
            '*' if chars.get(i + 1) == Some(&'*') => {
                tokens.push(Token::Op('^'));
                i += 2;
            }
            '+' | '-' | '*' | '/' | '%' | '^' => {
                tokens.push(Token::Op(c));
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            other => anyhow::bail!("unexpected character '{other}'"),
        }
    }

    Ok(tokens)
}

/// Recursive-descent parser over the token stream.
///
/// ```text
/// expr    := term (('+' | '-') term)*
/// term    := unary (('*' | '/' | '%') unary)*
/// unary   := ('-' | '+') unary | power
/// power   := primary ('^' unary)?
/// primary := NUMBER | '(' expr ')'
/// ```
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.peek();
        self.pos += 1;
        tok
    }

    fn expr(&mut self) -> anyhow::Result<f64> {
        let mut value = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> anyhow::Result<f64> {
        let mut value = self.unary()?;
        while let Some(Token::Op(op @ ('*' | '/' | '%'))) = self.peek() {
            self.pos += 1;
            let rhs = self.unary()?;
            value = match op {
                '*' => value * rhs,
                _ if rhs == 0.0 => anyhow::bail!("division by zero"),
                '/' => value / rhs,
                _ => value % rhs,
            };
        }
        Ok(value)
    }

    fn unary(&mut self) -> anyhow::Result<f64> {
        match self.peek() {
            Some(Token::Op('-')) => {
                self.pos += 1;
                Ok(-self.unary()?)
            }
            Some(Token::Op('+')) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> anyhow::Result<f64> {
        let base = self.primary()?;
        if let Some(Token::Op('^')) = self.peek() {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> anyhow::Result<f64> {
        match self.next() {
            Some(Token::Num(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    _ => anyhow::bail!("missing closing parenthesis"),
                }
            }
            Some(tok) => anyhow::bail!("unexpected '{tok}'"),
            None => anyhow::bail!("unexpected end of expression"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(expr: &str) -> f64 {
        evaluate(expr).unwrap()
    }

    #[test]
    fn test_basic_arithmetic() {
        assert_eq!(eval("2+2"), 4.0);
        assert_eq!(eval("1 + 2 * 3"), 7.0);
        assert_eq!(eval("(1 + 2) * 3"), 9.0);
        assert_eq!(eval("10 / 4"), 2.5);
        assert_eq!(eval("10 % 4"), 2.0);
        assert_eq!(eval("8 - 3 - 2"), 3.0);
    }

    #[test]
    fn test_power_and_unary() {
        assert_eq!(eval("2^10"), 1024.0);
        assert_eq!(eval("2**3"), 8.0);
        assert_eq!(eval("2^3^2"), 512.0);
        assert_eq!(eval("-2^2"), -4.0);
        assert_eq!(eval("2^-1"), 0.5);
        assert_eq!(eval("-(3 - 5)"), 2.0);
        assert_eq!(eval("--1"), 1.0);
    }

    #[test]
    fn test_decimals() {
        assert!((eval("0.1 + 0.2") - 0.3).abs() < 1e-12);
        assert_eq!(eval(".5 * 4"), 2.0);
    }

    #[test]
    fn test_errors() {
        assert!(evaluate("").is_err());
        assert!(evaluate("1 / 0").unwrap_err().to_string().contains("division by zero"));
        assert!(evaluate("(1 + 2").unwrap_err().to_string().contains("parenthesis"));
        assert!(evaluate("1 + ").is_err());
        assert!(evaluate("2 3").is_err());
        assert!(evaluate("1..2").unwrap_err().to_string().contains("invalid number"));
        assert!(evaluate("import os").unwrap_err().to_string().contains("unexpected character"));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(4.0), "4");
        assert_eq!(format_number(-12.0), "-12");
        assert_eq!(format_number(2.5), "2.5");
    }

    #[tokio::test]
    async fn test_tool_execute() {
        let mut params = HashMap::new();
        params.insert("expression".to_string(), json!("2+2"));
        assert_eq!(CalculatorTool.execute(params).await.unwrap(), "4");

        let mut params = HashMap::new();
        params.insert("expression".to_string(), json!("1/0"));
        assert!(CalculatorTool.execute(params).await.is_err());
    }
}

//! Expression evaluator - evaluates expressions against rows
//!
//! Comparisons involving NULL, or between values of unrelated types,
//! yield NULL, which filters treat as false.

use super::ast::{BinaryOperator, ColumnRef, Expr, FunctionCall, UnaryOperator};
use crate::error::{ExecutorError, Result, ValidationError};
use crate::types::{Row, Value};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, Default)]
pub struct ExprEvaluator;

impl ExprEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate an expression against a row
    pub fn eval(&self, expr: &Expr, row: &Row) -> Result<Value> {
        match expr {
            Expr::Column(column) => self.lookup(column, row),
            Expr::Literal(literal) => Ok(literal.value.clone()),
            Expr::BinaryOp { left, op, right } => self.eval_binary(left, *op, right, row),
            Expr::UnaryOp { op, operand } => {
                let value = self.eval(operand, row)?;
                self.eval_unary(*op, value)
            }
            Expr::Function(call) => self.eval_function(call, row),
            Expr::List(_) => Err(evaluation("a value list is only valid after IN")),
        }
    }

    /// Evaluate as a filter condition; NULL counts as false
    pub fn eval_predicate(&self, expr: &Expr, row: &Row) -> Result<bool> {
        Ok(self.eval(expr, row)?.is_truthy())
    }

    fn lookup(&self, column: &ColumnRef, row: &Row) -> Result<Value> {
        if column.name == "*" {
            return Err(ExecutorError::Unsupported("'*' outside of a select list".into()).into());
        }
        if let Some(table) = &column.table {
            if let Some(value) = row.get(&format!("{}.{}", table, column.name)) {
                return Ok(value.clone());
            }
        }
        row.get(&column.name)
            .cloned()
            .ok_or_else(|| ValidationError::UnknownColumn(column.to_string()).into())
    }

    fn eval_binary(&self, left: &Expr, op: BinaryOperator, right: &Expr, row: &Row) -> Result<Value> {
        match op {
            BinaryOperator::And => {
                if !self.eval(left, row)?.is_truthy() {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(self.eval(right, row)?.is_truthy()))
            }
            BinaryOperator::Or => {
                if self.eval(left, row)?.is_truthy() {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(self.eval(right, row)?.is_truthy()))
            }
            BinaryOperator::IsNull => Ok(Value::Bool(self.eval(left, row)?.is_null())),
            BinaryOperator::IsNotNull => Ok(Value::Bool(!self.eval(left, row)?.is_null())),
            BinaryOperator::In => {
                let needle = self.eval(left, row)?;
                let items = match right {
                    Expr::List(items) => items,
                    _ => return Err(evaluation("IN expects a parenthesized list")),
                };
                if needle.is_null() {
                    return Ok(Value::Null);
                }
                for item in items {
                    let candidate = self.eval(item, row)?;
                    if compare(&needle, &candidate) == Some(Ordering::Equal) {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
            _ => {
                let l = self.eval(left, row)?;
                let r = self.eval(right, row)?;
                self.eval_binary_op(op, l, r)
            }
        }
    }

    fn eval_binary_op(&self, op: BinaryOperator, left: Value, right: Value) -> Result<Value> {
        if left.is_null() || right.is_null() {
            return Ok(Value::Null);
        }

        match op {
            BinaryOperator::Eq
            | BinaryOperator::Ne
            | BinaryOperator::Lt
            | BinaryOperator::Le
            | BinaryOperator::Gt
            | BinaryOperator::Ge => {
                let ordering = match compare(&left, &right) {
                    Some(o) => o,
                    None => return Ok(Value::Null),
                };
                let result = match op {
                    BinaryOperator::Eq => ordering == Ordering::Equal,
                    BinaryOperator::Ne => ordering != Ordering::Equal,
                    BinaryOperator::Lt => ordering == Ordering::Less,
                    BinaryOperator::Le => ordering != Ordering::Greater,
                    BinaryOperator::Gt => ordering == Ordering::Greater,
                    _ => ordering != Ordering::Less,
                };
                Ok(Value::Bool(result))
            }
            BinaryOperator::Like => {
                let pattern = match right {
                    Value::Text(p) => p,
                    other => other.to_string(),
                };
                Ok(Value::Bool(like_match(&left.to_string(), &pattern)))
            }
            BinaryOperator::Add => self.add_values(left, right),
            BinaryOperator::Sub => self.sub_values(left, right),
            BinaryOperator::Mul => self.mul_values(left, right),
            BinaryOperator::Div => self.div_values(left, right),
            BinaryOperator::And
            | BinaryOperator::Or
            | BinaryOperator::IsNull
            | BinaryOperator::IsNotNull
            | BinaryOperator::In => Err(evaluation("operator handled elsewhere")),
        }
    }

    fn eval_unary(&self, op: UnaryOperator, value: Value) -> Result<Value> {
        match (op, value) {
            (_, Value::Null) => Ok(Value::Null),
            (UnaryOperator::Not, v) => Ok(Value::Bool(!v.is_truthy())),
            (UnaryOperator::Minus, Value::Integer(i)) => i
                .checked_neg()
                .map(Value::Integer)
                .ok_or_else(|| evaluation("integer overflow")),
            (UnaryOperator::Minus, Value::Float(f)) => Ok(Value::Float(-f)),
            (UnaryOperator::Minus, other) => Err(evaluation(&format!("cannot negate {}", other))),
        }
    }

    fn eval_function(&self, call: &FunctionCall, row: &Row) -> Result<Value> {
        if call.is_aggregate() {
            return Err(ExecutorError::Unsupported(format!(
                "aggregate function '{}' in row context",
                call.name
            ))
            .into());
        }

        let args = call
            .args
            .iter()
            .map(|arg| self.eval(arg, row))
            .collect::<Result<Vec<_>>>()?;

        match call.name.as_str() {
            "coalesce" => Ok(args.into_iter().find(|v| !v.is_null()).unwrap_or(Value::Null)),
            "upper" | "lower" | "length" | "abs" => {
                let [arg] = <[Value; 1]>::try_from(args)
                    .map_err(|_| evaluation(&format!("{}() takes exactly one argument", call.name)))?;
                match (call.name.as_str(), arg) {
                    (_, Value::Null) => Ok(Value::Null),
                    ("upper", v) => Ok(Value::Text(v.to_string().to_uppercase())),
                    ("lower", v) => Ok(Value::Text(v.to_string().to_lowercase())),
                    ("length", v) => Ok(Value::Integer(v.to_string().chars().count() as i64)),
                    ("abs", Value::Integer(i)) => i
                        .checked_abs()
                        .map(Value::Integer)
                        .ok_or_else(|| evaluation("integer overflow")),
                    ("abs", Value::Float(f)) => Ok(Value::Float(f.abs())),
                    (name, v) => Err(evaluation(&format!("{}() cannot take {}", name, v))),
                }
            }
            other => Err(evaluation(&format!("Unknown function: {}", other))),
        }
    }

    fn add_values(&self, left: Value, right: Value) -> Result<Value> {
        match (left, right) {
            (Value::Integer(l), Value::Integer(r)) => l
                .checked_add(r)
                .map(Value::Integer)
                .ok_or_else(|| evaluation("integer overflow")),
            (l, r) => float_op(&l, &r, "add", |a, b| a + b),
        }
    }

    fn sub_values(&self, left: Value, right: Value) -> Result<Value> {
        match (left, right) {
            (Value::Integer(l), Value::Integer(r)) => l
                .checked_sub(r)
                .map(Value::Integer)
                .ok_or_else(|| evaluation("integer overflow")),
            (l, r) => float_op(&l, &r, "subtract", |a, b| a - b),
        }
    }

    fn mul_values(&self, left: Value, right: Value) -> Result<Value> {
        match (left, right) {
            (Value::Integer(l), Value::Integer(r)) => l
                .checked_mul(r)
                .map(Value::Integer)
                .ok_or_else(|| evaluation("integer overflow")),
            (l, r) => float_op(&l, &r, "multiply", |a, b| a * b),
        }
    }

    fn div_values(&self, left: Value, right: Value) -> Result<Value> {
        if right.as_f64() == Some(0.0) {
            return Err(evaluation("Division by zero"));
        }
        match (left, right) {
            (Value::Integer(l), Value::Integer(r)) => l
                .checked_div(r)
                .map(Value::Integer)
                .ok_or_else(|| evaluation("integer overflow")),
            (l, r) => float_op(&l, &r, "divide", |a, b| a / b),
        }
    }
}

/// Evaluate `expr` against `row` with a default evaluator
pub fn evaluate(expr: &Expr, row: &Row) -> Result<Value> {
    ExprEvaluator::new().eval(expr, row)
}

fn evaluation(msg: &str) -> crate::error::DbError {
    ExecutorError::Evaluation(msg.to_string()).into()
}

fn float_op(left: &Value, right: &Value, verb: &str, f: impl Fn(f64, f64) -> f64) -> Result<Value> {
    match (left.as_f64(), right.as_f64()) {
        (Some(l), Some(r)) => Ok(Value::Float(f(l, r))),
        _ => Err(evaluation(&format!("Cannot {} {} and {}", verb, left, right))),
    }
}

/// Ordering between comparable values; numbers compare across int/float
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    left.partial_cmp(right)
}

/// SQL LIKE: `%` matches any run, `_` matches one character
///
/// Greedy two-pointer match; on mismatch it resumes from the last `%`, so
/// the cost stays O(text * pattern).
pub fn like_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    let (mut ti, mut pi) = (0, 0);
    // (pattern index after the last %, text index it was tried at)
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < text.len() {
        match pattern.get(pi) {
            Some('%') => {
                pi += 1;
                backtrack = Some((pi, ti));
            }
            Some(&c) if c == '_' || c == text[ti] => {
                ti += 1;
                pi += 1;
            }
            _ => match backtrack {
                Some((star_pi, star_ti)) => {
                    pi = star_pi;
                    ti = star_ti + 1;
                    backtrack = Some((star_pi, ti));
                }
                None => return false,
            },
        }
    }

    pattern[pi..].iter().all(|&c| c == '%')
}

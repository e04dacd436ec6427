//! Expression trees evaluated against table rows
//!
//! An `Expr` is built up front and only evaluated later, against one row of a
//! table (projections, filters, computed columns) or against a pair of rows from
//! the two sides of a join (join predicates). Column references are checked
//! against the schema before any row is evaluated.

use std::fmt;
use std::ops::{Add, Div, Mul, Not, Sub};

use crate::core::column::ColumnType;
use crate::core::data_value::Value;
use crate::error::{Error, Result};
use crate::table::base::{RowRef, Table};

/// Expression node
#[derive(Debug, Clone)]
pub enum Expr {
    /// Column of the row being evaluated; in a join, the left side wins
    Column(String),
    /// Column of the left row of a join
    Left(String),
    /// Column of the right row of a join
    Right(String),
    Literal(Value),
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// First non-null argument
    Coalesce(Vec<Expr>),
    IsNull(Box<Expr>),
    IsNan(Box<Expr>),
    FillNull(Box<Expr>, Value),
    Alias(Box<Expr>, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Add,
    Subtract,
    Multiply,
    Divide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
}

/// Rows an expression can see while it is evaluated
#[derive(Debug, Clone, Copy)]
pub enum Scope<'a> {
    Row(RowRef<'a>),
    Pair { left: RowRef<'a>, right: RowRef<'a> },
}

/// Schemas an expression is checked against before evaluation
#[derive(Debug, Clone, Copy)]
pub enum SchemaScope<'a> {
    Single(&'a Table),
    Pair { left: &'a Table, right: &'a Table },
}

/// Reference to a column of the row being evaluated
pub fn col(name: impl Into<String>) -> Expr {
    Expr::Column(name.into())
}

/// Reference to a column of the left join input
pub fn left(name: impl Into<String>) -> Expr {
    Expr::Left(name.into())
}

/// Reference to a column of the right join input
pub fn right(name: impl Into<String>) -> Expr {
    Expr::Right(name.into())
}

pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Literal(value.into())
}

pub fn coalesce(exprs: Vec<Expr>) -> Expr {
    Expr::Coalesce(exprs)
}

impl Expr {
    fn binary(self, op: BinaryOp, other: Expr) -> Expr {
        Expr::Binary {
            left: Box::new(self),
            op,
            right: Box::new(other),
        }
    }

    pub fn eq(self, other: Expr) -> Expr {
        self.binary(BinaryOp::Eq, other)
    }

    pub fn neq(self, other: Expr) -> Expr {
        self.binary(BinaryOp::NotEq, other)
    }

    pub fn lt(self, other: Expr) -> Expr {
        self.binary(BinaryOp::Lt, other)
    }

    pub fn lt_eq(self, other: Expr) -> Expr {
        self.binary(BinaryOp::LtEq, other)
    }

    pub fn gt(self, other: Expr) -> Expr {
        self.binary(BinaryOp::Gt, other)
    }

    pub fn gt_eq(self, other: Expr) -> Expr {
        self.binary(BinaryOp::GtEq, other)
    }

    pub fn and(self, other: Expr) -> Expr {
        self.binary(BinaryOp::And, other)
    }

    pub fn or(self, other: Expr) -> Expr {
        self.binary(BinaryOp::Or, other)
    }

    pub fn is_null(self) -> Expr {
        Expr::IsNull(Box::new(self))
    }

    pub fn is_nan(self) -> Expr {
        Expr::IsNan(Box::new(self))
    }

    pub fn fill_null(self, value: impl Into<Value>) -> Expr {
        Expr::FillNull(Box::new(self), value.into())
    }

    pub fn alias(self, name: impl Into<String>) -> Expr {
        Expr::Alias(Box::new(self), name.into())
    }

    /// Name of the column this expression produces, if it has one
    pub fn output_name(&self) -> Option<&str> {
        match self {
            Expr::Alias(_, name) => Some(name),
            Expr::Column(name) | Expr::Left(name) | Expr::Right(name) => Some(name),
            _ => None,
        }
    }

    /// Check every column reference against the schemas in scope
    pub fn validate(&self, scope: SchemaScope<'_>) -> Result<()> {
        match self {
            Expr::Column(name) => {
                let found = match scope {
                    SchemaScope::Single(table) => table.contains_column(name),
                    SchemaScope::Pair { left, right } => {
                        left.contains_column(name) || right.contains_column(name)
                    }
                };
                if found {
                    Ok(())
                } else {
                    Err(Error::SchemaMismatch(format!(
                        "expression references unknown column '{}'",
                        name
                    )))
                }
            }
            Expr::Left(name) | Expr::Right(name) => {
                let table = match (scope, self) {
                    (SchemaScope::Pair { left, .. }, Expr::Left(_)) => left,
                    (SchemaScope::Pair { right, .. }, _) => right,
                    (SchemaScope::Single(_), _) => {
                        return Err(Error::SchemaMismatch(format!(
                            "join-side reference to '{}' outside of a join",
                            name
                        )))
                    }
                };
                if table.contains_column(name) {
                    Ok(())
                } else {
                    Err(Error::SchemaMismatch(format!(
                        "expression references unknown {} column '{}'",
                        if matches!(self, Expr::Left(_)) { "left" } else { "right" },
                        name
                    )))
                }
            }
            Expr::Literal(_) => Ok(()),
            Expr::Binary { left, right, .. } => {
                left.validate(scope)?;
                right.validate(scope)
            }
            Expr::Unary { operand, .. } => operand.validate(scope),
            Expr::Coalesce(exprs) => exprs.iter().try_for_each(|e| e.validate(scope)),
            Expr::IsNull(inner) | Expr::IsNan(inner) | Expr::FillNull(inner, _) | Expr::Alias(inner, _) => {
                inner.validate(scope)
            }
        }
    }

    /// Evaluate against the rows in scope
    pub fn evaluate(&self, scope: &Scope<'_>) -> Result<Value> {
        match self {
            Expr::Column(name) => {
                let value = match scope {
                    Scope::Row(row) => row.get(name),
                    Scope::Pair { left, right } => left.get(name).or_else(|| right.get(name)),
                };
                value
                    .cloned()
                    .ok_or_else(|| Error::ColumnNotFound(name.clone()))
            }
            Expr::Left(name) | Expr::Right(name) => {
                let row = match (scope, self) {
                    (Scope::Pair { left, .. }, Expr::Left(_)) => left,
                    (Scope::Pair { right, .. }, _) => right,
                    (Scope::Row(_), _) => {
                        return Err(Error::SchemaMismatch(format!(
                            "join-side reference to '{}' outside of a join",
                            name
                        )))
                    }
                };
                row.get(name)
                    .cloned()
                    .ok_or_else(|| Error::ColumnNotFound(name.clone()))
            }
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Binary { left, op, right } => {
                let l = left.evaluate(scope)?;
                let r = right.evaluate(scope)?;
                eval_binary(*op, l, r)
            }
            Expr::Unary { op, operand } => eval_unary(*op, operand.evaluate(scope)?),
            Expr::Coalesce(exprs) => {
                for expr in exprs {
                    let value = expr.evaluate(scope)?;
                    if !value.is_null() {
                        return Ok(value);
                    }
                }
                Ok(Value::Null)
            }
            Expr::IsNull(inner) => Ok(Value::Boolean(inner.evaluate(scope)?.is_null())),
            Expr::IsNan(inner) => match inner.evaluate(scope)? {
                Value::Null => Ok(Value::Null),
                value => Ok(Value::Boolean(value.is_nan())),
            },
            Expr::FillNull(inner, fill) => match inner.evaluate(scope)? {
                Value::Null => Ok(fill.clone()),
                value => Ok(value),
            },
            Expr::Alias(inner, _) => inner.evaluate(scope),
        }
    }

    /// Evaluate as a predicate: only `true` holds, null and `false` do not
    pub fn holds(&self, scope: &Scope<'_>) -> Result<bool> {
        match self.evaluate(scope)? {
            Value::Boolean(b) => Ok(b),
            Value::Null => Ok(false),
            other => Err(Error::TypeMismatch(format!(
                "predicate {} produced a {} value",
                self,
                other.column_type()
            ))),
        }
    }
}

fn eval_binary(op: BinaryOp, l: Value, r: Value) -> Result<Value> {
    match op {
        BinaryOp::And => three_valued(l, r, false),
        BinaryOp::Or => three_valued(l, r, true),
        BinaryOp::Eq | BinaryOp::NotEq => {
            check_comparable(&l, &r)?;
            Ok(match l.sql_eq(&r) {
                Some(eq) => Value::Boolean(if op == BinaryOp::Eq { eq } else { !eq }),
                None => Value::Null,
            })
        }
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            check_comparable(&l, &r)?;
            if l.is_null() || r.is_null() {
                return Ok(Value::Null);
            }
            let ord = l.sql_cmp(&r).ok_or_else(|| {
                Error::TypeMismatch(format!(
                    "{} values are not ordered",
                    l.column_type()
                ))
            })?;
            let result = match op {
                BinaryOp::Lt => ord.is_lt(),
                BinaryOp::LtEq => ord.is_le(),
                BinaryOp::Gt => ord.is_gt(),
                _ => ord.is_ge(),
            };
            Ok(Value::Boolean(result))
        }
        BinaryOp::Add | BinaryOp::Subtract | BinaryOp::Multiply | BinaryOp::Divide => {
            eval_arithmetic(op, l, r)
        }
    }
}

fn check_comparable(l: &Value, r: &Value) -> Result<()> {
    if Value::comparable_types(l.column_type(), r.column_type()) {
        Ok(())
    } else {
        Err(Error::TypeMismatch(format!(
            "cannot compare {} with {}",
            l.column_type(),
            r.column_type()
        )))
    }
}

// `short` is the value that decides the result on its own (false for AND, true for OR)
fn three_valued(l: Value, r: Value, short: bool) -> Result<Value> {
    let as_logic = |v: &Value| -> Result<Option<bool>> {
        match v {
            Value::Boolean(b) => Ok(Some(*b)),
            Value::Null => Ok(None),
            other => Err(Error::TypeMismatch(format!(
                "expected boolean operand, found {}",
                other.column_type()
            ))),
        }
    };
    match (as_logic(&l)?, as_logic(&r)?) {
        (Some(a), _) if a == short => Ok(Value::Boolean(short)),
        (_, Some(b)) if b == short => Ok(Value::Boolean(short)),
        (Some(_), Some(_)) => Ok(Value::Boolean(!short)),
        _ => Ok(Value::Null),
    }
}

fn eval_arithmetic(op: BinaryOp, l: Value, r: Value) -> Result<Value> {
    if l.is_null() || r.is_null() {
        if !(is_numeric_or_null(&l) && is_numeric_or_null(&r)) {
            return Err(arithmetic_mismatch(&l, &r));
        }
        return Ok(Value::Null);
    }
    match (&l, &r) {
        // division always produces a float, like SQL engines that follow true division
        (Value::Int64(a), Value::Int64(b)) if op != BinaryOp::Divide => {
            let result = match op {
                BinaryOp::Add => a.checked_add(*b),
                BinaryOp::Subtract => a.checked_sub(*b),
                _ => a.checked_mul(*b),
            };
            result.map(Value::Int64).ok_or_else(|| {
                Error::InvalidValue(format!("integer overflow in {} {:?} {}", a, op, b))
            })
        }
        _ => {
            let (a, b) = match (l.as_f64(), r.as_f64()) {
                (Some(a), Some(b)) => (a, b),
                _ => return Err(arithmetic_mismatch(&l, &r)),
            };
            let result = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Subtract => a - b,
                BinaryOp::Multiply => a * b,
                _ => a / b,
            };
            Ok(Value::Float64(result))
        }
    }
}

fn is_numeric_or_null(v: &Value) -> bool {
    v.is_null() || v.column_type().is_numeric()
}

fn arithmetic_mismatch(l: &Value, r: &Value) -> Error {
    Error::TypeMismatch(format!(
        "arithmetic is not defined for {} and {}",
        l.column_type(),
        r.column_type()
    ))
}

fn eval_unary(op: UnaryOp, value: Value) -> Result<Value> {
    match (op, value) {
        (_, Value::Null) => Ok(Value::Null),
        (UnaryOp::Not, Value::Boolean(b)) => Ok(Value::Boolean(!b)),
        (UnaryOp::Negate, Value::Int64(i)) => i
            .checked_neg()
            .map(Value::Int64)
            .ok_or_else(|| Error::InvalidValue(format!("integer overflow negating {}", i))),
        (UnaryOp::Negate, Value::Float64(f)) => Ok(Value::Float64(-f)),
        (op, other) => Err(Error::TypeMismatch(format!(
            "{:?} is not defined for {}",
            op,
            other.column_type()
        ))),
    }
}

/// Infer the result type of evaluating an expression over many rows
pub(crate) fn result_type(values: &[Value]) -> ColumnType {
    values
        .iter()
        .map(Value::column_type)
        .find(|t| *t != ColumnType::Null)
        .unwrap_or(ColumnType::Null)
}

impl Add for Expr {
    type Output = Expr;

    fn add(self, rhs: Expr) -> Expr {
        self.binary(BinaryOp::Add, rhs)
    }
}

impl Sub for Expr {
    type Output = Expr;

    fn sub(self, rhs: Expr) -> Expr {
        self.binary(BinaryOp::Subtract, rhs)
    }
}

impl Mul for Expr {
    type Output = Expr;

    fn mul(self, rhs: Expr) -> Expr {
        self.binary(BinaryOp::Multiply, rhs)
    }
}

impl Div for Expr {
    type Output = Expr;

    fn div(self, rhs: Expr) -> Expr {
        self.binary(BinaryOp::Divide, rhs)
    }
}

impl Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        Expr::Unary {
            op: UnaryOp::Not,
            operand: Box::new(self),
        }
    }
}

impl std::ops::Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::Unary {
            op: UnaryOp::Negate,
            operand: Box::new(self),
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
        };
        f.write_str(symbol)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(name) => write!(f, "{}", name),
            Expr::Left(name) => write!(f, "left.{}", name),
            Expr::Right(name) => write!(f, "right.{}", name),
            Expr::Literal(Value::Utf8(s)) => write!(f, "'{}'", s),
            Expr::Literal(value) => write!(f, "{}", value),
            Expr::Binary { left, op, right } => write!(f, "({} {} {})", left, op, right),
            Expr::Unary { op: UnaryOp::Not, operand } => write!(f, "NOT {}", operand),
            Expr::Unary { op: UnaryOp::Negate, operand } => write!(f, "-{}", operand),
            Expr::Coalesce(exprs) => {
                let args: Vec<String> = exprs.iter().map(|e| e.to_string()).collect();
                write!(f, "coalesce({})", args.join(", "))
            }
            Expr::IsNull(inner) => write!(f, "{} IS NULL", inner),
            Expr::IsNan(inner) => write!(f, "isnan({})", inner),
            Expr::FillNull(inner, value) => write!(f, "fill_null({}, {})", inner, value),
            Expr::Alias(inner, name) => write!(f, "{} AS {}", inner, name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::column::Column;

    fn row_table() -> Table {
        Table::from_columns(vec![
            Column::from_options("a", vec![Some(1.0), None, Some(f64::NAN)]),
            Column::from_vec("b", vec![2_i64, 3, 4]),
        ])
        .unwrap()
    }

    fn eval(expr: &Expr, table: &Table, row: usize) -> Value {
        expr.evaluate(&Scope::Row(table.row(row).unwrap())).unwrap()
    }

    #[test]
    fn null_propagates_but_nan_is_a_number() {
        let table = row_table();
        let sum = col("a") + col("b");
        assert_eq!(eval(&sum, &table, 0), Value::Float64(3.0));
        assert_eq!(eval(&sum, &table, 1), Value::Null);
        assert!(eval(&sum, &table, 2).is_nan());
    }

    #[test]
    fn division_follows_ieee() {
        let table = row_table();
        assert_eq!(eval(&(col("b") / lit(0_i64)), &table, 0), Value::Float64(f64::INFINITY));
        assert!(eval(&(lit(0.0) / lit(0.0)), &table, 0).is_nan());
        assert_eq!(eval(&(col("b") / lit(2_i64)), &table, 1), Value::Float64(1.5));
    }

    #[test]
    fn three_valued_logic() {
        let table = row_table();
        let unknown = col("a").gt(lit(0.0));
        assert_eq!(eval(&unknown, &table, 1), Value::Null);
        assert_eq!(eval(&unknown.clone().and(lit(false)), &table, 1), Value::Boolean(false));
        assert_eq!(eval(&unknown.clone().or(lit(true)), &table, 1), Value::Boolean(true));
        assert_eq!(eval(&unknown.and(lit(true)), &table, 1), Value::Null);
    }

    #[test]
    fn is_null_and_is_nan_are_distinct() {
        let table = row_table();
        assert_eq!(eval(&col("a").is_null(), &table, 1), Value::Boolean(true));
        assert_eq!(eval(&col("a").is_null(), &table, 2), Value::Boolean(false));
        assert_eq!(eval(&col("a").is_nan(), &table, 2), Value::Boolean(true));
        assert_eq!(eval(&col("a").is_nan(), &table, 1), Value::Null);
        assert_eq!(eval(&col("a").fill_null(0.0), &table, 1), Value::Float64(0.0));
    }

    #[test]
    fn validation_catches_unknown_and_side_references() {
        let table = row_table();
        assert!(col("a").validate(SchemaScope::Single(&table)).is_ok());
        assert!(matches!(
            col("zzz").validate(SchemaScope::Single(&table)),
            Err(Error::SchemaMismatch(_))
        ));
        assert!(left("a").validate(SchemaScope::Single(&table)).is_err());
        assert!(right("b")
            .validate(SchemaScope::Pair { left: &table, right: &table })
            .is_ok());
    }

    #[test]
    fn comparing_strings_with_numbers_is_a_type_error() {
        let table = row_table();
        let expr = col("b").eq(lit("x"));
        assert!(matches!(
            expr.evaluate(&Scope::Row(table.row(0).unwrap())),
            Err(Error::TypeMismatch(_))
        ));
    }
}

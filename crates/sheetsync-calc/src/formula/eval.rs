//! Whole-workbook formula evaluation
//!
//! Every formula cell is evaluated once, in sheet then row-major order, with
//! memoization. A cell re-entered while it is still being computed is a
//! cycle and evaluates to `#CIRC!`.

use std::cmp::Ordering;
use std::collections::HashMap;

use super::lexer::BinaryOp;
use super::parser::{parse_formula, Expr};
use crate::error::{CellLocation, EvaluationError};
use crate::reference::{CellRef, RangeRef};
use crate::value::{ErrorValue, Value};
use crate::workbook::{CellContent, Workbook};

/// Deepest recursion followed before giving up
///
/// Each cell hop and each nested operator or function call counts one level.
const MAX_DEPTH: usize = 256;

type CellKey = (usize, CellRef);

enum Slot {
    InProgress,
    Done(Value),
}

/// Function argument after evaluation
enum Arg {
    /// A literal or computed value
    Scalar(Value),
    /// Values read through a cell or range reference; blanks are skipped
    Cells(Vec<Value>),
}

/// Evaluate every formula cell, returning new cached values and recorded errors
pub(crate) fn evaluate_workbook(workbook: &Workbook) -> (Vec<(CellKey, Value)>, Vec<EvaluationError>) {
    let mut evaluator = Evaluator {
        workbook,
        slots: HashMap::new(),
        errors: Vec::new(),
    };

    let mut values = Vec::new();
    for (index, sheet) in workbook.worksheets().iter().enumerate() {
        for (at, cell) in sheet.cells() {
            if matches!(cell.content, CellContent::Formula { .. }) {
                let value = evaluator.cell_value((index, at), 0);
                values.push(((index, at), value));
            }
        }
    }

    (values, evaluator.errors)
}

struct Evaluator<'a> {
    workbook: &'a Workbook,
    slots: HashMap<CellKey, Slot>,
    errors: Vec<EvaluationError>,
}

impl Evaluator<'_> {
    fn location(&self, (index, at): CellKey) -> CellLocation {
        CellLocation {
            sheet: self.workbook.worksheets()[index].name().to_string(),
            row: at.row,
            column: at.column,
        }
    }

    fn record(&mut self, error: EvaluationError) {
        if !self.errors.contains(&error) {
            self.errors.push(error);
        }
    }

    fn cell_value(&mut self, key: CellKey, depth: usize) -> Value {
        let (index, at) = key;
        let workbook = self.workbook;
        let formula = match workbook.worksheets()[index].cell(at) {
            None => return Value::Empty,
            Some(cell) => match &cell.content {
                CellContent::Formula { formula, .. } => formula.as_str(),
                other => return other.value(),
            },
        };

        match self.slots.get(&key) {
            Some(Slot::Done(value)) => return value.clone(),
            Some(Slot::InProgress) => {
                let location = self.location(key);
                self.record(EvaluationError::CircularReference(location));
                return Value::Error(ErrorValue::Circular);
            }
            None => {}
        }

        if depth >= MAX_DEPTH {
            let location = self.location(key);
            self.record(EvaluationError::TooDeep(location));
            return Value::Error(ErrorValue::Error);
        }

        self.slots.insert(key, Slot::InProgress);
        let value = match parse_formula(formula) {
            Ok(expr) => match self.eval(&expr, key, depth + 1) {
                Value::Empty => Value::Number(0.0),
                value => value,
            },
            Err(err) => {
                let location = self.location(key);
                self.record(EvaluationError::Parse {
                    message: err.message().to_string(),
                    location,
                });
                Value::Error(ErrorValue::Error)
            }
        };
        self.slots.insert(key, Slot::Done(value.clone()));
        value
    }

    fn sheet_for(&self, sheet: Option<&str>, current: usize) -> Option<usize> {
        match sheet {
            None => Some(current),
            Some(name) => self.workbook.formula_sheet_index(name),
        }
    }

    fn eval(&mut self, expr: &Expr, origin: CellKey, depth: usize) -> Value {
        let nested = matches!(expr, Expr::Negate(_) | Expr::Binary(..) | Expr::Call(..));
        if nested && depth >= MAX_DEPTH {
            let location = self.location(origin);
            self.record(EvaluationError::TooDeep(location));
            return Value::Error(ErrorValue::Error);
        }
        let depth = depth + usize::from(nested);

        match expr {
            Expr::Number(n) => Value::Number(*n),
            Expr::Text(s) => Value::Text(s.clone()),
            Expr::Boolean(b) => Value::Boolean(*b),
            Expr::Name(_) => Value::Error(ErrorValue::Name),
            Expr::Range { .. } => Value::Error(ErrorValue::Value),
            Expr::Cell { sheet, cell } => match self.sheet_for(sheet.as_deref(), origin.0) {
                Some(index) => self.cell_value((index, *cell), depth),
                None => Value::Error(ErrorValue::Ref),
            },
            Expr::Negate(inner) => match self.eval(inner, origin, depth).to_number() {
                Ok(n) => Value::number(-n),
                Err(e) => Value::Error(e),
            },
            Expr::Binary(op, lhs, rhs) => {
                let lhs = self.eval(lhs, origin, depth);
                let rhs = self.eval(rhs, origin, depth);
                binary(*op, &lhs, &rhs)
            }
            Expr::Call(name, args) => self.call(name, args, origin, depth),
        }
    }

    fn arg(&mut self, expr: &Expr, origin: CellKey, depth: usize) -> Arg {
        match expr {
            Expr::Cell { sheet, cell } => {
                let Some(index) = self.sheet_for(sheet.as_deref(), origin.0) else {
                    return Arg::Scalar(Value::Error(ErrorValue::Ref));
                };
                let range = RangeRef { start: *cell, end: *cell };
                Arg::Cells(self.range_values(index, range, depth))
            }
            Expr::Range { sheet, range } => match self.sheet_for(sheet.as_deref(), origin.0) {
                Some(index) => Arg::Cells(self.range_values(index, *range, depth)),
                None => Arg::Scalar(Value::Error(ErrorValue::Ref)),
            },
            other => Arg::Scalar(self.eval(other, origin, depth)),
        }
    }

    fn range_values(&mut self, index: usize, range: RangeRef, depth: usize) -> Vec<Value> {
        let populated: Vec<CellRef> = self.workbook.worksheets()[index]
            .cells_in(range)
            .map(|(at, _)| at)
            .collect();
        populated
            .into_iter()
            .map(|at| self.cell_value((index, at), depth))
            .filter(|value| *value != Value::Empty)
            .collect()
    }

    fn call(&mut self, name: &str, args: &[Expr], origin: CellKey, depth: usize) -> Value {
        let arity = |min: usize, max: usize| (min..=max).contains(&args.len());

        match name {
            "SUM" => self.numbers(args, origin, depth).map_or_else(Value::Error, |ns| {
                Value::number(ns.iter().sum())
            }),
            "PRODUCT" => self.numbers(args, origin, depth).map_or_else(Value::Error, |ns| {
                if ns.is_empty() {
                    Value::Number(0.0)
                } else {
                    Value::number(ns.iter().product())
                }
            }),
            "AVERAGE" => self.numbers(args, origin, depth).map_or_else(Value::Error, |ns| {
                if ns.is_empty() {
                    Value::Error(ErrorValue::DivZero)
                } else {
                    Value::number(ns.iter().sum::<f64>() / ns.len() as f64)
                }
            }),
            "MIN" => self.numbers(args, origin, depth).map_or_else(Value::Error, |ns| {
                Value::Number(ns.into_iter().reduce(f64::min).unwrap_or(0.0))
            }),
            "MAX" => self.numbers(args, origin, depth).map_or_else(Value::Error, |ns| {
                Value::Number(ns.into_iter().reduce(f64::max).unwrap_or(0.0))
            }),
            "COUNT" => {
                let mut count = 0usize;
                for arg in args {
                    count += match self.arg(arg, origin, depth) {
                        Arg::Scalar(Value::Number(_)) => 1,
                        Arg::Scalar(Value::Text(s)) => {
                            usize::from(crate::format::parse_plain_number(s.trim()).is_some())
                        }
                        Arg::Scalar(_) => 0,
                        Arg::Cells(values) => {
                            values.iter().filter(|v| matches!(v, Value::Number(_))).count()
                        }
                    };
                }
                Value::Number(count as f64)
            }
            "ABS" if arity(1, 1) => self.unary_number(&args[0], origin, depth, f64::abs),
            "ROUND" if arity(1, 2) => {
                let x = self.eval(&args[0], origin, depth).to_number();
                let digits = match args.get(1) {
                    Some(arg) => self.eval(arg, origin, depth).to_number(),
                    None => Ok(0.0),
                };
                match (x, digits) {
                    (Ok(x), Ok(digits)) => {
                        let factor = 10f64.powi(digits.trunc() as i32);
                        Value::number((x * factor).round() / factor)
                    }
                    (Err(e), _) | (_, Err(e)) => Value::Error(e),
                }
            }
            "IF" if arity(2, 3) => match self.eval(&args[0], origin, depth).to_bool() {
                Ok(true) => self.eval(&args[1], origin, depth),
                Ok(false) => match args.get(2) {
                    Some(otherwise) => self.eval(otherwise, origin, depth),
                    None => Value::Boolean(false),
                },
                Err(e) => Value::Error(e),
            },
            "AND" | "OR" if !args.is_empty() => match self.booleans(args, origin, depth) {
                Ok(bs) if bs.is_empty() => Value::Error(ErrorValue::Value),
                Ok(bs) if name == "AND" => Value::Boolean(bs.iter().all(|b| *b)),
                Ok(bs) => Value::Boolean(bs.iter().any(|b| *b)),
                Err(e) => Value::Error(e),
            },
            "NOT" if arity(1, 1) => match self.eval(&args[0], origin, depth).to_bool() {
                Ok(b) => Value::Boolean(!b),
                Err(e) => Value::Error(e),
            },
            "CONCAT" | "CONCATENATE" => {
                let mut out = String::new();
                for arg in args {
                    let values = match self.arg(arg, origin, depth) {
                        Arg::Scalar(value) => vec![value],
                        Arg::Cells(values) => values,
                    };
                    for value in values {
                        match value.to_text() {
                            Ok(text) => out.push_str(&text),
                            Err(e) => return Value::Error(e),
                        }
                    }
                }
                Value::Text(out)
            }
            "LEN" if arity(1, 1) => self.unary_text(&args[0], origin, depth, |s| {
                Value::Number(s.chars().count() as f64)
            }),
            "UPPER" if arity(1, 1) => {
                self.unary_text(&args[0], origin, depth, |s| Value::Text(s.to_uppercase()))
            }
            "LOWER" if arity(1, 1) => {
                self.unary_text(&args[0], origin, depth, |s| Value::Text(s.to_lowercase()))
            }
            "SUM" | "PRODUCT" | "AVERAGE" | "MIN" | "MAX" | "COUNT" | "ABS" | "ROUND" | "IF"
            | "AND" | "OR" | "NOT" | "CONCAT" | "CONCATENATE" | "LEN" | "UPPER" | "LOWER" => {
                Value::Error(ErrorValue::Value)
            }
            unknown => {
                let location = self.location(origin);
                self.record(EvaluationError::UnsupportedFunction {
                    name: unknown.to_string(),
                    location,
                });
                Value::Error(ErrorValue::Name)
            }
        }
    }

    fn numbers(&mut self, args: &[Expr], origin: CellKey, depth: usize) -> Result<Vec<f64>, ErrorValue> {
        let mut out = Vec::new();
        for arg in args {
            match self.arg(arg, origin, depth) {
                Arg::Scalar(value) => out.push(value.to_number()?),
                Arg::Cells(values) => {
                    for value in values {
                        match value {
                            Value::Number(n) => out.push(n),
                            Value::Error(e) => return Err(e),
                            _ => {}
                        }
                    }
                }
            }
        }
        Ok(out)
    }

    fn booleans(&mut self, args: &[Expr], origin: CellKey, depth: usize) -> Result<Vec<bool>, ErrorValue> {
        let mut out = Vec::new();
        for arg in args {
            match self.arg(arg, origin, depth) {
                Arg::Scalar(value) => out.push(value.to_bool()?),
                Arg::Cells(values) => {
                    for value in values {
                        match value {
                            Value::Boolean(b) => out.push(b),
                            Value::Number(n) => out.push(n != 0.0),
                            Value::Error(e) => return Err(e),
                            _ => {}
                        }
                    }
                }
            }
        }
        Ok(out)
    }

    fn unary_number(&mut self, arg: &Expr, origin: CellKey, depth: usize, f: fn(f64) -> f64) -> Value {
        match self.eval(arg, origin, depth).to_number() {
            Ok(n) => Value::number(f(n)),
            Err(e) => Value::Error(e),
        }
    }

    fn unary_text(
        &mut self,
        arg: &Expr,
        origin: CellKey,
        depth: usize,
        f: impl FnOnce(&str) -> Value,
    ) -> Value {
        match self.eval(arg, origin, depth).to_text() {
            Ok(s) => f(&s),
            Err(e) => Value::Error(e),
        }
    }
}

fn binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Value {
    match op {
        BinaryOp::Concat => match (lhs.to_text(), rhs.to_text()) {
            (Ok(a), Ok(b)) => Value::Text(a + &b),
            (Err(e), _) | (_, Err(e)) => Value::Error(e),
        },
        BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => {
            match lhs.compare(rhs) {
                Ok(ordering) => Value::Boolean(match op {
                    BinaryOp::Eq => ordering == Ordering::Equal,
                    BinaryOp::Ne => ordering != Ordering::Equal,
                    BinaryOp::Lt => ordering == Ordering::Less,
                    BinaryOp::Gt => ordering == Ordering::Greater,
                    BinaryOp::Le => ordering != Ordering::Greater,
                    _ => ordering != Ordering::Less,
                }),
                Err(e) => Value::Error(e),
            }
        }
        arithmetic => {
            let (a, b) = match (lhs.to_number(), rhs.to_number()) {
                (Ok(a), Ok(b)) => (a, b),
                (Err(e), _) | (_, Err(e)) => return Value::Error(e),
            };
            match arithmetic {
                BinaryOp::Add => Value::number(a + b),
                BinaryOp::Sub => Value::number(a - b),
                BinaryOp::Mul => Value::number(a * b),
                BinaryOp::Div if b == 0.0 => Value::Error(ErrorValue::DivZero),
                BinaryOp::Div => Value::number(a / b),
                _ => Value::number(a.powf(b)),
            }
        }
    }
}

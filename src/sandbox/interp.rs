//! Tree-walking interpreter with a wall-clock deadline and resource caps.
//!
//! Every statement and expression step passes through [`Interp::tick`], so
//! a runaway program is cut off within one step of the deadline. The
//! environment is built fresh per evaluation and holds plain owned values,
//! so nothing evaluated here can reach host state.

use std::collections::HashMap;
use std::time::Instant;

use super::builtins;
use super::parser::{BinOp, Expr, Stmt, UnaryOp};
use super::value::Value;
use super::EvalError;

/// Identifiers that name host capabilities in the language this grammar
/// imitates. They resolve to nothing here, but referencing one is reported
/// as a capability violation rather than a plain unknown identifier so
/// escape attempts are distinguishable in logs and tests.
const DENIED_IDENTS: &[&str] = &[
    "require",
    "import",
    "module",
    "exports",
    "process",
    "global",
    "globalThis",
    "window",
    "eval",
    "Function",
    "fs",
    "child_process",
    "exec",
    "spawn",
    "system",
    "fetch",
    "XMLHttpRequest",
    "env",
    "setTimeout",
    "setInterval",
    "Reflect",
    "Proxy",
    "constructor",
    "prototype",
    "__proto__",
];

/// Property names that would walk a reflection chain in the imitated
/// language. Blocked on every member and string-index access.
const DENIED_MEMBERS: &[&str] = &["constructor", "prototype", "__proto__"];

pub(crate) fn is_denied(name: &str) -> bool {
    DENIED_IDENTS.contains(&name)
}

/// Resource caps for a single evaluation.
pub(crate) struct Limits {
    /// Maximum length of any string value, in bytes.
    pub max_string_len: usize,
    /// Maximum element count of any array or object.
    pub max_collection_len: usize,
    /// Maximum interpreter steps, independent of the wall clock.
    pub fuel: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_string_len: 64 * 1024,
            max_collection_len: 4096,
            fuel: 10_000_000,
        }
    }
}

/// How many interpreter steps pass between wall-clock checks.
const DEADLINE_CHECK_INTERVAL: u64 = 1024;

pub(crate) struct Interp {
    env: HashMap<String, Value>,
    deadline: Instant,
    fuel: u64,
    limits: Limits,
}

impl Interp {
    pub fn new(deadline: Instant, limits: Limits) -> Self {
        let fuel = limits.fuel;
        Self {
            env: HashMap::new(),
            deadline,
            fuel,
            limits,
        }
    }

    /// Execute a program. The result is the value of the last
    /// value-producing statement, or `null` if there is none.
    pub fn run(&mut self, program: &[Stmt]) -> Result<Value, EvalError> {
        let mut last = Value::Null;
        for stmt in program {
            if let Some(value) = self.exec(stmt)? {
                last = value;
            }
        }
        Ok(last)
    }

    fn tick(&mut self) -> Result<(), EvalError> {
        if self.fuel == 0 {
            return Err(EvalError::Timeout(
                "evaluation step budget exhausted".to_string(),
            ));
        }
        self.fuel -= 1;
        // Instant::now() is kept off the per-step hot path.
        if self.fuel % DEADLINE_CHECK_INTERVAL == 0 && Instant::now() >= self.deadline {
            return Err(EvalError::Timeout(
                "evaluation exceeded the time budget".to_string(),
            ));
        }
        Ok(())
    }

    fn exec(&mut self, stmt: &Stmt) -> Result<Option<Value>, EvalError> {
        self.tick()?;
        match stmt {
            Stmt::Let(name, expr) => {
                let value = self.eval(expr)?;
                self.env.insert(name.clone(), value);
                Ok(None)
            }
            Stmt::Assign(name, expr) => {
                if !self.env.contains_key(name) {
                    return Err(EvalError::Runtime(format!(
                        "assignment to undeclared variable `{name}`"
                    )));
                }
                let value = self.eval(expr)?;
                self.env.insert(name.clone(), value);
                Ok(None)
            }
            Stmt::Expr(expr) => Ok(Some(self.eval(expr)?)),
            Stmt::If(cond, then_branch, else_branch) => {
                if self.eval(cond)?.truthy() {
                    self.exec_block(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.exec_block(else_branch)
                } else {
                    Ok(None)
                }
            }
            Stmt::While(cond, body) => {
                while self.eval(cond)?.truthy() {
                    self.exec_block(body)?;
                }
                Ok(None)
            }
            Stmt::Block(stmts) => self.exec_block(stmts),
        }
    }

    fn exec_block(&mut self, stmts: &[Stmt]) -> Result<Option<Value>, EvalError> {
        let mut last = None;
        for stmt in stmts {
            if let Some(value) = self.exec(stmt)? {
                last = Some(value);
            }
        }
        Ok(last)
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        self.tick()?;
        match expr {
            Expr::Num(n) => Ok(Value::Num(*n)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Null => Ok(Value::Null),
            Expr::Ident(name) => self.resolve(name),
            Expr::Array(items) => {
                if items.len() > self.limits.max_collection_len {
                    return Err(EvalError::Runtime("array literal too large".to_string()));
                }
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item)?);
                }
                Ok(Value::Array(values))
            }
            Expr::Object(pairs) => {
                if pairs.len() > self.limits.max_collection_len {
                    return Err(EvalError::Runtime("object literal too large".to_string()));
                }
                let mut values = Vec::with_capacity(pairs.len());
                for (key, value) in pairs {
                    values.push((key.clone(), self.eval(value)?));
                }
                Ok(Value::Object(values))
            }
            Expr::Unary(op, inner) => {
                let value = self.eval(inner)?;
                match op {
                    UnaryOp::Neg => match value {
                        Value::Num(n) => Ok(Value::Num(-n)),
                        other => Err(EvalError::Runtime(format!(
                            "unary `-` expects a number, got {}",
                            other.type_name()
                        ))),
                    },
                    UnaryOp::Not => Ok(Value::Bool(!value.truthy())),
                }
            }
            Expr::Binary(op, left, right) => self.eval_binary(*op, left, right),
            Expr::Index(target, index) => {
                let target = self.eval(target)?;
                let index = self.eval(index)?;
                self.index(target, index)
            }
            Expr::Member(target, name) => {
                self.member_guard(name)?;
                let target = self.eval(target)?;
                match target {
                    Value::Object(pairs) => Ok(pairs
                        .iter()
                        .find(|(key, _)| key == name)
                        .map(|(_, value)| value.clone())
                        .unwrap_or(Value::Null)),
                    other => Err(EvalError::Runtime(format!(
                        "value of type {} has no properties",
                        other.type_name()
                    ))),
                }
            }
            Expr::Call(callee, args) => self.eval_call(callee, args),
        }
    }

    fn eval_binary(&mut self, op: BinOp, left: &Expr, right: &Expr) -> Result<Value, EvalError> {
        // Logical operators short-circuit and return an operand.
        match op {
            BinOp::Or => {
                let left = self.eval(left)?;
                return if left.truthy() { Ok(left) } else { self.eval(right) };
            }
            BinOp::And => {
                let left = self.eval(left)?;
                return if left.truthy() { self.eval(right) } else { Ok(left) };
            }
            _ => {}
        }

        let left = self.eval(left)?;
        let right = self.eval(right)?;
        match op {
            BinOp::Add => match (left, right) {
                (Value::Num(a), Value::Num(b)) => Ok(Value::Num(a + b)),
                (Value::Str(a), b) => self.concat(a, b),
                (a, Value::Str(b)) => {
                    let rendered = a.render(self.limits.max_string_len);
                    self.concat(rendered, Value::Str(b))
                }
                (a, b) => Err(EvalError::Runtime(format!(
                    "cannot add {} and {}",
                    a.type_name(),
                    b.type_name()
                ))),
            },
            BinOp::Sub => self.numeric(op, left, right).map(|(a, b)| Value::Num(a - b)),
            BinOp::Mul => self.numeric(op, left, right).map(|(a, b)| Value::Num(a * b)),
            BinOp::Div => {
                let (a, b) = self.numeric(op, left, right)?;
                if b == 0.0 {
                    return Err(EvalError::Runtime("division by zero".to_string()));
                }
                Ok(Value::Num(a / b))
            }
            BinOp::Rem => {
                let (a, b) = self.numeric(op, left, right)?;
                if b == 0.0 {
                    return Err(EvalError::Runtime("modulo by zero".to_string()));
                }
                Ok(Value::Num(a % b))
            }
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                let ordering_holds = match (&left, &right) {
                    (Value::Num(a), Value::Num(b)) => compare(op, a.partial_cmp(b)),
                    (Value::Str(a), Value::Str(b)) => compare(op, a.partial_cmp(b)),
                    _ => {
                        return Err(EvalError::Runtime(format!(
                            "cannot compare {} and {}",
                            left.type_name(),
                            right.type_name()
                        )));
                    }
                };
                Ok(Value::Bool(ordering_holds))
            }
            BinOp::Eq => Ok(Value::Bool(left == right)),
            BinOp::Ne => Ok(Value::Bool(left != right)),
            BinOp::And | BinOp::Or => unreachable!("handled above"),
        }
    }

    fn concat(&self, a: String, b: Value) -> Result<Value, EvalError> {
        let b = match b {
            Value::Str(s) => s,
            other => other.render(self.limits.max_string_len),
        };
        if a.len() + b.len() > self.limits.max_string_len {
            return Err(EvalError::Runtime("string too long".to_string()));
        }
        Ok(Value::Str(a + &b))
    }

    fn numeric(&self, op: BinOp, left: Value, right: Value) -> Result<(f64, f64), EvalError> {
        match (left, right) {
            (Value::Num(a), Value::Num(b)) => Ok((a, b)),
            (a, b) => Err(EvalError::Runtime(format!(
                "{} expects numbers, got {} and {}",
                op_symbol(op),
                a.type_name(),
                b.type_name()
            ))),
        }
    }

    fn index(&self, target: Value, index: Value) -> Result<Value, EvalError> {
        match (target, index) {
            (Value::Array(items), Value::Num(n)) => {
                if n.fract() != 0.0 || n < 0.0 {
                    return Ok(Value::Null);
                }
                Ok(items.get(n as usize).cloned().unwrap_or(Value::Null))
            }
            (Value::Str(s), Value::Num(n)) => {
                if n.fract() != 0.0 || n < 0.0 {
                    return Ok(Value::Null);
                }
                Ok(s.chars()
                    .nth(n as usize)
                    .map(|c| Value::Str(c.to_string()))
                    .unwrap_or(Value::Null))
            }
            (Value::Object(pairs), Value::Str(key)) => {
                self.member_guard(&key)?;
                Ok(pairs
                    .iter()
                    .find(|(k, _)| *k == key)
                    .map(|(_, value)| value.clone())
                    .unwrap_or(Value::Null))
            }
            (target, index) => Err(EvalError::Runtime(format!(
                "cannot index {} with {}",
                target.type_name(),
                index.type_name()
            ))),
        }
    }

    fn member_guard(&self, name: &str) -> Result<(), EvalError> {
        if DENIED_MEMBERS.contains(&name) {
            return Err(EvalError::Capability(format!(
                "access to `{name}` is not permitted"
            )));
        }
        Ok(())
    }

    fn eval_call(&mut self, callee: &Expr, args: &[Expr]) -> Result<Value, EvalError> {
        if let Expr::Ident(name) = callee {
            if !self.env.contains_key(name.as_str()) {
                if builtins::is_builtin(name) {
                    let mut values = Vec::with_capacity(args.len());
                    for arg in args {
                        values.push(self.eval(arg)?);
                    }
                    return builtins::call(name, values, &self.limits);
                }
                if is_denied(name) {
                    return Err(EvalError::Capability(format!(
                        "access to `{name}` is not permitted"
                    )));
                }
                return Err(EvalError::Runtime(format!(
                    "call to undefined function `{name}`"
                )));
            }
        }
        let value = self.eval(callee)?;
        Err(EvalError::Runtime(format!(
            "value of type {} is not callable",
            value.type_name()
        )))
    }

    fn resolve(&self, name: &str) -> Result<Value, EvalError> {
        if let Some(value) = self.env.get(name) {
            return Ok(value.clone());
        }
        if is_denied(name) {
            return Err(EvalError::Capability(format!(
                "access to `{name}` is not permitted"
            )));
        }
        if builtins::is_builtin(name) {
            return Err(EvalError::Runtime(format!(
                "`{name}` is a built-in function; call it instead"
            )));
        }
        Err(EvalError::Runtime(format!("undefined identifier `{name}`")))
    }
}

fn compare(op: BinOp, ordering: Option<std::cmp::Ordering>) -> bool {
    use std::cmp::Ordering;
    match ordering {
        // NaN comparisons are always false.
        None => false,
        Some(ordering) => match op {
            BinOp::Lt => ordering == Ordering::Less,
            BinOp::Le => ordering != Ordering::Greater,
            BinOp::Gt => ordering == Ordering::Greater,
            BinOp::Ge => ordering != Ordering::Less,
            _ => false,
        },
    }
}

fn op_symbol(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "`+`",
        BinOp::Sub => "`-`",
        BinOp::Mul => "`*`",
        BinOp::Div => "`/`",
        BinOp::Rem => "`%`",
        BinOp::Lt => "`<`",
        BinOp::Le => "`<=`",
        BinOp::Gt => "`>`",
        BinOp::Ge => "`>=`",
        BinOp::Eq => "`==`",
        BinOp::Ne => "`!=`",
        BinOp::And => "`&&`",
        BinOp::Or => "`||`",
    }
}

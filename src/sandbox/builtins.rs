//! Built-in functions reachable from sandboxed code.
//!
//! This table is the complete allow-list: every function is pure and
//! operates only on sandbox values. There is nothing else callable.

use super::interp::Limits;
use super::value::Value;
use super::EvalError;

const BUILTINS: &[&str] = &[
    "abs", "min", "max", "floor", "ceil", "round", "sqrt", "pow", "len", "upper", "lower",
    "trim", "contains", "split", "join", "str", "num", "typeof",
];

pub(crate) fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

pub(crate) fn call(name: &str, args: Vec<Value>, limits: &Limits) -> Result<Value, EvalError> {
    match name {
        "abs" => num1(name, &args).map(|n| Value::Num(n.abs())),
        "floor" => num1(name, &args).map(|n| Value::Num(n.floor())),
        "ceil" => num1(name, &args).map(|n| Value::Num(n.ceil())),
        "round" => num1(name, &args).map(|n| Value::Num(n.round())),
        "sqrt" => num1(name, &args).map(|n| Value::Num(n.sqrt())),
        "min" | "max" => {
            if args.is_empty() {
                return Err(arity_error(name, "at least 1", 0));
            }
            let mut extreme = match &args[0] {
                Value::Num(n) => *n,
                other => return Err(type_error(name, other)),
            };
            for arg in &args[1..] {
                let n = match arg {
                    Value::Num(n) => *n,
                    other => return Err(type_error(name, other)),
                };
                extreme = if name == "min" {
                    extreme.min(n)
                } else {
                    extreme.max(n)
                };
            }
            Ok(Value::Num(extreme))
        }
        "pow" => {
            let (base, exp) = num2(name, &args)?;
            Ok(Value::Num(base.powf(exp)))
        }
        "len" => {
            arity(name, &args, 1)?;
            let n = match &args[0] {
                Value::Str(s) => s.chars().count(),
                Value::Array(items) => items.len(),
                Value::Object(pairs) => pairs.len(),
                other => return Err(type_error(name, other)),
            };
            Ok(Value::Num(n as f64))
        }
        "upper" => str1(name, &args).map(|s| Value::Str(s.to_uppercase())),
        "lower" => str1(name, &args).map(|s| Value::Str(s.to_lowercase())),
        "trim" => str1(name, &args).map(|s| Value::Str(s.trim().to_string())),
        "contains" => {
            arity(name, &args, 2)?;
            match (&args[0], &args[1]) {
                (Value::Str(s), Value::Str(needle)) => Ok(Value::Bool(s.contains(needle))),
                (Value::Array(items), needle) => {
                    Ok(Value::Bool(items.iter().any(|item| item == needle)))
                }
                (other, _) => Err(type_error(name, other)),
            }
        }
        "split" => {
            arity(name, &args, 2)?;
            let (s, sep) = match (&args[0], &args[1]) {
                (Value::Str(s), Value::Str(sep)) => (s, sep),
                _ => {
                    return Err(EvalError::Runtime(
                        "`split` expects (string, string)".to_string(),
                    ));
                }
            };
            // An empty separator splits into characters.
            let values: Vec<Value> = if sep.is_empty() {
                s.chars().map(|c| Value::Str(c.to_string())).collect()
            } else {
                s.split(sep.as_str())
                    .map(|part| Value::Str(part.to_string()))
                    .collect()
            };
            if values.len() > limits.max_collection_len {
                return Err(EvalError::Runtime("result array too large".to_string()));
            }
            Ok(Value::Array(values))
        }
        "join" => {
            arity(name, &args, 2)?;
            let (items, sep) = match (&args[0], &args[1]) {
                (Value::Array(items), Value::Str(sep)) => (items, sep),
                _ => {
                    return Err(EvalError::Runtime(
                        "`join` expects (array, string)".to_string(),
                    ));
                }
            };
            let mut out = String::new();
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(sep);
                }
                match item {
                    Value::Str(s) => out.push_str(s),
                    other => out.push_str(&other.render(limits.max_string_len)),
                }
                if out.len() > limits.max_string_len {
                    return Err(EvalError::Runtime("string too long".to_string()));
                }
            }
            Ok(Value::Str(out))
        }
        "str" => {
            arity(name, &args, 1)?;
            Ok(Value::Str(args[0].render(limits.max_string_len)))
        }
        "num" => {
            arity(name, &args, 1)?;
            let n = match &args[0] {
                Value::Num(n) => *n,
                Value::Str(s) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
                Value::Bool(true) => 1.0,
                Value::Bool(false) => 0.0,
                Value::Null => 0.0,
                _ => f64::NAN,
            };
            Ok(Value::Num(n))
        }
        "typeof" => {
            arity(name, &args, 1)?;
            Ok(Value::Str(args[0].type_name().to_string()))
        }
        _ => Err(EvalError::Runtime(format!(
            "call to undefined function `{name}`"
        ))),
    }
}

fn arity(name: &str, args: &[Value], expected: usize) -> Result<(), EvalError> {
    if args.len() != expected {
        return Err(arity_error(name, &expected.to_string(), args.len()));
    }
    Ok(())
}

fn arity_error(name: &str, expected: &str, got: usize) -> EvalError {
    EvalError::Runtime(format!(
        "`{name}` expects {expected} argument(s), got {got}"
    ))
}

fn type_error(name: &str, got: &Value) -> EvalError {
    EvalError::Runtime(format!(
        "`{name}` does not accept a {} argument",
        got.type_name()
    ))
}

fn num1(name: &str, args: &[Value]) -> Result<f64, EvalError> {
    arity(name, args, 1)?;
    match &args[0] {
        Value::Num(n) => Ok(*n),
        other => Err(type_error(name, other)),
    }
}

fn num2(name: &str, args: &[Value]) -> Result<(f64, f64), EvalError> {
    arity(name, args, 2)?;
    match (&args[0], &args[1]) {
        (Value::Num(a), Value::Num(b)) => Ok((*a, *b)),
        (Value::Num(_), other) | (other, _) => Err(type_error(name, other)),
    }
}

fn str1<'a>(name: &str, args: &'a [Value]) -> Result<&'a str, EvalError> {
    arity(name, args, 1)?;
    match &args[0] {
        Value::Str(s) => Ok(s),
        other => Err(type_error(name, other)),
    }
}

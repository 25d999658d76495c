//! A small JSONLogic-style expression evaluator.
//!
//! Supported operators: `==`, `!=`, `>`, `>=`, `<`, `<=`, `and`, `or`,
//! `not`, `in`, `var`. A rule is a `JsonValue` tree; `var` paths resolve
//! dotted lookups against the evaluation context (`{"var": "resource.owner"}`).
//! This is intentionally a fixed, minimal subset, not a general rule DSL.

use crate::error::{PolicyError, PolicyResult};
use sentinel_types::JsonValue;
use std::time::{Duration, Instant};

/// Evaluate `expr` against `context`, bounded by `budget` wall-clock time.
/// A timeout surfaces as `PolicyError::EvaluationTimeout`, letting the
/// caller apply fail-open/fail-closed policy.
pub fn evaluate(expr: &JsonValue, context: &JsonValue, budget: Duration) -> PolicyResult<bool> {
    let deadline = Instant::now() + budget;
    let value = eval_value(expr, context, deadline)?;
    Ok(truthy(&value))
}

fn eval_value(expr: &JsonValue, context: &JsonValue, deadline: Instant) -> PolicyResult<JsonValue> {
    if Instant::now() > deadline {
        return Err(PolicyError::EvaluationTimeout);
    }

    let obj = match expr {
        JsonValue::Object(map) if map.len() == 1 => map,
        literal => return Ok(literal.clone()),
    };

    let (op, args) = obj.iter().next().expect("checked len == 1 above");

    match op.as_str() {
        "var" => {
            let path = args.as_str().ok_or_else(|| {
                PolicyError::RuleParse("`var` argument must be a string path".to_string())
            })?;
            Ok(resolve_path(context, path).cloned().unwrap_or(JsonValue::Null))
        }
        "and" => {
            for item in as_list(args)? {
                if !truthy(&eval_value(item, context, deadline)?) {
                    return Ok(JsonValue::Bool(false));
                }
            }
            Ok(JsonValue::Bool(true))
        }
        "or" => {
            for item in as_list(args)? {
                if truthy(&eval_value(item, context, deadline)?) {
                    return Ok(JsonValue::Bool(true));
                }
            }
            Ok(JsonValue::Bool(false))
        }
        "not" => {
            let inner = single_arg(args)?;
            Ok(JsonValue::Bool(!truthy(&eval_value(inner, context, deadline)?)))
        }
        "==" => binary(args, context, deadline, |a, b| values_equal(&a, &b)),
        "!=" => binary(args, context, deadline, |a, b| !values_equal(&a, &b)),
        ">" => numeric_binary(args, context, deadline, |a, b| a > b),
        ">=" => numeric_binary(args, context, deadline, |a, b| a >= b),
        "<" => numeric_binary(args, context, deadline, |a, b| a < b),
        "<=" => numeric_binary(args, context, deadline, |a, b| a <= b),
        "in" => {
            let list = as_list(args)?;
            if list.len() != 2 {
                return Err(PolicyError::RuleParse("`in` takes exactly 2 arguments".to_string()));
            }
            let needle = eval_value(&list[0], context, deadline)?;
            let haystack = eval_value(&list[1], context, deadline)?;
            let found = match &haystack {
                JsonValue::Array(items) => items.iter().any(|item| values_equal(item, &needle)),
                JsonValue::String(s) => needle.as_str().map(|n| s.contains(n)).unwrap_or(false),
                _ => false,
            };
            Ok(JsonValue::Bool(found))
        }
        other => Err(PolicyError::RuleParse(format!("unsupported operator `{other}`"))),
    }
}

fn binary(
    args: &JsonValue,
    context: &JsonValue,
    deadline: Instant,
    f: impl Fn(JsonValue, JsonValue) -> bool,
) -> PolicyResult<JsonValue> {
    let list = as_list(args)?;
    if list.len() != 2 {
        return Err(PolicyError::RuleParse("binary operator takes exactly 2 arguments".to_string()));
    }
    let a = eval_value(&list[0], context, deadline)?;
    let b = eval_value(&list[1], context, deadline)?;
    Ok(JsonValue::Bool(f(a, b)))
}

fn numeric_binary(
    args: &JsonValue,
    context: &JsonValue,
    deadline: Instant,
    f: impl Fn(f64, f64) -> bool,
) -> PolicyResult<JsonValue> {
    binary(args, context, deadline, move |a, b| match (to_f64(&a), to_f64(&b)) {
        (Some(a), Some(b)) => f(a, b),
        _ => false,
    })
}

fn single_arg(args: &JsonValue) -> PolicyResult<&JsonValue> {
    match args {
        JsonValue::Array(items) if items.len() == 1 => Ok(&items[0]),
        other => Ok(other),
    }
}

fn as_list(args: &JsonValue) -> PolicyResult<&[JsonValue]> {
    match args {
        JsonValue::Array(items) => Ok(items),
        other => Err(PolicyError::RuleParse(format!(
            "expected an argument array, got {other:?}"
        ))),
    }
}

fn resolve_path<'a>(context: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    if path.is_empty() {
        return Some(context);
    }
    path.split('.').try_fold(context, |value, segment| value.get(segment))
}

fn truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.to_f64().map(|f| f != 0.0).unwrap_or(false),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(a) => !a.is_empty(),
        JsonValue::Object(o) => !o.is_empty(),
    }
}

fn to_f64(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.to_f64(),
        _ => None,
    }
}

fn values_equal(a: &JsonValue, b: &JsonValue) -> bool {
    match (a, b) {
        (JsonValue::Number(a), JsonValue::Number(b)) => a.to_f64() == b.to_f64(),
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn obj(pairs: Vec<(&str, JsonValue)>) -> JsonValue {
        let mut m = BTreeMap::new();
        for (k, v) in pairs {
            m.insert(k.to_string(), v);
        }
        JsonValue::Object(m)
    }

    #[test]
    fn equality_rule_matches_context() {
        let rule = obj(vec![(
            "==",
            JsonValue::Array(vec![
                obj(vec![("var", JsonValue::String("action".into()))]),
                JsonValue::String("memory.delete".into()),
            ]),
        )]);
        let context = obj(vec![("action", JsonValue::String("memory.delete".into()))]);
        assert!(evaluate(&rule, &context, Duration::from_millis(50)).unwrap());
    }

    #[test]
    fn and_short_circuits_on_first_false() {
        let rule = obj(vec![(
            "and",
            JsonValue::Array(vec![JsonValue::Bool(false), JsonValue::Bool(true)]),
        )]);
        assert!(!evaluate(&rule, &JsonValue::Null, Duration::from_millis(50)).unwrap());
    }

    #[test]
    fn numeric_threshold_rule() {
        let rule = obj(vec![(
            ">=",
            JsonValue::Array(vec![
                obj(vec![("var", JsonValue::String("resource.delta".into()))]),
                JsonValue::Number(1000i64.into()),
            ]),
        )]);
        let context = obj(vec![(
            "resource",
            obj(vec![("delta", JsonValue::Number(1500i64.into()))]),
        )]);
        assert!(evaluate(&rule, &context, Duration::from_millis(50)).unwrap());
    }

    #[test]
    fn unsupported_operator_is_a_parse_error() {
        let rule = obj(vec![("xor", JsonValue::Array(vec![]))]);
        let err = evaluate(&rule, &JsonValue::Null, Duration::from_millis(50)).unwrap_err();
        assert!(matches!(err, PolicyError::RuleParse(_)));
    }

    #[test]
    fn dotted_var_path_resolves_nested_context() {
        let rule = obj(vec![("var", JsonValue::String("a.b.c".into()))]);
        let context = obj(vec![("a", obj(vec![("b", obj(vec![("c", JsonValue::Bool(true))]))]))]);
        assert!(evaluate(&rule, &context, Duration::from_millis(50)).unwrap());
    }
}

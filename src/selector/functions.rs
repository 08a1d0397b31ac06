//! Built-in `$functions`.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::SecondsFormat;

use crate::types::Value;

use super::ExprError;
use super::eval::{Eval, Evaluator, Vars, truthy};
use super::parser::Expr;

pub(crate) fn call(
    ev: &Evaluator<'_>,
    name: &str,
    args: &[Expr],
    input: &Value,
    vars: &Vars,
) -> Eval {
    match name {
        "map" | "filter" => higher_order(ev, name, args, input, vars),
        "sum" => {
            let Some(ns) = numbers(name, single(ev, name, args, input, vars)?)? else {
                return Ok(None);
            };
            Ok(Some(Value::Number(ns.iter().sum())))
        }
        "count" => {
            let n = match single(ev, name, args, input, vars)? {
                None => 0,
                Some(Value::Sequence(items)) => items.len(),
                Some(_) => 1,
            };
            Ok(Some(Value::Number(n as f64)))
        }
        "max" | "min" | "average" => {
            let Some(ns) = numbers(name, single(ev, name, args, input, vars)?)? else {
                return Ok(None);
            };
            if ns.is_empty() {
                return Ok(None);
            }
            let n = match name {
                "max" => ns.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                "min" => ns.iter().copied().fold(f64::INFINITY, f64::min),
                _ => ns.iter().sum::<f64>() / ns.len() as f64,
            };
            Ok(Some(Value::Number(n)))
        }
        "string" => Ok(context_arg(ev, name, args, input, vars)?
            .map(|v| Value::String(stringify(&v)))),
        "number" => match context_arg(ev, name, args, input, vars)? {
            None => Ok(None),
            Some(Value::Number(n)) => Ok(Some(Value::Number(n))),
            Some(Value::Bool(b)) => Ok(Some(Value::Number(if b { 1.0 } else { 0.0 }))),
            Some(Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(|n| Some(Value::Number(n)))
                .ok_or_else(|| ExprError::Type(format!("unable to cast '{s}' to a number"))),
            Some(other) => Err(ExprError::Type(format!(
                "unable to cast a {} to a number",
                other.kind_name()
            ))),
        },
        "boolean" => Ok(context_arg(ev, name, args, input, vars)?
            .map(|v| Value::Bool(truthy(Some(&v))))),
        "not" => Ok(context_arg(ev, name, args, input, vars)?
            .map(|v| Value::Bool(!truthy(Some(&v))))),
        "exists" => {
            arity(name, args, 1, 1)?;
            Ok(Some(Value::Bool(ev.eval(&args[0], input, vars)?.is_some())))
        }
        "length" | "uppercase" | "lowercase" => {
            let s = match context_arg(ev, name, args, input, vars)? {
                None => return Ok(None),
                Some(Value::String(s)) => s,
                Some(other) => {
                    return Err(ExprError::Type(format!(
                        "${name} expects a string, got {}",
                        other.kind_name()
                    )));
                }
            };
            Ok(Some(match name {
                "length" => Value::Number(s.chars().count() as f64),
                "uppercase" => Value::String(s.to_uppercase()),
                _ => Value::String(s.to_lowercase()),
            }))
        }
        "keys" => {
            let keys: BTreeSet<String> = match single(ev, name, args, input, vars)? {
                Some(Value::Mapping(map)) => map.into_keys().collect(),
                Some(Value::Sequence(items)) => items
                    .iter()
                    .filter_map(|item| match item {
                        Value::Mapping(map) => Some(map.keys().cloned()),
                        _ => None,
                    })
                    .flatten()
                    .collect(),
                _ => return Ok(None),
            };
            if keys.is_empty() {
                return Ok(None);
            }
            Ok(Some(Value::Sequence(keys.into_iter().map(Value::String).collect())))
        }
        "join" => {
            arity(name, args, 1, 2)?;
            let separator = match args.get(1) {
                None => String::new(),
                Some(expr) => match ev.eval(expr, input, vars)? {
                    Some(Value::String(s)) => s,
                    _ => return Err(ExprError::Type("$join separator must be a string".to_string())),
                },
            };
            let parts = match ev.eval(&args[0], input, vars)? {
                None => return Ok(None),
                Some(Value::String(s)) => vec![s],
                Some(Value::Sequence(items)) => items
                    .into_iter()
                    .map(|item| match item {
                        Value::String(s) => Ok(s),
                        other => Err(ExprError::Type(format!(
                            "$join expects strings, got {}",
                            other.kind_name()
                        ))),
                    })
                    .collect::<Result<Vec<_>, _>>()?,
                Some(other) => {
                    return Err(ExprError::Type(format!(
                        "$join expects strings, got {}",
                        other.kind_name()
                    )));
                }
            };
            Ok(Some(Value::String(parts.join(&separator))))
        }
        other => Err(ExprError::UnknownFunction(other.to_string())),
    }
}

/// `$map(array, function($v, $i, $a) {...})` and `$filter(...)`.
fn higher_order(ev: &Evaluator<'_>, name: &str, args: &[Expr], input: &Value, vars: &Vars) -> Eval {
    arity(name, args, 2, 2)?;
    let Expr::Lambda(params, body) = &args[1] else {
        return Err(ExprError::Type(format!("${name} expects a function as its second argument")));
    };
    let items = match ev.eval(&args[0], input, vars)? {
        None => return Ok(None),
        Some(Value::Sequence(items)) => items,
        Some(other) => vec![other],
    };

    // The whole array is only materialized for lambdas that declare `$a`.
    let array = (params.len() >= 3).then(|| Arc::new(Value::Sequence(items.clone())));
    let mut out = Vec::new();
    for (i, item) in items.into_iter().enumerate() {
        let item = Arc::new(item);
        let mut scope = vars.clone();
        if let Some(p) = params.first() {
            scope = scope.bind(p, Arc::clone(&item));
        }
        if let Some(p) = params.get(1) {
            scope = scope.bind(p, Arc::new(Value::Number(i as f64)));
        }
        if let (Some(p), Some(array)) = (params.get(2), &array) {
            scope = scope.bind(p, Arc::clone(array));
        }
        let result = ev.eval(body, input, &scope)?;
        drop(scope);
        if name == "map" {
            out.extend(result);
        } else if truthy(result.as_ref()) {
            out.push(Arc::try_unwrap(item).unwrap_or_else(|shared| (*shared).clone()));
        }
    }
    Ok(Some(Value::Sequence(out)))
}

fn arity(name: &str, args: &[Expr], min: usize, max: usize) -> Result<(), ExprError> {
    if (min..=max).contains(&args.len()) {
        Ok(())
    } else {
        Err(ExprError::Type(format!(
            "${name} takes {min}..={max} arguments, got {}",
            args.len()
        )))
    }
}

fn single(ev: &Evaluator<'_>, name: &str, args: &[Expr], input: &Value, vars: &Vars) -> Eval {
    arity(name, args, 1, 1)?;
    ev.eval(&args[0], input, vars)
}

/// Single argument, defaulting to the context item when omitted.
fn context_arg(ev: &Evaluator<'_>, name: &str, args: &[Expr], input: &Value, vars: &Vars) -> Eval {
    if args.is_empty() {
        return Ok(Some(input.clone()));
    }
    single(ev, name, args, input, vars)
}

fn numbers(name: &str, value: Option<Value>) -> Result<Option<Vec<f64>>, ExprError> {
    let items = match value {
        None => return Ok(None),
        Some(Value::Sequence(items)) => items,
        Some(other) => vec![other],
    };
    items
        .into_iter()
        .map(|v| match v {
            Value::Number(n) => Ok(n),
            other => Err(ExprError::Type(format!(
                "${name} expects numbers, got {}",
                other.kind_name()
            ))),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

/// Text form used by `$string` and `&`.
pub(crate) fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(_) | Value::Sequence(_) | Value::Mapping(_) | Value::Null => value.to_json_string(),
        Value::Bool(b) => b.to_string(),
        Value::Timestamp(t) => t.to_rfc3339_opts(SecondsFormat::AutoSi, true),
    }
}

#[cfg(test)]
mod tests {
    use crate::selector::{ExprError, ExpressionEvaluator, PathEvaluator};
    use crate::types::Value;

    fn run(expr: &str, doc: serde_json::Value) -> Result<Option<Value>, ExprError> {
        ExpressionEvaluator.evaluate(&Value::from(doc), expr)
    }

    fn library() -> serde_json::Value {
        serde_json::json!({"library": {"books": [
            {"title": "A", "price": 10, "tags": ["x", "y"]},
            {"title": "B", "price": 25.5, "tags": ["y"]},
            {"title": "C", "price": 4.5, "tags": []}
        ]}})
    }

    #[test]
    fn aggregates() {
        assert_eq!(run("$sum(library.books.price)", library()).unwrap(), Some(Value::Number(40.0)));
        assert_eq!(run("$count(library.books)", library()).unwrap(), Some(Value::Number(3.0)));
        assert_eq!(run("$max(library.books.price)", library()).unwrap(), Some(Value::Number(25.5)));
        assert_eq!(run("$min(library.books.price)", library()).unwrap(), Some(Value::Number(4.5)));
        assert_eq!(
            run("$average([1, 2, 6])", serde_json::json!({})).unwrap(),
            Some(Value::Number(3.0))
        );
        assert_eq!(run("$count(nothing)", library()).unwrap(), Some(Value::Number(0.0)));
        assert_eq!(run("$sum(nothing)", library()).unwrap(), None);
    }

    #[test]
    fn map_with_lambda_builds_rows() {
        let v = run(
            r#"$map(library.books, function($v, $i) { return {"title": $v.title, "pos": $i} })"#,
            library(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            v.to_json_string(),
            r#"[{"pos":0,"title":"A"},{"pos":1,"title":"B"},{"pos":2,"title":"C"}]"#
        );
    }

    #[test]
    fn filter_with_lambda_keeps_items() {
        let v = run("$filter(library.books, function($b) { $b.price > 5 }).title", library())
            .unwrap()
            .unwrap();
        assert_eq!(v, Value::Sequence(vec![Value::from("A"), Value::from("B")]));
    }

    #[test]
    fn lambda_sees_array_and_outer_bindings() {
        let v = run(
            "$map(library.books, function($b, $i, $all) { $count($all) - $i })",
            library(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(v.to_json_string(), "[3,2,1]");

        let v = run(
            "$map(library.books, function($b) { $count($filter($b.tags, function($t) { $b.price > 5 })) })",
            library(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(v.to_json_string(), "[2,1,0]");
    }

    #[test]
    fn inner_lambda_parameter_shadows_outer() {
        let v = run(
            "$map([1, 2], function($v) { $map([10], function($v) { $v }) })",
            serde_json::json!({}),
        )
        .unwrap()
        .unwrap();
        assert_eq!(v.to_json_string(), "[10,10]");
    }

    #[test]
    fn conversions() {
        let doc = serde_json::json!({"n": 12, "s": " 3.5 ", "f": 0.25, "b": true});
        assert_eq!(run("$string(n)", doc.clone()).unwrap(), Some(Value::from("12")));
        assert_eq!(run("$string(f)", doc.clone()).unwrap(), Some(Value::from("0.25")));
        assert_eq!(run("$number(s)", doc.clone()).unwrap(), Some(Value::Number(3.5)));
        assert_eq!(run("$boolean(n)", doc.clone()).unwrap(), Some(Value::Bool(true)));
        assert_eq!(run("$not(b)", doc.clone()).unwrap(), Some(Value::Bool(false)));
        assert_eq!(run("$exists(zzz)", doc.clone()).unwrap(), Some(Value::Bool(false)));
        assert!(run("$number(b.x)", doc).unwrap().is_none());
    }

    #[test]
    fn strings_and_keys() {
        let doc = serde_json::json!({"name": "Ada", "rows": [{"b": 1}, {"a": 2}]});
        assert_eq!(run("$uppercase(name)", doc.clone()).unwrap(), Some(Value::from("ADA")));
        assert_eq!(run("$length(name)", doc.clone()).unwrap(), Some(Value::Number(3.0)));
        assert_eq!(
            run("$join($keys(rows), ',')", doc).unwrap(),
            Some(Value::from("a,b"))
        );
    }

    #[test]
    fn unknown_functions_and_bad_arguments_fail() {
        assert_eq!(
            run("$nope(1)", serde_json::json!({})),
            Err(ExprError::UnknownFunction("nope".to_string()))
        );
        assert!(run("$sum('a')", serde_json::json!({})).is_err());
        assert!(run("$map([1], 2)", serde_json::json!({})).is_err());
    }
}

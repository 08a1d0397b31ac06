//! Tree-walking evaluator.
//!
//! `None` stands for an undefined result (nothing matched). Path steps after the first run once
//! per item of the previous result and their results are flattened one level; mapping over an
//! empty sequence yields an empty sequence, while mapping that matches nothing is undefined.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::types::Value;

use super::ExprError;
use super::functions;
use super::parser::{BinOp, Expr};

pub(crate) type Eval = Result<Option<Value>, ExprError>;

/// Lexically scoped variable bindings; the innermost binding wins.
///
/// Scopes form a shared chain, so binding a variable never copies the enclosing scope or the
/// bound value.
#[derive(Debug, Clone, Default)]
pub(crate) struct Vars(Option<Arc<Scope>>);

#[derive(Debug)]
struct Scope {
    name: String,
    value: Arc<Value>,
    parent: Vars,
}

impl Vars {
    fn lookup(&self, name: &str) -> Option<&Value> {
        let mut scope = self.0.as_deref();
        while let Some(s) = scope {
            if s.name == name {
                return Some(s.value.as_ref());
            }
            scope = s.parent.0.as_deref();
        }
        None
    }

    pub(crate) fn bind(&self, name: &str, value: Arc<Value>) -> Vars {
        Vars(Some(Arc::new(Scope {
            name: name.to_string(),
            value,
            parent: self.clone(),
        })))
    }
}

pub(crate) struct Evaluator<'a> {
    root: &'a Value,
}

pub(crate) fn evaluate(expr: &Expr, document: &Value) -> Eval {
    Evaluator { root: document }.eval(expr, document, &Vars::default())
}

impl Evaluator<'_> {
    pub(crate) fn eval(&self, expr: &Expr, input: &Value, vars: &Vars) -> Eval {
        match expr {
            Expr::Field(name) => Ok(field(input, name)),
            Expr::Wildcard => Ok(wildcard(input)),
            Expr::Index(i) => Ok(index(input, *i)),
            Expr::Variable(name) => Ok(match name.as_str() {
                "" => Some(input.clone()),
                "$" => Some(self.root.clone()),
                other => vars.lookup(other).cloned(),
            }),
            Expr::Number(n) => Ok(Some(Value::Number(*n))),
            Expr::Str(s) => Ok(Some(Value::String(s.clone()))),
            Expr::Bool(b) => Ok(Some(Value::Bool(*b))),
            Expr::Null => Ok(Some(Value::Null)),
            Expr::Path(steps) => self.path(steps, input, vars),
            Expr::Filter(base, predicate) => self.filter(base, predicate, input, vars),
            Expr::Negate(inner) => match self.eval(inner, input, vars)? {
                None => Ok(None),
                Some(Value::Number(n)) => Ok(Some(Value::Number(-n))),
                Some(other) => Err(ExprError::Type(format!(
                    "cannot negate a {}",
                    other.kind_name()
                ))),
            },
            Expr::Binary(op, lhs, rhs) => self.binary(*op, lhs, rhs, input, vars),
            Expr::Condition(cond, then, otherwise) => {
                if truthy(self.eval(cond, input, vars)?.as_ref()) {
                    self.eval(then, input, vars)
                } else if let Some(otherwise) = otherwise {
                    self.eval(otherwise, input, vars)
                } else {
                    Ok(None)
                }
            }
            Expr::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    if let Some(v) = self.eval(item, input, vars)? {
                        out.push(v);
                    }
                }
                Ok(Some(Value::Sequence(out)))
            }
            Expr::Object(pairs) => {
                let mut out = BTreeMap::new();
                for (key, value) in pairs {
                    let key = match self.eval(key, input, vars)? {
                        Some(Value::String(k)) => k,
                        other => {
                            return Err(ExprError::Type(format!(
                                "object key must be a string, got {}",
                                other.as_ref().map_or("undefined", Value::kind_name)
                            )));
                        }
                    };
                    if let Some(v) = self.eval(value, input, vars)? {
                        out.insert(key, v);
                    }
                }
                Ok(Some(Value::Mapping(out)))
            }
            Expr::Call(name, args) => functions::call(self, name, args, input, vars),
            Expr::Lambda(..) => Err(ExprError::Type(
                "a function can only be used as an argument of $map or $filter".to_string(),
            )),
        }
    }

    fn path(&self, steps: &[Expr], input: &Value, vars: &Vars) -> Eval {
        let Some((first, rest)) = steps.split_first() else {
            return Ok(None);
        };
        let mut current = self.eval(first, input, vars)?;
        for step in rest {
            let Some(value) = current else {
                return Ok(None);
            };
            current = match (&value, step) {
                (_, Expr::Index(i)) => index(&value, *i),
                (Value::Sequence(items), _) => {
                    map_sequence(items, |item| self.eval(step, item, vars))?
                }
                _ => self.eval(step, &value, vars)?,
            };
        }
        Ok(current)
    }

    fn filter(&self, base: &Expr, predicate: &Expr, input: &Value, vars: &Vars) -> Eval {
        let Some(base) = self.eval(base, input, vars)? else {
            return Ok(None);
        };
        let items = match base {
            Value::Sequence(items) => items,
            other => vec![other],
        };

        let len = items.len() as f64;
        let mut indexed = false;
        let mut matches = Vec::new();
        for (i, item) in items.into_iter().enumerate() {
            let keep = match self.eval(predicate, &item, vars)? {
                Some(Value::Number(n)) => {
                    indexed = true;
                    let n = n.floor();
                    let target = if n < 0.0 { len + n } else { n };
                    target == i as f64
                }
                other => truthy(other.as_ref()),
            };
            if keep {
                matches.push(item);
            }
        }

        Ok(match matches.len() {
            0 => None,
            1 if indexed => matches.pop(),
            _ => Some(Value::Sequence(matches)),
        })
    }

    fn binary(&self, op: BinOp, lhs: &Expr, rhs: &Expr, input: &Value, vars: &Vars) -> Eval {
        match op {
            BinOp::And => {
                let l = truthy(self.eval(lhs, input, vars)?.as_ref());
                let result = l && truthy(self.eval(rhs, input, vars)?.as_ref());
                return Ok(Some(Value::Bool(result)));
            }
            BinOp::Or => {
                let l = truthy(self.eval(lhs, input, vars)?.as_ref());
                let result = l || truthy(self.eval(rhs, input, vars)?.as_ref());
                return Ok(Some(Value::Bool(result)));
            }
            _ => {}
        }

        let l = self.eval(lhs, input, vars)?;
        let r = self.eval(rhs, input, vars)?;
        match op {
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => arithmetic(op, l, r),
            BinOp::Concat => {
                let mut s = l.as_ref().map(functions::stringify).unwrap_or_default();
                s.push_str(&r.as_ref().map(functions::stringify).unwrap_or_default());
                Ok(Some(Value::String(s)))
            }
            BinOp::Eq | BinOp::Ne => {
                let equal = match (&l, &r) {
                    (Some(a), Some(b)) => a == b,
                    _ => return Ok(Some(Value::Bool(false))),
                };
                Ok(Some(Value::Bool(if op == BinOp::Eq { equal } else { !equal })))
            }
            _ => compare(op, l, r),
        }
    }
}

fn arithmetic(op: BinOp, l: Option<Value>, r: Option<Value>) -> Eval {
    let (a, b) = match (l, r) {
        (None, _) | (_, None) => return Ok(None),
        (Some(Value::Number(a)), Some(Value::Number(b))) => (a, b),
        (Some(a), Some(b)) => {
            return Err(ExprError::Type(format!(
                "arithmetic needs numbers, got {} and {}",
                a.kind_name(),
                b.kind_name()
            )));
        }
    };
    let n = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => a / b,
        _ => a % b,
    };
    if n.is_finite() {
        Ok(Some(Value::Number(n)))
    } else {
        Err(ExprError::Type("arithmetic result is out of range".to_string()))
    }
}

fn compare(op: BinOp, l: Option<Value>, r: Option<Value>) -> Eval {
    let ordering = match (&l, &r) {
        (None, _) | (_, None) => return Ok(Some(Value::Bool(false))),
        (Some(Value::Number(a)), Some(Value::Number(b))) => a.partial_cmp(b),
        (Some(Value::String(a)), Some(Value::String(b))) => Some(a.cmp(b)),
        (Some(a), Some(b)) => {
            return Err(ExprError::Type(format!(
                "cannot compare {} with {}",
                a.kind_name(),
                b.kind_name()
            )));
        }
    };
    let Some(ordering) = ordering else {
        return Ok(Some(Value::Bool(false)));
    };
    let result = match op {
        BinOp::Lt => ordering.is_lt(),
        BinOp::Le => ordering.is_le(),
        BinOp::Gt => ordering.is_gt(),
        _ => ordering.is_ge(),
    };
    Ok(Some(Value::Bool(result)))
}

/// Apply `f` to every item, flattening sequence results one level.
pub(crate) fn map_sequence<F>(items: &[Value], mut f: F) -> Eval
where
    F: FnMut(&Value) -> Eval,
{
    if items.is_empty() {
        return Ok(Some(Value::Sequence(Vec::new())));
    }
    let mut out = Vec::new();
    for item in items {
        match f(item)? {
            Some(Value::Sequence(inner)) => out.extend(inner),
            Some(v) => out.push(v),
            None => {}
        }
    }
    Ok((!out.is_empty()).then_some(Value::Sequence(out)))
}

fn field(input: &Value, name: &str) -> Option<Value> {
    match input {
        Value::Mapping(map) => map.get(name).cloned(),
        Value::Sequence(items) => map_sequence(items, |item| Ok(field(item, name))).ok().flatten(),
        _ => None,
    }
}

fn wildcard(input: &Value) -> Option<Value> {
    match input {
        Value::Mapping(map) => {
            let mut out = Vec::new();
            for v in map.values() {
                match v {
                    Value::Sequence(inner) => out.extend(inner.iter().cloned()),
                    other => out.push(other.clone()),
                }
            }
            (!out.is_empty()).then_some(Value::Sequence(out))
        }
        Value::Sequence(items) => map_sequence(items, |item| Ok(wildcard(item))).ok().flatten(),
        _ => None,
    }
}

fn index(input: &Value, i: usize) -> Option<Value> {
    match input {
        Value::Sequence(items) => items.get(i).cloned(),
        _ => None,
    }
}

/// Boolean interpretation of a result; undefined is false.
pub(crate) fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => *n != 0.0,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Timestamp(_)) => true,
        Some(Value::Sequence(items)) => items.iter().any(|v| truthy(Some(v))),
        Some(Value::Mapping(map)) => !map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::parser::parse;

    fn run(expr: &str, doc: serde_json::Value) -> Option<Value> {
        evaluate(&parse(expr).unwrap(), &Value::from(doc)).unwrap()
    }

    #[test]
    fn paths_flatten_across_sequences() {
        let doc = serde_json::json!({"a": [{"b": [1, 2]}, {"b": 3}, {"c": 4}]});
        assert_eq!(
            run("a.b", doc),
            Some(Value::Sequence(vec![
                Value::Number(1.0),
                Value::Number(2.0),
                Value::Number(3.0)
            ]))
        );
    }

    #[test]
    fn unmatched_paths_are_undefined() {
        assert_eq!(run("a.missing", serde_json::json!({"a": [{"b": 1}]})), None);
        assert_eq!(run("nope", serde_json::json!({"a": 1})), None);
    }

    #[test]
    fn empty_arrays_stay_empty() {
        assert_eq!(
            run("users", serde_json::json!({"users": []})),
            Some(Value::Sequence(vec![]))
        );
    }

    #[test]
    fn index_and_predicate_filters() {
        let doc = serde_json::json!({"xs": [{"n": 1}, {"n": 5}, {"n": 9}]});
        assert_eq!(run("xs[1].n", doc.clone()), Some(Value::Number(5.0)));
        assert_eq!(run("xs[-1].n", doc.clone()), Some(Value::Number(9.0)));
        assert_eq!(
            run("xs[n > 2].n", doc.clone()),
            Some(Value::Sequence(vec![Value::Number(5.0), Value::Number(9.0)]))
        );
        assert_eq!(run("xs[n > 100]", doc), None);
    }

    #[test]
    fn operators() {
        let doc = serde_json::json!({"a": 6, "b": 4, "s": "x"});
        assert_eq!(run("a * b - 4", doc.clone()), Some(Value::Number(20.0)));
        assert_eq!(run("a % b", doc.clone()), Some(Value::Number(2.0)));
        assert_eq!(run("s & '-' & a", doc.clone()), Some(Value::from("x-6")));
        assert_eq!(run("a > b and s = 'x'", doc.clone()), Some(Value::Bool(true)));
        assert_eq!(run("a < b or missing", doc.clone()), Some(Value::Bool(false)));
        assert_eq!(run("a > 5 ? 'big' : 'small'", doc), Some(Value::from("big")));
    }

    #[test]
    fn arithmetic_on_strings_is_a_type_error() {
        let expr = parse("s + 1").unwrap();
        let doc = Value::from(serde_json::json!({"s": "x"}));
        assert!(matches!(evaluate(&expr, &doc), Err(ExprError::Type(_))));
    }

    #[test]
    fn constructors_and_root_variable() {
        let doc = serde_json::json!({"k": "v", "xs": [{"n": 1}]});
        assert_eq!(
            run("xs.{'n': n, 'k': $$.k}", doc).map(|v| v.to_json_string()),
            Some(r#"[{"k":"v","n":1}]"#.to_string())
        );
    }

    #[test]
    fn wildcard_collects_values() {
        assert_eq!(
            run("*", serde_json::json!({"a": 1, "b": [2, 3]})),
            Some(Value::Sequence(vec![
                Value::Number(1.0),
                Value::Number(2.0),
                Value::Number(3.0)
            ]))
        );
    }
}

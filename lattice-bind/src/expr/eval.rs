//! Tree-walking evaluator.

use std::cmp::Ordering;
use std::rc::Rc;

use super::ast::{BinaryOp, Expr, FunctionDef, LogicalOp, Stmt, UnaryOp};
use super::{ExprError, LocalScope, Scope};
use crate::value::{Function, Value};

/// Evaluate an expression tree in `scope`.
pub fn eval(expr: &Expr, scope: &Rc<dyn Scope>) -> Result<Value, ExprError> {
    match expr {
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Str(s) => Ok(Value::String(s.clone())),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Null => Ok(Value::Null),
        Expr::Undefined => Ok(Value::Undefined),
        Expr::Ident(name) => resolve(name, scope),
        Expr::Array(items) => {
            let values = items
                .iter()
                .map(|item| eval(item, scope))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::array(values))
        }
        Expr::Object(entries) => {
            let mut values = Vec::with_capacity(entries.len());
            for (key, value) in entries {
                values.push((key.clone(), eval(value, scope)?));
            }
            Ok(Value::object(values))
        }
        Expr::Member(base, name) => {
            let base = eval(base, scope)?;
            read_property(&base, name)
        }
        Expr::Index(base, index) => {
            let base = eval(base, scope)?;
            let key = property_key(&eval(index, scope)?);
            read_property(&base, &key)
        }
        Expr::Call(callee, args) => {
            let function = eval(callee, scope)?;
            let args = args
                .iter()
                .map(|arg| eval(arg, scope))
                .collect::<Result<Vec<_>, _>>()?;
            match function {
                Value::Function(_) | Value::Deferred(_) | Value::Observable(_) | Value::Computed(_) => {
                    function.call(&args)
                }
                _ => Err(ExprError::NotCallable(describe(callee))),
            }
        }
        Expr::Unary(op, operand) => {
            let value = eval(operand, scope)?;
            Ok(match op {
                UnaryOp::Not => Value::Bool(!value.is_truthy()),
                UnaryOp::Neg => Value::Number(-value.to_number()),
                UnaryOp::Plus => Value::Number(value.to_number()),
            })
        }
        Expr::Binary(op, left, right) => {
            let left = eval(left, scope)?;
            let right = eval(right, scope)?;
            Ok(binary(*op, &left, &right))
        }
        Expr::Logical(op, left, right) => {
            let left = eval(left, scope)?;
            match (op, left.is_truthy()) {
                (LogicalOp::And, false) | (LogicalOp::Or, true) => Ok(left),
                _ => eval(right, scope),
            }
        }
        Expr::Conditional(condition, then, otherwise) => {
            if eval(condition, scope)?.is_truthy() {
                eval(then, scope)
            } else {
                eval(otherwise, scope)
            }
        }
        Expr::Assign(target, value) => {
            let value = eval(value, scope)?;
            assign(target, value.clone(), scope)?;
            Ok(value)
        }
        Expr::Function(def) => Ok(make_function(def.clone(), scope.clone())),
    }
}

fn resolve(name: &str, scope: &Rc<dyn Scope>) -> Result<Value, ExprError> {
    if let Some(value) = scope.lookup(name) {
        return Ok(value);
    }
    match name {
        "$lazy" => Ok(Value::function(|args| {
            Ok(match args.first() {
                Some(Value::Function(f)) => Value::Deferred(f.clone()),
                Some(other) => other.clone(),
                None => Value::Undefined,
            })
        })),
        _ => Err(ExprError::UnknownIdentifier(name.to_string())),
    }
}

fn read_property(base: &Value, name: &str) -> Result<Value, ExprError> {
    match base {
        Value::Undefined => Err(ExprError::PropertyOfNullish {
            property: name.to_string(),
            base: "undefined",
        }),
        Value::Null => Err(ExprError::PropertyOfNullish {
            property: name.to_string(),
            base: "null",
        }),
        _ => Ok(base.get(name)),
    }
}

fn property_key(index: &Value) -> String {
    index.to_string()
}

fn assign(target: &Expr, value: Value, scope: &Rc<dyn Scope>) -> Result<(), ExprError> {
    let stored = match target {
        Expr::Ident(name) => scope.assign(name, value),
        Expr::Member(base, name) => {
            let base = eval(base, scope)?;
            read_property(&base, name)?;
            base.set(name, value)
        }
        Expr::Index(base, index) => {
            let base = eval(base, scope)?;
            let key = property_key(&eval(index, scope)?);
            read_property(&base, &key)?;
            base.set(&key, value)
        }
        _ => false,
    };
    if stored {
        Ok(())
    } else {
        Err(ExprError::InvalidAssignment)
    }
}

fn make_function(def: Rc<FunctionDef>, closure: Rc<dyn Scope>) -> Value {
    Value::Function(Function::new(move |args| {
        let locals = LocalScope::new(Some(closure.clone()));
        for (i, param) in def.params.iter().enumerate() {
            locals.define(param.clone(), args.get(i).cloned().unwrap_or_default());
        }
        let locals: Rc<dyn Scope> = Rc::new(locals);

        for stmt in &def.body {
            match stmt {
                Stmt::Expr(expr) => {
                    eval(expr, &locals)?;
                }
                Stmt::Return(Some(expr)) => return eval(expr, &locals),
                Stmt::Return(None) => return Ok(Value::Undefined),
            }
        }
        Ok(Value::Undefined)
    }))
}

fn to_primitive(value: &Value) -> Value {
    match value {
        Value::Array(_) | Value::Object(_) | Value::Function(_) | Value::Node(_) => {
            Value::String(value.to_string())
        }
        other => other.clone(),
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOp::Add => {
            let (left, right) = (to_primitive(left), to_primitive(right));
            if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
                Value::String(format!("{left}{right}"))
            } else {
                Value::Number(left.to_number() + right.to_number())
            }
        }
        BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
        BinaryOp::Mod => Value::Number(left.to_number() % right.to_number()),
        BinaryOp::LooseEq => Value::Bool(left.loose_eq(right)),
        BinaryOp::LooseNe => Value::Bool(!left.loose_eq(right)),
        BinaryOp::StrictEq => Value::Bool(left.strict_eq(right)),
        BinaryOp::StrictNe => Value::Bool(!left.strict_eq(right)),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = compare(&to_primitive(left), &to_primitive(right));
            Value::Bool(match (op, ordering) {
                (_, None) => false,
                (BinaryOp::Lt, Some(o)) => o == Ordering::Less,
                (BinaryOp::Le, Some(o)) => o != Ordering::Greater,
                (BinaryOp::Gt, Some(o)) => o == Ordering::Greater,
                (_, Some(o)) => o != Ordering::Less,
            })
        }
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => left.to_number().partial_cmp(&right.to_number()),
    }
}

/// Human-readable name of a callee for error messages.
fn describe(expr: &Expr) -> String {
    match expr {
        Expr::Ident(name) => name.clone(),
        Expr::Member(base, name) => format!("{}.{name}", describe(base)),
        Expr::Index(base, _) => format!("{}[...]", describe(base)),
        Expr::Call(callee, _) => format!("{}(...)", describe(callee)),
        _ => "expression".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parse;

    fn run(source: &str, scope: &Rc<dyn Scope>) -> Result<Value, ExprError> {
        eval(&parse(source)?, scope)
    }

    fn empty() -> Rc<dyn Scope> {
        Rc::new(LocalScope::new(None))
    }

    #[test]
    fn calling_non_function_names_the_callee() {
        let scope: Rc<dyn Scope> = Rc::new(LocalScope::new(None).with("user", Value::object([("name", Value::from("x"))])));
        assert_eq!(
            run("user.name()", &scope),
            Err(ExprError::NotCallable("user.name".to_string()))
        );
    }

    #[test]
    fn observables_are_callable() {
        let cell = Value::observable(Value::from(1));
        let scope: Rc<dyn Scope> = Rc::new(LocalScope::new(None).with("count", cell.clone()));
        run("count(count() + 1)", &scope).unwrap();
        assert_eq!(cell.unwrap_observable().unwrap(), Value::from(2));
    }

    #[test]
    fn index_assignment_writes_arrays() {
        let items = Value::array([Value::from(1), Value::from(2)]);
        let scope: Rc<dyn Scope> = Rc::new(LocalScope::new(None).with("items", items.clone()));
        run("items[1] = 'b'", &scope).unwrap();
        assert_eq!(items.get("1"), Value::from("b"));
        assert_eq!(run("items.length", &scope).unwrap(), Value::from(2));
    }

    #[test]
    fn comparisons_follow_operand_types() {
        assert_eq!(run("'b' > 'a'", &empty()).unwrap(), Value::from(true));
        assert_eq!(run("'10' < 9", &empty()).unwrap(), Value::from(false));
        assert_eq!(run("undefined < 1", &empty()).unwrap(), Value::from(false));
    }

    #[test]
    fn function_parameters_shadow_outer_names() {
        let scope: Rc<dyn Scope> = Rc::new(LocalScope::new(None).with("x", Value::from(1)));
        let f = run("function(x){ return x * 10 }", &scope).unwrap();
        assert_eq!(f.call(&[Value::from(5)]).unwrap(), Value::from(50));
        assert_eq!(f.call(&[]).unwrap().to_string(), "NaN");
    }
}

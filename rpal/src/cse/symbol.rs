use std::fmt::{self, Display, Formatter};
use std::rc::Rc;

use num_bigint::BigInt;

use super::builtins::BuiltinEvaluation;
use super::ops::{BinaryOp, UnaryOp};
use crate::tree::escape;

/// A compiled block of control symbols.
#[derive(Clone, Debug, PartialEq)]
pub struct Delta {
    pub index: usize,
    pub body: Vec<Symbol>,
}

/// A lambda together with the environment it was evaluated in. `env` is only
/// meaningful once the closure has been pushed onto the stack.
#[derive(Clone, Debug, PartialEq)]
pub struct Closure {
    pub index: usize,
    /// Empty for a `()` parameter list, more than one for a tuple pattern.
    pub params: Vec<String>,
    pub body: Rc<Delta>,
    pub env: usize,
}

/// Everything that can sit on the control or on the stack.
#[derive(Clone, Debug, PartialEq)]
pub enum Symbol {
    Id(String),
    Int(BigInt),
    Str(String),
    Bool(bool),
    Dummy,
    Tuple(Rc<Vec<Symbol>>),
    Lambda(Closure),
    Eta(Closure),
    Delta(Rc<Delta>),
    /// The guard of a conditional.
    BBlock(Rc<Vec<Symbol>>),
    Beta,
    Tau(usize),
    Gamma,
    Unary(UnaryOp),
    Binary(BinaryOp),
    YStar,
    /// Environment marker, on the control as the closer of a call and on the
    /// stack beneath the call's result.
    Env(usize),
    Builtin(BuiltinEvaluation),
    /// Placeholder for an identifier nothing binds.
    Error(String),
}

impl Symbol {
    pub fn nil() -> Symbol {
        Symbol::Tuple(Rc::new(vec![]))
    }

    pub fn tuple(items: Vec<Symbol>) -> Symbol {
        Symbol::Tuple(Rc::new(items))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Symbol::Id(_) => "Id",
            Symbol::Int(_) => "Int",
            Symbol::Str(_) => "Str",
            Symbol::Bool(_) => "Bool",
            Symbol::Dummy => "Dummy",
            Symbol::Tuple(_) => "Tuple",
            Symbol::Lambda(_) => "Lambda",
            Symbol::Eta(_) => "Eta",
            Symbol::Delta(_) => "Delta",
            Symbol::BBlock(_) => "BBlock",
            Symbol::Beta => "Beta",
            Symbol::Tau(_) => "Tau",
            Symbol::Gamma => "Gamma",
            Symbol::Unary(_) => "UnaryOp",
            Symbol::Binary(_) => "BinaryOp",
            Symbol::YStar => "YStar",
            Symbol::Env(_) => "Env",
            Symbol::Builtin(_) => "Builtin",
            Symbol::Error(_) => "Error",
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Symbol::Lambda(_) | Symbol::Eta(_) | Symbol::Builtin(_))
    }

    /// Structural equality as seen by `eq` and `ne`. `None` when the two
    /// values cannot be compared at all.
    pub fn equals(&self, other: &Symbol) -> Option<bool> {
        match (self, other) {
            (Symbol::Int(a), Symbol::Int(b)) => Some(a == b),
            (Symbol::Str(a), Symbol::Str(b)) => Some(a == b),
            (Symbol::Bool(a), Symbol::Bool(b)) => Some(a == b),
            (Symbol::Dummy, Symbol::Dummy) => Some(true),
            (Symbol::Tuple(a), Symbol::Tuple(b)) => {
                if a.len() != b.len() {
                    return Some(false);
                }
                for (x, y) in a.iter().zip(b.iter()) {
                    if x.is_function() || y.is_function() {
                        return None;
                    }
                    if x.equals(y) != Some(true) {
                        return Some(false);
                    }
                }
                Some(true)
            }
            _ => None,
        }
    }

    /// The final answer as shown to the user. A `dummy` answer, such as the
    /// result of `Print`, shows as nothing.
    pub fn answer(&self) -> String {
        match self {
            Symbol::Dummy => String::new(),
            value => value.format(),
        }
    }

    /// The text `Print` writes.
    pub fn format(&self) -> String {
        match self {
            Symbol::Int(value) => value.to_string(),
            Symbol::Str(value) => value.clone(),
            Symbol::Bool(value) => value.to_string(),
            Symbol::Dummy => "dummy".into(),
            Symbol::Tuple(items) => {
                let items: Vec<String> = items.iter().map(Symbol::format).collect();
                format!("({})", items.join(", "))
            }
            Symbol::Lambda(closure) => {
                format!("[lambda closure: {}: {}]", closure.params.join(", "), closure.index)
            }
            Symbol::Eta(closure) => {
                format!("[eta closure: {}: {}]", closure.params.join(", "), closure.index)
            }
            Symbol::Builtin(evaluation) if evaluation.arguments.is_empty() => {
                format!("[builtin function: {}]", evaluation.function.name())
            }
            Symbol::Builtin(evaluation) => {
                format!("[partial builtin function: {}]", evaluation.function.name())
            }
            Symbol::Id(name) | Symbol::Error(name) => name.clone(),
            other => other.to_string(),
        }
    }
}

/// Machine view, as rendered in traces and the debugger.
impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Symbol::Id(name) => write!(f, "<ID:{name}>"),
            Symbol::Int(value) => write!(f, "{value}"),
            Symbol::Str(value) => write!(f, "'{}'", escape(value)),
            Symbol::Bool(value) => write!(f, "{value}"),
            Symbol::Dummy => f.write_str("dummy"),
            Symbol::Tuple(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
            Symbol::Lambda(c) => write!(f, "lambda_{}[{}]^e{}", c.index, c.params.join(","), c.env),
            Symbol::Eta(c) => write!(f, "eta_{}[{}]^e{}", c.index, c.params.join(","), c.env),
            Symbol::Delta(delta) => write!(f, "delta_{}", delta.index),
            Symbol::BBlock(body) => write!(f, "guard[{}]", body.len()),
            Symbol::Beta => f.write_str("beta"),
            Symbol::Tau(arity) => write!(f, "tau_{arity}"),
            Symbol::Gamma => f.write_str("gamma"),
            Symbol::Unary(op) => write!(f, "{op}"),
            Symbol::Binary(op) => write!(f, "{op}"),
            Symbol::YStar => f.write_str("Y*"),
            Symbol::Env(index) => write!(f, "e_{index}"),
            Symbol::Builtin(evaluation) => write!(
                f,
                "{}/{}",
                evaluation.function.name(),
                evaluation.function.needed_arguments() - evaluation.arguments.len()
            ),
            Symbol::Error(name) => write!(f, "<unbound:{name}>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cse::builtins::BuiltinFunction;

    fn closure(params: &[&str]) -> Closure {
        Closure {
            index: 3,
            params: params.iter().map(|p| p.to_string()).collect(),
            body: Rc::new(Delta { index: 4, body: vec![] }),
            env: 0,
        }
    }

    #[test]
    fn answers_drop_quotes_and_nest_tuples() {
        let value = Symbol::tuple(vec![
            Symbol::Int(1.into()),
            Symbol::Str("a b".into()),
            Symbol::tuple(vec![Symbol::Bool(true), Symbol::nil()]),
        ]);
        assert_eq!(value.format(), "(1, a b, (true, ()))");
        assert_eq!(value.to_string(), "(1, 'a b', (true, ()))");
        assert_eq!(Symbol::Dummy.answer(), "");
        assert_eq!(Symbol::Dummy.format(), "dummy");
    }

    #[test]
    fn function_values_describe_themselves() {
        assert_eq!(Symbol::Lambda(closure(&["x"])).format(), "[lambda closure: x: 3]");
        assert_eq!(Symbol::Eta(closure(&["f"])).format(), "[eta closure: f: 3]");

        let conc: BuiltinEvaluation = BuiltinFunction::Conc.into();
        assert_eq!(Symbol::Builtin(conc.clone()).format(), "[builtin function: Conc]");
        let partial = BuiltinEvaluation {
            arguments: vec![Symbol::Str("a".into())],
            ..conc
        };
        assert_eq!(Symbol::Builtin(partial).format(), "[partial builtin function: Conc]");
    }

    #[test]
    fn equality_is_structural_within_a_kind() {
        let a = Symbol::tuple(vec![Symbol::Int(1.into()), Symbol::Str("x".into())]);
        let b = Symbol::tuple(vec![Symbol::Int(1.into()), Symbol::Str("x".into())]);
        assert_eq!(a.equals(&b), Some(true));
        assert_eq!(a.equals(&Symbol::nil()), Some(false));
        assert_eq!(Symbol::Int(1.into()).equals(&Symbol::Str("1".into())), None);
        assert_eq!(Symbol::Lambda(closure(&["x"])).equals(&Symbol::Lambda(closure(&["x"]))), None);
    }
}

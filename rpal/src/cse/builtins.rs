use std::io::Write;

use num_bigint::BigInt;
use tracing::warn;

use super::symbol::Symbol;
use crate::config::BuiltinPolicy;
use crate::error::{Result, RpalError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuiltinFunction {
    // Output
    Print,
    // String functions
    Conc,
    Stem,
    Stern,
    // Tuple functions
    Order,
    // Type predicates
    Isinteger,
    Isstring,
    Istuple,
    Isdummy,
    Istruthvalue,
    Isfunction,
}

impl BuiltinFunction {
    pub const ALL: [BuiltinFunction; 11] = [
        BuiltinFunction::Print,
        BuiltinFunction::Conc,
        BuiltinFunction::Stem,
        BuiltinFunction::Stern,
        BuiltinFunction::Order,
        BuiltinFunction::Isinteger,
        BuiltinFunction::Isstring,
        BuiltinFunction::Istuple,
        BuiltinFunction::Isdummy,
        BuiltinFunction::Istruthvalue,
        BuiltinFunction::Isfunction,
    ];

    pub fn from_name(name: &str) -> Option<BuiltinFunction> {
        BuiltinFunction::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            BuiltinFunction::Print => "Print",
            BuiltinFunction::Conc => "Conc",
            BuiltinFunction::Stem => "Stem",
            BuiltinFunction::Stern => "Stern",
            BuiltinFunction::Order => "Order",
            BuiltinFunction::Isinteger => "Isinteger",
            BuiltinFunction::Isstring => "Isstring",
            BuiltinFunction::Istuple => "Istuple",
            BuiltinFunction::Isdummy => "Isdummy",
            BuiltinFunction::Istruthvalue => "Istruthvalue",
            BuiltinFunction::Isfunction => "Isfunction",
        }
    }

    pub fn needed_arguments(&self) -> usize {
        match self {
            BuiltinFunction::Conc => 2,
            _ => 1,
        }
    }

    pub fn eval(self, args: Vec<Symbol>, policy: BuiltinPolicy, out: &mut dyn Write) -> Result<Symbol> {
        let [first, rest @ ..] = args.as_slice() else {
            return Err(RpalError::Internal(format!("{} evaluated without arguments", self.name())));
        };
        let value = match (self, first) {
            (BuiltinFunction::Print, value) => {
                writeln!(out, "{}", value.format()).map_err(|e| RpalError::Output(e.to_string()))?;
                Symbol::Dummy
            }
            (BuiltinFunction::Conc, Symbol::Str(left)) => match rest {
                [Symbol::Str(right)] => Symbol::Str(format!("{left}{right}")),
                [other] => self.misuse(other, policy, Symbol::Str(String::new()))?,
                _ => return Err(RpalError::Internal("Conc takes two arguments".into())),
            },
            (BuiltinFunction::Conc, other) => self.misuse(other, policy, Symbol::Str(String::new()))?,
            (BuiltinFunction::Stem, Symbol::Str(s)) => Symbol::Str(s.chars().take(1).collect()),
            (BuiltinFunction::Stern, Symbol::Str(s)) => Symbol::Str(s.chars().skip(1).collect()),
            (BuiltinFunction::Stem | BuiltinFunction::Stern, other) => {
                self.misuse(other, policy, other.clone())?
            }
            (BuiltinFunction::Order, Symbol::Tuple(items)) => Symbol::Int(BigInt::from(items.len())),
            (BuiltinFunction::Order, other) => self.misuse(other, policy, Symbol::Int(0.into()))?,
            (BuiltinFunction::Isinteger, value) => Symbol::Bool(matches!(value, Symbol::Int(_))),
            (BuiltinFunction::Isstring, value) => Symbol::Bool(matches!(value, Symbol::Str(_))),
            (BuiltinFunction::Istuple, value) => Symbol::Bool(matches!(value, Symbol::Tuple(_))),
            (BuiltinFunction::Isdummy, value) => Symbol::Bool(matches!(value, Symbol::Dummy)),
            (BuiltinFunction::Istruthvalue, value) => Symbol::Bool(matches!(value, Symbol::Bool(_))),
            (BuiltinFunction::Isfunction, value) => Symbol::Bool(value.is_function()),
        };
        Ok(value)
    }

    fn misuse(self, argument: &Symbol, policy: BuiltinPolicy, fallback: Symbol) -> Result<Symbol> {
        match policy {
            BuiltinPolicy::Permissive => {
                warn!(function = self.name(), kind = argument.kind(), "built-in applied to the wrong kind");
                Ok(fallback)
            }
            BuiltinPolicy::Strict => Err(RpalError::BuiltinMisuse {
                function: self.name(),
                kind: argument.kind(),
            }),
        }
    }
}

/// A built-in and the arguments it has collected so far.
#[derive(Clone, Debug, PartialEq)]
pub struct BuiltinEvaluation {
    pub arguments: Vec<Symbol>,
    pub function: BuiltinFunction,
}

impl BuiltinEvaluation {
    pub fn apply(self, argument: Symbol, policy: BuiltinPolicy, out: &mut dyn Write) -> Result<Symbol> {
        let mut arguments = self.arguments;
        arguments.push(argument);
        let value = if arguments.len() == self.function.needed_arguments() {
            self.function.eval(arguments, policy, out)?
        } else {
            Symbol::Builtin(BuiltinEvaluation {
                arguments,
                function: self.function,
            })
        };
        Ok(value)
    }
}

impl From<BuiltinFunction> for BuiltinEvaluation {
    fn from(function: BuiltinFunction) -> Self {
        BuiltinEvaluation {
            arguments: vec![],
            function,
        }
    }
}

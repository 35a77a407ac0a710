use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use num_traits::{Signed, ToPrimitive, Zero};

use super::symbol::Symbol;
use crate::error::{Result, RpalError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    // Integer arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    // Truth values
    And,
    Or,
    // Comparison
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    // Tuples
    Aug,
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "neg",
            UnaryOp::Not => "not",
        }
    }
}

impl BinaryOp {
    pub fn as_str(&self) -> &'static str {
        use BinaryOp::*;
        match self {
            Add => "+",
            Subtract => "-",
            Multiply => "*",
            Divide => "/",
            Power => "**",
            And => "&",
            Or => "or",
            Equal => "eq",
            NotEqual => "ne",
            Less => "ls",
            LessEqual => "le",
            Greater => "gr",
            GreaterEqual => "ge",
            Aug => "aug",
        }
    }
}

impl FromStr for UnaryOp {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "neg" => Ok(UnaryOp::Neg),
            "not" => Ok(UnaryOp::Not),
            _ => Err(()),
        }
    }
}

impl FromStr for BinaryOp {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use BinaryOp::*;
        let op = match s {
            "+" => Add,
            "-" => Subtract,
            "*" => Multiply,
            "/" => Divide,
            "**" => Power,
            "&" => And,
            "or" => Or,
            "eq" => Equal,
            "ne" => NotEqual,
            "ls" | "<" => Less,
            "le" | "<=" => LessEqual,
            "gr" | ">" => Greater,
            "ge" | ">=" => GreaterEqual,
            "aug" => Aug,
            _ => return Err(()),
        };
        Ok(op)
    }
}

impl Display for UnaryOp {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn apply_unary(op: UnaryOp, rand: Symbol) -> Result<Symbol> {
    let value = match (op, rand) {
        (UnaryOp::Neg, Symbol::Int(n)) => Symbol::Int(-n),
        (UnaryOp::Not, Symbol::Bool(b)) => Symbol::Bool(!b),
        (op, rand) => {
            return Err(RpalError::Type {
                operator: op.to_string(),
                operands: rand.kind().to_string(),
            });
        }
    };
    Ok(value)
}

/// `left` is the operand that was on top of the stack.
pub fn apply_binary(op: BinaryOp, left: Symbol, right: Symbol) -> Result<Symbol> {
    use BinaryOp::*;
    let value = match (op, &left, &right) {
        (Add, Symbol::Int(a), Symbol::Int(b)) => Symbol::Int(a + b),
        (Subtract, Symbol::Int(a), Symbol::Int(b)) => Symbol::Int(a - b),
        (Multiply, Symbol::Int(a), Symbol::Int(b)) => Symbol::Int(a * b),
        (Divide, Symbol::Int(a), Symbol::Int(b)) => {
            if b.is_zero() {
                return Err(arithmetic(op, "division by zero"));
            }
            Symbol::Int(a / b)
        }
        (Power, Symbol::Int(a), Symbol::Int(b)) => {
            if b.is_negative() {
                return Err(arithmetic(op, "negative exponent"));
            }
            let exponent = b.to_u32().ok_or_else(|| arithmetic(op, "exponent too large"))?;
            Symbol::Int(a.pow(exponent))
        }
        (And, Symbol::Bool(a), Symbol::Bool(b)) => Symbol::Bool(*a && *b),
        (Or, Symbol::Bool(a), Symbol::Bool(b)) => Symbol::Bool(*a || *b),
        (Equal | NotEqual, _, _) => match left.equals(&right) {
            Some(same) => Symbol::Bool(same == (op == Equal)),
            None => return Err(type_error(op, &left, &right)),
        },
        (Less, Symbol::Int(a), Symbol::Int(b)) => Symbol::Bool(a < b),
        (LessEqual, Symbol::Int(a), Symbol::Int(b)) => Symbol::Bool(a <= b),
        (Greater, Symbol::Int(a), Symbol::Int(b)) => Symbol::Bool(a > b),
        (GreaterEqual, Symbol::Int(a), Symbol::Int(b)) => Symbol::Bool(a >= b),
        (Aug, Symbol::Tuple(items), _) => {
            let mut items = items.as_ref().clone();
            match &right {
                Symbol::Tuple(tail) => items.extend(tail.iter().cloned()),
                value => items.push(value.clone()),
            }
            Symbol::tuple(items)
        }
        _ => return Err(type_error(op, &left, &right)),
    };
    Ok(value)
}

fn arithmetic(op: BinaryOp, message: &'static str) -> RpalError {
    RpalError::Arithmetic {
        operator: op.to_string(),
        message,
    }
}

fn type_error(op: BinaryOp, left: &Symbol, right: &Symbol) -> RpalError {
    RpalError::Type {
        operator: op.to_string(),
        operands: format!("{}, {}", left.kind(), right.kind()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(n: i64) -> Symbol {
        Symbol::Int(n.into())
    }

    #[test]
    fn integer_arithmetic() {
        assert_eq!(apply_binary(BinaryOp::Subtract, int(3), int(5)), Ok(int(-2)));
        assert_eq!(apply_binary(BinaryOp::Divide, int(-7), int(2)), Ok(int(-3)));
        assert_eq!(
            apply_binary(BinaryOp::Power, int(2), int(100)).map(|v| v.format()),
            Ok("1267650600228229401496703205376".to_string())
        );
        assert_eq!(apply_unary(UnaryOp::Neg, int(4)), Ok(int(-4)));
        assert_eq!(
            apply_binary(BinaryOp::Divide, int(1), int(0)),
            Err(RpalError::Arithmetic { operator: "/".into(), message: "division by zero" })
        );
        assert!(apply_binary(BinaryOp::Power, int(2), int(-1)).is_err());
    }

    #[test]
    fn comparisons_and_logic() {
        assert_eq!(apply_binary(BinaryOp::Less, int(1), int(2)), Ok(Symbol::Bool(true)));
        assert_eq!(apply_binary(BinaryOp::GreaterEqual, int(1), int(2)), Ok(Symbol::Bool(false)));
        assert_eq!(
            apply_binary(BinaryOp::NotEqual, Symbol::Str("a".into()), Symbol::Str("b".into())),
            Ok(Symbol::Bool(true))
        );
        assert_eq!(
            apply_binary(BinaryOp::Or, Symbol::Bool(false), Symbol::Bool(true)),
            Ok(Symbol::Bool(true))
        );
        assert_eq!(apply_unary(UnaryOp::Not, Symbol::Bool(true)), Ok(Symbol::Bool(false)));
    }

    #[test]
    fn mismatched_operands_are_type_errors() {
        assert_eq!(
            apply_binary(BinaryOp::Add, int(1), Symbol::Str("x".into())),
            Err(RpalError::Type { operator: "+".into(), operands: "Int, Str".into() })
        );
        assert_eq!(
            apply_binary(BinaryOp::Equal, int(1), Symbol::Bool(true)),
            Err(RpalError::Type { operator: "eq".into(), operands: "Int, Bool".into() })
        );
        assert!(apply_unary(UnaryOp::Not, int(0)).is_err());
    }

    #[test]
    fn aug_appends_or_concatenates() {
        let pair = Symbol::tuple(vec![int(1), int(2)]);
        assert_eq!(
            apply_binary(BinaryOp::Aug, Symbol::nil(), int(1)),
            Ok(Symbol::tuple(vec![int(1)]))
        );
        assert_eq!(
            apply_binary(BinaryOp::Aug, pair.clone(), Symbol::tuple(vec![int(3)])),
            Ok(Symbol::tuple(vec![int(1), int(2), int(3)]))
        );
        // the left operand is left as it was
        assert_eq!(pair, Symbol::tuple(vec![int(1), int(2)]));
        assert!(apply_binary(BinaryOp::Aug, int(1), int(2)).is_err());
    }

    #[test]
    fn symbolic_comparisons_normalize_to_keywords() {
        assert_eq!(">=".parse::<BinaryOp>(), Ok(BinaryOp::GreaterEqual));
        assert_eq!("<".parse::<BinaryOp>().map(|op| op.as_str()), Ok("ls"));
        assert!("neg".parse::<BinaryOp>().is_err());
        assert_eq!("neg".parse::<UnaryOp>(), Ok(UnaryOp::Neg));
    }
}

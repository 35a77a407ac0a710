use thiserror::Error;

/// Every way a program can fail between source text and a printed answer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RpalError {
    #[error("lexical error at byte {offset}: unexpected character {found:?}")]
    Lex { offset: usize, found: char },
    #[error("lexical error at byte {offset}: {message}")]
    BadLiteral { offset: usize, message: String },
    #[error("parse error at byte {offset}: expected {expected}, found {found}")]
    Parse {
        offset: usize,
        expected: String,
        found: String,
    },
    #[error("malformed tree text on line {line}: {message}")]
    TreeText { line: usize, message: String },
    #[error("malformed `{tag}` node: {message}")]
    Malformed { tag: String, message: String },
    #[error("unbound identifier `{0}`")]
    Unbound(String),
    #[error("type error: `{operator}` cannot be applied to {operands}")]
    Type { operator: String, operands: String },
    #[error("stack underflow during {operation}")]
    StackUnderflow { operation: &'static str },
    #[error("tuple index {index} out of range for a tuple of {len} element(s)")]
    IndexOutOfRange { index: String, len: usize },
    #[error("cannot bind {found} value(s) to {expected} parameter(s)")]
    PatternArity { expected: usize, found: usize },
    #[error("cannot apply {0} as a function")]
    NotApplicable(&'static str),
    #[error("arithmetic error in `{operator}`: {message}")]
    Arithmetic {
        operator: String,
        message: &'static str,
    },
    #[error("built-in `{function}` cannot take {kind}")]
    BuiltinMisuse {
        function: &'static str,
        kind: &'static str,
    },
    #[error("could not write program output: {0}")]
    Output(String),
    #[error("internal machine error: {0}")]
    Internal(String),
}

pub type Result<T, E = RpalError> = std::result::Result<T, E>;

impl RpalError {
    pub(crate) fn malformed(tag: impl ToString, message: impl Into<String>) -> Self {
        RpalError::Malformed {
            tag: tag.to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_parts() {
        let err = RpalError::Type {
            operator: "+".into(),
            operands: "Int, Str".into(),
        };
        assert_eq!(err.to_string(), "type error: `+` cannot be applied to Int, Str");

        let err = RpalError::malformed("let", "expected 2 children, found 1");
        assert_eq!(err.to_string(), "malformed `let` node: expected 2 children, found 1");
    }
}

pub mod config;
pub mod cse;
pub mod error;
pub mod execution_trace;
pub mod lexer;
pub mod parser;
pub mod program;
pub mod standardize;
pub mod tree;

use std::io::Write;

pub use config::Config;
pub use cse::{Machine, symbol::Symbol};
pub use error::{Result, RpalError};
pub use execution_trace::{ExecutionTrace, Frame};
pub use parser::parse;
pub use standardize::standardize;
pub use tree::Tree;

/// Runs a standardized tree, sending `Print` output to `out`.
pub fn evaluate<W: Write>(tree: &Tree, config: &Config, out: W) -> Result<Symbol> {
    let program = cse::compile::compile(tree)?;
    Machine::with_output(program, config, out).run()
}

/// The result of running a program with its printed output captured.
#[derive(Clone, Debug, PartialEq)]
pub struct Evaluation {
    pub value: Symbol,
    pub output: String,
}

impl Evaluation {
    pub fn answer(&self) -> String {
        self.value.answer()
    }
}

/// Parses, standardizes and runs source text.
pub fn interpret(source: &str, config: &Config) -> Result<Evaluation> {
    let mut tree = parse(source)?;
    standardize(&mut tree)?;
    let mut output = vec![];
    let value = evaluate(&tree, config, &mut output)?;
    Ok(Evaluation {
        value,
        output: String::from_utf8_lossy(&output).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(source: &str) -> String {
        interpret(source, &Config::default()).unwrap().answer()
    }

    #[test_log::test]
    fn let_binding() {
        let mut tree = parse("let x = 3 in x + 4").unwrap();
        standardize(&mut tree).unwrap();
        assert_eq!(
            tree.to_string(),
            "gamma\n.lambda\n..<ID:x>\n..+\n...<ID:x>\n...<INT:4>\n.<INT:3>\n"
        );
        assert_eq!(evaluate(&tree, &Config::default(), vec![]), Ok(Symbol::Int(7.into())));
    }

    #[test_log::test]
    fn where_clause() {
        assert_eq!(answer("x + 1 where x = 2"), "3");
    }

    #[test_log::test]
    fn conditional_prints_without_quotes() {
        assert_eq!(answer("1 eq 1 -> 'yes' | 'no'"), "yes");
    }

    #[test_log::test]
    fn order_of_a_tuple() {
        assert_eq!(answer("Order (1,2,3)"), "3");
        assert_eq!(answer("Order nil"), "0");
    }

    #[test_log::test]
    fn print_suppresses_the_answer() {
        let result = interpret("Print('hi')", &Config::default()).unwrap();
        assert_eq!(result.output, "hi\n");
        assert_eq!(result.value, Symbol::Dummy);
        assert_eq!(result.answer(), "");
    }

    #[test_log::test]
    fn factorial() {
        let fact = "let rec fact n = n eq 0 -> 1 | n * fact(n-1) in fact";
        assert_eq!(answer(&format!("{fact} 5")), "120");
        assert_eq!(answer(&format!("{fact} 0")), "1");
    }

    #[test_log::test]
    fn closures_resolve_free_names_where_they_were_made() {
        let source = "
            let x = 1 in
            let f y = x + y in
            let x = 100 in
            (f 1, (fn x . f x) 10)
        ";
        assert_eq!(answer(source), "(2, 11)");
    }

    #[test]
    fn tuple_indexing() {
        let tuple = "let t = ('a', 2, (3, 4)) in";
        assert_eq!(answer(&format!("{tuple} t 1")), "a");
        assert_eq!(answer(&format!("{tuple} t 2")), "2");
        assert_eq!(answer(&format!("{tuple} (t 3) 2")), "4");
        assert_eq!(
            interpret(&format!("{tuple} t 4"), &Config::default()),
            Err(RpalError::IndexOutOfRange { index: "4".into(), len: 3 })
        );
    }

    #[test]
    fn partial_application_of_conc() {
        let partial = interpret("Conc 'ab'", &Config::default()).unwrap();
        assert!(matches!(&partial.value, Symbol::Builtin(e) if e.arguments.len() == 1));
        assert_eq!(partial.answer(), "[partial builtin function: Conc]");

        let full = interpret("Conc 'ab' 'cd'", &Config::default()).unwrap();
        assert_ne!(partial.value, full.value);
        assert_eq!(full.answer(), "abcd");

        assert_eq!(answer("let f = Conc 'x' in (f 'y', f 'z')"), "(xy, xz)");
    }

    #[test]
    fn printed_function_values() {
        assert_eq!(answer("fn x . x"), "[lambda closure: x: 1]");
        assert_eq!(answer("Stem"), "[builtin function: Stem]");
        // the recursive lambda is numbered after the body of the `let`
        assert_eq!(answer("let rec f n = f n in f"), "[eta closure: f: 2]");
    }

    #[test]
    fn list_processing() {
        let source = "
            let rec rev s = s eq '' -> '' | Conc (rev (Stern s)) (Stem s) in
            let rec sum t n = n eq 0 -> 0 | t n + sum t (n - 1) in
            let t = (1, 2, 3, 4) in
            (rev 'abc', sum t (Order t), Istuple t, Isfunction rev)
        ";
        assert_eq!(answer(source), "(cba, 10, true, true)");
    }

    #[test]
    fn strict_mode() {
        assert_eq!(
            interpret("Order 5", &Config::strict()),
            Err(RpalError::BuiltinMisuse { function: "Order", kind: "Int" })
        );
        assert_eq!(
            interpret("missing", &Config::strict()),
            Err(RpalError::Unbound("missing".into()))
        );
        assert_eq!(answer("missing"), "missing");
    }

    #[test]
    fn front_end_errors_surface() {
        assert!(matches!(
            interpret("let x = 1 ; x", &Config::default()),
            Err(RpalError::Parse { offset: 10, .. })
        ));
        assert!(matches!(
            interpret("1 / 0", &Config::default()),
            Err(RpalError::Arithmetic { .. })
        ));
    }
}

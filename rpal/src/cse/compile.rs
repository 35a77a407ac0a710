use std::rc::Rc;

use tracing::debug;

use super::symbol::{Closure, Delta, Symbol};
use crate::error::{Result, RpalError};
use crate::tree::{NodeId, Tag, Tree};

/// Compiles a standardized tree into its root control block.
pub fn compile(tree: &Tree) -> Result<Rc<Delta>> {
    let mut compiler = Compiler::new();
    let root = compiler.compile_delta(tree, tree.root())?;
    debug!(
        deltas = compiler.delta_index,
        lambdas = compiler.lambda_index - 1,
        "compiled control structures"
    );
    Ok(root)
}

/// Numbering state shared across one compilation. Deltas count from 0 (the
/// root block), lambdas from 1.
pub struct Compiler {
    lambda_index: usize,
    delta_index: usize,
}

impl Default for Compiler {
    fn default() -> Self {
        Compiler {
            lambda_index: 1,
            delta_index: 0,
        }
    }
}

impl Compiler {
    pub fn new() -> Compiler {
        Compiler::default()
    }

    pub fn compile_delta(&mut self, tree: &Tree, id: NodeId) -> Result<Rc<Delta>> {
        let index = self.delta_index;
        self.delta_index += 1;
        let mut body = vec![];
        self.flatten(tree, id, &mut body)?;
        Ok(Rc::new(Delta { index, body }))
    }

    /// Pre-order: a node's own symbol, then each child's symbols in order.
    pub fn flatten(&mut self, tree: &Tree, id: NodeId, out: &mut Vec<Symbol>) -> Result<()> {
        let children = tree.children(id);
        let symbol = match tree.tag(id) {
            Tag::Lambda => {
                let [param, body] = children else {
                    return Err(RpalError::malformed(
                        "lambda",
                        format!("expected a parameter and a body, found {} children", children.len()),
                    ));
                };
                let index = self.lambda_index;
                self.lambda_index += 1;
                let params = parameters(tree, *param)?;
                let body = self.compile_delta(tree, *body)?;
                out.push(Symbol::Lambda(Closure {
                    index,
                    params,
                    body,
                    env: 0,
                }));
                return Ok(());
            }
            Tag::Conditional => {
                let [guard, then, otherwise] = children else {
                    return Err(RpalError::malformed(
                        "->",
                        format!("expected 3 children, found {}", children.len()),
                    ));
                };
                let then = self.compile_delta(tree, *then)?;
                let otherwise = self.compile_delta(tree, *otherwise)?;
                let mut guard_body = vec![];
                self.flatten(tree, *guard, &mut guard_body)?;
                out.extend([
                    Symbol::Delta(then),
                    Symbol::Delta(otherwise),
                    Symbol::Beta,
                    Symbol::BBlock(Rc::new(guard_body)),
                ]);
                return Ok(());
            }
            Tag::Gamma => Symbol::Gamma,
            Tag::Tau => Symbol::Tau(children.len()),
            Tag::Binary(op) => Symbol::Binary(*op),
            Tag::Unary(op) => Symbol::Unary(*op),
            Tag::YStar => Symbol::YStar,
            Tag::Id(name) => Symbol::Id(name.clone()),
            Tag::Int(value) => Symbol::Int(value.clone()),
            Tag::Str(value) => Symbol::Str(value.clone()),
            Tag::True => Symbol::Bool(true),
            Tag::False => Symbol::Bool(false),
            Tag::Nil => Symbol::nil(),
            Tag::Dummy => Symbol::Dummy,
            tag @ (Tag::Let
            | Tag::Where
            | Tag::FunctionForm
            | Tag::Within
            | Tag::At
            | Tag::And
            | Tag::Rec
            | Tag::Equal
            | Tag::Comma
            | Tag::EmptyParams) => {
                return Err(RpalError::malformed(tag, "cannot be compiled, standardize the tree first"));
            }
        };
        out.push(symbol);
        for &child in children {
            self.flatten(tree, child, out)?;
        }
        Ok(())
    }
}

fn parameters(tree: &Tree, id: NodeId) -> Result<Vec<String>> {
    match tree.tag(id) {
        Tag::Id(name) => Ok(vec![name.clone()]),
        Tag::EmptyParams => Ok(vec![]),
        Tag::Comma => tree
            .children(id)
            .iter()
            .map(|&c| match tree.tag(c) {
                Tag::Id(name) => Ok(name.clone()),
                other => Err(RpalError::malformed(",", format!("`{other}` is not a parameter name"))),
            })
            .collect(),
        other => Err(RpalError::malformed(
            "lambda",
            format!("`{other}` is not a parameter"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cse::ops::BinaryOp;
    use crate::parser::parse;
    use crate::standardize::standardize;

    fn compiled(source: &str) -> Rc<Delta> {
        let mut tree = parse(source).unwrap();
        standardize(&mut tree).unwrap();
        compile(&tree).unwrap()
    }

    fn rendered(body: &[Symbol]) -> Vec<String> {
        body.iter().map(Symbol::to_string).collect()
    }

    #[test]
    fn let_compiles_to_gamma_of_a_lambda() {
        let root = compiled("let x = 3 in x + 4");
        assert_eq!(root.index, 0);
        assert_eq!(rendered(&root.body), vec!["gamma", "lambda_1[x]^e0", "3"]);

        let Symbol::Lambda(closure) = &root.body[1] else {
            panic!("expected a lambda, got {}", root.body[1]);
        };
        assert_eq!(closure.body.index, 1);
        assert_eq!(
            closure.body.body,
            vec![
                Symbol::Binary(BinaryOp::Add),
                Symbol::Id("x".into()),
                Symbol::Int(4.into()),
            ]
        );
    }

    #[test]
    fn conditional_layout() {
        let root = compiled("1 eq 1 -> 'yes' | 'no'");
        assert_eq!(rendered(&root.body), vec!["delta_1", "delta_2", "beta", "guard[3]"]);
        let Symbol::BBlock(guard) = &root.body[3] else {
            panic!("expected a guard block");
        };
        assert_eq!(rendered(guard), vec!["eq", "1", "1"]);
        let Symbol::Delta(then) = &root.body[0] else {
            panic!("expected a delta");
        };
        assert_eq!(then.body, vec![Symbol::Str("yes".into())]);
    }

    #[test]
    fn tuple_patterns_and_empty_parameters() {
        let root = compiled("(fn (a, b) . a) (1, 2)");
        assert_eq!(rendered(&root.body), vec!["gamma", "lambda_1[a,b]^e0", "tau_2", "1", "2"]);

        let root = compiled("(fn () . 1) nil");
        assert!(matches!(&root.body[1], Symbol::Lambda(c) if c.params.is_empty()));
    }

    #[test]
    fn numbering_is_shared_across_nesting() {
        let root = compiled("fn x . fn y . x");
        let Symbol::Lambda(outer) = &root.body[0] else {
            panic!("expected a lambda");
        };
        let Symbol::Lambda(inner) = &outer.body.body[0] else {
            panic!("expected a nested lambda");
        };
        assert_eq!((outer.index, outer.body.index), (1, 1));
        assert_eq!((inner.index, inner.body.index), (2, 2));
    }

    #[test]
    fn unstandardized_trees_are_rejected() {
        let tree = Tree::from_indented("let\n.=\n..<ID:x>\n..<INT:1>\n.<ID:x>\n").unwrap();
        assert!(matches!(
            compile(&tree),
            Err(RpalError::Malformed { tag, .. }) if tag == "let"
        ));
    }
}

//! Recursive-descent parser for RPAL source text.
//!
//! Each grammar rule parses its operands onto a node stack and then folds the
//! top `n` entries into a new node, so the tree is built bottom-up in the
//! same order the rules complete.

use tracing::debug;

use crate::cse::ops::{BinaryOp, UnaryOp};
use crate::error::{Result, RpalError};
use crate::lexer::{Token, TokenKind, tokenize};
use crate::tree::{NodeId, Tag, Tree, TreeBuilder};

const COMPARISONS: &[&str] = &["gr", "ge", "ls", "le", "eq", "ne", ">", ">=", "<", "<="];

pub fn parse(source: &str) -> Result<Tree> {
    let tokens = tokenize(source)?;
    Parser::new(tokens).parse()
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    tree: TreeBuilder,
    stack: Vec<NodeId>,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Parser {
        if !matches!(tokens.last(), Some(Token { kind: TokenKind::End, .. })) {
            let offset = tokens.last().map(|t| t.offset + 1).unwrap_or_default();
            tokens.push(Token {
                kind: TokenKind::End,
                offset,
            });
        }
        Parser {
            tokens,
            pos: 0,
            tree: TreeBuilder::default(),
            stack: vec![],
        }
    }

    pub fn parse(mut self) -> Result<Tree> {
        self.e()?;
        if self.peek().kind != TokenKind::End {
            return Err(self.error("end of input"));
        }
        let root = self
            .stack
            .pop()
            .ok_or_else(|| RpalError::Internal("parser produced no tree".into()))?;
        debug!(tokens = self.tokens.len(), "parsed program");
        Ok(self.tree.finish(root))
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_at(&self, ahead: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + ahead).min(last)]
    }

    fn at(&self, text: &str) -> bool {
        self.peek().is(text)
    }

    fn at_identifier(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Identifier(_))
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if token.kind != TokenKind::End {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, text: &str) -> Result<()> {
        if !self.at(text) {
            return Err(self.error(&format!("`{text}`")));
        }
        self.advance();
        Ok(())
    }

    fn error(&self, expected: &str) -> RpalError {
        let token = self.peek();
        RpalError::Parse {
            offset: token.offset,
            expected: expected.to_string(),
            found: token.kind.to_string(),
        }
    }

    fn leaf(&mut self, tag: Tag) {
        let id = self.tree.leaf(tag);
        self.stack.push(id);
    }

    fn build(&mut self, tag: Tag, n: usize) {
        let children = self.stack.split_off(self.stack.len() - n);
        let id = self.tree.add(tag, children);
        self.stack.push(id);
    }

    fn identifier(&mut self) -> Result<()> {
        let TokenKind::Identifier(name) = &self.peek().kind else {
            return Err(self.error("an identifier"));
        };
        let name = name.clone();
        self.advance();
        self.leaf(Tag::Id(name));
        Ok(())
    }

    // E -> 'let' D 'in' E | 'fn' Vb+ '.' E | Ew
    fn e(&mut self) -> Result<()> {
        if self.at("let") {
            self.advance();
            self.d()?;
            self.expect("in")?;
            self.e()?;
            self.build(Tag::Let, 2);
        } else if self.at("fn") {
            self.advance();
            let mut n = 0;
            while self.at_identifier() || self.at("(") {
                self.vb()?;
                n += 1;
            }
            if n == 0 {
                return Err(self.error("a bound variable"));
            }
            self.expect(".")?;
            self.e()?;
            self.build(Tag::Lambda, n + 1);
        } else {
            self.ew()?;
        }
        Ok(())
    }

    fn ew(&mut self) -> Result<()> {
        self.t()?;
        if self.at("where") {
            self.advance();
            self.dr()?;
            self.build(Tag::Where, 2);
        }
        Ok(())
    }

    fn t(&mut self) -> Result<()> {
        self.ta()?;
        let mut n = 1;
        while self.at(",") {
            self.advance();
            self.ta()?;
            n += 1;
        }
        if n > 1 {
            self.build(Tag::Tau, n);
        }
        Ok(())
    }

    fn ta(&mut self) -> Result<()> {
        self.tc()?;
        while self.at("aug") {
            self.advance();
            self.tc()?;
            self.build(Tag::Binary(BinaryOp::Aug), 2);
        }
        Ok(())
    }

    fn tc(&mut self) -> Result<()> {
        self.b()?;
        if self.at("->") {
            self.advance();
            self.tc()?;
            self.expect("|")?;
            self.tc()?;
            self.build(Tag::Conditional, 3);
        }
        Ok(())
    }

    fn b(&mut self) -> Result<()> {
        self.bt()?;
        while self.at("or") {
            self.advance();
            self.bt()?;
            self.build(Tag::Binary(BinaryOp::Or), 2);
        }
        Ok(())
    }

    fn bt(&mut self) -> Result<()> {
        self.bs()?;
        while self.at("&") {
            self.advance();
            self.bs()?;
            self.build(Tag::Binary(BinaryOp::And), 2);
        }
        Ok(())
    }

    fn bs(&mut self) -> Result<()> {
        if self.at("not") {
            self.advance();
            self.bp()?;
            self.build(Tag::Unary(UnaryOp::Not), 1);
        } else {
            self.bp()?;
        }
        Ok(())
    }

    fn bp(&mut self) -> Result<()> {
        self.a()?;
        let op = self
            .peek()
            .symbol()
            .filter(|s| COMPARISONS.contains(s))
            .and_then(|s| s.parse::<BinaryOp>().ok());
        if let Some(op) = op {
            self.advance();
            self.a()?;
            self.build(Tag::Binary(op), 2);
        }
        Ok(())
    }

    fn a(&mut self) -> Result<()> {
        if self.at("+") {
            self.advance();
            self.term()?;
        } else if self.at("-") {
            self.advance();
            self.term()?;
            self.build(Tag::Unary(UnaryOp::Neg), 1);
        } else {
            self.term()?;
        }
        loop {
            let op = if self.at("+") {
                BinaryOp::Add
            } else if self.at("-") {
                BinaryOp::Subtract
            } else {
                break;
            };
            self.advance();
            self.term()?;
            self.build(Tag::Binary(op), 2);
        }
        Ok(())
    }

    fn term(&mut self) -> Result<()> {
        self.factor()?;
        loop {
            let op = if self.at("*") {
                BinaryOp::Multiply
            } else if self.at("/") {
                BinaryOp::Divide
            } else {
                break;
            };
            self.advance();
            self.factor()?;
            self.build(Tag::Binary(op), 2);
        }
        Ok(())
    }

    // right associative
    fn factor(&mut self) -> Result<()> {
        self.ap()?;
        if self.at("**") {
            self.advance();
            self.factor()?;
            self.build(Tag::Binary(BinaryOp::Power), 2);
        }
        Ok(())
    }

    fn ap(&mut self) -> Result<()> {
        self.r()?;
        while self.at("@") {
            self.advance();
            self.identifier()?;
            self.r()?;
            self.build(Tag::At, 3);
        }
        Ok(())
    }

    fn starts_rand(&self) -> bool {
        match &self.peek().kind {
            TokenKind::Identifier(_) | TokenKind::Integer(_) | TokenKind::Str(_) => true,
            TokenKind::Keyword(k) => matches!(*k, "true" | "false" | "nil" | "dummy"),
            TokenKind::Punctuation(p) => *p == '(',
            _ => false,
        }
    }

    fn r(&mut self) -> Result<()> {
        self.rn()?;
        while self.starts_rand() {
            self.rn()?;
            self.build(Tag::Gamma, 2);
        }
        Ok(())
    }

    fn rn(&mut self) -> Result<()> {
        let token = self.advance();
        match token.kind {
            TokenKind::Identifier(name) => self.leaf(Tag::Id(name)),
            TokenKind::Integer(value) => self.leaf(Tag::Int(value)),
            TokenKind::Str(value) => self.leaf(Tag::Str(value)),
            TokenKind::Keyword("true") => self.leaf(Tag::True),
            TokenKind::Keyword("false") => self.leaf(Tag::False),
            TokenKind::Keyword("nil") => self.leaf(Tag::Nil),
            TokenKind::Keyword("dummy") => self.leaf(Tag::Dummy),
            TokenKind::Punctuation('(') => {
                self.e()?;
                self.expect(")")?;
            }
            TokenKind::End => return Err(self.error("an operand")),
            _ => {
                self.pos -= 1;
                return Err(self.error("an operand"));
            }
        }
        Ok(())
    }

    fn d(&mut self) -> Result<()> {
        self.da()?;
        if self.at("within") {
            self.advance();
            self.d()?;
            self.build(Tag::Within, 2);
        }
        Ok(())
    }

    fn da(&mut self) -> Result<()> {
        self.dr()?;
        let mut n = 1;
        while self.at("and") {
            self.advance();
            self.dr()?;
            n += 1;
        }
        if n > 1 {
            self.build(Tag::And, n);
        }
        Ok(())
    }

    fn dr(&mut self) -> Result<()> {
        if self.at("rec") {
            self.advance();
            self.db()?;
            self.build(Tag::Rec, 1);
        } else {
            self.db()?;
        }
        Ok(())
    }

    fn db(&mut self) -> Result<()> {
        if self.at("(") {
            self.advance();
            self.d()?;
            return self.expect(")");
        }
        if !self.at_identifier() {
            return Err(self.error("a definition"));
        }
        let next = self.peek_at(1);
        if next.is("(") || matches!(next.kind, TokenKind::Identifier(_)) {
            self.identifier()?;
            let mut n = 1;
            while self.at_identifier() || self.at("(") {
                self.vb()?;
                n += 1;
            }
            self.expect("=")?;
            self.e()?;
            self.build(Tag::FunctionForm, n + 1);
        } else if next.is("=") {
            self.identifier()?;
            self.advance();
            self.e()?;
            self.build(Tag::Equal, 2);
        } else if next.is(",") {
            self.vl()?;
            self.expect("=")?;
            self.e()?;
            self.build(Tag::Equal, 2);
        } else {
            self.advance();
            return Err(self.error("`=`, `,` or a parameter"));
        }
        Ok(())
    }

    fn vb(&mut self) -> Result<()> {
        if self.at("(") {
            self.advance();
            if self.at_identifier() {
                self.vl()?;
                self.expect(")")?;
            } else {
                self.expect(")")?;
                self.leaf(Tag::EmptyParams);
            }
            Ok(())
        } else {
            self.identifier()
        }
    }

    fn vl(&mut self) -> Result<()> {
        self.identifier()?;
        let mut n = 1;
        while self.at(",") {
            self.advance();
            self.identifier()?;
            n += 1;
        }
        if n > 1 {
            self.build(Tag::Comma, n);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_text(source: &str) -> String {
        parse(source).unwrap().to_string()
    }

    #[test]
    fn let_expression() {
        assert_eq!(
            tree_text("let x = 3 in x + 4"),
            "let\n.=\n..<ID:x>\n..<INT:3>\n.+\n..<ID:x>\n..<INT:4>\n"
        );
    }

    #[test]
    fn where_and_application() {
        assert_eq!(
            tree_text("f x where f y = y"),
            "where\n.gamma\n..<ID:f>\n..<ID:x>\n.function_form\n..<ID:f>\n..<ID:y>\n..<ID:y>\n"
        );
    }

    #[test]
    fn conditional_and_comparison() {
        assert_eq!(
            tree_text("n > 0 -> 'pos' | 'neg'"),
            "->\n.gr\n..<ID:n>\n..<INT:0>\n.<STR:'pos'>\n.<STR:'neg'>\n"
        );
    }

    #[test]
    fn precedence_of_arithmetic() {
        assert_eq!(
            tree_text("-a + b * c ** 2 ** 3"),
            "+\n.neg\n..<ID:a>\n.*\n..<ID:b>\n..**\n...<ID:c>\n...**\n....<INT:2>\n....<INT:3>\n"
        );
    }

    #[test]
    fn tuples_aug_and_infix_application() {
        assert_eq!(
            tree_text("nil aug 1, x @f y"),
            "tau\n.aug\n..<nil>\n..<INT:1>\n.@\n..<ID:x>\n..<ID:f>\n..<ID:y>\n"
        );
    }

    #[test]
    fn lambda_with_tuple_and_empty_parameters() {
        assert_eq!(
            tree_text("fn (a, b) () c. a"),
            "lambda\n.,\n..<ID:a>\n..<ID:b>\n.()\n.<ID:c>\n.<ID:a>\n"
        );
    }

    #[test]
    fn simultaneous_recursive_and_within_definitions() {
        assert_eq!(
            tree_text("let rec f = 1 and g = 2 within h = 3 in h"),
            "let\n.within\n..and\n...rec\n....=\n.....<ID:f>\n.....<INT:1>\n...=\n....<ID:g>\n....<INT:2>\n..=\n...<ID:h>\n...<INT:3>\n.<ID:h>\n"
        );
    }

    #[test]
    fn errors_carry_position_and_expectation() {
        assert_eq!(
            parse("let x = 1 ; x").err(),
            Some(RpalError::Parse {
                offset: 10,
                expected: "`in`".into(),
                found: "`;`".into(),
            })
        );
        assert!(matches!(parse("1 +"), Err(RpalError::Parse { offset: 3, .. })));
        assert!(matches!(parse("(1"), Err(RpalError::Parse { .. })));
        assert!(matches!(parse("1 )"), Err(RpalError::Parse { .. })));
    }
}

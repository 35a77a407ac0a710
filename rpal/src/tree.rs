use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use num_bigint::BigInt;

use crate::cse::ops::{BinaryOp, UnaryOp};
use crate::error::{Result, RpalError};

/// The label carried by a tree node.
///
/// Sugared constructs (`Let` through `Rec`) only exist before standardization;
/// afterwards a tree holds `Gamma`, single-parameter `Lambda`, `Tau`, `Equal`,
/// `Conditional`, operators, `Comma` patterns and leaves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Tag {
    Let,
    Where,
    FunctionForm,
    Lambda,
    Within,
    At,
    And,
    Rec,
    Equal,
    Gamma,
    Tau,
    Comma,
    Conditional,
    Binary(BinaryOp),
    Unary(UnaryOp),
    YStar,
    EmptyParams,
    Id(String),
    Int(BigInt),
    Str(String),
    True,
    False,
    Nil,
    Dummy,
}

impl Tag {
    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            Tag::Id(_)
                | Tag::Int(_)
                | Tag::Str(_)
                | Tag::True
                | Tag::False
                | Tag::Nil
                | Tag::Dummy
                | Tag::YStar
                | Tag::EmptyParams
        )
    }
}

pub(crate) fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\n' => escaped.push_str("\\n"),
            '\t' => escaped.push_str("\\t"),
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            c => escaped.push(c),
        }
    }
    escaped
}

pub(crate) fn unescape(text: &str) -> std::result::Result<String, String> {
    let mut unescaped = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            unescaped.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => unescaped.push('\n'),
            Some('t') => unescaped.push('\t'),
            Some('\\') => unescaped.push('\\'),
            Some('\'') => unescaped.push('\''),
            Some(other) => return Err(format!("unknown escape sequence \\{other}")),
            None => return Err("dangling backslash".into()),
        }
    }
    Ok(unescaped)
}

impl Display for Tag {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Tag::Let => f.write_str("let"),
            Tag::Where => f.write_str("where"),
            Tag::FunctionForm => f.write_str("function_form"),
            Tag::Lambda => f.write_str("lambda"),
            Tag::Within => f.write_str("within"),
            Tag::At => f.write_str("@"),
            Tag::And => f.write_str("and"),
            Tag::Rec => f.write_str("rec"),
            Tag::Equal => f.write_str("="),
            Tag::Gamma => f.write_str("gamma"),
            Tag::Tau => f.write_str("tau"),
            Tag::Comma => f.write_str(","),
            Tag::Conditional => f.write_str("->"),
            Tag::Binary(op) => write!(f, "{op}"),
            Tag::Unary(op) => write!(f, "{op}"),
            Tag::YStar => f.write_str("<Y*>"),
            Tag::EmptyParams => f.write_str("()"),
            Tag::Id(name) => write!(f, "<ID:{name}>"),
            Tag::Int(value) => write!(f, "<INT:{value}>"),
            Tag::Str(value) => write!(f, "<STR:'{}'>", escape(value)),
            Tag::True => f.write_str("<true>"),
            Tag::False => f.write_str("<false>"),
            Tag::Nil => f.write_str("<nil>"),
            Tag::Dummy => f.write_str("<dummy>"),
        }
    }
}

impl FromStr for Tag {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let tag = match s {
            "let" => Tag::Let,
            "where" => Tag::Where,
            "function_form" | "fcn_form" => Tag::FunctionForm,
            "lambda" => Tag::Lambda,
            "within" => Tag::Within,
            "@" => Tag::At,
            "and" => Tag::And,
            "rec" => Tag::Rec,
            "=" => Tag::Equal,
            "gamma" => Tag::Gamma,
            "tau" => Tag::Tau,
            "," => Tag::Comma,
            "->" => Tag::Conditional,
            "<Y*>" => Tag::YStar,
            "()" => Tag::EmptyParams,
            "<true>" => Tag::True,
            "<false>" => Tag::False,
            "<nil>" => Tag::Nil,
            "<dummy>" => Tag::Dummy,
            _ => return parse_leaf(s),
        };
        Ok(tag)
    }
}

fn parse_leaf(s: &str) -> std::result::Result<Tag, String> {
    if let Ok(op) = s.parse::<UnaryOp>() {
        return Ok(Tag::Unary(op));
    }
    if let Ok(op) = s.parse::<BinaryOp>() {
        return Ok(Tag::Binary(op));
    }
    let Some(inner) = s.strip_prefix('<').and_then(|s| s.strip_suffix('>')) else {
        return Err(format!("unknown node tag `{s}`"));
    };
    let Some((kind, literal)) = inner.split_once(':') else {
        return Err(format!("unknown node tag `{s}`"));
    };
    match kind {
        "ID" | "IDENTIFIER" => Ok(Tag::Id(literal.to_string())),
        "INT" | "INTEGER" => literal
            .parse()
            .map(Tag::Int)
            .map_err(|_| format!("invalid integer literal `{literal}`")),
        "STR" | "STRING" => {
            let quoted = literal
                .strip_prefix('\'')
                .and_then(|l| l.strip_suffix('\''))
                .unwrap_or(literal);
            unescape(quoted).map(Tag::Str)
        }
        "TRUE_VALUE" | "TRUE" | "FALSE" if literal.starts_with('t') => Ok(Tag::True),
        "TRUE_VALUE" | "TRUE" | "FALSE" if literal.starts_with('f') => Ok(Tag::False),
        "NIL" => Ok(Tag::Nil),
        "DUMMY" => Ok(Tag::Dummy),
        _ => Err(format!("unknown leaf kind `{kind}`")),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Clone, Debug)]
pub struct Node {
    pub tag: Tag,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
    pub depth: usize,
    pub standardized: bool,
}

/// Nodes under construction, before a root has been chosen.
#[derive(Debug, Default)]
pub(crate) struct TreeBuilder {
    nodes: Vec<Node>,
}

impl TreeBuilder {
    pub fn add(&mut self, tag: Tag, children: Vec<NodeId>) -> NodeId {
        push_node(&mut self.nodes, tag, children)
    }

    pub fn leaf(&mut self, tag: Tag) -> NodeId {
        self.add(tag, vec![])
    }

    fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn finish(self, root: NodeId) -> Tree {
        let mut tree = Tree {
            nodes: self.nodes,
            root,
        };
        tree.set_root(root);
        tree
    }
}

fn push_node(nodes: &mut Vec<Node>, tag: Tag, children: Vec<NodeId>) -> NodeId {
    let id = NodeId(nodes.len());
    for &child in &children {
        nodes[child.0].parent = Some(id);
    }
    nodes.push(Node {
        tag,
        children,
        parent: None,
        depth: 0,
        standardized: false,
    });
    id
}

/// An arena of nodes. A node is owned by the arena and reached from its
/// parent's child list; `parent` is only a navigation index.
#[derive(Clone, Debug)]
pub struct Tree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Tree {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn tag(&self, id: NodeId) -> &Tag {
        &self.nodes[id.0].tag
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn child(&self, id: NodeId, index: usize) -> NodeId {
        self.nodes[id.0].children[index]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn depth(&self, id: NodeId) -> usize {
        self.nodes[id.0].depth
    }

    /// Adds a node owning `children`. Depths are settled once the node is
    /// attached below the root.
    pub fn add(&mut self, tag: Tag, children: Vec<NodeId>) -> NodeId {
        push_node(&mut self.nodes, tag, children)
    }

    pub fn leaf(&mut self, tag: Tag) -> NodeId {
        self.add(tag, vec![])
    }

    pub fn set_root(&mut self, id: NodeId) {
        self.nodes[id.0].parent = None;
        self.root = id;
        self.settle_depths(id, 0);
    }

    /// Replaces the child list of `id`, re-parenting every new child.
    pub(crate) fn set_children(&mut self, id: NodeId, children: Vec<NodeId>) {
        let depth = self.nodes[id.0].depth;
        for &child in &children {
            self.nodes[child.0].parent = Some(id);
            self.settle_depths(child, depth + 1);
        }
        self.nodes[id.0].children = children;
    }

    fn settle_depths(&mut self, id: NodeId, depth: usize) {
        let mut pending = vec![(id, depth)];
        while let Some((id, depth)) = pending.pop() {
            let node = &mut self.nodes[id.0];
            node.depth = depth;
            pending.extend(node.children.iter().map(|&c| (c, depth + 1)));
        }
    }

    /// Rebuilds a tree from its dot-indented text form: one node per line,
    /// one leading `.` per level of depth.
    pub fn from_indented(text: &str) -> Result<Tree> {
        let mut builder = TreeBuilder::default();
        // ancestors[d] is the latest node seen at depth d
        let mut ancestors: Vec<NodeId> = vec![];
        for (number, line) in text.lines().enumerate() {
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }
            let label = line.trim_start_matches('.');
            let depth = line.len() - label.len();
            let tag: Tag = label.parse().map_err(|message| RpalError::TreeText {
                line: number + 1,
                message,
            })?;
            if depth > ancestors.len() || (depth == 0 && !ancestors.is_empty()) {
                return Err(RpalError::TreeText {
                    line: number + 1,
                    message: format!("unexpected depth {depth}"),
                });
            }
            let id = builder.leaf(tag);
            ancestors.truncate(depth);
            if let Some(&parent) = ancestors.last() {
                builder.attach(parent, id);
            }
            ancestors.push(id);
        }
        let root = *ancestors.first().ok_or(RpalError::TreeText {
            line: 0,
            message: "empty tree".into(),
        })?;
        Ok(builder.finish(root))
    }

    fn write_node(&self, f: &mut Formatter, id: NodeId, level: usize) -> fmt::Result {
        writeln!(f, "{}{}", ".".repeat(level), self.tag(id))?;
        for &child in self.children(id) {
            self.write_node(f, child, level + 1)?;
        }
        Ok(())
    }
}

impl Display for Tree {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        self.write_node(f, self.root, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LET_TREE: &str = "\
let
.=
..<ID:x>
..<INT:3>
.+
..<ID:x>
..<INT:4>
";

    #[test]
    fn reads_and_prints_indented_text() {
        let tree = Tree::from_indented(LET_TREE).unwrap();
        assert_eq!(tree.to_string(), LET_TREE);

        let root = tree.root();
        assert_eq!(tree.tag(root), &Tag::Let);
        let plus = tree.child(root, 1);
        assert_eq!(tree.tag(plus), &Tag::Binary(BinaryOp::Add));
        assert_eq!(tree.parent(plus), Some(root));
        assert_eq!(tree.depth(tree.child(plus, 1)), 2);
    }

    #[test]
    fn accepts_long_leaf_names() {
        let text = "tau\n.<IDENTIFIER:a>\n.<INTEGER:12>\n.<STRING:'hi there'>\n.<TRUE_VALUE:true>\n";
        let tree = Tree::from_indented(text).unwrap();
        let tags: Vec<_> = tree.children(tree.root()).iter().map(|&c| tree.tag(c).clone()).collect();
        assert_eq!(
            tags,
            vec![
                Tag::Id("a".into()),
                Tag::Int(12.into()),
                Tag::Str("hi there".into()),
                Tag::True,
            ]
        );
    }

    #[test]
    fn rejects_depth_jumps_and_unknown_tags() {
        assert!(matches!(
            Tree::from_indented("gamma\n...<ID:x>\n"),
            Err(RpalError::TreeText { line: 2, .. })
        ));
        assert!(matches!(
            Tree::from_indented("frobnicate\n"),
            Err(RpalError::TreeText { line: 1, .. })
        ));
        assert!(Tree::from_indented("").is_err());
    }

    #[test]
    fn builder_roots_the_finished_tree() {
        let mut builder = TreeBuilder::default();
        let x = builder.leaf(Tag::Id("x".into()));
        let one = builder.leaf(Tag::Int(1.into()));
        let plus = builder.add(Tag::Binary(BinaryOp::Add), vec![x, one]);
        let tree = builder.finish(plus);
        assert_eq!(tree.root(), plus);
        assert_eq!(tree.parent(plus), None);
        assert_eq!(tree.depth(one), 1);
        assert_eq!(tree.to_string(), "+\n.<ID:x>\n.<INT:1>\n");

        let single = Tree::from_indented("<INT:7>\n").unwrap();
        assert_eq!(single.tag(single.root()), &Tag::Int(7.into()));
        assert_eq!(single.to_string(), "<INT:7>\n");
    }

    #[test]
    fn strings_round_trip_their_escapes() {
        let tag = Tag::Str("it's\n".into());
        assert_eq!(tag.to_string(), "<STR:'it\\'s\\n'>");
        assert_eq!(tag.to_string().parse::<Tag>(), Ok(tag));
    }
}

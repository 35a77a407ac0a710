//! Rewrites a parsed tree in place into the core forms the control compiler
//! understands: `gamma`, single-parameter `lambda`, `tau`, `=`, `->`,
//! operators and leaves.

use tracing::debug;

use crate::error::{Result, RpalError};
use crate::tree::{NodeId, Tag, Tree};

pub fn standardize(tree: &mut Tree) -> Result<()> {
    let root = tree.root();
    standardize_node(tree, root)
}

/// Post-order: children first, then the node itself. A node is rewritten at
/// most once.
pub fn standardize_node(tree: &mut Tree, id: NodeId) -> Result<()> {
    if tree.node(id).standardized {
        return Ok(());
    }
    let children = tree.children(id).to_vec();
    for child in children {
        standardize_node(tree, child)?;
    }
    rewrite(tree, id)?;
    tree.node_mut(id).standardized = true;
    Ok(())
}

fn rewrite(tree: &mut Tree, id: NodeId) -> Result<()> {
    let tag = tree.tag(id).clone();
    match tag {
        Tag::Let => rewrite_let(tree, id)?,
        Tag::Where => {
            let [body, binding] = children::<2>(tree, id)?;
            tree.set_children(id, vec![binding, body]);
            tree.node_mut(id).tag = Tag::Let;
            rewrite_let(tree, id)?;
        }
        Tag::FunctionForm => {
            let children = tree.children(id).to_vec();
            if children.len() < 3 {
                return Err(arity(tree, id, "a name, parameters and a body"));
            }
            let last = children.len() - 1;
            let lambda = curry(tree, &children[1..last], children[last]);
            tree.set_children(id, vec![children[0], lambda]);
            tree.node_mut(id).tag = Tag::Equal;
        }
        Tag::Lambda => {
            let children = tree.children(id).to_vec();
            if children.len() < 2 {
                return Err(arity(tree, id, "a parameter and a body"));
            }
            if children.len() == 2 {
                return Ok(());
            }
            let last = children.len() - 1;
            let inner = curry(tree, &children[1..last], children[last]);
            tree.set_children(id, vec![children[0], inner]);
        }
        Tag::Within => {
            let [outer, inner] = children::<2>(tree, id)?;
            let (x1, e1) = binding(tree, outer)?;
            let (x2, e2) = binding(tree, inner)?;
            let lambda = fresh(tree, Tag::Lambda, vec![x1, e2]);
            let gamma = fresh(tree, Tag::Gamma, vec![lambda, e1]);
            tree.set_children(id, vec![x2, gamma]);
            tree.node_mut(id).tag = Tag::Equal;
        }
        Tag::At => {
            let [left, function, right] = children::<3>(tree, id)?;
            let inner = fresh(tree, Tag::Gamma, vec![function, left]);
            tree.set_children(id, vec![inner, right]);
            tree.node_mut(id).tag = Tag::Gamma;
        }
        Tag::And => {
            let bindings = tree.children(id).to_vec();
            if bindings.is_empty() {
                return Err(arity(tree, id, "at least one binding"));
            }
            let (names, values): (Vec<_>, Vec<_>) = bindings
                .into_iter()
                .map(|b| binding(tree, b))
                .collect::<Result<Vec<_>>>()?
                .into_iter()
                .unzip();
            let pattern = fresh(tree, Tag::Comma, names);
            let tuple = fresh(tree, Tag::Tau, values);
            tree.set_children(id, vec![pattern, tuple]);
            tree.node_mut(id).tag = Tag::Equal;
        }
        Tag::Rec => {
            let [inner] = children::<1>(tree, id)?;
            let (name, body) = binding(tree, inner)?;
            let bound = copy_subtree(tree, name);
            let ystar = fresh(tree, Tag::YStar, vec![]);
            let lambda = fresh(tree, Tag::Lambda, vec![name, body]);
            let gamma = fresh(tree, Tag::Gamma, vec![ystar, lambda]);
            tree.set_children(id, vec![bound, gamma]);
            tree.node_mut(id).tag = Tag::Equal;
        }
        _ => return Ok(()),
    }
    debug!(rule = %tag, into = %tree.tag(id), "rewrote node");
    Ok(())
}

// let (= X E) P  =>  gamma (lambda X P) E
fn rewrite_let(tree: &mut Tree, id: NodeId) -> Result<()> {
    let [definition, body] = children::<2>(tree, id)?;
    let (name, value) = binding(tree, definition)?;
    tree.set_children(definition, vec![name, body]);
    tree.node_mut(definition).tag = Tag::Lambda;
    tree.set_children(id, vec![definition, value]);
    tree.node_mut(id).tag = Tag::Gamma;
    Ok(())
}

/// Right-nests single-parameter lambdas around `body`, one per parameter.
fn curry(tree: &mut Tree, params: &[NodeId], body: NodeId) -> NodeId {
    params
        .iter()
        .rev()
        .fold(body, |body, &param| fresh(tree, Tag::Lambda, vec![param, body]))
}

fn fresh(tree: &mut Tree, tag: Tag, children: Vec<NodeId>) -> NodeId {
    let id = tree.add(tag, children);
    tree.node_mut(id).standardized = true;
    id
}

fn copy_subtree(tree: &mut Tree, id: NodeId) -> NodeId {
    let children = tree.children(id).to_vec();
    let copies = children.into_iter().map(|c| copy_subtree(tree, c)).collect();
    let tag = tree.tag(id).clone();
    fresh(tree, tag, copies)
}

fn children<const N: usize>(tree: &Tree, id: NodeId) -> Result<[NodeId; N]> {
    tree.children(id)
        .try_into()
        .map_err(|_| arity(tree, id, &format!("{N} children")))
}

/// Splits an `=` node into its bound name (or pattern) and its value.
fn binding(tree: &Tree, id: NodeId) -> Result<(NodeId, NodeId)> {
    if *tree.tag(id) != Tag::Equal {
        return Err(RpalError::malformed(
            tree.tag(id),
            "expected a `=` definition",
        ));
    }
    let [name, value] = children::<2>(tree, id)?;
    Ok((name, value))
}

fn arity(tree: &Tree, id: NodeId, expected: &str) -> RpalError {
    RpalError::malformed(
        tree.tag(id),
        format!(
            "expected {expected}, found {} children",
            tree.children(id).len()
        ),
    )
}

use std::collections::BTreeMap;
use std::fmt::{self, Debug, Formatter};

use super::symbol::Symbol;

/// One binding frame. Frames are never removed from the machine, only retired,
/// since closures keep referring to them by index.
#[derive(Clone)]
pub struct Environment {
    pub index: usize,
    pub parent: Option<usize>,
    pub retired: bool,
    bindings: BTreeMap<String, Symbol>,
}

impl Environment {
    pub fn root() -> Environment {
        Environment::new(0, None)
    }

    pub fn new(index: usize, parent: Option<usize>) -> Environment {
        Environment {
            index,
            parent,
            retired: false,
            bindings: BTreeMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.bindings.get(name)
    }

    pub fn bind(&mut self, name: impl Into<String>, value: Symbol) {
        self.bindings.insert(name.into(), value);
    }

    /// Bindings in name order.
    pub fn bindings(&self) -> impl Iterator<Item = (&str, &Symbol)> {
        self.bindings.iter().map(|(name, value)| (name.as_str(), value))
    }
}

/// Walks `start` and its ancestors for the nearest binding of `name`.
pub fn lookup<'a>(environments: &'a [Environment], start: usize, name: &str) -> Option<&'a Symbol> {
    let mut next = Some(start);
    while let Some(index) = next {
        let env = environments.get(index)?;
        if let Some(value) = env.get(name) {
            return Some(value);
        }
        next = env.parent;
    }
    None
}

impl Debug for Environment {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "Env({}", self.index)?;
        if let Some(parent) = self.parent {
            write!(f, " <- {parent}")?;
        }
        if self.retired {
            f.write_str(", retired")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_follows_parents_and_shadows() {
        let mut root = Environment::root();
        root.bind("x", Symbol::Int(1.into()));
        root.bind("y", Symbol::Int(2.into()));
        let mut child = Environment::new(1, Some(0));
        child.bind("x", Symbol::Int(10.into()));
        let sibling = Environment::new(2, Some(0));
        let envs = vec![root, child, sibling];

        assert_eq!(lookup(&envs, 1, "x"), Some(&Symbol::Int(10.into())));
        assert_eq!(lookup(&envs, 1, "y"), Some(&Symbol::Int(2.into())));
        assert_eq!(lookup(&envs, 2, "x"), Some(&Symbol::Int(1.into())));
        assert_eq!(lookup(&envs, 2, "z"), None);
    }

    #[test]
    fn debug_shows_links() {
        let mut env = Environment::new(3, Some(1));
        env.retired = true;
        assert_eq!(format!("{env:?}"), "Env(3 <- 1, retired)");
    }
}

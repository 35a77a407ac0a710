use std::{ffi::OsStr, fs, path::Path};

use anyhow::{Context, Result};
use tracing::debug;

use crate::{parser, standardize::standardize, tree::Tree};

/// A program read from disk, before standardization.
pub struct LoadedProgram {
    pub tree: Tree,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileType {
    Source,
    /// Dot-indented tree text, as printed by `--ast`.
    Tree,
}

pub fn identify_file_type(file: &Path) -> FileType {
    match file.extension().and_then(OsStr::to_str) {
        Some("ast") | Some("tree") => FileType::Tree,
        _ => FileType::Source,
    }
}

pub fn load_program(text: &str, file_type: FileType) -> Result<LoadedProgram> {
    let tree = match file_type {
        FileType::Source => parser::parse(text).context("could not parse program")?,
        FileType::Tree => Tree::from_indented(text).context("could not read tree")?,
    };
    Ok(LoadedProgram { tree })
}

pub fn load_program_from_file(file: &Path) -> Result<LoadedProgram> {
    let file_type = identify_file_type(file);
    debug!(file = %file.display(), ?file_type, "loading program");
    let text = fs::read_to_string(file)
        .with_context(|| format!("could not read {}", file.display()))?;
    load_program(&text, file_type).with_context(|| format!("in {}", file.display()))
}

impl LoadedProgram {
    pub fn standardized(&self) -> Result<Tree> {
        let mut tree = self.tree.clone();
        standardize(&mut tree).context("could not standardize program")?;
        Ok(tree)
    }
}

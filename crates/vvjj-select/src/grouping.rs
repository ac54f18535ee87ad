//! Input lists: whitespace-separated `<ntuple-path> <generator-label>` pairs.
//!
//! All files sharing a label form one group, processed as a single run. A
//! `#` starts a comment that runs to the end of the line.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use vvjj_core::{Error, Result};

/// Files of one generator label, in list order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputGroup {
    /// Generator label; also the name of the group's output directory.
    pub label: String,
    /// Event tables, in the order they appeared in the list.
    pub files: Vec<PathBuf>,
}

impl InputGroup {
    /// Fail with a configuration error naming the first missing file.
    pub fn check_files(&self) -> Result<()> {
        match self.files.iter().find(|p| !p.is_file()) {
            Some(missing) => Err(Error::Config(format!(
                "group '{}': input file {} does not exist",
                self.label,
                missing.display()
            ))),
            None => Ok(()),
        }
    }
}

/// Labels name output directories: no separators, and no leading `.`
/// (which also rules out `.` / `..` and staging directories).
fn check_label(label: &str) -> Result<()> {
    if label.contains(['/', '\\']) || label.starts_with('.') {
        return Err(Error::Config(format!(
            "generator label '{label}' cannot be used as a directory name"
        )));
    }
    Ok(())
}

/// Two labels differing only in case share one directory on
/// case-insensitive file systems.
fn check_case_collisions<'a>(labels: impl Iterator<Item = &'a String>) -> Result<()> {
    let mut seen: HashMap<String, &str> = HashMap::new();
    for label in labels {
        if let Some(other) = seen.insert(label.to_lowercase(), label) {
            return Err(Error::Config(format!(
                "generator labels '{other}' and '{label}' differ only in case"
            )));
        }
    }
    Ok(())
}

/// Parse list text. Relative paths are resolved against `base_dir`; groups
/// come back sorted by label.
pub fn parse_input_list(text: &str, base_dir: &Path) -> Result<Vec<InputGroup>> {
    let mut tokens = text
        .lines()
        .map(|line| line.split_once('#').map_or(line, |(head, _)| head))
        .flat_map(str::split_whitespace);

    let mut groups: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    while let Some(path) = tokens.next() {
        let Some(label) = tokens.next() else {
            return Err(Error::Config(format!(
                "malformed input list: '{path}' has no generator label"
            )));
        };
        check_label(label)?;
        let path = Path::new(path);
        let path = if path.is_absolute() { path.to_path_buf() } else { base_dir.join(path) };
        groups.entry(label.to_string()).or_default().push(path);
    }

    if groups.is_empty() {
        return Err(Error::Config("input list names no files".into()));
    }
    check_case_collisions(groups.keys())?;
    Ok(groups.into_iter().map(|(label, files)| InputGroup { label, files }).collect())
}

/// Read and parse a list file.
pub fn read_input_list(path: &Path) -> Result<Vec<InputGroup>> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("cannot read input list {}: {e}", path.display()))
    })?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
    let groups = parse_input_list(&text, base_dir)?;
    tracing::debug!(
        list = %path.display(),
        groups = groups.len(),
        files = groups.iter().map(|g| g.files.len()).sum::<usize>(),
        "parsed input list"
    );
    Ok(groups)
}

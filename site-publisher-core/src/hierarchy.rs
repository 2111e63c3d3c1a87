//! Local hierarchy building: turns a filesystem path into an owned tree of
//! [`FileNode`]s, plus a lazy line renderer for diagnostics.
//!
//! Children are kept in filesystem enumeration order (whatever `read_dir`
//! yields), not sorted. Callers that need stable output should not rely on
//! sibling order across platforms.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, error};

use crate::error::{PublishError, Result};

/// Directory or file, with the children owned by the directory variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Directory(Vec<FileNode>),
    File,
}

/// A named entry of a local hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNode {
    /// Leaf name, never contains a path separator.
    pub name: String,
    /// Local path the content is read from at publish time. Never sent remotely.
    pub full_path: PathBuf,
    /// Set only on the node for the path the caller passed in.
    pub is_root: bool,
    pub kind: NodeKind,
}

impl FileNode {
    pub fn is_directory(&self) -> bool {
        matches!(self.kind, NodeKind::Directory(_))
    }

    pub fn children(&self) -> &[FileNode] {
        match &self.kind {
            NodeKind::Directory(children) => children,
            NodeKind::File => &[],
        }
    }

    pub fn has_children(&self) -> bool {
        !self.children().is_empty()
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(FileNode::node_count).sum::<usize>()
    }

    /// Number of file nodes in this subtree.
    pub fn file_count(&self) -> usize {
        match &self.kind {
            NodeKind::File => 1,
            NodeKind::Directory(children) => children.iter().map(FileNode::file_count).sum(),
        }
    }
}

/// Glob-style file name filter: `*` matches any run of characters, `?` a
/// single character. Matching is on the whole name and ignores ASCII case.
#[derive(Debug, Clone)]
pub struct NameFilter {
    pattern: String,
    // None means "match everything".
    regex: Option<Regex>,
}

impl NameFilter {
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = pattern.trim();
        if pattern.is_empty() || pattern.chars().all(|c| c == '*') {
            return Ok(Self::default());
        }

        let mut expr = String::from("(?is)^");
        let mut literal = [0u8; 4];
        for c in pattern.chars() {
            match c {
                '*' => expr.push_str(".*"),
                '?' => expr.push('.'),
                other => expr.push_str(&regex::escape(other.encode_utf8(&mut literal))),
            }
        }
        expr.push('$');

        let regex = Regex::new(&expr).map_err(|e| {
            error!(pattern, error = %e, "Failed to compile name filter");
            PublishError::InvalidFilter(pattern.to_string())
        })?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex: Some(regex),
        })
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regex.as_ref().map_or(true, |re| re.is_match(name))
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }
}

impl Default for NameFilter {
    fn default() -> Self {
        Self {
            pattern: "*".to_string(),
            regex: None,
        }
    }
}

/// How a hierarchy is built below the starting path.
#[derive(Debug, Clone)]
pub struct HierarchyOptions {
    pub recursive: bool,
    /// Applied to file entries only; sub-directories are always kept.
    pub filter: NameFilter,
}

impl Default for HierarchyOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            filter: NameFilter::default(),
        }
    }
}

impl HierarchyOptions {
    pub fn new(recursive: bool, filter: &str) -> Result<Self> {
        Ok(Self {
            recursive,
            filter: NameFilter::new(filter)?,
        })
    }
}

/// Build the hierarchy rooted at `path`.
///
/// A directory lists its direct entries (files filtered by `options.filter`).
/// With `options.recursive` each entry is built in turn; otherwise entries are
/// captured shallowly, directories without children. A file yields a leaf.
///
/// Any stat or listing failure aborts the whole build with
/// [`PublishError::PathAccess`], except for entries the filter excludes
/// anyway. Symbolic links are followed; a link back to one of its own
/// ancestor directories is reported as a `PathAccess` error on the link.
pub fn build_hierarchy<P: AsRef<Path>>(
    path: P,
    options: &HierarchyOptions,
    is_root: bool,
) -> Result<FileNode> {
    let path = path.as_ref();
    let is_dir = stat_is_dir(path)?;
    let mut ancestors = Vec::new();
    let node = build_node(path, is_dir, options, is_root, &mut ancestors)?;
    debug!(
        path = %path.display(),
        nodes = node.node_count(),
        files = node.file_count(),
        "Built local hierarchy"
    );
    Ok(node)
}

fn build_node(
    path: &Path,
    is_dir: bool,
    options: &HierarchyOptions,
    is_root: bool,
    ancestors: &mut Vec<PathBuf>,
) -> Result<FileNode> {
    let name = node_name(path);
    if !is_dir {
        return Ok(FileNode {
            name,
            full_path: path.to_path_buf(),
            is_root,
            kind: NodeKind::File,
        });
    }

    let canonical = fs::canonicalize(path).map_err(|e| access_error(path, e))?;
    if ancestors.contains(&canonical) {
        let cycle = io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("symbolic link cycle back to {}", canonical.display()),
        );
        return Err(access_error(path, cycle));
    }

    let entries = fs::read_dir(path).map_err(|e| access_error(path, e))?;
    ancestors.push(canonical);
    let mut children = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| access_error(path, e))?;
        let child_path = entry.path();
        let wanted = options.filter.matches(&entry.file_name().to_string_lossy());
        let child_is_dir = match fs::metadata(&child_path) {
            Ok(meta) => meta.is_dir(),
            Err(e) if !wanted => {
                debug!(path = %child_path.display(), error = %e, "Skipping unreadable filtered entry");
                continue;
            }
            Err(e) => return Err(access_error(&child_path, e)),
        };

        if !child_is_dir && !wanted {
            debug!(path = %child_path.display(), filter = options.filter.as_str(), "Skipping filtered file");
            continue;
        }

        let child = if options.recursive {
            build_node(&child_path, child_is_dir, options, false, ancestors)?
        } else {
            FileNode {
                name: node_name(&child_path),
                full_path: child_path,
                is_root: false,
                kind: if child_is_dir {
                    NodeKind::Directory(Vec::new())
                } else {
                    NodeKind::File
                },
            }
        };
        children.push(child);
    }
    ancestors.pop();

    Ok(FileNode {
        name,
        full_path: path.to_path_buf(),
        is_root,
        kind: NodeKind::Directory(children),
    })
}

fn stat_is_dir(path: &Path) -> Result<bool> {
    fs::metadata(path)
        .map(|meta| meta.is_dir())
        .map_err(|e| access_error(path, e))
}

fn access_error(path: &Path, e: std::io::Error) -> PublishError {
    error!(path = %path.display(), error = %e, "Cannot access local path");
    PublishError::path_access(path, e)
}

fn node_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

const BRANCH: &str = "├-";
const LAST_BRANCH: &str = "└-";
const PIPE_INDENT: &str = "│ ";
const BLANK_INDENT: &str = "  ";

/// Lazily render `node` as display lines, one per node.
///
/// The top node is its bare name. Descendants are `<indent><marker><name>`
/// where the last sibling uses `└-` and the others `├-`. Each call starts a
/// fresh traversal, so the output can be re-derived at will.
pub fn render_hierarchy(node: &FileNode) -> HierarchyLines<'_> {
    HierarchyLines {
        stack: vec![Pending {
            node,
            indent: String::new(),
            last: None,
        }],
    }
}

#[derive(Debug, Clone)]
struct Pending<'a> {
    node: &'a FileNode,
    indent: String,
    // None for the top node.
    last: Option<bool>,
}

/// Iterator returned by [`render_hierarchy`].
#[derive(Debug, Clone)]
pub struct HierarchyLines<'a> {
    stack: Vec<Pending<'a>>,
}

impl Iterator for HierarchyLines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let Pending { node, indent, last } = self.stack.pop()?;

        let (line, child_indent) = match last {
            None => (node.name.clone(), indent),
            Some(last) => {
                let marker = if last { LAST_BRANCH } else { BRANCH };
                let line = format!("{indent}{marker}{}", node.name);
                let unit = if last { BLANK_INDENT } else { PIPE_INDENT };
                (line, format!("{indent}{unit}"))
            }
        };

        let children = node.children();
        for (idx, child) in children.iter().enumerate().rev() {
            self.stack.push(Pending {
                node: child,
                indent: child_indent.clone(),
                last: Some(idx + 1 == children.len()),
            });
        }
        Some(line)
    }
}

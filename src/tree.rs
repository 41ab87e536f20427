//! Hierarchical view of a scan and its rendering.
//!
//! [`build_tree`] turns a flat, path-sorted record list into a forest in
//! which every path appears exactly once. [`render_tree`] draws that forest
//! with box-drawing characters.

use std::collections::HashMap;

use tracing::warn;

use crate::record::{parent_path, FileRecord};

/// Rebuild the hierarchy implied by the records' paths.
///
/// Every intermediate directory implied by a path is synthesized if no record
/// for it exists. Children are sorted by path at every level. Only directories
/// get children: a record whose parent path belongs to a file stays at the top
/// level.
///
/// # Examples
///
/// ```
/// use diffdeck::record::FileRecord;
/// use diffdeck::tree::build_tree;
///
/// let forest = build_tree(vec![FileRecord::unread("a/b/c.go", 10)]);
/// assert_eq!(forest.len(), 1);
/// assert_eq!(forest[0].path, "a");
/// assert_eq!(forest[0].children[0].children[0].path, "a/b/c.go");
/// ```
pub fn build_tree(records: Vec<FileRecord>) -> Vec<FileRecord> {
    let mut nodes: HashMap<String, FileRecord> = HashMap::with_capacity(records.len());

    for mut record in records {
        record.children.clear();
        nodes.entry(record.path.clone()).or_insert(record);
    }

    let explicit: Vec<String> = nodes.keys().cloned().collect();
    for path in explicit {
        let mut parent = parent_path(&path);
        while !parent.is_empty() && !nodes.contains_key(parent) {
            nodes.insert(parent.to_string(), FileRecord::directory(parent));
            parent = parent_path(parent);
        }
    }

    // Deepest first, so a node is complete before it is attached.
    let mut paths: Vec<String> = nodes.keys().cloned().collect();
    paths.sort_by(|a, b| depth(b).cmp(&depth(a)).then_with(|| a.cmp(b)));

    let mut roots = Vec::new();
    for path in paths {
        let Some(node) = nodes.remove(&path) else {
            continue;
        };
        let parent = parent_path(&path);
        match nodes.get_mut(parent) {
            Some(parent_node) if !parent.is_empty() && parent_node.is_directory => {
                parent_node.children.push(node)
            }
            Some(_) if !parent.is_empty() => {
                warn!(path = %path, parent = %parent, "parent is a file, keeping at top level");
                roots.push(node);
            }
            _ => roots.push(node),
        }
    }

    sort_forest(&mut roots);
    roots
}

fn depth(path: &str) -> usize {
    bytecount::count(path.as_bytes(), b'/')
}

fn sort_forest(nodes: &mut [FileRecord]) {
    nodes.sort_by(|a, b| a.path.cmp(&b.path));
    for node in nodes {
        sort_forest(&mut node.children);
    }
}

/// Options for rendering the tree.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Show file sizes.
    pub show_size: bool,
    /// Show line counts.
    pub show_lines: bool,
    /// Show directories that contain no files.
    pub show_empty_directories: bool,
}

impl RenderOptions {
    /// Create options with all metadata enabled.
    pub fn with_metadata() -> Self {
        Self {
            show_size: true,
            show_lines: true,
            ..Default::default()
        }
    }
}

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const VERTICAL: &str = "│   ";
const SPACE: &str = "    ";

/// Render a forest with box-drawing characters, one entry per line.
///
/// # Examples
///
/// ```
/// use diffdeck::record::FileRecord;
/// use diffdeck::tree::{build_tree, render_tree, RenderOptions};
///
/// let forest = build_tree(vec![
///     FileRecord::unread("src/main.rs", 10),
///     FileRecord::unread("Cargo.toml", 5),
/// ]);
/// let output = render_tree(&forest, &RenderOptions::default());
/// assert_eq!(output, "├── Cargo.toml\n└── src/\n    └── main.rs\n");
/// ```
pub fn render_tree(forest: &[FileRecord], options: &RenderOptions) -> String {
    let mut output = String::with_capacity(4096);
    render_level(&mut output, forest, "", options);
    output
}

fn render_level(output: &mut String, nodes: &[FileRecord], prefix: &str, options: &RenderOptions) {
    let visible: Vec<&FileRecord> = nodes
        .iter()
        .filter(|node| options.show_empty_directories || !is_empty_directory(node))
        .collect();

    let count = visible.len();
    for (i, node) in visible.into_iter().enumerate() {
        let is_last = i + 1 == count;

        output.push_str(prefix);
        output.push_str(if is_last { LAST_BRANCH } else { BRANCH });
        output.push_str(node.name());

        if node.is_directory {
            output.push('/');
        } else {
            push_metadata(output, node, options);
        }
        output.push('\n');

        if !node.children.is_empty() {
            let child_prefix = format!("{}{}", prefix, if is_last { SPACE } else { VERTICAL });
            render_level(output, &node.children, &child_prefix, options);
        }
    }
}

fn push_metadata(output: &mut String, node: &FileRecord, options: &RenderOptions) {
    let mut metadata = Vec::new();

    if options.show_lines {
        if let Some(lines) = node.line_count() {
            metadata.push(format!("{} lines", format_number(lines)));
        }
    }
    if options.show_size {
        metadata.push(format_size(node.size));
    }

    if !metadata.is_empty() {
        output.push_str(" [");
        output.push_str(&metadata.join(", "));
        output.push(']');
    }
}

fn is_empty_directory(node: &FileRecord) -> bool {
    node.is_directory && node.file_count() == 0
}

/// Format file size for display.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes < KB {
        format!("{}B", bytes)
    } else if bytes < MB {
        format!("{:.1}KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.1}MB", bytes as f64 / MB as f64)
    }
}

/// Format number with thousands separators.
pub fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

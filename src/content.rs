//! Line-based text transforms applied before output.
//!
//! Comment removal works on whole lines and does not parse string literals.

/// Comment syntax recognized for an extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommentStyle {
    /// `//` lines and `/* ... */` blocks.
    CFamily,
    /// `#` lines.
    Hash,
    /// Single-line `<!-- ... -->`.
    Markup,
}

fn comment_style(extension: &str) -> Option<CommentStyle> {
    let style = match extension.trim_start_matches('.').to_lowercase().as_str() {
        "go" | "java" | "js" | "jsx" | "mjs" | "cjs" | "ts" | "tsx" | "rs" | "c" | "h"
        | "cc" | "cpp" | "cxx" | "hpp" | "cs" | "kt" | "swift" | "scala" | "php" => {
            CommentStyle::CFamily
        }
        "py" | "pyi" | "sh" | "bash" | "zsh" | "rb" | "pl" | "yaml" | "yml" | "toml" | "r" => {
            CommentStyle::Hash
        }
        "html" | "htm" | "xml" | "svg" | "vue" => CommentStyle::Markup,
        _ => return None,
    };
    Some(style)
}

/// Drop comment lines for languages recognized by `extension`.
///
/// Lines that only contain a comment are removed; code followed by a
/// trailing comment is kept as is. Unknown extensions are returned unchanged.
///
/// ```
/// use diffdeck::content::remove_comments;
///
/// let src = "// header\nfn main() {}\n/* a\n b */\nlet x = 1;";
/// assert_eq!(remove_comments(src, "rs"), "fn main() {}\nlet x = 1;");
/// ```
pub fn remove_comments(content: &str, extension: &str) -> String {
    let Some(style) = comment_style(extension) else {
        return content.to_string();
    };

    let mut kept = Vec::new();
    let mut in_block = false;

    for line in content.split('\n') {
        let trimmed = line.trim();

        match style {
            CommentStyle::CFamily => {
                if in_block {
                    if trimmed.contains("*/") {
                        in_block = false;
                    }
                    continue;
                }
                if trimmed.starts_with("//") {
                    continue;
                }
                if trimmed.starts_with("/*") {
                    in_block = !trimmed.contains("*/");
                    continue;
                }
            }
            CommentStyle::Hash => {
                // keep shebangs
                if trimmed.starts_with('#') && !trimmed.starts_with("#!") {
                    continue;
                }
            }
            CommentStyle::Markup => {
                if trimmed.starts_with("<!--") && trimmed.ends_with("-->") {
                    continue;
                }
            }
        }

        kept.push(line);
    }

    kept.join("\n")
}

/// Drop lines that are empty or whitespace only.
pub fn remove_empty_lines(content: &str) -> String {
    content
        .split('\n')
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prefix each line with a right-aligned line number.
///
/// ```
/// use diffdeck::content::add_line_numbers;
///
/// assert_eq!(add_line_numbers("a\nb"), "    1 | a\n    2 | b");
/// ```
pub fn add_line_numbers(content: &str) -> String {
    content
        .split('\n')
        .enumerate()
        .map(|(i, line)| format!("{:>5} | {}", i + 1, line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Which transforms to apply, in the order comments, empty lines, numbers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Transforms {
    pub remove_comments: bool,
    pub remove_empty_lines: bool,
    pub show_line_numbers: bool,
}

impl Transforms {
    /// Whether any transform is enabled.
    pub fn is_noop(&self) -> bool {
        !(self.remove_comments || self.remove_empty_lines || self.show_line_numbers)
    }

    /// Apply the enabled transforms to the text of a file with `extension`.
    pub fn apply(&self, content: &str, extension: Option<&str>) -> String {
        let mut text = content.to_string();

        if self.remove_comments {
            if let Some(ext) = extension {
                text = remove_comments(&text, ext);
            }
        }
        if self.remove_empty_lines {
            text = remove_empty_lines(&text);
        }
        if self.show_line_numbers {
            text = add_line_numbers(&text);
        }

        text
    }
}

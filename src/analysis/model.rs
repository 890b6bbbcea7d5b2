//! Syntax model: a parsed view of one proposed source text.
//!
//! Wraps a tree-sitter parse together with the source it came from and
//! offers the primitives the checkers need: pre-order traversal, byte
//! offset to (line, column) mapping, and snippet extraction.
//!
//! Parsing is lenient by design. Tree-sitter produces a best-effort tree
//! for anything it can tokenize (malformed regions become ERROR nodes),
//! so the checkers can still run on partially valid code. Only a parser
//! that yields no tree at all is a [`ParseFailure`].

use thiserror::Error;
use tree_sitter::{Language, Node, Parser, Tree};

/// Unrecoverable parse failure.
///
/// The decision engine maps this to `Ask`, never `Deny`: the gate cannot
/// assess code it cannot read.
#[derive(Debug, Error)]
pub enum ParseFailure {
    #[error("parser produced no tree for {path}")]
    NoTree { path: String },
    #[error("cannot load {language} grammar: {source}")]
    Grammar {
        language: &'static str,
        #[source]
        source: tree_sitter::LanguageError,
    },
}

/// Grammar selected for a file, by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLanguage {
    TypeScript,
    Tsx,
    JavaScript,
}

impl SourceLanguage {
    /// Pick a grammar from a file path.
    ///
    /// Unknown extensions fall back to TypeScript, the superset grammar,
    /// to keep parsing best-effort.
    pub fn from_path(path: &str) -> Self {
        let ext = std::path::Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        match ext {
            "tsx" => SourceLanguage::Tsx,
            "js" | "jsx" | "mjs" | "cjs" => SourceLanguage::JavaScript,
            _ => SourceLanguage::TypeScript,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SourceLanguage::TypeScript => "typescript",
            SourceLanguage::Tsx => "tsx",
            SourceLanguage::JavaScript => "javascript",
        }
    }

    fn grammar(&self) -> Language {
        match self {
            SourceLanguage::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            SourceLanguage::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            SourceLanguage::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
        }
    }
}

/// A parsed syntax tree for one source text.
///
/// Created per validation call and discarded after analysis; nothing is
/// shared across calls.
pub struct SyntaxModel {
    tree: Tree,
    source: String,
    path: String,
    language: SourceLanguage,
    /// Byte offset of the start of each line.
    line_offsets: Vec<usize>,
}

impl SyntaxModel {
    /// Parse a source text into a syntax model.
    pub fn parse(path: &str, source: &str) -> Result<Self, ParseFailure> {
        let language = SourceLanguage::from_path(path);
        Self::parse_as(path, source, language)
    }

    /// Parse with an explicit grammar.
    pub fn parse_as(
        path: &str,
        source: &str,
        language: SourceLanguage,
    ) -> Result<Self, ParseFailure> {
        let mut parser = Parser::new();
        parser
            .set_language(&language.grammar())
            .map_err(|e| ParseFailure::Grammar {
                language: language.name(),
                source: e,
            })?;

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| ParseFailure::NoTree {
                path: path.to_string(),
            })?;

        Ok(Self {
            tree,
            source: source.to_string(),
            path: path.to_string(),
            language,
            line_offsets: line_offsets(source),
        })
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn language(&self) -> SourceLanguage {
        self.language
    }

    /// Whether the tree contains ERROR nodes (partially valid input).
    pub fn has_parse_errors(&self) -> bool {
        self.root().has_error()
    }

    /// Get text for a node.
    pub fn node_text(&self, node: Node) -> &str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    /// Pre-order traversal over every node, root first.
    pub fn for_each_node<F: FnMut(Node)>(&self, mut visitor: F) {
        fn walk<F: FnMut(Node)>(node: Node, visitor: &mut F) {
            visitor(node);
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                walk(child, visitor);
            }
        }
        walk(self.root(), &mut visitor);
    }

    /// Map a byte offset to a 1-based (line, column) pair.
    ///
    /// Columns count bytes from the line start, matching tree-sitter's
    /// own position convention.
    pub fn position_at(&self, byte_offset: usize) -> (usize, usize) {
        let offset = byte_offset.min(self.source.len());
        let line_idx = self
            .line_offsets
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        let col = offset - self.line_offsets[line_idx] + 1;
        (line_idx + 1, col)
    }

    /// Extract the substring covering a byte range, clamped to the
    /// source and snapped to character boundaries.
    pub fn snippet(&self, start: usize, end: usize) -> &str {
        let start = floor_char_boundary(&self.source, start.min(self.source.len()));
        let end = floor_char_boundary(&self.source, end.min(self.source.len()));
        if start >= end {
            return "";
        }
        &self.source[start..end]
    }

    /// Extract a snippet around a byte range with up to `context` bytes
    /// of surrounding text on each side.
    pub fn snippet_around(&self, start: usize, end: usize, context: usize) -> &str {
        let from = start.saturating_sub(context);
        let to = end.saturating_add(context);
        self.snippet(from, to)
    }
}

/// Byte offsets of every line start, always including line 1 at 0.
fn line_offsets(source: &str) -> Vec<usize> {
    let mut offsets = vec![0];
    for (i, b) in source.bytes().enumerate() {
        if b == b'\n' {
            offsets.push(i + 1);
        }
    }
    offsets
}

/// Largest char boundary at or below `index`.
fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

//! Block format parser.
//!
//! The block format is a YAML subset read one physical line at a time.
//! Parse contexts live on an explicit stack of [`Handler`]s; each line is
//! offered to the innermost handler, which either ends (and the line is
//! retried against its parent) or consumes it. Containers are collected in
//! a [`FlexContainer`] arena that only commits to map or list shape once
//! children arrive, and literal or flow blocks are kept as deferred text
//! until [`BlockParser::finish`] builds the tree.

use tracing::{debug, trace, warn};

use crate::literal::{
    coerce_value, find_closing_bracket, find_key_colon, parse_key_name, split_flow_items,
    strip_inline_comment,
};
use crate::scanner::{self, is_list_marker, ScanLine};
use crate::value::{Node, Provenance};

/// Attempts allowed for one line before it is abandoned.
pub const MAX_RETRIES: usize = 50;

const ROOT: usize = 0;

/// Parse block format text.
pub fn parse_block(source: &str, provenance: &Provenance) -> Node {
    parse_scanned(scanner::scan(source), provenance)
}

/// Parse block format input that has already been split into lines.
pub fn parse_lines(lines: &[&str], provenance: &Provenance) -> Node {
    parse_scanned(scanner::scan_lines(lines.iter().copied()), provenance)
}

fn parse_scanned(lines: Vec<ScanLine>, provenance: &Provenance) -> Node {
    let mut parser = BlockParser::new(provenance);
    for line in lines {
        parser.feed(line);
    }
    parser.finish()
}

// ============================================================================
// Containers
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Undecided,
    Map,
    List,
}

#[derive(Debug)]
enum Entry {
    Value(Node),
    Container(usize),
    Deferred(usize),
}

/// A container whose map or list shape is decided by its children.
#[derive(Debug)]
struct FlexContainer {
    shape: Shape,
    entries: Vec<(String, Entry)>,
}

impl FlexContainer {
    fn new(shape: Shape) -> Self {
        FlexContainer {
            shape,
            entries: Vec::new(),
        }
    }

    /// Named keys turn the container into a map; index keys keep a list a list.
    fn insert(&mut self, key: String, entry: Entry) {
        let is_index = key.bytes().all(|b| b.is_ascii_digit()) && !key.is_empty();
        if self.shape != Shape::List || !is_index {
            self.shape = Shape::Map;
        }
        self.entries.push((key, entry));
    }
}

/// Block content evaluated when the tree is built.
#[derive(Debug)]
enum Deferred {
    Text {
        lines: Vec<String>,
        strip: Option<usize>,
    },
    Array {
        fragments: Vec<String>,
    },
}

impl Deferred {
    fn evaluate(&self, provenance: &Provenance) -> Node {
        match self {
            Deferred::Text { lines, .. } => Node::string(lines.join("\n").trim(), provenance),
            Deferred::Array { fragments } => Node::List(
                split_flow_items(&fragments.join(","))
                    .into_iter()
                    .map(|item| coerce_value(item, provenance))
                    .collect(),
            ),
        }
    }
}

// ============================================================================
// State machine
// ============================================================================

/// One open parse context. `depth` is the indentation of the line that
/// opened it.
#[derive(Debug, Clone, Copy)]
enum Handler {
    Root {
        container: usize,
    },
    Dict {
        container: usize,
        depth: usize,
        /// Indentation of the first nested line, the block's step width.
        child_indent: Option<usize>,
        /// Whether `-` lines at `depth` belong to this block.
        same_indent_list: bool,
    },
    List {
        container: usize,
        depth: usize,
        next_index: usize,
    },
    StringBlock {
        block: usize,
        depth: usize,
    },
    ArrayBlock {
        block: usize,
        depth: usize,
    },
}

enum Step {
    Done,
    Retry,
    Refeed(ScanLine),
}

struct BlockParser<'p> {
    provenance: &'p Provenance,
    containers: Vec<FlexContainer>,
    deferred: Vec<Deferred>,
    stack: Vec<Handler>,
}

impl<'p> BlockParser<'p> {
    fn new(provenance: &'p Provenance) -> Self {
        BlockParser {
            provenance,
            containers: vec![FlexContainer::new(Shape::Undecided)],
            deferred: Vec::new(),
            stack: vec![Handler::Root { container: ROOT }],
        }
    }

    /// Offer `line` to the handler stack until some handler consumes it.
    fn feed(&mut self, line: ScanLine) {
        let mut line = line;
        for _ in 0..MAX_RETRIES {
            match self.step(&line) {
                Step::Done => return,
                Step::Retry => trace!(line = line.line_num + 1, "retrying line"),
                Step::Refeed(next) => line = next,
            }
        }
        warn!(
            provenance = %self.provenance,
            line = line.line_num + 1,
            "abandoning line after {} attempts: {}",
            MAX_RETRIES,
            line.content
        );
    }

    fn step(&mut self, line: &ScanLine) -> Step {
        let Some(&top) = self.stack.last() else {
            return Step::Done;
        };
        if !matches!(top, Handler::StringBlock { .. }) && line.is_skippable() {
            trace!(line = line.line_num + 1, "skipping blank or comment line");
            return Step::Done;
        }
        if self.is_end(&top, line) {
            return if self.end_block(Some(line)) {
                Step::Done
            } else {
                Step::Retry
            };
        }
        match top {
            Handler::Root { container } => self.continue_container(container, line),
            Handler::Dict { container, .. } => self.continue_dict(container, line),
            Handler::List {
                container, depth, ..
            } => self.continue_list(container, depth, line),
            Handler::StringBlock { block, .. } => {
                self.continue_string(block, line);
                Step::Done
            }
            Handler::ArrayBlock { block, .. } => {
                self.continue_array(block, line);
                Step::Done
            }
        }
    }

    fn is_end(&self, handler: &Handler, line: &ScanLine) -> bool {
        match *handler {
            Handler::Root { .. } => false,
            Handler::Dict {
                container,
                depth,
                same_indent_list,
                ..
            } => {
                let owns_list = same_indent_list
                    && line.is_list_item()
                    && self.containers[container].shape != Shape::Map;
                line.indent < depth || (line.indent == depth && !owns_list)
            }
            Handler::List { depth, .. } => {
                line.indent < depth || (line.indent == depth && !line.is_list_item())
            }
            Handler::StringBlock { depth, .. } => !line.is_blank() && line.indent <= depth,
            Handler::ArrayBlock { depth, .. } => {
                line.indent <= depth
                    || find_closing_bracket(strip_inline_comment(&line.content)).is_some()
            }
        }
    }

    /// Pop the innermost handler. Returns `true` if `line` was consumed
    /// while closing it.
    fn end_block(&mut self, line: Option<&ScanLine>) -> bool {
        let Some(handler) = self.stack.pop() else {
            return false;
        };
        trace!(?handler, "closing block");
        let Handler::ArrayBlock { block, .. } = handler else {
            return false;
        };

        let closing = line.and_then(|line| {
            let content = strip_inline_comment(&line.content);
            find_closing_bracket(content).map(|end| content[..end].to_string())
        });
        match closing {
            Some(fragment) => {
                if let Some(Deferred::Array { fragments }) = self.deferred.get_mut(block) {
                    fragments.push(fragment);
                }
                true
            }
            None => {
                warn!(
                    provenance = %self.provenance,
                    line = ?line.map(|l| l.line_num + 1),
                    "unterminated flow list"
                );
                false
            }
        }
    }

    fn push(&mut self, handler: Handler) {
        trace!(?handler, level = self.stack.len(), "opening block");
        self.stack.push(handler);
    }

    fn new_container(&mut self, shape: Shape) -> usize {
        self.containers.push(FlexContainer::new(shape));
        self.containers.len() - 1
    }

    fn defer(&mut self, deferred: Deferred) -> usize {
        self.deferred.push(deferred);
        self.deferred.len() - 1
    }

    fn skip(&self, line: &ScanLine, reason: &str) {
        debug!(
            provenance = %self.provenance,
            line = line.line_num + 1,
            "skipping line ({}): {}",
            reason,
            line.content
        );
    }

    // ========================================================================
    // Line handling
    // ========================================================================

    /// The line parser shared by every map-like context.
    fn continue_container(&mut self, container: usize, line: &ScanLine) -> Step {
        if line.is_list_item() {
            return self.open_list(container, line);
        }
        let content = strip_inline_comment(&line.content);
        let Some(colon) = find_key_colon(content) else {
            self.skip(line, "no key");
            return Step::Done;
        };
        let key = parse_key_name(&content[..colon]);
        let rest = content[colon + 1..].trim();
        self.assign(container, key, rest, line, true);
        Step::Done
    }

    fn open_list(&mut self, container: usize, line: &ScanLine) -> Step {
        let flex = &mut self.containers[container];
        if flex.shape == Shape::Map {
            self.skip(line, "list item inside a map");
            return Step::Done;
        }
        flex.shape = Shape::List;
        let next_index = flex.entries.len();
        self.push(Handler::List {
            container,
            depth: line.indent,
            next_index,
        });
        Step::Retry
    }

    fn assign(
        &mut self,
        container: usize,
        key: String,
        rest: &str,
        line: &ScanLine,
        same_indent_list: bool,
    ) {
        let entry = if rest.is_empty() {
            let child = self.new_container(Shape::Undecided);
            self.push(Handler::Dict {
                container: child,
                depth: line.indent,
                child_indent: None,
                same_indent_list,
            });
            Entry::Container(child)
        } else if is_block_scalar_header(rest) {
            let block = self.defer(Deferred::Text {
                lines: Vec::new(),
                strip: None,
            });
            self.push(Handler::StringBlock {
                block,
                depth: line.indent,
            });
            Entry::Deferred(block)
        } else if let Some(inner) = rest.strip_prefix('[') {
            match find_closing_bracket(inner) {
                Some(end) => {
                    if !inner[end + 1..].trim().is_empty() {
                        self.skip(line, "text after flow list");
                    }
                    Entry::Deferred(self.defer(Deferred::Array {
                        fragments: vec![inner[..end].to_string()],
                    }))
                }
                None => {
                    let block = self.defer(Deferred::Array {
                        fragments: vec![inner.to_string()],
                    });
                    self.push(Handler::ArrayBlock {
                        block,
                        depth: line.indent,
                    });
                    Entry::Deferred(block)
                }
            }
        } else {
            Entry::Value(coerce_value(rest, self.provenance))
        };
        self.containers[container].insert(key, entry);
    }

    fn continue_dict(&mut self, container: usize, line: &ScanLine) -> Step {
        if !line.is_list_item() {
            if let Some(Handler::Dict {
                depth,
                child_indent,
                ..
            }) = self.stack.last_mut()
            {
                if line.indent > *depth {
                    match *child_indent {
                        None => *child_indent = Some(line.indent),
                        Some(step) if line.indent > step => {
                            debug!(
                                provenance = %self.provenance,
                                line = line.line_num + 1,
                                "skipping over-indented line: {}",
                                line.content
                            );
                            return Step::Done;
                        }
                        _ => {}
                    }
                }
            }
        }
        self.continue_container(container, line)
    }

    /// Each `- item` becomes entry `index` of the list.
    fn continue_list(&mut self, container: usize, depth: usize, line: &ScanLine) -> Step {
        if line.indent != depth || !line.is_list_item() {
            self.skip(line, "not attached to a list item");
            return Step::Done;
        }
        let index = match self.stack.last_mut() {
            Some(Handler::List { next_index, .. }) => {
                *next_index += 1;
                *next_index - 1
            }
            _ => return Step::Done,
        };

        let after_marker = &line.content[1..];
        let item = after_marker.trim_start();
        let column = line.indent + 1 + (after_marker.len() - item.len());

        if is_list_marker(item) {
            let child = self.new_container(Shape::List);
            self.containers[container].insert(index.to_string(), Entry::Container(child));
            self.push(Handler::List {
                container: child,
                depth: column,
                next_index: 0,
            });
            return Step::Refeed(line.synthetic(column, item));
        }

        let is_flow = item.starts_with('[') || item.starts_with('{');
        if !is_flow && find_key_colon(strip_inline_comment(item)).is_some() {
            let child = self.new_container(Shape::Undecided);
            self.containers[container].insert(index.to_string(), Entry::Container(child));
            self.push(Handler::Dict {
                container: child,
                depth: line.indent,
                child_indent: None,
                same_indent_list: false,
            });
            return Step::Refeed(line.synthetic(column, item));
        }

        let value = strip_inline_comment(item);
        self.assign(container, index.to_string(), value, line, false);
        Step::Done
    }

    fn continue_string(&mut self, block: usize, line: &ScanLine) {
        if let Some(Deferred::Text { lines, strip }) = self.deferred.get_mut(block) {
            if line.is_blank() {
                lines.push(String::new());
                return;
            }
            let strip = *strip.get_or_insert(line.indent);
            lines.push(line.raw[strip.min(line.indent)..].to_string());
        }
    }

    fn continue_array(&mut self, block: usize, line: &ScanLine) {
        if let Some(Deferred::Array { fragments }) = self.deferred.get_mut(block) {
            fragments.push(strip_inline_comment(&line.content).to_string());
        }
    }

    // ========================================================================
    // Finalization
    // ========================================================================

    /// Close every open block, innermost first, and build the tree.
    fn finish(mut self) -> Node {
        while self.stack.len() > 1 {
            self.end_block(None);
        }
        self.build(ROOT)
    }

    fn build(&mut self, id: usize) -> Node {
        let shape = self.containers[id].shape;
        let entries = std::mem::take(&mut self.containers[id].entries);
        let resolved = entries
            .into_iter()
            .map(|(key, entry)| (key, self.resolve(entry)));
        match shape {
            Shape::List => Node::List(resolved.map(|(_, value)| value).collect()),
            Shape::Map | Shape::Undecided => Node::Map(resolved.collect()),
        }
    }

    fn resolve(&mut self, entry: Entry) -> Node {
        match entry {
            Entry::Value(node) => node,
            Entry::Container(id) => self.build(id),
            Entry::Deferred(id) => self.deferred[id].evaluate(self.provenance),
        }
    }
}

/// `|` with optional chomping or indentation indicators.
fn is_block_scalar_header(rest: &str) -> bool {
    rest.strip_prefix('|').is_some_and(|indicators| {
        indicators
            .chars()
            .all(|c| c == '-' || c == '+' || c.is_ascii_digit())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::HierarchicKey;
    use serde_json::json;

    fn parse(source: &str) -> serde_json::Value {
        parse_block(source, &Provenance::literal("test.yml")).to_json()
    }

    #[test]
    fn test_nested_maps() {
        let source = "\
global:
  ui: false
  another: 42
system:
  core:
    default: \"string with blank\"
";
        assert_eq!(
            parse(source),
            json!({
                "global": {"ui": false, "another": 42},
                "system": {"core": {"default": "string with blank"}}
            })
        );
    }

    #[test]
    fn test_flow_list_one_liner() {
        assert_eq!(parse("key: [1, 2, 3]"), json!({"key": [1, 2, 3]}));
        assert_eq!(parse("key: []"), json!({"key": []}));
        assert_eq!(
            parse(r#"key: ["a", 'b,c', plain] # note"#),
            json!({"key": ["a", "b,c", "plain"]})
        );
    }

    #[test]
    fn test_apostrophes_in_plain_values() {
        assert_eq!(
            parse("names: [Tom's, Bob]\nother: 1\n"),
            json!({"names": ["Tom's", "Bob"], "other": 1})
        );
        assert_eq!(
            parse("title: Don't Starve # game\n"),
            json!({"title": "Don't Starve"})
        );
    }

    #[test]
    fn test_flow_list_across_lines() {
        let source = "\
key: [
  1, \"two\",
  3
]
after: x
";
        assert_eq!(parse(source), json!({"key": [1, "two", 3], "after": "x"}));
    }

    #[test]
    fn test_unterminated_flow_list_keeps_fragments() {
        assert_eq!(parse("key: [1, 2\n  3"), json!({"key": [1, 2, 3]}));
    }

    #[test]
    fn test_string_block() {
        let source = "\
text: |
  line one
    indented

  # not a comment
next: 1
";
        assert_eq!(
            parse(source),
            json!({"text": "line one\n  indented\n\n# not a comment", "next": 1})
        );
    }

    #[test]
    fn test_lists() {
        let source = "\
plain:
  - a
  - 2
same:
- x
- y
items:
  - name: one
    port: 1
  - name: two
nested:
  - - a
    - b
  - - c
";
        assert_eq!(
            parse(source),
            json!({
                "plain": ["a", 2],
                "same": ["x", "y"],
                "items": [{"name": "one", "port": 1}, {"name": "two"}],
                "nested": [["a", "b"], ["c"]]
            })
        );
    }

    #[test]
    fn test_list_item_blocks() {
        let source = "\
- script: |
    echo hi
  after: 1
- [1, 2]
-
  k: v
- |
  text
";
        assert_eq!(
            parse(source),
            json!([
                {"script": "echo hi", "after": 1},
                [1, 2],
                {"k": "v"},
                "text"
            ])
        );
    }

    #[test]
    fn test_scalars_and_comments() {
        let source = r#"# header
---
escaped: 'it\'s'
"spaced key": value # trailing
hash: a#b
url: http://example.com:8080/path
flow: {"a": 1}
empty:
last: ~
"#;
        assert_eq!(
            parse(source),
            json!({
                "escaped": "it's",
                "spaced key": "value",
                "hash": "a#b",
                "url": "http://example.com:8080/path",
                "flow": {"a": 1},
                "empty": {},
                "last": "~"
            })
        );
    }

    #[test]
    fn test_over_indented_line_is_skipped() {
        let source = "a:\n  b: 1\n    c: 2\n  d: 3\n";
        assert_eq!(parse(source), json!({"a": {"b": 1, "d": 3}}));
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let source = "a: 1\njust text\nb: 2\n";
        assert_eq!(parse(source), json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_parse_lines_tags_provenance() {
        let prov = Provenance::literal("<lines>");
        let node = parse_lines(&["a:", "  b: true"], &prov);
        let leaf = node.lookup(&"a.b".into()).unwrap();
        assert_eq!(leaf.as_bool(), Some(true));
        assert_eq!(leaf.provenance().map(Provenance::as_str), Some("<lines>"));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse(""), json!({}));
        assert_eq!(parse("# only a comment\n"), json!({}));
    }

    #[test]
    fn test_retry_cap_abandons_line() {
        let levels = MAX_RETRIES + 5;
        let mut source = String::new();
        for level in 0..levels {
            source.push_str(&format!("{}k{}:\n", " ".repeat(level), level));
        }
        source.push_str(&format!("{}leaf: 1\n", " ".repeat(levels)));
        source.push_str("tail: 1\n");

        let node = parse_block(&source, &Provenance::default());
        let mut parts: Vec<String> = (0..levels).map(|level| format!("k{}", level)).collect();
        parts.push("leaf".to_string());
        let leaf_key = HierarchicKey::from_parts(&parts);
        assert_eq!(node.lookup(&leaf_key).and_then(Node::as_i64), Some(1));
        assert!(node.lookup(&"tail".into()).is_none());
    }
}

//! Line scanner for the block format.
//!
//! The scanner converts raw source text into scan lines. It performs:
//! - Line splitting (LF or CRLF, leading BOM dropped)
//! - Indentation counting (a space or a tab each count as one column)
//! - Blank, comment and document-marker classification

/// A single physical line after scanning.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanLine {
    /// Content after the indentation, trailing whitespace removed.
    pub content: String,
    /// The full line, needed verbatim inside literal blocks.
    pub raw: String,
    /// Number of leading indentation characters.
    pub indent: usize,
    /// Zero-based line number for diagnostics.
    pub line_num: usize,
}

impl ScanLine {
    pub fn new(raw: &str, line_num: usize) -> Self {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        let indent = count_indent(raw);
        ScanLine {
            content: raw[indent..].trim_end().to_string(),
            raw: raw.to_string(),
            indent,
            line_num,
        }
    }

    /// A line derived from this one, as if `content` started at `indent`.
    pub fn synthetic(&self, indent: usize, content: impl Into<String>) -> Self {
        let content = content.into();
        ScanLine {
            raw: format!("{}{}", " ".repeat(indent), content),
            content,
            indent,
            line_num: self.line_num,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.content.is_empty()
    }

    pub fn is_comment(&self) -> bool {
        self.content.starts_with('#')
    }

    /// `---` and `...` at the left margin.
    pub fn is_document_marker(&self) -> bool {
        self.indent == 0 && (self.content == "---" || self.content == "...")
    }

    /// Lines that carry nothing outside a literal block.
    pub fn is_skippable(&self) -> bool {
        self.is_blank() || self.is_comment() || self.is_document_marker()
    }

    /// A `-` list marker, alone or followed by whitespace.
    pub fn is_list_item(&self) -> bool {
        is_list_marker(&self.content)
    }
}

pub(crate) fn is_list_marker(content: &str) -> bool {
    content == "-" || content.starts_with("- ") || content.starts_with("-\t")
}

/// Scan source text into scan lines.
pub fn scan(source: &str) -> Vec<ScanLine> {
    let source = source.strip_prefix('\u{FEFF}').unwrap_or(source);
    scan_lines(source.lines())
}

/// Scan pre-split lines.
pub fn scan_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Vec<ScanLine> {
    lines
        .into_iter()
        .enumerate()
        .map(|(line_num, line)| ScanLine::new(line, line_num))
        .collect()
}

/// Count the number of leading spaces and tabs in a line.
fn count_indent(line: &str) -> usize {
    line.bytes().take_while(|&b| b == b' ' || b == b'\t').count()
}

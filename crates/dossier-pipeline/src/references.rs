//! Footnote numbering for `[ref:<source>]` markers in report text

use crate::artifact::AggregatedEntry;
use std::collections::HashMap;

const MARKER_OPEN: &str = "[ref:";

/// Marker citing the source of an aggregated record
pub fn reference_marker(entry: &AggregatedEntry) -> String {
    format!(
        "{}{} (lines {}-{})]",
        MARKER_OPEN, entry.source_file, entry.start_line, entry.end_line
    )
}

/// Assigns stable footnote numbers to references, in order of first use
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    numbers: HashMap<String, usize>,
    footnotes: Vec<(usize, String)>,
}

impl ReferenceIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Footnote number for `reference`, assigning the next one if unseen
    pub fn number_for(&mut self, reference: &str) -> usize {
        if let Some(&number) = self.numbers.get(reference) {
            return number;
        }
        let number = self.footnotes.len() + 1;
        self.numbers.insert(reference.to_string(), number);
        self.footnotes.push((number, reference.to_string()));
        number
    }

    /// Replace every `[ref:...]` marker with `[^n]`.
    ///
    /// A marker ends at the first `]` on the same line; an unterminated
    /// marker is left as is.
    pub fn replace_markers(&mut self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(open) = rest.find(MARKER_OPEN) {
            let after = &rest[open + MARKER_OPEN.len()..];
            let close = after.find(']').filter(|&i| !after[..i].contains('\n'));
            match close {
                Some(close) => {
                    out.push_str(&rest[..open]);
                    let number = self.number_for(&after[..close]);
                    out.push_str(&format!("[^{}]", number));
                    rest = &after[close + 1..];
                }
                None => {
                    out.push_str(&rest[..open + MARKER_OPEN.len()]);
                    rest = after;
                }
            }
        }

        out.push_str(rest);
        out
    }

    /// The `## Footnotes` block for every reference seen so far
    pub fn footnotes_block(&self) -> String {
        let mut block = String::from("\n\n## Footnotes\n\n");
        for (number, reference) in &self.footnotes {
            block.push_str(&format!("[^{}]: {}\n", number, reference));
        }
        block
    }

    /// Replace markers and append the footnotes block
    pub fn process_text(&mut self, text: &str) -> String {
        let mut processed = self.replace_markers(text);
        processed.push_str(&self.footnotes_block());
        processed
    }

    /// Number of distinct references
    pub fn len(&self) -> usize {
        self.footnotes.len()
    }

    /// Whether no reference has been seen
    pub fn is_empty(&self) -> bool {
        self.footnotes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_markers_numbered_in_order_of_first_use() {
        let mut index = ReferenceIndex::new();
        let text = "Founded 2001 [ref:a.pdf]. Owned by X [ref:b.txt], see also [ref:a.pdf].";

        assert_eq!(
            index.replace_markers(text),
            "Founded 2001 [^1]. Owned by X [^2], see also [^1]."
        );
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_numbers_stable_across_calls() {
        let mut index = ReferenceIndex::new();
        index.replace_markers("[ref:a.pdf]");
        assert_eq!(index.replace_markers("[ref:b.pdf] [ref:a.pdf]"), "[^2] [^1]");
    }

    #[test]
    fn test_process_text_appends_footnotes() {
        let mut index = ReferenceIndex::new();
        let out = index.process_text("Claim [ref:letter.txt (lines 1-10)].");

        assert_eq!(
            out,
            "Claim [^1].\n\n## Footnotes\n\n[^1]: letter.txt (lines 1-10)\n"
        );
    }

    #[test]
    fn test_unterminated_marker_left_alone() {
        let mut index = ReferenceIndex::new();
        assert_eq!(
            index.replace_markers("see [ref:a.pdf\n] and [ref:b]"),
            "see [ref:a.pdf\n] and [^1]"
        );
        assert_eq!(index.replace_markers("trailing [ref:oops"), "trailing [ref:oops");
    }

    #[test]
    fn test_marker_for_entry() {
        let entry = AggregatedEntry {
            source_file: "in/a.txt".to_string(),
            content: json!({}),
            start_line: 11,
            end_line: 20,
        };
        let mut index = ReferenceIndex::new();
        index.replace_markers(&reference_marker(&entry));
        assert!(index.footnotes_block().contains("[^1]: in/a.txt (lines 11-20)"));
    }
}

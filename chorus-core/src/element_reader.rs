//! Streaming splitter for files holding a long run of sibling elements.
//!
//! Notes files are read far more often than they are written, so instead of
//! building a document tree the reader scans the raw bytes once and hands the
//! byte range of each record to a consumer. A record runs from its opening
//! marker up to the next opening marker, or up to the final closing tag for
//! the last record.
//!
//! ```text
//! <notes version='0'><annotation ...>...</annotation><annotation ...>...</annotation></notes>
//!                    |------------ record 1 --------||------------ record 2 --------|
//! ```

/// Bytes that may follow an opening marker for the match to count.
pub const WHITESPACE_TERMINATORS: &[u8] = b" \t\r\n";

/// Splits a buffer of repeated records into per-record byte ranges.
///
/// The reader borrows its input for the duration of [`ElementReader::run`]
/// only; nothing is retained once the scan returns.
#[derive(Debug, Clone)]
pub struct ElementReader {
    opening_marker: Vec<u8>,
    final_closing_tag: Vec<u8>,
    terminators: Vec<u8>,
}

impl ElementReader {
    /// Creates a reader that confirms markers with [`WHITESPACE_TERMINATORS`].
    pub fn new(opening_marker: &str, final_closing_tag: &str) -> Self {
        Self {
            opening_marker: opening_marker.as_bytes().to_vec(),
            final_closing_tag: final_closing_tag.as_bytes().to_vec(),
            terminators: WHITESPACE_TERMINATORS.to_vec(),
        }
    }

    /// Adds bytes that also confirm a marker match, e.g. `>` for bare tags.
    pub fn with_terminators(mut self, extra: &[u8]) -> Self {
        for byte in extra {
            if !self.terminators.contains(byte) {
                self.terminators.push(*byte);
            }
        }
        self
    }

    /// Scans `input` and calls `consumer` once per record, in document order.
    ///
    /// Returns the number of records delivered. Text ahead of the first
    /// marker and the final closing tag are never delivered.
    pub fn run<'a, F>(&self, input: &'a [u8], mut consumer: F) -> usize
    where
        F: FnMut(&'a [u8]),
    {
        if self.opening_marker.is_empty() {
            return 0;
        }

        let end = input.len().saturating_sub(self.final_closing_tag.len());
        let mut start = self.find_marker(input, 0, end);
        let mut count = 0;

        while start < end {
            let next = self.find_marker(input, start + 1, end);
            consumer(&input[start..next]);
            count += 1;
            start = next;
        }

        count
    }

    /// Convenience wrapper collecting owned copies of every record.
    pub fn split(&self, input: &[u8]) -> Vec<Vec<u8>> {
        let mut records = Vec::new();
        self.run(input, |record| records.push(record.to_vec()));
        records
    }

    /// Returns the offset of the next confirmed marker in `from..end`, or `end`.
    fn find_marker(&self, input: &[u8], from: usize, end: usize) -> usize {
        let marker = self.opening_marker.as_slice();
        let first = marker[0];

        let mut i = from;
        while i < end {
            if input[i] == first && self.marker_at(input, i) {
                return i;
            }
            i += 1;
        }

        end
    }

    fn marker_at(&self, input: &[u8], at: usize) -> bool {
        let marker = self.opening_marker.as_slice();
        match input.get(at..at + marker.len()) {
            Some(candidate) if candidate == marker => input
                .get(at + marker.len())
                .is_some_and(|next| self.terminators.contains(next)),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(input: &str) -> Vec<String> {
        ElementReader::new("<annotation", "</notes>")
            .split(input.as_bytes())
            .into_iter()
            .map(|r| String::from_utf8(r).unwrap())
            .collect()
    }

    #[test]
    fn test_splits_each_record() {
        let input = "<notes version='0'><annotation class='a'>x</annotation>\
                     <annotation class='b'>y</annotation></notes>";
        let found = records(input);
        assert_eq!(
            found,
            vec![
                "<annotation class='a'>x</annotation>",
                "<annotation class='b'>y</annotation>",
            ]
        );
    }

    #[test]
    fn test_no_records_between_root_tags() {
        assert!(records("<notes version='0'></notes>").is_empty());
        assert!(records("").is_empty());
        assert!(records("</notes>").is_empty());
    }

    #[test]
    fn test_rejects_longer_element_name_with_same_prefix() {
        let reader = ElementReader::new("<note", "</notes>");
        let input = b"<notes version='0'><note id='1'/><notes-extra/><note\tid='2'/></notes>";
        let found = reader.split(input);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0], b"<note id='1'/><notes-extra/>".to_vec());
        assert_eq!(found[1], b"<note\tid='2'/>".to_vec());
    }

    #[test]
    fn test_bare_tag_needs_extra_terminator() {
        let input = b"<notes version='0'><annotation><message/></annotation></notes>";
        let strict = ElementReader::new("<annotation", "</notes>");
        assert!(strict.split(input).is_empty());

        let relaxed = strict.with_terminators(b">/");
        assert_eq!(
            relaxed.split(input),
            vec![b"<annotation><message/></annotation>".to_vec()]
        );
    }

    #[test]
    fn test_each_whitespace_terminator_confirms() {
        let input = "<notes><annotation a='1'/><annotation\ta='2'/><annotation\ra='3'/>\
                     <annotation\na='4'/></notes>";
        let found = records(input);
        assert_eq!(found.len(), 4);
        assert!(found.iter().all(|r| r.starts_with("<annotation")));
    }

    #[test]
    fn test_reassembly_matches_original() {
        let prefix = "<?xml version='1.0'?>\n<notes version='0'>\n  ";
        let body = "<annotation ref='a'>one</annotation>\n  <annotation ref='b'>two</annotation>\n";
        let input = format!("{}{}</notes>", prefix, body);

        let found = records(&input);
        assert_eq!(found.len(), 2);

        let rebuilt = format!("{}{}</notes>", prefix, found.concat());
        assert_eq!(rebuilt, input);
    }

    #[test]
    fn test_run_borrows_from_input() {
        let input = b"<notes><annotation a='1'/></notes>".to_vec();
        let reader = ElementReader::new("<annotation", "</notes>");
        let mut ranges: Vec<&[u8]> = Vec::new();
        let count = reader.run(&input, |record| ranges.push(record));
        assert_eq!(count, 1);
        assert_eq!(ranges[0], b"<annotation a='1'/>");
    }

    #[test]
    fn test_marker_at_end_of_window_is_ignored() {
        // The marker runs straight into the closing tag.
        let input = b"<notes><annotation</notes>";
        let reader = ElementReader::new("<annotation", "</notes>");
        assert!(reader.split(input).is_empty());
    }
}

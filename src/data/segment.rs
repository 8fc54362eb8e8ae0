//! Line segmentation for raw stream chunks.

/// Select the most recent complete line from a chunk.
///
/// netstat may flush several lines at once; only the last one matters because
/// the display shows the latest sample. Blank lines are skipped: a line
/// holding only whitespace counts as blank, as does the empty segment after a
/// trailing newline. A trailing `\r` is removed. An empty chunk is returned
/// unchanged.
///
/// Lines split across two chunks are not reassembled.
///
/// # Example
///
/// ```
/// use netstat_meter::data::select_last_line;
///
/// assert_eq!(select_last_line("a 1\nb 2\n"), "b 2");
/// assert_eq!(select_last_line(""), "");
/// ```
pub fn select_last_line(chunk: &str) -> &str {
    if chunk.is_empty() {
        return chunk;
    }

    chunk
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty())
        .last()
        .unwrap_or("")
}

/// Split a line into whitespace-separated columns.
pub fn tokenize(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

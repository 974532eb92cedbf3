//! Caret snippets for error display.

/// Render up to three source lines around `offset` with a `^` marker under
/// the offending byte.
pub fn caret_snippet(source: &str, offset: usize) -> String {
    let offset = offset.min(source.len());
    let mut line_start = 0;
    let mut line_index = 0;
    for (i, line) in source.split('\n').enumerate() {
        let line_end = line_start + line.len();
        if offset <= line_end {
            line_index = i;
            break;
        }
        line_start = line_end + 1;
        line_index = i + 1;
    }

    let lines: Vec<&str> = source.split('\n').collect();
    let first = line_index.saturating_sub(1);
    let last = (line_index + 1).min(lines.len().saturating_sub(1));

    let mut out = String::new();
    for (i, line) in lines.iter().enumerate().take(last + 1).skip(first) {
        out.push_str(&format!("{:>4} | {line}\n", i + 1));
        if i == line_index {
            let column = offset - line_start;
            out.push_str(&format!("     | {}^\n", " ".repeat(column)));
        }
    }
    out
}

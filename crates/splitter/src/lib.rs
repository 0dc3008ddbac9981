//! # Statement Splitter
//!
//! Turns the raw text of a SQL script into the ordered list of statements that
//! the executor submits one by one. There is no SQL parser here: a single
//! left-to-right scan tracks just enough state to know whether a `;` really
//! ends a statement.
//!
//! ## Scanner state
//!
//! - `in_string`: toggled by every `'`. A doubled quote (`''`, the SQL escape)
//!   toggles twice and so leaves the state unchanged.
//! - `paren_depth`: `(` and `)` outside string literals. It may go negative.
//! - line comments: `--` outside a string literal starts a comment that runs to
//!   the end of the line. Quotes, parentheses and semicolons inside it are inert.
//!
//! A `;` is a boundary only outside strings and comments at depth zero.
//!
//! ## Malformed input
//!
//! The splitter never fails. An unterminated string literal or unbalanced
//! parentheses suppress boundary recognition for the rest of the script, so the
//! remainder is emitted as one large trailing statement: malformed input only
//! ever produces coarser grouping, never finer.

use core_types::Statement;

const COMMENT_MARKER: &str = "--";

/// Splits `script` into trimmed, non-empty statements in source order.
///
/// Leading comment lines are stripped from each statement, and statements made
/// only of comments or whitespace are dropped.
pub fn split(script: &str) -> Vec<Statement> {
    let mut scanner = Scanner::default();
    for ch in script.chars() {
        scanner.push(ch);
    }
    scanner.finish()
}

#[derive(Debug)]
struct Scanner {
    statements: Vec<Statement>,
    buffer: String,
    /// Line on which the current buffer starts.
    buffer_line: usize,
    line: usize,
    in_string: bool,
    in_comment: bool,
    paren_depth: i64,
    /// A `-` outside strings and comments that may open a `--` comment.
    pending_dash: bool,
}

impl Default for Scanner {
    fn default() -> Self {
        Self {
            statements: Vec::new(),
            buffer: String::new(),
            buffer_line: 1,
            line: 1,
            in_string: false,
            in_comment: false,
            paren_depth: 0,
            pending_dash: false,
        }
    }
}

impl Scanner {
    fn push(&mut self, ch: char) {
        let after_dash = std::mem::take(&mut self.pending_dash);

        if self.in_comment {
            if ch == '\n' {
                self.in_comment = false;
            }
        } else {
            match ch {
                '\'' => self.in_string = !self.in_string,
                '-' if !self.in_string => {
                    if after_dash {
                        self.in_comment = true;
                    } else {
                        self.pending_dash = true;
                    }
                }
                '(' if !self.in_string => self.paren_depth += 1,
                ')' if !self.in_string => self.paren_depth -= 1,
                ';' if !self.in_string && self.paren_depth == 0 => {
                    self.buffer.push(ch);
                    self.flush();
                    return;
                }
                _ => {}
            }
        }

        self.buffer.push(ch);
        if ch == '\n' {
            self.line += 1;
        }
    }

    /// Emits the buffered text as a statement (if it holds anything
    /// executable) and starts a new buffer at the current position.
    fn flush(&mut self) {
        if let Some((line, text)) = significant_text(&self.buffer, self.buffer_line) {
            let index = self.statements.len() + 1;
            self.statements.push(Statement::new(index, line, text));
        }
        self.buffer.clear();
        self.buffer_line = self.line;
    }

    fn finish(mut self) -> Vec<Statement> {
        self.flush();
        self.statements
    }
}

/// Strips leading whitespace and comment lines from `raw`.
///
/// Returns the line the remaining text starts on together with the trimmed
/// text, or `None` if nothing executable is left.
fn significant_text(raw: &str, start_line: usize) -> Option<(usize, &str)> {
    let mut rest = raw;
    loop {
        rest = rest.trim_start();
        if !rest.starts_with(COMMENT_MARKER) {
            break;
        }
        let newline = rest.find('\n')?;
        rest = &rest[newline + 1..];
    }

    let text = rest.trim_end();
    if text.trim_end_matches(';').trim().is_empty() {
        return None;
    }
    let skipped = &raw[..raw.len() - rest.len()];
    let line = start_line + skipped.matches('\n').count();
    Some((line, text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(script: &str) -> Vec<String> {
        split(script).into_iter().map(|s| s.text).collect()
    }

    #[test]
    fn splits_well_formed_statements_in_order() {
        let script = "CREATE TABLE a (id INT);\nINSERT INTO a VALUES (1);\n\nSELECT 1;";
        assert_eq!(
            texts(script),
            [
                "CREATE TABLE a (id INT);",
                "INSERT INTO a VALUES (1);",
                "SELECT 1;"
            ]
        );
    }

    #[test]
    fn indexes_are_sequential_and_one_based() {
        let statements = split("SELECT 1; SELECT 2; SELECT 3;");
        let indexes: Vec<_> = statements.iter().map(|s| s.index).collect();
        assert_eq!(indexes, [1, 2, 3]);
    }

    #[test]
    fn semicolon_inside_string_literal_is_not_a_boundary() {
        assert_eq!(
            texts("INSERT INTO t VALUES ('a;b');"),
            ["INSERT INTO t VALUES ('a;b');"]
        );
    }

    #[test]
    fn doubled_quote_escape_keeps_scanner_in_sync() {
        let script = "INSERT INTO t VALUES ('it''s; fine'); SELECT 2;";
        assert_eq!(
            texts(script),
            ["INSERT INTO t VALUES ('it''s; fine');", "SELECT 2;"]
        );
    }

    #[test]
    fn semicolon_inside_parentheses_is_not_a_boundary() {
        let script = "CREATE TABLE t (a INT, b INT);";
        assert_eq!(texts(script), [script]);

        let nested = "CREATE FUNCTION f() RETURNS INT AS (SELECT (1; 2));\nSELECT 3;";
        assert_eq!(split(nested).len(), 2);
    }

    #[test]
    fn leading_comment_line_is_stripped() {
        let statements = split("-- comment\nCREATE TABLE t (id INT);");
        assert_eq!(statements.len(), 1);
        assert_eq!(statements[0].text, "CREATE TABLE t (id INT);");
        assert_eq!(statements[0].line, 2);
    }

    #[test]
    fn comment_only_chunks_are_dropped() {
        let script = "-- header\n-- more header\nSELECT 1;\n-- trailing note\n";
        assert_eq!(texts(script), ["SELECT 1;"]);
        assert!(split("-- nothing to run here").is_empty());
    }

    #[test]
    fn quotes_and_semicolons_in_comments_are_inert() {
        let script = "-- don't split; here\nSELECT 1; -- it's (fine\nSELECT 2;";
        assert_eq!(texts(script), ["SELECT 1;", "SELECT 2;"]);
    }

    #[test]
    fn single_dash_is_not_a_comment() {
        assert_eq!(texts("SELECT 3 - 1; SELECT -2;"), ["SELECT 3 - 1;", "SELECT -2;"]);
    }

    #[test]
    fn trailing_text_without_delimiter_is_emitted() {
        assert_eq!(texts("SELECT 1;\nSELECT 2"), ["SELECT 1;", "SELECT 2"]);
    }

    #[test]
    fn empty_and_blank_statements_are_discarded() {
        assert!(split("").is_empty());
        assert!(split("   \n\t").is_empty());
        assert_eq!(texts(";;  ;\n SELECT 1;"), ["SELECT 1;"]);
        assert_eq!(texts("-- only a comment\n;\nSELECT 1;"), ["SELECT 1;"]);
    }

    #[test]
    fn unterminated_string_swallows_the_rest_of_the_script() {
        let script = "INSERT INTO t VALUES ('oops);\nSELECT 1;\nSELECT 2;";
        let statements = split(script);
        assert_eq!(statements.len(), 1);
        assert_eq!(statements[0].text, script);
    }

    #[test]
    fn unbalanced_parenthesis_swallows_the_rest_of_the_script() {
        let script = "SELECT 1;\nCREATE TABLE t (id INT;\nSELECT 2;\nSELECT 3;";
        let statements = split(script);
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[1].text, "CREATE TABLE t (id INT;\nSELECT 2;\nSELECT 3;");
    }

    #[test]
    fn extra_closing_parenthesis_also_suppresses_boundaries() {
        let statements = split("SELECT 1);\nSELECT 2;");
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn records_the_source_line_of_each_statement() {
        let script = "SELECT 1;\n\n-- note\nCREATE TABLE t (\n  id INT\n);\nSELECT 2;";
        let lines: Vec<_> = split(script).iter().map(|s| s.line).collect();
        assert_eq!(lines, [1, 4, 7]);
    }

    #[test]
    fn concatenation_preserves_executable_content() {
        let script = "CREATE TABLE t (id INT);\nINSERT INTO t VALUES (1), (2);\nSELECT COUNT(*) FROM t;\n";
        let joined: String = split(script)
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(joined, script.trim_end());
    }
}

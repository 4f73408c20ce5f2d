//! Assembly source tokenizer.
//!
//! One statement per line: `[label:] MNEMONIC [operand (, operand)*] [; comment]`.
//! Labels are accepted and dropped; nothing in the instruction set can
//! refer to them.

use anyhow::{bail, Result};

use bitcpu::Statement;

/// Tokenize one line. Blank and comment-only lines yield `None`.
pub fn parse_line(line_no: usize, line: &str) -> Result<Option<Statement>> {
    let code = line.split(';').next().unwrap_or_default();
    let code = match code.split_once(':') {
        Some((_label, rest)) => rest,
        None => code,
    }
    .trim();
    if code.is_empty() {
        return Ok(None);
    }

    let (mnemonic, rest) = match code.split_once(char::is_whitespace) {
        Some((m, r)) => (m.trim(), r.trim()),
        None => (code, ""),
    };
    if mnemonic.ends_with(',') || rest.starts_with(',') {
        bail!("line {line_no}: missing mnemonic before operands in '{}'", line.trim());
    }
    let operands = if rest.is_empty() {
        Vec::new()
    } else {
        rest.split(',').map(|o| o.trim().to_string()).collect()
    };
    Ok(Some(Statement {
        line: line_no,
        mnemonic: mnemonic.to_string(),
        operands,
    }))
}

/// Tokenize a whole source file, numbering lines from 1.
pub fn parse_source(text: &str) -> Result<Vec<Statement>> {
    let mut out = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if let Some(stmt) = parse_line(i + 1, line)? {
            out.push(stmt);
        }
    }
    Ok(out)
}

/// Quote source line `line` (1-based) with a caret span under its code,
/// comment excluded:
///
/// ```text
/// 2 |   ADD R0, R1 ; sum
///   |   ^^^^^^^^^^
/// ```
pub fn render_line(text: &str, line: usize) -> Option<String> {
    let src = text.lines().nth(line.checked_sub(1)?)?;
    let code = src.split(';').next().unwrap_or_default().trim_end();
    let body = code.trim_start();
    let indent: String = code[..code.len() - body.len()]
        .chars()
        .map(|c| if c == '\t' { '\t' } else { ' ' })
        .collect();
    let gutter = " ".repeat(line.to_string().len());
    let carets = "^".repeat(body.chars().count().max(1));
    Some(format!("{line} | {src}\n{gutter} | {indent}{carets}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn splits_mnemonic_and_operands() {
        let s = parse_line(3, "  ADD R0, R1,5   ; sum").unwrap().unwrap();
        assert_eq!(s, Statement::new(3, "ADD", &["R0", "R1", "5"]));
        let s = parse_line(4, "HALT").unwrap().unwrap();
        assert_eq!(s, Statement::new(4, "HALT", &[]));
    }

    #[test]
    fn skips_blank_comment_and_label_only_lines() {
        assert_eq!(parse_line(1, "").unwrap(), None);
        assert_eq!(parse_line(2, "   ; just a note").unwrap(), None);
        assert_eq!(parse_line(3, "start:").unwrap(), None);
        let s = parse_line(4, "loop: OUT R2").unwrap().unwrap();
        assert_eq!(s, Statement::new(4, "OUT", &["R2"]));
    }

    #[test]
    fn comma_after_mnemonic_is_an_error() {
        assert!(parse_line(1, "MOVER, R0, 5").is_err());
        assert!(parse_line(1, "MOVER ,R0, 5").is_err());
    }

    #[test]
    fn render_line_points_at_the_code() {
        let text = "HALT\n  ADD R0, R1 ; sum\n";
        assert_eq!(
            render_line(text, 2).unwrap(),
            "2 |   ADD R0, R1 ; sum\n  |   ^^^^^^^^^^"
        );
        assert_eq!(render_line(text, 1).unwrap(), "1 | HALT\n  | ^^^^");
        assert_eq!(render_line(text, 0), None);
        assert_eq!(render_line(text, 3), None);
    }

    #[test]
    fn source_keeps_line_numbers() {
        let text = "MOVER R0, 5\n\n; comment\nMOVEM R0, 6\nHALT\n";
        let stmts = parse_source(text).unwrap();
        let lines: Vec<usize> = stmts.iter().map(|s| s.line).collect();
        assert_eq!(lines, vec![1, 4, 5]);
    }
}

//! Line structure of an imported file.
//!
//! A file is: an optional child-name line, a header line, then data rows.
//! Blank lines are skipped everywhere but still count toward line numbers.

use super::report::ImportError;
use regex::Regex;
use std::sync::LazyLock;

static NAME_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)^["'\s]*(儿童姓名|孩子姓名|宝宝姓名|姓名|child\s*name|name)\s*[:：]"#)
        .expect("valid regex")
});

static HEADER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(日期|\bdate\b)").expect("valid regex"));

/// `<date> [<time>] <height> [<weight>]` separated by runs of whitespace.
static WHITESPACE_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\S+(?:\s+\d{1,2}:\d{2}(?::\d{2})?(?:\.\d+)?)?)\s+(\S+)(?:\s+(\S+))?$")
        .expect("valid regex")
});

/// A non-blank line with its position in the raw file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    /// 1-based
    pub number: usize,
    pub text: String,
}

/// The file split into metadata and data lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub child_name: Option<String>,
    pub header_line: usize,
    pub rows: Vec<RawLine>,
}

/// Tokens of one data row, still unvalidated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizedRow {
    pub line: usize,
    pub date: String,
    pub height: String,
    /// Empty when the row has no weight column
    pub weight: String,
}

/// Split decoded text into name, header and data lines.
///
/// # Errors
///
/// Returns a format error when the file has no non-blank lines or when the
/// first line after the optional name line is not a header.
pub fn split_table(text: &str) -> Result<Table, ImportError> {
    let mut lines = text
        .split('\n')
        .enumerate()
        .map(|(i, line)| RawLine {
            number: i + 1,
            text: line.trim().to_string(),
        })
        .filter(|line| !line.text.is_empty());

    let Some(mut first) = lines.next() else {
        return Err(ImportError::format(1, "", "file is empty"));
    };

    let mut child_name = None;
    if NAME_LINE.is_match(&first.text) {
        child_name = name_value(&first.text);
        first = lines
            .next()
            .ok_or_else(|| ImportError::format(first.number, first.text.clone(), "no header found"))?;
    }

    if !HEADER_LINE.is_match(&first.text) {
        return Err(ImportError::format(first.number, first.text, "no header found"));
    }

    Ok(Table {
        child_name,
        header_line: first.number,
        rows: lines.collect(),
    })
}

/// Value of a name line: everything after the last colon.
fn name_value(line: &str) -> Option<String> {
    let (_, value) = line.rsplit_once([':', '：'])?;
    let value = value
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, '"' | '\'' | ',' | '\t'));
    (!value.is_empty()).then(|| value.to_string())
}

fn unquote(token: &str) -> &str {
    token
        .trim()
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '“' | '”'))
        .trim()
}

/// Split one data row into date, height and weight tokens.
///
/// Tab wins over comma, comma over whitespace. In whitespace-separated rows
/// a time directly after the date belongs to the date.
///
/// # Errors
///
/// Returns a format error when fewer than two tokens are found.
pub fn tokenize_row(line: &RawLine) -> Result<TokenizedRow, ImportError> {
    let text = line.text.as_str();

    let tokens: Vec<&str> = if text.contains('\t') {
        text.split('\t').map(unquote).collect()
    } else if text.contains(',') {
        text.split(',').map(unquote).collect()
    } else if let Some(caps) = WHITESPACE_ROW.captures(unquote(text)) {
        caps.iter()
            .skip(1)
            .flatten()
            .map(|m| unquote(m.as_str()))
            .collect()
    } else {
        vec![unquote(text)]
    };

    if tokens.len() < 2 {
        return Err(ImportError::format(
            line.number,
            text,
            "expected at least a date and a height",
        ));
    }

    Ok(TokenizedRow {
        line: line.number,
        date: tokens[0].to_string(),
        height: tokens[1].to_string(),
        weight: tokens.get(2).copied().unwrap_or_default().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(text: &str) -> RawLine {
        RawLine {
            number: 3,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_split_with_name_line() {
        let table = split_table("儿童姓名：小明\n日期,身高(cm),体重(kg)\n2024-03-15,100,15\n").unwrap();
        assert_eq!(table.child_name.as_deref(), Some("小明"));
        assert_eq!(table.header_line, 2);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].number, 3);
    }

    #[test]
    fn test_name_line_variants() {
        for text in [
            "儿童姓名:小明,,",
            "\"姓名：小明\"",
            "Child Name: 小明",
            "name:\t小明\t",
        ] {
            let table = split_table(&format!("{text}\ndate,height,weight")).unwrap();
            assert_eq!(table.child_name.as_deref(), Some("小明"), "{text}");
        }
    }

    #[test]
    fn test_blank_lines_count_toward_line_numbers() {
        let table = split_table("\r\n日期,身高\r\n\r\n2024-03-15,100\r\n").unwrap();
        assert_eq!(table.header_line, 2);
        assert_eq!(table.rows[0].number, 4);
        assert_eq!(table.rows[0].text, "2024-03-15,100");
    }

    #[test]
    fn test_missing_header() {
        let err = split_table("2024-03-15,100,15\n").unwrap_err();
        assert_eq!(err.line, 1);
        assert_eq!(err.detail, "no header found");

        let err = split_table("儿童姓名：小明\n").unwrap_err();
        assert_eq!(err.detail, "no header found");
    }

    #[test]
    fn test_empty_file() {
        assert_eq!(split_table("\n  \n").unwrap_err().detail, "file is empty");
    }

    #[test]
    fn test_tokenize_comma_and_tab() {
        let t = tokenize_row(&row("\"2024-03-15 10:05\",100.5,15.6")).unwrap();
        assert_eq!((t.date.as_str(), t.height.as_str(), t.weight.as_str()), ("2024-03-15 10:05", "100.5", "15.6"));

        let t = tokenize_row(&row("2024-03-15\t100.5\t")).unwrap();
        assert_eq!(t.height, "100.5");
        assert_eq!(t.weight, "");
    }

    #[test]
    fn test_tokenize_whitespace_keeps_time_with_date() {
        let t = tokenize_row(&row("2024-03-15 10:05   100.5 15.6")).unwrap();
        assert_eq!(t.date, "2024-03-15 10:05");
        assert_eq!(t.height, "100.5");
        assert_eq!(t.weight, "15.6");

        let t = tokenize_row(&row("2024/3/15 100.5")).unwrap();
        assert_eq!(t.date, "2024/3/15");
        assert_eq!(t.weight, "");
    }

    #[test]
    fn test_tokenize_too_few_tokens() {
        let err = tokenize_row(&row("2024-03-15")).unwrap_err();
        assert_eq!(err.line, 3);
        assert_eq!(err.raw, "2024-03-15");
    }
}

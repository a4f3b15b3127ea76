//! Small lexical helpers shared by the line-oriented validators.

use regex::Regex;

/// Check if a position in a line falls within a string literal.
/// Supports double-quoted, single-quoted, and backtick strings with escape handling.
pub fn is_inside_string_literal(line: &str, pos: usize) -> bool {
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, ch) in line.char_indices() {
        if i >= pos {
            break;
        }
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, ch) {
            (Some(_), '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (None, '"' | '\'' | '`') => quote = Some(ch),
            _ => {}
        }
    }

    quote.is_some()
}

/// Whether a line is a `//` or block-comment continuation line.
pub fn is_comment_line(line: &str) -> bool {
    let t = line.trim_start();
    t.starts_with("//") || t.starts_with("/*") || t.starts_with('*')
}

/// Contents between the bracket at `open` and its matching close.
///
/// String literals are skipped. Returns `None` when unbalanced.
pub fn balanced_inner(text: &str, open: usize) -> Option<&str> {
    if !text.is_char_boundary(open) {
        return None;
    }
    let open_ch = text[open..].chars().next()?;
    let close_ch = match open_ch {
        '(' => ')',
        '[' => ']',
        '{' => '}',
        '<' => '>',
        _ => return None,
    };

    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, ch) in text[open..].char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' | '`' => quote = Some(ch),
            c if c == open_ch => depth += 1,
            c if c == close_ch => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[open + open_ch.len_utf8()..open + i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split on commas that are not nested in brackets, generics or strings.
///
/// Empty trailing segments are dropped, so `a, b,` yields two parts.
pub fn split_top_level(text: &str) -> Vec<&str> {
    split_commas(text, true)
}

/// Split call arguments; `<` and `>` are treated as operators.
pub fn split_args(text: &str) -> Vec<&str> {
    split_commas(text, false)
}

fn split_commas(text: &str, angles: bool) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (i, ch) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' | '`' => quote = Some(ch),
            '(' | '[' | '{' => depth += 1,
            '<' if angles => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            // `=>` is not a closing angle bracket.
            '>' if angles && depth > 0 && i > 0 && text.as_bytes()[i - 1] != b'=' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(text[start..].trim());
    parts.retain(|p| !p.is_empty());
    parts
}

/// Number of whole-word occurrences of `word` in `text`.
pub fn count_word(text: &str, word: &str) -> usize {
    match Regex::new(&format!(r"\b{}\b", regex::escape(word))) {
        Ok(re) => re.find_iter(text).count(),
        Err(_) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inside_string_literal() {
        let line = r#"const a = "eval(x)"; eval(y)"#;
        assert!(is_inside_string_literal(line, line.find("eval").unwrap()));
        assert!(!is_inside_string_literal(line, line.rfind("eval").unwrap()));
    }

    #[test]
    fn test_balanced_inner() {
        let text = "f(a, g(b, \")\"), [c])";
        assert_eq!(balanced_inner(text, 1), Some("a, g(b, \")\"), [c]"));
        assert_eq!(balanced_inner("f(a", 1), None);
        assert_eq!(balanced_inner("é(a)", 1), None);
        assert_eq!(balanced_inner("é(a)", 2), Some("a"));
        assert_eq!(balanced_inner("f(a)", 9), None);
    }

    #[test]
    fn test_split_top_level() {
        assert_eq!(
            split_top_level("a, { b, c }, (d, e) => d, Map<K, V>,"),
            vec!["a", "{ b, c }", "(d, e) => d", "Map<K, V>"]
        );
        assert!(split_top_level("  ").is_empty());
        assert_eq!(split_args("a < b, c > d"), vec!["a < b", "c > d"]);
    }

    #[test]
    fn test_count_word() {
        assert_eq!(count_word("Props; MyProps; Props", "Props"), 2);
    }
}

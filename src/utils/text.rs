//! Small string helpers exposed next to the container.

/// Returns every top-level occurrence enclosed by `left` and `right`.
///
/// Delimiters may be longer than one character. Nested pairs are kept inside
/// the outer match: `match_delimited("{{a {{b}} c}}", "{{", "}}")` yields
/// `["a {{b}} c"]`. A closing delimiter with nothing open is skipped, so
/// `match_delimited(")(a)", "(", ")")` yields `["a"]`.
pub fn match_delimited(text: &str, left: &str, right: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let left: Vec<char> = left.chars().collect();
    let right: Vec<char> = right.chars().collect();
    let mut matches = Vec::new();

    if left.is_empty() || right.is_empty() {
        return matches;
    }

    let ends_with = |i: usize, pattern: &[char]| -> bool {
        i + 1 >= pattern.len() && chars[i + 1 - pattern.len()..=i] == *pattern
    };

    let mut open = 0usize;
    let mut current: Vec<char> = Vec::new();

    for (i, &item) in chars.iter().enumerate() {
        if ends_with(i, &left) {
            open += 1;

            if open == 1 {
                continue;
            }
        }

        if open > 0 && ends_with(i, &right) {
            open -= 1;

            if right.len() > 1 {
                let keep = current.len().saturating_sub(right.len() - 1);
                current.truncate(keep);
            }
        }

        if open > 0 {
            current.push(item);
        }

        if open == 0 && !current.is_empty() {
            matches.push(current.iter().collect());
            current.clear();
        }
    }

    matches
}

/// Splits on `delimiter`, keeping quoted strings and `{}` / `[]` groups intact.
///
/// Empty pieces are dropped.
pub fn split_top_level(text: &str, delimiter: char) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut open: i32 = 0;
    let mut in_string = false;

    for item in text.chars() {
        match item {
            '\'' | '"' => {
                if in_string {
                    in_string = false;
                    open -= 1;
                } else {
                    in_string = true;
                    open += 1;
                }
            }
            '{' | '[' => open += 1,
            '}' | ']' => open -= 1,
            _ => {}
        }

        if item == delimiter && open == 0 {
            if !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
            }
        } else {
            current.push(item);
        }
    }

    if !current.is_empty() {
        pieces.push(current);
    }

    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_single_char_delimiters() {
        assert_eq!(match_delimited("a (b) c (d)", "(", ")"), vec!["b", "d"]);
    }

    #[test]
    fn test_match_multi_char_delimiters() {
        assert_eq!(
            match_delimited("Hi {{ name }}, {{ age }}", "{{", "}}"),
            vec![" name ", " age "]
        );
    }

    #[test]
    fn test_match_keeps_nested_pairs() {
        assert_eq!(match_delimited("x(a(b)c)y", "(", ")"), vec!["a(b)c"]);
    }

    #[test]
    fn test_match_skips_unopened_close() {
        assert_eq!(match_delimited(")(a)", "(", ")"), vec!["a"]);
        assert_eq!(match_delimited("}} {{b}}", "{{", "}}"), vec!["b"]);
    }

    #[test]
    fn test_match_without_delimiters() {
        assert!(match_delimited("plain", "(", ")").is_empty());
        assert!(match_delimited("plain", "", ")").is_empty());
    }

    #[test]
    fn test_split_keeps_groups() {
        assert_eq!(
            split_top_level("5, {x:5, c: 6}, 'Roman, Peter'", ','),
            vec!["5", " {x:5, c: 6}", " 'Roman, Peter'"]
        );
    }

    #[test]
    fn test_split_drops_empty_pieces() {
        assert_eq!(split_top_level("a,,b,", ','), vec!["a", "b"]);
        assert!(split_top_level("", ',').is_empty());
    }
}

//! Shell-style argument splitting for clap-parsed prefix commands.

/// Splits text into arguments the way a shell would.
///
/// Whitespace separates arguments; single and double quotes group them.
/// Inside double quotes a backslash escapes the next character.
pub fn shell_split(input: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = input.chars();

    while let Some(ch) = chars.next() {
        match (quote, ch) {
            (Some('"'), '\\') => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            (Some(q), c) if c == q => quote = None,
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => {
                quote = Some(ch);
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    args.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if in_word {
        args.push(current);
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_words() {
        assert_eq!(shell_split("  a b\tc "), ["a", "b", "c"]);
        assert!(shell_split("   ").is_empty());
    }

    #[test]
    fn test_quotes_group() {
        assert_eq!(shell_split(r#"say "hello world" 'it''s'"#), ["say", "hello world", "its"]);
        assert_eq!(shell_split(r#""""#), [""]);
    }

    #[test]
    fn test_escape_in_double_quotes() {
        assert_eq!(shell_split(r#""a \"b\"""#), [r#"a "b""#]);
    }
}

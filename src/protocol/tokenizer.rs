//! Splits one command line into `argv`: space-separated tokens, with
//! double-quoted segments supporting `\\` and `\"` escapes.

use crate::error::AckError;

peg::parser! {
    grammar line_grammar() for str {
        rule ws() = quiet!{[' ' | '\t']+}

        rule plain_token() -> String
            = s:$((!['"' | ' ' | '\t'][_])+) { s.to_string() }

        rule escape() -> char
            = "\\\\" { '\\' } / "\\\"" { '"' }

        rule quoted_token() -> String
            = "\"" parts:(escape() / [^'"'])* "\"" { parts.into_iter().collect() }

        rule token() -> String
            = quoted_token() / plain_token()

        pub rule argv() -> Vec<String>
            = ws()? tokens:(token() ** ws()) ws()? { tokens }
    }
}

pub fn tokenize(line: &str) -> Result<Vec<String>, AckError> {
    line_grammar::argv(line).map_err(|e| AckError::arg(format!("malformed command line: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_whitespace() {
        assert_eq!(tokenize("add file.flac").unwrap(), vec!["add", "file.flac"]);
    }

    #[test]
    fn quoted_segment_may_contain_spaces() {
        assert_eq!(
            tokenize(r#"find artist "Boards of Canada""#).unwrap(),
            vec!["find", "artist", "Boards of Canada"]
        );
    }

    #[test]
    fn escapes_inside_quotes_are_unescaped() {
        assert_eq!(
            tokenize(r#"sticker set song "a \"b\" c" name value"#).unwrap(),
            vec!["sticker", "set", "song", "a \"b\" c", "name", "value"]
        );
    }
}

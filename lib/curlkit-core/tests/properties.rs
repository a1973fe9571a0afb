//! Total-function properties: no input makes the pipeline panic.

use curlkit_core::{Error, Variables, convert, parse_command, tokenize, tokenize_args};
use proptest::prelude::*;
use proptest::string::string_regex;

fn vars() -> Variables {
    Variables::new().with("host", "example.com").with("token", "t")
}

/// Words drawn from real curl syntax, so conversion gets past the first token.
fn curl_word() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("-X".to_string()),
        Just("-H".to_string()),
        Just("-d".to_string()),
        Just("-G".to_string()),
        Just("-sSL".to_string()),
        Just("--json".to_string()),
        Just("--retry".to_string()),
        Just("--max-redirs".to_string()),
        Just("-u".to_string()),
        Just("--".to_string()),
        Just("https://example.com".to_string()),
        Just("X-A: 1".to_string()),
        Just("POST".to_string()),
        // no `@` or `<`, so nothing reads files or stdin
        string_regex(r"[ -;=?A-~]{0,12}").unwrap(),
    ]
}

proptest! {
    #[test]
    fn tokenizer_never_panics(s in string_regex(r"(?s)[^\x00]{0,256}").unwrap()) {
        let _ = tokenize(&s);
    }

    #[test]
    fn unterminated_quote_is_a_parse_error(prefix in "[a-z ]{0,16}", quote in "['\"]") {
        let input = format!("curl {prefix} {quote}unclosed");
        let result = tokenize(&input);
        let is_parse_error = matches!(result, Err(Error::Parse { .. }));
        prop_assert!(is_parse_error, "expected a parse error, got {:?}", result);
    }

    #[test]
    fn expander_never_panics(s in string_regex(r"(?s)[^\x00]{0,128}").unwrap()) {
        let _ = vars().expand(&s);
    }

    #[test]
    fn text_without_dollar_is_unchanged(s in "[^$]{0,64}") {
        prop_assert_eq!(vars().expand(&s).unwrap(), s);
    }

    #[test]
    fn converter_never_panics(words in prop::collection::vec(curl_word(), 0..12)) {
        let _ = convert(&tokenize_args(words));
    }

    #[test]
    fn pipeline_never_panics(s in string_regex(r"curl [ -;=?A-~]{0,96}").unwrap()) {
        let _ = parse_command(&s, &vars());
    }

    #[test]
    fn conversion_is_deterministic(words in prop::collection::vec(curl_word(), 0..12)) {
        let first = convert(&tokenize_args(words.clone()));
        let second = convert(&tokenize_args(words));
        match (first, second) {
            (Ok(a), Ok(b)) => prop_assert_eq!(a, b),
            (Err(a), Err(b)) => prop_assert_eq!(a.to_string(), b.to_string()),
            _ => prop_assert!(false, "conversion outcome differs between runs"),
        }
    }
}

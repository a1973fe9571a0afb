//! Curl command tokenizer.
//!
//! [`tokenize`] lexes a raw command string with shell-like rules:
//!
//! - single quotes keep everything literally (including newlines)
//! - double quotes honor `\"`, `\\` and `` \` `` escapes
//! - a backslash outside quotes escapes the next character
//! - a backslash before a newline joins the two lines
//! - lines whose first non-blank character is `#` are dropped
//!
//! `\$` is passed through untouched in both unquoted and double-quoted text so
//! the variable expander can see the escape. Inside single quotes a backslash
//! before `$` is doubled, so it survives expansion as written.
//!
//! [`tokenize_args`] takes a pre-split argument list and never re-splits it.

use std::iter::Peekable;
use std::str::CharIndices;

use crate::token::{Token, TokenKind};
use crate::{Error, Result};

/// Tokenize a raw command string.
///
/// A leading `curl` word is discarded. Everything after a bare `--` becomes
/// a [`TokenKind::Literal`].
///
/// # Errors
///
/// Returns [`Error::Parse`] for an unterminated quote, naming the byte
/// position of the opening quote.
///
/// # Example
///
/// ```
/// use curlkit_core::{TokenKind, tokenize};
///
/// let tokens = tokenize(r#"curl -H "Accept: */*" https://example.com"#).unwrap();
/// assert_eq!(tokens.len(), 3);
/// assert_eq!(tokens[1].raw(), "Accept: */*");
/// assert_eq!(tokens[2].kind(), TokenKind::Url);
/// ```
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    let words = Lexer::new(input).run()?;
    Ok(classify(words))
}

/// Tokenize a pre-split argument list; each element becomes exactly one token.
///
/// Token positions are argument indices.
pub fn tokenize_args<I, S>(args: I) -> Vec<Token>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    classify(
        args.into_iter()
            .enumerate()
            .map(|(index, arg)| (arg.into(), index)),
    )
}

fn classify(words: impl IntoIterator<Item = (String, usize)>) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut literal = false;

    for (index, (word, position)) in words.into_iter().enumerate() {
        if literal {
            tokens.push(Token::new(TokenKind::Literal, word, position));
        } else if index == 0 && word == "curl" {
            continue;
        } else if word == "--" {
            literal = true;
        } else {
            tokens.push(Token::classify(word, position));
        }
    }

    tokens
}

struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    words: Vec<(String, usize)>,
    current: Option<(String, usize)>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            words: Vec::new(),
            current: None,
        }
    }

    /// The word being built, started at `position` if none is open.
    fn word(&mut self, position: usize) -> &mut String {
        &mut self
            .current
            .get_or_insert_with(|| (String::new(), position))
            .0
    }

    fn finish_word(&mut self) {
        if let Some(word) = self.current.take() {
            self.words.push(word);
        }
    }

    /// Consume a `\n` or `\r\n` if it comes next.
    fn eat_newline(&mut self) -> bool {
        match self.chars.peek() {
            Some(&(_, '\n')) => {
                self.chars.next();
                true
            }
            Some(&(_, '\r')) => {
                self.chars.next();
                if matches!(self.chars.peek(), Some(&(_, '\n'))) {
                    self.chars.next();
                }
                true
            }
            _ => false,
        }
    }

    fn skip_line(&mut self) {
        for (_, c) in self.chars.by_ref() {
            if c == '\n' {
                break;
            }
        }
    }

    fn run(mut self) -> Result<Vec<(String, usize)>> {
        let mut line_start = true;

        while let Some((position, c)) = self.chars.next() {
            match c {
                '#' if line_start && self.current.is_none() => {
                    self.skip_line();
                    continue;
                }
                '\\' => {
                    if self.eat_newline() {
                        line_start = true;
                        continue;
                    }
                    self.unquoted_escape(position);
                }
                '\'' => self.single_quoted(position)?,
                '"' => self.double_quoted(position)?,
                c if c.is_whitespace() => {
                    self.finish_word();
                    if c == '\n' {
                        line_start = true;
                    }
                    continue;
                }
                c => self.word(position).push(c),
            }
            line_start = false;
        }

        self.finish_word();
        Ok(self.words)
    }

    fn unquoted_escape(&mut self, position: usize) {
        match self.chars.next() {
            Some((_, '$')) => self.word(position).push_str("\\$"),
            Some((_, next)) => self.word(position).push(next),
            None => self.word(position).push('\\'),
        }
    }

    fn single_quoted(&mut self, open: usize) -> Result<()> {
        self.word(open);
        loop {
            match self.chars.next() {
                Some((_, '\'')) => return Ok(()),
                Some((_, '\\')) if matches!(self.chars.peek(), Some((_, '$'))) => {
                    self.word(open).push_str("\\\\");
                }
                Some((_, c)) => self.word(open).push(c),
                None => return Err(Error::parse("unterminated single quote", self.input, open)),
            }
        }
    }

    fn double_quoted(&mut self, open: usize) -> Result<()> {
        self.word(open);
        loop {
            match self.chars.next() {
                Some((_, '"')) => return Ok(()),
                Some((_, '\\')) => {
                    if self.eat_newline() {
                        continue;
                    }
                    match self.chars.next() {
                        Some((_, c @ ('"' | '\\' | '`'))) => self.word(open).push(c),
                        Some((_, c)) => {
                            let word = self.word(open);
                            word.push('\\');
                            word.push(c);
                        }
                        None => {
                            return Err(Error::parse(
                                "unterminated double quote",
                                self.input,
                                open,
                            ));
                        }
                    }
                }
                Some((_, c)) => self.word(open).push(c),
                None => return Err(Error::parse("unterminated double quote", self.input, open)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;

    fn raws(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(Token::raw).collect()
    }

    #[test]
    fn empty_input_yields_no_tokens() {
        check!(tokenize("").expect("tokenize").is_empty());
        check!(tokenize("   \n\t").expect("tokenize").is_empty());
        check!(tokenize("curl").expect("tokenize").is_empty());
    }

    #[test]
    fn splits_and_classifies() {
        let tokens = tokenize("curl -X POST https://example.com/a").expect("tokenize");
        check!(raws(&tokens) == ["-X", "POST", "https://example.com/a"]);
        let kinds: Vec<_> = tokens.iter().map(Token::kind).collect();
        check!(kinds == [TokenKind::Flag, TokenKind::Value, TokenKind::Url]);
    }

    #[test]
    fn only_leading_curl_is_dropped() {
        let tokens = tokenize("curl -A curl https://x.test").expect("tokenize");
        check!(raws(&tokens) == ["-A", "curl", "https://x.test"]);
    }

    #[test]
    fn quotes_group_words() {
        let tokens =
            tokenize(r#"curl -H 'Content-Type: application/json' -d "{\"a\":1}" x"#)
                .expect("tokenize");
        check!(raws(&tokens) == ["-H", "Content-Type: application/json", "-d", r#"{"a":1}"#, "x"]);
    }

    #[test]
    fn single_quotes_are_literal() {
        let tokens = tokenize(r"-d 'a\nb \\ $x'").expect("tokenize");
        check!(tokens[1].raw() == r"a\nb \\ $x");
    }

    #[test]
    fn single_quoted_escape_survives_expansion() {
        let vars = crate::Variables::new().with("x", "1");
        let mut tokens = tokenize(r#"-d '\$x' -d "\$x" -d \$x -d $x"#).expect("tokenize");
        vars.expand_tokens(&mut tokens).expect("expand");
        check!(raws(&tokens) == ["-d", r"\$x", "-d", "$x", "-d", "$x", "-d", "1"]);
    }

    #[test]
    fn adjacent_quoted_segments_join() {
        let tokens = tokenize(r#"-d 'a'"b"c"#).expect("tokenize");
        check!(tokens[1].raw() == "abc");
    }

    #[test]
    fn empty_quotes_produce_empty_token() {
        let tokens = tokenize("-d ''").expect("tokenize");
        check!(raws(&tokens) == ["-d", ""]);
    }

    #[test]
    fn backslash_escapes_outside_quotes() {
        let tokens = tokenize(r"-d a\ b").expect("tokenize");
        check!(tokens[1].raw() == "a b");
    }

    #[test]
    fn dollar_escape_is_preserved_for_expansion() {
        let tokens = tokenize(r#"-d \$HOME -d "\${x}""#).expect("tokenize");
        check!(tokens[1].raw() == r"\$HOME");
        check!(tokens[3].raw() == r"\${x}");
    }

    #[test]
    fn line_continuations_merge() {
        let input = "curl -X POST \\\n  -H 'A: b' \\\r\n  https://example.com";
        let tokens = tokenize(input).expect("tokenize");
        check!(raws(&tokens) == ["-X", "POST", "-H", "A: b", "https://example.com"]);
    }

    #[test]
    fn comment_lines_are_stripped() {
        let input = "# fetch the thing\ncurl \\\n  # the method\n  -X PUT \\\n  https://example.com # not a comment";
        let tokens = tokenize(input).expect("tokenize");
        check!(raws(&tokens) == ["-X", "PUT", "https://example.com", "#", "not", "a", "comment"]);
    }

    #[test]
    fn hash_inside_word_is_kept() {
        let tokens = tokenize("https://example.com/#frag").expect("tokenize");
        check!(tokens[0].raw() == "https://example.com/#frag");
    }

    #[test]
    fn quoted_multiline_keeps_hash_lines() {
        let tokens = tokenize("-d '{\n# kept\n}'").expect("tokenize");
        check!(tokens[1].raw() == "{\n# kept\n}");
    }

    #[test]
    fn unterminated_quote_names_position() {
        let_assert!(Err(Error::Parse { position, .. }) = tokenize("curl -d 'abc"));
        check!(position == 8);

        let_assert!(Err(Error::Parse { position, .. }) = tokenize(r#"-H "x\"#));
        check!(position == 3);
    }

    #[test]
    fn positions_are_byte_offsets() {
        let tokens = tokenize("curl  -d  'é' x").expect("tokenize");
        check!(tokens[0].position() == 6);
        check!(tokens[1].position() == 10);
        check!(tokens[2].position() == 15);
    }

    #[test]
    fn end_of_options_marks_literals() {
        let tokens = tokenize("curl -d x -- -H https://a.test").expect("tokenize");
        check!(raws(&tokens) == ["-d", "x", "-H", "https://a.test"]);
        check!(tokens[2].kind() == TokenKind::Literal);
        check!(tokens[3].kind() == TokenKind::Literal);
    }

    #[test]
    fn args_are_never_resplit() {
        let tokens = tokenize_args(["curl", "-H", "A: 'b c'", "https://example.com"]);
        check!(raws(&tokens) == ["-H", "A: 'b c'", "https://example.com"]);
        check!(tokens[1].position() == 2);
        check!(tokens[2].kind() == TokenKind::Url);
    }

    #[test]
    fn trailing_backslash_is_kept() {
        let tokens = tokenize("a\\").expect("tokenize");
        check!(tokens[0].raw() == "a\\");
    }
}

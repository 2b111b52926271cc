//! Completeness oracle for buffered source code.
//!
//! Decides whether the candidate accumulated so far could be handed to the
//! remote runtime as one statement, or whether the console should keep
//! reading lines. This is a completeness check, not a parser: a single pass
//! tracks string literals, comments, the delimiter stack, and whether the
//! candidate ends on a binary operator.
//!
//! Anything that fails the scan is Incomplete, including input that is
//! genuinely malformed (a stray `}`, an unterminated `'...` string). The
//! remote runtime is the authority on real syntax errors; it reports them
//! once the statement is finally submitted. The console never raises a
//! syntax error of its own.

/// Outcome of classifying a candidate statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completeness {
    /// The candidate can be submitted as-is.
    Complete,
    /// Keep reading lines (or the input is malformed; see module docs).
    Incomplete,
}

/// Lexical context the scanner is inside at any point of the candidate.
#[derive(Clone, Copy)]
enum Lex {
    Code,
    LineComment,
    BlockComment,
    Str { quote: char, escaped: bool },
}

/// Characters that, as the last meaningful character of the candidate,
/// signal a continuation: the statement cannot end here.
const CONTINUATION_TAIL: &[char] = &[
    '+', '-', '*', '/', '%', '=', '<', '>', '&', '|', '^', ',', '.', '?', ':', '~', '!',
];

/// Classify a candidate statement (all buffered lines joined by newlines).
///
/// Pure and deterministic: identical input always yields the identical
/// outcome, and nothing outside the candidate is consulted.
pub fn classify(candidate: &str) -> Completeness {
    let mut lex = Lex::Code;
    let mut stack: Vec<char> = Vec::new();
    // Last two meaningful characters seen outside comments and strings.
    let mut last: Option<char> = None;
    let mut prev: Option<char> = None;

    let mut chars = candidate.chars().peekable();
    while let Some(c) = chars.next() {
        match lex {
            Lex::Code => match c {
                '/' if chars.peek() == Some(&'/') => {
                    chars.next();
                    lex = Lex::LineComment;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    lex = Lex::BlockComment;
                }
                '\'' | '"' | '`' => {
                    lex = Lex::Str { quote: c, escaped: false };
                }
                '(' | '[' | '{' => {
                    stack.push(c);
                    prev = last;
                    last = Some(c);
                }
                ')' | ']' | '}' => {
                    let opener = match c {
                        ')' => '(',
                        ']' => '[',
                        _ => '{',
                    };
                    if stack.pop() != Some(opener) {
                        // Mismatched or surplus closer. Malformed input is
                        // deliberately folded into Incomplete (module docs).
                        return Completeness::Incomplete;
                    }
                    prev = last;
                    last = Some(c);
                }
                c if c.is_whitespace() => {}
                c => {
                    prev = last;
                    last = Some(c);
                }
            },
            Lex::LineComment => {
                if c == '\n' {
                    lex = Lex::Code;
                }
            }
            Lex::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    lex = Lex::Code;
                }
            }
            Lex::Str { quote, escaped } => {
                if escaped {
                    lex = Lex::Str { quote, escaped: false };
                } else if c == '\\' {
                    lex = Lex::Str { quote, escaped: true };
                } else if c == quote {
                    lex = Lex::Code;
                    // A closed string is a complete expression atom.
                    prev = last;
                    last = Some(quote);
                }
            }
        }
    }

    // An open backtick string legitimately spans lines; an open '...'/"..."
    // string is malformed. Both keep the console reading.
    if matches!(lex, Lex::BlockComment | Lex::Str { .. }) {
        return Completeness::Incomplete;
    }
    if !stack.is_empty() {
        return Completeness::Incomplete;
    }
    if let Some(tail) = last {
        if CONTINUATION_TAIL.contains(&tail) {
            // `x++` and `x--` end on an operator character but are complete
            // postfix expressions.
            let postfix = (tail == '+' || tail == '-') && prev == Some(tail);
            if !postfix {
                return Completeness::Incomplete;
            }
        }
    }
    Completeness::Complete
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete(src: &str) -> bool {
        classify(src) == Completeness::Complete
    }

    #[test]
    fn single_expression_is_complete() {
        assert!(complete("1+1"));
        assert!(complete("foo()"));
        assert!(complete("var x = 5;"));
    }

    #[test]
    fn empty_candidate_is_degenerate_complete() {
        // The accumulator never submits an empty candidate; documented
        // degenerate case.
        assert!(complete(""));
    }

    #[test]
    fn open_brace_awaits_more() {
        assert!(!complete("function f() {"));
        assert!(!complete("if (x) {"));
        assert!(!complete("var a = ["));
    }

    #[test]
    fn balanced_multiline_is_complete() {
        assert!(complete("function f() {\n}"));
        assert!(complete("var a = [\n1,\n2\n];"));
        assert!(complete("if (x) {\n  y();\n} else {\n  z();\n}"));
    }

    #[test]
    fn classification_is_pure() {
        let src = "function f() {";
        assert_eq!(classify(src), classify(src));
        assert_eq!(classify("1+1"), classify("1+1"));
    }

    #[test]
    fn trailing_operator_awaits_more() {
        assert!(!complete("1 +"));
        assert!(!complete("x ="));
        assert!(!complete("a,"));
        assert!(!complete("obj."));
        assert!(!complete("cond ?"));
    }

    #[test]
    fn postfix_increment_is_complete() {
        assert!(complete("x++"));
        assert!(complete("i--"));
    }

    #[test]
    fn unterminated_quote_awaits_more() {
        // Malformed in source terms, but conflated with "needs more input";
        // the runtime reports the real error.
        assert!(!complete("var s = 'abc"));
        assert!(!complete("var s = \"abc"));
    }

    #[test]
    fn backtick_string_spans_lines() {
        assert!(!complete("var s = `first"));
        assert!(complete("var s = `first\nsecond`"));
    }

    #[test]
    fn escaped_quote_stays_in_string() {
        assert!(!complete(r#"var s = "a\"b"#));
        assert!(complete(r#"var s = "a\"b""#));
    }

    #[test]
    fn stray_closer_is_incomplete() {
        assert!(!complete("}"));
        assert!(!complete("foo())"));
        assert!(!complete("(]"));
    }

    #[test]
    fn brackets_inside_strings_are_ignored() {
        assert!(complete("var s = '{[('"));
        assert!(complete("log(\")\")"));
    }

    #[test]
    fn line_comment_does_not_block() {
        assert!(complete("x = 1 // open { brace in comment"));
        assert!(complete("// just a comment"));
    }

    #[test]
    fn unterminated_block_comment_awaits_more() {
        assert!(!complete("x = 1 /* still going"));
        assert!(complete("x = 1 /* done */"));
    }

    #[test]
    fn operator_inside_comment_is_ignored() {
        assert!(complete("x = 1 // and +"));
    }
}

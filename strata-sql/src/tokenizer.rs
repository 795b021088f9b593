//! Statement tokenizer implementation.
//!
//! The tokenizer consumes script text line by line, accumulating a current
//! statement buffer. For every line it maintains two views in lockstep: the
//! *text* view (what ends up in the emitted statement, with comments
//! stripped) and the *code* view (the same characters with string-literal
//! interiors blanked out). Delimiter detection and keyword tracking only
//! ever look at the code view, so a terminator inside a literal can never
//! split a statement.

use strata_dialect::{Delimiter, DelimiterDirective, DialectRules};
use tracing::warn;

use crate::error::{TokenizeError, TokenizeResult};
use crate::statement::SqlStatement;

/// Splits raw script text into executable statements for one dialect.
pub struct StatementTokenizer {
    rules: DialectRules,
}

impl StatementTokenizer {
    /// Create a tokenizer for the given dialect rules.
    pub fn new(rules: DialectRules) -> Self {
        Self { rules }
    }

    /// The rules this tokenizer was built with.
    pub fn rules(&self) -> &DialectRules {
        &self.rules
    }

    /// Split `text` into an ordered sequence of statements.
    ///
    /// Single pass over the input; the same text always produces the same
    /// sequence. The only structural failure is a string literal left open
    /// at end of input.
    pub fn tokenize(&self, text: &str) -> TokenizeResult<Vec<SqlStatement>> {
        let mut scan = Scan::new(&self.rules);
        for (idx, line) in text.lines().enumerate() {
            scan.feed_line(idx as u32 + 1, line);
        }
        scan.finish()
    }
}

/// An open multi-line region that suspends delimiter detection.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Literal {
    /// Standard `'...'` literal. Doubled quotes escape; backslash escapes
    /// additionally apply when the rules say so.
    Single,
    /// `"..."` quoted identifier (may span lines and contain delimiters).
    DoubleQuoted,
    /// MySQL backtick identifier.
    Backtick,
    /// SQL Server bracket identifier.
    Bracket,
    /// Postgres dollar-quoted literal; holds the full `$tag$` opener, which
    /// must reappear verbatim to close.
    Dollar(String),
    /// Oracle `q'[...]'` literal; holds the closing counterpart character.
    Alternative(char),
}

/// How many leading keywords are kept for opener and transaction-policy
/// matching.
const MAX_LEADING_KEYWORDS: usize = 8;

struct Scan<'r> {
    rules: &'r DialectRules,
    delimiter: Delimiter,
    statements: Vec<SqlStatement>,
    /// Accumulated text of the current statement.
    text: String,
    /// First line of the current statement (valid when `has_statement`).
    start_line: u32,
    has_statement: bool,
    literal: Option<Literal>,
    comment_depth: u32,
    /// First keywords of the current statement.
    leading: Vec<String>,
    in_block: bool,
    block_depth: u32,
    seen_begin: bool,
}

impl<'r> Scan<'r> {
    fn new(rules: &'r DialectRules) -> Self {
        Self {
            rules,
            delimiter: rules.default_delimiter.clone(),
            statements: Vec::new(),
            text: String::new(),
            start_line: 1,
            has_statement: false,
            literal: None,
            comment_depth: 0,
            leading: Vec::new(),
            in_block: false,
            block_depth: 0,
            seen_begin: false,
        }
    }

    fn feed_line(&mut self, line_no: u32, raw: &str) {
        // Delimiter-change directives only apply between statements; the
        // directive line itself is never part of an emitted statement.
        if self.literal.is_none() && self.comment_depth == 0 && !self.has_statement {
            if let Some(new_delimiter) = self.parse_directive(raw) {
                self.delimiter = new_delimiter;
                return;
            }
        }

        let (mut text, code) = self.scan_chars(raw);

        // GO-style delimiters terminate the batch without joining it.
        if self.literal.is_none()
            && self.comment_depth == 0
            && self.delimiter.alone_on_line
            && code.trim().eq_ignore_ascii_case(&self.delimiter.token)
        {
            self.emit(false);
            return;
        }

        if !self.has_statement {
            if text.trim().is_empty() {
                // Blank or comment-only line between statements.
                return;
            }
            self.start_line = line_no;
            self.has_statement = true;
        }

        self.track_keywords(line_no, &code);

        // Trailing whitespace left behind by comment stripping is noise,
        // but an open literal owns its line verbatim.
        if self.literal.is_none() {
            let trimmed = text.trim_end().len();
            text.truncate(trimmed);
        }

        if !self.text.is_empty() {
            self.text.push('\n');
        }
        self.text.push_str(&text);

        if self.literal.is_none()
            && self.comment_depth == 0
            && !self.delimiter.alone_on_line
            && (!self.in_block || (self.seen_begin && self.block_depth == 0))
            && code.trim_end().ends_with(&self.delimiter.token)
        {
            self.emit(true);
        }
    }

    fn finish(mut self) -> TokenizeResult<Vec<SqlStatement>> {
        if self.literal.is_some() {
            return Err(TokenizeError::UnterminatedLiteral {
                line: self.start_line,
            });
        }
        if self.has_statement {
            // Accept a final statement without a trailing delimiter.
            self.emit(false);
        }
        Ok(self.statements)
    }

    fn emit(&mut self, strip_delimiter: bool) {
        let mut sql = std::mem::take(&mut self.text);
        if strip_delimiter {
            let trimmed = sql.trim_end().len();
            sql.truncate(trimmed);
            sql.truncate(sql.len().saturating_sub(self.delimiter.token.len()));
        }
        let sql = sql.trim();

        if !sql.is_empty() {
            let execute_in_transaction = !self.starts_non_transactional();
            self.statements.push(SqlStatement {
                sql: sql.to_string(),
                line_number: self.start_line,
                delimiter: self.delimiter.clone(),
                execute_in_transaction,
            });
        }

        self.has_statement = false;
        self.leading.clear();
        self.in_block = false;
        self.block_depth = 0;
        self.seen_begin = false;
    }

    fn starts_non_transactional(&self) -> bool {
        if self.rules.non_transactional_prefixes.is_empty() {
            return false;
        }
        let joined = self.leading.join(" ");
        self.rules.non_transactional_prefixes.iter().any(|phrase| {
            joined == *phrase || joined.starts_with(&format!("{phrase} "))
        })
    }

    fn parse_directive(&self, raw: &str) -> Option<Delimiter> {
        let mut parts = raw.trim().split_whitespace();
        match self.rules.delimiter_directive {
            DelimiterDirective::None => None,
            DelimiterDirective::MySqlDelimiter => {
                if !parts.next()?.eq_ignore_ascii_case("DELIMITER") {
                    return None;
                }
                Some(Delimiter::new(parts.next()?))
            }
            DelimiterDirective::SetTerm => {
                if !parts.next()?.eq_ignore_ascii_case("SET") {
                    return None;
                }
                if !parts.next()?.eq_ignore_ascii_case("TERM") {
                    return None;
                }
                // `SET TERM !! ;` — the trailing old delimiter is ignored.
                Some(Delimiter::new(parts.next()?))
            }
        }
    }

    /// Scan one line, returning the text view and the code view.
    ///
    /// Both views stay character-aligned: literal interiors become spaces
    /// in the code view, comments are dropped from both.
    fn scan_chars(&mut self, raw: &str) -> (String, String) {
        let chars: Vec<char> = raw.chars().collect();
        let mut text = String::with_capacity(raw.len());
        let mut code = String::with_capacity(raw.len());
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];

            if self.comment_depth > 0 {
                if c == '*' && chars.get(i + 1) == Some(&'/') {
                    self.comment_depth -= 1;
                    i += 2;
                } else if self.rules.nested_block_comments
                    && c == '/'
                    && chars.get(i + 1) == Some(&'*')
                {
                    self.comment_depth += 1;
                    i += 2;
                } else {
                    i += 1;
                }
                continue;
            }

            if let Some(literal) = self.literal.clone() {
                match literal {
                    Literal::Single => {
                        if self.rules.backslash_escapes && c == '\\' {
                            text.push(c);
                            code.push(' ');
                            if let Some(&escaped) = chars.get(i + 1) {
                                text.push(escaped);
                                code.push(' ');
                                i += 2;
                            } else {
                                i += 1;
                            }
                            continue;
                        }
                        if c == '\'' {
                            if chars.get(i + 1) == Some(&'\'') {
                                text.push_str("''");
                                code.push_str("  ");
                                i += 2;
                                continue;
                            }
                            self.literal = None;
                            text.push(c);
                            code.push(c);
                            i += 1;
                            continue;
                        }
                        text.push(c);
                        code.push(' ');
                        i += 1;
                    }
                    Literal::DoubleQuoted => {
                        if c == '"' {
                            if chars.get(i + 1) == Some(&'"') {
                                text.push_str("\"\"");
                                code.push_str("  ");
                                i += 2;
                                continue;
                            }
                            self.literal = None;
                            text.push(c);
                            code.push(c);
                            i += 1;
                            continue;
                        }
                        text.push(c);
                        code.push(' ');
                        i += 1;
                    }
                    Literal::Backtick => {
                        if c == '`' {
                            self.literal = None;
                            code.push(c);
                        } else {
                            code.push(' ');
                        }
                        text.push(c);
                        i += 1;
                    }
                    Literal::Bracket => {
                        if c == ']' {
                            self.literal = None;
                            code.push(c);
                        } else {
                            code.push(' ');
                        }
                        text.push(c);
                        i += 1;
                    }
                    Literal::Dollar(tag) => {
                        if c == '$' && starts_with_at(&chars, i, &tag) {
                            text.push_str(&tag);
                            code.push_str(&tag);
                            i += tag.chars().count();
                            self.literal = None;
                            continue;
                        }
                        text.push(c);
                        code.push(' ');
                        i += 1;
                    }
                    Literal::Alternative(close) => {
                        if c == close && chars.get(i + 1) == Some(&'\'') {
                            text.push(close);
                            text.push('\'');
                            code.push(' ');
                            code.push('\'');
                            self.literal = None;
                            i += 2;
                            continue;
                        }
                        text.push(c);
                        code.push(' ');
                        i += 1;
                    }
                }
                continue;
            }

            // Line comments: drop the rest of the line.
            if c == '-' && chars.get(i + 1) == Some(&'-') {
                break;
            }
            if c == '#' && self.rules.hash_line_comments {
                break;
            }
            // Block comment open.
            if c == '/' && chars.get(i + 1) == Some(&'*') {
                self.comment_depth = 1;
                i += 2;
                continue;
            }

            match c {
                '\'' => {
                    if self.rules.alternative_quoting && ends_with_quote_operator(&code) {
                        if let Some(&open) = chars.get(i + 1) {
                            let close = match open {
                                '[' => ']',
                                '(' => ')',
                                '{' => '}',
                                '<' => '>',
                                other => other,
                            };
                            text.push('\'');
                            code.push('\'');
                            text.push(open);
                            code.push(' ');
                            self.literal = Some(Literal::Alternative(close));
                            i += 2;
                            continue;
                        }
                    }
                    self.literal = Some(Literal::Single);
                    text.push(c);
                    code.push(c);
                    i += 1;
                }
                '"' => {
                    self.literal = Some(Literal::DoubleQuoted);
                    text.push(c);
                    code.push(c);
                    i += 1;
                }
                '`' if self.rules.backtick_identifiers => {
                    self.literal = Some(Literal::Backtick);
                    text.push(c);
                    code.push(c);
                    i += 1;
                }
                '[' if self.rules.bracket_identifiers => {
                    self.literal = Some(Literal::Bracket);
                    text.push(c);
                    code.push(c);
                    i += 1;
                }
                '$' if self.rules.dollar_quoting => {
                    if let Some(tag) = dollar_tag_at(&chars, i) {
                        text.push_str(&tag);
                        code.push_str(&tag);
                        i += tag.chars().count();
                        self.literal = Some(Literal::Dollar(tag));
                        continue;
                    }
                    text.push(c);
                    code.push(c);
                    i += 1;
                }
                _ => {
                    text.push(c);
                    code.push(c);
                    i += 1;
                }
            }
        }

        (text, code)
    }

    /// Update leading-keyword and block-depth state from one code line.
    fn track_keywords(&mut self, line_no: u32, code: &str) {
        let words = extract_keywords(code, self.rules.literal_prefixes);
        let mut i = 0;

        while i < words.len() {
            let word = words[i].as_str();

            if self.leading.len() < MAX_LEADING_KEYWORDS {
                self.leading.push(words[i].clone());
            }

            if !self.in_block && self.matches_block_opener() {
                self.in_block = true;
            }

            if self.in_block {
                match word {
                    "BEGIN" => {
                        self.block_depth += 1;
                        self.seen_begin = true;
                    }
                    "IF" => {
                        // `IF EXISTS` / `IF NOT EXISTS` clauses are not
                        // block openers.
                        let next = words.get(i + 1).map(String::as_str);
                        let clause = matches!(next, Some("EXISTS"))
                            || (matches!(next, Some("NOT"))
                                && matches!(
                                    words.get(i + 2).map(String::as_str),
                                    Some("EXISTS")
                                ));
                        if !clause {
                            self.block_depth += 1;
                        }
                    }
                    "LOOP" | "CASE" | "WHILE" | "REPEAT" => {
                        self.block_depth += 1;
                    }
                    "END" => {
                        // `END IF` and friends close the construct that
                        // opened them; consume the pair as one step down.
                        if matches!(
                            words.get(i + 1).map(String::as_str),
                            Some("IF" | "LOOP" | "CASE" | "WHILE" | "REPEAT")
                        ) {
                            i += 1;
                        }
                        if self.block_depth == 0 {
                            warn!(line = line_no, "unbalanced END, clamping block depth at zero");
                        } else {
                            self.block_depth -= 1;
                        }
                    }
                    _ => {}
                }
            }

            i += 1;
        }
    }

    fn matches_block_opener(&self) -> bool {
        self.rules.block_openers.iter().any(|opener| {
            self.leading.len() >= opener.len()
                && opener
                    .iter()
                    .zip(self.leading.iter())
                    .all(|(expected, actual)| actual == expected)
        })
    }
}

/// Extract uppercased keywords from a code-view line.
///
/// A word immediately followed by a quote is a literal prefix
/// (`N'...'`, `DATE'...'`) when the rules list it, and belongs to the
/// literal rather than the keyword stream.
fn extract_keywords(code: &str, literal_prefixes: &[&str]) -> Vec<String> {
    let chars: Vec<char> = code.chars().collect();
    let mut words = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i].is_ascii_alphanumeric() || chars[i] == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let word: String = chars[start..i]
                .iter()
                .collect::<String>()
                .to_ascii_uppercase();
            let attached_to_quote = chars.get(i) == Some(&'\'');
            if !(attached_to_quote && literal_prefixes.contains(&word.as_str())) {
                words.push(word);
            }
        } else {
            i += 1;
        }
    }

    words
}

/// Check whether the code built so far ends in a standalone `q` operator.
fn ends_with_quote_operator(code: &str) -> bool {
    let mut rev = code.chars().rev();
    match rev.next() {
        Some('q') | Some('Q') => {}
        _ => return false,
    }
    match rev.next() {
        None => true,
        Some(prev) => !(prev.is_ascii_alphanumeric() || prev == '_'),
    }
}

/// Parse a `$tag$` dollar-quote opener starting at `i`, if present.
fn dollar_tag_at(chars: &[char], i: usize) -> Option<String> {
    debug_assert_eq!(chars[i], '$');
    let mut j = i + 1;
    while j < chars.len() && (chars[j].is_ascii_alphanumeric() || chars[j] == '_') {
        j += 1;
    }
    if chars.get(j) == Some(&'$') {
        Some(chars[i..=j].iter().collect())
    } else {
        None
    }
}

/// Check whether `needle` occurs in `chars` starting at `i`.
fn starts_with_at(chars: &[char], i: usize, needle: &str) -> bool {
    let needle: Vec<char> = needle.chars().collect();
    chars.len() >= i + needle.len() && chars[i..i + needle.len()] == needle[..]
}

//! Lexer for Shell Scripts
//!
//! The lexer tokenizes input into a stream of tokens that the parser consumes.
//! It handles:
//! - Operators and delimiters, matched longest first
//! - Words, kept in their raw quoted form for the word parser
//! - ANSI-C quoting (`$'...'`), decoded at lex time
//! - Here-documents, attached to their `<<` operator token
//! - Comments and line continuations

use std::collections::HashMap;

/// Token types for the shell lexer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    // End of input
    Eof,

    // Newlines and separators
    Newline,
    Semicolon,
    Amp, // &

    // Operators
    Pipe,    // |
    PipeAmp, // |&
    AndAnd,  // &&
    OrOr,    // ||
    Bang,    // !

    // Redirections
    Less,      // <
    Great,     // >
    DLess,     // <<
    DGreat,    // >>
    LessAnd,   // <&
    GreatAnd,  // >&
    LessGreat, // <>
    DLessDash, // <<-
    Clobber,   // >|
    TLess,     // <<<
    AndGreat,  // &>
    AndDGreat, // &>>

    // Grouping
    LParen, // (
    RParen, // )
    LBrace, // {
    RBrace, // }

    // Case terminators
    DSemi,       // ;;
    SemiAnd,     // ;&
    SemiSemiAnd, // ;;&

    // Compound commands
    DBrackStart, // [[
    DBrackEnd,   // ]]
    /// (( expr )), value holds the expression text
    ArithCommand,

    // Reserved words
    If,
    Then,
    Else,
    Elif,
    Fi,
    For,
    While,
    Until,
    Do,
    Done,
    Case,
    Esac,
    In,
    Function,

    // Words and identifiers
    Word,
    Name,           // Valid variable name
    Number,         // IO number: the 2 in 2>&1
    AssignmentWord, // VAR=value
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eof => "EOF",
            Self::Newline => "NEWLINE",
            Self::Semicolon => ";",
            Self::Amp => "&",
            Self::Pipe => "|",
            Self::PipeAmp => "|&",
            Self::AndAnd => "&&",
            Self::OrOr => "||",
            Self::Bang => "!",
            Self::Less => "<",
            Self::Great => ">",
            Self::DLess => "<<",
            Self::DGreat => ">>",
            Self::LessAnd => "<&",
            Self::GreatAnd => ">&",
            Self::LessGreat => "<>",
            Self::DLessDash => "<<-",
            Self::Clobber => ">|",
            Self::TLess => "<<<",
            Self::AndGreat => "&>",
            Self::AndDGreat => "&>>",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::DSemi => ";;",
            Self::SemiAnd => ";&",
            Self::SemiSemiAnd => ";;&",
            Self::DBrackStart => "[[",
            Self::DBrackEnd => "]]",
            Self::ArithCommand => "((",
            Self::If => "if",
            Self::Then => "then",
            Self::Else => "else",
            Self::Elif => "elif",
            Self::Fi => "fi",
            Self::For => "for",
            Self::While => "while",
            Self::Until => "until",
            Self::Do => "do",
            Self::Done => "done",
            Self::Case => "case",
            Self::Esac => "esac",
            Self::In => "in",
            Self::Function => "function",
            Self::Word => "WORD",
            Self::Name => "NAME",
            Self::Number => "NUMBER",
            Self::AssignmentWord => "ASSIGNMENT_WORD",
        }
    }

    /// Reserved words are ordinary words outside command position
    pub fn is_reserved_word(&self) -> bool {
        matches!(
            self,
            Self::If
                | Self::Then
                | Self::Else
                | Self::Elif
                | Self::Fi
                | Self::For
                | Self::While
                | Self::Until
                | Self::Do
                | Self::Done
                | Self::Case
                | Self::Esac
                | Self::In
                | Self::Function
        )
    }
}

/// Body of a here-document, attached to its `<<`/`<<-` operator token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeredocBody {
    pub content: String,
    pub quoted: bool,
}

/// A token produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub value: String,
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
    /// Any part of the word was quoted
    pub quoted: bool,
    pub heredoc: Option<HeredocBody>,
}

impl Token {
    pub fn new(
        token_type: TokenType,
        value: impl Into<String>,
        start: usize,
        end: usize,
        line: usize,
        column: usize,
    ) -> Self {
        Self {
            token_type,
            value: value.into(),
            start,
            end,
            line,
            column,
            quoted: false,
            heredoc: None,
        }
    }

    pub fn with_quoted(mut self, quoted: bool) -> Self {
        self.quoted = quoted;
        self
    }

    /// True for any token that can serve as a word in argument position
    pub fn is_word_like(&self) -> bool {
        matches!(
            self.token_type,
            TokenType::Word | TokenType::Name | TokenType::Number | TokenType::AssignmentWord
        ) || self.token_type.is_reserved_word()
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({:?}) at {}:{}", self.token_type.as_str(), self.value, self.line, self.column)
    }
}

/// Lexer error with position
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message} at {line}:{column}")]
pub struct LexerError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl LexerError {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }
}

/// Pending heredoc information
#[derive(Debug, Clone)]
struct PendingHeredoc {
    delimiter: String,
    strip_tabs: bool,
    quoted: bool,
    token_index: usize,
    line: usize,
}

lazy_static::lazy_static! {
    /// Reserved words
    static ref RESERVED_WORDS: HashMap<&'static str, TokenType> = {
        let mut m = HashMap::new();
        m.insert("if", TokenType::If);
        m.insert("then", TokenType::Then);
        m.insert("else", TokenType::Else);
        m.insert("elif", TokenType::Elif);
        m.insert("fi", TokenType::Fi);
        m.insert("for", TokenType::For);
        m.insert("while", TokenType::While);
        m.insert("until", TokenType::Until);
        m.insert("do", TokenType::Do);
        m.insert("done", TokenType::Done);
        m.insert("case", TokenType::Case);
        m.insert("esac", TokenType::Esac);
        m.insert("in", TokenType::In);
        m.insert("function", TokenType::Function);
        m
    };

    /// Single-character operators
    static ref SINGLE_CHAR_OPS: HashMap<char, TokenType> = {
        let mut m = HashMap::new();
        m.insert('|', TokenType::Pipe);
        m.insert('&', TokenType::Amp);
        m.insert(';', TokenType::Semicolon);
        m.insert('(', TokenType::LParen);
        m.insert(')', TokenType::RParen);
        m.insert('<', TokenType::Less);
        m.insert('>', TokenType::Great);
        m
    };
}

/// Three-character operators
const THREE_CHAR_OPS: &[(&str, TokenType)] = &[
    (";;&", TokenType::SemiSemiAnd),
    ("<<<", TokenType::TLess),
    ("<<-", TokenType::DLessDash),
    ("&>>", TokenType::AndDGreat),
];

/// Two-character operators
const TWO_CHAR_OPS: &[(&str, TokenType)] = &[
    ("&&", TokenType::AndAnd),
    ("||", TokenType::OrOr),
    (";;", TokenType::DSemi),
    (";&", TokenType::SemiAnd),
    ("|&", TokenType::PipeAmp),
    ("<<", TokenType::DLess),
    (">>", TokenType::DGreat),
    ("<&", TokenType::LessAnd),
    (">&", TokenType::GreatAnd),
    ("<>", TokenType::LessGreat),
    (">|", TokenType::Clobber),
    ("&>", TokenType::AndGreat),
];

/// Check if a string is a valid variable name
pub fn is_valid_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Characters that end an unquoted word
fn is_word_boundary(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | ';' | '&' | '|' | '<' | '>' | '(' | ')')
}

/// Find the `=` of an assignment word (`NAME=`, `NAME+=`, `NAME[sub]=`)
pub fn find_assignment_eq(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
    }
    if i == 0 || bytes[0].is_ascii_digit() {
        return None;
    }
    if i < bytes.len() && bytes[i] == b'[' {
        let mut depth = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'[' => depth += 1,
                b']' => {
                    depth -= 1;
                    if depth == 0 {
                        i += 1;
                        break;
                    }
                }
                _ => {}
            }
            i += 1;
        }
        if depth != 0 {
            return None;
        }
    }
    if i < bytes.len() && bytes[i] == b'+' && bytes.get(i + 1) == Some(&b'=') {
        return Some(i + 1);
    }
    if i < bytes.len() && bytes[i] == b'=' {
        return Some(i);
    }
    None
}

/// Decode the body of an ANSI-C quoted string (`$'...'`)
pub fn decode_ansi_c(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c != '\\' || i + 1 >= chars.len() {
            out.push(c);
            i += 1;
            continue;
        }
        i += 1;
        let e = chars[i];
        i += 1;
        match e {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'a' => out.push('\x07'),
            'b' => out.push('\x08'),
            'e' | 'E' => out.push('\x1b'),
            'f' => out.push('\x0c'),
            'v' => out.push('\x0b'),
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            '?' => out.push('?'),
            '0'..='7' => {
                let mut value = e.to_digit(8).unwrap_or(0);
                let mut n = 1;
                while n < 3 && i < chars.len() && chars[i].is_digit(8) {
                    value = value * 8 + chars[i].to_digit(8).unwrap_or(0);
                    i += 1;
                    n += 1;
                }
                if let Some(ch) = char::from_u32(value) {
                    out.push(ch);
                }
            }
            'x' | 'u' | 'U' => {
                let max = match e {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let mut hex = String::new();
                while hex.len() < max && i < chars.len() && chars[i].is_ascii_hexdigit() {
                    hex.push(chars[i]);
                    i += 1;
                }
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(ch) if !hex.is_empty() => out.push(ch),
                    _ => {
                        out.push('\\');
                        out.push(e);
                        out.push_str(&hex);
                    }
                }
            }
            'c' if i < chars.len() => {
                out.push(((chars[i] as u8) & 0x1f) as char);
                i += 1;
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    out
}

/// Shell lexer
pub struct Lexer {
    input: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
    pending_heredocs: Vec<PendingHeredoc>,
    in_dbrack: bool,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
            pending_heredocs: Vec::new(),
            in_dbrack: false,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexerError> {
        loop {
            // Here-document bodies start on the line after their operator
            if !self.pending_heredocs.is_empty()
                && self.tokens.last().map(|t| t.token_type) == Some(TokenType::Newline)
            {
                self.read_heredoc_content()?;
            }

            self.skip_whitespace();
            if self.pos >= self.input.len() {
                break;
            }
            if let Some(token) = self.next_token()? {
                self.tokens.push(token);
            }
        }

        if let Some(heredoc) = self.pending_heredocs.first() {
            return Err(LexerError::new(
                format!("unterminated here-document, wanted `{}'", heredoc.delimiter),
                heredoc.line,
                1,
            ));
        }

        self.tokens.push(Token::new(
            TokenType::Eof,
            "",
            self.pos,
            self.pos,
            self.line,
            self.column,
        ));
        Ok(self.tokens)
    }

    fn current(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.current()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.current() {
            match c {
                ' ' | '\t' | '\r' => {
                    self.advance();
                }
                '\\' if self.peek(1) == Some('\n') => {
                    // Line continuation
                    self.advance();
                    self.advance();
                }
                '#' => {
                    // Comment runs to end of line
                    while let Some(c) = self.current() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn op_token(&mut self, token_type: TokenType, text: &str) -> Token {
        let start = self.pos;
        let (line, column) = (self.line, self.column);
        for _ in 0..text.chars().count() {
            self.advance();
        }
        Token::new(token_type, text, start, self.pos, line, column)
    }

    fn next_token(&mut self) -> Result<Option<Token>, LexerError> {
        let c0 = match self.current() {
            Some(c) => c,
            None => return Ok(None),
        };
        let c1 = self.peek(1);
        let c2 = self.peek(2);

        if c0 == '\n' {
            return Ok(Some(self.op_token(TokenType::Newline, "\n")));
        }

        // Process substitution is part of a word
        if (c0 == '<' || c0 == '>') && c1 == Some('(') {
            return self.read_word().map(Some);
        }

        // ZSH numeric range glob <1-10> / <->
        if c0 == '<' && self.numeric_range_len().is_some() {
            return self.read_word().map(Some);
        }

        // (( arithmetic command ))
        if c0 == '(' && c1 == Some('(') && !self.in_dbrack {
            if let Some(token) = self.try_read_arith_command()? {
                return Ok(Some(token));
            }
        }

        for (op_str, token_type) in THREE_CHAR_OPS {
            let chars: Vec<char> = op_str.chars().collect();
            if c0 == chars[0] && c1 == Some(chars[1]) && c2 == Some(chars[2]) {
                if *token_type == TokenType::DLessDash {
                    self.register_heredoc(3, true);
                }
                return Ok(Some(self.op_token(*token_type, op_str)));
            }
        }

        for (op_str, token_type) in TWO_CHAR_OPS {
            let chars: Vec<char> = op_str.chars().collect();
            if c0 == chars[0] && c1 == Some(chars[1]) {
                if *token_type == TokenType::DLess {
                    self.register_heredoc(2, false);
                }
                return Ok(Some(self.op_token(*token_type, op_str)));
            }
        }

        if c0 == '[' && c1 == Some('[') && c2.map_or(true, |c| c.is_whitespace()) {
            self.in_dbrack = true;
            return Ok(Some(self.op_token(TokenType::DBrackStart, "[[")));
        }
        if self.in_dbrack && c0 == ']' && c1 == Some(']') && c2.map_or(true, is_word_boundary) {
            self.in_dbrack = false;
            return Ok(Some(self.op_token(TokenType::DBrackEnd, "]]")));
        }

        if let Some(&token_type) = SINGLE_CHAR_OPS.get(&c0) {
            if c0 == '(' && self.paren_is_glob_group() {
                return self.read_word().map(Some);
            }
            return Ok(Some(self.op_token(token_type, &c0.to_string())));
        }

        if c0 == '{' && c1.map_or(true, |c| c.is_whitespace()) {
            return Ok(Some(self.op_token(TokenType::LBrace, "{")));
        }
        if c0 == '}' && c1.map_or(true, is_word_boundary) {
            return Ok(Some(self.op_token(TokenType::RBrace, "}")));
        }
        if c0 == '!' && c1.map_or(true, |c| c.is_whitespace()) {
            return Ok(Some(self.op_token(TokenType::Bang, "!")));
        }

        self.read_word().map(Some)
    }

    /// Length of a `<N-M>` numeric range at the cursor, if one starts here
    fn numeric_range_len(&self) -> Option<usize> {
        let rest = &self.input[self.pos..];
        if rest.first() != Some(&'<') {
            return None;
        }
        let mut i = 1;
        while rest.get(i).map_or(false, |c| c.is_ascii_digit()) {
            i += 1;
        }
        if rest.get(i) != Some(&'-') {
            return None;
        }
        i += 1;
        while rest.get(i).map_or(false, |c| c.is_ascii_digit()) {
            i += 1;
        }
        if rest.get(i) != Some(&'>') {
            return None;
        }
        Some(i + 1)
    }

    /// `(a|b)` in argument position is a ZSH alternation pattern, not a subshell
    fn paren_is_glob_group(&self) -> bool {
        let prev_is_word = self.tokens.last().map_or(false, |t| {
            matches!(t.token_type, TokenType::Word | TokenType::Name | TokenType::Number)
        });
        if !prev_is_word {
            return false;
        }
        let mut depth = 0;
        let mut saw_bar = false;
        for &c in &self.input[self.pos..] {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return saw_bar;
                    }
                }
                '|' => saw_bar = true,
                ' ' | '\t' | '\n' => return false,
                _ => {}
            }
        }
        false
    }

    /// Try to read `(( ... ))`; returns None when the parens are nested subshells
    fn try_read_arith_command(&mut self) -> Result<Option<Token>, LexerError> {
        let mut depth = 0i32;
        let mut i = self.pos + 2;
        while i < self.input.len() {
            match self.input[i] {
                '(' => depth += 1,
                ')' => {
                    if depth == 0 {
                        if self.input.get(i + 1) == Some(&')') {
                            let expr: String = self.input[self.pos + 2..i].iter().collect();
                            let start = self.pos;
                            let (line, column) = (self.line, self.column);
                            while self.pos < i + 2 {
                                self.advance();
                            }
                            return Ok(Some(Token::new(
                                TokenType::ArithCommand,
                                expr,
                                start,
                                self.pos,
                                line,
                                column,
                            )));
                        }
                        return Ok(None);
                    }
                    depth -= 1;
                }
                _ => {}
            }
            i += 1;
        }
        Ok(None)
    }

    fn read_word(&mut self) -> Result<Token, LexerError> {
        let start = self.pos;
        let (line, column) = (self.line, self.column);
        let mut value = String::new();
        let mut quoted = false;

        while let Some(c) = self.current() {
            if c == '<' {
                if let Some(len) = self.numeric_range_len() {
                    for _ in 0..len {
                        if let Some(ch) = self.advance() {
                            value.push(ch);
                        }
                    }
                    continue;
                }
            }
            if (c == '<' || c == '>') && self.peek(1) == Some('(') {
                value.push(c);
                self.advance();
                self.read_balanced(&mut value, '(', ')')?;
                continue;
            }
            if c == '(' {
                let is_array = value.ends_with('=')
                    && !quoted
                    && find_assignment_eq(&value).map_or(false, |eq| eq + 1 == value.len());
                let is_group = value.is_empty() || (!value.is_empty() && self.peek(1) != Some(')'));
                if is_array || is_group {
                    self.read_balanced(&mut value, '(', ')')?;
                    continue;
                }
                break;
            }
            if is_word_boundary(c) {
                break;
            }
            if self.in_dbrack && c == ']' && self.peek(1) == Some(']') && !value.is_empty() {
                let after = self.peek(2);
                if after.map_or(true, is_word_boundary) {
                    break;
                }
            }
            match c {
                '\\' => {
                    self.advance();
                    match self.current() {
                        Some('\n') => {
                            self.advance();
                        }
                        Some(next) => {
                            value.push('\\');
                            value.push(next);
                            self.advance();
                            quoted = true;
                        }
                        None => value.push('\\'),
                    }
                }
                '\'' => {
                    quoted = true;
                    self.read_single_quoted(&mut value)?;
                }
                '"' => {
                    quoted = true;
                    self.read_double_quoted(&mut value)?;
                }
                '`' => {
                    self.read_backtick(&mut value)?;
                }
                '$' => match self.peek(1) {
                    Some('\'') => {
                        quoted = true;
                        self.read_ansi_c(&mut value)?;
                    }
                    Some('(') => {
                        value.push('$');
                        self.advance();
                        self.read_balanced(&mut value, '(', ')')?;
                    }
                    Some('{') => {
                        value.push('$');
                        self.advance();
                        self.read_balanced(&mut value, '{', '}')?;
                    }
                    Some('[') => {
                        value.push('$');
                        self.advance();
                        self.read_balanced(&mut value, '[', ']')?;
                    }
                    _ => {
                        value.push('$');
                        self.advance();
                    }
                },
                _ => {
                    value.push(c);
                    self.advance();
                }
            }
        }

        let token_type = self.classify_word(&value, quoted);
        Ok(Token::new(token_type, value, start, self.pos, line, column).with_quoted(quoted))
    }

    fn classify_word(&self, value: &str, quoted: bool) -> TokenType {
        if !quoted {
            if let Some(&reserved) = RESERVED_WORDS.get(value) {
                return reserved;
            }
        }
        if value.chars().all(|c| c.is_ascii_digit())
            && !value.is_empty()
            && matches!(self.current(), Some('<') | Some('>'))
        {
            return TokenType::Number;
        }
        if find_assignment_eq(value).is_some() {
            return TokenType::AssignmentWord;
        }
        if is_valid_name(value) {
            return TokenType::Name;
        }
        TokenType::Word
    }

    fn read_single_quoted(&mut self, value: &mut String) -> Result<(), LexerError> {
        let (line, column) = (self.line, self.column);
        value.push('\'');
        self.advance();
        loop {
            match self.advance() {
                Some('\'') => {
                    value.push('\'');
                    return Ok(());
                }
                Some(c) => value.push(c),
                None => {
                    return Err(LexerError::new(
                        "unexpected EOF while looking for matching `''",
                        line,
                        column,
                    ))
                }
            }
        }
    }

    fn read_double_quoted(&mut self, value: &mut String) -> Result<(), LexerError> {
        let (line, column) = (self.line, self.column);
        value.push('"');
        self.advance();
        loop {
            match self.current() {
                Some('"') => {
                    value.push('"');
                    self.advance();
                    return Ok(());
                }
                Some('\\') => {
                    self.advance();
                    match self.current() {
                        Some('\n') => {
                            self.advance();
                        }
                        Some(next) => {
                            value.push('\\');
                            value.push(next);
                            self.advance();
                        }
                        None => value.push('\\'),
                    }
                }
                Some('`') => self.read_backtick(value)?,
                Some('$') if self.peek(1) == Some('(') => {
                    value.push('$');
                    self.advance();
                    self.read_balanced(value, '(', ')')?;
                }
                Some('$') if self.peek(1) == Some('{') => {
                    value.push('$');
                    self.advance();
                    self.read_balanced(value, '{', '}')?;
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
                None => {
                    return Err(LexerError::new(
                        "unexpected EOF while looking for matching `\"'",
                        line,
                        column,
                    ))
                }
            }
        }
    }

    fn read_backtick(&mut self, value: &mut String) -> Result<(), LexerError> {
        let (line, column) = (self.line, self.column);
        value.push('`');
        self.advance();
        loop {
            match self.advance() {
                Some('`') => {
                    value.push('`');
                    return Ok(());
                }
                Some('\\') => {
                    value.push('\\');
                    if let Some(next) = self.advance() {
                        value.push(next);
                    }
                }
                Some(c) => value.push(c),
                None => {
                    return Err(LexerError::new(
                        "unexpected EOF while looking for matching ``'",
                        line,
                        column,
                    ))
                }
            }
        }
    }

    /// `$'...'` is decoded here and re-emitted as a single-quoted string
    fn read_ansi_c(&mut self, value: &mut String) -> Result<(), LexerError> {
        let (line, column) = (self.line, self.column);
        self.advance(); // $
        self.advance(); // '
        let mut raw = String::new();
        loop {
            match self.advance() {
                Some('\'') => break,
                Some('\\') => {
                    raw.push('\\');
                    if let Some(next) = self.advance() {
                        raw.push(next);
                    }
                }
                Some(c) => raw.push(c),
                None => {
                    return Err(LexerError::new(
                        "unexpected EOF while looking for matching `''",
                        line,
                        column,
                    ))
                }
            }
        }
        let decoded = decode_ansi_c(&raw);
        value.push('\'');
        value.push_str(&decoded.replace('\'', "'\\''"));
        value.push('\'');
        Ok(())
    }

    /// Copy a balanced region starting at the opening delimiter
    fn read_balanced(&mut self, value: &mut String, open: char, close: char) -> Result<(), LexerError> {
        let (line, column) = (self.line, self.column);
        let mut depth = 0usize;
        loop {
            let c = match self.current() {
                Some(c) => c,
                None => {
                    return Err(LexerError::new(
                        format!("unexpected EOF while looking for matching `{}'", close),
                        line,
                        column,
                    ))
                }
            };
            match c {
                '\\' => {
                    value.push(c);
                    self.advance();
                    if let Some(next) = self.advance() {
                        value.push(next);
                    }
                    continue;
                }
                '\'' if open != '{' || depth > 0 => {
                    self.read_single_quoted(value)?;
                    continue;
                }
                '"' => {
                    self.read_double_quoted(value)?;
                    continue;
                }
                '`' => {
                    self.read_backtick(value)?;
                    continue;
                }
                _ => {}
            }
            value.push(c);
            self.advance();
            if c == open {
                depth += 1;
            } else if c == close {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
        }
    }

    fn register_heredoc(&mut self, op_len: usize, strip_tabs: bool) {
        let mut i = self.pos + op_len;
        while matches!(self.input.get(i), Some(' ' | '\t')) {
            i += 1;
        }

        let mut delimiter = String::new();
        let mut quoted = false;
        while let Some(&c) = self.input.get(i) {
            if c.is_whitespace() || matches!(c, ';' | '<' | '>' | '&' | '|' | '(' | ')') {
                break;
            }
            if c == '\'' || c == '"' {
                quoted = true;
                i += 1;
                while let Some(&q) = self.input.get(i) {
                    if q == c {
                        break;
                    }
                    delimiter.push(q);
                    i += 1;
                }
                i += 1;
            } else if c == '\\' {
                quoted = true;
                if let Some(&next) = self.input.get(i + 1) {
                    delimiter.push(next);
                }
                i += 2;
            } else {
                delimiter.push(c);
                i += 1;
            }
        }

        if !delimiter.is_empty() {
            self.pending_heredocs.push(PendingHeredoc {
                delimiter,
                strip_tabs,
                quoted,
                token_index: self.tokens.len(),
                line: self.line,
            });
        }
    }

    fn read_heredoc_content(&mut self) -> Result<(), LexerError> {
        let pending: Vec<PendingHeredoc> = self.pending_heredocs.drain(..).collect();
        for heredoc in pending {
            let mut content = String::new();
            let mut terminated = false;

            while self.pos < self.input.len() {
                let mut line_content = String::new();
                while let Some(c) = self.current() {
                    if c == '\n' {
                        break;
                    }
                    line_content.push(c);
                    self.advance();
                }
                let had_newline = self.current() == Some('\n');
                if had_newline {
                    self.advance();
                }

                let line_to_check = if heredoc.strip_tabs {
                    line_content.trim_start_matches('\t')
                } else {
                    line_content.as_str()
                };
                if line_to_check == heredoc.delimiter {
                    terminated = true;
                    break;
                }
                content.push_str(line_to_check);
                if had_newline {
                    content.push('\n');
                }
            }

            if !terminated {
                return Err(LexerError::new(
                    format!("unterminated here-document, wanted `{}'", heredoc.delimiter),
                    heredoc.line,
                    1,
                ));
            }
            if let Some(token) = self.tokens.get_mut(heredoc.token_index) {
                token.heredoc = Some(HeredocBody {
                    content,
                    quoted: heredoc.quoted,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(input: &str) -> Vec<TokenType> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .iter()
            .map(|t| t.token_type)
            .collect()
    }

    #[test]
    fn test_simple_command() {
        let tokens = Lexer::new("echo hello world").tokenize().unwrap();
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[0].value, "echo");
        assert_eq!(tokens[2].value, "world");
        assert_eq!(tokens[3].token_type, TokenType::Eof);
    }

    #[test]
    fn test_longest_operator_first() {
        assert_eq!(
            types("a && b || c >> f"),
            vec![
                TokenType::Name,
                TokenType::AndAnd,
                TokenType::Name,
                TokenType::OrOr,
                TokenType::Name,
                TokenType::DGreat,
                TokenType::Name,
                TokenType::Eof
            ]
        );
        assert_eq!(types("a &>> f")[1], TokenType::AndDGreat);
        assert_eq!(types("a ;;& b")[1], TokenType::SemiSemiAnd);
    }

    #[test]
    fn test_quotes_kept_raw() {
        let tokens = Lexer::new("echo \"a b\" 'c d'").tokenize().unwrap();
        assert_eq!(tokens[1].value, "\"a b\"");
        assert!(tokens[1].quoted);
        assert_eq!(tokens[2].value, "'c d'");
    }

    #[test]
    fn test_unterminated_quote() {
        let err = Lexer::new("echo 'abc").tokenize().unwrap_err();
        assert!(err.message.contains("matching"));
        assert!(Lexer::new("echo \"abc").tokenize().is_err());
    }

    #[test]
    fn test_ansi_c_decoded() {
        let tokens = Lexer::new("echo $'a\\tb\\'c'").tokenize().unwrap();
        assert_eq!(tokens[1].value, "'a\tb'\\''c'");
    }

    #[test]
    fn test_heredoc_attached() {
        let tokens = Lexer::new("cat <<EOF\nhello\nEOF\necho done").tokenize().unwrap();
        let op = tokens.iter().find(|t| t.token_type == TokenType::DLess).unwrap();
        let body = op.heredoc.as_ref().unwrap();
        assert_eq!(body.content, "hello\n");
        assert!(!body.quoted);
        assert!(tokens.iter().any(|t| t.value == "done"));
    }

    #[test]
    fn test_heredoc_strip_tabs_and_quoted() {
        let tokens = Lexer::new("cat <<-'END'\n\t$x\n\tEND\n").tokenize().unwrap();
        let body = tokens[1].heredoc.as_ref().unwrap();
        assert_eq!(body.content, "$x\n");
        assert!(body.quoted);
    }

    #[test]
    fn test_unterminated_heredoc() {
        assert!(Lexer::new("cat <<EOF\nhello\n").tokenize().is_err());
    }

    #[test]
    fn test_assignment_and_reserved() {
        assert_eq!(types("FOO=bar")[0], TokenType::AssignmentWord);
        assert_eq!(types("arr=(a b c)")[0], TokenType::AssignmentWord);
        assert_eq!(types("if true")[0], TokenType::If);
        assert_eq!(types("'if'")[0], TokenType::Word);
    }

    #[test]
    fn test_io_number() {
        assert_eq!(types("cmd 2>&1")[1], TokenType::Number);
        assert_eq!(types("echo 2 > f")[1], TokenType::Word);
        assert_eq!(types("echo 2")[1], TokenType::Word);
    }

    #[test]
    fn test_arith_command_and_subshells() {
        let tokens = Lexer::new("(( x = 1 + 2 ))").tokenize().unwrap();
        assert_eq!(tokens[0].token_type, TokenType::ArithCommand);
        assert_eq!(tokens[0].value, " x = 1 + 2 ");
        assert_eq!(types("((echo a); echo b)")[0], TokenType::LParen);
    }

    #[test]
    fn test_nested_substitution_in_word() {
        let tokens = Lexer::new("echo $(echo \"a)b\") done").tokenize().unwrap();
        assert_eq!(tokens[1].value, "$(echo \"a)b\")");
        assert_eq!(tokens[2].token_type, TokenType::Done);
    }

    #[test]
    fn test_comment_skipped() {
        assert_eq!(types("echo hi # comment"), vec![TokenType::Name, TokenType::Name, TokenType::Eof]);
        assert_eq!(Lexer::new("echo a#b").tokenize().unwrap()[1].value, "a#b");
    }

    #[test]
    fn test_process_substitution_word() {
        let tokens = Lexer::new("diff <(ls) >(cat)").tokenize().unwrap();
        assert_eq!(tokens[1].value, "<(ls)");
        assert_eq!(tokens[2].value, ">(cat)");
    }

    #[test]
    fn test_numeric_range_glob_is_word() {
        let tokens = Lexer::new("ls file<1-10>.txt <->").tokenize().unwrap();
        assert_eq!(tokens[1].value, "file<1-10>.txt");
        assert_eq!(tokens[2].value, "<->");
        assert_eq!(tokens[2].token_type, TokenType::Word);
    }

    #[test]
    fn test_conditional_brackets() {
        let t = types("[[ $a == b ]]");
        assert_eq!(t[0], TokenType::DBrackStart);
        assert_eq!(t[4], TokenType::DBrackEnd);
    }
}

//! Arithmetic Expression Parser
//!
//! Parses the text of `$((...))`, `$[...]`, `((...))`, `let` arguments and
//! the three clauses of `for ((;;))` into an [`ArithExpr`] tree:
//! - $((1 + 2))
//! - $((x++))
//! - $((a ? b : c))
//! - $((2#1010)), $((0x1f)), $((017)), $((1.5 * 2))
//!
//! Parameter and command substitutions inside the text are expanded by the
//! interpreter before parsing, so only bare names reach this parser.

use thiserror::Error;

/// Syntax error inside an arithmetic expression
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ArithSyntaxError {
    pub message: String,
}

impl ArithSyntaxError {
    fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    fn bad_token(token: &str) -> Self {
        Self::new(format!("syntax error in expression (error token is \"{}\")", token))
    }
}

// =============================================================================
// EXPRESSION TREE
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ArithExpr {
    Int(i64),
    Float(f64),
    /// Variable reference, optionally subscripted: `x`, `a[i+1]`
    Variable { name: String, subscript: Option<String> },
    Unary { op: UnaryOp, operand: Box<ArithExpr> },
    Binary { op: BinaryOp, left: Box<ArithExpr>, right: Box<ArithExpr> },
    Ternary { condition: Box<ArithExpr>, then_expr: Box<ArithExpr>, else_expr: Box<ArithExpr> },
    Assign { op: AssignOp, name: String, subscript: Option<String>, value: Box<ArithExpr> },
    /// `++x`, `x--`, ...
    IncDec { name: String, subscript: Option<String>, delta: i64, prefix: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Shl,
    Shr,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitOr,
    BitXor,
    And,
    Or,
    Comma,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Compound(BinaryOp),
}

// =============================================================================
// TOKENIZER
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum ArithToken {
    Number(String),
    Ident { name: String, subscript: Option<String> },
    Op(&'static str),
}

/// Operators, longest first
const ARITH_OPS: &[&str] = &[
    "<<=", ">>=", "**=", "**", "<<", ">>", "<=", ">=", "==", "!=", "&&", "||", "++", "--", "+=", "-=", "*=", "/=",
    "%=", "&=", "|=", "^=", "+", "-", "*", "/", "%", "<", ">", "=", "!", "~", "&", "|", "^", "?", ":", ",", "(",
    ")",
];

fn tokenize(input: &str) -> Result<Vec<ArithToken>, ArithSyntaxError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() || (c == '\\' && chars.get(i + 1) == Some(&'\n')) {
            i += 1;
            continue;
        }

        if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).map_or(false, |d| d.is_ascii_digit())) {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || matches!(chars[i], '#' | '.' | '_' | '@')) {
                i += 1;
            }
            tokens.push(ArithToken::Number(chars[start..i].iter().collect()));
            continue;
        }

        if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let name: String = chars[start..i].iter().collect();
            let mut subscript = None;
            if chars.get(i) == Some(&'[') {
                let mut depth = 0;
                let sub_start = i + 1;
                let mut j = i;
                while j < chars.len() {
                    match chars[j] {
                        '[' => depth += 1,
                        ']' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    j += 1;
                }
                if j >= chars.len() {
                    return Err(ArithSyntaxError::new("unterminated array subscript"));
                }
                subscript = Some(chars[sub_start..j].iter().collect());
                i = j + 1;
            }
            tokens.push(ArithToken::Ident { name, subscript });
            continue;
        }

        let rest: String = chars[i..chars.len().min(i + 3)].iter().collect();
        match ARITH_OPS.iter().find(|op| rest.starts_with(*op)) {
            Some(&op) => {
                tokens.push(ArithToken::Op(op));
                i += op.chars().count();
            }
            None => return Err(ArithSyntaxError::bad_token(&chars[i..].iter().collect::<String>())),
        }
    }
    Ok(tokens)
}

/// Parse an integer literal: decimal, `0x` hex, leading-zero octal or `base#digits`
pub fn parse_int_literal(s: &str) -> Option<i64> {
    if let Some((base, digits)) = s.split_once('#') {
        let base: u32 = base.parse().ok()?;
        if !(2..=64).contains(&base) || digits.is_empty() {
            return None;
        }
        let mut value: i64 = 0;
        for ch in digits.chars() {
            let d = match ch {
                '0'..='9' => ch as u32 - '0' as u32,
                'a'..='z' => ch as u32 - 'a' as u32 + 10,
                'A'..='Z' if base <= 36 => ch as u32 - 'A' as u32 + 10,
                'A'..='Z' => ch as u32 - 'A' as u32 + 36,
                '@' => 62,
                '_' => 63,
                _ => return None,
            };
            if d >= base {
                return None;
            }
            value = value.wrapping_mul(base as i64).wrapping_add(d as i64);
        }
        return Some(value);
    }
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).ok();
    }
    if s.len() > 1 && s.starts_with('0') {
        return i64::from_str_radix(&s[1..], 8).ok();
    }
    s.parse().ok()
}

// =============================================================================
// PARSER
// =============================================================================

struct ArithParser {
    tokens: Vec<ArithToken>,
    pos: usize,
}

/// Parse arithmetic text. Empty input evaluates to 0.
pub fn parse_arithmetic(input: &str) -> Result<ArithExpr, ArithSyntaxError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Ok(ArithExpr::Int(0));
    }
    let mut parser = ArithParser { tokens, pos: 0 };
    let expr = parser.parse_comma()?;
    if let Some(token) = parser.peek() {
        return Err(ArithSyntaxError::bad_token(&token_text(token)));
    }
    Ok(expr)
}

fn token_text(token: &ArithToken) -> String {
    match token {
        ArithToken::Number(n) => n.clone(),
        ArithToken::Ident { name, .. } => name.clone(),
        ArithToken::Op(op) => op.to_string(),
    }
}

fn binary(op: BinaryOp, left: ArithExpr, right: ArithExpr) -> ArithExpr {
    ArithExpr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

impl ArithParser {
    fn peek(&self) -> Option<&ArithToken> {
        self.tokens.get(self.pos)
    }

    fn peek_op(&self) -> Option<&'static str> {
        match self.tokens.get(self.pos) {
            Some(ArithToken::Op(op)) => Some(op),
            _ => None,
        }
    }

    fn eat(&mut self, op: &str) -> bool {
        if self.peek_op() == Some(op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, op: &str) -> Result<(), ArithSyntaxError> {
        if self.eat(op) {
            return Ok(());
        }
        match self.peek() {
            Some(t) => Err(ArithSyntaxError::bad_token(&token_text(t))),
            None => Err(ArithSyntaxError::new(format!("syntax error: `{}' expected", op))),
        }
    }

    fn parse_comma(&mut self) -> Result<ArithExpr, ArithSyntaxError> {
        let mut left = self.parse_assignment()?;
        while self.eat(",") {
            let right = self.parse_assignment()?;
            left = binary(BinaryOp::Comma, left, right);
        }
        Ok(left)
    }

    fn parse_assignment(&mut self) -> Result<ArithExpr, ArithSyntaxError> {
        let left = self.parse_ternary()?;
        let op = match self.peek_op() {
            Some("=") => AssignOp::Assign,
            Some("+=") => AssignOp::Compound(BinaryOp::Add),
            Some("-=") => AssignOp::Compound(BinaryOp::Sub),
            Some("*=") => AssignOp::Compound(BinaryOp::Mul),
            Some("/=") => AssignOp::Compound(BinaryOp::Div),
            Some("%=") => AssignOp::Compound(BinaryOp::Mod),
            Some("**=") => AssignOp::Compound(BinaryOp::Pow),
            Some("<<=") => AssignOp::Compound(BinaryOp::Shl),
            Some(">>=") => AssignOp::Compound(BinaryOp::Shr),
            Some("&=") => AssignOp::Compound(BinaryOp::BitAnd),
            Some("|=") => AssignOp::Compound(BinaryOp::BitOr),
            Some("^=") => AssignOp::Compound(BinaryOp::BitXor),
            _ => return Ok(left),
        };
        let (name, subscript) = match left {
            ArithExpr::Variable { name, subscript } => (name, subscript),
            _ => return Err(ArithSyntaxError::new("attempted assignment to non-variable")),
        };
        self.pos += 1;
        let value = self.parse_assignment()?;
        Ok(ArithExpr::Assign {
            op,
            name,
            subscript,
            value: Box::new(value),
        })
    }

    fn parse_ternary(&mut self) -> Result<ArithExpr, ArithSyntaxError> {
        let condition = self.parse_binary(0)?;
        if !self.eat("?") {
            return Ok(condition);
        }
        let then_expr = self.parse_assignment()?;
        self.expect(":")?;
        let else_expr = self.parse_assignment()?;
        Ok(ArithExpr::Ternary {
            condition: Box::new(condition),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        })
    }

    /// Precedence climbing over the left-associative binary levels
    fn parse_binary(&mut self, level: usize) -> Result<ArithExpr, ArithSyntaxError> {
        const LEVELS: &[&[(&str, BinaryOp)]] = &[
            &[("||", BinaryOp::Or)],
            &[("&&", BinaryOp::And)],
            &[("|", BinaryOp::BitOr)],
            &[("^", BinaryOp::BitXor)],
            &[("&", BinaryOp::BitAnd)],
            &[("==", BinaryOp::Eq), ("!=", BinaryOp::Ne)],
            &[("<=", BinaryOp::Le), (">=", BinaryOp::Ge), ("<", BinaryOp::Lt), (">", BinaryOp::Gt)],
            &[("<<", BinaryOp::Shl), (">>", BinaryOp::Shr)],
            &[("+", BinaryOp::Add), ("-", BinaryOp::Sub)],
            &[("*", BinaryOp::Mul), ("/", BinaryOp::Div), ("%", BinaryOp::Mod)],
        ];
        if level >= LEVELS.len() {
            return self.parse_power();
        }
        let mut left = self.parse_binary(level + 1)?;
        'outer: loop {
            let current = self.peek_op();
            for (text, op) in LEVELS[level] {
                if current == Some(*text) {
                    self.pos += 1;
                    let right = self.parse_binary(level + 1)?;
                    left = binary(*op, left, right);
                    continue 'outer;
                }
            }
            return Ok(left);
        }
    }

    /// `**` is right-associative and binds tighter than unary minus on its left
    fn parse_power(&mut self) -> Result<ArithExpr, ArithSyntaxError> {
        let base = self.parse_unary()?;
        if self.eat("**") {
            let exponent = self.parse_power()?;
            return Ok(binary(BinaryOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn parse_unary(&mut self) -> Result<ArithExpr, ArithSyntaxError> {
        let op = match self.peek_op() {
            Some("-") => UnaryOp::Neg,
            Some("+") => UnaryOp::Plus,
            Some("!") => UnaryOp::Not,
            Some("~") => UnaryOp::BitNot,
            Some(inc @ ("++" | "--")) => {
                self.pos += 1;
                let delta = if inc == "++" { 1 } else { -1 };
                return match self.tokens.get(self.pos).cloned() {
                    Some(ArithToken::Ident { name, subscript }) => {
                        self.pos += 1;
                        Ok(ArithExpr::IncDec { name, subscript, delta, prefix: true })
                    }
                    // `--5` is double negation
                    _ => {
                        let operand = self.parse_unary()?;
                        let op = if delta > 0 { UnaryOp::Plus } else { UnaryOp::Neg };
                        let inner = ArithExpr::Unary { op, operand: Box::new(operand) };
                        Ok(ArithExpr::Unary { op, operand: Box::new(inner) })
                    }
                };
            }
            _ => return self.parse_postfix(),
        };
        self.pos += 1;
        let operand = self.parse_unary()?;
        Ok(ArithExpr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_postfix(&mut self) -> Result<ArithExpr, ArithSyntaxError> {
        let primary = self.parse_primary()?;
        if let ArithExpr::Variable { name, subscript } = &primary {
            for (text, delta) in [("++", 1), ("--", -1)] {
                if self.peek_op() == Some(text) {
                    self.pos += 1;
                    return Ok(ArithExpr::IncDec {
                        name: name.clone(),
                        subscript: subscript.clone(),
                        delta,
                        prefix: false,
                    });
                }
            }
        }
        Ok(primary)
    }

    fn parse_primary(&mut self) -> Result<ArithExpr, ArithSyntaxError> {
        let token = match self.tokens.get(self.pos).cloned() {
            Some(t) => t,
            None => return Err(ArithSyntaxError::new("syntax error: operand expected")),
        };
        self.pos += 1;
        match token {
            ArithToken::Number(text) => {
                if let Some(n) = parse_int_literal(&text) {
                    return Ok(ArithExpr::Int(n));
                }
                if text.contains('.') {
                    if let Ok(f) = text.parse::<f64>() {
                        return Ok(ArithExpr::Float(f));
                    }
                }
                Err(ArithSyntaxError::new(format!(
                    "{}: value too great for base (error token is \"{}\")",
                    text, text
                )))
            }
            ArithToken::Ident { name, subscript } => Ok(ArithExpr::Variable { name, subscript }),
            ArithToken::Op("(") => {
                let inner = self.parse_comma()?;
                self.expect(")")?;
                Ok(inner)
            }
            ArithToken::Op(op) => Err(ArithSyntaxError::bad_token(op)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence() {
        let expr = parse_arithmetic("2+3*4").unwrap();
        assert_eq!(
            expr,
            binary(
                BinaryOp::Add,
                ArithExpr::Int(2),
                binary(BinaryOp::Mul, ArithExpr::Int(3), ArithExpr::Int(4))
            )
        );
    }

    #[test]
    fn test_literals() {
        assert_eq!(parse_int_literal("0x1f"), Some(31));
        assert_eq!(parse_int_literal("017"), Some(15));
        assert_eq!(parse_int_literal("2#1010"), Some(10));
        assert_eq!(parse_int_literal("36#z"), Some(35));
        assert_eq!(parse_int_literal("08"), None);
        assert_eq!(parse_arithmetic("1.5").unwrap(), ArithExpr::Float(1.5));
    }

    #[test]
    fn test_assignment_is_right_associative() {
        match parse_arithmetic("a = b += 2").unwrap() {
            ArithExpr::Assign { name, value, .. } => {
                assert_eq!(name, "a");
                assert!(matches!(*value, ArithExpr::Assign { .. }));
            }
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn test_increments() {
        assert!(matches!(
            parse_arithmetic("x++").unwrap(),
            ArithExpr::IncDec { prefix: false, delta: 1, .. }
        ));
        assert!(matches!(
            parse_arithmetic("--x").unwrap(),
            ArithExpr::IncDec { prefix: true, delta: -1, .. }
        ));
    }

    #[test]
    fn test_subscript_and_ternary() {
        match parse_arithmetic("a[i+1] > 0 ? 1 : 2").unwrap() {
            ArithExpr::Ternary { condition, .. } => match *condition {
                ArithExpr::Binary { left, .. } => assert_eq!(
                    *left,
                    ArithExpr::Variable {
                        name: "a".to_string(),
                        subscript: Some("i+1".to_string())
                    }
                ),
                other => panic!("{:?}", other),
            },
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn test_power_right_assoc() {
        assert_eq!(
            parse_arithmetic("2**3**2").unwrap(),
            binary(
                BinaryOp::Pow,
                ArithExpr::Int(2),
                binary(BinaryOp::Pow, ArithExpr::Int(3), ArithExpr::Int(2))
            )
        );
    }

    #[test]
    fn test_errors() {
        assert!(parse_arithmetic("1 +").is_err());
        assert!(parse_arithmetic("(1").is_err());
        assert!(parse_arithmetic("1 2").is_err());
        assert!(parse_arithmetic("3 = 4").is_err());
        assert_eq!(parse_arithmetic("  ").unwrap(), ArithExpr::Int(0));
    }
}

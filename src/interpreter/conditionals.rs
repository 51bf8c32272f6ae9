//! Conditional Expression Evaluation
//!
//! Handles:
//! - [[ ... ]] conditional commands
//! - [ ... ] and test commands
//! - File tests (-f, -d, -e, etc.)
//! - String tests (-z, -n, =, !=, <, >)
//! - Numeric comparisons (-eq, -ne, -lt, etc.)
//! - Pattern matching (==, !=) and regex matching (=~)
//!
//! `[[ ]]` works on unexpanded words: operators are recognised by their
//! literal text, operands are expanded without splitting or globbing, and
//! `&&`/`||` short-circuit so the skipped side is never expanded.
//! `test` follows the POSIX rules that pick a meaning from the argument
//! count, falling back to a precedence parser for longer expressions.

use crate::ast::types::{ConditionalCommandNode, WordNode, WordPart};
use crate::interpreter::assoc_arrays::ShellArray;
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::helpers::file_tests::{evaluate_file_comparison, evaluate_file_test, FileTestOperator};
use crate::interpreter::types::{ExecResult, ShellContext};
use crate::interpreter::word_expansion::{
    compile_pattern, evaluate_arithmetic_text, expand_pattern, expand_word_string,
};

const UNARY_OPERATORS: &[&str] = &[
    "-a", "-b", "-c", "-d", "-e", "-f", "-g", "-h", "-k", "-n", "-o", "-p", "-r", "-s", "-t", "-u", "-v", "-w",
    "-x", "-z", "-G", "-L", "-O", "-S",
];

const NUMERIC_OPERATORS: &[&str] = &["-eq", "-ne", "-lt", "-le", "-gt", "-ge"];

const FILE_COMPARISONS: &[&str] = &["-nt", "-ot", "-ef"];

pub fn is_unary_operator(op: &str) -> bool {
    UNARY_OPERATORS.contains(&op)
}

/// Binary operators shared by `test` and `[[ ]]`
pub fn is_binary_operator(op: &str) -> bool {
    matches!(op, "=" | "==" | "!=" | "<" | ">")
        || NUMERIC_OPERATORS.contains(&op)
        || FILE_COMPARISONS.contains(&op)
}

fn option_is_set(ctx: &ShellContext, name: &str) -> bool {
    ctx.options.get(name).unwrap_or_else(|| ctx.zsh_opt(name))
}

/// Evaluate a unary test on an expanded operand
pub fn unary_test(ctx: &ShellContext, op: &str, operand: &str) -> bool {
    match op {
        "-z" => operand.is_empty(),
        "-n" => !operand.is_empty(),
        "-v" => ctx.is_set(operand),
        "-o" => option_is_set(ctx, operand),
        // SAFETY: isatty only inspects the descriptor
        "-t" => operand.trim().parse::<i32>().map_or(false, |fd| unsafe { libc::isatty(fd) == 1 }),
        _ => match FileTestOperator::parse(op) {
            Some(file_op) if !operand.is_empty() => evaluate_file_test(file_op, &ctx.resolve_path(operand)),
            _ => false,
        },
    }
}

fn compare_integers(op: &str, left: i64, right: i64) -> bool {
    match op {
        "-eq" => left == right,
        "-ne" => left != right,
        "-lt" => left < right,
        "-le" => left <= right,
        "-gt" => left > right,
        _ => left >= right,
    }
}

fn compare_files(ctx: &ShellContext, op: &str, left: &str, right: &str) -> bool {
    evaluate_file_comparison(op, &ctx.resolve_path(left), &ctx.resolve_path(right)).unwrap_or(false)
}

// ============================================================================
// test / [
// ============================================================================

fn parse_integer(text: &str) -> Result<i64, String> {
    text.trim()
        .parse::<i64>()
        .map_err(|_| format!("integer expression expected: {}", text))
}

/// Binary test with literal string comparison and integer operands
fn test_binary(ctx: &ShellContext, left: &str, op: &str, right: &str) -> Result<bool, String> {
    Ok(match op {
        "=" | "==" => left == right,
        "!=" => left != right,
        "<" => left < right,
        ">" => left > right,
        "-a" => !left.is_empty() && !right.is_empty(),
        "-o" => !left.is_empty() || !right.is_empty(),
        op if NUMERIC_OPERATORS.contains(&op) => compare_integers(op, parse_integer(left)?, parse_integer(right)?),
        op if FILE_COMPARISONS.contains(&op) => compare_files(ctx, op, left, right),
        op => return Err(format!("unknown condition: {}", op)),
    })
}

/// Evaluate `test` arguments. Err carries a message for status 2.
pub fn evaluate_test(ctx: &ShellContext, args: &[String]) -> Result<bool, String> {
    let a: Vec<&str> = args.iter().map(String::as_str).collect();
    match a.as_slice() {
        [] => Ok(false),
        [x] => Ok(!x.is_empty()),
        ["!", x] => Ok(x.is_empty()),
        [op, x] if is_unary_operator(op) => Ok(unary_test(ctx, op, x)),
        [op, _] => Err(format!("unknown condition: {}", op)),
        [l, op, r] if is_binary_operator(op) || matches!(*op, "-a" | "-o") => test_binary(ctx, l, op, r),
        ["!", _, _] => evaluate_test(ctx, &args[1..]).map(|b| !b),
        ["(", x, ")"] => Ok(!x.is_empty()),
        ["!", _, _, _] => evaluate_test(ctx, &args[1..]).map(|b| !b),
        ["(", _, _, ")"] => evaluate_test(ctx, &args[1..3]),
        _ => {
            let mut parser = TestParser { ctx, args: &a, pos: 0 };
            let value = parser.parse_or()?;
            match parser.args.get(parser.pos) {
                None => Ok(value),
                Some(extra) => Err(format!("too many arguments: {}", extra)),
            }
        }
    }
}

/// Precedence parser for long `test` expressions: `!` > `-a` > `-o`
struct TestParser<'a> {
    ctx: &'a ShellContext,
    args: &'a [&'a str],
    pos: usize,
}

impl<'a> TestParser<'a> {
    fn peek(&self, offset: usize) -> Option<&'a str> {
        self.args.get(self.pos + offset).copied()
    }

    fn next(&mut self) -> Result<&'a str, String> {
        let arg = self.args.get(self.pos).copied().ok_or_else(|| "argument expected".to_string())?;
        self.pos += 1;
        Ok(arg)
    }

    fn parse_or(&mut self) -> Result<bool, String> {
        let mut value = self.parse_and()?;
        while self.peek(0) == Some("-o") {
            self.pos += 1;
            let rhs = self.parse_and()?;
            value = value || rhs;
        }
        Ok(value)
    }

    fn parse_and(&mut self) -> Result<bool, String> {
        let mut value = self.parse_not()?;
        while self.peek(0) == Some("-a") {
            self.pos += 1;
            let rhs = self.parse_not()?;
            value = value && rhs;
        }
        Ok(value)
    }

    fn parse_not(&mut self) -> Result<bool, String> {
        if self.peek(0) == Some("!") {
            self.pos += 1;
            return self.parse_not().map(|b| !b);
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<bool, String> {
        if self.peek(0) == Some("(") {
            self.pos += 1;
            let value = self.parse_or()?;
            if self.next()? != ")" {
                return Err("')' expected".to_string());
            }
            return Ok(value);
        }
        if let (Some(op), Some(_)) = (self.peek(0), self.peek(1)) {
            if is_unary_operator(op) && !self.peek(2).map_or(false, is_binary_operator) {
                self.pos += 1;
                let operand = self.next()?;
                return Ok(unary_test(self.ctx, op, operand));
            }
        }
        let left = self.next()?;
        if let Some(op) = self.peek(0) {
            if is_binary_operator(op) {
                self.pos += 1;
                let right = self.next()?;
                return test_binary(self.ctx, left, op, right);
            }
        }
        Ok(!left.is_empty())
    }
}

// ============================================================================
// [[ ]]
// ============================================================================

enum CondError {
    /// Malformed expression; status 2
    Syntax(String),
    Shell(InterpreterError),
}

impl From<InterpreterError> for CondError {
    fn from(e: InterpreterError) -> Self {
        CondError::Shell(e)
    }
}

/// Literal text of a word that can act as an operator
fn operator_text(word: &WordNode) -> Option<&str> {
    match word.parts.as_slice() {
        [WordPart::Literal(s)] => Some(s.as_str()),
        _ => None,
    }
}

struct CondParser<'a> {
    ctx: &'a mut ShellContext,
    words: &'a [WordNode],
    pos: usize,
}

impl CondParser<'_> {
    fn peek_op(&self, offset: usize) -> Option<&str> {
        self.words.get(self.pos + offset).and_then(operator_text)
    }

    fn at_end_of_operand(&self, offset: usize) -> bool {
        match self.words.get(self.pos + offset) {
            None => true,
            Some(word) => matches!(operator_text(word), Some("&&" | "||" | ")")),
        }
    }

    fn next_word(&mut self) -> Result<&WordNode, CondError> {
        let word = self
            .words
            .get(self.pos)
            .ok_or_else(|| CondError::Syntax("condition expected".to_string()))?;
        self.pos += 1;
        Ok(word)
    }

    fn operand(&mut self, eval: bool) -> Result<String, CondError> {
        let word = self.next_word()?.clone();
        if !eval {
            return Ok(String::new());
        }
        Ok(expand_word_string(self.ctx, &word)?)
    }

    fn parse_or(&mut self, eval: bool) -> Result<bool, CondError> {
        let mut value = self.parse_and(eval)?;
        while self.peek_op(0) == Some("||") {
            self.pos += 1;
            let rhs = self.parse_and(eval && !value)?;
            value = value || rhs;
        }
        Ok(value)
    }

    fn parse_and(&mut self, eval: bool) -> Result<bool, CondError> {
        let mut value = self.parse_not(eval)?;
        while self.peek_op(0) == Some("&&") {
            self.pos += 1;
            let rhs = self.parse_not(eval && value)?;
            value = value && rhs;
        }
        Ok(value)
    }

    fn parse_not(&mut self, eval: bool) -> Result<bool, CondError> {
        if self.peek_op(0) == Some("!") && !self.at_end_of_operand(1) {
            self.pos += 1;
            return Ok(!self.parse_not(eval)?);
        }
        self.parse_primary(eval)
    }

    fn parse_primary(&mut self, eval: bool) -> Result<bool, CondError> {
        if self.peek_op(0) == Some("(") {
            self.pos += 1;
            let value = self.parse_or(eval)?;
            if self.peek_op(0) != Some(")") {
                return Err(CondError::Syntax("')' expected".to_string()));
            }
            self.pos += 1;
            return Ok(value);
        }

        if let Some(op) = self.peek_op(0) {
            if is_unary_operator(op) && !self.at_end_of_operand(1) {
                let op = op.to_string();
                self.pos += 1;
                let operand = self.operand(eval)?;
                return Ok(eval && unary_test(self.ctx, &op, &operand));
            }
        }

        let left = self.operand(eval)?;
        let op = match self.peek_op(0) {
            Some(op) if is_binary_operator(op) || op == "=~" => op.to_string(),
            _ => return Ok(!left.is_empty()),
        };
        self.pos += 1;
        let right_word = self.next_word()?.clone();
        if !eval {
            return Ok(false);
        }
        self.binary(&left, &op, &right_word)
    }

    fn binary(&mut self, left: &str, op: &str, right_word: &WordNode) -> Result<bool, CondError> {
        match op {
            "=" | "==" | "!=" => {
                let pattern = expand_pattern(self.ctx, right_word)?;
                let matched = compile_pattern(self.ctx, &pattern).matches(left);
                Ok(matched == (op != "!="))
            }
            "=~" => self.regex_match(left, right_word),
            "<" | ">" => {
                let right = expand_word_string(self.ctx, right_word)?;
                Ok(if op == "<" { left < right.as_str() } else { left > right.as_str() })
            }
            op if NUMERIC_OPERATORS.contains(&op) => {
                let right = expand_word_string(self.ctx, right_word)?;
                let l = evaluate_arithmetic_text(self.ctx, left)?.as_int();
                let r = evaluate_arithmetic_text(self.ctx, &right)?.as_int();
                Ok(compare_integers(op, l, r))
            }
            op => {
                let right = expand_word_string(self.ctx, right_word)?;
                Ok(compare_files(self.ctx, op, left, &right))
            }
        }
    }

    /// `=~`: quoted parts of the pattern match literally. Captures land in
    /// `MATCH`/`match` and `BASH_REMATCH`.
    fn regex_match(&mut self, left: &str, right_word: &WordNode) -> Result<bool, CondError> {
        let pattern = regex_pattern(self.ctx, right_word)?;
        let re = regex_lite::Regex::new(&pattern)
            .map_err(|e| CondError::Syntax(format!("failed to compile regex: {}", e)))?;
        let Some(caps) = re.captures(left) else {
            return Ok(false);
        };
        let groups: Vec<String> = (0..caps.len())
            .map(|i| caps.get(i).map_or(String::new(), |m| m.as_str().to_string()))
            .collect();
        self.ctx.set_var("MATCH", groups[0].clone());
        self.ctx.set_array("match", ShellArray::from_values(groups[1..].to_vec()))?;
        self.ctx.set_array("BASH_REMATCH", ShellArray::from_values(groups))?;
        Ok(true)
    }
}

fn regex_pattern(ctx: &mut ShellContext, word: &WordNode) -> Result<String, InterpreterError> {
    let mut pattern = String::new();
    for part in &word.parts {
        match part {
            WordPart::Literal(s) => pattern.push_str(s),
            WordPart::SingleQuoted(s) | WordPart::Escaped(s) => pattern.push_str(&regex_lite::escape(s)),
            WordPart::DoubleQuoted(inner) => {
                let text = expand_word_string(ctx, &WordNode { parts: inner.clone() })?;
                pattern.push_str(&regex_lite::escape(&text));
            }
            other => {
                let text = expand_word_string(ctx, &WordNode { parts: vec![other.clone()] })?;
                pattern.push_str(&text);
            }
        }
    }
    Ok(pattern)
}

/// Execute `[[ expr ]]`
pub fn execute_conditional_command(
    ctx: &mut ShellContext,
    node: &ConditionalCommandNode,
) -> Result<ExecResult, InterpreterError> {
    if node.line > 0 {
        ctx.current_line = node.line;
    }
    let mut parser = CondParser { ctx, words: &node.words, pos: 0 };
    let outcome = parser.parse_or(true);
    let trailing = parser.pos < node.words.len();
    match outcome {
        Ok(_) if trailing => Ok(ExecResult::failure_with_code(
            "zshell: parse error in conditional expression\n",
            2,
        )),
        Ok(value) => Ok(ExecResult::new(String::new(), String::new(), if value { 0 } else { 1 })),
        Err(CondError::Syntax(msg)) => Ok(ExecResult::failure_with_code(format!("zshell: {}\n", msg), 2)),
        Err(CondError::Shell(e)) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::execution_engine::ExecutionEngine;
    use crate::parser::parse;

    fn run(script: &str) -> ExecResult {
        let mut ctx = ShellContext::new(std::env::temp_dir(), std::env::vars().collect());
        let ast = parse(script).unwrap();
        ExecutionEngine.run_isolated(&mut ctx, &ast)
    }

    fn test_args(args: &[&str]) -> Result<bool, String> {
        let ctx = ShellContext::default();
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        evaluate_test(&ctx, &args)
    }

    #[test]
    fn test_argument_count_rules() {
        assert_eq!(test_args(&[]), Ok(false));
        assert_eq!(test_args(&["x"]), Ok(true));
        assert_eq!(test_args(&[""]), Ok(false));
        assert_eq!(test_args(&["-n"]), Ok(true));
        assert_eq!(test_args(&["!", ""]), Ok(true));
        assert_eq!(test_args(&["-z", ""]), Ok(true));
        assert_eq!(test_args(&["a", "=", "a"]), Ok(true));
        assert_eq!(test_args(&["!", "a", "=", "b"]), Ok(true));
        assert_eq!(test_args(&["(", "x", ")"]), Ok(true));
        assert_eq!(test_args(&["3", "-lt", "10"]), Ok(true));
        assert!(test_args(&["a", "-eq", "1"]).is_err());
    }

    #[test]
    fn test_long_expressions() {
        assert_eq!(test_args(&["a", "=", "a", "-a", "b", "=", "c"]), Ok(false));
        assert_eq!(test_args(&["a", "=", "a", "-o", "b", "=", "c"]), Ok(true));
        assert_eq!(test_args(&["!", "(", "1", "-gt", "2", ")", "-a", "x"]), Ok(true));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_double_bracket_patterns() {
        assert_eq!(run("[[ foobar == foo* ]]").exit_code, 0);
        assert_eq!(run("[[ foobar == 'foo*' ]]").exit_code, 1);
        assert_eq!(run("[[ abc != a?d ]]").exit_code, 0);
        assert_eq!(run("x='a b'; [[ $x == 'a b' ]]").exit_code, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_double_bracket_regex_captures() {
        let r = run("[[ 'key=val' =~ ^([a-z]+)=(.*)$ ]] && echo ${match[1]} ${BASH_REMATCH[2]} $MATCH");
        assert_eq!(r.stdout, "key val key=val\n");
        assert_eq!(run("[[ a.c =~ 'a.c' ]] && [[ abc =~ 'a.c' ]]").exit_code, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_double_bracket_logic_short_circuits() {
        let r = run("[[ -n '' && $(echo called >&2) == x ]]; echo $?");
        assert_eq!(r.stdout, "1\n");
        assert_eq!(r.stderr, "");
        assert_eq!(run("[[ ! ( 1 -gt 2 ) || x == y ]]").exit_code, 0);
        assert_eq!(run("[[ 2+3 -eq 5 ]]").exit_code, 0);
        assert_eq!(run("[[ apple < banana ]]").exit_code, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_file_operators() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f"), "x").unwrap();
        let mut ctx = ShellContext::new(dir.path().to_path_buf(), std::env::vars().collect());
        let ast = parse("[[ -f f && -d . && ! -e missing ]] && [ -s f ] && echo ok").unwrap();
        let r = ExecutionEngine.run_isolated(&mut ctx, &ast);
        assert_eq!(r.stdout, "ok\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_option_test() {
        assert_eq!(run("set -o errexit; [[ -o errexit ]]").exit_code, 0);
        assert_eq!(run("[[ -o errexit ]]").exit_code, 1);
    }
}

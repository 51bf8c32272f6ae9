//! Recursive Descent Parser for Shell Scripts
//!
//! This parser consumes tokens from the lexer and produces an AST.
//!
//! Grammar (simplified, loosest binding first):
//!   script       ::= list EOF
//!   list         ::= statement ((';' | '&' | NEWLINE) statement)*
//!   statement    ::= pipeline (('&&' | '||') NEWLINE* pipeline)* ['&']
//!   pipeline     ::= ['!'] command (('|' | '|&') NEWLINE* command)*
//!   command      ::= compound_cmd redirection* | function_def | simple_cmd
//!   simple_cmd   ::= (assignment | redirection)* [word] (word | redirection)*
//!   compound_cmd ::= if | for | while | until | case | ( list ) | { list } | (( expr )) | [[ expr ]]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::ast::types::{
    ArrayElement, AssignmentNode, CommandNode, CompoundCommandNode, FunctionDefNode, GroupNode, HereDocNode, PipelineNode,
    RedirectionNode, RedirectionOperator, RedirectionTarget, ScriptNode, SimpleCommandNode,
    StatementNode, StatementOperator, WordNode, WordPart, AST,
};
use crate::parser::lexer::{find_assignment_eq, Lexer, Token, TokenType};
use crate::parser::types::{is_redirection_token, ParseException, MAX_INPUT_SIZE, MAX_PARSER_DEPTH, MAX_TOKENS};
use crate::parser::word_parser::{parse_assignment_value, parse_heredoc_content, parse_word};

/// Commands whose `NAME=value` arguments are assignments rather than words
pub const DECLARATION_COMMANDS: &[&str] = &["local", "typeset", "declare", "export", "readonly", "integer"];

/// Main parser struct
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) pos: usize,
    pub(crate) depth: usize,
    /// Nesting of `{ ... }` groups; a bare `}` closes the group inside one
    pub(crate) brace_depth: usize,
    source: Vec<char>,
    aliases: HashMap<String, String>,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a script into an AST
pub fn parse(input: &str) -> Result<ScriptNode, ParseException> {
    Parser::new().parse(input)
}

impl Parser {
    pub fn new() -> Self {
        Self {
            tokens: Vec::new(),
            pos: 0,
            depth: 0,
            brace_depth: 0,
            source: Vec::new(),
            aliases: HashMap::new(),
        }
    }

    /// Expand these aliases in command position while parsing
    pub fn with_aliases(mut self, aliases: HashMap<String, String>) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn parse(&mut self, input: &str) -> Result<ScriptNode, ParseException> {
        if input.len() > MAX_INPUT_SIZE {
            return Err(ParseException::new("input too large", 1, 1));
        }
        self.tokens = Lexer::new(input).tokenize()?;
        if self.tokens.len() > MAX_TOKENS {
            return Err(ParseException::new("too many tokens", 1, 1));
        }
        self.source = input.chars().collect();
        self.pos = 0;
        self.depth = 0;
        self.brace_depth = 0;

        let statements = self.parse_statement_list(&[TokenType::Eof])?;
        if !self.check(TokenType::Eof) {
            return Err(ParseException::unexpected(self.current()));
        }
        Ok(AST::script(statements))
    }

    // =========================================================================
    // TOKEN HELPERS
    // =========================================================================

    pub(crate) fn current(&self) -> &Token {
        let idx = self.pos.min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    pub(crate) fn peek(&self, offset: usize) -> &Token {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    pub(crate) fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    pub(crate) fn check(&self, token_type: TokenType) -> bool {
        self.current().token_type == token_type
    }

    pub(crate) fn expect(&mut self, token_type: TokenType) -> Result<Token, ParseException> {
        if self.check(token_type) {
            Ok(self.advance())
        } else {
            Err(ParseException::unexpected(self.current()))
        }
    }

    pub(crate) fn skip_newlines(&mut self) {
        while self.check(TokenType::Newline) {
            self.advance();
        }
    }

    /// Skip newlines and `;` separating a header from its keyword (`for x in a; do`)
    pub(crate) fn skip_separators(&mut self) {
        while self.check(TokenType::Newline) || self.check(TokenType::Semicolon) {
            self.advance();
        }
    }

    pub(crate) fn enter(&mut self) -> Result<(), ParseException> {
        self.depth += 1;
        if self.depth > MAX_PARSER_DEPTH {
            let t = self.current();
            return Err(ParseException::new("maximum nesting depth exceeded", t.line, t.column));
        }
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.depth -= 1;
    }

    fn source_text(&self, start: usize, end: usize) -> String {
        let end = end.min(self.source.len());
        if start >= end {
            return String::new();
        }
        self.source[start..end].iter().collect::<String>().trim().to_string()
    }

    // =========================================================================
    // LISTS AND STATEMENTS
    // =========================================================================

    /// Parse statements until one of `terminators` is the current token
    pub(crate) fn parse_statement_list(&mut self, terminators: &[TokenType]) -> Result<Vec<StatementNode>, ParseException> {
        let mut statements = Vec::new();
        loop {
            self.skip_newlines();
            let tt = self.current().token_type;
            if terminators.contains(&tt) || tt == TokenType::Eof {
                break;
            }
            if self.brace_depth > 0 && tt == TokenType::RBrace && terminators.contains(&TokenType::RBrace) {
                break;
            }
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    fn parse_statement(&mut self) -> Result<StatementNode, ParseException> {
        let first = self.current().clone();
        let mut pipelines = vec![self.parse_pipeline()?];
        let mut operators = Vec::new();

        loop {
            let op = match self.current().token_type {
                TokenType::AndAnd => StatementOperator::And,
                TokenType::OrOr => StatementOperator::Or,
                _ => break,
            };
            self.advance();
            self.skip_newlines();
            operators.push(op);
            pipelines.push(self.parse_pipeline()?);
        }

        let end = self.tokens[self.pos.saturating_sub(1)].end;
        let mut background = false;
        match self.current().token_type {
            TokenType::Amp => {
                self.advance();
                background = true;
            }
            TokenType::Semicolon => {
                self.advance();
            }
            TokenType::Newline
            | TokenType::Eof
            | TokenType::RParen
            | TokenType::RBrace
            | TokenType::DSemi
            | TokenType::SemiAnd
            | TokenType::SemiSemiAnd => {}
            tt if tt.is_reserved_word() => {}
            _ => return Err(ParseException::unexpected(self.current())),
        }

        Ok(AST::statement(
            pipelines,
            operators,
            background,
            self.source_text(first.start, end),
            first.line,
        ))
    }

    fn parse_pipeline(&mut self) -> Result<PipelineNode, ParseException> {
        let mut negated = false;
        while self.check(TokenType::Bang) {
            self.advance();
            negated = !negated;
        }

        let mut commands = vec![self.parse_command()?];
        let mut pipe_stderr = Vec::new();
        while self.check(TokenType::Pipe) || self.check(TokenType::PipeAmp) {
            pipe_stderr.push(self.check(TokenType::PipeAmp));
            self.advance();
            self.skip_newlines();
            commands.push(self.parse_command()?);
        }
        Ok(AST::pipeline(commands, negated, pipe_stderr))
    }

    // =========================================================================
    // COMMANDS
    // =========================================================================

    pub(crate) fn parse_command(&mut self) -> Result<CommandNode, ParseException> {
        match self.current().token_type {
            TokenType::If
            | TokenType::For
            | TokenType::While
            | TokenType::Until
            | TokenType::Case
            | TokenType::LParen
            | TokenType::LBrace
            | TokenType::ArithCommand
            | TokenType::DBrackStart => {
                let compound = self.parse_compound_command()?;
                Ok(CommandNode::Compound(compound))
            }
            TokenType::Function => self.parse_function_keyword(),
            TokenType::Name | TokenType::Word
                if self.peek(1).token_type == TokenType::LParen
                    && self.peek(2).token_type == TokenType::RParen
                    && !self.current().quoted =>
            {
                self.parse_function_def()
            }
            tt if tt.is_reserved_word() => Err(ParseException::unexpected(self.current())),
            TokenType::Eof
            | TokenType::Newline
            | TokenType::Semicolon
            | TokenType::Amp
            | TokenType::Pipe
            | TokenType::PipeAmp
            | TokenType::AndAnd
            | TokenType::OrOr
            | TokenType::RParen
            | TokenType::DSemi
            | TokenType::SemiAnd
            | TokenType::SemiSemiAnd => Err(ParseException::unexpected(self.current())),
            TokenType::RBrace if self.brace_depth > 0 => Err(ParseException::unexpected(self.current())),
            _ => Ok(CommandNode::Simple(self.parse_simple_command()?)),
        }
    }

    /// `name() body`
    fn parse_function_def(&mut self) -> Result<CommandNode, ParseException> {
        let name = self.advance().value;
        self.expect(TokenType::LParen)?;
        self.expect(TokenType::RParen)?;
        self.parse_function_body(name)
    }

    /// `function name [()] body`
    fn parse_function_keyword(&mut self) -> Result<CommandNode, ParseException> {
        self.advance();
        let token = self.advance();
        if !token.is_word_like() {
            return Err(ParseException::unexpected(&token));
        }
        if self.check(TokenType::LParen) && self.peek(1).token_type == TokenType::RParen {
            self.advance();
            self.advance();
        }
        self.parse_function_body(token.value)
    }

    fn parse_function_body(&mut self, name: String) -> Result<CommandNode, ParseException> {
        self.skip_newlines();
        let body = match self.current().token_type {
            TokenType::LBrace
            | TokenType::LParen
            | TokenType::If
            | TokenType::For
            | TokenType::While
            | TokenType::Until
            | TokenType::Case
            | TokenType::ArithCommand
            | TokenType::DBrackStart => self.parse_compound_command()?,
            // `f() echo hi` wraps the simple command in a group
            _ => {
                let line = self.current().line;
                let command = self.parse_simple_command()?;
                let source = command.name.as_ref().map(|w| w.to_string()).unwrap_or_default();
                CompoundCommandNode::Group(GroupNode {
                    body: vec![AST::statement(
                        vec![AST::pipeline(vec![CommandNode::Simple(command)], false, Vec::new())],
                        Vec::new(),
                        false,
                        source,
                        line,
                    )],
                    redirections: Vec::new(),
                })
            }
        };
        let redirections = self.parse_trailing_redirections()?;
        Ok(CommandNode::FunctionDef(Arc::new(FunctionDefNode {
            name,
            body,
            redirections,
        })))
    }

    fn parse_simple_command(&mut self) -> Result<SimpleCommandNode, ParseException> {
        let mut node = SimpleCommandNode {
            line: self.current().line,
            ..Default::default()
        };
        let mut expanded_aliases: HashSet<String> = HashSet::new();
        let mut is_declaration = false;

        loop {
            let token = self.current().clone();

            if self.is_redirection_start() {
                node.redirections.push(self.parse_redirection()?);
                continue;
            }

            if node.name.is_none() && token.token_type == TokenType::AssignmentWord {
                self.advance();
                node.assignments.push(parse_assignment(&token.value)?);
                continue;
            }

            let word_like = token.is_word_like()
                || matches!(token.token_type, TokenType::LBrace | TokenType::Bang | TokenType::DBrackStart)
                || (token.token_type == TokenType::RBrace && self.brace_depth == 0);
            if !word_like {
                break;
            }

            if node.name.is_none() {
                if !token.quoted && self.try_expand_alias(&token, &mut expanded_aliases)? {
                    continue;
                }
                self.advance();
                is_declaration = DECLARATION_COMMANDS.contains(&token.value.as_str());
                node.name = Some(parse_word(&token.value)?);
                continue;
            }

            self.advance();
            if is_declaration && token.token_type == TokenType::AssignmentWord {
                node.args.push(parse_declaration_arg(&token.value)?);
            } else {
                node.args.push(parse_word(&token.value)?);
            }
        }

        if node.name.is_none() && node.assignments.is_empty() && node.redirections.is_empty() {
            return Err(ParseException::unexpected(self.current()));
        }
        Ok(node)
    }

    /// Splice an alias body into the token stream; returns true if one was expanded
    fn try_expand_alias(&mut self, token: &Token, seen: &mut HashSet<String>) -> Result<bool, ParseException> {
        if self.aliases.is_empty() || seen.contains(&token.value) {
            return Ok(false);
        }
        let value = match self.aliases.get(&token.value) {
            Some(v) => v.clone(),
            None => return Ok(false),
        };
        seen.insert(token.value.clone());
        let mut replacement = Lexer::new(&value).tokenize()?;
        replacement.pop(); // EOF
        for t in replacement.iter_mut() {
            t.line = token.line;
        }
        self.tokens.splice(self.pos..self.pos + 1, replacement);
        Ok(true)
    }

    // =========================================================================
    // REDIRECTIONS
    // =========================================================================

    pub(crate) fn is_redirection_start(&self) -> bool {
        let t = self.current();
        if is_redirection_token(t.token_type) {
            return true;
        }
        t.token_type == TokenType::Number && is_redirection_token(self.peek(1).token_type)
    }

    pub(crate) fn parse_trailing_redirections(&mut self) -> Result<Vec<RedirectionNode>, ParseException> {
        let mut redirections = Vec::new();
        while self.is_redirection_start() {
            redirections.push(self.parse_redirection()?);
        }
        Ok(redirections)
    }

    pub(crate) fn parse_redirection(&mut self) -> Result<RedirectionNode, ParseException> {
        let mut fd = None;
        if self.check(TokenType::Number) {
            fd = self.advance().value.parse::<i32>().ok();
        }
        let op_token = self.advance();
        let operator = match op_token.token_type {
            TokenType::Less => RedirectionOperator::Less,
            TokenType::Great => RedirectionOperator::Great,
            TokenType::DGreat => RedirectionOperator::DGreat,
            TokenType::LessAnd => RedirectionOperator::LessAnd,
            TokenType::GreatAnd => RedirectionOperator::GreatAnd,
            TokenType::LessGreat => RedirectionOperator::LessGreat,
            TokenType::Clobber => RedirectionOperator::Clobber,
            TokenType::AndGreat => RedirectionOperator::AndGreat,
            TokenType::AndDGreat => RedirectionOperator::AndDGreat,
            TokenType::TLess => RedirectionOperator::TLess,
            TokenType::DLess => RedirectionOperator::DLess,
            TokenType::DLessDash => RedirectionOperator::DLessDash,
            _ => return Err(ParseException::unexpected(&op_token)),
        };

        let target_token = self.current().clone();
        if !target_token.is_word_like() {
            return Err(ParseException::unexpected(&target_token));
        }
        self.advance();

        let target = match operator {
            RedirectionOperator::DLess | RedirectionOperator::DLessDash => {
                let body = op_token.heredoc.clone().ok_or_else(|| {
                    ParseException::new("here-document body missing", op_token.line, op_token.column)
                })?;
                let content = if body.quoted {
                    WordNode {
                        parts: vec![WordPart::SingleQuoted(body.content)],
                    }
                } else {
                    parse_heredoc_content(&body.content)?
                };
                RedirectionTarget::HereDoc(HereDocNode {
                    delimiter: unquote_delimiter(&target_token.value),
                    content,
                    strip_tabs: operator == RedirectionOperator::DLessDash,
                    quoted: body.quoted,
                })
            }
            _ => RedirectionTarget::Word(parse_word(&target_token.value)?),
        };

        Ok(RedirectionNode { fd, operator, target })
    }
}

fn unquote_delimiter(raw: &str) -> String {
    raw.chars().filter(|c| !matches!(c, '\'' | '"' | '\\')).collect()
}

// =============================================================================
// ASSIGNMENTS
// =============================================================================

/// Parse an assignment word: NAME=value, NAME+=value, NAME[k]=v, NAME=(...)
pub fn parse_assignment(text: &str) -> Result<AssignmentNode, ParseException> {
    let eq = find_assignment_eq(text).ok_or_else(|| ParseException::new(format!("`{}': not a valid assignment", text), 0, 0))?;
    let mut lhs = &text[..eq];
    let append = lhs.ends_with('+');
    if append {
        lhs = &lhs[..lhs.len() - 1];
    }
    let (name, subscript) = match lhs.find('[') {
        Some(idx) if lhs.ends_with(']') => (lhs[..idx].to_string(), Some(lhs[idx + 1..lhs.len() - 1].to_string())),
        _ => (lhs.to_string(), None),
    };
    let rhs = &text[eq + 1..];

    if subscript.is_none() && rhs.starts_with('(') && rhs.ends_with(')') && rhs.len() >= 2 {
        return Ok(AssignmentNode {
            name,
            subscript,
            value: None,
            array: Some(parse_array_literal(&rhs[1..rhs.len() - 1])?),
            append,
        });
    }

    Ok(AssignmentNode {
        name,
        subscript,
        value: Some(parse_assignment_value(rhs)?),
        array: None,
        append,
    })
}

/// Parse the inside of `( ... )` in an array assignment
pub fn parse_array_literal(inner: &str) -> Result<Vec<ArrayElement>, ParseException> {
    let tokens = Lexer::new(inner).tokenize()?;
    let mut elements = Vec::new();
    for token in tokens {
        match token.token_type {
            TokenType::Eof | TokenType::Newline => continue,
            _ if token.is_word_like() || matches!(token.token_type, TokenType::LBrace | TokenType::RBrace) => {}
            _ => return Err(ParseException::unexpected(&token)),
        }
        let value = &token.value;
        // [key]=value
        if value.starts_with('[') {
            if let Some(close) = value.find("]=") {
                elements.push(ArrayElement {
                    key: Some(value[1..close].to_string()),
                    value: parse_assignment_value(&value[close + 2..])?,
                });
                continue;
            }
        }
        elements.push(ArrayElement {
            key: None,
            value: parse_word(value)?,
        });
    }
    Ok(elements)
}

/// `local x=$y` style argument: the value is not field split
fn parse_declaration_arg(text: &str) -> Result<WordNode, ParseException> {
    let eq = match find_assignment_eq(text) {
        Some(eq) => eq,
        None => return parse_word(text),
    };
    let rhs = &text[eq + 1..];
    let name_part = &text[..=eq];
    if rhs.starts_with('(') && rhs.ends_with(')') {
        // Array literals are re-parsed by the declaration builtin
        return Ok(WordNode {
            parts: vec![WordPart::SingleQuoted(text.to_string())],
        });
    }
    let value = parse_assignment_value(rhs)?;
    let mut parts = vec![WordPart::SingleQuoted(name_part.to_string())];
    parts.push(WordPart::DoubleQuoted(value.parts));
    Ok(WordNode { parts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::CaseTerminator;

    fn simple(script: &ScriptNode, stmt: usize) -> &SimpleCommandNode {
        match &script.statements[stmt].pipelines[0].commands[0] {
            CommandNode::Simple(s) => s,
            other => panic!("not a simple command: {:?}", other),
        }
    }

    #[test]
    fn test_simple_command() {
        let script = parse("echo hello world").unwrap();
        assert_eq!(script.statements.len(), 1);
        let cmd = simple(&script, 0);
        assert_eq!(cmd.name.as_ref().unwrap().to_string(), "echo");
        assert_eq!(cmd.args.len(), 2);
    }

    #[test]
    fn test_and_or_and_background() {
        let script = parse("a && b || c & d").unwrap();
        assert_eq!(script.statements.len(), 2);
        assert_eq!(script.statements[0].operators, vec![StatementOperator::And, StatementOperator::Or]);
        assert!(script.statements[0].background);
        assert!(!script.statements[1].background);
    }

    #[test]
    fn test_pipeline_negation() {
        let script = parse("! a | b |& c").unwrap();
        let p = &script.statements[0].pipelines[0];
        assert!(p.negated);
        assert_eq!(p.commands.len(), 3);
        assert_eq!(p.pipe_stderr, vec![false, true]);
    }

    #[test]
    fn test_assignments_and_redirections() {
        let script = parse("FOO=1 BAR+=2 cmd arg > out 2>&1").unwrap();
        let cmd = simple(&script, 0);
        assert_eq!(cmd.assignments.len(), 2);
        assert!(cmd.assignments[1].append);
        assert_eq!(cmd.redirections.len(), 2);
        assert_eq!(cmd.redirections[1].fd, Some(2));
        assert_eq!(cmd.redirections[1].operator, RedirectionOperator::GreatAnd);
    }

    #[test]
    fn test_array_assignment() {
        let script = parse("arr=(one \"two three\" [5]=five)").unwrap();
        let assign = &simple(&script, 0).assignments[0];
        let array = assign.array.as_ref().unwrap();
        assert_eq!(array.len(), 3);
        assert_eq!(array[2].key.as_deref(), Some("5"));
    }

    #[test]
    fn test_heredoc() {
        let script = parse("cat <<EOF\nhi $USER\nEOF\n").unwrap();
        let cmd = simple(&script, 0);
        match &cmd.redirections[0].target {
            RedirectionTarget::HereDoc(h) => {
                assert_eq!(h.delimiter, "EOF");
                assert!(!h.quoted);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_compound_with_redirection() {
        let script = parse("while read l; do echo $l; done < input.txt").unwrap();
        match &script.statements[0].pipelines[0].commands[0] {
            CommandNode::Compound(CompoundCommandNode::While(w)) => {
                assert_eq!(w.redirections.len(), 1);
                assert!(!w.until);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_case_terminators() {
        let script = parse("case x in a|b) echo 1;; (c) echo 2;& *) echo 3;;& esac").unwrap();
        match &script.statements[0].pipelines[0].commands[0] {
            CommandNode::Compound(CompoundCommandNode::Case(c)) => {
                assert_eq!(c.items.len(), 3);
                assert_eq!(c.items[0].patterns.len(), 2);
                assert_eq!(c.items[1].terminator, CaseTerminator::FallThrough);
                assert_eq!(c.items[2].terminator, CaseTerminator::Continue);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_function_forms() {
        let script = parse("f() { echo a; }\nfunction g { echo b; }\nh() echo c").unwrap();
        for stmt in &script.statements {
            assert!(matches!(stmt.pipelines[0].commands[0], CommandNode::FunctionDef(_)));
        }
    }

    #[test]
    fn test_syntax_errors() {
        let err = parse("if true; then echo").unwrap_err();
        assert!(err.message.contains("unexpected"));
        assert!(parse("echo a |").is_err());
        assert!(parse("fi").is_err());
        assert!(parse("( echo a").is_err());
        assert!(parse("&& b").is_err());
    }

    #[test]
    fn test_reserved_words_as_arguments() {
        let script = parse("echo if then done").unwrap();
        assert_eq!(simple(&script, 0).args.len(), 3);
    }

    #[test]
    fn test_zsh_group_without_semicolon() {
        let script = parse("{ echo a }").unwrap();
        assert!(matches!(
            script.statements[0].pipelines[0].commands[0],
            CommandNode::Compound(CompoundCommandNode::Group(_))
        ));
    }

    #[test]
    fn test_alias_expansion() {
        let mut aliases = HashMap::new();
        aliases.insert("ll".to_string(), "ls -l".to_string());
        let script = Parser::new().with_aliases(aliases).parse("ll /tmp").unwrap();
        let cmd = simple(&script, 0);
        assert_eq!(cmd.name.as_ref().unwrap().to_string(), "ls");
        assert_eq!(cmd.args.len(), 2);
    }

    #[test]
    fn test_declaration_args_not_split() {
        let script = parse("local x=$y").unwrap();
        let arg = &simple(&script, 0).args[0];
        assert!(matches!(arg.parts[0], WordPart::SingleQuoted(ref s) if s == "x="));
    }
}

//! Compound Command Parser
//!
//! Handles parsing of compound commands: if, for, while, until, case,
//! subshell, group, `(( ))` and `[[ ]]`.

use crate::ast::types::{
    ArithForNode, ArithmeticCommandNode, CaseItemNode, CaseNode, CaseTerminator, CompoundCommandNode,
    ConditionalCommandNode, ForNode, GroupNode, IfClause, IfNode, StatementNode, SubshellNode, WhileNode, WordNode,
    AST,
};
use crate::parser::lexer::{is_valid_name, TokenType};
use crate::parser::parser::Parser;
use crate::parser::types::ParseException;
use crate::parser::word_parser::parse_word;

impl Parser {
    /// Parse a compound command and any redirections that follow it
    pub(crate) fn parse_compound_command(&mut self) -> Result<CompoundCommandNode, ParseException> {
        self.enter()?;
        let result = match self.current().token_type {
            TokenType::If => self.parse_if(),
            TokenType::For => self.parse_for(),
            TokenType::While | TokenType::Until => self.parse_while(),
            TokenType::Case => self.parse_case(),
            TokenType::LParen => self.parse_subshell(),
            TokenType::LBrace => self.parse_group(),
            TokenType::ArithCommand => self.parse_arithmetic_command(),
            TokenType::DBrackStart => self.parse_conditional(),
            _ => Err(ParseException::unexpected(self.current())),
        };
        self.leave();
        result
    }

    // =========================================================================
    // IF
    // =========================================================================

    fn parse_if(&mut self) -> Result<CompoundCommandNode, ParseException> {
        self.expect(TokenType::If)?;
        let mut clauses = Vec::new();

        let condition = self.parse_statement_list(&[TokenType::Then])?;
        self.expect(TokenType::Then)?;
        let body = self.parse_statement_list(&[TokenType::Elif, TokenType::Else, TokenType::Fi])?;
        clauses.push(IfClause { condition, body });

        let mut else_body = None;
        loop {
            match self.current().token_type {
                TokenType::Elif => {
                    self.advance();
                    let condition = self.parse_statement_list(&[TokenType::Then])?;
                    self.expect(TokenType::Then)?;
                    let body = self.parse_statement_list(&[TokenType::Elif, TokenType::Else, TokenType::Fi])?;
                    clauses.push(IfClause { condition, body });
                }
                TokenType::Else => {
                    self.advance();
                    else_body = Some(self.parse_statement_list(&[TokenType::Fi])?);
                    self.expect(TokenType::Fi)?;
                    break;
                }
                _ => {
                    self.expect(TokenType::Fi)?;
                    break;
                }
            }
        }

        Ok(CompoundCommandNode::If(IfNode {
            clauses,
            else_body,
            redirections: self.parse_trailing_redirections()?,
        }))
    }

    // =========================================================================
    // LOOPS
    // =========================================================================

    fn parse_for(&mut self) -> Result<CompoundCommandNode, ParseException> {
        self.expect(TokenType::For)?;

        if self.check(TokenType::ArithCommand) {
            let header = self.advance();
            let parts: Vec<&str> = header.value.splitn(3, ';').collect();
            if parts.len() != 3 {
                return Err(ParseException::new(
                    "syntax error: expected `;' in for (( ))",
                    header.line,
                    header.column,
                ));
            }
            let body = self.parse_loop_body()?;
            return Ok(CompoundCommandNode::ArithFor(ArithForNode {
                init: parts[0].trim().to_string(),
                condition: parts[1].trim().to_string(),
                update: parts[2].trim().to_string(),
                body,
                redirections: self.parse_trailing_redirections()?,
            }));
        }

        let var_token = self.advance();
        if !var_token.is_word_like() || !is_valid_name(&var_token.value) {
            return Err(ParseException::unexpected(&var_token));
        }

        self.skip_newlines();
        let mut words = None;
        if self.check(TokenType::In) {
            self.advance();
            let mut list = Vec::new();
            while self.current().is_word_like()
                || matches!(self.current().token_type, TokenType::LBrace | TokenType::RBrace)
            {
                let token = self.advance();
                list.push(parse_word(&token.value)?);
            }
            words = Some(list);
        }

        let body = self.parse_loop_body()?;
        Ok(CompoundCommandNode::For(ForNode {
            variable: var_token.value,
            words,
            body,
            redirections: self.parse_trailing_redirections()?,
        }))
    }

    fn parse_while(&mut self) -> Result<CompoundCommandNode, ParseException> {
        let until = self.advance().token_type == TokenType::Until;
        let condition = self.parse_statement_list(&[TokenType::Do])?;
        let body = self.parse_loop_body()?;
        Ok(CompoundCommandNode::While(WhileNode {
            condition,
            body,
            until,
            redirections: self.parse_trailing_redirections()?,
        }))
    }

    /// `[;] do LIST done`
    fn parse_loop_body(&mut self) -> Result<Vec<StatementNode>, ParseException> {
        self.skip_separators();
        self.expect(TokenType::Do)?;
        let body = self.parse_statement_list(&[TokenType::Done])?;
        self.expect(TokenType::Done)?;
        Ok(body)
    }

    // =========================================================================
    // CASE
    // =========================================================================

    fn parse_case(&mut self) -> Result<CompoundCommandNode, ParseException> {
        self.expect(TokenType::Case)?;
        let word_token = self.advance();
        if !word_token.is_word_like() {
            return Err(ParseException::unexpected(&word_token));
        }
        let word = parse_word(&word_token.value)?;
        self.skip_newlines();
        self.expect(TokenType::In)?;
        self.skip_newlines();

        let mut items = Vec::new();
        while !self.check(TokenType::Esac) {
            if self.check(TokenType::Eof) {
                return Err(ParseException::unexpected(self.current()));
            }
            items.push(self.parse_case_item()?);
            self.skip_newlines();
        }
        self.expect(TokenType::Esac)?;

        Ok(CompoundCommandNode::Case(CaseNode {
            word,
            items,
            redirections: self.parse_trailing_redirections()?,
        }))
    }

    fn parse_case_item(&mut self) -> Result<CaseItemNode, ParseException> {
        if self.check(TokenType::LParen) {
            self.advance();
        }

        let mut patterns = Vec::new();
        loop {
            let token = self.advance();
            if !token.is_word_like() && !matches!(token.token_type, TokenType::LBrace | TokenType::RBrace) {
                return Err(ParseException::unexpected(&token));
            }
            patterns.push(parse_word(&token.value)?);
            if self.check(TokenType::Pipe) {
                self.advance();
                continue;
            }
            break;
        }
        self.expect(TokenType::RParen)?;

        let body = self.parse_statement_list(&[
            TokenType::DSemi,
            TokenType::SemiAnd,
            TokenType::SemiSemiAnd,
            TokenType::Esac,
        ])?;

        let terminator = match self.current().token_type {
            TokenType::DSemi => CaseTerminator::Break,
            TokenType::SemiAnd => CaseTerminator::FallThrough,
            TokenType::SemiSemiAnd => CaseTerminator::Continue,
            // The last arm may omit `;;`
            TokenType::Esac => return Ok(CaseItemNode { patterns, body, terminator: CaseTerminator::Break }),
            _ => return Err(ParseException::unexpected(self.current())),
        };
        self.advance();
        Ok(CaseItemNode { patterns, body, terminator })
    }

    // =========================================================================
    // GROUPING
    // =========================================================================

    fn parse_subshell(&mut self) -> Result<CompoundCommandNode, ParseException> {
        self.expect(TokenType::LParen)?;
        let saved_brace_depth = self.brace_depth;
        self.brace_depth = 0;
        let body = self.parse_statement_list(&[TokenType::RParen]);
        self.brace_depth = saved_brace_depth;
        let body = body?;
        self.expect(TokenType::RParen)?;
        Ok(CompoundCommandNode::Subshell(SubshellNode {
            body,
            redirections: self.parse_trailing_redirections()?,
        }))
    }

    fn parse_group(&mut self) -> Result<CompoundCommandNode, ParseException> {
        self.expect(TokenType::LBrace)?;
        self.brace_depth += 1;
        let body = self.parse_statement_list(&[TokenType::RBrace]);
        self.brace_depth -= 1;
        let body = body?;
        self.expect(TokenType::RBrace)?;
        Ok(CompoundCommandNode::Group(GroupNode {
            body,
            redirections: self.parse_trailing_redirections()?,
        }))
    }

    // =========================================================================
    // (( )) AND [[ ]]
    // =========================================================================

    fn parse_arithmetic_command(&mut self) -> Result<CompoundCommandNode, ParseException> {
        let token = self.expect(TokenType::ArithCommand)?;
        Ok(CompoundCommandNode::Arithmetic(ArithmeticCommandNode {
            expression: token.value,
            redirections: self.parse_trailing_redirections()?,
            line: token.line,
        }))
    }

    /// `[[ ... ]]` is kept as a list of words; operators become literal words.
    /// After `=~` adjacent tokens are glued back together so a regex such as
    /// `^a|b$` survives tokenization.
    fn parse_conditional(&mut self) -> Result<CompoundCommandNode, ParseException> {
        let open = self.expect(TokenType::DBrackStart)?;
        let mut words: Vec<WordNode> = Vec::new();
        let mut after_regex_op = false;

        loop {
            let token = self.current().clone();
            match token.token_type {
                TokenType::DBrackEnd => break,
                TokenType::Eof => return Err(ParseException::unexpected(&token)),
                TokenType::Newline => {
                    self.advance();
                    continue;
                }
                _ => {}
            }
            self.advance();

            if after_regex_op {
                let mut end = token.end;
                let mut raw = token.value.clone();
                while self.current().start == end
                    && !matches!(
                        self.current().token_type,
                        TokenType::DBrackEnd | TokenType::AndAnd | TokenType::OrOr | TokenType::Eof
                    )
                {
                    let next = self.advance();
                    raw.push_str(&next.value);
                    end = next.end;
                }
                words.push(parse_word(&raw)?);
                after_regex_op = false;
                continue;
            }

            if token.is_word_like() {
                after_regex_op = token.value == "=~" && !token.quoted;
                words.push(parse_word(&token.value)?);
            } else {
                words.push(AST::literal_word(token.value.clone()));
            }
        }
        self.expect(TokenType::DBrackEnd)?;

        if words.is_empty() {
            return Err(ParseException::new("syntax error: empty [[ ]]", open.line, open.column));
        }
        Ok(CompoundCommandNode::Conditional(ConditionalCommandNode {
            words,
            redirections: self.parse_trailing_redirections()?,
            line: open.line,
        }))
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::types::{CommandNode, CompoundCommandNode};
    use crate::parser::parser::parse;

    fn compound(src: &str) -> CompoundCommandNode {
        let script = parse(src).unwrap();
        match &script.statements[0].pipelines[0].commands[0] {
            CommandNode::Compound(c) => c.clone(),
            other => panic!("not compound: {:?}", other),
        }
    }

    #[test]
    fn test_if_elif_else() {
        match compound("if a; then b; elif c; then d; else e; fi") {
            CompoundCommandNode::If(n) => {
                assert_eq!(n.clauses.len(), 2);
                assert!(n.else_body.is_some());
            }
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn test_for_in_and_implicit_args() {
        match compound("for i in 1 2 3; do echo $i; done") {
            CompoundCommandNode::For(n) => {
                assert_eq!(n.variable, "i");
                assert_eq!(n.words.unwrap().len(), 3);
            }
            other => panic!("{:?}", other),
        }
        match compound("for arg\ndo echo $arg\ndone") {
            CompoundCommandNode::For(n) => assert!(n.words.is_none()),
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn test_arith_for() {
        match compound("for ((i=0; i<3; i++)); do echo $i; done") {
            CompoundCommandNode::ArithFor(n) => {
                assert_eq!(n.init, "i=0");
                assert_eq!(n.condition, "i<3");
                assert_eq!(n.update, "i++");
            }
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn test_until() {
        match compound("until false; do break; done") {
            CompoundCommandNode::While(n) => assert!(n.until),
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn test_case_last_arm_without_terminator() {
        match compound("case $x in\n  a) echo a;;\n  *) echo other\nesac") {
            CompoundCommandNode::Case(n) => assert_eq!(n.items.len(), 2),
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn test_subshell_and_group_redirections() {
        match compound("( echo a ) > out") {
            CompoundCommandNode::Subshell(n) => assert_eq!(n.redirections.len(), 1),
            other => panic!("{:?}", other),
        }
        match compound("{ echo a; echo b; } 2>&1") {
            CompoundCommandNode::Group(n) => {
                assert_eq!(n.body.len(), 2);
                assert_eq!(n.redirections.len(), 1);
            }
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn test_conditional_words() {
        match compound("[[ -n $x && $y == a* ]]") {
            CompoundCommandNode::Conditional(n) => {
                let words: Vec<String> = n.words.iter().map(|w| w.to_string()).collect();
                assert_eq!(words, vec!["-n", "$x", "&&", "$y", "==", "a*"]);
            }
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn test_conditional_regex_kept_whole() {
        match compound("[[ $v =~ ^[0-9]+$ ]]") {
            CompoundCommandNode::Conditional(n) => {
                assert_eq!(n.words.len(), 3);
                assert_eq!(n.words[2].to_string(), "^[0-9]+$");
            }
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn test_arithmetic_command() {
        match compound("(( x += 2 ))") {
            CompoundCommandNode::Arithmetic(n) => assert_eq!(n.expression.trim(), "x += 2"),
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn test_missing_terminators_are_errors() {
        assert!(parse("for i in a; do echo").is_err());
        assert!(parse("while true; echo; done").is_err());
        assert!(parse("case x in a) echo").is_err());
        assert!(parse("{ echo a").is_err());
    }
}

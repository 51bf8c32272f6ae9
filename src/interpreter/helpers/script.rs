//! Parsing text at run time (`eval`, `source`, trap handlers) with the
//! shell's current aliases.

use std::collections::HashMap;

use crate::ast::types::ScriptNode;
use crate::interpreter::types::ShellContext;
use crate::parser::{ParseException, Parser};

pub fn alias_table(ctx: &ShellContext) -> HashMap<String, String> {
    ctx.aliases.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

pub fn parse_with_aliases(ctx: &ShellContext, text: &str) -> Result<ScriptNode, ParseException> {
    Parser::new().with_aliases(alias_table(ctx)).parse(text)
}

/// Diagnostic for a script that failed to parse
pub fn syntax_error_message(err: &ParseException) -> String {
    format!("zshell: syntax error: {} (line {})\n", err.message, err.line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_apply() {
        let mut ctx = ShellContext::default();
        ctx.aliases.insert("hi".into(), "echo hello".into());
        let script = parse_with_aliases(&ctx, "hi").unwrap();
        assert_eq!(script.statements.len(), 1);
        let err = parse_with_aliases(&ctx, "if then").unwrap_err();
        assert!(syntax_error_message(&err).starts_with("zshell: syntax error: "));
    }
}

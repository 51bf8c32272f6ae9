//! Command Substitution Helpers

use crate::ast::types::{CommandNode, RedirectionOperator, RedirectionTarget, ScriptNode, WordNode};

/// The target of `$(<file)`, when the body is exactly one input
/// redirection with no command. `$(<file; cmd)` is an ordinary command.
pub fn get_file_read_shorthand(body: &ScriptNode) -> Option<&WordNode> {
    let [statement] = body.statements.as_slice() else {
        return None;
    };
    if !statement.operators.is_empty() || statement.background {
        return None;
    }
    let [pipeline] = statement.pipelines.as_slice() else {
        return None;
    };
    if pipeline.negated {
        return None;
    }
    let [CommandNode::Simple(cmd)] = pipeline.commands.as_slice() else {
        return None;
    };
    if cmd.name.is_some() || !cmd.args.is_empty() || !cmd.assignments.is_empty() {
        return None;
    }
    let [redir] = cmd.redirections.as_slice() else {
        return None;
    };
    if redir.operator != RedirectionOperator::Less || redir.fd.unwrap_or(0) != 0 {
        return None;
    }
    match &redir.target {
        RedirectionTarget::Word(word) => Some(word),
        RedirectionTarget::HereDoc(_) => None,
    }
}

/// Command substitution drops every trailing newline
pub fn strip_trailing_newlines(mut output: String) -> String {
    let trimmed = output.trim_end_matches('\n').len();
    output.truncate(trimmed);
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn test_file_read_shorthand() {
        let script = parse("< input.txt").unwrap();
        assert!(get_file_read_shorthand(&script).is_some());
        let script = parse("cat < input.txt").unwrap();
        assert!(get_file_read_shorthand(&script).is_none());
        let script = parse("< a; echo").unwrap();
        assert!(get_file_read_shorthand(&script).is_none());
    }

    #[test]
    fn test_strip_trailing_newlines() {
        assert_eq!(strip_trailing_newlines("a\nb\n\n".to_string()), "a\nb");
        assert_eq!(strip_trailing_newlines("\n".to_string()), "");
    }
}

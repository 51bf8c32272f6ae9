//! Abstract Syntax Tree (AST) Types for the Shell
//!
//! This module defines the AST produced by the parser and walked by the
//! execution engine. Every node is a plain value type: once the parser hands
//! a `ScriptNode` to the engine it is never rewritten.

use std::fmt;
use std::sync::Arc;

// =============================================================================
// SCRIPT & STATEMENTS
// =============================================================================

/// Root node: a complete script
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScriptNode {
    pub statements: Vec<StatementNode>,
}

/// A statement is a list of pipelines connected by && or ||.
///
/// Statements themselves are separated by `;`, `&` or newlines. A trailing
/// `&` sets `background` and runs the whole and-or list as a job.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementNode {
    pub pipelines: Vec<PipelineNode>,
    /// Operators between pipelines, `operators.len() == pipelines.len() - 1`
    pub operators: Vec<StatementOperator>,
    /// Run in background?
    pub background: bool,
    /// Original source text, used for job listings and `set -v`
    pub source_text: String,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementOperator {
    And, // &&
    Or,  // ||
}

// =============================================================================
// PIPELINES & COMMANDS
// =============================================================================

/// A pipeline: cmd1 | cmd2 | cmd3
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineNode {
    pub commands: Vec<CommandNode>,
    /// Negate exit status with !
    pub negated: bool,
    /// For each pipe, whether it's |& (pipe stderr too)
    pub pipe_stderr: Vec<bool>,
}

/// Union of all command types
#[derive(Debug, Clone, PartialEq)]
pub enum CommandNode {
    Simple(SimpleCommandNode),
    Compound(CompoundCommandNode),
    FunctionDef(Arc<FunctionDefNode>),
}

/// Simple command: name args... with optional redirections
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SimpleCommandNode {
    /// Variable assignments before command: VAR=value cmd
    pub assignments: Vec<AssignmentNode>,
    /// Command name (None for assignment-only or redirection-only commands)
    pub name: Option<WordNode>,
    pub args: Vec<WordNode>,
    pub redirections: Vec<RedirectionNode>,
    /// Source line number for $LINENO
    pub line: usize,
}

/// Compound commands: control structures
#[derive(Debug, Clone, PartialEq)]
pub enum CompoundCommandNode {
    If(IfNode),
    For(ForNode),
    ArithFor(ArithForNode),
    While(WhileNode),
    Case(CaseNode),
    Subshell(SubshellNode),
    Group(GroupNode),
    Arithmetic(ArithmeticCommandNode),
    Conditional(ConditionalCommandNode),
}

impl CompoundCommandNode {
    /// Redirections attached to the construct itself (`while ...; done < file`)
    pub fn redirections(&self) -> &[RedirectionNode] {
        match self {
            Self::If(n) => &n.redirections,
            Self::For(n) => &n.redirections,
            Self::ArithFor(n) => &n.redirections,
            Self::While(n) => &n.redirections,
            Self::Case(n) => &n.redirections,
            Self::Subshell(n) => &n.redirections,
            Self::Group(n) => &n.redirections,
            Self::Arithmetic(n) => &n.redirections,
            Self::Conditional(n) => &n.redirections,
        }
    }
}

// =============================================================================
// CONTROL FLOW
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct IfClause {
    pub condition: Vec<StatementNode>,
    pub body: Vec<StatementNode>,
}

/// if / elif / else / fi
#[derive(Debug, Clone, PartialEq)]
pub struct IfNode {
    pub clauses: Vec<IfClause>,
    pub else_body: Option<Vec<StatementNode>>,
    pub redirections: Vec<RedirectionNode>,
}

/// for NAME [in WORDS]; do BODY; done
#[derive(Debug, Clone, PartialEq)]
pub struct ForNode {
    pub variable: String,
    /// None means iterate over "$@"
    pub words: Option<Vec<WordNode>>,
    pub body: Vec<StatementNode>,
    pub redirections: Vec<RedirectionNode>,
}

/// for ((init; cond; update)); do BODY; done
#[derive(Debug, Clone, PartialEq)]
pub struct ArithForNode {
    pub init: String,
    pub condition: String,
    pub update: String,
    pub body: Vec<StatementNode>,
    pub redirections: Vec<RedirectionNode>,
}

/// while / until
#[derive(Debug, Clone, PartialEq)]
pub struct WhileNode {
    pub condition: Vec<StatementNode>,
    pub body: Vec<StatementNode>,
    pub until: bool,
    pub redirections: Vec<RedirectionNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseNode {
    pub word: WordNode,
    pub items: Vec<CaseItemNode>,
    pub redirections: Vec<RedirectionNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseItemNode {
    pub patterns: Vec<WordNode>,
    pub body: Vec<StatementNode>,
    pub terminator: CaseTerminator,
}

/// How a case arm ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseTerminator {
    /// `;;` stop after this arm
    Break,
    /// `;&` run the next arm's body unconditionally
    FallThrough,
    /// `;;&` keep testing the following patterns
    Continue,
}

/// ( ... )
#[derive(Debug, Clone, PartialEq)]
pub struct SubshellNode {
    pub body: Vec<StatementNode>,
    pub redirections: Vec<RedirectionNode>,
}

/// { ...; }
#[derive(Debug, Clone, PartialEq)]
pub struct GroupNode {
    pub body: Vec<StatementNode>,
    pub redirections: Vec<RedirectionNode>,
}

/// (( expr ))
#[derive(Debug, Clone, PartialEq)]
pub struct ArithmeticCommandNode {
    pub expression: String,
    pub redirections: Vec<RedirectionNode>,
    pub line: usize,
}

/// [[ expr ]]
///
/// Operators are kept as literal words; the evaluator interprets them.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalCommandNode {
    pub words: Vec<WordNode>,
    pub redirections: Vec<RedirectionNode>,
    pub line: usize,
}

/// name() body  |  function name body
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDefNode {
    pub name: String,
    pub body: CompoundCommandNode,
    pub redirections: Vec<RedirectionNode>,
}

// =============================================================================
// ASSIGNMENTS
// =============================================================================

/// VAR=value, VAR+=value, VAR[k]=value, VAR=(a b c)
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentNode {
    pub name: String,
    /// Subscript text for `name[sub]=value`
    pub subscript: Option<String>,
    pub value: Option<WordNode>,
    /// Array literal for `name=(...)`
    pub array: Option<Vec<ArrayElement>>,
    pub append: bool,
}

/// One element of an array literal: `word` or `[key]=word`
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayElement {
    pub key: Option<String>,
    pub value: WordNode,
}

// =============================================================================
// REDIRECTIONS
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct RedirectionNode {
    /// Explicit file descriptor (`2>`), None for the operator default
    pub fd: Option<i32>,
    pub operator: RedirectionOperator,
    pub target: RedirectionTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectionOperator {
    Less,      // <
    Great,     // >
    DGreat,    // >>
    LessAnd,   // <&
    GreatAnd,  // >&
    LessGreat, // <>
    Clobber,   // >|
    AndGreat,  // &>
    AndDGreat, // &>>
    TLess,     // <<<
    DLess,     // <<
    DLessDash, // <<-
}

impl RedirectionOperator {
    /// The fd an operator applies to when none is written
    pub fn default_fd(&self) -> i32 {
        match self {
            Self::Less | Self::LessAnd | Self::LessGreat | Self::TLess | Self::DLess | Self::DLessDash => 0,
            _ => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Less => "<",
            Self::Great => ">",
            Self::DGreat => ">>",
            Self::LessAnd => "<&",
            Self::GreatAnd => ">&",
            Self::LessGreat => "<>",
            Self::Clobber => ">|",
            Self::AndGreat => "&>",
            Self::AndDGreat => "&>>",
            Self::TLess => "<<<",
            Self::DLess => "<<",
            Self::DLessDash => "<<-",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RedirectionTarget {
    Word(WordNode),
    HereDoc(HereDocNode),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HereDocNode {
    pub delimiter: String,
    /// Body; a quoted delimiter yields a single literal part
    pub content: WordNode,
    pub strip_tabs: bool,
    pub quoted: bool,
}

// =============================================================================
// WORDS
// =============================================================================

/// A word is a sequence of parts that are expanded and concatenated
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WordNode {
    pub parts: Vec<WordPart>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WordPart {
    /// Unquoted text; subject to globbing
    Literal(String),
    /// '...'
    SingleQuoted(String),
    /// "..."
    DoubleQuoted(Vec<WordPart>),
    /// Backslash-escaped text, always literal
    Escaped(String),
    Parameter(ParameterExpansion),
    CommandSubstitution(CommandSubstitutionPart),
    /// $((...)), expression text is expanded and evaluated at run time
    Arithmetic(String),
    ProcessSubstitution(ProcessSubstitutionPart),
    Brace(Vec<BraceItem>),
    /// ~ or ~user
    Tilde(Option<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandSubstitutionPart {
    pub body: ScriptNode,
    pub backtick: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSubstitutionPart {
    pub body: ScriptNode,
    pub direction: ProcessDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessDirection {
    Input,  // <(...)
    Output, // >(...)
}

#[derive(Debug, Clone, PartialEq)]
pub enum BraceItem {
    Word(WordNode),
    NumberRange {
        start: i64,
        end: i64,
        step: Option<i64>,
        /// Zero-pad width, 0 when neither bound had leading zeros
        width: usize,
    },
    CharRange {
        start: char,
        end: char,
        step: Option<i64>,
    },
}

// =============================================================================
// PARAMETER EXPANSION
// =============================================================================

/// ${name[subscript]op} and $name forms
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterExpansion {
    pub name: String,
    pub subscript: Option<String>,
    /// ${!name}
    pub indirect: bool,
    pub op: Option<ParameterOp>,
}

impl ParameterExpansion {
    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subscript: None,
            indirect: false,
            op: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternSide {
    Prefix,
    Suffix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceAnchor {
    Start,
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParameterOp {
    /// ${#name}
    Length,
    /// ${!name[@]}
    Keys,
    /// ${name:-word} / ${name-word}
    DefaultValue { word: WordNode, check_empty: bool },
    /// ${name:=word} / ${name=word}
    AssignDefault { word: WordNode, check_empty: bool },
    /// ${name:?word} / ${name?word}
    ErrorIfUnset { word: Option<WordNode>, check_empty: bool },
    /// ${name:+word} / ${name+word}
    UseAlternative { word: WordNode, check_empty: bool },
    /// ${name:offset:length}
    Substring { offset: String, length: Option<String> },
    /// ${name#pat} ${name##pat} ${name%pat} ${name%%pat}
    RemovePattern { pattern: WordNode, side: PatternSide, greedy: bool },
    /// ${name/pat/rep} ${name//pat/rep} ${name/#pat/rep} ${name/%pat/rep}
    Replace {
        pattern: WordNode,
        replacement: Option<WordNode>,
        all: bool,
        anchor: Option<ReplaceAnchor>,
    },
    /// ${name^} ${name^^} ${name,} ${name,,}
    CaseModify { upper: bool, all: bool },
}

// =============================================================================
// DISPLAY
// =============================================================================

impl fmt::Display for WordNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.parts {
            write!(f, "{}", part)?;
        }
        Ok(())
    }
}

impl fmt::Display for WordPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WordPart::Literal(s) => write!(f, "{}", s),
            WordPart::SingleQuoted(s) => write!(f, "'{}'", s),
            WordPart::DoubleQuoted(parts) => {
                write!(f, "\"")?;
                for p in parts {
                    write!(f, "{}", p)?;
                }
                write!(f, "\"")
            }
            WordPart::Escaped(s) => write!(f, "\\{}", s),
            WordPart::Parameter(p) => match &p.op {
                None if p.subscript.is_none() && !p.indirect => write!(f, "${}", p.name),
                _ => write!(f, "${{{}}}", p.name),
            },
            WordPart::CommandSubstitution(_) => write!(f, "$(...)"),
            WordPart::Arithmetic(e) => write!(f, "$(({}))", e),
            WordPart::ProcessSubstitution(p) => match p.direction {
                ProcessDirection::Input => write!(f, "<(...)"),
                ProcessDirection::Output => write!(f, ">(...)"),
            },
            WordPart::Brace(items) => {
                let rendered: Vec<String> = items
                    .iter()
                    .map(|i| match i {
                        BraceItem::Word(w) => w.to_string(),
                        BraceItem::NumberRange { start, end, .. } => format!("{}..{}", start, end),
                        BraceItem::CharRange { start, end, .. } => format!("{}..{}", start, end),
                    })
                    .collect();
                write!(f, "{{{}}}", rendered.join(","))
            }
            WordPart::Tilde(user) => write!(f, "~{}", user.as_deref().unwrap_or("")),
        }
    }
}

// =============================================================================
// FACTORY
// =============================================================================

/// Convenience constructors used by the parser and tests
pub struct AST;

impl AST {
    pub fn script(statements: Vec<StatementNode>) -> ScriptNode {
        ScriptNode { statements }
    }

    pub fn literal_word(text: impl Into<String>) -> WordNode {
        WordNode {
            parts: vec![WordPart::Literal(text.into())],
        }
    }

    pub fn pipeline(commands: Vec<CommandNode>, negated: bool, pipe_stderr: Vec<bool>) -> PipelineNode {
        PipelineNode {
            commands,
            negated,
            pipe_stderr,
        }
    }

    pub fn statement(
        pipelines: Vec<PipelineNode>,
        operators: Vec<StatementOperator>,
        background: bool,
        source_text: String,
        line: usize,
    ) -> StatementNode {
        StatementNode {
            pipelines,
            operators,
            background,
            source_text,
            line,
        }
    }
}

//! Word Expansion
//!
//! Main entry point for shell word expansion. A word goes through:
//! 1. brace expansion (`{a,b}`, `{1..5}`)
//! 2. tilde, parameter, command, arithmetic and process substitution,
//!    left to right, assembling fields in a [`FieldBuilder`]
//! 3. field splitting of unquoted results (`SH_WORD_SPLIT` for parameters;
//!    command substitutions always split)
//! 4. filename generation for fields with live glob characters
//!
//! Quote removal happens implicitly: quoted text is appended without its
//! quotes and escaped in the field's pattern form.
//!
//! The same traversal also produces single strings (assignments,
//! redirection targets, here-documents) and pattern strings (`case`,
//! `[[ == ]]`, `${v#pat}`), where quoted characters match literally.

use std::io::{Read, Write};
use std::os::fd::AsRawFd;

use crate::ast::types::{
    ParameterExpansion, ParameterOp, ProcessDirection, ProcessSubstitutionPart, ScriptNode, WordNode,
    WordPart,
};
use crate::interpreter::arithmetic::{self, ArithValue};
use crate::interpreter::errors::{ExpansionError, GlobError, InterpreterError, NounsetError, RuntimeError};
use crate::interpreter::execution_engine::ExecutionEngine;
use crate::interpreter::expansion::brace_range::{expand_braces, has_braces};
use crate::interpreter::expansion::command_substitution::{get_file_read_shorthand, strip_trailing_newlines};
use crate::interpreter::expansion::parameter_ops::{
    case_modify, remove_pattern, replace_pattern, slice_values, substring,
};
use crate::interpreter::expansion::pattern::{has_glob_chars, CompiledPattern, PatternOptions};
use crate::interpreter::expansion::tilde::expand_tilde;
use crate::interpreter::expansion::word_split::{Field, FieldBuilder};
use crate::interpreter::types::{
    ExecResult, Input, ProcessSubstitution, ShellContext, SubstitutionEnd,
};
use crate::parser::word_parser::{parse_heredoc_content, parse_word};
use crate::shell::glob_expander::GlobExpander;

/// How the pieces of a word are being assembled
#[derive(Debug, Clone, Copy)]
struct Mode {
    /// Unquoted results may be split into several fields
    split: bool,
    /// Building a match pattern: unquoted results keep glob characters
    pattern: bool,
}

const FIELDS: Mode = Mode { split: true, pattern: false };
const STRING: Mode = Mode { split: false, pattern: false };
const PATTERN: Mode = Mode { split: false, pattern: true };

/// A parameter's value before it is placed into fields
enum ParamValue {
    Scalar(Option<String>),
    /// `$@`, `$*`, `${a[@]}`, `${a[*]}`; `star` joins quoted results
    List { values: Vec<String>, star: bool },
}

impl ParamValue {
    fn is_unset(&self) -> bool {
        matches!(self, ParamValue::Scalar(None))
    }

    fn is_empty(&self) -> bool {
        match self {
            ParamValue::Scalar(v) => v.as_deref().map_or(true, str::is_empty),
            ParamValue::List { values, .. } => values.is_empty(),
        }
    }

    fn map(self, f: impl Fn(&str) -> String) -> ParamValue {
        match self {
            ParamValue::Scalar(v) => ParamValue::Scalar(Some(f(v.as_deref().unwrap_or("")))),
            ParamValue::List { values, star } => ParamValue::List {
                values: values.iter().map(|v| f(v)).collect(),
                star,
            },
        }
    }
}

// ============================================================================
// Public entry points
// ============================================================================

/// Expand command words into arguments
pub fn expand_words(ctx: &mut ShellContext, words: &[WordNode]) -> Result<Vec<String>, InterpreterError> {
    let mut out = Vec::new();
    for word in words {
        out.extend(expand_word_fields(ctx, word)?);
    }
    Ok(out)
}

/// Full expansion of one word: braces, substitutions, splitting, globbing
pub fn expand_word_fields(ctx: &mut ShellContext, word: &WordNode) -> Result<Vec<String>, InterpreterError> {
    let words = if has_braces(word) && !ctx.zsh_opt("IGNORE_BRACES") {
        expand_braces(word)
    } else {
        vec![word.clone()]
    };
    let mut out = Vec::new();
    for w in &words {
        let fields = build_fields(ctx, &w.parts, FIELDS)?;
        out.extend(glob_fields(ctx, fields)?);
    }
    Ok(out)
}

/// Expand to a single string without splitting or globbing; the elements
/// of `"$@"` are joined with spaces
pub fn expand_word_string(ctx: &mut ShellContext, word: &WordNode) -> Result<String, InterpreterError> {
    let fields = build_fields(ctx, &word.parts, STRING)?;
    Ok(fields.into_iter().map(|f| f.text).collect::<Vec<_>>().join(" "))
}

/// Expand to a glob pattern: quoted characters are escaped, unquoted
/// expansion results keep their pattern characters
pub fn expand_pattern(ctx: &mut ShellContext, word: &WordNode) -> Result<String, InterpreterError> {
    let fields = build_fields(ctx, &word.parts, PATTERN)?;
    Ok(fields.into_iter().map(|f| f.pattern).collect::<Vec<_>>().join(" "))
}

/// Pattern matching options for `case`/`[[ ]]`/`${v#p}` under the
/// current options
pub fn pattern_options(ctx: &ShellContext) -> PatternOptions {
    PatternOptions {
        extended: ctx.zsh_opt("EXTENDED_GLOB"),
        case_insensitive: !ctx.zsh_opt("CASE_MATCH"),
    }
}

/// Compile an expanded pattern; an invalid pattern matches itself literally
pub fn compile_pattern(ctx: &ShellContext, pattern: &str) -> CompiledPattern {
    CompiledPattern::compile_or_literal(pattern, pattern_options(ctx))
}

/// Expand `$` forms inside arithmetic text (`$((x + $y))`)
pub fn expand_arithmetic_text(ctx: &mut ShellContext, text: &str) -> Result<String, InterpreterError> {
    if !text.contains('$') && !text.contains('`') {
        return Ok(text.to_string());
    }
    let word = parse_heredoc_content(text).map_err(|e| ExpansionError::new(e.message))?;
    expand_word_string(ctx, &word)
}

/// Expand and evaluate arithmetic text
pub fn evaluate_arithmetic_text(ctx: &mut ShellContext, text: &str) -> Result<ArithValue, InterpreterError> {
    let expanded = expand_arithmetic_text(ctx, text)?;
    if expanded.trim().is_empty() {
        return Ok(ArithValue::Int(0));
    }
    arithmetic::evaluate_str(ctx, &expanded)
}

/// Resolve an array subscript: associative keys are expanded as strings,
/// indexed subscripts are evaluated arithmetically
pub fn subscript_key(ctx: &mut ShellContext, name: &str, subscript: &str) -> Result<String, InterpreterError> {
    if ctx.arrays.is_associative(name) {
        return associative_key(ctx, subscript);
    }
    Ok(evaluate_arithmetic_text(ctx, subscript)?.as_int().to_string())
}

/// Expand an associative key: quotes are removed, no splitting or globbing
pub fn associative_key(ctx: &mut ShellContext, key_text: &str) -> Result<String, InterpreterError> {
    let word = parse_word(key_text).map_err(|e| ExpansionError::new(e.message))?;
    expand_word_string(ctx, &word)
}

/// Close the pipe ends held for `<(..)`/`>(..)` and collect the output of
/// `>(..)` readers. Called once the command that used them has finished.
pub fn finish_substitutions(ctx: &mut ShellContext) -> ExecResult {
    let mut result = ExecResult::ok();
    for sub in std::mem::take(&mut ctx.substitutions.0) {
        drop(sub.end);
        if let Some(handle) = sub.output {
            if let Ok(out) = handle.join() {
                result.stdout.push_str(&out.stdout);
                result.stderr.push_str(&out.stderr);
            }
        }
    }
    result
}

// ============================================================================
// Field assembly
// ============================================================================

fn build_fields(ctx: &mut ShellContext, parts: &[WordPart], mode: Mode) -> Result<Vec<Field>, InterpreterError> {
    let mut builder = FieldBuilder::new();
    expand_parts(ctx, parts, false, mode, &mut builder)?;
    Ok(builder.finish())
}

fn expand_parts(
    ctx: &mut ShellContext,
    parts: &[WordPart],
    quoted: bool,
    mode: Mode,
    builder: &mut FieldBuilder,
) -> Result<(), InterpreterError> {
    for part in parts {
        expand_part(ctx, part, quoted, mode, builder)?;
    }
    Ok(())
}

fn expand_part(
    ctx: &mut ShellContext,
    part: &WordPart,
    quoted: bool,
    mode: Mode,
    builder: &mut FieldBuilder,
) -> Result<(), InterpreterError> {
    match part {
        WordPart::Literal(text) => {
            if quoted {
                builder.push_quoted(text);
            } else {
                let extended = ctx.zsh_opt("EXTENDED_GLOB");
                builder.push_unquoted_literal(text, has_glob_chars(text, extended));
            }
        }
        WordPart::SingleQuoted(text) | WordPart::Escaped(text) => builder.push_quoted(text),
        WordPart::DoubleQuoted(inner) => {
            // "$@" with no positional parameters produces no field at all
            if !is_bare_list(inner) {
                builder.force();
            }
            expand_parts(ctx, inner, true, mode, builder)?;
        }
        WordPart::Tilde(user) => {
            let home = expand_tilde(ctx, user.as_deref());
            builder.push_quoted(&home);
        }
        WordPart::Parameter(param) => {
            let value = expand_parameter(ctx, param, quoted, mode, builder)?;
            if let Some(value) = value {
                emit_value(ctx, value, quoted, mode, builder);
            }
        }
        WordPart::CommandSubstitution(sub) => {
            let text = command_substitution(ctx, &sub.body)?;
            push_result(ctx, &text, quoted, mode, true, builder);
        }
        WordPart::Arithmetic(text) => {
            let value = evaluate_arithmetic_text(ctx, text)?;
            push_result(ctx, &value.to_string(), quoted, mode, false, builder);
        }
        WordPart::ProcessSubstitution(sub) => {
            let path = process_substitution(ctx, sub)?;
            builder.push_quoted(&path);
        }
        WordPart::Brace(_) => {
            // Only reached where brace expansion does not apply
            let text = part.to_string();
            builder.push_unquoted_literal(&text, false);
        }
    }
    Ok(())
}

fn is_bare_list(parts: &[WordPart]) -> bool {
    match parts {
        [WordPart::Parameter(p)] => {
            let list = p.name == "@" || p.subscript.as_deref() == Some("@");
            list && !p.indirect && !matches!(p.op, Some(ParameterOp::Length))
        }
        _ => false,
    }
}

/// Append a substitution result. Command substitutions split on IFS
/// regardless of `SH_WORD_SPLIT`.
fn push_result(
    ctx: &ShellContext,
    text: &str,
    quoted: bool,
    mode: Mode,
    always_split: bool,
    builder: &mut FieldBuilder,
) {
    if quoted {
        builder.push_quoted(text);
        return;
    }
    let split = mode.split && (always_split || ctx.zsh_opt("SH_WORD_SPLIT"));
    let glob_active = mode.pattern || ctx.zsh_opt("GLOB_SUBST");
    builder.push_expansion(text, &ctx.ifs(), split, glob_active);
}

fn emit_value(ctx: &ShellContext, value: ParamValue, quoted: bool, mode: Mode, builder: &mut FieldBuilder) {
    match value {
        ParamValue::Scalar(v) => push_result(ctx, v.as_deref().unwrap_or(""), quoted, mode, false, builder),
        ParamValue::List { values, star } => {
            if quoted && star {
                let sep: String = ctx.ifs().chars().next().map(String::from).unwrap_or_default();
                builder.push_quoted(&values.join(&sep));
                return;
            }
            for (i, v) in values.iter().enumerate() {
                if i > 0 {
                    if quoted {
                        builder.break_field();
                    } else {
                        builder.end_field();
                    }
                }
                push_result(ctx, v, quoted, mode, false, builder);
            }
        }
    }
}

// ============================================================================
// Parameter expansion
// ============================================================================

fn is_list_subscript(subscript: Option<&str>) -> Option<bool> {
    match subscript {
        Some("@") => Some(false),
        Some("*") => Some(true),
        _ => None,
    }
}

/// Raw value of a parameter reference, before any operator
fn lookup(ctx: &mut ShellContext, name: &str, subscript: Option<&str>) -> Result<ParamValue, InterpreterError> {
    if name == "@" || name == "*" {
        return Ok(ParamValue::List {
            values: ctx.positional.clone(),
            star: name == "*",
        });
    }
    if let Some(star) = is_list_subscript(subscript) {
        let values = match ctx.array_values(name) {
            Some(values) => values,
            None => ctx.get_var(name).into_iter().collect(),
        };
        return Ok(ParamValue::List { values, star });
    }
    match subscript {
        Some(sub) => {
            if !ctx.is_array(name) {
                // A scalar behaves as a one-element array
                let key = subscript_key(ctx, name, sub)?;
                let value = if key == "0" || key == "-1" { ctx.get_var(name) } else { None };
                return Ok(ParamValue::Scalar(value));
            }
            let key = subscript_key(ctx, name, sub)?;
            let value = ctx.arrays.get(name).and_then(|a| a.get(&key).cloned());
            Ok(ParamValue::Scalar(value))
        }
        None => Ok(ParamValue::Scalar(ctx.get_var(name))),
    }
}

/// Split `name[sub]` as produced by an indirect reference
fn split_reference(reference: &str) -> (String, Option<String>) {
    if let Some(open) = reference.find('[') {
        if reference.ends_with(']') {
            return (
                reference[..open].to_string(),
                Some(reference[open + 1..reference.len() - 1].to_string()),
            );
        }
    }
    (reference.to_string(), None)
}

fn reference_text(param: &ParameterExpansion) -> String {
    match &param.subscript {
        Some(sub) => format!("{}[{}]", param.name, sub),
        None => param.name.clone(),
    }
}

/// Evaluate `${...}`. Operators that expand a word in place (`:-`, `:+`)
/// write into `builder` directly and return None.
fn expand_parameter(
    ctx: &mut ShellContext,
    param: &ParameterExpansion,
    quoted: bool,
    mode: Mode,
    builder: &mut FieldBuilder,
) -> Result<Option<ParamValue>, InterpreterError> {
    let (name, subscript) = if param.indirect {
        let target = lookup(ctx, &param.name, param.subscript.as_deref())?;
        let reference = match target {
            ParamValue::Scalar(v) => v.unwrap_or_default(),
            ParamValue::List { values, .. } => values.join(" "),
        };
        if reference.is_empty() {
            return Ok(Some(ParamValue::Scalar(None)));
        }
        split_reference(&reference)
    } else {
        (param.name.clone(), param.subscript.clone())
    };

    if matches!(param.op, Some(ParameterOp::Keys)) {
        let keys = ctx.arrays.get(&name).map(|a| a.keys()).unwrap_or_else(|| {
            if ctx.is_set(&name) {
                vec!["0".to_string()]
            } else {
                Vec::new()
            }
        });
        return Ok(Some(ParamValue::List {
            values: keys,
            star: subscript.as_deref() == Some("*"),
        }));
    }

    let value = lookup(ctx, &name, subscript.as_deref())?;
    let shown = if param.indirect {
        name.clone()
    } else {
        reference_text(param)
    };

    match &param.op {
        None => {
            check_nounset(ctx, &value, &shown)?;
            Ok(Some(value))
        }
        Some(ParameterOp::Length) => {
            check_nounset(ctx, &value, &shown)?;
            let len = match &value {
                ParamValue::Scalar(v) => v.as_deref().map_or(0, |s| s.chars().count()),
                ParamValue::List { values, .. } => values.len(),
            };
            Ok(Some(ParamValue::Scalar(Some(len.to_string()))))
        }
        Some(ParameterOp::Keys) => Ok(None),
        Some(ParameterOp::DefaultValue { word, check_empty }) => {
            if value.is_unset() || (*check_empty && value.is_empty()) {
                expand_parts(ctx, &word.parts, quoted, mode, builder)?;
                Ok(None)
            } else {
                Ok(Some(value))
            }
        }
        Some(ParameterOp::AssignDefault { word, check_empty }) => {
            if value.is_unset() || (*check_empty && value.is_empty()) {
                let assigned = expand_word_string(ctx, word)?;
                assign_default(ctx, &name, subscript.as_deref(), &assigned)?;
                Ok(Some(ParamValue::Scalar(Some(assigned))))
            } else {
                Ok(Some(value))
            }
        }
        Some(ParameterOp::ErrorIfUnset { word, check_empty }) => {
            if value.is_unset() || (*check_empty && value.is_empty()) {
                let message = match word {
                    Some(w) => expand_word_string(ctx, w)?,
                    None if *check_empty => "parameter null or not set".to_string(),
                    None => "parameter not set".to_string(),
                };
                return Err(ExpansionError::new(format!("{}: {}", shown, message)).into());
            }
            Ok(Some(value))
        }
        Some(ParameterOp::UseAlternative { word, check_empty }) => {
            let present = !value.is_unset() && !(*check_empty && value.is_empty());
            if present {
                expand_parts(ctx, &word.parts, quoted, mode, builder)?;
            }
            Ok(None)
        }
        Some(ParameterOp::Substring { offset, length }) => {
            check_nounset(ctx, &value, &shown)?;
            let offset = evaluate_arithmetic_text(ctx, offset)?.as_int();
            let length = match length {
                Some(l) => Some(evaluate_arithmetic_text(ctx, l)?.as_int()),
                None => None,
            };
            Ok(Some(match value {
                ParamValue::List { values, star } => {
                    // Positional slices count `$0` as element 0
                    let values = if name == "@" || name == "*" {
                        let mut all = vec![ctx.script_name.clone()];
                        all.extend(values);
                        all
                    } else {
                        values
                    };
                    ParamValue::List {
                        values: slice_values(&values, offset, length),
                        star,
                    }
                }
                scalar => scalar.map(|v| substring(v, offset, length)),
            }))
        }
        Some(ParameterOp::RemovePattern { pattern, side, greedy }) => {
            check_nounset(ctx, &value, &shown)?;
            let pat = expand_pattern(ctx, pattern)?;
            let compiled = compile_pattern(ctx, &pat);
            Ok(Some(value.map(|v| remove_pattern(v, &compiled, *side, *greedy))))
        }
        Some(ParameterOp::Replace { pattern, replacement, all, anchor }) => {
            check_nounset(ctx, &value, &shown)?;
            let pat = expand_pattern(ctx, pattern)?;
            let replacement = match replacement {
                Some(r) => expand_word_string(ctx, r)?,
                None => String::new(),
            };
            let compiled = compile_pattern(ctx, &pat);
            Ok(Some(value.map(|v| replace_pattern(v, &compiled, &replacement, *all, *anchor))))
        }
        Some(ParameterOp::CaseModify { upper, all }) => {
            check_nounset(ctx, &value, &shown)?;
            Ok(Some(value.map(|v| case_modify(v, *upper, *all))))
        }
    }
}

fn check_nounset(ctx: &ShellContext, value: &ParamValue, shown: &str) -> Result<(), InterpreterError> {
    if ctx.options.nounset && value.is_unset() {
        return Err(NounsetError::new(shown).into());
    }
    Ok(())
}

fn assign_default(
    ctx: &mut ShellContext,
    name: &str,
    subscript: Option<&str>,
    value: &str,
) -> Result<(), InterpreterError> {
    if !crate::parser::word_parser::is_identifier(name) {
        return Err(ExpansionError::new(format!("{}: cannot assign in this way", name)).into());
    }
    match subscript {
        Some(sub) if is_list_subscript(Some(sub)).is_none() => {
            let key = subscript_key(ctx, name, sub)?;
            ctx.set_array_element(name, &key, value.to_string())
        }
        _ => ctx.assign(name, value),
    }
}

// ============================================================================
// Globbing
// ============================================================================

fn glob_fields(ctx: &ShellContext, fields: Vec<Field>) -> Result<Vec<String>, InterpreterError> {
    let globbing = !ctx.options.noglob && ctx.zsh_opt("GLOB");
    let mut expander: Option<GlobExpander> = None;
    let mut out = Vec::new();
    for field in fields {
        if !globbing || !field.has_glob {
            out.push(field.text);
            continue;
        }
        let matches = expander
            .get_or_insert_with(|| GlobExpander::from_context(ctx))
            .expand(&field.pattern);
        if !matches.is_empty() {
            out.extend(matches);
        } else if ctx.zsh_opt("NULL_GLOB") {
            continue;
        } else if ctx.zsh_opt("NO_MATCH") {
            return Err(GlobError::new(field.text).into());
        } else {
            out.push(field.text);
        }
    }
    Ok(out)
}

// ============================================================================
// Command and process substitution
// ============================================================================

fn command_substitution(ctx: &mut ShellContext, body: &ScriptNode) -> Result<String, InterpreterError> {
    if let Some(target) = get_file_read_shorthand(body) {
        let path = expand_word_string(ctx, target)?;
        return match std::fs::read_to_string(ctx.resolve_path(&path)) {
            Ok(content) => {
                ctx.last_subst_status = Some(0);
                ctx.last_exit_code = 0;
                Ok(strip_trailing_newlines(content))
            }
            Err(_) => {
                ctx.expansion_stderr
                    .push_str(&format!("zshell: no such file or directory: {}\n", path));
                ctx.last_subst_status = Some(1);
                ctx.last_exit_code = 1;
                Ok(String::new())
            }
        };
    }

    let mut child = ctx.subshell();
    if !ctx.stdin.is_inherit() {
        child.stdin = Input::Empty;
    }
    let result = ExecutionEngine.run_isolated(&mut child, body);
    ctx.command_count = child.command_count;
    ctx.expansion_stderr.push_str(&result.stderr);
    // `$?` later in the same command line sees this status
    ctx.last_subst_status = Some(result.exit_code);
    ctx.last_exit_code = result.exit_code;
    Ok(strip_trailing_newlines(result.stdout))
}

/// Let a pipe end survive into spawned commands as `/dev/fd/N`
fn clear_cloexec(fd: i32) {
    // SAFETY: fd is an open descriptor owned by a live pipe end
    unsafe {
        libc::fcntl(fd, libc::F_SETFD, 0);
    }
}

fn process_substitution(ctx: &mut ShellContext, sub: &ProcessSubstitutionPart) -> Result<String, InterpreterError> {
    let (reader, writer) =
        os_pipe::pipe().map_err(|e| RuntimeError::new(format!("cannot create pipe: {}", e), 1))?;
    let mut child = ctx.subshell();
    child.stdin = Input::Empty;
    let body = sub.body.clone();

    match sub.direction {
        ProcessDirection::Input => {
            let fd = reader.as_raw_fd();
            clear_cloexec(fd);
            std::thread::spawn(move || {
                let result = ExecutionEngine.run_isolated(&mut child, &body);
                let mut writer = writer;
                let _ = writer.write_all(result.stdout.as_bytes());
            });
            ctx.substitutions.0.push(ProcessSubstitution {
                end: SubstitutionEnd::Reader(reader),
                output: None,
            });
            Ok(format!("/dev/fd/{}", fd))
        }
        ProcessDirection::Output => {
            let fd = writer.as_raw_fd();
            clear_cloexec(fd);
            let handle = std::thread::spawn(move || {
                let mut data = String::new();
                let mut reader = reader;
                let _ = reader.read_to_string(&mut data);
                child.stdin = Input::from_string(data);
                ExecutionEngine.run_isolated(&mut child, &body)
            });
            ctx.substitutions.0.push(ProcessSubstitution {
                end: SubstitutionEnd::Writer(writer),
                output: Some(handle),
            });
            Ok(format!("/dev/fd/{}", fd))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::word_parser::parse_word;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn ctx() -> ShellContext {
        ShellContext::new(PathBuf::from("/"), HashMap::new())
    }

    fn fields(ctx: &mut ShellContext, text: &str) -> Vec<String> {
        expand_word_fields(ctx, &parse_word(text).unwrap()).unwrap()
    }

    fn string(ctx: &mut ShellContext, text: &str) -> String {
        expand_word_string(ctx, &parse_word(text).unwrap()).unwrap()
    }

    #[test]
    fn test_quoting_and_splitting() {
        let mut c = ctx();
        c.set_var("x", "a b  c");
        assert_eq!(fields(&mut c, "$x"), vec!["a", "b", "c"]);
        assert_eq!(fields(&mut c, "\"$x\""), vec!["a b  c"]);
        assert_eq!(fields(&mut c, "'$x'"), vec!["$x"]);
        c.set_var("empty", "");
        assert!(fields(&mut c, "$empty").is_empty());
        assert_eq!(fields(&mut c, "\"$empty\""), vec![""]);
    }

    #[test]
    fn test_word_split_option() {
        let mut c = ctx();
        c.set_var("x", "a b");
        c.set_option("SH_WORD_SPLIT", false);
        assert_eq!(fields(&mut c, "$x"), vec!["a b"]);
    }

    #[test]
    fn test_positional_lists() {
        let mut c = ctx();
        c.positional = vec!["a b".into(), "".into(), "c".into()];
        assert_eq!(fields(&mut c, "\"$@\""), vec!["a b", "", "c"]);
        assert_eq!(fields(&mut c, "\"$*\""), vec!["a b  c"]);
        assert_eq!(fields(&mut c, "$@"), vec!["a", "b", "c"]);
        c.positional.clear();
        assert!(fields(&mut c, "\"$@\"").is_empty());
    }

    #[test]
    fn test_parameter_operators() {
        let mut c = ctx();
        c.set_var("path", "/usr/local/bin/tool.tar.gz");
        assert_eq!(string(&mut c, "${path##*/}"), "tool.tar.gz");
        assert_eq!(string(&mut c, "${path%%.*}"), "/usr/local/bin/tool");
        assert_eq!(string(&mut c, "${path/local/opt}"), "/usr/opt/bin/tool.tar.gz");
        assert_eq!(string(&mut c, "${#path}"), "26");
        assert_eq!(string(&mut c, "${unset:-fallback}"), "fallback");
        assert_eq!(string(&mut c, "${path:+set}"), "set");
        assert_eq!(string(&mut c, "${new:=assigned}"), "assigned");
        assert_eq!(c.get_var("new").as_deref(), Some("assigned"));
        assert_eq!(string(&mut c, "${path:1:3}"), "usr");
        assert_eq!(string(&mut c, "${path^^}"), "/USR/LOCAL/BIN/TOOL.TAR.GZ");
    }

    #[test]
    fn test_quoted_pattern_is_literal() {
        let mut c = ctx();
        c.set_var("v", "a*b*c");
        assert_eq!(string(&mut c, "${v#\"a*\"}"), "b*c");
        assert_eq!(string(&mut c, "${v#a*}"), "*b*c");
        assert_eq!(string(&mut c, "${v##a*}"), "");
    }

    #[test]
    fn test_error_if_unset() {
        let mut c = ctx();
        let err = expand_word_string(&mut c, &parse_word("${missing:?gone}").unwrap()).unwrap_err();
        assert!(err.stderr().contains("missing: gone"));
    }

    #[test]
    fn test_nounset() {
        let mut c = ctx();
        c.options.nounset = true;
        let err = expand_word_string(&mut c, &parse_word("$missing").unwrap()).unwrap_err();
        assert!(matches!(err, InterpreterError::Nounset(_)));
        assert_eq!(string(&mut c, "${missing:-ok}"), "ok");
    }

    #[test]
    fn test_arrays_and_indirect() {
        let mut c = ctx();
        c.set_array("arr", crate::interpreter::assoc_arrays::ShellArray::from_values(vec![
            "x".into(),
            "y".into(),
            "z".into(),
        ]))
        .unwrap();
        assert_eq!(string(&mut c, "${arr[1]}"), "y");
        assert_eq!(string(&mut c, "${#arr[@]}"), "3");
        assert_eq!(fields(&mut c, "\"${arr[@]}\""), vec!["x", "y", "z"]);
        assert_eq!(fields(&mut c, "${!arr[@]}"), vec!["0", "1", "2"]);
        c.set_var("ref", "target");
        c.set_var("target", "value");
        assert_eq!(string(&mut c, "${!ref}"), "value");
    }

    #[test]
    fn test_arithmetic_and_braces() {
        let mut c = ctx();
        c.set_var("n", "4");
        assert_eq!(string(&mut c, "$((n * 2 + $n))"), "12");
        assert_eq!(fields(&mut c, "f{a,b}{1..2}"), vec!["fa1", "fa2", "fb1", "fb2"]);
        let err = expand_word_string(&mut c, &parse_word("$((1/0))").unwrap()).unwrap_err();
        assert!(matches!(err, InterpreterError::Arithmetic(_)));
    }

    #[test]
    fn test_globbing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("one.txt"), "").unwrap();
        std::fs::write(dir.path().join("two.txt"), "").unwrap();
        let mut c = ShellContext::new(dir.path().to_path_buf(), HashMap::new());
        assert_eq!(fields(&mut c, "*.txt"), vec!["one.txt", "two.txt"]);
        assert_eq!(fields(&mut c, "\"*.txt\""), vec!["*.txt"]);
        assert_eq!(fields(&mut c, "*.none"), vec!["*.none"]);
        c.set_option("NULL_GLOB", true);
        assert!(fields(&mut c, "*.none").is_empty());
        c.set_option("NULL_GLOB", false);
        c.set_option("NO_MATCH", true);
        assert!(expand_word_fields(&mut c, &parse_word("*.none").unwrap()).is_err());
        c.set_var("pat", "*.txt");
        c.set_option("NO_MATCH", false);
        assert_eq!(fields(&mut c, "$pat"), vec!["*.txt"]);
        c.set_option("GLOB_SUBST", true);
        assert_eq!(fields(&mut c, "$pat"), vec!["one.txt", "two.txt"]);
    }

    #[test]
    fn test_command_substitution() {
        let mut c = ctx();
        assert_eq!(string(&mut c, "$(echo hi; echo there)"), "hi\nthere");
        assert_eq!(fields(&mut c, "$(echo a b)"), vec!["a", "b"]);
        assert_eq!(c.last_subst_status, Some(0));
        assert_eq!(string(&mut c, "$(false)$?"), "1");
        assert_eq!(string(&mut c, "$(exit 3)$? $(true)$?"), "3 0");
    }
}

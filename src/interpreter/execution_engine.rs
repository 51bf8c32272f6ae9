//! Execution Engine
//!
//! Walks the AST against a `ShellContext`:
//!
//! execute_script -> execute_statement -> execute_pipeline -> execute_command
//!
//! Output of in-process commands is accumulated into `ExecResult` strings.
//! Control flow (`break`, `return`, `exit`, errexit) travels as
//! `InterpreterError` values that carry the output produced so far.

use crate::ast::types::{
    CommandNode, CompoundCommandNode, RedirectionNode, ScriptNode, StatementNode, StatementOperator,
};
use crate::interpreter::command_resolution::execute_simple_command;
use crate::interpreter::conditionals::execute_conditional_command;
use crate::interpreter::control_flow::{
    execute_arith_command, execute_arith_for, execute_case, execute_for, execute_if, execute_while,
};
use crate::interpreter::errors::{ErrexitError, ExecutionLimitError, InterpreterError, LimitType};
use crate::interpreter::pipeline_execution::execute_pipeline;
use crate::interpreter::redirections::{apply_redirections, install_stdin, route_result, RedirectPlan};
use crate::interpreter::subshell_group::{execute_group, execute_subshell, spawn_background};
use crate::interpreter::traps::{run_exit_trap, run_trap};
use crate::interpreter::types::{ExecResult, ShellContext};

/// Stateless driver; all state lives in the context it is handed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionEngine;

impl ExecutionEngine {
    /// Execute a complete script.
    pub fn execute_script(&self, ctx: &mut ShellContext, script: &ScriptNode) -> Result<ExecResult, InterpreterError> {
        self.execute_statements(ctx, &script.statements)
    }

    /// Run a script to completion in a context of its own (subshells,
    /// command substitution, background jobs). Every error becomes an exit
    /// status and the context's EXIT trap runs at the end.
    pub fn run_isolated(&self, ctx: &mut ShellContext, script: &ScriptNode) -> ExecResult {
        self.run_isolated_statements(ctx, &script.statements)
    }

    /// `run_isolated` for a bare statement list (subshell bodies)
    pub fn run_isolated_statements(&self, ctx: &mut ShellContext, statements: &[StatementNode]) -> ExecResult {
        let mut result = match self.execute_statements(ctx, statements) {
            Ok(r) => r,
            Err(e) => ExecResult::new(e.stdout().to_string(), e.stderr().to_string(), e.exit_code()),
        };
        ctx.last_exit_code = result.exit_code;
        let trap = run_exit_trap(ctx);
        result.stdout.push_str(&trap.stdout);
        result.stderr.push_str(&trap.stderr);
        result
    }

    /// Execute a statement list, stopping at the first error.
    pub fn execute_statements(
        &self,
        ctx: &mut ShellContext,
        statements: &[StatementNode],
    ) -> Result<ExecResult, InterpreterError> {
        let mut out = ExecResult::new(String::new(), String::new(), ctx.last_exit_code);
        for statement in statements {
            if ctx.is_cancelled() {
                break;
            }
            match self.execute_statement(ctx, statement) {
                Ok(r) => out.append(r),
                Err(e) => return Err(e.prepend_output(&out.stdout, &out.stderr)),
            }
        }
        Ok(out)
    }

    /// Execute one and-or list, in the background when it ends with `&`.
    pub fn execute_statement(
        &self,
        ctx: &mut ShellContext,
        statement: &StatementNode,
    ) -> Result<ExecResult, InterpreterError> {
        ctx.current_line = statement.line;
        let mut echoed = String::new();
        if ctx.options.verbose && !statement.source_text.is_empty() {
            echoed = format!("{}\n", statement.source_text);
        }
        if ctx.options.noexec {
            return Ok(ExecResult::new(String::new(), echoed, ctx.last_exit_code));
        }
        let result = if statement.background {
            spawn_background(ctx, statement)
        } else {
            self.execute_and_or(ctx, statement)
        };
        match result {
            Ok(mut r) => {
                r.stderr.insert_str(0, &echoed);
                Ok(r)
            }
            Err(e) => Err(e.prepend_output("", &echoed)),
        }
    }

    fn execute_and_or(&self, ctx: &mut ShellContext, statement: &StatementNode) -> Result<ExecResult, InterpreterError> {
        let mut out = ExecResult::new(String::new(), String::new(), ctx.last_exit_code);
        let last = statement.pipelines.len().saturating_sub(1);
        let mut final_ran = false;

        for (i, pipeline) in statement.pipelines.iter().enumerate() {
            if i > 0 {
                let run = match statement.operators.get(i - 1) {
                    Some(StatementOperator::And) => ctx.last_exit_code == 0,
                    Some(StatementOperator::Or) => ctx.last_exit_code != 0,
                    None => true,
                };
                if !run {
                    continue;
                }
            }

            // Everything but the final member is a condition
            let guarded = i < last;
            if guarded {
                ctx.condition_depth += 1;
            }
            let result = execute_pipeline(ctx, pipeline);
            if guarded {
                ctx.condition_depth -= 1;
            }

            let result = match result {
                Ok(r) => r,
                Err(mut e) if e.is_command_failure() => {
                    let (stdout, stderr) = e.take_output();
                    ExecResult::new(stdout, stderr, e.exit_code())
                }
                Err(e) => return Err(e.prepend_output(&out.stdout, &out.stderr)),
            };
            ctx.last_exit_code = result.exit_code;
            out.append(result);
            final_ran = i == last && !pipeline.negated;
        }

        if final_ran && out.exit_code != 0 && ctx.condition_depth == 0 {
            let status = out.exit_code;
            let trap = run_trap(ctx, "ERR")?;
            out.stdout.push_str(&trap.stdout);
            out.stderr.push_str(&trap.stderr);
            ctx.last_exit_code = status;
            out.exit_code = status;
            if ctx.options.errexit {
                return Err(ErrexitError::new(status, out.stdout, out.stderr).into());
            }
        }
        Ok(out)
    }

    /// Execute a single command of a pipeline.
    pub fn execute_command(&self, ctx: &mut ShellContext, command: &CommandNode) -> Result<ExecResult, InterpreterError> {
        ctx.command_count += 1;
        if ctx.command_count > ctx.limits.max_command_count {
            return Err(ExecutionLimitError::new(
                format!("too many commands executed (>{})", ctx.limits.max_command_count),
                LimitType::Commands,
            )
            .into());
        }

        let result = match command {
            CommandNode::Simple(simple) => execute_simple_command(ctx, simple),
            CommandNode::Compound(compound) => self.execute_compound_command(ctx, compound),
            CommandNode::FunctionDef(def) => {
                ctx.functions.insert(def.name.clone(), def.clone());
                Ok(ExecResult::ok())
            }
        };

        // stderr of command substitutions run while expanding
        let diagnostics = std::mem::take(&mut ctx.expansion_stderr);
        if diagnostics.is_empty() {
            return result;
        }
        match result {
            Ok(mut r) => {
                r.stderr.insert_str(0, &diagnostics);
                Ok(r)
            }
            Err(e) => Err(e.prepend_output("", &diagnostics)),
        }
    }

    /// Execute a compound command with its own redirections applied.
    pub fn execute_compound_command(
        &self,
        ctx: &mut ShellContext,
        compound: &CompoundCommandNode,
    ) -> Result<ExecResult, InterpreterError> {
        self.execute_with_redirections(ctx, compound.redirections(), |ctx| {
            self.execute_compound_body(ctx, compound)
        })
    }

    /// Run `body` with `redirections` in effect: stdin is swapped in for
    /// its duration and its captured output is routed afterwards.
    pub fn execute_with_redirections<F>(
        &self,
        ctx: &mut ShellContext,
        redirections: &[RedirectionNode],
        body: F,
    ) -> Result<ExecResult, InterpreterError>
    where
        F: FnOnce(&mut ShellContext) -> Result<ExecResult, InterpreterError>,
    {
        if redirections.is_empty() {
            return body(ctx);
        }

        let plan = apply_redirections(ctx, RedirectPlan::default(), redirections)?;
        let saved_stdin = install_stdin(ctx, &plan);
        let result = body(ctx);
        if let Some(stdin) = saved_stdin {
            ctx.stdin = stdin;
        }
        route_result(&plan, result)
    }

    fn execute_compound_body(
        &self,
        ctx: &mut ShellContext,
        compound: &CompoundCommandNode,
    ) -> Result<ExecResult, InterpreterError> {
        match compound {
            CompoundCommandNode::If(node) => execute_if(ctx, node),
            CompoundCommandNode::For(node) => execute_for(ctx, node),
            CompoundCommandNode::ArithFor(node) => execute_arith_for(ctx, node),
            CompoundCommandNode::While(node) => execute_while(ctx, node),
            CompoundCommandNode::Case(node) => execute_case(ctx, node),
            CompoundCommandNode::Subshell(node) => execute_subshell(ctx, node),
            CompoundCommandNode::Group(node) => execute_group(ctx, node),
            CompoundCommandNode::Arithmetic(node) => execute_arith_command(ctx, node),
            CompoundCommandNode::Conditional(node) => execute_conditional_command(ctx, node),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Shell
//!
//! The embedding API: build a `Shell` from a `ShellConfig`, run scripts
//! with `exec`, and use the completion, history and prompt collaborators
//! an interactive front end needs. State persists across `exec` calls.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::interpreter::builtin_dispatch::builtin_names;
use crate::interpreter::completion::{CompletionProvider, CompletionRequest, CompletionSources};
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::expansion::prompt;
use crate::interpreter::helpers::script::{parse_with_aliases, syntax_error_message};
use crate::interpreter::history::{HistoryEntry, HistoryPolicy, DEFAULT_HISTSIZE};
use crate::interpreter::jobs::format_job;
use crate::interpreter::traps::run_exit_trap;
use crate::interpreter::{ExecResult, ExecutionEngine, ExecutionLimits, Input, ShellContext};

/// Stack for the thread the engine runs on; deep recursion must hit the
/// call depth limit first
const ENGINE_STACK_SIZE: usize = 256 * 1024 * 1024;

/// Options for creating a `Shell`.
#[derive(Debug, Clone, Default)]
pub struct ShellConfig {
    /// Initial variables, all exported. Defaults fill in what is missing.
    pub env: HashMap<String, String>,
    /// Working directory (default: the process's cwd)
    pub cwd: Option<PathBuf>,
    /// Options to turn on, POSIX or ZSH spelling (`errexit`, `NO_UNSET`)
    pub options: Vec<String>,
    pub limits: ExecutionLimits,
    /// `$1`, `$2`, ...
    pub args: Vec<String>,
    /// `$0`
    pub script_name: Option<String>,
    /// Let scripts read the process's stdin
    pub inherit_stdin: bool,
}

/// Per-call overrides for `Shell::exec`.
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    /// Variables visible for this call only
    pub env: HashMap<String, String>,
    /// Working directory for this call only
    pub cwd: Option<PathBuf>,
    /// Data the script reads as stdin
    pub stdin: Option<String>,
}

pub struct Shell {
    ctx: ShellContext,
    /// Set once `exit` ran; later scripts are not executed
    exited: Option<i32>,
}

impl Shell {
    /// Unknown option names in `config.options` are skipped; use
    /// `is_option_name` to validate them first.
    pub fn new(config: ShellConfig) -> Self {
        let cwd = config
            .cwd
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("/"));

        let mut env = default_env(&cwd);
        env.extend(config.env);

        let mut ctx = ShellContext::new(cwd, env);
        ctx.limits = config.limits;
        ctx.positional = config.args;
        if let Some(name) = config.script_name {
            ctx.script_name = name;
        }
        if config.inherit_stdin {
            ctx.stdin = Input::Inherit;
        }
        for name in &config.options {
            ctx.set_option(name, true);
        }
        if let Some(size) = ctx.get_var("HISTSIZE").and_then(|s| s.parse().ok()) {
            if let Ok(mut history) = ctx.history.lock() {
                history.set_max_size(size);
            }
        }

        Self { ctx, exited: None }
    }

    /// Execute a script. Output of background jobs that finished meanwhile
    /// is appended to the result.
    pub async fn exec(&mut self, script: &str, options: Option<ExecOptions>) -> ExecResult {
        if let Some(code) = self.exited {
            return ExecResult::new(String::new(), String::new(), code);
        }
        if script.trim().is_empty() {
            return ExecResult::new(String::new(), String::new(), self.ctx.last_exit_code);
        }

        let ast = match parse_with_aliases(&self.ctx, script) {
            Ok(ast) => ast,
            Err(e) => {
                self.ctx.last_exit_code = 2;
                return ExecResult::new(String::new(), syntax_error_message(&e), 2);
            }
        };

        let options = options.unwrap_or_default();
        let saved = self.apply_overrides(&options);
        self.ctx.command_count = 0;

        let ctx = &mut self.ctx;
        let (mut result, exited) = tokio::task::block_in_place(|| run_on_engine_thread(ctx, &ast));

        self.restore_overrides(saved);
        if exited {
            self.exited = Some(result.exit_code);
        }
        self.ctx.last_exit_code = result.exit_code;

        let finished = self.reap_jobs();
        result.stdout.push_str(&finished.stdout);
        result.stderr.push_str(&finished.stderr);
        result
    }

    /// Run the EXIT trap if it has not run yet. Call once the caller is
    /// done with the shell.
    pub fn finish(&mut self) -> ExecResult {
        let status = self.exited.unwrap_or(self.ctx.last_exit_code);
        let mut result = run_exit_trap(&mut self.ctx);
        result.exit_code = status;
        self.exited = Some(status);
        result
    }

    /// Whether the last script ended with `exit`
    pub fn has_exited(&self) -> bool {
        self.exited.is_some()
    }

    pub fn context(&self) -> &ShellContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut ShellContext {
        &mut self.ctx
    }

    pub fn get_cwd(&self) -> &std::path::Path {
        &self.ctx.cwd
    }

    pub fn get_var(&self, name: &str) -> Option<String> {
        self.ctx.get_var(name)
    }

    // ------------------------------------------------------------------------
    // Completion
    // ------------------------------------------------------------------------

    pub fn register_completion(&mut self, command: impl Into<String>, provider: CompletionProvider) {
        self.ctx.completion.register(command, provider);
    }

    /// Candidates for the word under the cursor
    pub fn get_completions(
        &self,
        command: &str,
        args: &[String],
        current_word: &str,
        word_index: usize,
    ) -> Vec<String> {
        let request = CompletionRequest {
            command: command.to_string(),
            args: args.to_vec(),
            current_word: current_word.to_string(),
            word_index,
        };
        let mut variables: Vec<String> = self.ctx.vars.keys().cloned().collect();
        variables.extend(self.ctx.arrays.names());
        let sources = CompletionSources {
            builtins: builtin_names().into_iter().map(String::from).collect(),
            functions: self.ctx.functions.keys().cloned().collect(),
            aliases: self.ctx.aliases.keys().cloned().collect(),
            variables,
        };
        self.ctx.completion.complete(&request, &sources)
    }

    // ------------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------------

    /// Record a command line. Returns false when it was suppressed by
    /// `HIST_IGNORE_DUPS` or `HIST_IGNORE_SPACE`.
    pub fn add_to_history(&mut self, command: &str, exit_code: Option<i32>) -> bool {
        let policy = HistoryPolicy {
            ignore_dups: self.ctx.zsh_opt("HIST_IGNORE_DUPS"),
            ignore_space: self.ctx.zsh_opt("HIST_IGNORE_SPACE"),
        };
        let max_size = self
            .ctx
            .get_var("HISTSIZE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_HISTSIZE);
        match self.ctx.history.lock() {
            Ok(mut history) => {
                history.set_max_size(max_size);
                history.add(command, exit_code, policy)
            }
            Err(_) => false,
        }
    }

    pub fn get_history_entries(&self) -> Vec<HistoryEntry> {
        self.ctx
            .history
            .lock()
            .map(|h| h.entries().to_vec())
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------------
    // Prompt
    // ------------------------------------------------------------------------

    /// Expand a prompt string such as `$PS1`
    pub fn expand_prompt(&self, ps: &str) -> String {
        prompt::expand_prompt(&self.ctx, ps)
    }

    fn apply_overrides(&mut self, options: &ExecOptions) -> Saved {
        let mut saved = Saved {
            vars: Vec::new(),
            cwd: None,
            stdin: None,
        };
        for (name, value) in &options.env {
            saved.vars.push((name.clone(), self.ctx.vars.get(name).cloned()));
            self.ctx.set_var(name, value.clone());
        }
        if let Some(cwd) = &options.cwd {
            let dir = self.ctx.resolve_path(&cwd.to_string_lossy());
            saved.cwd = Some(self.ctx.cwd.clone());
            self.ctx.set_var("PWD", dir.to_string_lossy().into_owned());
        }
        if let Some(data) = &options.stdin {
            saved.stdin = Some(std::mem::replace(&mut self.ctx.stdin, Input::from_string(data.clone())));
        }
        saved
    }

    fn restore_overrides(&mut self, saved: Saved) {
        for (name, old) in saved.vars.into_iter().rev() {
            match old {
                Some(value) => {
                    self.ctx.vars.insert(name, value);
                }
                None => {
                    self.ctx.vars.remove(&name);
                }
            }
        }
        if let Some(cwd) = saved.cwd {
            let pwd = cwd.to_string_lossy().into_owned();
            self.ctx.cwd = cwd;
            self.ctx.vars.insert("PWD".to_string(), pwd);
        }
        if let Some(stdin) = saved.stdin {
            self.ctx.stdin = stdin;
        }
    }

    /// Collect finished background jobs
    fn reap_jobs(&mut self) -> ExecResult {
        let mut out = ExecResult::ok();
        let finished = match self.ctx.jobs.lock() {
            Ok(mut jobs) => jobs.reap(),
            Err(_) => return out,
        };
        for (info, stdout, stderr) in finished {
            out.stdout.push_str(&stdout);
            out.stderr.push_str(&stderr);
            if self.ctx.options.monitor {
                out.stderr.push_str(&format_job(&info, false, false));
            }
        }
        out
    }
}

/// State replaced for a single `exec` call
struct Saved {
    vars: Vec<(String, Option<String>)>,
    cwd: Option<PathBuf>,
    stdin: Option<Input>,
}

/// Whether `name` is a POSIX or ZSH option name `Shell::new` accepts
pub fn is_option_name(name: &str) -> bool {
    ShellContext::default().set_option(name, true)
}

fn default_env(cwd: &std::path::Path) -> HashMap<String, String> {
    let pwd = cwd.to_string_lossy().into_owned();
    let mut env = HashMap::new();
    env.insert("HOME".to_string(), std::env::var("HOME").unwrap_or_else(|_| "/".to_string()));
    env.insert("PATH".to_string(), "/usr/local/bin:/usr/bin:/bin".to_string());
    env.insert("SHELL".to_string(), "/bin/zsh".to_string());
    env.insert("OLDPWD".to_string(), pwd);
    env.insert("HISTSIZE".to_string(), DEFAULT_HISTSIZE.to_string());
    env.insert("PS1".to_string(), "%n@%m %~ %# ".to_string());
    env.insert("PS2".to_string(), "> ".to_string());
    env
}

/// Run `ast` on a thread with a large stack. Returns the result and
/// whether the script called `exit`.
fn run_on_engine_thread(ctx: &mut ShellContext, ast: &crate::ast::types::ScriptNode) -> (ExecResult, bool) {
    std::thread::scope(|scope| {
        let spawned = std::thread::Builder::new()
            .name("zshell-engine".to_string())
            .stack_size(ENGINE_STACK_SIZE)
            .spawn_scoped(scope, || run_script(ctx, ast));
        match spawned {
            Ok(handle) => handle.join().unwrap_or_else(|_| {
                (ExecResult::failure("zshell: internal error: engine thread panicked\n"), false)
            }),
            Err(e) => (ExecResult::failure(format!("zshell: cannot start engine thread: {}\n", e)), false),
        }
    })
}

fn run_script(ctx: &mut ShellContext, ast: &crate::ast::types::ScriptNode) -> (ExecResult, bool) {
    match ExecutionEngine.execute_script(ctx, ast) {
        Ok(result) => (result, false),
        Err(InterpreterError::Exit(e)) => {
            ctx.last_exit_code = e.exit_code;
            let mut result = ExecResult::new(e.stdout, e.stderr, e.exit_code);
            let trap = run_exit_trap(ctx);
            result.stdout.push_str(&trap.stdout);
            result.stderr.push_str(&trap.stderr);
            (result, true)
        }
        Err(e) => {
            let code = e.exit_code();
            (ExecResult::new(e.stdout().to_string(), e.stderr().to_string(), code), false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell() -> Shell {
        Shell::new(ShellConfig {
            cwd: Some(std::env::temp_dir()),
            ..Default::default()
        })
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_exec_echo() {
        let mut sh = shell();
        let r = sh.exec("echo hello world", None).await;
        assert_eq!(r.stdout, "hello world\n");
        assert_eq!(r.exit_code, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_exec_empty() {
        let mut sh = shell();
        let r = sh.exec("   \n", None).await;
        assert_eq!(r.exit_code, 0);
        assert!(r.stdout.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_syntax_error() {
        let mut sh = shell();
        let r = sh.exec("if then", None).await;
        assert_eq!(r.exit_code, 2);
        assert!(r.stderr.starts_with("zshell: syntax error"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_state_persists_between_calls() {
        let mut sh = shell();
        sh.exec("x=42; f() { echo f$1; }", None).await;
        let r = sh.exec("echo $x; f 1", None).await;
        assert_eq!(r.stdout, "42\nf1\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_properties() {
        let mut sh = shell();
        let cases = [
            ("echo \"Sum: $((2 + 3))\"", "Sum: 5\n"),
            ("for i in 1 2 3; do echo $i; done", "1\n2\n3\n"),
            ("echo {1..3}; echo {a,b}", "1 2 3\na b\n"),
            ("case x in x) echo A;; x) echo B;; esac", "A\n"),
            ("(X=1); echo \"[$X]\"", "[]\n"),
            ("{ Y=1; }; echo $Y", "1\n"),
            ("false && echo no; true || echo no", ""),
            ("echo '$HOME'", "$HOME\n"),
        ];
        for (script, expected) in cases {
            let r = sh.exec(script, None).await;
            assert_eq!(r.stdout, expected, "script: {}", script);
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_pipeline_status() {
        let mut sh = shell();
        assert_eq!(sh.exec("false | true", None).await.exit_code, 0);
        assert_eq!(sh.exec("true | false", None).await.exit_code, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_errexit() {
        let mut sh = shell();
        let r = sh.exec("set -e; false; echo reached", None).await;
        assert_eq!(r.stdout, "");
        assert_ne!(r.exit_code, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_division_by_zero() {
        let mut sh = shell();
        let r = sh.exec("echo $((5/0))", None).await;
        assert_ne!(r.exit_code, 0);
        assert!(r.stderr.contains("division by zero"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_background_pid() {
        let mut sh = shell();
        let start = std::time::Instant::now();
        let r = sh.exec("sleep 1 & echo $!", None).await;
        assert!(start.elapsed() < std::time::Duration::from_millis(500));
        let pid: u32 = r.stdout.trim().parse().unwrap();
        assert!(pid > 0);
        sh.exec("kill %1", None).await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_process_substitution() {
        let mut sh = shell();
        let r = sh.exec("cat <(echo ps)", None).await;
        assert_eq!(r.stdout, "ps\n");
        assert_eq!(r.exit_code, 0);
        let r = sh.exec("echo x > >(cat)", None).await;
        assert!(r.stdout.contains('x'), "{:?}", r);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_exit_stops_later_scripts_and_runs_trap() {
        let mut sh = shell();
        let r = sh.exec("trap 'echo bye' EXIT; echo hi; exit 3; echo no", None).await;
        assert_eq!(r.stdout, "hi\nbye\n");
        assert_eq!(r.exit_code, 3);
        assert!(sh.has_exited());
        let r = sh.exec("echo again", None).await;
        assert_eq!(r.stdout, "");
        assert_eq!(r.exit_code, 3);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_finish_runs_exit_trap() {
        let mut sh = shell();
        sh.exec("trap 'echo done' EXIT; false", None).await;
        let r = sh.finish();
        assert_eq!(r.stdout, "done\n");
        assert_eq!(r.exit_code, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_exec_options_are_scoped() {
        let mut sh = shell();
        let mut env = HashMap::new();
        env.insert("ONLY_HERE".to_string(), "1".to_string());
        let options = ExecOptions {
            env,
            cwd: Some(PathBuf::from("/")),
            stdin: Some("line\n".to_string()),
        };
        let r = sh.exec("read v; echo $v $ONLY_HERE $PWD", Some(options)).await;
        assert_eq!(r.stdout, "line 1 /\n");
        let r = sh.exec("echo \"[$ONLY_HERE]\"", None).await;
        assert_eq!(r.stdout, "[]\n");
        assert_eq!(sh.get_cwd(), std::env::temp_dir().as_path());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_config_args_and_options() {
        let mut sh = Shell::new(ShellConfig {
            cwd: Some(std::env::temp_dir()),
            args: vec!["a".into(), "b".into()],
            script_name: Some("demo".into()),
            options: vec!["nounset".into()],
            ..Default::default()
        });
        let r = sh.exec("echo $0 $# $2", None).await;
        assert_eq!(r.stdout, "demo 2 b\n");
        let r = sh.exec("echo $undefined_thing", None).await;
        assert_ne!(r.exit_code, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_command_limit() {
        let mut sh = Shell::new(ShellConfig {
            cwd: Some(std::env::temp_dir()),
            limits: ExecutionLimits {
                max_command_count: 10,
                ..Default::default()
            },
            ..Default::default()
        });
        let r = sh.exec("while true; do :; done", None).await;
        assert_eq!(r.exit_code, 126);
        // the count starts over for each call
        let r = sh.exec("echo ok", None).await;
        assert_eq!(r.stdout, "ok\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_completions() {
        let mut sh = shell();
        sh.exec("greet() { :; }; alias gs='echo'; GREETING=hi", None).await;
        sh.register_completion("git", CompletionProvider::Words(vec!["status".into(), "stash".into()]));

        let names = sh.get_completions("", &[], "gre", 0);
        assert!(names.contains(&"greet".to_string()));
        let vars = sh.get_completions("echo", &[], "$GREE", 1);
        assert_eq!(vars, vec!["$GREETING".to_string()]);
        let words = sh.get_completions("git", &[], "st", 1);
        assert_eq!(words, vec!["stash".to_string(), "status".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_history_policy() {
        let mut sh = shell();
        sh.exec("setopt hist_ignore_dups hist_ignore_space; HISTSIZE=2", None).await;
        assert!(sh.add_to_history("ls", Some(0)));
        assert!(!sh.add_to_history("ls", Some(0)));
        assert!(!sh.add_to_history(" secret", None));
        assert!(sh.add_to_history("pwd", Some(0)));
        assert!(sh.add_to_history("date", Some(0)));
        let commands: Vec<String> = sh.get_history_entries().into_iter().map(|e| e.command).collect();
        assert_eq!(commands, vec!["pwd".to_string(), "date".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_expand_prompt() {
        let mut sh = shell();
        sh.exec("false", None).await;
        assert_eq!(sh.expand_prompt("%? %% %j"), "1 % 0");
    }

    #[test]
    fn test_option_names() {
        assert!(is_option_name("errexit"));
        assert!(is_option_name("NO_UNSET"));
        assert!(!is_option_name("bogus"));
    }
}

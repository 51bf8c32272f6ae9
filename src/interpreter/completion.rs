//! Completion Registry
//!
//! Per-command completion providers plus the fallbacks used when no
//! provider is registered: command names in command position and
//! parameter names after `$`. Filesystem candidates are left to the
//! embedding line editor.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// What is being completed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub command: String,
    pub args: Vec<String>,
    pub current_word: String,
    /// Index of the word under the cursor, 0 for the command name
    pub word_index: usize,
}

pub type CompletionFn = Arc<dyn Fn(&CompletionRequest) -> Vec<String> + Send + Sync>;

#[derive(Clone)]
pub enum CompletionProvider {
    /// Fixed candidate list, filtered by prefix
    Words(Vec<String>),
    /// Computed candidates; returned as-is
    Function(CompletionFn),
}

impl fmt::Debug for CompletionProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionProvider::Words(w) => f.debug_tuple("Words").field(w).finish(),
            CompletionProvider::Function(_) => f.write_str("Function(..)"),
        }
    }
}

/// Names the fallbacks draw from, snapshotted from the shell state
#[derive(Debug, Clone, Default)]
pub struct CompletionSources {
    pub builtins: Vec<String>,
    pub functions: Vec<String>,
    pub aliases: Vec<String>,
    pub variables: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CompletionRegistry {
    providers: HashMap<String, CompletionProvider>,
}

impl CompletionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, command: impl Into<String>, provider: CompletionProvider) {
        self.providers.insert(command.into(), provider);
    }

    pub fn register_words(&mut self, command: impl Into<String>, words: Vec<String>) {
        self.register(command, CompletionProvider::Words(words));
    }

    pub fn unregister(&mut self, command: &str) -> bool {
        self.providers.remove(command).is_some()
    }

    pub fn has_provider(&self, command: &str) -> bool {
        self.providers.contains_key(command)
    }

    /// Sorted, de-duplicated candidates for a request
    pub fn complete(&self, request: &CompletionRequest, sources: &CompletionSources) -> Vec<String> {
        let prefix = request.current_word.as_str();

        if let Some(var_prefix) = prefix.strip_prefix('$') {
            let var_prefix = var_prefix.trim_start_matches('{');
            return finish(
                sources
                    .variables
                    .iter()
                    .filter(|v| v.starts_with(var_prefix))
                    .map(|v| format!("${}", v))
                    .collect(),
            );
        }

        if request.word_index == 0 {
            let names = sources
                .builtins
                .iter()
                .chain(sources.functions.iter())
                .chain(sources.aliases.iter())
                .chain(self.providers.keys())
                .filter(|n| n.starts_with(prefix))
                .cloned()
                .collect();
            return finish(names);
        }

        match self.providers.get(&request.command) {
            Some(CompletionProvider::Words(words)) => {
                finish(words.iter().filter(|w| w.starts_with(prefix)).cloned().collect())
            }
            Some(CompletionProvider::Function(f)) => f(request),
            None => Vec::new(),
        }
    }
}

fn finish(mut names: Vec<String>) -> Vec<String> {
    names.sort();
    names.dedup();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(command: &str, word: &str, index: usize) -> CompletionRequest {
        CompletionRequest {
            command: command.to_string(),
            args: Vec::new(),
            current_word: word.to_string(),
            word_index: index,
        }
    }

    fn sources() -> CompletionSources {
        CompletionSources {
            builtins: vec!["echo".into(), "export".into(), "cd".into()],
            functions: vec!["extract".into()],
            aliases: vec!["ll".into()],
            variables: vec!["HOME".into(), "HISTSIZE".into(), "PATH".into()],
        }
    }

    #[test]
    fn test_command_position() {
        let reg = CompletionRegistry::new();
        assert_eq!(reg.complete(&request("", "ex", 0), &sources()), vec!["export", "extract"]);
    }

    #[test]
    fn test_variables() {
        let reg = CompletionRegistry::new();
        assert_eq!(reg.complete(&request("echo", "$H", 1), &sources()), vec!["$HISTSIZE", "$HOME"]);
    }

    #[test]
    fn test_providers() {
        let mut reg = CompletionRegistry::new();
        reg.register_words("git", vec!["commit".into(), "checkout".into(), "push".into()]);
        reg.register(
            "make",
            CompletionProvider::Function(Arc::new(|req: &CompletionRequest| vec![format!("{}-target", req.current_word)])),
        );
        assert_eq!(reg.complete(&request("git", "c", 1), &sources()), vec!["checkout", "commit"]);
        assert_eq!(reg.complete(&request("make", "all", 1), &sources()), vec!["all-target"]);
        assert!(reg.complete(&request("unknown", "x", 1), &sources()).is_empty());
    }
}

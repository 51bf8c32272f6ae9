//! read - Read a line from standard input into variables
//!
//! read [-rs] [-p prompt] [-a array] [-d delim] [-n count] [name[?prompt]] [name ...]
//!
//! The line is split on IFS; the last name receives the rest of the line.
//! Without names the line goes to REPLY. Without `-r` a backslash quotes
//! the next character and backslash-newline continues the line.
//! Status is 1 when input ends before the delimiter.

use super::{builtin_error, is_identifier};
use crate::interpreter::assoc_arrays::ShellArray;
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::types::{ExecResult, ShellContext};

#[derive(Debug, Default)]
struct ReadOptions {
    raw: bool,
    prompt: Option<String>,
    array: Option<String>,
    delim: Option<char>,
    count: Option<usize>,
    names: Vec<String>,
}

fn parse_options(args: &[String]) -> Result<ReadOptions, String> {
    let mut opts = ReadOptions::default();
    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        if arg == "--" {
            i += 1;
            break;
        }
        if !arg.starts_with('-') || arg.len() < 2 {
            break;
        }
        let flags: Vec<char> = arg[1..].chars().collect();
        for (j, &flag) in flags.iter().enumerate() {
            match flag {
                'r' => opts.raw = true,
                's' | 'e' | 'E' => {}
                'p' | 'a' | 'A' | 'd' | 'n' | 'k' | 't' | 'u' => {
                    // The value is the rest of this word or the next one
                    let inline: String = flags[j + 1..].iter().collect();
                    let value = if !inline.is_empty() {
                        inline
                    } else {
                        i += 1;
                        args.get(i).cloned().ok_or_else(|| format!("-{}: option requires an argument", flag))?
                    };
                    match flag {
                        'p' => opts.prompt = Some(value),
                        'a' | 'A' => opts.array = Some(value),
                        'd' => opts.delim = Some(value.chars().next().unwrap_or('\0')),
                        'n' | 'k' => {
                            opts.count = Some(value.parse().map_err(|_| format!("{}: invalid count", value))?)
                        }
                        _ => {}
                    }
                    break;
                }
                other => return Err(format!("bad option: -{}", other)),
            }
        }
        i += 1;
    }
    opts.names = args[i..].to_vec();
    Ok(opts)
}

/// One character of input and whether a backslash quoted it
type Quoted = (char, bool);

fn unquote(text: &str, raw: bool) -> Vec<Quoted> {
    let mut out = Vec::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' && !raw {
            if let Some(next) = chars.next() {
                out.push((next, true));
            }
            continue;
        }
        out.push((c, false));
    }
    out
}

/// Split `text` into at most `max` fields (0 means unlimited); the last
/// field keeps the remainder including its inner separators.
fn split_fields(text: &[Quoted], ifs: &str, max: usize) -> Vec<String> {
    let is_ws = |&(c, quoted): &Quoted| !quoted && ifs.contains(c) && c.is_whitespace();
    let is_sep = |&(c, quoted): &Quoted| !quoted && ifs.contains(c);

    let mut fields = Vec::new();
    let mut i = 0;
    while i < text.len() && is_ws(&text[i]) {
        i += 1;
    }
    while i < text.len() {
        if max != 0 && fields.len() + 1 == max {
            let mut end = text.len();
            while end > i && is_ws(&text[end - 1]) {
                end -= 1;
            }
            fields.push(text[i..end].iter().map(|(c, _)| *c).collect());
            return fields;
        }
        let start = i;
        while i < text.len() && !is_sep(&text[i]) {
            i += 1;
        }
        fields.push(text[start..i].iter().map(|(c, _)| *c).collect());
        while i < text.len() && is_ws(&text[i]) {
            i += 1;
        }
        if i < text.len() && is_sep(&text[i]) {
            i += 1;
            while i < text.len() && is_ws(&text[i]) {
                i += 1;
            }
        }
    }
    fields
}

/// Read one logical line, joining backslash-newline continuations
fn read_line(ctx: &mut ShellContext, delim: char, raw: bool) -> (String, bool) {
    let mut line = String::new();
    loop {
        let Some((chunk, found)) = ctx.stdin.read_until(delim) else {
            return (line, false);
        };
        line.push_str(&chunk);
        let trailing = line.chars().rev().take_while(|c| *c == '\\').count();
        if !raw && found && delim == '\n' && trailing % 2 == 1 {
            line.pop();
            continue;
        }
        return (line, found);
    }
}

/// Handle the read builtin command
pub fn handle_read(ctx: &mut ShellContext, args: &[String]) -> Result<ExecResult, InterpreterError> {
    let mut opts = match parse_options(args) {
        Ok(opts) => opts,
        Err(msg) => return Ok(builtin_error("read", msg)),
    };

    // zsh form: `read name?prompt`
    if let Some(first) = opts.names.first_mut() {
        if let Some((name, prompt)) = first.split_once('?') {
            opts.prompt = Some(prompt.to_string());
            *first = name.to_string();
        }
    }
    for name in opts.names.iter().chain(opts.array.iter()) {
        if !is_identifier(name) {
            return Ok(builtin_error("read", format!("not an identifier: {}", name)));
        }
    }

    let stderr = opts.prompt.clone().unwrap_or_default();
    let (text, complete) = match opts.count {
        Some(count) => match ctx.stdin.read_chars(count) {
            Some(text) => (text, true),
            None => (String::new(), false),
        },
        None => read_line(ctx, opts.delim.unwrap_or('\n'), opts.raw),
    };
    let status = if complete { 0 } else { 1 };

    let ifs = ctx.ifs();
    let chars = unquote(&text, opts.raw);
    if let Some(array) = &opts.array {
        let fields = split_fields(&chars, &ifs, 0);
        ctx.set_array(array, ShellArray::from_values(fields))?;
        return Ok(ExecResult::new(String::new(), stderr, status));
    }

    if opts.names.is_empty() {
        let line: String = chars.iter().map(|(c, _)| *c).collect();
        ctx.assign("REPLY", line)?;
        return Ok(ExecResult::new(String::new(), stderr, status));
    }

    let mut fields = split_fields(&chars, &ifs, opts.names.len()).into_iter();
    for name in &opts.names {
        ctx.assign(name, fields.next().unwrap_or_default())?;
    }
    Ok(ExecResult::new(String::new(), stderr, status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::types::Input;

    fn read(input: &str, list: &[&str]) -> (ShellContext, ExecResult) {
        let mut ctx = ShellContext::default();
        ctx.stdin = Input::from_string(input);
        let args: Vec<String> = list.iter().map(|s| s.to_string()).collect();
        let r = handle_read(&mut ctx, &args).unwrap();
        (ctx, r)
    }

    #[test]
    fn test_split_last_gets_rest() {
        let (ctx, r) = read("  one two  three four  \n", &["a", "b"]);
        assert_eq!(r.exit_code, 0);
        assert_eq!(ctx.get_var("a").as_deref(), Some("one"));
        assert_eq!(ctx.get_var("b").as_deref(), Some("two  three four"));
    }

    #[test]
    fn test_reply_and_eof() {
        let (ctx, r) = read("partial", &[]);
        assert_eq!(r.exit_code, 1);
        assert_eq!(ctx.get_var("REPLY").as_deref(), Some("partial"));
        let (_, r) = read("", &["x"]);
        assert_eq!(r.exit_code, 1);
    }

    #[test]
    fn test_backslashes() {
        let (ctx, _) = read("a\\ b c\n", &["x", "y"]);
        assert_eq!(ctx.get_var("x").as_deref(), Some("a b"));
        let (ctx, _) = read("a\\ b c\n", &["-r", "x", "y"]);
        assert_eq!(ctx.get_var("x").as_deref(), Some("a\\"));
        let (ctx, _) = read("one\\\ntwo\n", &["x"]);
        assert_eq!(ctx.get_var("x").as_deref(), Some("onetwo"));
    }

    #[test]
    fn test_custom_ifs_and_array() {
        let mut ctx = ShellContext::default();
        ctx.set_var("IFS", ":");
        ctx.stdin = Input::from_string("a:b::c\n");
        handle_read(&mut ctx, &["-a".to_string(), "parts".to_string()]).unwrap();
        assert_eq!(
            ctx.array_values("parts"),
            Some(vec!["a".to_string(), "b".to_string(), String::new(), "c".to_string()])
        );
    }

    #[test]
    fn test_delim_count_and_prompt() {
        let (ctx, _) = read("x,y", &["-d", ",", "v"]);
        assert_eq!(ctx.get_var("v").as_deref(), Some("x"));
        let (ctx, _) = read("abcdef", &["-n", "3", "v"]);
        assert_eq!(ctx.get_var("v").as_deref(), Some("abc"));
        let (ctx, r) = read("val\n", &["v?Name: "]);
        assert_eq!(r.stderr, "Name: ");
        assert_eq!(ctx.get_var("v").as_deref(), Some("val"));
    }
}

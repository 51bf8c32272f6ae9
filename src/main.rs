use clap::Parser;
use std::io::Read;
use std::path::PathBuf;
use zshell::interpreter::ExecResult;
use zshell::zshell::{is_option_name, Shell, ShellConfig};

#[derive(Parser)]
#[command(name = "zshell")]
#[command(about = "A POSIX and ZSH compatible shell")]
#[command(version)]
struct Cli {
    /// Execute the script from command line argument
    #[arg(short = 'c')]
    command: Option<String>,

    /// Exit immediately if a command exits with non-zero status
    #[arg(short = 'e', long = "errexit")]
    errexit: bool,

    /// Print commands as they are executed
    #[arg(short = 'x', long = "xtrace")]
    xtrace: bool,

    /// Turn on an option (POSIX or ZSH name); may be repeated
    #[arg(short = 'o', value_name = "OPT")]
    options: Vec<String>,

    /// Working directory
    #[arg(long = "cwd", value_name = "DIR")]
    cwd: Option<PathBuf>,

    /// Output results as JSON (stdout, stderr, exit_code, success)
    #[arg(long = "json")]
    json: bool,

    /// Script file to execute, or `$0` with -c
    #[arg()]
    script: Option<String>,

    /// Positional parameters
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn report(result: &ExecResult, json: bool) {
    if json {
        match serde_json::to_string(result) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("zshell: cannot encode result: {}", e),
        }
        return;
    }
    if !result.stdout.is_empty() {
        print!("{}", result.stdout);
    }
    if !result.stderr.is_empty() {
        eprint!("{}", result.stderr);
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = Cli::parse();

    for name in &cli.options {
        if !is_option_name(name) {
            eprintln!("zshell: no such option: {}", name);
            std::process::exit(2);
        }
    }

    // Script source: -c, file, or stdin
    let from_stdin = cli.command.is_none() && cli.script.is_none();
    let (script, script_name) = if let Some(command) = cli.command {
        (command, cli.script.unwrap_or_else(|| "zshell".to_string()))
    } else if let Some(file) = cli.script {
        match std::fs::read_to_string(&file) {
            Ok(content) => (content, file),
            Err(e) => {
                eprintln!("zshell: can't open input file: {}: {}", file, e);
                std::process::exit(127);
            }
        }
    } else {
        use std::io::IsTerminal;
        if std::io::stdin().is_terminal() {
            eprintln!("zshell: no script given; use -c 'script', a script file, or pipe one via stdin");
            std::process::exit(2);
        }
        let mut buf = String::new();
        if let Err(e) = std::io::stdin().read_to_string(&mut buf) {
            eprintln!("zshell: cannot read stdin: {}", e);
            std::process::exit(1);
        }
        (buf, "zshell".to_string())
    };

    let mut options = cli.options;
    if cli.errexit {
        options.push("errexit".to_string());
    }
    if cli.xtrace {
        options.push("xtrace".to_string());
    }

    let mut shell = Shell::new(ShellConfig {
        env: std::env::vars().collect(),
        cwd: cli.cwd,
        options,
        args: cli.args,
        script_name: Some(script_name),
        inherit_stdin: !from_stdin,
        ..Default::default()
    });

    let mut result = shell.exec(&script, None).await;
    let trap = shell.finish();
    result.stdout.push_str(&trap.stdout);
    result.stderr.push_str(&trap.stderr);

    report(&result, cli.json);
    std::process::exit(result.exit_code);
}

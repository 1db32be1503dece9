use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use console::style;
use lox::config::{CONTINUATION_PROMPT, HISTORY_FILE, PROMPT, RuntimeConfig};
use lox::keywords::load_keywords;
use lox::session::Session;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::fs;
use std::path::PathBuf;
use std::process;

#[derive(ClapParser)]
#[command(name = "lox")]
#[command(about = "A tree-walking interpreter for the Lox scripting language")]
struct Cli {
    /// Script file to run (omit for REPL)
    script: Option<String>,

    /// Path to a JSON file respelling keywords, e.g. {"print": "show"}
    #[arg(short, long)]
    keywords: Option<String>,

    /// Follow runtime errors with a suggestion
    #[arg(long)]
    hints: bool,

    /// Dump the token stream before parsing
    #[arg(long)]
    tokens: bool,

    /// Dump the parsed statements in prefix form
    #[arg(long)]
    ast: bool,
}

fn main() {
    if let Err(e) = try_main() {
        eprintln!("{} {:#}", style("error:").red().bold(), e);
        process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();

    let keywords = load_keywords(cli.keywords.as_deref())?;
    let config = RuntimeConfig {
        show_hints: cli.hints,
        dump_tokens: cli.tokens,
        dump_ast: cli.ast,
    };
    let mut session = Session::new(keywords, config);

    match cli.script {
        None => run_prompt(&mut session),
        Some(path) => {
            run_file(&path, &mut session)?;
            let code = session.exit_code();
            if code != 0 {
                process::exit(code);
            }
            Ok(())
        }
    }
}

fn run_file(path: &str, session: &mut Session) -> Result<()> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("could not read script '{}'", path))?;
    session.run(&contents);
    Ok(())
}

fn run_prompt(session: &mut Session) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    let history = history_path();
    if let Some(path) = &history {
        let _ = rl.load_history(path);
    }

    let mut pending = String::new();
    loop {
        let prompt = if pending.is_empty() {
            PROMPT
        } else {
            CONTINUATION_PROMPT
        };

        let line = match rl.readline(prompt) {
            Ok(line) => line,
            Err(ReadlineError::Eof) => break,
            Err(ReadlineError::Interrupted) => {
                pending.clear();
                println!("^C");
                continue;
            }
            Err(e) => {
                eprintln!("{} {}", style("error:").red().bold(), e);
                break;
            }
        };

        if let Some(entry) = take_entry(&mut pending, &line) {
            let _ = rl.add_history_entry(entry.trim());
            submit(session, &entry);
        }
    }

    if let Some(path) = &history {
        let _ = rl.save_history(path);
    }

    Ok(())
}

fn history_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(HISTORY_FILE))
}

/// Adds `line` to the input collected so far. Once the input forms a
/// complete entry it is handed back and `pending` starts over; blank entries
/// are dropped.
fn take_entry(pending: &mut String, line: &str) -> Option<String> {
    pending.push_str(line);
    pending.push('\n');
    if !is_complete(pending) {
        return None;
    }
    let entry = std::mem::take(pending);
    (!entry.trim().is_empty()).then_some(entry)
}

fn submit(session: &mut Session, entry: &str) {
    session.run(entry);
    // a syntax error in one entry must not block the next
    session.reset_error();
}

// An entry is complete once every '{' and '(' is closed and no string is
// open. Strings may span lines, so an open quote asks for more input.
fn is_complete(code: &str) -> bool {
    let mut depth: i64 = 0;
    let mut in_string = false;
    let mut iter = code.chars().peekable();

    while let Some(c) = iter.next() {
        if in_string {
            if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '/' => {
                if iter.peek() == Some(&'/') {
                    while let Some(&next) = iter.peek() {
                        if next == '\n' {
                            break;
                        }
                        iter.next();
                    }
                }
            }
            '{' | '(' => depth += 1,
            '}' | ')' => depth -= 1,
            _ => {}
        }
    }

    depth <= 0 && !in_string
}

#[cfg(test)]
mod tests {
    use super::*;
    use lox::interpreter::value::Value;
    use lox::keywords::default_keywords;
    use std::io;

    #[test]
    fn test_is_complete_balanced() {
        assert!(is_complete("print 1;\n"));
        assert!(is_complete("{ print 1; }\n"));
        assert!(!is_complete("{ print 1;\n"));
        assert!(!is_complete("print \"open\n"));
        assert!(is_complete("print \"a\nb\";\n"));
        assert!(is_complete("// { comment\n"));
    }

    #[test]
    fn test_take_entry_waits_for_closing_brace() {
        let mut pending = String::new();
        assert_eq!(take_entry(&mut pending, "{"), None);
        assert_eq!(take_entry(&mut pending, "  print 1;"), None);
        assert_eq!(
            take_entry(&mut pending, "}"),
            Some("{\n  print 1;\n}\n".to_string())
        );
        assert!(pending.is_empty());
    }

    #[test]
    fn test_take_entry_drops_blank_lines() {
        let mut pending = String::new();
        assert_eq!(take_entry(&mut pending, "   "), None);
        assert!(pending.is_empty());
    }

    #[test]
    fn test_submit_clears_compile_error_only() {
        let mut session = Session::with_writers(
            default_keywords(),
            RuntimeConfig::default(),
            Box::new(io::sink()),
            Box::new(io::sink()),
        );

        submit(&mut session, "print nope;\n");
        submit(&mut session, "print ;\n");
        assert!(!session.had_error());
        assert!(session.had_runtime_error());

        submit(&mut session, "var a = 1;\n");
        assert_eq!(session.environment().get("a"), Ok(Value::Num(1.0)));
    }
}

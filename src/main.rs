// ABOUTME: CLI entry point and the interactive read-eval-print loop

use clap::Parser;
use minilisp::context::ExecContext;
use minilisp::reader;
use minilisp::value::{Datum, Sentinel};
use rustyline::error::ReadlineError;
use rustyline::{Config, DefaultEditor};
use std::path::{Path, PathBuf};

const HISTORY_FILE: &str = ".minilisp_history";

/// An R5RS-flavored Scheme interpreter
#[derive(Parser, Debug)]
#[command(name = "minilisp")]
#[command(version)]
#[command(about = "An R5RS-flavored Scheme interpreter with exact arithmetic")]
struct CliArgs {
    /// Source file to load before entering the REPL
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    file: Option<PathBuf>,
}

fn main() {
    let args = CliArgs::parse();
    let mut ctx = ExecContext::new();

    if let Some(path) = &args.file {
        load_file(&mut ctx, path);
    }

    repl(&mut ctx);
}

/// Load and evaluate a source file. An uncaught error exits the process
/// with the error kind's numeric value.
fn load_file(ctx: &mut ExecContext, path: &Path) {
    let forms = match reader::parse_file_forms(&path.to_string_lossy()) {
        Ok(forms) => forms,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(e.kind.exit_code());
        }
    };

    if let Err(e) = ctx.execute(&forms) {
        // The backtrace was already emitted through the error hook.
        std::process::exit(e.kind.exit_code());
    }
}

fn repl(ctx: &mut ExecContext) {
    let config = Config::builder().auto_add_history(true).build();
    let mut rl = match DefaultEditor::with_config(config) {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("failed to initialize line editor: {}", e);
            std::process::exit(1);
        }
    };
    let _ = rl.load_history(HISTORY_FILE);

    let mut line_no = 1u32;
    let mut level = 0u32;
    let mut pending = String::new();

    loop {
        let prompt = format!("{}:{}> ", level, line_no);
        match rl.readline(&prompt) {
            Ok(line) => {
                if line.trim().is_empty() && pending.is_empty() {
                    continue;
                }
                if !pending.is_empty() {
                    pending.push('\n');
                }
                pending.push_str(&line);

                let parsed = reader::parse_string(ctx, &pending);
                match parsed.datum {
                    Datum::Err(Sentinel::Incomplete) => {
                        // Keep reading; the form is not finished yet.
                        level += 1;
                        continue;
                    }
                    Datum::Err(_) => {
                        // Syntax error, already reported.
                        pending.clear();
                        level = 0;
                        continue;
                    }
                    Datum::Null => {
                        pending.clear();
                        level = 0;
                        continue;
                    }
                    _ => {}
                }
                pending.clear();
                level = 0;

                if let Ok(result) = ctx.execute(&parsed) {
                    if !result.is_null() {
                        let name = format!("${}", line_no);
                        ctx.env.define(&name, result.clone());
                        println!("{} = {}", name, result);
                    }
                }
                // Errors print a backtrace through the hook; the loop
                // just continues.
                line_no += 1;
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                pending.clear();
                level = 0;
            }
            Err(ReadlineError::Eof) => {
                println!();
                break;
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                break;
            }
        }
    }

    let _ = rl.save_history(HISTORY_FILE);
}

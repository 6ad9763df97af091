//! Check message templates: compile each one and run the lint rules.
//!
//! Usage:
//!   tpl_check [OPTIONS] [FILE ...]
//!   tpl_check < templates.txt
//!
//! Every non-empty line is one template. Lines starting with `#` are skipped.
//!
//! Options:
//!   --tree, -t   Print the compiled tree of every template that compiles
//!   --human, -H  Human-readable output
//!
//! If no files are given, reads from stdin. Exit code 1 if any template fails to
//! compile or has error-level findings. Set `RUST_LOG=wiretext=debug` for tracing.

use std::io::{self, Read};
use std::path::Path;
use tracing_subscriber::EnvFilter;
use wiretext::dump::format_tree;
use wiretext::{compile, lint, CompileError, LintMessage, Severity};

#[derive(Clone, Copy)]
enum OutputStyle {
    Compact,
    Human,
}

#[derive(Default)]
struct Totals {
    errors: usize,
    warnings: usize,
}

fn print_compile_error(path: &str, line_no: usize, e: &CompileError, style: OutputStyle) {
    match style {
        OutputStyle::Compact => {
            println!("{}:{}:{}: error: {} [syntax]", path, line_no, e.column, e.message);
        }
        OutputStyle::Human => {
            println!("  {} {}:{}: {}", path, line_no, e.column, e.message);
            println!("    rule: syntax");
        }
    }
}

fn print_message(path: &str, line_no: usize, m: &LintMessage, style: OutputStyle) {
    let severity_str = match m.severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
    };
    let column = m.span.0 + 1;
    match style {
        OutputStyle::Compact => {
            println!(
                "{}:{}:{}: {}: {} [{}]",
                path,
                line_no,
                column,
                severity_str,
                m.message,
                m.rule.name()
            );
        }
        OutputStyle::Human => {
            println!("  {} {}:{}: {}", path, line_no, column, m.message);
            println!("    rule: {}", m.rule.name());
        }
    }
}

/// Check every template in `src`; returns true if any error was found.
fn check_source(path: &str, src: &str, tree: bool, style: OutputStyle, totals: &mut Totals) -> bool {
    let mut has_error = false;
    for (i, line) in src.lines().enumerate() {
        let line_no = i + 1;
        let source = line.trim_end_matches('\r');
        if source.trim().is_empty() || source.starts_with('#') {
            continue;
        }
        let template = match compile(source) {
            Ok(t) => t,
            Err(e) => {
                totals.errors += 1;
                has_error = true;
                print_compile_error(path, line_no, &e, style);
                continue;
            }
        };
        if tree {
            println!("{}:{}:", path, line_no);
            print!("{}", format_tree(&template));
        }
        for m in lint(&template) {
            match m.severity {
                Severity::Error => {
                    totals.errors += 1;
                    has_error = true;
                }
                Severity::Warning => totals.warnings += 1,
            }
            print_message(path, line_no, &m, style);
        }
    }
    has_error
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let tree = if let Some(pos) = args.iter().position(|a| a == "--tree" || a == "-t") {
        args.remove(pos);
        true
    } else {
        false
    };
    let style = if let Some(pos) = args.iter().position(|a| a == "--human" || a == "-H") {
        args.remove(pos);
        OutputStyle::Human
    } else {
        OutputStyle::Compact
    };

    let mut has_error = false;
    let mut totals = Totals::default();

    if args.is_empty() {
        let mut src = String::new();
        io::stdin().read_to_string(&mut src)?;
        has_error |= check_source("<stdin>", &src, tree, style, &mut totals);
    } else {
        for path in &args {
            let path = Path::new(path);
            let src = match std::fs::read_to_string(path) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("{}: {}", path.display(), e);
                    has_error = true;
                    continue;
                }
            };
            has_error |= check_source(&path.display().to_string(), &src, tree, style, &mut totals);
        }
    }

    if totals.errors > 0 || totals.warnings > 0 {
        eprintln!("tpl_check: {} error(s), {} warning(s)", totals.errors, totals.warnings);
    }
    if has_error {
        std::process::exit(1);
    }
    Ok(())
}

//! Quarry - CLI Client

use anyhow::{anyhow, bail, Context, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::sync::Arc;

use quarry::executor::ExecutionEngine;
use quarry::logging::LogConfig;
use quarry::retail;
use quarry::storage::loader;
use quarry::{EngineConfig, ResultSet};

/// Print welcome banner
fn print_banner() {
    println!(
        r#"
  ___
 / _ \ _   _  __ _ _ __ _ __ _   _
| | | | | | |/ _` | '__| '__| | | |
| |_| | |_| | (_| | |  | |  | |_| |
 \__\_\\__,_|\__,_|_|  |_|   \__, |
                             |___/

 An in-memory relational query engine
 Type '.help' for help, '.quit' to exit
"#
    );
}

/// Print help message
fn print_help() {
    println!(
        r#"
Commands:
  .help              Show this help message
  .quit              Exit Quarry
  .tables            List all tables with row counts
  .schema [table]    Show table schema
  .queries           List the query catalog
  .run <name>        Run a catalog query
  .explain <name>    Show the plan of a catalog query
  .format table|json Choose how results are printed
"#
    );
}

fn print_usage() {
    println!(
        r#"Usage: quarry [OPTIONS]

Options:
  --data <file>         Load tables from a JSON dataset instead of the retail sample
  --format table|json   Output format (default: table)
  --log-level <level>   Log filter, e.g. info or quarry=debug (RUST_LOG overrides)
  --query <name>        Run one catalog query and exit
  --help                Show this message"#
    );
}

/// How results are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Table,
    Json,
}

impl OutputFormat {
    fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            other => bail!("unknown format '{}', expected table or json", other),
        }
    }
}

/// Command line options
#[derive(Debug)]
struct Options {
    data: Option<String>,
    format: OutputFormat,
    log_level: String,
    query: Option<String>,
}

impl Options {
    /// Returns `None` when only usage was requested
    fn parse(args: impl Iterator<Item = String>) -> Result<Option<Self>> {
        let mut options = Options {
            data: None,
            format: OutputFormat::Table,
            log_level: "warn".to_string(),
            query: None,
        };
        let mut args = args.skip(1);
        while let Some(arg) = args.next() {
            let mut value = |name: &str| {
                args.next()
                    .ok_or_else(|| anyhow!("missing value for {}", name))
            };
            match arg.as_str() {
                "--data" => options.data = Some(value("--data")?),
                "--format" => options.format = OutputFormat::parse(&value("--format")?)?,
                "--log-level" => options.log_level = value("--log-level")?,
                "--query" => options.query = Some(value("--query")?),
                "--help" | "-h" => return Ok(None),
                other => bail!("unknown argument '{}'", other),
            }
        }
        Ok(Some(options))
    }
}

/// Width of `text` in characters, not bytes
fn display_width(text: &str) -> usize {
    text.chars().count()
}

/// Format query results as a table
fn format_results(result: &ResultSet) -> String {
    let columns = result.columns();
    if columns.is_empty() && result.is_empty() {
        return String::new();
    }

    // Calculate column widths
    let mut widths: Vec<usize> = columns.iter().map(|c| display_width(c)).collect();
    for row in &result.rows {
        for (i, value) in row.values().iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(display_width(&value.to_string()));
            }
        }
    }

    let separator: String = widths
        .iter()
        .map(|w| "-".repeat(*w + 2))
        .collect::<Vec<_>>()
        .join("+");
    let separator = format!("+{}+\n", separator);

    let mut output = String::new();
    output.push_str(&separator);
    let header: String = columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!(" {:^width$} ", c, width = *w))
        .collect::<Vec<_>>()
        .join("|");
    output.push_str(&format!("|{}|\n", header));
    output.push_str(&separator);

    for row in &result.rows {
        let row_str: String = row
            .values()
            .iter()
            .zip(&widths)
            .map(|(v, w)| {
                if v.is_numeric() {
                    format!(" {:>width$} ", v.to_string(), width = *w)
                } else {
                    format!(" {:<width$} ", v.to_string(), width = *w)
                }
            })
            .collect::<Vec<_>>()
            .join("|");
        output.push_str(&format!("|{}|\n", row_str));
    }

    if !result.is_empty() {
        output.push_str(&separator);
    }
    output.push_str(&format!("{} row(s) returned\n", result.len()));
    output
}

fn render(result: &ResultSet, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(format_results(result)),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&result.to_json_records()?)?;
            Ok(format!("{}\n", json))
        }
    }
}

/// Run a catalog query and print its result
fn run_query(engine: &ExecutionEngine, name: &str, format: OutputFormat) -> Result<()> {
    let query = retail::find(name)
        .ok_or_else(|| anyhow!("no query named '{}'; see .queries", name))?;
    let result = engine
        .execute(&query.plan)
        .with_context(|| format!("query '{}' failed", query.name))?;
    print!("{}", render(&result, format)?);
    Ok(())
}

/// Interactive session state
struct Session {
    engine: ExecutionEngine,
    format: OutputFormat,
}

impl Session {
    /// Handle one input line; returns `false` to end the session
    fn handle(&mut self, line: &str) -> Result<bool> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.first().copied() {
            None => {}
            Some(".help") => print_help(),
            Some(".quit") | Some(".exit") => return Ok(false),
            Some(".tables") => {
                for table in self.engine.store().tables() {
                    println!("  {} ({} rows)", table.name(), table.tuple_count());
                }
            }
            Some(".schema") => match parts.get(1) {
                Some(name) => {
                    let table = self.engine.store().get_table(name)?;
                    println!("{}", table.definition().describe());
                }
                None => {
                    for table in self.engine.store().tables() {
                        println!("{}", table.definition().describe());
                    }
                }
            },
            Some(".queries") => {
                for query in retail::catalog() {
                    println!("  {:<28} {}", query.name, query.description);
                }
            }
            Some(".run") => match parts.get(1) {
                Some(name) => run_query(&self.engine, name, self.format)?,
                None => bail!("usage: .run <name>"),
            },
            Some(".explain") => match parts.get(1).and_then(|name| retail::find(name)) {
                Some(query) => println!("{}", query.plan),
                None => bail!("usage: .explain <name>, see .queries"),
            },
            Some(".format") => match parts.get(1) {
                Some(format) => {
                    self.format = OutputFormat::parse(format)?;
                    println!("Output format set to {:?}", self.format);
                }
                None => println!("Output format is {:?}", self.format),
            },
            Some(cmd) => {
                bail!("unknown command: {}. Type '.help' for available commands.", cmd)
            }
        }
        Ok(true)
    }
}

/// Main REPL loop
fn run_repl(mut session: Session) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    print_banner();

    loop {
        match editor.readline("quarry> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                editor.add_history_entry(line)?;
                match session.handle(line) {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) => eprintln!("Error: {:#}", e),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    println!("Goodbye!");
    Ok(())
}

fn main() -> Result<()> {
    let options = match Options::parse(std::env::args())? {
        Some(options) => options,
        None => {
            print_usage();
            return Ok(());
        }
    };
    LogConfig::default()
        .with_level(options.log_level.clone())
        .init()?;

    let store = match &options.data {
        Some(path) => loader::load_from_path(path)
            .with_context(|| format!("failed to load dataset {}", path))?,
        None => retail::sample_store()?,
    };
    let engine = ExecutionEngine::with_config(Arc::new(store), EngineConfig::from_env()?);

    match &options.query {
        Some(name) => run_query(&engine, name, options.format),
        None => run_repl(Session {
            engine,
            format: options.format,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry::catalog::{DataType, TableBuilder};
    use quarry::executor::LogicalPlan;
    use quarry::storage::{StoreBuilder, Tuple, Value};

    #[test]
    fn test_table_aligns_non_ascii_text() {
        let mut builder = StoreBuilder::new();
        builder
            .add_table(
                TableBuilder::new("people")
                    .primary_key("id")
                    .column("name", DataType::Text)
                    .build(),
            )
            .unwrap();
        builder
            .insert_all(
                "people",
                vec![
                    Tuple::new(vec![Value::Integer(1), Value::from("Zoë Müller")]),
                    Tuple::new(vec![Value::Integer(2), Value::from("Bo")]),
                ],
            )
            .unwrap();
        let engine = ExecutionEngine::new(Arc::new(builder.build().unwrap()));
        let result = engine.execute(&LogicalPlan::scan("people")).unwrap();

        let output = format_results(&result);
        let widths: Vec<usize> = output
            .lines()
            .filter(|line| line.starts_with('+') || line.starts_with('|'))
            .map(display_width)
            .collect();
        assert_eq!(widths.len(), 6);
        assert!(widths.iter().all(|w| *w == widths[0]));
        assert!(output.contains("| Zoë Müller |"));
    }

    #[test]
    fn test_parse_options() {
        let args = ["quarry", "--format", "json", "--query", "big_spenders"].map(String::from);
        let options = Options::parse(args.into_iter()).unwrap().unwrap();
        assert_eq!(options.format, OutputFormat::Json);
        assert_eq!(options.query.as_deref(), Some("big_spenders"));

        let args = ["quarry", "--help"].map(String::from);
        assert!(Options::parse(args.into_iter()).unwrap().is_none());
        let args = ["quarry", "--bogus"].map(String::from);
        assert!(Options::parse(args.into_iter()).is_err());
    }
}

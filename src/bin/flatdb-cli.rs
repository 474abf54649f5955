//! flatdb command line client
//!
//! Parse SQL, run single statements, or start an interactive shell over a
//! data directory.

use anyhow::Context;
use clap::{Parser, Subcommand};
use flatdb::sql::dot::to_dot;
use flatdb::{init_logging, DbConfig, QueryResult, Session, Value};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// flatdb - SQL over flat CSV files
#[derive(Parser, Debug)]
#[command(name = "flatdb-cli")]
#[command(version = VERSION)]
#[command(about = "SQL front end and flat-file storage engine", long_about = None)]
struct Cli {
    /// Storage base directory
    #[arg(short = 'd', long = "data-dir", default_value = "./flatdb_data")]
    data_dir: PathBuf,

    /// TOML configuration file
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Database to use for table statements
    #[arg(long = "database")]
    database: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a statement and print its syntax tree
    Parse {
        sql: String,
        /// Print the tree in Graphviz DOT format
        #[arg(long)]
        dot: bool,
    },
    /// Execute one statement
    Exec { sql: String },
    /// Interactive SQL shell (default)
    Shell,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("❌ Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = DbConfig::load_or_default(cli.config.as_deref())?;
    init_logging(&config.logging)?;

    match cli.command.unwrap_or(Command::Shell) {
        Command::Parse { sql, dot } => {
            let statement = flatdb::parse(&sql)?;
            if dot {
                print!("{}", to_dot(&statement));
            } else {
                println!("{:#?}", statement);
            }
        }
        Command::Exec { sql } => {
            let mut session = open_session(&cli.data_dir, &config, cli.database.as_deref())?;
            let result = session.execute_sql(&sql)?;
            display_result(result);
        }
        Command::Shell => {
            let session = open_session(&cli.data_dir, &config, cli.database.as_deref())?;
            interactive_mode(session, &cli.data_dir)?;
        }
    }

    Ok(())
}

fn open_session(
    data_dir: &Path,
    config: &DbConfig,
    database: Option<&str>,
) -> anyhow::Result<Session> {
    let mut session = Session::open(data_dir, config)
        .with_context(|| format!("Failed to open data directory {}", data_dir.display()))?;
    if let Some(name) = database {
        session.use_database(name)?;
    }
    Ok(session)
}

fn interactive_mode(mut session: Session, data_dir: &Path) -> anyhow::Result<()> {
    println!("flatdb v{}", VERSION);
    println!("Data directory: {}", data_dir.display());
    println!("Type '.help' for help, '.exit' to quit\n");

    let stdin = io::stdin();
    let mut buffer = String::new();
    let mut statement = String::new();

    loop {
        let prompt = match (statement.is_empty(), session.current_database()) {
            (false, _) => "     -> ".to_string(),
            (true, Some(db)) => format!("{}> ", db),
            (true, None) => "flatdb> ".to_string(),
        };
        print!("{}", prompt);
        io::stdout().flush()?;

        buffer.clear();
        if stdin.lock().read_line(&mut buffer)? == 0 {
            // EOF
            println!();
            break;
        }
        let input = buffer.trim();

        if statement.is_empty() && input.starts_with('.') {
            if !run_dot_command(&mut session, input) {
                break;
            }
            continue;
        }
        if input.is_empty() {
            continue;
        }

        statement.push_str(input);
        statement.push('\n');

        if input.ends_with(';') {
            match session.execute_sql(statement.trim()) {
                Ok(result) => display_result(result),
                Err(e) => eprintln!("❌ Error: {}", e),
            }
            statement.clear();
        }
    }

    Ok(())
}

/// Returns `false` when the shell should exit
fn run_dot_command(session: &mut Session, input: &str) -> bool {
    let mut parts = input.split_whitespace();
    let command = parts.next().unwrap_or_default();

    match command {
        ".exit" | ".quit" => return false,
        ".help" => print_interactive_help(),
        ".use" => match parts.next() {
            Some(name) => match session.use_database(name) {
                Ok(()) => println!("Using database '{}'", name),
                Err(e) => eprintln!("❌ Error: {}", e),
            },
            None => eprintln!("Usage: .use <database>"),
        },
        ".databases" => {
            let databases = session.engine().list_databases();
            if databases.is_empty() {
                println!("No databases found");
            }
            for name in databases {
                println!("  {}", name);
            }
        }
        ".tables" => {
            let database = parts.next().or(session.current_database()).map(str::to_string);
            match database {
                Some(db) => match session.engine().list_tables(&db) {
                    Ok(tables) if tables.is_empty() => println!("No tables found"),
                    Ok(tables) => tables.iter().for_each(|t| println!("  {}", t)),
                    Err(e) => eprintln!("❌ Error: {}", e),
                },
                None => eprintln!("No database selected; use .use <database>"),
            }
        }
        _ => {
            eprintln!("❌ Unknown command: {}", input);
            println!("Type '.help' for available commands");
        }
    }
    true
}

fn print_interactive_help() {
    println!(
        r#"
Commands:
  .help               Show this help
  .exit, .quit        Leave the shell
  .use <database>     Select the current database
  .databases          List databases
  .tables [database]  List tables

Statements end with ';' and may span lines:
  CREATE DATABASE shop;
  CREATE TABLE users (id INTEGER PRIMARY KEY, name VARCHAR(20) NOT NULL);
  INSERT INTO users VALUES (1, 'Alice'), (2, 'Bob');
  SELECT name FROM users WHERE id > 1 LIMIT 10;
  DROP TABLE users;
"#
    );
}

fn display_result(result: QueryResult) {
    match result {
        QueryResult::Definition { message } => println!("✅ {}", message),
        QueryResult::Modification { affected_rows } => {
            println!("✅ {} row(s) affected", affected_rows)
        }
        QueryResult::Select { columns, rows } => display_table(&columns, &rows),
    }
}

fn cell(value: &Value) -> String {
    match value {
        Value::Text(s) if s.chars().count() > 50 => {
            format!("{}...", s.chars().take(47).collect::<String>())
        }
        other => other.to_string(),
    }
}

fn border(widths: &[usize], left: &str, mid: &str, right: &str) -> String {
    let segments: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
    format!("{}{}{}", left, segments.join(mid), right)
}

fn display_table(columns: &[String], rows: &[Vec<Value>]) {
    if rows.is_empty() {
        println!("No results");
        return;
    }

    let cells: Vec<Vec<String>> = rows.iter().map(|r| r.iter().map(cell).collect()).collect();
    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
    for row in &cells {
        for (i, value) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(value.chars().count());
            }
        }
    }

    let line = |values: &[String]| {
        let padded: Vec<String> = values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!(" {:w$} ", v, w = *w))
            .collect();
        format!("│{}│", padded.join("│"))
    };

    println!("{}", border(&widths, "┌", "┬", "┐"));
    println!("{}", line(columns));
    println!("{}", border(&widths, "├", "┼", "┤"));
    for row in &cells {
        println!("{}", line(row.as_slice()));
    }
    println!("{}", border(&widths, "└", "┴", "┘"));

    println!("\n{} row(s) returned", rows.len());
}

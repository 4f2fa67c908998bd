use rustyline::{DefaultEditor, Result, error::ReadlineError};
use slotdb::{
    executor::statement::{StatementExecutor, StatementResult},
    planner::parser::SqlParser,
    storage::file_storage::FileStorage,
};

const BOLD: &str = "\x1b[1m";
const UNDERLINE: &str = "\x1b[4m";
const RESET: &str = "\x1b[0m";
const HISTORY_FILE: &str = ".sql_cli_history";

fn read_multiline_command(rl: &mut DefaultEditor) -> Result<String> {
    let mut input = String::new();
    let mut prompt = "\x1b[1;36msql> \x1b[0m".to_string();

    loop {
        let readline = rl.readline(&prompt);
        match readline {
            Ok(line) => {
                let trimmed_line = line.trim_end();

                // A trailing backslash continues the statement on the next line.
                if let Some(without_backslash) = trimmed_line.strip_suffix('\\') {
                    input.push_str(without_backslash);
                    input.push(' ');
                    prompt = "  -> ".to_string();
                } else {
                    input.push_str(trimmed_line);
                    break;
                }
            }
            Err(err) => return Err(err),
        }
    }

    Ok(input)
}

fn main() -> Result<()> {
    println!("SQL shell over slotted-page storage. Type 'help' for usage.");

    let mut rl = DefaultEditor::new()?;
    let path = match rl.readline("Enter storage path: ") {
        Ok(line) => line,
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return Ok(()),
        Err(err) => return Err(err),
    };
    let path = path.trim();
    if path.is_empty() {
        println!("No storage path given");
        return Ok(());
    }

    let mut storage = FileStorage::new();
    if let Err(err) = storage.open(path) {
        println!("Error: {}", err);
        return Ok(());
    }
    println!("Storage opened at {}", path);

    let _ = rl.load_history(HISTORY_FILE);
    let parser = SqlParser::new();

    loop {
        match read_multiline_command(&mut rl) {
            Ok(input) => {
                let command = input.trim();
                if command.is_empty() {
                    continue;
                }
                rl.add_history_entry(command)?;

                match command.to_lowercase().as_str() {
                    "exit" | "quit" | "q" => break,
                    "help" | "h" => print_help(),
                    _ => run_statement(&mut storage, &parser, command),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("Interrupted");
                break;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    let _ = rl.save_history(HISTORY_FILE);
    if let Err(err) = storage.close() {
        println!("Error: {}", err);
    }
    println!("Goodbye!");
    Ok(())
}

fn run_statement(storage: &mut FileStorage, parser: &SqlParser, sql: &str) {
    let statement = match parser.parse_sql(sql) {
        Ok(statement) => statement,
        Err(err) => {
            println!("Error: {}", err);
            return;
        }
    };

    let mut executor = StatementExecutor::new(storage);
    match executor.execute(&statement) {
        Ok(result) => {
            print_result(&result);
            // Statements are durable as soon as they succeed.
            if let Err(err) = storage.flush() {
                println!("Error: {}", err);
            }
        }
        Err(err) => println!("Error: {}", err),
    }
}

fn print_result(result: &StatementResult) {
    match result {
        StatementResult::Created { table } => println!("Table '{}' created", table),
        StatementResult::Inserted { record_id } => {
            println!("Inserted record with ID: {}", record_id)
        }
        StatementResult::Deleted { count } => println!("Deleted {} record(s)", count),
        StatementResult::Rows { columns, rows } => {
            println!("{}{}{}{}", BOLD, UNDERLINE, columns.join(" | "), RESET);
            for row in rows {
                println!("{}", row.join(" | "));
            }
            println!("{} row(s)", rows.len());
        }
    }
}

fn print_help() {
    println!(
        r#"
Statements:
  CREATE TABLE <name> (<column> INT|TEXT, ..)
  INSERT INTO <table> VALUES (v1, v2, ..)
  SELECT <columns | * | SUM(col) | ABS(col)> FROM <table>
      [JOIN <other> ON <a.x = b.y>]
      [WHERE <column op value> [AND ..]]
      [ORDER BY <column> [ASC|DESC], ..]
      [LIMIT <n>]
  DELETE FROM <table> [WHERE ..]

Shell commands:
  help, h          - Show this help message
  exit, quit, q    - Exit

Use '\' at the end of a line for multiline input.
Use Up/Down arrows to navigate command history.
"#
    );
}

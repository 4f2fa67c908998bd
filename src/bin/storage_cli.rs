use rustyline::{DefaultEditor, Result, error::ReadlineError};
use slotdb::{
    executor::{
        predicate::Predicate,
        scan::{Aggregate, ScanOptions, SortOrder},
    },
    storage::{
        file_storage::FileStorage,
        schema::{ColumnSchema, ColumnType},
    },
    types::error::StorageError,
};

const PROMPT: &str = "\x1b[1;36mstorage> \x1b[0m";
const BOLD: &str = "\x1b[1m";
const UNDERLINE: &str = "\x1b[4m";
const RESET: &str = "\x1b[0m";
const HISTORY_FILE: &str = ".storage_cli_history";

fn main() -> Result<()> {
    println!("Slotted-page storage CLI. Type 'help' for the command list.");

    let mut storage = FileStorage::new();
    let mut rl = DefaultEditor::new()?;
    let _ = rl.load_history(HISTORY_FILE);

    loop {
        match rl.readline(PROMPT) {
            Ok(line) => {
                let command = line.trim();
                if command.is_empty() {
                    continue;
                }
                rl.add_history_entry(command)?;
                match process_command(&mut storage, command) {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(err) => println!("Error: {}", err),
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

/// Runs one command line. Returns `Ok(false)` when the user asked to exit.
fn process_command(
    storage: &mut FileStorage,
    line: &str,
) -> std::result::Result<bool, StorageError> {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return Ok(true);
    };
    let args: Vec<&str> = parts.collect();

    match command.to_lowercase().as_str() {
        "exit" | "quit" | "q" => return Ok(false),
        "help" | "h" => print_help(),
        "open" => match args.as_slice() {
            [path] => {
                storage.open(path)?;
                println!("Opened storage at {}", path);
            }
            _ => println!("Usage: open <path>"),
        },
        "close" => {
            storage.close()?;
            println!("Storage closed");
        }
        "flush" => {
            let written = storage.flush()?;
            println!("Flushed {} page file(s)", written);
        }
        "create" => create_command(storage, &args)?,
        "insert" => insert_command(storage, &args, line)?,
        "get" => get_command(storage, &args)?,
        "update" => update_command(storage, &args, line)?,
        "delete" => delete_command(storage, &args)?,
        "scan" => scan_command(storage, &args)?,
        other => println!("Unknown command: {}. Type 'help' for the command list.", other),
    }
    Ok(true)
}

fn create_command(
    storage: &mut FileStorage,
    args: &[&str],
) -> std::result::Result<(), StorageError> {
    if args.len() < 2 {
        println!("Usage: create <table> <column:TYPE> [column:TYPE ..]");
        return Ok(());
    }
    let table = args[0];
    let mut columns = Vec::new();
    for spec in &args[1..] {
        let Some((name, type_name)) = spec.split_once(':') else {
            println!("Invalid column '{}', expected name:TYPE", spec);
            return Ok(());
        };
        let Some(column_type) = ColumnType::from_keyword(type_name) else {
            println!("Unknown column type '{}', expected INT or TEXT", type_name);
            return Ok(());
        };
        columns.push(ColumnSchema::new(name.to_string(), column_type));
    }
    storage.create(table, columns)?;
    println!("Table '{}' created", table);
    Ok(())
}

fn insert_command(
    storage: &mut FileStorage,
    args: &[&str],
    line: &str,
) -> std::result::Result<(), StorageError> {
    let (Some(table), Some(csv)) = (args.first(), rest_of_line(line, 2)) else {
        println!("Usage: insert <table> <value,value,..>");
        return Ok(());
    };
    let values = split_values(csv);
    let record_id = storage.insert(table, &values)?;
    println!("Inserted record with ID: {}", record_id);
    Ok(())
}

fn get_command(storage: &mut FileStorage, args: &[&str]) -> std::result::Result<(), StorageError> {
    let [table, id] = args else {
        println!("Usage: get <table> <id>");
        return Ok(());
    };
    let Ok(record_id) = id.parse::<u32>() else {
        println!("Invalid record id '{}'", id);
        return Ok(());
    };
    let row = storage.get(table, record_id)?;
    println!("{}", row.join(" | "));
    Ok(())
}

fn update_command(
    storage: &mut FileStorage,
    args: &[&str],
    line: &str,
) -> std::result::Result<(), StorageError> {
    let ([table, id, ..], Some(csv)) = (args, rest_of_line(line, 3)) else {
        println!("Usage: update <table> <id> <value,value,..>");
        return Ok(());
    };
    let Ok(record_id) = id.parse::<u32>() else {
        println!("Invalid record id '{}'", id);
        return Ok(());
    };
    let values = split_values(csv);
    storage.update(table, record_id, &values)?;
    println!("Record {} updated", record_id);
    Ok(())
}

fn delete_command(
    storage: &mut FileStorage,
    args: &[&str],
) -> std::result::Result<(), StorageError> {
    let [table, id] = args else {
        println!("Usage: delete <table> <id>");
        return Ok(());
    };
    let Ok(record_id) = id.parse::<u32>() else {
        println!("Invalid record id '{}'", id);
        return Ok(());
    };
    storage.delete_record(table, record_id)?;
    println!("Record {} deleted", record_id);
    Ok(())
}

fn scan_command(storage: &mut FileStorage, args: &[&str]) -> std::result::Result<(), StorageError> {
    let Some((table, flags)) = args.split_first() else {
        println!("Usage: scan <table> [--projection ..] [--where ..] [--orderby ..] [--limit ..] [--aggregate ..]");
        return Ok(());
    };
    let names = storage.column_names(table)?;

    // Collect flag values first so flags may appear in any order; the
    // projection decides which names ordering and aggregation see.
    let mut projection_arg = None;
    let mut where_arg = None;
    let mut orderby_arg = None;
    let mut limit_arg = None;
    let mut aggregate_arg = None;
    let mut iter = flags.iter();
    while let Some(flag) = iter.next() {
        let Some(value) = iter.next() else {
            println!("Missing value for {}", flag);
            return Ok(());
        };
        match *flag {
            "--projection" => projection_arg = Some(*value),
            "--where" => where_arg = Some(*value),
            "--orderby" => orderby_arg = Some(*value),
            "--limit" => limit_arg = Some(*value),
            "--aggregate" => aggregate_arg = Some(*value),
            other => {
                println!("Unknown option {}", other);
                return Ok(());
            }
        }
    }

    let mut options = ScanOptions::new();
    let mut projected = names.clone();

    if let Some(list) = projection_arg {
        let mut projection = Vec::new();
        let mut selected = Vec::new();
        for name in list.split(',') {
            let name = name.trim();
            projection.push(resolve_column(&names, name, table)?);
            selected.push(name.to_string());
        }
        projected = selected;
        options = options.project(projection);
    }

    if let Some(condition) = where_arg {
        let Some((column, value)) = condition.split_once('=') else {
            println!("Invalid condition '{}', expected column=value", condition);
            return Ok(());
        };
        let index = resolve_column(&names, column.trim(), table)?;
        options = options.filter(Predicate::eq(index, value.trim().to_string()));
    }

    if let Some(keys) = orderby_arg {
        for key in keys.split(',') {
            let (column, direction) = match key.split_once(':') {
                Some((column, direction)) => (column.trim(), direction.trim()),
                None => (key.trim(), "asc"),
            };
            let order = match direction.to_lowercase().as_str() {
                "asc" => SortOrder::Ascending,
                "desc" => SortOrder::Descending,
                other => {
                    println!("Unknown sort direction '{}'", other);
                    return Ok(());
                }
            };
            let index = resolve_column(&projected, column, table)?;
            options = options.order_by(index, order);
        }
    }

    if let Some(value) = limit_arg {
        let Ok(limit) = value.parse::<usize>() else {
            println!("Invalid limit '{}'", value);
            return Ok(());
        };
        options = options.limit(limit);
    }

    if let Some(spec) = aggregate_arg {
        let Some((op, column)) = spec.split_once(':') else {
            println!("Invalid aggregate '{}', expected OP:column", spec);
            return Ok(());
        };
        let index = resolve_column(&projected, column.trim(), table)?;
        options = options.aggregate(Aggregate::from_op(op.trim(), index)?);
    }

    let rows = storage.scan(table, &options)?;

    if let Some(Aggregate::Sum { .. }) = options.aggregate {
        if let Some(value) = rows.first().and_then(|row| row.first()) {
            println!("{}SUM: {}{}", BOLD, value, RESET);
        }
        return Ok(());
    }
    print_table(&projected, &rows);
    Ok(())
}

fn resolve_column(
    names: &[String],
    name: &str,
    table: &str,
) -> std::result::Result<usize, StorageError> {
    names
        .iter()
        .position(|candidate| candidate == name)
        .ok_or_else(|| StorageError::ColumnNotFound {
            name: name.to_string(),
            table: table.to_string(),
        })
}

fn print_table(columns: &[String], rows: &[Vec<String>]) {
    println!("{}{}{}{}", BOLD, UNDERLINE, columns.join(" | "), RESET);
    for row in rows {
        println!("{}", row.join(" | "));
    }
    println!("{} row(s)", rows.len());
}

/// The command line after its first `skip` whitespace-separated tokens.
/// Keeps commas and inner spaces of text values intact.
fn rest_of_line(line: &str, skip: usize) -> Option<&str> {
    let mut remaining = line.trim_start();
    for _ in 0..skip {
        let end = remaining.find(char::is_whitespace)?;
        remaining = remaining[end..].trim_start();
    }
    if remaining.is_empty() { None } else { Some(remaining) }
}

fn split_values(csv: &str) -> Vec<String> {
    csv.split(',').map(|value| value.trim().to_string()).collect()
}

fn print_help() {
    println!(
        r#"
Available commands:
  open <path>                        - Open or create a storage directory
  close                              - Flush and close the current storage
  create <table> <col:TYPE> [..]     - Create a table (types: INT, TEXT)
  insert <table> <v1,v2,..>          - Insert a row, values comma separated
  get <table> <id>                   - Fetch one record by id
  update <table> <id> <v1,v2,..>     - Replace a record in place
  delete <table> <id>                - Delete a record by id
  scan <table> [options]             - Scan a table
      --projection <c1,c2,..>        - Columns to return
      --where <col=value>            - Equality filter over the full row
      --orderby <col[:asc|desc],..>  - Sort keys, applied after projection
      --limit <n>                    - Keep only the first n rows
      --aggregate <SUM|ABS>:<col>    - Aggregate over the final result
  flush                              - Write dirty pages to disk
  help, h                            - Show this help message
  exit, quit, q                      - Exit

Use Up/Down arrows to navigate command history.
"#
    );
}

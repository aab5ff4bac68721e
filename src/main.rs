use std::path::PathBuf;

use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Cell, Table as ComfyTable};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use cargoql::format::DisplayParams;
use cargoql::{CargoDatabase, CargoError, PageIdentity, QueryText, Settings, StoreContext};

/// CargoQL command-line client
#[derive(Parser, Debug)]
#[command(name = "cargoql")]
#[command(about = "Declare wiki tables, store page values and query them", long_about = None)]
struct Args {
    /// SQLite database file
    #[arg(short = 'd', long, global = true)]
    database: Option<PathBuf>,

    /// Settings file (overrides ./cargoql.toml and /etc/cargoql/cargoql.toml)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record a template's table declaration, creating the table if needed
    Declare {
        #[arg(long)]
        template: i64,
        /// e.g. "_table=Books|Authors=List (,) of String|Year=Integer"
        declaration: String,
    },
    /// Rebuild a template's table, in place or as a __NEXT replacement
    Recreate {
        #[arg(long)]
        template: i64,
        #[arg(long)]
        replacement: bool,
    },
    /// Swap a table's __NEXT replacement in
    Switch { table: String },
    /// Drop a table's __NEXT replacement
    Discard { table: String },
    /// Drop a table with its helper tables
    Drop { table: String },
    /// Store field values for a page
    Store {
        #[arg(long)]
        page_id: i64,
        #[arg(long)]
        page_name: String,
        #[arg(long, default_value_t = 0)]
        namespace: i64,
        /// Only store when this table is the one being recreated
        #[arg(long)]
        batch: Option<String>,
        table: String,
        /// field=value pairs
        values: Vec<String>,
    },
    /// Remove every row stored by a page
    DeletePage { page_id: i64 },
    /// Run a query
    Query {
        #[arg(long)]
        tables: String,
        #[arg(long, default_value = "")]
        fields: String,
        #[arg(long = "where", default_value = "")]
        where_clause: String,
        #[arg(long, default_value = "")]
        join_on: String,
        #[arg(long, default_value = "")]
        group_by: String,
        #[arg(long, default_value = "")]
        having: String,
        #[arg(long, default_value = "")]
        order_by: String,
        #[arg(long, default_value = "")]
        limit: String,
        #[arg(long, default_value = "")]
        offset: String,
        #[arg(long, default_value = "table")]
        format: String,
        /// Show the compiled SQL instead of running it
        #[arg(long)]
        explain: bool,
    },
    /// List Cargo tables
    Tables,
    /// Interactive query shell
    Shell,
}

fn default_database() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cargoql")
        .join("cargo.db")
}

/// "Author=John Doe" -> ("Author", "John Doe")
fn split_pair(pair: &str) -> Option<(String, String)> {
    pair.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
}

fn print_tables(db: &CargoDatabase) -> Result<(), CargoError> {
    let tables = db.tables()?;
    if tables.is_empty() {
        println!("(no tables)");
        return Ok(());
    }
    let mut table = ComfyTable::new();
    table.load_preset(UTF8_FULL);
    table.set_header(["Table", "Template", "Fields", "Helper tables"].map(Cell::new));
    for entry in tables {
        let schema = db.schema(&entry.main_table)?;
        let helpers: Vec<String> = entry.field_tables.iter().chain(&entry.field_helper_tables).cloned().collect();
        table.add_row([
            Cell::new(&entry.main_table),
            Cell::new(entry.template_id.map_or_else(String::new, |id| id.to_string())),
            Cell::new(schema.field_names().join(", ")),
            Cell::new(helpers.join(", ")),
        ]);
    }
    println!("{table}");
    Ok(())
}

fn shell(db: &CargoDatabase) -> Result<(), Box<dyn std::error::Error>> {
    let mut rl = DefaultEditor::new()?;
    let history_file = dirs::home_dir().map(|mut p| {
        p.push(".cargoql_history");
        p
    });
    if let Some(ref path) = history_file {
        let _ = rl.load_history(path);
    }

    println!("Enter clauses as clause=value (tables=Books, where=Year > 2000, ...).");
    println!("\\g runs the query, \\s shows it, \\c clears it, \\t lists tables, \\q quits.\n");

    let mut query = QueryText::default();
    let mut format = "table".to_string();

    loop {
        match rl.readline("cargoql> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);

                match line {
                    "\\q" | "\\quit" | "quit" | "exit" => break,
                    "\\c" => {
                        query = QueryText::default();
                        println!("Query cleared");
                    }
                    "\\s" => println!("{query:#?}\nformat: {format}"),
                    "\\t" => {
                        if let Err(e) = print_tables(db) {
                            eprintln!("{e}");
                        }
                    }
                    "\\g" => match db.render(&format, std::slice::from_ref(&query), &DisplayParams::default()) {
                        Ok(out) => println!("{out}"),
                        Err(e) => eprintln!("{e}"),
                    },
                    _ => match split_pair(line) {
                        Some((clause, value)) if clause.eq_ignore_ascii_case("format") => format = value,
                        Some((clause, value)) => {
                            if !query.set_clause(&clause, &value) {
                                eprintln!("Unknown clause '{clause}'");
                            }
                        }
                        None => eprintln!("Expected clause=value or a \\ command"),
                    },
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    if let Some(ref path) = history_file {
        let _ = rl.save_history(path);
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let settings = Settings::load(args.config.as_deref())?;
    let path = args.database.unwrap_or_else(default_database);
    let mut db = CargoDatabase::open(&path, settings)?;

    match args.command {
        Command::Declare { template, declaration } => {
            let decl = db.declare(template, &declaration)?;
            println!("Template {template} declares table '{}' ({} fields)", decl.table_name, decl.schema.len());
        }
        Command::Recreate { template, replacement } => {
            let table = db.recreate(template, replacement)?;
            println!("Created table '{table}'");
        }
        Command::Switch { table } => {
            db.switch_in_replacement(&table)?;
            println!("Switched in replacement for '{table}'");
        }
        Command::Discard { table } => {
            db.discard_replacement(&table)?;
            println!("Discarded replacement for '{table}'");
        }
        Command::Drop { table } => {
            db.delete_table(&table)?;
            println!("Dropped table '{table}'");
        }
        Command::Store { page_id, page_name, namespace, batch, table, values } => {
            let mut pairs = Vec::with_capacity(values.len());
            for value in &values {
                let pair = split_pair(value).ok_or_else(|| format!("expected field=value, got '{value}'"))?;
                pairs.push(pair);
            }
            let title = page_name.split_once(':').filter(|_| namespace != 0).map_or(page_name.as_str(), |(_, t)| t);
            let page = PageIdentity::new(page_id, namespace, page_name.as_str(), title);
            let ctx = batch.map_or_else(StoreContext::page_save, StoreContext::batch_recreate);
            let outcome = db.store(&ctx, &page, &table, pairs)?;
            println!("{outcome:?}");
        }
        Command::DeletePage { page_id } => {
            let deleted = db.delete_page(page_id)?;
            println!("Deleted {deleted} row(s)");
        }
        Command::Query {
            tables,
            fields,
            where_clause,
            join_on,
            group_by,
            having,
            order_by,
            limit,
            offset,
            format,
            explain,
        } => {
            let query = QueryText {
                tables,
                fields,
                where_clause,
                join_on,
                group_by,
                having,
                order_by,
                limit,
                offset,
            };
            if explain {
                let plan = db.compile(&query)?;
                println!("{}", plan.sql);
                for (i, param) in plan.params.iter().enumerate() {
                    println!("  ?{} = {param:?}", i + 1);
                }
            } else {
                println!("{}", db.render(&format, &[query], &DisplayParams::default())?);
            }
        }
        Command::Tables => print_tables(&db)?,
        Command::Shell => shell(&db)?,
    }

    Ok(())
}

//! SheetDB CLI - spreadsheet tables from the command line

use clap::{Parser, Subcommand};
use serde_json::json;
use sheetdb::{Config, Constraints, Database, Fields, Filter, Row, SheetsBackend};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sheetdb")]
#[command(about = "Use the sheets of a spreadsheet as database tables", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "sheetdb.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List tables (sheets) in the spreadsheet
    Tables,

    /// Count data rows in a table
    Count {
        table: String,
    },

    /// Print rows matching every filter
    Find {
        table: String,
        /// Filter such as `id=1`, `email~=example`, `invited_by!`
        #[arg(short, long = "where")]
        filters: Vec<Filter>,
        /// Print only the first match
        #[arg(long)]
        first: bool,
    },

    /// Append a row
    Insert {
        table: String,
        /// Cell to set, as `column=value`
        #[arg(short, long = "set", value_parser = parse_assignment, required = true)]
        set: Vec<(String, String)>,
        #[command(flatten)]
        rules: RuleArgs,
    },

    /// Update the first row matching every filter
    Update {
        table: String,
        #[arg(short, long = "where", required = true)]
        filters: Vec<Filter>,
        #[arg(short, long = "set", value_parser = parse_assignment, required = true)]
        set: Vec<(String, String)>,
        #[command(flatten)]
        rules: RuleArgs,
    },

    /// Delete the first row matching every filter
    Delete {
        table: String,
        #[arg(short, long = "where", required = true)]
        filters: Vec<Filter>,
    },
}

#[derive(clap::Args)]
struct RuleArgs {
    /// Column whose value must not repeat in the table
    #[arg(long)]
    unique: Vec<String>,
    /// Column that must be non-empty
    #[arg(long)]
    required: Vec<String>,
}

impl RuleArgs {
    fn into_constraints(self) -> Constraints {
        let constraints = self
            .required
            .into_iter()
            .fold(Constraints::new(), |c, column| c.required(column));
        self.unique
            .into_iter()
            .fold(constraints, |c, column| c.unique(column))
    }
}

fn parse_assignment(s: &str) -> Result<(String, String), String> {
    let (column, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected column=value, got '{}'", s))?;
    let column = column.trim();
    if column.is_empty() {
        return Err(format!("missing column name in '{}'", s));
    }
    Ok((column.to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    let db = Database::connect(&config)?;

    if let Err(e) = run(&db, cli.command).await {
        if let Some(hint) = e.downcast_ref::<sheetdb::Error>().and_then(|e| e.suggestion()) {
            eprintln!("hint: {}", hint);
        }
        return Err(e);
    }
    Ok(())
}

async fn run(db: &Database<SheetsBackend>, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Tables => {
            for sheet in db.list_tables().await? {
                println!(
                    "{}\t{} rows\t{} columns",
                    sheet.title, sheet.row_count, sheet.column_count
                );
            }
        }
        Commands::Count { table } => {
            println!("{}", db.count_rows(&table).await?);
        }
        Commands::Find {
            table,
            filters,
            first,
        } => {
            let predicate = Filter::all(filters);
            let rows = if first {
                db.find_row(&table, predicate).await?.into_iter().collect()
            } else {
                db.find_rows(&table, predicate).await?
            };
            for row in &rows {
                print_row(row)?;
            }
            if rows.is_empty() {
                eprintln!("No rows found.");
            }
        }
        Commands::Insert { table, set, rules } => {
            let row: Row = set.into_iter().collect();
            let inserted = db.insert_row(&table, row, rules.into_constraints()).await?;
            print_row(&inserted)?;
        }
        Commands::Update {
            table,
            filters,
            set,
            rules,
        } => {
            let updates: Fields = set.into_iter().collect();
            let updated = db
                .update_row(&table, Filter::all(filters), updates, rules.into_constraints())
                .await?;
            print_row(&updated)?;
        }
        Commands::Delete { table, filters } => {
            let deleted = db.delete_row(&table, Filter::all(filters)).await?;
            eprintln!("Deleted row {}.", deleted.row_number().unwrap_or_default());
            print_row(&deleted)?;
        }
    }
    Ok(())
}

fn print_row(row: &Row) -> anyhow::Result<()> {
    let fields: BTreeMap<&str, &str> = row
        .fields
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    let output = json!({
        "row_number": row.row_number(),
        "fields": fields,
    });
    println!("{}", serde_json::to_string(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("email=a@x.com").unwrap(),
            ("email".to_string(), "a@x.com".to_string())
        );
        assert_eq!(parse_assignment("note=").unwrap().1, "");
        assert!(parse_assignment("email").is_err());
        assert!(parse_assignment("=x").is_err());
    }

    #[test]
    fn test_cli_parses_update() {
        let cli = Cli::try_parse_from([
            "sheetdb", "update", "users", "--where", "id=1", "--set", "email=b@x.com", "--unique",
            "email",
        ])
        .unwrap();
        match cli.command {
            Commands::Update {
                table,
                filters,
                set,
                rules,
            } => {
                assert_eq!(table, "users");
                assert_eq!(filters, vec![Filter::equals("id", "1")]);
                assert_eq!(set, vec![("email".to_string(), "b@x.com".to_string())]);
                assert_eq!(rules.into_constraints().len(), 1);
            }
            _ => panic!("expected update"),
        }
        assert_eq!(cli.config, PathBuf::from("sheetdb.yaml"));
    }

    #[test]
    fn test_delete_requires_filter() {
        assert!(Cli::try_parse_from(["sheetdb", "delete", "users"]).is_err());
    }
}

use std::{error::Error, io::Write};

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use clap::{Args, Parser, Subcommand};
use engine::{Engine, Transaction, summary};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "gastos_admin")]
#[command(about = "Admin utilities for the Gastos ledger (migrations, recurrences, exports)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./data/gastos.db?mode=rwc"
    )]
    database_url: String,

    /// Time zone used for local dates.
    #[arg(long, env = "TZ_NAME", default_value = "America/Lima")]
    timezone: Tz,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply pending migrations and exit.
    Migrate,
    /// Materialize the fixed recurrences due on a date (default: today).
    Materialize(MaterializeArgs),
    Recurrence(Recurrence),
    /// Write transactions as CSV.
    Export(ExportArgs),
}

#[derive(Args, Debug)]
struct MaterializeArgs {
    /// Local date, `YYYY-MM-DD`.
    #[arg(long)]
    date: Option<NaiveDate>,
}

#[derive(Args, Debug)]
struct Recurrence {
    #[command(subcommand)]
    command: RecurrenceCommand,
}

#[derive(Subcommand, Debug)]
enum RecurrenceCommand {
    List(RecurrenceListArgs),
}

#[derive(Args, Debug)]
struct RecurrenceListArgs {
    #[arg(long)]
    user: i64,
    /// Include deactivated recurrences.
    #[arg(long)]
    all: bool,
}

#[derive(Args, Debug)]
struct ExportArgs {
    /// Only this user's rows; every user when omitted.
    #[arg(long)]
    user: Option<i64>,
    /// First local date included.
    #[arg(long)]
    from: NaiveDate,
    /// Last local date included.
    #[arg(long)]
    to: NaiveDate,
}

/// One CSV line, columns in the same order as the spreadsheet mirror.
#[derive(Serialize)]
struct ExportRow {
    fecha: String,
    tipo: &'static str,
    categoria: String,
    descripcion: String,
    monto: String,
    metodo_pago: &'static str,
    hora: String,
    id: String,
    usuario: i64,
}

impl ExportRow {
    fn new(tx: &Transaction, tz: Tz) -> Self {
        let local = tx.occurred_at.with_timezone(&tz);
        Self {
            fecha: local.format("%d/%m/%Y").to_string(),
            tipo: tx.kind.label(),
            categoria: tx.category.label(),
            descripcion: tx.description.clone().unwrap_or_default(),
            monto: tx.amount.to_decimal_string(),
            metodo_pago: tx.payment_method.name(),
            hora: local.format("%H:%M").to_string(),
            id: tx.id.to_string(),
            usuario: tx.user_id,
        }
    }
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();
    let tz = cli.timezone;

    let db = connect_db(&cli.database_url).await?;

    match cli.command {
        Command::Migrate => {
            println!("database is up to date");
        }
        Command::Materialize(args) => {
            let engine = Engine::builder().database(db).build().await?;
            let now = Utc::now();
            let date = args.date.unwrap_or_else(|| summary::local_date(now, tz));
            let created = engine.materialize_due(date, now, tz).await?;
            for item in &created {
                println!(
                    "{} user={} {} {} ({})",
                    item.transaction.id,
                    item.recurrence.user_id,
                    item.transaction.kind.as_str(),
                    item.transaction.amount,
                    item.transaction.category.code()
                );
            }
            println!("materialized {} row(s) for {date}", created.len());
        }
        Command::Recurrence(Recurrence {
            command: RecurrenceCommand::List(args),
        }) => {
            let engine = Engine::builder().database(db).build().await?;
            let list = engine.list_recurrences(args.user, args.all).await?;
            if list.is_empty() {
                println!("no recurrences for user {}", args.user);
            }
            for r in list {
                println!(
                    "{} day={:>2} {} {} {} {}{}",
                    r.id,
                    r.day_of_month,
                    r.kind.as_str(),
                    r.amount,
                    r.category.code(),
                    r.payment_method.code(),
                    if r.active { "" } else { " (inactive)" }
                );
            }
        }
        Command::Export(args) => {
            if args.to < args.from {
                eprintln!("--to must not be before --from");
                std::process::exit(2);
            }
            let engine = Engine::builder().database(db).build().await?;
            let (from, _) = summary::day_bounds(args.from, tz);
            let (_, to) = summary::day_bounds(args.to, tz);
            let rows = match args.user {
                Some(user) => engine.list_transactions(user, from, to).await?,
                None => engine.list_all_transactions(from, to).await?,
            };

            let stdout = std::io::stdout();
            let mut writer = csv::Writer::from_writer(stdout.lock());
            for tx in &rows {
                writer.serialize(ExportRow::new(tx, tz))?;
            }
            writer.flush()?;
            eprintln!("exported {} row(s)", rows.len());
        }
    }

    std::io::stdout().flush()?;
    Ok(())
}

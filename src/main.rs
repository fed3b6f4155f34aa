use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use chrono::NaiveDate;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

// Use library instead of local modules
use carvault::{
    count_expenses, create_user, create_vehicle, logging, setup_database, CsvImporter, LogFormat,
    NewVehicle, PasswordHasher, VehicleIdentifierMap,
};

/// CarVault - vehicle expense tracker tools
#[derive(Parser)]
#[command(name = "carvault", version, about)]
struct Cli {
    /// Log filter (e.g. info, carvault=debug)
    #[arg(long, global = true, env = "RUST_LOG", default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import historical expenses from a CSV file
    Import {
        /// SQLite database path
        #[arg(long = "db", env = "CARVAULT_DB", default_value = "data/carvault.db")]
        database: PathBuf,

        /// CSV file to import
        #[arg(long, default_value = "data/expenses.csv")]
        csv: PathBuf,

        /// Owner of the imported expenses
        #[arg(long, default_value_t = 1)]
        user_id: i64,

        /// Vehicle mapping as <uuid>=<vehicle id>; repeat for each vehicle
        #[arg(long = "vehicle", required = true, value_parser = VehicleIdentifierMap::parse_entry)]
        vehicles: Vec<(String, i64)>,
    },

    /// Create a login user
    CreateUser {
        /// SQLite database path
        #[arg(long = "db", env = "CARVAULT_DB", default_value = "data/carvault.db")]
        database: PathBuf,

        #[arg(long)]
        username: String,

        /// Prompted for when omitted
        #[arg(long, env = "CARVAULT_NEW_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        #[arg(long)]
        display_name: Option<String>,

        #[arg(long)]
        avatar_url: Option<String>,

        #[arg(long, default_value_t = bcrypt::DEFAULT_COST)]
        bcrypt_cost: u32,
    },

    /// Register a vehicle and print its id (the target of --vehicle mappings)
    AddVehicle {
        /// SQLite database path
        #[arg(long = "db", env = "CARVAULT_DB", default_value = "data/carvault.db")]
        database: PathBuf,

        /// Owner of the vehicle
        #[arg(long, default_value_t = 1)]
        user_id: i64,

        #[arg(long)]
        name: String,

        #[arg(long)]
        make: Option<String>,

        #[arg(long)]
        model: Option<String>,

        #[arg(long)]
        year: Option<i32>,

        #[arg(long)]
        vin: Option<String>,

        #[arg(long)]
        license_plate: Option<String>,

        /// YYYY-MM-DD
        #[arg(long)]
        date_purchased: Option<NaiveDate>,

        #[arg(long)]
        purchase_mileage: Option<i64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level, cli.log_format)?;

    match cli.command {
        Commands::Import {
            database,
            csv,
            user_id,
            vehicles,
        } => run_import(&database, &csv, user_id, vehicles.into_iter().collect()),
        Commands::CreateUser {
            database,
            username,
            password,
            display_name,
            avatar_url,
            bcrypt_cost,
        } => run_create_user(
            &database,
            &username,
            password,
            display_name.as_deref(),
            avatar_url.as_deref(),
            bcrypt_cost,
        ),
        Commands::AddVehicle {
            database,
            user_id,
            name,
            make,
            model,
            year,
            vin,
            license_plate,
            date_purchased,
            purchase_mileage,
        } => run_add_vehicle(
            &database,
            &NewVehicle {
                user_id,
                name,
                make,
                model,
                year,
                vin,
                license_plate,
                date_purchased,
                purchase_mileage,
            },
        ),
    }
}

fn open_database(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to connect to database {}", db_path.display()))?;
    setup_database(&conn).context("Failed to initialize database")?;

    Ok(conn)
}

fn run_import(
    db_path: &Path,
    csv_path: &Path,
    user_id: i64,
    vehicles: VehicleIdentifierMap,
) -> Result<()> {
    println!("🗄️  CarVault: Expense Import - CSV → SQLite");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let conn = open_database(db_path)?;
    println!("✓ Database ready: {}", db_path.display());
    println!("✓ Vehicles mapped: {}", vehicles.len());

    let summary = CsvImporter::new(&conn, &vehicles, user_id)
        .import_file(csv_path)
        .context("Failed to import CSV")?;

    let total = count_expenses(&conn)?;

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ Successfully imported {} expenses", summary.imported);
    println!("✓ Skipped rows: {}", summary.skipped);
    println!("✓ Imported with missing fields: {}", summary.degraded);
    println!("✓ Database contains {} expenses", total);

    Ok(())
}

fn run_create_user(
    db_path: &Path,
    username: &str,
    password: Option<String>,
    display_name: Option<&str>,
    avatar_url: Option<&str>,
    bcrypt_cost: u32,
) -> Result<()> {
    let username = username.trim();
    anyhow::ensure!(!username.is_empty(), "username must not be empty");

    let password = match password {
        Some(password) => password,
        None => rpassword::prompt_password(format!("Password for {}: ", username))
            .context("Failed to read password")?,
    };
    anyhow::ensure!(!password.is_empty(), "password must not be empty");

    let hasher = PasswordHasher::new(bcrypt_cost)?;
    let hash = hasher.hash(&password)?;

    let conn = open_database(db_path)?;
    let id = create_user(&conn, username, &hash, display_name, avatar_url)?;

    println!("✓ Created user {} (id {})", username, id);
    Ok(())
}

fn run_add_vehicle(db_path: &Path, vehicle: &NewVehicle) -> Result<()> {
    anyhow::ensure!(!vehicle.name.trim().is_empty(), "vehicle name must not be empty");

    let conn = open_database(db_path)?;
    let id = create_vehicle(&conn, vehicle)?;

    println!("✓ Registered vehicle {} (id {}) for user {}", vehicle.name, id, vehicle.user_id);
    Ok(())
}

// 🗄️ Store - SQLite schema, users and expenses
// Every statement here is parameterized (?N placeholders), never formatted SQL

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

/// Date format used for the `expenses.date` column
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ============================================================================
// MODELS
// ============================================================================

/// A login identity. `username` is unique across the table.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: String,
}

/// A vehicle owned by one user. Only `name` is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub vin: Option<String>,
    pub license_plate: Option<String>,
    /// YYYY-MM-DD
    pub date_purchased: Option<String>,
    pub purchase_mileage: Option<i64>,
    pub created_at: String,
}

/// Vehicle as it is registered from the CLI
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewVehicle {
    pub user_id: i64,
    pub name: String,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub vin: Option<String>,
    pub license_plate: Option<String>,
    pub date_purchased: Option<NaiveDate>,
    pub purchase_mileage: Option<i64>,
}

/// Expense row as it is written by the importer
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub user_id: i64,
    pub vehicle_id: i64,
    pub date: NaiveDate,
    /// None when the source had no usable odometer reading
    pub mileage: Option<i64>,
    /// Currency units (cents / 100)
    pub amount: f64,
    pub expense_type: String,
    /// Raw JSON text, stored verbatim
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Expense row as it is read back from the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    pub user_id: i64,
    pub vehicle_id: i64,
    pub date: String,
    pub mileage: Option<i64>,
    pub amount: f64,
    pub expense_type: String,
    pub details: Option<String>,
    pub created_at: String,
}

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;
    // Per connection; expenses must point at an existing user and vehicle
    conn.pragma_update(None, "foreign_keys", "ON")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT UNIQUE NOT NULL,
            password_hash TEXT NOT NULL,
            display_name TEXT,
            avatar_url TEXT,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS vehicles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id),
            name TEXT NOT NULL,
            make TEXT,
            model TEXT,
            year INTEGER,
            vin TEXT,
            license_plate TEXT,
            date_purchased TEXT,
            purchase_mileage INTEGER,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS expenses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id),
            vehicle_id INTEGER NOT NULL REFERENCES vehicles(id),
            date TEXT NOT NULL,
            mileage INTEGER,
            amount REAL NOT NULL,
            expense_type TEXT NOT NULL,
            details TEXT,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_expenses_user_date ON expenses(user_id, date)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_expenses_vehicle ON expenses(vehicle_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_vehicles_user ON vehicles(user_id)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// USERS
// ============================================================================

/// Look up a user by exact username. `Ok(None)` when no row matches.
pub fn find_user_by_username(conn: &Connection, username: &str) -> Result<Option<User>> {
    let user = conn
        .query_row(
            "SELECT id, username, password_hash, display_name, avatar_url, created_at
             FROM users
             WHERE username = ?1",
            params![username],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    password_hash: row.get(2)?,
                    display_name: row.get(3)?,
                    avatar_url: row.get(4)?,
                    created_at: row.get(5)?,
                })
            },
        )
        .optional()
        .context("Failed to look up user")?;

    Ok(user)
}

/// Insert a user with an already-hashed password, returning its id
pub fn create_user(
    conn: &Connection,
    username: &str,
    password_hash: &str,
    display_name: Option<&str>,
    avatar_url: Option<&str>,
) -> Result<i64> {
    let result = conn.execute(
        "INSERT INTO users (username, password_hash, display_name, avatar_url, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            username,
            password_hash,
            display_name,
            avatar_url,
            Utc::now().to_rfc3339()
        ],
    );

    match result {
        Ok(_) => Ok(conn.last_insert_rowid()),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            anyhow::bail!("username already exists: {}", username)
        }
        Err(e) => Err(e).context("Failed to create user"),
    }
}

// ============================================================================
// VEHICLES
// ============================================================================

/// Register a vehicle for an existing user, returning its id
pub fn create_vehicle(conn: &Connection, vehicle: &NewVehicle) -> Result<i64> {
    conn.execute(
        "INSERT INTO vehicles (
            user_id, name, make, model, year, vin, license_plate,
            date_purchased, purchase_mileage, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            vehicle.user_id,
            vehicle.name,
            vehicle.make,
            vehicle.model,
            vehicle.year,
            vehicle.vin,
            vehicle.license_plate,
            vehicle
                .date_purchased
                .map(|d| d.format(DATE_FORMAT).to_string()),
            vehicle.purchase_mileage,
            Utc::now().to_rfc3339(),
        ],
    )
    .with_context(|| {
        format!(
            "Failed to create vehicle {:?} for user {}",
            vehicle.name, vehicle.user_id
        )
    })?;

    Ok(conn.last_insert_rowid())
}

/// All vehicles owned by a user, by name
pub fn get_vehicles_for_user(conn: &Connection, user_id: i64) -> Result<Vec<Vehicle>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, name, make, model, year, vin, license_plate,
                date_purchased, purchase_mileage, created_at
         FROM vehicles
         WHERE user_id = ?1
         ORDER BY name, id",
    )?;

    let vehicles = stmt
        .query_map(params![user_id], |row| {
            Ok(Vehicle {
                id: row.get(0)?,
                user_id: row.get(1)?,
                name: row.get(2)?,
                make: row.get(3)?,
                model: row.get(4)?,
                year: row.get(5)?,
                vin: row.get(6)?,
                license_plate: row.get(7)?,
                date_purchased: row.get(8)?,
                purchase_mileage: row.get(9)?,
                created_at: row.get(10)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(vehicles)
}

// ============================================================================
// EXPENSES
// ============================================================================

/// Insert one expense and return its row id.
///
/// Returns the raw `rusqlite::Error` so callers can decide whether a store
/// failure is fatal for them.
pub fn insert_expense(conn: &Connection, expense: &NewExpense) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO expenses (
            user_id, vehicle_id, date, mileage, amount, expense_type, details, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            expense.user_id,
            expense.vehicle_id,
            expense.date.format(DATE_FORMAT).to_string(),
            expense.mileage,
            expense.amount,
            expense.expense_type,
            expense.details,
            expense.created_at.to_rfc3339(),
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

/// All expenses owned by a user, newest date first
pub fn get_expenses_for_user(conn: &Connection, user_id: i64) -> Result<Vec<Expense>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, vehicle_id, date, mileage, amount, expense_type, details, created_at
         FROM expenses
         WHERE user_id = ?1
         ORDER BY date DESC, id DESC",
    )?;

    let expenses = stmt
        .query_map(params![user_id], |row| {
            Ok(Expense {
                id: row.get(0)?,
                user_id: row.get(1)?,
                vehicle_id: row.get(2)?,
                date: row.get(3)?,
                mileage: row.get(4)?,
                amount: row.get(5)?,
                expense_type: row.get(6)?,
                details: row.get(7)?,
                created_at: row.get(8)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(expenses)
}

pub fn count_expenses(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM expenses", [], |row| row.get(0))?;

    Ok(count)
}

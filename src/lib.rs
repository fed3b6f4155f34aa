// CarVault - Core Library
// Exposes the store, importer and auth modules for the CLI, the web server and tests

pub mod auth;
pub mod config;
pub mod db;
pub mod importer;
pub mod logging;

#[cfg(feature = "server")]
pub mod web;

// Re-export commonly used types
pub use auth::{AuthError, PasswordHasher, SessionClaims, SessionKeys};
pub use config::{ConfigError, ServerArgs, ServerConfig};
pub use db::{
    Expense, NewExpense, NewVehicle, User, Vehicle,
    setup_database, find_user_by_username, create_user,
    create_vehicle, get_vehicles_for_user,
    insert_expense, get_expenses_for_user, count_expenses,
};
pub use importer::{
    CsvImporter, ImportError, ImportSummary, ParsedRow, RowError, RowWarning,
    VehicleIdentifierMap, parse_row,
};
pub use logging::LogFormat;

#[cfg(feature = "server")]
pub use web::{router, AppState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

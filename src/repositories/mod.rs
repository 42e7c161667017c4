// src/repositories/mod.rs
//
// Plain query functions over a `PgExecutor` (pool or transaction).
// No hashing, validation or business rules live here.

pub mod attempts;
pub mod questions;
pub mod tokens;
pub mod topics;
pub mod users;

/// True when the error is a Postgres unique-constraint violation (23505).
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation())
}

//! PostgreSQL administration through `psql` running as the database
//! superuser.
//!
//! Names reaching the statement builders are validated identifiers, so they
//! are quoted but never need escaping beyond that. Literals are escaped.

use std::path::Path;

use anyhow::{Context, Error};

use bulwark_api::constants::DATABASE_SUPERUSER;

use crate::dependencies::{is_execution_failure, Command, Dependency};

fn as_superuser(program: impl AsRef<std::ffi::OsStr>) -> Command {
    let mut cmd = Dependency::Runuser.cmd();
    cmd.args(["-u", DATABASE_SUPERUSER, "--"]).arg(program);
    cmd
}

fn psql(sql: &str) -> Command {
    let mut cmd = as_superuser(Dependency::Psql.name());
    cmd.args(["-v", "ON_ERROR_STOP=1", "-tAc", sql]);
    cmd
}

/// Runs a query and returns its unaligned, trimmed output.
pub fn query(sql: &str) -> Result<String, Error> {
    Ok(psql(sql)
        .output_and_check()
        .with_context(|| format!("Failed to run query: {sql}"))?
        .trim()
        .to_string())
}

pub fn execute(sql: &str) -> Result<(), Error> {
    psql(sql)
        .run_and_check()
        .with_context(|| format!("Failed to execute statement: {sql}"))
}

/// Runs a schema script as the database superuser.
pub fn run_script(script: &Path) -> Result<(), Error> {
    as_superuser(script)
        .run_and_check()
        .with_context(|| format!("Failed to run script '{}'", script.display()))
}

/// Whether the local server accepts connections.
pub fn is_ready() -> Result<bool, Error> {
    match Dependency::PgIsready.cmd().arg("--quiet").run_and_check() {
        Ok(()) => Ok(true),
        Err(e) if is_execution_failure(&e) => Ok(false),
        Err(e) => Err(e).context("Failed to probe database readiness"),
    }
}

pub fn role_exists(role: &str) -> Result<bool, Error> {
    Ok(query(&role_exists_query(role))? == "1")
}

pub fn create_role(role: &str) -> Result<(), Error> {
    execute(&create_role_statement(role))
}

/// Returns the encoding name of `database`, or None when it does not exist.
pub fn database_encoding(database: &str) -> Result<Option<String>, Error> {
    Ok(non_empty(query(&database_encoding_query(database))?))
}

/// Returns the collation of `database`, or None when it does not exist.
pub fn database_collation(database: &str) -> Result<Option<String>, Error> {
    Ok(non_empty(query(&database_collation_query(database))?))
}

pub fn create_database(database: &str, owner: &str, locale: &str) -> Result<(), Error> {
    execute(&create_database_statement(database, owner, locale))
}

/// Blocks new sessions on `database` and terminates the existing ones.
pub fn disconnect_sessions(database: &str) -> Result<(), Error> {
    execute(&disallow_connections_statement(database))?;
    query(&terminate_sessions_query(database)).map(|_| ())
}

pub fn drop_database(database: &str) -> Result<(), Error> {
    execute(&drop_database_statement(database))
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

pub(crate) fn role_exists_query(role: &str) -> String {
    format!(
        "SELECT 1 FROM pg_roles WHERE rolname = {}",
        quote_literal(role)
    )
}

pub(crate) fn create_role_statement(role: &str) -> String {
    format!("CREATE ROLE {} LOGIN", quote_identifier(role))
}

pub(crate) fn database_encoding_query(database: &str) -> String {
    format!(
        "SELECT pg_encoding_to_char(encoding) FROM pg_database WHERE datname = {}",
        quote_literal(database)
    )
}

pub(crate) fn database_collation_query(database: &str) -> String {
    format!(
        "SELECT datcollate FROM pg_database WHERE datname = {}",
        quote_literal(database)
    )
}

/// Builds from template0, the only template that accepts a different
/// encoding than the cluster default.
pub(crate) fn create_database_statement(database: &str, owner: &str, locale: &str) -> String {
    format!(
        "CREATE DATABASE {} OWNER {} ENCODING 'UTF8' LC_COLLATE {} LC_CTYPE {} TEMPLATE template0",
        quote_identifier(database),
        quote_identifier(owner),
        quote_literal(locale),
        quote_literal(locale),
    )
}

pub(crate) fn disallow_connections_statement(database: &str) -> String {
    format!(
        "ALTER DATABASE {} WITH ALLOW_CONNECTIONS false",
        quote_identifier(database)
    )
}

pub(crate) fn terminate_sessions_query(database: &str) -> String {
    format!(
        "SELECT pg_terminate_backend(pid) FROM pg_stat_activity \
         WHERE datname = {} AND pid <> pg_backend_pid()",
        quote_literal(database)
    )
}

pub(crate) fn drop_database_statement(database: &str) -> String {
    format!("DROP DATABASE IF EXISTS {}", quote_identifier(database))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoting() {
        assert_eq!(quote_identifier("bacula"), "\"bacula\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(quote_literal("C.UTF-8"), "'C.UTF-8'");
        assert_eq!(quote_literal("o'hara"), "'o''hara'");
    }

    #[test]
    fn test_statements() {
        assert_eq!(
            role_exists_query("bacula"),
            "SELECT 1 FROM pg_roles WHERE rolname = 'bacula'"
        );
        assert_eq!(create_role_statement("bacula"), "CREATE ROLE \"bacula\" LOGIN");
        assert_eq!(
            database_encoding_query("bacula"),
            "SELECT pg_encoding_to_char(encoding) FROM pg_database WHERE datname = 'bacula'"
        );
        assert_eq!(
            create_database_statement("bacula", "bacula", "C.UTF-8"),
            "CREATE DATABASE \"bacula\" OWNER \"bacula\" ENCODING 'UTF8' \
             LC_COLLATE 'C.UTF-8' LC_CTYPE 'C.UTF-8' TEMPLATE template0"
        );
        assert_eq!(
            disallow_connections_statement("bacula"),
            "ALTER DATABASE \"bacula\" WITH ALLOW_CONNECTIONS false"
        );
        assert!(terminate_sessions_query("bacula")
            .contains("FROM pg_stat_activity WHERE datname = 'bacula' AND pid <> pg_backend_pid()"));
        assert_eq!(
            drop_database_statement("bacula"),
            "DROP DATABASE IF EXISTS \"bacula\""
        );
    }

    #[test]
    fn test_psql_command() {
        assert_eq!(
            psql("SELECT 1").render_command(),
            "runuser -u postgres -- psql -v ON_ERROR_STOP=1 -tAc 'SELECT 1'"
        );
        assert_eq!(
            as_superuser("/opt/bacula/scripts/make_postgresql_tables").render_command(),
            "runuser -u postgres -- /opt/bacula/scripts/make_postgresql_tables"
        );
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(String::new()), None);
        assert_eq!(non_empty("UTF8".into()), Some("UTF8".into()));
    }
}

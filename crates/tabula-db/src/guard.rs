use std::sync::OnceLock;

use regex::Regex;

use tabula_core::error::{Result, TabulaError};

fn forbidden_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(INSERT|UPDATE|DELETE|DROP|ALTER|TRUNCATE)\b")
            .expect("forbidden statement regex")
    })
}

/// Reject any statement that could mutate the database.
///
/// The database is an inspectable data source only; everything the agent
/// or the REST API runs must be read-only.
pub fn ensure_read_only(query: &str) -> Result<()> {
    if let Some(m) = forbidden_re().find(query) {
        return Err(TabulaError::ForbiddenStatement(format!(
            "{} in: {}",
            m.as_str().to_uppercase(),
            query.trim()
        )));
    }
    Ok(())
}

/// Quote a SQL identifier for safe interpolation.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

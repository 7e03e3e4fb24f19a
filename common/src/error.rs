/// Errors raised when records fail boundary validation (on load or save).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A required column is blank. `row` is 1-based.
    #[error("row {row}: {field} is required")]
    MissingField { row: usize, field: &'static str },

    /// The URL is not an absolute http(s) URL.
    #[error("row {row}: invalid URL {url:?}")]
    InvalidUrl { row: usize, url: String },

    /// Two targets share the same company and role.
    #[error("duplicate target: {company} / {role} (each Company Name + Role must be unique)")]
    DuplicateTarget { company: String, role: String },

    /// Two different targets would share one snapshot file.
    #[error("targets {first:?} and {second:?} map to the same snapshot key")]
    KeyCollision { first: String, second: String },

    #[error("unknown status {0:?}")]
    UnknownStatus(String),

    #[error("unknown visa verdict {0:?}")]
    UnknownVerdict(String),
}

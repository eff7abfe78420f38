use thiserror::Error;

/// Errors surfaced synchronously at the call site; a failed mutator leaves the
/// engine's state unchanged.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// An edge or accessor referenced a site index outside `0..n_sites`.
    #[error("topology references site {index}, but only {n_sites} sites exist")]
    InvalidTopology { index: usize, n_sites: usize },

    /// A Landau coefficient was set for an exponent outside {2,4,6,8,10}.
    #[error("landau exponent {0} is not one of 2, 4, 6, 8, 10")]
    InvalidExponent(i32),

    /// A scalar parameter (λ, temperature, iteration count, max_range, ...) was
    /// out of its valid domain.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// An accessor was called before any `run` produced the data it reports.
    #[error("`{0}` is only valid after at least one `run`")]
    NotInitialized(&'static str),
}

/// Crate-local result alias, matching the `pineappl`-style `error.rs` convention.
pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    pub(crate) fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        EngineError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

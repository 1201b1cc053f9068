use thiserror::Error;

/// Crate-wide error type. Variants map to the taxonomy in the error
/// handling design: configuration errors and invariant violations are
/// fatal, everything else is handled structurally by the caller.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown market: {0}")]
    UnknownMarket(String),

    #[error("invalid market config for {symbol}: {reason}")]
    InvalidMarket { symbol: String, reason: String },

    #[error("unknown wallet: {0}")]
    UnknownWallet(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("chain error: {0}")]
    Chain(String),

    #[error("internal invariant violated: {0}")]
    Invariant(String),
}

impl EngineError {
    /// Process exit code per the external interface spec:
    /// 2 = configuration error, 3 = unknown wallet/market, 4 = unrecoverable
    /// chain connectivity, anything else falls back to a generic failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            EngineError::Config(_) | EngineError::InvalidMarket { .. } => 2,
            EngineError::UnknownMarket(_) | EngineError::UnknownWallet(_) => 3,
            EngineError::Chain(_) => 4,
            EngineError::Invariant(_) => 1,
            EngineError::Transient(_) => 1,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

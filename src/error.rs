use thiserror::Error;

/// Failure taxonomy for the session core. Nothing here is fatal to the
/// process: transport errors feed the reconnect path, parse errors drop the
/// offending message, validation errors surface as local status text.
#[derive(Debug, Error)]
pub enum ElicitError {
    #[error("transport: {0}")]
    Transport(String),

    /// Reconnect ceiling exceeded. Terminal until an external restart.
    #[error("disconnected: gave up after {attempts} reconnect attempts")]
    ReconnectExhausted { attempts: u32 },

    #[error("malformed inbound message: {0}")]
    MessageParse(#[from] serde_json::Error),

    /// An entity was asked to make a transition its state machine forbids.
    #[error("illegal {entity} transition: {from} -> {to}")]
    IllegalTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("unknown requirement {0}")]
    UnknownRequirement(String),

    #[error("rating {0} out of range (1-5)")]
    RatingOutOfRange(u8),
}

pub type Result<T> = std::result::Result<T, ElicitError>;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("invalid configuration: {field} {message}")]
    InvalidConfiguration {
        field: &'static str,
        message: String,
    },

    #[error("numeric overflow: {field} is no longer finite at month {month}")]
    NumericOverflow { month: u32, field: &'static str },
}

impl SimulationError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            field,
            message: message.into(),
        }
    }
}

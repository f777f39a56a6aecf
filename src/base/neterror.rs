use thiserror::Error;

/// Network error codes used by the predictor.
///
/// Numeric values match Chromium's `net_error_list.h`, so codes coming from
/// an embedder can be round-tripped through [`NetError::as_i32`] and
/// `From<i32>`. Codes the predictor never produces map to
/// [`NetError::Unknown`].
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum NetError {
    // Generic Errors
    #[error("Operation aborted")]
    Aborted,
    #[error("Invalid argument")]
    InvalidArgument,
    #[error("Context shut down")]
    ContextShutDown,

    // Resolution Errors
    #[error("Name not resolved")]
    NameNotResolved,
    #[error("Name resolution failed")]
    NameResolutionFailed,

    // URL Errors
    #[error("Invalid URL")]
    InvalidUrl,

    #[error("DNS timed out")]
    DnsTimedOut,

    #[error("Unknown error: {0}")]
    Unknown(i32),
}

impl NetError {
    pub fn as_i32(&self) -> i32 {
        match self {
            NetError::Aborted => -3,
            NetError::InvalidArgument => -4,
            NetError::ContextShutDown => -26,
            NetError::NameNotResolved => -105,
            NetError::NameResolutionFailed => -137,
            NetError::InvalidUrl => -300,
            NetError::DnsTimedOut => -803,
            NetError::Unknown(code) => *code,
        }
    }

    /// True for errors meaning the name definitively does not exist, as
    /// opposed to a transient network condition.
    pub fn is_name_not_found(&self) -> bool {
        matches!(self, NetError::NameNotResolved | NetError::NameResolutionFailed)
    }
}

impl From<i32> for NetError {
    fn from(code: i32) -> Self {
        match code {
            -3 => NetError::Aborted,
            -4 => NetError::InvalidArgument,
            -26 => NetError::ContextShutDown,
            -105 => NetError::NameNotResolved,
            -137 => NetError::NameResolutionFailed,
            -300 => NetError::InvalidUrl,
            -803 => NetError::DnsTimedOut,
            _ => NetError::Unknown(code),
        }
    }
}

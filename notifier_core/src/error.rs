/**
 * Delivery error taxonomy.
 *
 * Every failed send maps to exactly one `SendError`, and every `SendError`
 * has a stable numeric code that dispatch layers and alerting rules key on:
 *
 * | code | variant               |
 * |------|-----------------------|
 * |  -1  | `InvalidPort`         |
 * |  -2  | `InvalidHost`         |
 * |  -3  | `InvalidVerb`         |
 * |  -4  | `InvalidResource`     |
 * |  -5  | `ContentTypeMissing`  |
 * |  -6  | `ContentWithoutType`  |
 * |  -7  | `PayloadTooLarge`     |
 * |  -8  | `TransportInitFailed` |
 * |  -9  | `Transport`           |
 *
 * Success is code 0 (see `result_code`).
 */
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SendError>;

/// Code reported for a delivered notification.
pub const SUCCESS: i32 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("port is zero")]
    InvalidPort,

    #[error("destination host is empty")]
    InvalidHost,

    #[error("verb is empty")]
    InvalidVerb,

    #[error("resource is empty")]
    InvalidResource,

    #[error("Content-Type is empty but there is actual content")]
    ContentTypeMissing,

    #[error("Content-Type is non-empty but there is no content")]
    ContentWithoutType,

    #[error("request to send is too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("could not initialize transport: {0}")]
    TransportInitFailed(String),

    #[error("request failed: {0}")]
    Transport(String),
}

impl SendError {
    pub fn code(&self) -> i32 {
        match self {
            SendError::InvalidPort => -1,
            SendError::InvalidHost => -2,
            SendError::InvalidVerb => -3,
            SendError::InvalidResource => -4,
            SendError::ContentTypeMissing => -5,
            SendError::ContentWithoutType => -6,
            SendError::PayloadTooLarge { .. } => -7,
            SendError::TransportInitFailed(_) => -8,
            SendError::Transport(_) => -9,
        }
    }

    /**
     * Only transport-level failures say something about the destination's
     * health. Precondition and size failures are caller bugs.
     */
    pub fn raises_alarm(&self) -> bool {
        matches!(
            self,
            SendError::TransportInitFailed(_) | SendError::Transport(_)
        )
    }

    /// True for failures detected before any network activity.
    pub fn is_precondition(&self) -> bool {
        self.code() >= -7
    }
}

/// Collapses a send result into the unified numeric code.
pub fn result_code<T>(result: &Result<T>) -> i32 {
    match result {
        Ok(_) => SUCCESS,
        Err(e) => e.code(),
    }
}

/*!
 * Precondition checks run before any resource is touched.
 */
use crate::error::{Result, SendError};
use crate::protocol::request::NotificationRequest;

/**
 * Rejects structurally invalid requests. Checks run in code order, so a
 * request with several problems reports the lowest-numbered one first.
 */
pub fn validate(request: &NotificationRequest) -> Result<()> {
    if request.port == 0 {
        return Err(SendError::InvalidPort);
    }
    if request.host.is_empty() {
        return Err(SendError::InvalidHost);
    }
    if request.verb.is_empty() {
        return Err(SendError::InvalidVerb);
    }
    if request.resource.is_empty() {
        return Err(SendError::InvalidResource);
    }
    if request.content_type.is_empty() && !request.body.is_empty() {
        return Err(SendError::ContentTypeMissing);
    }
    if !request.content_type.is_empty() && request.body.is_empty() {
        return Err(SendError::ContentWithoutType);
    }
    Ok(())
}

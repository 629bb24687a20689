/*!
 * Protocol layer: what goes on the wire.
 *
 * - `request`: NotificationRequest and the Timeout model
 * - `headers`: case-insensitive header keys, HeaderSet, composition rules
 * - `constants`: header names, user-agent token, default sentinels
 */

pub mod constants;
pub mod headers;
pub mod request;

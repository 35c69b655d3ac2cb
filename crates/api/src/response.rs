//! Shared response envelope types for API handlers.
//!
//! Management endpoints wrap payloads in a `{ "data": ... }` envelope. The
//! validation endpoint is the exception: its `{ "valid": ... }` body is a
//! contract with plugin clients.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

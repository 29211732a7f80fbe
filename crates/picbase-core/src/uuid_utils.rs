//! UUID v7 helpers.
//!
//! All picbase identifiers are UUIDv7, so ids sort in creation order.

use uuid::Uuid;

/// Generate a new UUIDv7 identifier.
#[inline]
pub fn new_v7() -> Uuid {
    Uuid::now_v7()
}

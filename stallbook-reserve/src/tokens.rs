use uuid::Uuid;

/// Issue a fresh pass token. Opaque to everything but the QR codec, which
/// re-identifies the reservation by it at venue entry; the storage layer
/// carries a unique constraint on the column as the backstop.
pub fn generate_pass_token() -> String {
    format!("BF-{}", Uuid::new_v4().simple())
}

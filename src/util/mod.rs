/// CBOR stream helpers
pub mod cbor;

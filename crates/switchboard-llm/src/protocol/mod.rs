//! Wire format types for each adapter family
//!
//! Pure serde structs matching each provider's JSON. They only exist at the
//! boundary; decoders turn them into canonical types straight away.

pub mod chat;
pub mod messages;
pub mod responses;
pub mod session;

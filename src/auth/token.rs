//! Token secrets and the session-bound access/refresh pair.

pub mod pair;
pub mod secret;

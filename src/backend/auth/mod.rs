//! Authentication and User Directory
//!
//! Token issuance belongs to the external identity provider; this module only
//! verifies tokens and resolves their subject to a user. The user-directory
//! adapter owns the presence flags the gateway flips on connect/disconnect.

pub mod sessions;
pub mod users;

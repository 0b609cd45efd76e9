//! SAML 2.0 types and data structures.
//!
//! This module contains the SAML types exchanged with a SPID identity
//! provider: the outgoing requests, the incoming responses and the assertion.

mod assertion;
mod authn_request;
mod constants;
mod logout;
mod name_id;
mod parse;
mod response;
mod status;

pub use assertion::*;
pub use authn_request::*;
pub use constants::*;
pub use logout::*;
pub use name_id::*;
pub use response::*;
pub use status::*;

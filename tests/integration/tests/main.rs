//! End-to-End Integration Tests
//!
//! These tests drive the SPID engine the way a service provider does:
//! build a request, receive a response signed by the identity provider and
//! validate it. All key material comes from `tests/fixtures`.

mod common;
mod logout;
mod request_builder;
mod response_validation;
mod signature_engine;

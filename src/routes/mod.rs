//! Router Module Index
//!
//! Routing split by access tier. Authentication is applied as a layer on the
//! authenticated module; role checks happen inside the handlers.

/// Routes accessible without a session.
pub mod public;

/// Routes protected by the `AuthUser` extractor middleware.
pub mod authenticated;

/// Routes restricted to the ADMIN role.
pub mod admin;

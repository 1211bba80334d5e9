//! Extension discovery and registration.
//!
//! A discovery source advertises named entries under a key; the registrar
//! resolves each entry, checks its name and shape, and binds it into a
//! host-owned namespace. Failures stay local to the entry that caused them.

pub mod discovery;
pub mod entry_points;
pub mod namespace;
pub mod naming;
pub mod registrar;

//! Ergen Core Types
//!
//! This crate provides the foundational types shared by the ergen crates:
//!
//! - **Semantic**: the entity-relationship model a diagram elaborates into
//!   ([`semantic`] module), together with its canonical markup formatting.

pub mod semantic;

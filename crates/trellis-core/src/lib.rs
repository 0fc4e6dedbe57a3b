//! Trellis Core Types and Definitions
//!
//! This crate provides the foundational types shared by the Trellis layout
//! pipeline. It includes:
//!
//! - **Identifiers**: Interned, qualified object identifiers ([`identifier::Id`])
//! - **Geometry**: Points, sizes, bounds and segments ([`geometry`] module)
//! - **Shapes**: Shape kinds with border tracing ([`shape`] module)
//! - **Labels**: Label and icon anchor positions ([`label`] module)
//! - **Diagram**: The nested object tree and its edges ([`diagram`] module)

pub mod diagram;
pub mod geometry;
pub mod identifier;
pub mod label;
pub mod shape;

//! Host-independent primitives the layout engine is built on.

pub mod geometry;

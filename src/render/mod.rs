//! Host-side render representation.
//!
//! The render layer draws one impostor sphere per [`ParticleInstance`];
//! this module keeps that data in sync with completed frame updates.

mod instances;

pub use instances::{InstanceSet, ParticleInstance};

//! Intersection Simulation Library
//!
//! A four-way traffic-intersection simulation: vehicles spawn, approach
//! the intersection, obey light state, and a light controller cycles
//! through directions using queue counts, emergency overrides and an
//! externally supplied scheduling label. Runs headless; rendering hosts
//! consume the read-only snapshot surface.

pub mod simulation;

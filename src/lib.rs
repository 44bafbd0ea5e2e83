//! Constrained multipath route selection over AS-level topologies.
//!
//! A request names a source and destination AS, capabilities every on-path
//! AS must have, capabilities that are merely preferred, countries to avoid,
//! an optimisation objective and how many edge-disjoint paths to return.
//! [`runtime::pipeline::RouteRequestPipeline`] runs the phases in order:
//! strict pruning, best-effort subset search, scoring, multipath selection.

pub mod error;
pub mod model;
pub mod route_compute;
pub mod runtime;

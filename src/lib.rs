pub mod camera;
pub mod config;
pub mod geometry;
pub mod io;
pub mod map;
pub mod optimizer;
pub mod simulation;
pub mod system;
pub mod tracking;

#[cfg(test)]
pub(crate) mod test_helpers;

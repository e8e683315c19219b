//! Mosaic
//!
//! Mosaic distributes the interactive elements of an application across the devices
//! shared by a group of users. Each element is placed on zero or more devices and sized
//! within its bounds, so that every user can reach the elements they may see on a device
//! they are authorized to use.
//!
//! The assignment is formulated as a Mixed Integer Linear Program and solved with
//! [`good_lp`]. See [`optimizer::Optimizer`] for the entry point.

pub mod assignment;
pub mod config;
pub mod devices;
pub mod elements;
pub mod logging;
pub mod matrix;
pub mod model;
pub mod optimizer;
pub mod prelude;
pub mod preprocess;
pub mod problem;
pub mod properties;
pub mod report;
pub mod scenarios;
pub mod solvers;
pub mod users;
pub mod utils;

#[cfg(test)]
mod test_support;

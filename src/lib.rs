#![cfg_attr(not(test), no_std)]
extern crate alloc;

pub mod devices;
pub mod error;
pub mod field;
pub mod geometry;
pub mod kinematics;
pub mod logger;
pub mod robot_state;
pub mod targeting;
pub mod tracking;
pub mod vision;

#[macro_use]
pub mod utils;

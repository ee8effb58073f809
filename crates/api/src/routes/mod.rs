//! Route handlers

pub mod health;
pub mod nearest;
pub mod sensors;

//! Placement, packing and shelf layout for baskets of apples on a table.

pub mod api;
pub mod config;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod model;
pub mod packer;
pub mod session;
pub mod types;

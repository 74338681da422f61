//! The platform boundary: geometry, displays and the window server.

pub mod geometry;
pub mod headless;
pub mod screen;
pub mod window_server;

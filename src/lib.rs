pub mod common;
pub mod layout_engine;
pub mod session;
pub mod sys;
pub mod wm_controller;

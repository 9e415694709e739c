pub mod base;
pub mod behavior;
pub mod config;
pub mod coordinator;
pub mod geometry;
pub mod kinematics;
pub mod messages;
pub mod motion;
pub mod runtime;
pub mod sensors;
pub mod servo;
pub mod sim;

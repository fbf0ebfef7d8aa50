pub mod baseline;
pub mod change_detector;
pub mod config;
pub mod display;
pub mod epd7in5_v2;
pub mod framebuffer;
pub mod policy;
pub mod present;
pub mod scheduler;
pub mod simulated;

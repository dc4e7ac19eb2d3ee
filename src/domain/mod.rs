pub mod across;
pub mod config_manager;
pub mod decorate;
pub mod extract;
pub mod fill;
pub mod imshow;
pub mod interactive;
pub mod session;
pub mod timeaxis;
pub mod zscale;

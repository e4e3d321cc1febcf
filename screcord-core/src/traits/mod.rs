pub mod capture_delegate;
pub mod plugin;
pub mod sink;

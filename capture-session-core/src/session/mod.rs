pub mod capture_session;
pub mod continuity;
pub mod device_selector;
pub mod interruption_monitor;
pub mod route_manager;

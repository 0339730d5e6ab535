pub mod expiry_sweeper;
pub mod notification_sender;

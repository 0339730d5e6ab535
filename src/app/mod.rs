pub mod humanize;
pub mod moderation;
pub mod notifications;

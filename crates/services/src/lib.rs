#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
mod join;
pub mod notify;
pub mod tracker_service;

pub use app_services::AppServices;
pub use error::TrackerError;
pub use notify::{Notice, NoticeLevel, Notifier, NullNotifier, RecordingNotifier};
pub use tracker_service::{TrackerService, TrackerSnapshot};

pub mod notification_worker;

pub use notification_worker::NotificationWorker;

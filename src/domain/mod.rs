pub mod notification;

pub use notification::{DeepLink, Notification, NotificationDetails, Partition, Sender};

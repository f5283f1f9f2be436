pub mod notifications;
pub mod sepay;

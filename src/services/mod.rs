pub mod apartments;
pub mod auth;
pub mod init;
pub mod invoice_infos;
pub mod mailer;
pub mod password_reset;
pub mod shares;
pub mod uploads;
pub mod users;
pub mod validation;

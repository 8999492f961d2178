pub mod apartment;
pub mod invoice_info;
pub mod password_reset;
pub mod refresh_token;
pub mod share;
pub mod user;

pub use apartment::ApartmentRepository;
pub use invoice_info::InvoiceInfoRepository;
pub use password_reset::PasswordResetRepository;
pub use refresh_token::RefreshTokenRepository;
pub use share::ShareRepository;
pub use user::UserRepository;

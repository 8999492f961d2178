//! Database models, one file per table.
//! Types are re-exported at `crate::db::models` so callers can
//! `use crate::db::models::*;`.

pub mod apartment;
pub mod decimal;
pub mod invoice_info;
pub mod password_reset;
pub mod refresh_token;
pub mod share;
pub mod user;

pub use self::apartment::*;
pub use self::decimal::*;
pub use self::invoice_info::*;
pub use self::password_reset::*;
pub use self::refresh_token::*;
pub use self::share::*;
pub use self::user::*;

pub mod error;
pub mod history;
pub mod session;

pub use error::SessionError;

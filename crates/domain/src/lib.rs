pub mod contact;
pub mod error;
pub mod feed;
pub mod identity;
pub mod messaging;
pub mod notify;
pub mod ports;
pub mod util;

pub type DomainResult<T> = Result<T, error::DomainError>;

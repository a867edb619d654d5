use std::future::Future;
use std::pin::Pin;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub mod contact;
pub mod directory;
pub mod feed;
pub mod messaging;
pub mod notify;

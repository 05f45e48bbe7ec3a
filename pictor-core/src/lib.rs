pub mod config;
pub mod encode;
pub mod error;
pub mod loader;
pub mod mime;
pub mod naming;
pub mod storage;

pub use config::Config;
pub use error::{Error, ErrorCode, Result};
pub use loader::LoadedImage;
pub use mime::ImageKind;
pub use storage::{Checkout, Storage};

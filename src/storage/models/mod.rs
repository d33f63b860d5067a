//! Storage models.

mod channel;
mod session;
mod upload;

pub use channel::ChannelInfo;
pub use session::{DEFAULT_CAPTION, Quality, UserSession};
pub use upload::UploadRecord;

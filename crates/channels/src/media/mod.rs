pub mod formats;
pub mod media_item;
pub mod stream_info;

pub use formats::{ContentType, MediaType, StreamFormat};
pub use media_item::MediaItem;
pub use stream_info::{MediaStream, Subtitle};

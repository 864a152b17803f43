//! On-disk layout: data directory resolution and the screenshot blob store.

pub mod paths;
mod screenshots;


#[cfg(test)]
pub use screenshots::MockScreenshotStore;
pub use screenshots::{FsScreenshotStore, ImageType, ScreenshotStore, StoreError, detect_image_type};

pub mod geometry;
pub mod mapper;
pub mod session;

pub use geometry::{BoxSize, DisplayPoint, ImageGeometry, ImagePoint, Offset, RoiBox, RoiPair, WidgetSize};
pub use mapper::{map_to_display, map_to_image};
pub use session::{DragUpdate, RoiSession, RoiSide};

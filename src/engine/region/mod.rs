mod boundary;
mod drawables;
mod game_region;
mod registry;


pub use boundary::{BoundaryDescriptor, BoundaryLink};
pub use drawables::{
    CompoundDrawable, Drawable, DrawableHandle, FrameAnimation, PointDrawable, PriorityDrawables, RenderTarget,
    Updatable,
};
pub use game_region::GameRegion;
pub use registry::RegionRegistry;

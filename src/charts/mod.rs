//! Charts module - interactive plots and static map renders

pub mod colormap;
mod plotter;
mod renderer;

pub use plotter::ChartPlotter;
pub use renderer::{MapRenderer, RenderError, RenderedImage};

// Library exports for chartspec

pub mod annotation;
pub mod axes;
pub mod config;
pub mod csv_reader;
pub mod data;
pub mod extract;
pub mod forecast;
pub mod ir;
pub mod normalize;
pub mod palette;
pub mod parser;
pub mod stacking;
pub mod tooltip;
pub mod transform;

pub use config::ChartConfig;
pub use ir::RenderSpec;
pub use transform::build_render_spec;

#![forbid(unsafe_code)]

mod rendering;

pub use rendering::{
    init_tracing, render_instances_to_png, render_points_to_png, top_down, Canvas, PrefabStyle,
    RenderConfig,
};

mod driving_distance;
mod state;
mod traced_dijkstra;

pub use driving_distance::dijkstra_path_weights;
pub(crate) use traced_dijkstra::{PathTrace, dijkstra_path};

// Modules
pub mod constants;
pub mod data;
pub mod dataset;
pub mod errors;
pub mod metrics;
pub mod node;
pub mod splitter;
pub mod tree;
pub mod utils;

// Individual classes, and functions
pub use data::Matrix;
pub use tree::{DecisionTree, Prediction};

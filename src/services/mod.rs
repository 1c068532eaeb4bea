pub mod advice;
pub mod classifier;
pub mod compensation;
pub mod heatmap;
pub mod providers;

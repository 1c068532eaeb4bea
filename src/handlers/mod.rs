mod compensation;
mod predict;
mod recommendation;

pub use compensation::calculate_compensation;
pub use predict::predict;
pub use recommendation::get_recommendation;

/// Liveness probe; plain text on purpose, the frontend only checks for 200.
pub async fn health() -> &'static str {
    "Crop assessment backend is running."
}

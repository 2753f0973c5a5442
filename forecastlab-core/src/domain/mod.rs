//! Domain types shared by every pipeline stage.

pub mod ids;
pub mod price;

pub use ids::DatasetHash;
pub use price::PricePoint;

pub mod address;
pub mod confidence;
pub mod edit_distance;
pub mod manager;
pub mod normalize;
pub mod result_cache;
pub mod subsidiary;

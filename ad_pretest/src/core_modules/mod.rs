pub mod pixel;
pub mod pixel_buffer;
pub mod luma;
pub mod saliency_map;
pub mod edge_saliency;
pub mod external_heatmap;
pub mod heatmap_fuser;
pub mod color_map;
pub mod cta;
pub mod metrics;
pub mod scoring;

pub mod landing_routes;
pub mod link_routes;

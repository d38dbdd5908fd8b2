pub mod reddit;
pub mod youtube;

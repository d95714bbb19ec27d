pub mod engineer;
pub mod frame;

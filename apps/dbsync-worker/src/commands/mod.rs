pub mod check;
pub mod handle;

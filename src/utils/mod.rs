pub mod atomic;
pub mod error;

pub use atomic::write_atomic;

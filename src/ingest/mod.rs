pub mod decoder;
pub mod error;
pub mod framer;
pub mod router;

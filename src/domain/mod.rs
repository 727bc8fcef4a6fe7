pub mod code;
pub mod hash;
pub mod track;

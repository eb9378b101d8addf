pub mod discrepancy;
pub mod error;
pub mod linear;
pub mod path;
pub mod tensor;

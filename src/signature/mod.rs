pub mod channels;
pub mod depth2;
pub mod transform;

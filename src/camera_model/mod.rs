pub mod brown_conrady;
pub mod generic;

pub use brown_conrady::BrownConrady;
pub use generic::*;

pub mod file_store;
pub mod fingerprint;
pub mod master;
pub mod watermark;

pub use file_store::*;
pub use fingerprint::*;
pub use master::*;
pub use watermark::*;

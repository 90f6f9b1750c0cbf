pub mod compare;
pub mod domain;
pub mod errors;
pub mod judge;
pub mod session;
pub mod supervisor;
pub mod traits;

pub mod contact;
pub mod enums;
pub mod report;
pub mod risk;
pub mod vitals;

pub use contact::*;
pub use enums::*;
pub use report::*;
pub use risk::*;
pub use vitals::*;

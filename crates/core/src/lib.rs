pub mod analysis;
pub mod enums;
pub mod error;
pub mod models;
pub mod time;
pub mod validate;

// 导出让外部使用
pub use analysis::*;
pub use enums::*;
pub use error::*;
pub use models::*;
pub use time::*;

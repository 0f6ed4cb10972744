pub mod core;
pub mod exchanges;
pub mod strategies;

// 选择性导出，避免命名冲突
pub use self::core::{broker::*, config::*, error::*, types::*};
pub use exchanges::*;
pub use strategies::*;

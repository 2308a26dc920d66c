pub mod settings;
pub mod tool;
pub mod update;

pub use settings::*;
pub use tool::*;
pub use update::*;

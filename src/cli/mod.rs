pub mod commands;
pub mod ui;
pub mod util;

pub use util::{ChangeArgs, CommandContext, load_config};

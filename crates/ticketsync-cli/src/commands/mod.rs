pub mod add;
pub mod board;
pub mod common;
pub mod completions;
pub mod delete;
pub mod edit;
pub mod list;
pub mod move_cmd;
pub mod status;
pub mod sync;

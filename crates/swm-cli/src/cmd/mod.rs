pub mod code;
pub mod story;
pub mod tmux;

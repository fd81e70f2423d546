//! 命令行工具支持

mod printer;

pub use printer::{check_vertical_display, PrintMode, Printer};

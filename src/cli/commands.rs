//! # Commands Module / 命令模块
//!
//! One module per subcommand: `run`, `compare`, `reparse` and `init`.
//!
//! 每个子命令一个模块：`run`、`compare`、`reparse` 和 `init`。

pub mod compare;
pub mod init;
pub mod reparse;
pub mod run;

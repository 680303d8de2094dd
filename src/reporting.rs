//! # Reporting Module / 报告模块
//!
//! This module handles what the user sees: colored progress and summaries in the console, and
//! the hand-off to the external report renderer.
//!
//! 此模块处理用户看到的内容：控制台中的彩色进度和摘要，以及交给外部报告渲染器的工作。

pub mod console;
pub mod renderer;

pub use console::{print_campaign_summary, print_comparison, print_reparse};
pub use renderer::{render_report, render_run_report};

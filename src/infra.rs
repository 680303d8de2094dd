//! # Infrastructure Module / 基础设施模块
//!
//! This module provides infrastructure services for the benchmark runner,
//! including subprocess control, crash-safe file writes, secret redaction, logging and i18n.
//!
//! 此模块为基准测试运行器提供基础设施服务，
//! 包括子进程控制、崩溃安全的文件写入、密钥脱敏、日志和国际化支持。

pub mod command;
pub mod fs;
pub mod logging;
pub mod redact;

// Re-export i18n functions for easier access
pub use rust_i18n::t;

//! # Core Module / 核心模块
//!
//! This module contains the benchmark engine: data models, configuration, matrix planning,
//! trial supervision, output normalization, the result store, comparisons and re-parsing.
//!
//! 此模块包含基准测试引擎：数据模型、配置、矩阵计划、试验监督、输出规范化、结果存储、比较和重新解析。

pub mod campaign;
pub mod compare;
pub mod config;
pub mod error;
pub mod execution;
pub mod models;
pub mod parser;
pub mod planner;
pub mod preflight;
pub mod reparse;
pub mod store;

// Re-exports
pub use campaign::Campaign;
pub use config::BenchMatrix;
pub use error::BenchError;
pub use models::TrialResult;

//! # 常用接口模块
//!
//! 本模块提供一些常用的操作接口：随机数源的解析、按样本维分批、形状的简写

#[cfg(test)]
mod tests;

mod batch;
mod random;
mod shape;

pub use batch::{Batched, batched};
pub use random::{RngSource, check_random_state, seed_default_rng};
pub use shape::Shape;

/*
 * @Description  : Var 扩展 trait 模块
 *
 * 按功能领域组织 Var 的扩展方法，用户按需 import。
 *
 * # 模块结构
 * - `activation`: 逐元素函数（tanh, sigmoid, exp, log, sqrt）与 softmax
 * - `matrix`: 矩阵运算（matmul）
 * - `reduce`: 归约（sum, mean）
 * - `shape`: 形状变换（reshape, flatten, expand_dims）
 * - `spatial`: 空间运算（conv2d, max_pool2d）
 */

mod activation;
mod matrix;
mod reduce;
mod shape;
mod spatial;

pub use activation::VarActivationOps;
pub use matrix::VarMatrixOps;
pub use reduce::VarReduceOps;
pub use shape::VarShapeOps;
pub use spatial::VarSpatialOps;

/*
 * @Description  : Var 形状变换扩展 trait
 */

use crate::nn::nodes::raw_node::{ExpandDims, Flatten, Reshape};
use crate::nn::{GraphError, Var};

/// 形状变换扩展 trait
///
/// # 使用示例
/// ```ignore
/// let flat = images.flatten(2)?;            // [N, C, H, W] -> [N, C*H*W]
/// let out = flat.reshape(&[-1, 4, 5])?;    // -1 由元素总数推断
/// ```
pub trait VarShapeOps {
    /// 变形为`shape`，至多一个维度可为-1
    fn reshape(&self, shape: &[isize]) -> Result<Var, GraphError>;

    /// 保留前`outdim-1`个维度，其余展平
    fn flatten(&self, outdim: usize) -> Result<Var, GraphError>;

    fn expand_dims(&self, axis: usize) -> Result<Var, GraphError>;
}

impl VarShapeOps for Var {
    fn reshape(&self, shape: &[isize]) -> Result<Var, GraphError> {
        self.op(Reshape::new(shape)?, &[self])
    }

    fn flatten(&self, outdim: usize) -> Result<Var, GraphError> {
        self.op(Flatten::new(outdim), &[self])
    }

    fn expand_dims(&self, axis: usize) -> Result<Var, GraphError> {
        self.op(ExpandDims::new(axis), &[self])
    }
}

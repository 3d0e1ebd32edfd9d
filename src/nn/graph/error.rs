/*
 * @Description  : Graph 模块的错误类型
 */

use crate::errors::TensorError;
use crate::nn::NodeId;
use thiserror::Error;

/// Graph 操作错误类型
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum GraphError {
    #[error("节点{0:?}不存在")]
    NodeNotFound(NodeId),
    #[error("非法操作：{0}")]
    InvalidOperation(String),
    #[error("形状不匹配：{message}（期望{expected:?}，实际{got:?}）")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
        message: String,
    },
    #[error("阶数不匹配：{message}（期望{expected}阶，实际{got}阶）")]
    DimensionMismatch {
        expected: usize,
        got: usize,
        message: String,
    },
    #[error("计算错误：{0}")]
    ComputationError(String),
    /// 参数节点尚未被写入真实值就参与了计算
    #[error("参数`{name}`尚未初始化，无法参与计算")]
    UninitializedValue { name: String },
    #[error("缺少输入节点`{name}`的值")]
    MissingInput { name: String },
    #[error(transparent)]
    Tensor(#[from] TensorError),
}

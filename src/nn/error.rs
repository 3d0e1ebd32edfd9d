/*
 * @Description  : 层、初始化与优化器的错误类型
 */

use super::GraphError;
use crate::errors::TensorError;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum NnError {
    /// 构造参数或选项非法（未知的近似名称、负数种子、形状不符等）
    #[error("配置错误：{0}")]
    Configuration(String),
    #[error("参数`{name}`没有绑定初始化器，无法重新初始化")]
    UninitializedParameter { name: String },
    /// 有状态的层在`reinit`建立随机源之前就被用于训练
    #[error("层`{layer}`尚未初始化（请先调用`reinit`）")]
    UninitializedLayer { layer: String },
    #[error("内部约定被破坏：{0}")]
    ProgrammingInvariant(String),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Tensor(#[from] TensorError),
}

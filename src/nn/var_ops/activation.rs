/*
 * @Description  : Var 逐元素函数扩展 trait
 */

use crate::nn::nodes::SigmoidKind;
use crate::nn::nodes::raw_node::{Exp, Log, Sigmoid, Softmax, Sqrt, Tanh};
use crate::nn::{GraphError, Var};

/// 激活函数扩展 trait
///
/// # 使用示例
/// ```ignore
/// use minibatch_torch::nn::{Var, VarActivationOps};
///
/// let h = x.tanh()?;
/// let probs = logits.softmax()?;
/// ```
pub trait VarActivationOps {
    fn tanh(&self) -> Result<Var, GraphError>;

    /// Sigmoid 激活，`kind`选择精确形式或两种近似之一
    fn sigmoid(&self, kind: SigmoidKind) -> Result<Var, GraphError>;

    /// 沿最后一维计算 softmax，输入形状 [batch, classes]
    fn softmax(&self) -> Result<Var, GraphError>;

    fn exp(&self) -> Result<Var, GraphError>;

    /// 自然对数
    fn log(&self) -> Result<Var, GraphError>;

    fn sqrt(&self) -> Result<Var, GraphError>;
}

impl VarActivationOps for Var {
    fn tanh(&self) -> Result<Var, GraphError> {
        self.op(Tanh, &[self])
    }

    fn sigmoid(&self, kind: SigmoidKind) -> Result<Var, GraphError> {
        self.op(Sigmoid::new(kind), &[self])
    }

    fn softmax(&self) -> Result<Var, GraphError> {
        self.op(Softmax, &[self])
    }

    fn exp(&self) -> Result<Var, GraphError> {
        self.op(Exp, &[self])
    }

    fn log(&self) -> Result<Var, GraphError> {
        self.op(Log, &[self])
    }

    fn sqrt(&self) -> Result<Var, GraphError> {
        self.op(Sqrt, &[self])
    }
}

mod ops;

pub(crate) use ops::*;
pub use ops::{BorderMode, SigmoidKind};

use crate::nn::GraphError;
use crate::tensor::Tensor;
use enum_dispatch::enum_dispatch;

#[enum_dispatch]
pub(crate) enum NodeType {
    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓逐元素算子↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    Add(Add),
    Subtract(Subtract),
    Multiply(Multiply),
    Divide(Divide),
    Maximum(Maximum),
    Minimum(Minimum),
    Negate(Negate),
    Exp(Exp),
    Log(Log),
    Sqrt(Sqrt),
    Tanh(Tanh),
    Sigmoid(Sigmoid),
    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑逐元素算子↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/
    MatMul(MatMul),
    Softmax(Softmax),
    Reduce(Reduce),
    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓形状变换↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    Reshape(Reshape),
    Flatten(Flatten),
    ExpandDims(ExpandDims),
    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑形状变换↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/
    Conv2d(Conv2d),
    MaxPool2d(MaxPool2d),
    DropoutMask(DropoutMask),
}

#[enum_dispatch(NodeType)]
pub(crate) trait TraitNode {
    fn type_name(&self) -> &'static str;

    /// 建图时根据父节点的阶数推断本节点的阶数，同时校验父节点个数及阶数是否合法
    fn infer_ndim(&self, parent_ndims: &[usize]) -> Result<usize, GraphError>;

    // 根据父节点的值计算本节点的值（调用方保证所有父节点的值都已被计算过）
    fn calc_value_by_parents(&self, parents: &[&Tensor]) -> Result<Tensor, GraphError>;

    /// 给定本节点的上游梯度`upstream`（形状与`value`一致），求对第`index`个父节点的梯度。
    /// 返回`None`表示梯度不经由该父节点回传
    fn calc_grad_to_parent(
        &self,
        index: usize,
        parents: &[&Tensor],
        value: &Tensor,
        upstream: &Tensor,
    ) -> Result<Option<Tensor>, GraphError>;
}

pub(crate) fn check_parents_count(
    type_name: &str,
    parent_ndims: &[usize],
    expected: usize,
) -> Result<(), GraphError> {
    if parent_ndims.len() != expected {
        return Err(GraphError::InvalidOperation(format!(
            "{}节点需要{}个父节点，实际为{}个",
            type_name,
            expected,
            parent_ndims.len()
        )));
    }
    Ok(())
}

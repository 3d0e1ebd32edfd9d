use super::raw_node::NodeType;
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

/// 参数节点的取值：要么尚未初始化（仅知道形状），要么已有真实的值
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Uninitialized { shape: Vec<usize> },
    Initialized(Tensor),
}

impl ParamValue {
    pub fn shape(&self) -> &[usize] {
        match self {
            Self::Uninitialized { shape } => shape,
            Self::Initialized(value) => value.shape(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self, Self::Initialized(_))
    }

    pub fn value(&self) -> Option<&Tensor> {
        match self {
            Self::Uninitialized { .. } => None,
            Self::Initialized(value) => Some(value),
        }
    }
}

pub(crate) enum NodeKind {
    /// 输入占位符，值在每次执行时由调用方给出
    Input,
    /// 可被更新的共享张量
    Parameter(ParamValue),
    /// 建图时即确定、不可更新的常量
    Constant(Tensor),
    /// 由父节点计算得到的算子节点
    Op(NodeType),
    /// `cost`（唯一的父节点）对`wrt`的梯度
    Gradient { wrt: NodeId },
}

pub(crate) struct NodeHandle {
    id: NodeId,
    name: String,
    kind: NodeKind,
    parents: Vec<NodeId>,
    ndim: usize,
}

impl NodeHandle {
    pub(crate) fn new(
        id: NodeId,
        name: String,
        kind: NodeKind,
        parents: Vec<NodeId>,
        ndim: usize,
    ) -> Self {
        Self {
            id,
            name,
            kind,
            parents,
            ndim,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub(crate) fn kind_mut(&mut self) -> &mut NodeKind {
        &mut self.kind
    }

    pub(crate) fn parents(&self) -> &[NodeId] {
        &self.parents
    }

    /// 节点值的阶数，在建图时即已确定（具体各维长度则在执行时才知道）
    pub(crate) fn ndim(&self) -> usize {
        self.ndim
    }

    pub(crate) fn is_parameter(&self) -> bool {
        matches!(self.kind, NodeKind::Parameter(_))
    }

    pub(crate) fn is_input(&self) -> bool {
        matches!(self.kind, NodeKind::Input)
    }
}

impl std::fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[id={}, name={}]", self.id.0, self.name)
    }
}

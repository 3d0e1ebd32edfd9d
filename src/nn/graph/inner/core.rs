/*
 * @Description  : GraphInner 核心操作：节点的创建、查询，以及参数值的读写
 */

use super::GraphInner;
use crate::nn::GraphError;
use crate::nn::NodeId;
use crate::nn::nodes::raw_node::{NodeType, TraitNode};
use crate::nn::nodes::{NodeHandle, NodeKind, ParamValue};
use crate::tensor::Tensor;
use std::collections::HashMap;

impl GraphInner {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn nodes_count(&self) -> usize {
        self.nodes.len()
    }

    // ========== 查询 ==========

    pub(crate) fn get_node(&self, id: NodeId) -> Result<&NodeHandle, GraphError> {
        self.nodes.get(&id).ok_or(GraphError::NodeNotFound(id))
    }

    pub(crate) fn get_node_mut(&mut self, id: NodeId) -> Result<&mut NodeHandle, GraphError> {
        self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))
    }

    pub fn get_node_name(&self, id: NodeId) -> Result<&str, GraphError> {
        Ok(self.get_node(id)?.name())
    }

    pub fn get_node_ndim(&self, id: NodeId) -> Result<usize, GraphError> {
        Ok(self.get_node(id)?.ndim())
    }

    pub fn is_parameter(&self, id: NodeId) -> Result<bool, GraphError> {
        Ok(self.get_node(id)?.is_parameter())
    }

    pub fn is_input(&self, id: NodeId) -> Result<bool, GraphError> {
        Ok(self.get_node(id)?.is_input())
    }

    // ========== 创建 ==========

    fn add_node(
        &mut self,
        name: Option<&str>,
        default_prefix: &str,
        kind: NodeKind,
        parents: Vec<NodeId>,
        ndim: usize,
    ) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        // 未指定名称时，生成类似"MatMul_3"的节点名
        let name = match name {
            Some(name) => name.to_string(),
            None => format!("{}_{}", default_prefix, id.0),
        };
        self.nodes
            .insert(id, NodeHandle::new(id, name, kind, parents, ndim));
        id
    }

    /// 输入占位符：只声明阶数，各维长度在每次执行时才确定
    pub fn new_input_node(&mut self, ndim: usize, name: Option<&str>) -> NodeId {
        self.add_node(name, "Input", NodeKind::Input, vec![], ndim)
    }

    pub fn new_parameter_node(&mut self, value: ParamValue, name: Option<&str>) -> NodeId {
        let ndim = value.shape().len();
        self.add_node(name, "Parameter", NodeKind::Parameter(value), vec![], ndim)
    }

    pub fn new_constant_node(&mut self, value: Tensor, name: Option<&str>) -> NodeId {
        let ndim = value.dimension();
        self.add_node(name, "Constant", NodeKind::Constant(value), vec![], ndim)
    }

    pub(crate) fn new_op_node<T: Into<NodeType>>(
        &mut self,
        op: T,
        parents: &[NodeId],
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let op: NodeType = op.into();
        let parent_ndims = parents
            .iter()
            .map(|&id| self.get_node_ndim(id))
            .collect::<Result<Vec<_>, _>>()?;
        let ndim = op.infer_ndim(&parent_ndims)?;
        let prefix = op.type_name();
        Ok(self.add_node(name, prefix, NodeKind::Op(op), parents.to_vec(), ndim))
    }

    /// `cost`对`wrt`的梯度节点。`wrt`须为参数或输入节点，且梯度节点本身不可再被求导
    pub fn new_gradient_node(&mut self, cost: NodeId, wrt: NodeId) -> Result<NodeId, GraphError> {
        let cost_name = self.get_node(cost)?.name().to_string();
        let wrt_node = self.get_node(wrt)?;
        if !(wrt_node.is_parameter() || wrt_node.is_input()) {
            return Err(GraphError::InvalidOperation(format!(
                "只能对参数或输入节点求梯度，{}两者都不是",
                wrt_node
            )));
        }
        let ndim = wrt_node.ndim();
        let name = format!("grad_{}_{}", cost_name, wrt_node.name());
        Ok(self.add_node(
            Some(&name),
            "Gradient",
            NodeKind::Gradient { wrt },
            vec![cost],
            ndim,
        ))
    }

    // ========== 参数值 ==========

    pub fn get_param_value(&self, id: NodeId) -> Result<&ParamValue, GraphError> {
        let node = self.get_node(id)?;
        match node.kind() {
            NodeKind::Parameter(value) => Ok(value),
            _ => Err(GraphError::InvalidOperation(format!(
                "{}不是参数节点",
                node
            ))),
        }
    }

    /// 写入参数的值，形状须与参数声明的形状一致
    pub fn set_param_value(&mut self, id: NodeId, value: Tensor) -> Result<(), GraphError> {
        let node = self.get_node_mut(id)?;
        let description = node.to_string();
        match node.kind_mut() {
            NodeKind::Parameter(current) => {
                if current.shape() != value.shape() {
                    return Err(GraphError::ShapeMismatch {
                        expected: current.shape().to_vec(),
                        got: value.shape().to_vec(),
                        message: format!("写入{}的值形状不匹配", description),
                    });
                }
                *current = ParamValue::Initialized(value);
                Ok(())
            }
            _ => Err(GraphError::InvalidOperation(format!(
                "{}不是参数节点，不能写入值",
                description
            ))),
        }
    }
}

/*
 * @Description  : GraphInner 求值：
 *                 1. 前向：从根节点出发，按拓扑序计算所需节点的值；
 *                 2. 反向：遇到梯度节点时，基于同一次求值的前向结果，对其代价节点做一次
 *                    反向累积（VJP），得到代价对所有祖先节点的梯度并缓存。
 *                 所有中间结果都只存在于单次求值中。
 */

use super::GraphInner;
use crate::nn::GraphError;
use crate::nn::NodeId;
use crate::nn::nodes::NodeKind;
use crate::nn::nodes::raw_node::TraitNode;
use crate::tensor::Tensor;
use std::collections::{HashMap, HashSet};

impl GraphInner {
    /// 对`roots`求值。`inputs`须给出所有涉及的输入节点的值
    pub fn evaluate(
        &self,
        roots: &[NodeId],
        inputs: &HashMap<NodeId, Tensor>,
    ) -> Result<Vec<Tensor>, GraphError> {
        let mut evaluation = Evaluation {
            graph: self,
            inputs,
            values: HashMap::new(),
            adjoints: HashMap::new(),
        };
        let mut results = Vec::with_capacity(roots.len());
        for &root in roots {
            evaluation.ensure(root)?;
            results.push(evaluation.values[&root].clone());
        }
        Ok(results)
    }

    /// 按拓扑序（父节点在前）返回`roots`及其全部祖先
    pub fn ancestors(&self, roots: &[NodeId]) -> Result<Vec<NodeId>, GraphError> {
        let mut order = Vec::new();
        let mut visited = HashSet::new();
        // 显式栈实现的后序遍历：(节点, 其父节点是否都已入序)
        let mut stack: Vec<(NodeId, bool)> = roots.iter().rev().map(|&id| (id, false)).collect();
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            if !visited.insert(id) {
                continue;
            }
            stack.push((id, true));
            for &parent in self.get_node(id)?.parents().iter().rev() {
                if !visited.contains(&parent) {
                    stack.push((parent, false));
                }
            }
        }
        Ok(order)
    }
}

struct Evaluation<'a> {
    graph: &'a GraphInner,
    inputs: &'a HashMap<NodeId, Tensor>,
    values: HashMap<NodeId, Tensor>,
    /// 代价节点 -> (节点 -> 代价对该节点的梯度)
    adjoints: HashMap<NodeId, HashMap<NodeId, Tensor>>,
}

impl Evaluation<'_> {
    fn ensure(&mut self, root: NodeId) -> Result<(), GraphError> {
        for id in self.graph.ancestors(&[root])? {
            if self.values.contains_key(&id) {
                continue;
            }
            let value = self.compute(id)?;
            self.values.insert(id, value);
        }
        Ok(())
    }

    /// 计算单个节点的值（调用方保证其父节点都已有值）
    fn compute(&mut self, id: NodeId) -> Result<Tensor, GraphError> {
        let graph = self.graph;
        let node = graph.get_node(id)?;
        match node.kind() {
            NodeKind::Input => self
                .inputs
                .get(&id)
                .cloned()
                .ok_or_else(|| GraphError::MissingInput {
                    name: node.name().to_string(),
                }),
            NodeKind::Parameter(value) => {
                value
                    .value()
                    .cloned()
                    .ok_or_else(|| GraphError::UninitializedValue {
                        name: node.name().to_string(),
                    })
            }
            NodeKind::Constant(value) => Ok(value.clone()),
            NodeKind::Op(op) => {
                let parents = node
                    .parents()
                    .iter()
                    .map(|p| &self.values[p])
                    .collect::<Vec<_>>();
                op.calc_value_by_parents(&parents)
            }
            NodeKind::Gradient { wrt } => {
                let (cost, wrt) = (node.parents()[0], *wrt);
                self.backward(cost)?;
                if let Some(grad) = self.adjoints[&cost].get(&wrt) {
                    return Ok(grad.clone());
                }
                // 代价与`wrt`无关，梯度为0
                self.ensure(wrt)?;
                Ok(Tensor::zeros(self.values[&wrt].shape()))
            }
        }
    }

    fn backward(&mut self, cost: NodeId) -> Result<(), GraphError> {
        if self.adjoints.contains_key(&cost) {
            return Ok(());
        }
        let cost_value = &self.values[&cost];
        if cost_value.size() != 1 {
            return Err(GraphError::InvalidOperation(format!(
                "只能对标量代价求梯度，{}的形状为{:?}",
                self.graph.get_node(cost)?,
                cost_value.shape()
            )));
        }
        let graph = self.graph;
        let mut adjoints: HashMap<NodeId, Tensor> = HashMap::new();
        adjoints.insert(cost, Tensor::ones(cost_value.shape()));

        for id in graph.ancestors(&[cost])?.into_iter().rev() {
            let Some(upstream) = adjoints.get(&id).cloned() else {
                continue;
            };
            let node = graph.get_node(id)?;
            let op = match node.kind() {
                NodeKind::Op(op) => op,
                NodeKind::Gradient { .. } => {
                    return Err(GraphError::InvalidOperation(format!(
                        "不支持高阶导数：{}依赖于梯度节点{}",
                        graph.get_node(cost)?,
                        node
                    )));
                }
                _ => continue,
            };
            let parents = node
                .parents()
                .iter()
                .map(|p| &self.values[p])
                .collect::<Vec<_>>();
            let value = &self.values[&id];
            for (index, &parent) in node.parents().iter().enumerate() {
                let Some(grad) = op.calc_grad_to_parent(index, &parents, value, &upstream)? else {
                    continue;
                };
                match adjoints.get_mut(&parent) {
                    Some(acc) => *acc = acc.try_add(&grad)?,
                    None => {
                        adjoints.insert(parent, grad);
                    }
                }
            }
        }
        self.adjoints.insert(cost, adjoints);
        Ok(())
    }
}

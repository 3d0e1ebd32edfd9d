/*
 * @Description  : Graph 句柄（用户级 API）
 */

use super::error::GraphError;
use super::inner::GraphInner;
use crate::nn::nodes::ParamValue;
use crate::nn::var::Var;
use crate::nn::NodeId;
use crate::tensor::Tensor;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Graph - 计算图句柄
///
/// # 设计原则
/// - 是 `Rc<RefCell<GraphInner>>` 的薄封装
/// - Clone 语义：多个 Graph 引用同一个 GraphInner
/// - 创建的 Var 自动持有图引用
#[derive(Clone)]
pub struct Graph {
    inner: Rc<RefCell<GraphInner>>,
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph").finish_non_exhaustive()
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    // ==================== 创建 ====================

    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(GraphInner::new())),
        }
    }

    pub(crate) const fn from_rc(inner: Rc<RefCell<GraphInner>>) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> std::cell::Ref<'_, GraphInner> {
        self.inner.borrow()
    }

    pub(crate) fn inner_rc(&self) -> &Rc<RefCell<GraphInner>> {
        &self.inner
    }

    pub fn wrap_node_id(&self, node_id: NodeId) -> Var {
        Var::new(node_id, Rc::clone(&self.inner))
    }

    pub fn same_graph(&self, var: &Var) -> bool {
        Rc::ptr_eq(&self.inner, var.graph())
    }

    // ==================== 创建变量 ====================

    /// 创建`ndim`阶的输入占位符
    pub fn input(&self, ndim: usize, name: &str) -> Var {
        let id = self.inner.borrow_mut().new_input_node(ndim, Some(name));
        self.wrap_node_id(id)
    }

    /// 创建参数节点（共享、可被更新的张量）
    pub fn parameter(&self, value: ParamValue, name: &str) -> Var {
        let id = self.inner.borrow_mut().new_parameter_node(value, Some(name));
        self.wrap_node_id(id)
    }

    /// 创建全零的参数节点
    pub fn zeros_parameter(&self, shape: &[usize], name: &str) -> Var {
        self.parameter(ParamValue::Initialized(Tensor::zeros(shape)), name)
    }

    pub fn constant(&self, value: Tensor) -> Var {
        let id = self.inner.borrow_mut().new_constant_node(value, None);
        self.wrap_node_id(id)
    }

    // ==================== 求导 ====================

    /// 标量代价`cost`对`wrt`中每个节点的梯度，以节点身份为键
    pub fn grad(&self, cost: &Var, wrt: &[Var]) -> Result<HashMap<NodeId, Var>, GraphError> {
        if !self.same_graph(cost) {
            return Err(GraphError::InvalidOperation(
                "代价节点不属于本图".to_string(),
            ));
        }
        let mut grads = HashMap::with_capacity(wrt.len());
        let mut g = self.inner.borrow_mut();
        for p in wrt {
            if !self.same_graph(p) {
                return Err(GraphError::InvalidOperation(format!(
                    "求导对象{:?}不属于本图",
                    p
                )));
            }
            let id = g.new_gradient_node(cost.node_id(), p.node_id())?;
            grads.insert(p.node_id(), Var::new(id, Rc::clone(&self.inner)));
        }
        Ok(grads)
    }

    // ==================== 执行 ====================

    /// 在给定输入下对`outputs`求值，不应用任何更新
    pub fn evaluate(
        &self,
        outputs: &[Var],
        inputs: &[(&Var, &Tensor)],
    ) -> Result<Vec<Tensor>, GraphError> {
        let inputs = inputs
            .iter()
            .map(|(var, value)| (var.node_id(), (*value).clone()))
            .collect::<HashMap<_, _>>();
        let roots = outputs.iter().map(Var::node_id).collect::<Vec<_>>();
        self.inner.borrow().evaluate(&roots, &inputs)
    }
}

/*
 * @Description  : Var - 符号变量句柄，支持算子重载和链式调用
 */

use super::graph::{Graph, GraphInner};
use super::nodes::raw_node::{
    Add, Divide, DropoutMask, Maximum, Minimum, Multiply, Negate, NodeType, Subtract,
};
use super::nodes::ParamValue;
use super::{GraphError, NodeId};
use crate::tensor::{Float, Tensor};
use std::cell::RefCell;
use std::ops::{Add as AddOp, Div as DivOp, Mul as MulOp, Neg, Sub as SubOp};
use std::rc::Rc;

/// 符号变量句柄 - 携带图引用，支持算子重载和链式调用
///
/// # 设计原则
/// - 持有 `Rc<RefCell<GraphInner>>` 引用，实现算子重载
/// - Clone 语义（非 Copy），但开销极低（Rc clone）
/// - 节点的身份即`NodeId`，优化器等以此为键关联各自的状态
///
/// # 使用示例
/// ```ignore
/// let graph = Graph::new();
/// let x = graph.input(2, "X");
/// let w = graph.parameter(ParamValue::Initialized(w0), "W");
/// let y = x.matmul(&w)?.tanh()?;
/// let z = &y * 2.0 + &b;
/// ```
#[derive(Clone)]
pub struct Var {
    id: NodeId,
    graph: Rc<RefCell<GraphInner>>,
}

impl std::fmt::Debug for Var {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Var").field("id", &self.id).finish()
    }
}

impl PartialEq for Var {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.same_graph(other)
    }
}

impl Var {
    pub(crate) const fn new(id: NodeId, graph: Rc<RefCell<GraphInner>>) -> Self {
        Self { id, graph }
    }

    pub const fn node_id(&self) -> NodeId {
        self.id
    }

    pub(crate) const fn graph(&self) -> &Rc<RefCell<GraphInner>> {
        &self.graph
    }

    pub fn same_graph(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.graph, &other.graph)
    }

    /// 获取 Var 所属的 Graph handle
    pub fn get_graph(&self) -> Graph {
        Graph::from_rc(Rc::clone(&self.graph))
    }

    pub fn name(&self) -> String {
        self.graph
            .borrow()
            .get_node_name(self.id)
            .map(str::to_string)
            .unwrap_or_default()
    }

    /// 节点值的阶数（建图时即已确定）
    pub fn ndim(&self) -> usize {
        self.graph.borrow().get_node_ndim(self.id).unwrap_or(0)
    }

    pub fn is_parameter(&self) -> bool {
        self.graph.borrow().is_parameter(self.id).unwrap_or(false)
    }

    pub(crate) fn check_same_graph(&self, other: &Self, what: &str) -> Result<(), GraphError> {
        if !self.same_graph(other) {
            return Err(GraphError::InvalidOperation(format!(
                "不能对来自不同 Graph 的 Var 进行{}",
                what
            )));
        }
        Ok(())
    }

    /// 以`parents`为父节点创建一个算子节点（内部使用）
    pub(crate) fn op<T: Into<NodeType>>(&self, op: T, parents: &[&Self]) -> Result<Self, GraphError> {
        for parent in parents {
            self.check_same_graph(parent, "运算")?;
        }
        let ids = parents.iter().map(|p| p.id).collect::<Vec<_>>();
        let id = self.graph.borrow_mut().new_op_node(op, &ids, None)?;
        Ok(Self::new(id, Rc::clone(&self.graph)))
    }

    /// 同图中的一个常量节点
    pub fn constant(&self, value: Tensor) -> Self {
        let id = self.graph.borrow_mut().new_constant_node(value, None);
        Self::new(id, Rc::clone(&self.graph))
    }

    // ==================== 参数值 ====================

    /// 参数节点的当前取值（两态）
    pub fn param_value(&self) -> Result<ParamValue, GraphError> {
        Ok(self.graph.borrow().get_param_value(self.id)?.clone())
    }

    /// 参数节点已初始化的值；未初始化或非参数节点则返回错误
    pub fn value(&self) -> Result<Tensor, GraphError> {
        match self.param_value()? {
            ParamValue::Initialized(value) => Ok(value),
            ParamValue::Uninitialized { .. } => Err(GraphError::UninitializedValue { name: self.name() }),
        }
    }

    /// 设置参数节点的值
    pub fn set_value(&self, value: &Tensor) -> Result<(), GraphError> {
        self.graph.borrow_mut().set_param_value(self.id, value.clone())
    }

    /// 在给定输入下对本节点单独求值（不应用任何更新）
    pub fn eval(&self, inputs: &[(&Self, &Tensor)]) -> Result<Tensor, GraphError> {
        let mut values = self.get_graph().evaluate(&[self.clone()], inputs)?;
        values
            .pop()
            .ok_or_else(|| GraphError::ComputationError("求值结果为空".to_string()))
    }

    // ==================== 安全版本（返回 Result）====================

    pub fn try_add(&self, other: &Self) -> Result<Self, GraphError> {
        self.op(Add, &[self, other])
    }

    pub fn try_sub(&self, other: &Self) -> Result<Self, GraphError> {
        self.op(Subtract, &[self, other])
    }

    /// 逐元素乘法（支持广播）
    pub fn try_mul(&self, other: &Self) -> Result<Self, GraphError> {
        self.op(Multiply, &[self, other])
    }

    pub fn try_div(&self, other: &Self) -> Result<Self, GraphError> {
        self.op(Divide, &[self, other])
    }

    pub fn maximum(&self, other: &Self) -> Result<Self, GraphError> {
        self.op(Maximum, &[self, other])
    }

    pub fn minimum(&self, other: &Self) -> Result<Self, GraphError> {
        self.op(Minimum, &[self, other])
    }

    pub fn try_neg(&self) -> Result<Self, GraphError> {
        self.op(Negate, &[self])
    }

    /// 与本节点同形状、以`p_keep`概率取1的随机掩码，每次执行重新采样
    pub fn bernoulli_mask(&self, p_keep: Float, seed: u64) -> Result<Self, GraphError> {
        self.op(DropoutMask::new(p_keep, seed), &[self])
    }
}

// ==================== 算子重载 ====================

macro_rules! impl_var_binary_op {
    ($trait:ident, $method:ident, $try_method:ident, $op:tt, $msg:literal) => {
        impl $trait<&Var> for &Var {
            type Output = Var;

            fn $method(self, other: &Var) -> Var {
                self.$try_method(other).expect($msg)
            }
        }
        impl $trait<Var> for &Var {
            type Output = Var;

            fn $method(self, other: Var) -> Var {
                self $op &other
            }
        }
        impl $trait<&Var> for Var {
            type Output = Var;

            fn $method(self, other: &Var) -> Var {
                &self $op other
            }
        }
        impl $trait<Var> for Var {
            type Output = Var;

            fn $method(self, other: Var) -> Var {
                &self $op &other
            }
        }
        // 与纯数运算时，纯数作为形状为[]的常量参与广播
        impl $trait<Float> for &Var {
            type Output = Var;

            fn $method(self, scalar: Float) -> Var {
                self $op &self.constant(Tensor::scalar(scalar))
            }
        }
        impl $trait<Float> for Var {
            type Output = Var;

            fn $method(self, scalar: Float) -> Var {
                &self $op scalar
            }
        }
        impl $trait<&Var> for Float {
            type Output = Var;

            fn $method(self, var: &Var) -> Var {
                &var.constant(Tensor::scalar(self)) $op var
            }
        }
        impl $trait<Var> for Float {
            type Output = Var;

            fn $method(self, var: Var) -> Var {
                self $op &var
            }
        }
    };
}

impl_var_binary_op!(AddOp, add, try_add, +, "Var 加法失败");
impl_var_binary_op!(SubOp, sub, try_sub, -, "Var 减法失败");
impl_var_binary_op!(MulOp, mul, try_mul, *, "Var 乘法失败");
impl_var_binary_op!(DivOp, div, try_div, /, "Var 除法失败");

impl Neg for &Var {
    type Output = Var;

    fn neg(self) -> Var {
        self.try_neg().expect("Var 取反失败")
    }
}

impl Neg for Var {
    type Output = Self;

    fn neg(self) -> Self {
        -&self
    }
}

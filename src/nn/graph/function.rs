/*
 * @Description  : 编译后的可执行函数：给定输入求出输出，并原子地应用一组参数更新。
 *                 执行分两阶段：先计算全部输出和全部更新表达式，校验无误后才统一写回，
 *                 因此任何一步出错都不会留下“更新了一半”的状态。
 */

use super::error::GraphError;
use super::handle::Graph;
use crate::nn::NodeId;
use crate::nn::var::Var;
use crate::tensor::Tensor;
use std::collections::{HashMap, HashSet};

/// 一组待应用的更新：(目标参数, 新值表达式)
pub type Updates = Vec<(Var, Var)>;

/// 函数的一个输入，可带默认值（带默认值的输入必须排在末尾）
#[derive(Debug, Clone)]
pub struct FunctionInput {
    var: Var,
    default: Option<Tensor>,
}

impl FunctionInput {
    pub fn new(var: &Var) -> Self {
        Self {
            var: var.clone(),
            default: None,
        }
    }

    pub fn with_default(var: &Var, default: Tensor) -> Self {
        Self {
            var: var.clone(),
            default: Some(default),
        }
    }
}

impl From<&Var> for FunctionInput {
    fn from(var: &Var) -> Self {
        Self::new(var)
    }
}

#[derive(Debug)]
struct InputSlot {
    id: NodeId,
    name: String,
    ndim: usize,
    default: Option<Tensor>,
}

#[derive(Debug)]
pub struct Function {
    name: String,
    graph: Graph,
    inputs: Vec<InputSlot>,
    outputs: Vec<NodeId>,
    updates: Vec<(NodeId, NodeId)>,
}

impl Graph {
    /// 编译一个函数。校验：
    /// 1. 输入须为互不相同的输入节点，带默认值的输入须排在末尾；
    /// 2. 更新目标须为互不相同的参数节点；
    /// 3. 输出及更新表达式所依赖的输入节点都须在`inputs`中。
    pub fn function(
        &self,
        name: &str,
        inputs: Vec<FunctionInput>,
        outputs: &[Var],
        updates: &[(Var, Var)],
    ) -> Result<Function, GraphError> {
        let g = self.inner();
        let foreign = |var: &Var| -> Result<(), GraphError> {
            if self.same_graph(var) {
                Ok(())
            } else {
                Err(GraphError::InvalidOperation(format!(
                    "函数`{}`中的{:?}不属于本图",
                    name, var
                )))
            }
        };

        // 1. 输入
        let mut slots = Vec::with_capacity(inputs.len());
        let mut seen = HashSet::new();
        let mut defaults_started = false;
        for input in inputs {
            foreign(&input.var)?;
            let id = input.var.node_id();
            let node = g.get_node(id)?;
            if !node.is_input() {
                return Err(GraphError::InvalidOperation(format!(
                    "函数`{}`的输入{}不是输入节点",
                    name, node
                )));
            }
            if !seen.insert(id) {
                return Err(GraphError::InvalidOperation(format!(
                    "函数`{}`的输入{}重复出现",
                    name, node
                )));
            }
            match &input.default {
                Some(default) => {
                    if default.dimension() != node.ndim() {
                        return Err(GraphError::DimensionMismatch {
                            expected: node.ndim(),
                            got: default.dimension(),
                            message: format!("输入`{}`的默认值阶数不符", node.name()),
                        });
                    }
                    defaults_started = true;
                }
                None if defaults_started => {
                    return Err(GraphError::InvalidOperation(format!(
                        "函数`{}`中无默认值的输入{}不能排在带默认值的输入之后",
                        name, node
                    )));
                }
                None => {}
            }
            slots.push(InputSlot {
                id,
                name: node.name().to_string(),
                ndim: node.ndim(),
                default: input.default,
            });
        }

        // 2. 更新
        let mut targets = HashSet::new();
        let mut update_ids = Vec::with_capacity(updates.len());
        for (target, expr) in updates {
            foreign(target)?;
            foreign(expr)?;
            let node = g.get_node(target.node_id())?;
            if !node.is_parameter() {
                return Err(GraphError::InvalidOperation(format!(
                    "函数`{}`的更新目标{}不是参数节点",
                    name, node
                )));
            }
            if !targets.insert(target.node_id()) {
                return Err(GraphError::InvalidOperation(format!(
                    "函数`{}`中参数{}被重复更新",
                    name, node
                )));
            }
            let expr_ndim = g.get_node_ndim(expr.node_id())?;
            if expr_ndim != node.ndim() {
                return Err(GraphError::DimensionMismatch {
                    expected: node.ndim(),
                    got: expr_ndim,
                    message: format!("参数`{}`的更新表达式阶数不符", node.name()),
                });
            }
            update_ids.push((target.node_id(), expr.node_id()));
        }

        // 3. 依赖的输入
        let output_ids = outputs
            .iter()
            .map(|v| foreign(v).map(|_| v.node_id()))
            .collect::<Result<Vec<_>, _>>()?;
        let roots = output_ids
            .iter()
            .copied()
            .chain(update_ids.iter().map(|&(_, expr)| expr))
            .collect::<Vec<_>>();
        for id in g.ancestors(&roots)? {
            let node = g.get_node(id)?;
            if node.is_input() && !seen.contains(&id) {
                return Err(GraphError::MissingInput {
                    name: node.name().to_string(),
                });
            }
        }
        drop(g);

        Ok(Function {
            name: name.to_string(),
            graph: self.clone(),
            inputs: slots,
            outputs: output_ids,
            updates: update_ids,
        })
    }
}

impl Function {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn outputs_count(&self) -> usize {
        self.outputs.len()
    }

    /// 执行一次：按位置给出输入（末尾带默认值的可省略），返回全部输出
    pub fn call(&self, args: &[Tensor]) -> Result<Vec<Tensor>, GraphError> {
        let required = self.inputs.iter().filter(|s| s.default.is_none()).count();
        if args.len() < required || args.len() > self.inputs.len() {
            return Err(GraphError::InvalidOperation(format!(
                "函数`{}`需要{}~{}个参数，实际给出{}个",
                self.name,
                required,
                self.inputs.len(),
                args.len()
            )));
        }
        let mut values = HashMap::with_capacity(self.inputs.len());
        for (index, slot) in self.inputs.iter().enumerate() {
            let value = args
                .get(index)
                .or(slot.default.as_ref())
                .ok_or_else(|| GraphError::MissingInput {
                    name: slot.name.clone(),
                })?;
            if value.dimension() != slot.ndim {
                return Err(GraphError::DimensionMismatch {
                    expected: slot.ndim,
                    got: value.dimension(),
                    message: format!("函数`{}`的输入`{}`阶数不符", self.name, slot.name),
                });
            }
            values.insert(slot.id, value.clone());
        }

        // 1. 先求出所有输出与更新值
        let roots = self
            .outputs
            .iter()
            .copied()
            .chain(self.updates.iter().map(|&(_, expr)| expr))
            .collect::<Vec<_>>();
        let mut results = self.graph.inner().evaluate(&roots, &values)?;
        let new_values = results.split_off(self.outputs.len());
        {
            let g = self.graph.inner();
            for (&(target, _), value) in self.updates.iter().zip(&new_values) {
                let declared = g.get_param_value(target)?.shape();
                if declared != value.shape() {
                    return Err(GraphError::ShapeMismatch {
                        expected: declared.to_vec(),
                        got: value.shape().to_vec(),
                        message: format!(
                            "函数`{}`对参数`{}`的更新值形状不符",
                            self.name,
                            g.get_node_name(target)?
                        ),
                    });
                }
            }
        }

        // 2. 再统一写回
        let mut g = self.graph.inner_rc().borrow_mut();
        for (&(target, _), value) in self.updates.iter().zip(new_values) {
            g.set_param_value(target, value)?;
        }
        Ok(results)
    }
}

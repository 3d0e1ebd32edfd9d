/*
 * @Description  : 参数登记表：记录层创建的每个参数及其绑定的初始化器与扇入扇出。
 *                 `reinit`是唯一写入真实初始值的途径。
 */

use crate::nn::init::{Fans, Initializer};
use crate::nn::{Graph, NnError, ParamValue, Var};
use crate::tensor::{Float, Tensor};
use crate::utils::{RngSource, check_random_state};
use std::cell::RefCell;

/// 参数初始内容的来源
#[derive(Debug, Clone)]
pub enum ParamSource {
    /// 暂不绑定初始化器，待后续`set_initializer`或容器绑定
    Default,
    /// 以给定数组为初值；`reinit`会将其恢复
    Array(Tensor),
    /// 以常数填满
    Scalar(f64),
    /// 直接采用一个已有的参数节点（与其它层共享），不登记、不重新初始化
    External(Var),
    /// 显式绑定的初始化器
    With(Initializer),
}

impl From<Tensor> for ParamSource {
    fn from(array: Tensor) -> Self {
        Self::Array(array)
    }
}

impl From<f64> for ParamSource {
    fn from(value: f64) -> Self {
        Self::Scalar(value)
    }
}

impl From<Initializer> for ParamSource {
    fn from(init: Initializer) -> Self {
        Self::With(init)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Weight,
    Bias,
    /// 既非权重也非偏置（如批归一化的gamma/beta）
    Other,
}

#[derive(Debug)]
struct ParamEntry {
    var: Var,
    kind: ParamKind,
    initializer: Option<Initializer>,
    fans: Option<Fans>,
}

#[derive(Debug)]
pub struct ParamRegistry {
    graph: Graph,
    entries: RefCell<Vec<ParamEntry>>,
    weights: Vec<Var>,
    biases: Vec<Var>,
    params: Vec<Var>,
}

impl ParamRegistry {
    pub fn new(graph: &Graph) -> Self {
        Self {
            graph: graph.clone(),
            entries: RefCell::new(Vec::new()),
            weights: Vec::new(),
            biases: Vec::new(),
            params: Vec::new(),
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn new_weight(
        &mut self,
        name: &str,
        shape: &[usize],
        source: ParamSource,
        fans: Option<Fans>,
    ) -> Result<Var, NnError> {
        self.new_param_of(ParamKind::Weight, name, shape, source, fans)
    }

    pub fn new_bias(
        &mut self,
        name: &str,
        shape: &[usize],
        source: ParamSource,
    ) -> Result<Var, NnError> {
        self.new_param_of(ParamKind::Bias, name, shape, source, None)
    }

    pub fn new_param(
        &mut self,
        name: &str,
        shape: &[usize],
        source: ParamSource,
    ) -> Result<Var, NnError> {
        self.new_param_of(ParamKind::Other, name, shape, source, None)
    }

    fn new_param_of(
        &mut self,
        kind: ParamKind,
        name: &str,
        shape: &[usize],
        source: ParamSource,
        fans: Option<Fans>,
    ) -> Result<Var, NnError> {
        let full_name = format!(
            "{}{}",
            name,
            shape.iter().map(ToString::to_string).collect::<Vec<_>>().join("x")
        );
        let (initializer, value) = match source {
            ParamSource::Array(array) => {
                if array.shape() != shape {
                    return Err(NnError::Configuration(format!(
                        "参数`{}`的初值形状{:?}与声明的形状{:?}不一致",
                        full_name,
                        array.shape(),
                        shape
                    )));
                }
                (
                    Some(Initializer::Array(array.clone())),
                    ParamValue::Initialized(array),
                )
            }
            ParamSource::Scalar(value) => {
                if !value.is_finite() {
                    return Err(NnError::Configuration(format!(
                        "参数`{}`的初值{}不是有限实数",
                        full_name, value
                    )));
                }
                (
                    Some(Initializer::Constant(value)),
                    ParamValue::Initialized(Tensor::full(shape, value as Float)),
                )
            }
            ParamSource::External(var) => {
                if !self.graph.same_graph(&var) || !var.is_parameter() {
                    return Err(NnError::Configuration(format!(
                        "无法采用{:?}作为参数`{}`：它不是本图中的参数节点",
                        var, full_name
                    )));
                }
                // 不进入登记表与`params`，由其原本的所有者负责初始化与训练
                match kind {
                    ParamKind::Weight => self.weights.push(var.clone()),
                    ParamKind::Bias => self.biases.push(var.clone()),
                    ParamKind::Other => {}
                }
                return Ok(var);
            }
            ParamSource::Default => (
                None,
                ParamValue::Uninitialized {
                    shape: shape.to_vec(),
                },
            ),
            ParamSource::With(init) => (
                Some(init),
                ParamValue::Uninitialized {
                    shape: shape.to_vec(),
                },
            ),
        };

        let var = self.graph.parameter(value, &full_name);
        match kind {
            ParamKind::Weight => self.weights.push(var.clone()),
            ParamKind::Bias => self.biases.push(var.clone()),
            ParamKind::Other => {}
        }
        self.params.push(var.clone());
        self.entries.borrow_mut().push(ParamEntry {
            var: var.clone(),
            kind,
            initializer,
            fans,
        });
        Ok(var)
    }

    /// 为`var`绑定（或替换）初始化器；`var`必须是本登记表中的参数
    pub fn set_initializer(&self, var: &Var, initializer: Initializer) -> Result<(), NnError> {
        let mut entries = self.entries.borrow_mut();
        let entry = entries
            .iter_mut()
            .find(|e| e.var == *var)
            .ok_or_else(|| {
                NnError::Configuration(format!("参数`{}`不属于本层的登记表", var.name()))
            })?;
        entry.initializer = Some(initializer);
        Ok(())
    }

    /// 为尚未绑定初始化器的权重与偏置分别绑定`weight`与`bias`
    pub fn bind_pending(&self, weight: Option<&Initializer>, bias: Option<&Initializer>) {
        for entry in self.entries.borrow_mut().iter_mut() {
            if entry.initializer.is_some() {
                continue;
            }
            entry.initializer = match entry.kind {
                ParamKind::Weight => weight.cloned(),
                ParamKind::Bias => bias.cloned(),
                ParamKind::Other => None,
            };
        }
    }

    /// 是否仍有参数没有绑定初始化器
    pub fn has_pending(&self) -> bool {
        self.entries.borrow().iter().any(|e| e.initializer.is_none())
    }

    pub fn initializer_of(&self, var: &Var) -> Option<Initializer> {
        self.entries
            .borrow()
            .iter()
            .find(|e| e.var == *var)
            .and_then(|e| e.initializer.clone())
    }

    pub fn params(&self) -> &[Var] {
        &self.params
    }

    pub fn weights(&self) -> &[Var] {
        &self.weights
    }

    pub fn biases(&self) -> &[Var] {
        &self.biases
    }

    /// 依次调用每个已登记参数的初始化器并写回
    ///
    /// 先算出全部新值再统一写入：缺少初始化器或任一初始化器出错时，不写入任何值
    pub fn reinit(&self, rng: RngSource<'_>) -> Result<(), NnError> {
        let entries = self.entries.borrow();
        if let Some(entry) = entries.iter().find(|e| e.initializer.is_none()) {
            return Err(NnError::UninitializedParameter {
                name: entry.var.name(),
            });
        }
        check_random_state(rng, |rng| {
            let mut fresh = Vec::with_capacity(entries.len());
            for entry in entries.iter() {
                let Some(initializer) = &entry.initializer else {
                    continue;
                };
                let shape = entry.var.param_value()?.shape().to_vec();
                let values = initializer.init(&shape, rng, entry.fans)?;
                fresh.push((&entry.var, Tensor::from_array_cast(&values)));
            }
            for (var, value) in fresh {
                var.set_value(&value)?;
            }
            Ok(())
        })
    }
}

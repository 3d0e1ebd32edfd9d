/*
 * @Description  : Sequential 容器：按顺序串联子层
 */

use super::{Aggregator, Hook, Layer, TrainContext};
use crate::nn::init::Initializer;
use crate::nn::{Graph, NnError, Var};
use crate::utils::{RngSource, check_random_state};

/// 按顺序串联的子层，本身也是一个层
///
/// 构造时，每个带参数的子层中尚未绑定初始化器的权重/偏置，
/// 会采用其后最近一个给出初始化策略的子层（通常是激活层）的策略。
///
/// # 使用示例
/// ```ignore
/// let model = Sequential::new(vec![
///     Box::new(FullyConnected::new(&graph, 4, 8, true)?),
///     Box::new(Tanh::default()),
///     Box::new(FullyConnected::new(&graph, 8, 3, true)?),
///     Box::new(Softmax::new()),
/// ]);
/// model.reinit(RngSource::Seed(42))?;
/// ```
pub struct Sequential {
    children: Vec<Box<dyn Layer>>,
}

impl Sequential {
    pub fn new(children: Vec<Box<dyn Layer>>) -> Self {
        for (i, child) in children.iter().enumerate() {
            let Some(registry) = child.registry() else {
                continue;
            };
            let follower = children[i + 1..]
                .iter()
                .find(|next| next.weight_initializer().is_some());
            if let Some(next) = follower {
                registry.bind_pending(
                    next.weight_initializer().as_ref(),
                    next.bias_initializer().as_ref(),
                );
            }
        }
        Self { children }
    }

    pub fn children(&self) -> &[Box<dyn Layer>] {
        &self.children
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    fn last(&self) -> Result<&dyn Layer, NnError> {
        self.children
            .last()
            .map(AsRef::as_ref)
            .ok_or_else(|| NnError::Configuration("Sequential 中没有任何子层".to_string()))
    }
}

impl Layer for Sequential {
    fn layer_name(&self) -> &str {
        "Sequential"
    }

    fn make_inputs(&self, graph: &Graph, name: &str) -> Var {
        match self.children.first() {
            Some(first) => first.make_inputs(graph, name),
            None => graph.input(2, name),
        }
    }

    fn train_expr(&self, x: &Var, ctx: &mut TrainContext) -> Result<Var, NnError> {
        self.children
            .iter()
            .try_fold(x.clone(), |out, child| child.train_expr(&out, ctx))
    }

    fn pred_expr(&self, x: &Var) -> Result<Var, NnError> {
        self.children
            .iter()
            .try_fold(x.clone(), |out, child| child.pred_expr(&out))
    }

    /// 由最后一个子层决定
    fn batch_agg(&self) -> Aggregator {
        match self.last() {
            Ok(last) => last.batch_agg(),
            Err(_) => super::concat_outputs,
        }
    }

    fn ensembler(&self) -> Aggregator {
        match self.last() {
            Ok(last) => last.ensembler(),
            Err(_) => super::mean_outputs,
        }
    }

    fn params(&self) -> Vec<Var> {
        self.children.iter().flat_map(|c| c.params()).collect()
    }

    fn weights(&self) -> Vec<Var> {
        self.children.iter().flat_map(|c| c.weights()).collect()
    }

    fn biases(&self) -> Vec<Var> {
        self.children.iter().flat_map(|c| c.biases()).collect()
    }

    /// 解析出一个生成器后依次交给各子层，保证整体可由单个种子复现
    fn reinit(&self, rng: RngSource<'_>) -> Result<(), NnError> {
        check_random_state(rng, |rng| {
            for child in &self.children {
                child.reinit(RngSource::Generator(&mut *rng))?;
            }
            Ok(())
        })
    }

    fn weight_initializer(&self) -> Option<Initializer> {
        self.children.first().and_then(|c| c.weight_initializer())
    }

    fn bias_initializer(&self) -> Option<Initializer> {
        self.children.first().and_then(|c| c.bias_initializer())
    }

    fn on_hook(&self, hook: Hook) -> Result<(), NnError> {
        self.children.iter().try_for_each(|c| hook.fire(c.as_ref()))
    }
}

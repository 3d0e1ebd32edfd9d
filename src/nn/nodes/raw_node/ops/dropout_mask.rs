use crate::nn::GraphError;
use crate::nn::nodes::raw_node::{TraitNode, check_parents_count};
use crate::tensor::{Float, Tensor};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::RefCell;

/// 与父节点同形状的伯努利掩码：每个元素以`p_keep`的概率为1，否则为0。
/// 节点持有自己的随机数生成器，每次执行都会生成新的掩码。掩码本身不可导。
pub(crate) struct DropoutMask {
    p_keep: Float,
    rng: RefCell<StdRng>,
}

impl DropoutMask {
    pub(crate) fn new(p_keep: Float, seed: u64) -> Self {
        Self {
            p_keep,
            rng: RefCell::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl TraitNode for DropoutMask {
    fn type_name(&self) -> &'static str {
        "DropoutMask"
    }

    fn infer_ndim(&self, parent_ndims: &[usize]) -> Result<usize, GraphError> {
        check_parents_count(self.type_name(), parent_ndims, 1)?;
        Ok(parent_ndims[0])
    }

    fn calc_value_by_parents(&self, parents: &[&Tensor]) -> Result<Tensor, GraphError> {
        let mut rng = self.rng.borrow_mut();
        let p_keep = f64::from(self.p_keep).clamp(0., 1.);
        let mask = (0..parents[0].size())
            .map(|_| if rng.gen_bool(p_keep) { 1. } else { 0. })
            .collect::<Vec<Float>>();
        Ok(Tensor::new(&mask, parents[0].shape()))
    }

    fn calc_grad_to_parent(
        &self,
        _index: usize,
        _parents: &[&Tensor],
        _value: &Tensor,
        _upstream: &Tensor,
    ) -> Result<Option<Tensor>, GraphError> {
        Ok(None)
    }
}

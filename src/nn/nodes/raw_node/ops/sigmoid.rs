/*
 * @Description  : Sigmoid激活函数节点，支持三种形式：
 *                 1. Exact：1/(1+e^(-x))；
 *                 2. UltraFast：分段有理函数近似，速度更快；
 *                 3. Hard：clip(0.2x+0.5, 0, 1)的分段线性近似。
 */

use crate::nn::GraphError;
use crate::nn::nodes::raw_node::{TraitNode, check_parents_count};
use crate::tensor::{Float, Tensor};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SigmoidKind {
    #[default]
    Exact,
    UltraFast,
    Hard,
}

/// 近似式中`u = x/2`对应的`z(u) ∈ (-1, 1)`，sigmoid ≈ (z+1)/2
fn ultra_fast_z(u: Float) -> Float {
    let a = u.abs();
    let z = if a < 1.7 {
        1.5 * a / (1. + a)
    } else if a < 3. {
        0.935_409_07 + 0.045_881_295 * (a - 1.7)
    } else {
        0.995_054_75
    };
    z.copysign(u)
}

fn ultra_fast_dz(u: Float) -> Float {
    let a = u.abs();
    if a < 1.7 {
        1.5 / ((1. + a) * (1. + a))
    } else if a < 3. {
        0.045_881_295
    } else {
        0.
    }
}

#[derive(Default)]
pub(crate) struct Sigmoid {
    kind: SigmoidKind,
}

impl Sigmoid {
    pub(crate) fn new(kind: SigmoidKind) -> Self {
        Self { kind }
    }
}

impl TraitNode for Sigmoid {
    fn type_name(&self) -> &'static str {
        "Sigmoid"
    }

    fn infer_ndim(&self, parent_ndims: &[usize]) -> Result<usize, GraphError> {
        check_parents_count(self.type_name(), parent_ndims, 1)?;
        Ok(parent_ndims[0])
    }

    fn calc_value_by_parents(&self, parents: &[&Tensor]) -> Result<Tensor, GraphError> {
        let x = parents[0];
        Ok(match self.kind {
            SigmoidKind::Exact => x.map(|v| 1. / (1. + (-v).exp())),
            SigmoidKind::UltraFast => x.map(|v| 0.5 * ultra_fast_z(0.5 * v) + 0.5),
            SigmoidKind::Hard => x.map(|v| (0.2 * v + 0.5).clamp(0., 1.)),
        })
    }

    fn calc_grad_to_parent(
        &self,
        _index: usize,
        parents: &[&Tensor],
        value: &Tensor,
        upstream: &Tensor,
    ) -> Result<Option<Tensor>, GraphError> {
        let local_grad = match self.kind {
            // σ'(x) = σ(x)(1-σ(x))
            SigmoidKind::Exact => value.map(|s| s * (1. - s)),
            SigmoidKind::UltraFast => parents[0].map(|v| 0.25 * ultra_fast_dz(0.5 * v)),
            SigmoidKind::Hard => parents[0].map(|v| {
                let y = 0.2 * v + 0.5;
                if y > 0. && y < 1. { 0.2 } else { 0. }
            }),
        };
        Ok(Some(upstream.try_mul(&local_grad)?))
    }
}

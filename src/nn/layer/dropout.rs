/*
 * @Description  : Dropout 层：训练时以概率 p 将元素置零，推理时按保留概率缩放
 */

use super::{Layer, TrainContext};
use crate::nn::{NnError, Var};
use crate::tensor::Float;
use crate::utils::{RngSource, check_random_state};
use rand::Rng;
use std::cell::Cell;

#[derive(Debug)]
pub struct Dropout {
    p_keep: Float,
    /// 随机源的种子，在`reinit`中抽取
    seed: Cell<Option<u64>>,
    /// 每个训练表达式各自的掩码种子偏移，保证同一层的多个掩码互不相同
    masks: Cell<u64>,
}

impl Dropout {
    /// `p`为丢弃概率，须在[0, 1)内
    pub fn new(p: Float) -> Result<Self, NnError> {
        if !(0.0..1.0).contains(&p) {
            return Err(NnError::Configuration(format!(
                "Dropout 的丢弃概率须在[0, 1)内，实际为{}",
                p
            )));
        }
        Ok(Self {
            p_keep: 1.0 - p,
            seed: Cell::new(None),
            masks: Cell::new(0),
        })
    }

    pub const fn p_keep(&self) -> Float {
        self.p_keep
    }
}

impl Layer for Dropout {
    fn layer_name(&self) -> &str {
        "Dropout"
    }

    fn train_expr(&self, x: &Var, _ctx: &mut TrainContext) -> Result<Var, NnError> {
        let seed = self.seed.get().ok_or_else(|| NnError::UninitializedLayer {
            layer: self.layer_name().to_string(),
        })?;
        let index = self.masks.get();
        self.masks.set(index + 1);
        let mask = x.bernoulli_mask(self.p_keep, seed.wrapping_add(index))?;
        Ok(x.try_mul(&mask)?)
    }

    fn pred_expr(&self, x: &Var) -> Result<Var, NnError> {
        Ok(x * self.p_keep)
    }

    fn reinit(&self, rng: RngSource<'_>) -> Result<(), NnError> {
        let seed = check_random_state(rng, |rng| Ok(rng.gen_range(0..1u64 << 31)))?;
        self.seed.set(Some(seed));
        self.masks.set(0);
        Ok(())
    }
}

/*
 * @Description  : 参数初始化策略：给定形状、随机数生成器与扇入扇出，生成初始值（f64，写入时再转为 Float）
 */

use super::NnError;
use crate::errors::TensorError;
use crate::tensor::Tensor;
use ndarray::{ArrayD, IxDyn};
use rand::distributions::Standard;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// 权重的扇入/扇出
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fans {
    pub fan_in: usize,
    pub fan_out: usize,
}

impl Fans {
    pub const fn new(fan_in: usize, fan_out: usize) -> Self {
        Self { fan_in, fan_out }
    }

    pub fn mean(&self) -> f64 {
        (self.fan_in + self.fan_out) as f64 / 2.0
    }
}

/// 初始化策略
#[derive(Debug, Clone, PartialEq)]
pub enum Initializer {
    /// 全零
    Zeros,
    /// 以常数填满
    Constant(f64),
    /// 原样返回给定的数组（形状须与参数一致）
    Array(Tensor),
    /// Xavier 均匀分布，界为 sqrt(6 / mean_fan)
    XavierUniform,
    /// Xavier 正态分布，标准差为 sqrt(1 / mean_fan)
    XavierNormal,
    /// 适用于整流单元的正态分布，标准差为 sqrt(2 / mean_fan)
    PReluNormal,
    /// 固定标准差的零均值正态分布
    Normal { sigma: f64 },
    /// sigmoid 用的 Xavier 均匀分布，界为标准 Xavier 的4倍
    SigmoidXavierUniform,
}

impl Initializer {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Zeros => "zeros",
            Self::Constant(_) => "constant",
            Self::Array(_) => "array",
            Self::XavierUniform => "xavier",
            Self::XavierNormal => "xavier_normal",
            Self::PReluNormal => "prelu",
            Self::Normal { .. } => "normal",
            Self::SigmoidXavierUniform => "xavier_sigmoid",
        }
    }

    /// 是否依赖扇入扇出
    pub fn needs_fans(&self) -> bool {
        matches!(
            self,
            Self::XavierUniform | Self::XavierNormal | Self::PReluNormal | Self::SigmoidXavierUniform
        )
    }

    /// 生成形状为`shape`的初始值
    pub fn init(
        &self,
        shape: &[usize],
        rng: &mut StdRng,
        fans: Option<Fans>,
    ) -> Result<ArrayD<f64>, NnError> {
        log::info!("以`{}`策略初始化形状为{:?}的参数", self.name(), shape);
        let mean_fan = || -> Result<f64, NnError> {
            let fans = fans.ok_or_else(|| {
                NnError::Configuration(format!("`{}`初始化需要扇入扇出信息", self.name()))
            })?;
            if fans.mean() <= 0.0 {
                return Err(NnError::Configuration(format!(
                    "`{}`初始化的扇入扇出不能都为0",
                    self.name()
                )));
            }
            Ok(fans.mean())
        };
        let values = match self {
            Self::Zeros => ArrayD::zeros(IxDyn(shape)),
            Self::Constant(value) => ArrayD::from_elem(IxDyn(shape), *value),
            Self::Array(array) => {
                if array.shape() != shape {
                    return Err(NnError::Configuration(format!(
                        "给定数组的形状{:?}与参数形状{:?}不一致",
                        array.shape(),
                        shape
                    )));
                }
                array.view().mapv(f64::from)
            }
            Self::XavierUniform => uniform(shape, (6.0 / mean_fan()?).sqrt(), rng),
            Self::XavierNormal => normal(shape, (1.0 / mean_fan()?).sqrt(), rng)?,
            Self::PReluNormal => normal(shape, (2.0 / mean_fan()?).sqrt(), rng)?,
            Self::Normal { sigma } => normal(shape, *sigma, rng)?,
            Self::SigmoidXavierUniform => uniform(shape, 4.0 * (6.0 / mean_fan()?).sqrt(), rng),
        };
        Ok(values)
    }
}

fn uniform(shape: &[usize], bound: f64, rng: &mut StdRng) -> ArrayD<f64> {
    ArrayD::from_shape_simple_fn(IxDyn(shape), || rng.gen_range(-bound..=bound))
}

/// Box-Muller 变换生成零均值正态样本
fn normal(shape: &[usize], std_dev: f64, rng: &mut StdRng) -> Result<ArrayD<f64>, NnError> {
    let len = shape.iter().product::<usize>();
    let mut data = Vec::with_capacity(len);
    while data.len() < len {
        let u1: f64 = rng.sample(Standard);
        let u2: f64 = rng.sample(Standard);
        let r = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * std::f64::consts::PI * u2;
        let z0 = std_dev * r * theta.cos();
        let z1 = std_dev * r * theta.sin();
        if z0.is_finite() {
            data.push(z0);
        }
        if data.len() < len && z1.is_finite() {
            data.push(z1);
        }
    }
    ArrayD::from_shape_vec(IxDyn(shape), data).map_err(|_| {
        NnError::Tensor(TensorError::IncompatibleShape {
            from: vec![len],
            to: shape.to_vec(),
        })
    })
}

/// 激活层告知前一层权重应采用的初始化方式
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum InitPolicy {
    /// 均匀分布的 Xavier 初始化
    #[default]
    Xavier,
    /// 正态分布的 Xavier 初始化
    XavierN,
    /// 适用于（带泄漏的）整流单元的正态分布
    PReLU,
    /// 以该值为标准差的正态分布
    Sigma(f64),
}

impl std::str::FromStr for InitPolicy {
    type Err = NnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Xavier" => Ok(Self::Xavier),
            "XavierN" => Ok(Self::XavierN),
            "PReLU" => Ok(Self::PReLU),
            other => other
                .parse::<f64>()
                .map(Self::Sigma)
                .map_err(|_| NnError::Configuration(format!("未知的初始化方式`{}`", other))),
        }
    }
}

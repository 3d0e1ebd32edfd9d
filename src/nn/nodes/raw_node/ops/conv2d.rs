/*
 * @Description  : 二维卷积节点（真正的卷积，即卷积核会被翻转），输入为(N, C, H, W)，
 *                 卷积核为(K, C, kh, kw)，输出为(N, K, H', W')。
 *                 边界模式：
 *                 1. valid：只在完整覆盖的区域上计算，H' = H - kh + 1；
 *                 2. full：四周补零，H' = H + kh - 1。
 *                 步长（stride）表示对完整卷积结果的下采样。
 */

use crate::nn::GraphError;
use crate::nn::nodes::raw_node::{TraitNode, check_parents_count};
use crate::tensor::{Float, Tensor};
use ndarray::{Array4, ArrayView4, Ix4};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BorderMode {
    #[default]
    Valid,
    Full,
}

impl FromStr for BorderMode {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "valid" => Ok(Self::Valid),
            "full" => Ok(Self::Full),
            _ => Err(GraphError::InvalidOperation(format!(
                "未知的卷积边界模式：{:?}",
                s
            ))),
        }
    }
}

/// 卷积的几何信息：补零量以及下采样后的输出尺寸
struct Geometry {
    pad: (usize, usize),
    out: (usize, usize),
}

pub(crate) struct Conv2d {
    border_mode: BorderMode,
    stride: (usize, usize),
}

impl Conv2d {
    pub(crate) fn new(border_mode: BorderMode, stride: (usize, usize)) -> Result<Self, GraphError> {
        if stride.0 == 0 || stride.1 == 0 {
            return Err(GraphError::InvalidOperation(
                "Conv2d的步长必须大于0".to_string(),
            ));
        }
        Ok(Self {
            border_mode,
            stride,
        })
    }

    fn views<'a>(
        &self,
        parents: &[&'a Tensor],
    ) -> Result<(ArrayView4<'a, Float>, ArrayView4<'a, Float>, Geometry), GraphError> {
        let to_4d = |t: &'a Tensor| {
            t.view()
                .into_dimensionality::<Ix4>()
                .map_err(|_| GraphError::DimensionMismatch {
                    expected: 4,
                    got: t.dimension(),
                    message: "Conv2d的输入和卷积核都必须是4阶张量".to_string(),
                })
        };
        let x = to_4d(parents[0])?;
        let w = to_4d(parents[1])?;
        let (_, c, h, wd) = x.dim();
        let (_, wc, kh, kw) = w.dim();
        if c != wc {
            return Err(GraphError::ShapeMismatch {
                expected: vec![wc],
                got: vec![c],
                message: "输入的通道数与卷积核的通道数不一致".to_string(),
            });
        }
        let pad = match self.border_mode {
            BorderMode::Valid => (0, 0),
            BorderMode::Full => (kh - 1, kw - 1),
        };
        if h + 2 * pad.0 < kh || wd + 2 * pad.1 < kw {
            return Err(GraphError::ShapeMismatch {
                expected: vec![kh, kw],
                got: vec![h, wd],
                message: "valid模式下输入图像不能小于卷积核".to_string(),
            });
        }
        let full = (h + 2 * pad.0 - kh + 1, wd + 2 * pad.1 - kw + 1);
        let out = (
            (full.0 - 1) / self.stride.0 + 1,
            (full.1 - 1) / self.stride.1 + 1,
        );
        Ok((x, w, Geometry { pad, out }))
    }

    /// 遍历输出位置与卷积核的每一组对应关系：
    /// `visit((n, k, i, j), (n, c, r, s), (k, c, p', q'))`，
    /// 其中(r, s)为输入中（未补零的）坐标，(p', q')为翻转后的卷积核坐标
    fn for_each_tap<F>(&self, x: &ArrayView4<Float>, w: &ArrayView4<Float>, geo: &Geometry, mut visit: F)
    where
        F: FnMut([usize; 4], [usize; 4], [usize; 4]),
    {
        let (n_batch, n_chan, h, wd) = x.dim();
        let (n_kern, _, kh, kw) = w.dim();
        for n in 0..n_batch {
            for k in 0..n_kern {
                for i in 0..geo.out.0 {
                    for j in 0..geo.out.1 {
                        for c in 0..n_chan {
                            for p in 0..kh {
                                let r = i * self.stride.0 + p;
                                if r < geo.pad.0 || r - geo.pad.0 >= h {
                                    continue;
                                }
                                for q in 0..kw {
                                    let s = j * self.stride.1 + q;
                                    if s < geo.pad.1 || s - geo.pad.1 >= wd {
                                        continue;
                                    }
                                    visit(
                                        [n, k, i, j],
                                        [n, c, r - geo.pad.0, s - geo.pad.1],
                                        [k, c, kh - 1 - p, kw - 1 - q],
                                    );
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

impl TraitNode for Conv2d {
    fn type_name(&self) -> &'static str {
        "Conv2d"
    }

    fn infer_ndim(&self, parent_ndims: &[usize]) -> Result<usize, GraphError> {
        check_parents_count(self.type_name(), parent_ndims, 2)?;
        for &ndim in parent_ndims {
            if ndim != 4 {
                return Err(GraphError::DimensionMismatch {
                    expected: 4,
                    got: ndim,
                    message: "Conv2d的输入和卷积核都必须是4阶张量".to_string(),
                });
            }
        }
        Ok(4)
    }

    fn calc_value_by_parents(&self, parents: &[&Tensor]) -> Result<Tensor, GraphError> {
        let (x, w, geo) = self.views(parents)?;
        let mut out = Array4::<Float>::zeros((x.dim().0, w.dim().0, geo.out.0, geo.out.1));
        self.for_each_tap(&x, &w, &geo, |o, xi, wi| {
            out[o] += x[xi] * w[wi];
        });
        Ok(Tensor::from_array(out.into_dyn()))
    }

    fn calc_grad_to_parent(
        &self,
        index: usize,
        parents: &[&Tensor],
        _value: &Tensor,
        upstream: &Tensor,
    ) -> Result<Option<Tensor>, GraphError> {
        let (x, w, geo) = self.views(parents)?;
        let up = upstream
            .view()
            .into_dimensionality::<Ix4>()
            .map_err(|_| GraphError::ComputationError("Conv2d的上游梯度不是4阶张量".to_string()))?;
        let grad = if index == 0 {
            let mut dx = Array4::<Float>::zeros(x.dim());
            self.for_each_tap(&x, &w, &geo, |o, xi, wi| {
                dx[xi] += up[o] * w[wi];
            });
            dx
        } else {
            let mut dw = Array4::<Float>::zeros(w.dim());
            self.for_each_tap(&x, &w, &geo, |o, xi, wi| {
                dw[wi] += up[o] * x[xi];
            });
            dw
        };
        Ok(Some(Tensor::from_array(grad.into_dyn())))
    }
}

use crate::nn::GraphError;
use crate::nn::nodes::raw_node::{TraitNode, check_parents_count};
use crate::tensor::{Float, Tensor};
use ndarray::{Array4, ArrayView4, Ix4};

/// 二维最大池化节点：对(N, C, H, W)输入的最后两维做不重叠的池化（步长等于窗口大小）。
/// `ignore_border`为真时丢弃不足一个窗口的边缘，否则边缘单独成窗。
/// 反向传播时梯度只流向每个窗口中（首个）最大值所在的位置。
pub(crate) struct MaxPool2d {
    size: (usize, usize),
    ignore_border: bool,
}

impl MaxPool2d {
    pub(crate) fn new(size: (usize, usize), ignore_border: bool) -> Result<Self, GraphError> {
        if size.0 == 0 || size.1 == 0 {
            return Err(GraphError::InvalidOperation(
                "MaxPool2d的窗口大小必须大于0".to_string(),
            ));
        }
        Ok(Self {
            size,
            ignore_border,
        })
    }

    fn out_len(&self, len: usize, size: usize) -> usize {
        if self.ignore_border {
            len / size
        } else {
            len.div_ceil(size)
        }
    }

    /// 对每个输出位置找出其窗口内最大值在输入中的坐标
    fn argmax(&self, x: &ArrayView4<Float>) -> Array4<[usize; 4]> {
        let (n_batch, n_chan, h, w) = x.dim();
        let (oh, ow) = (self.out_len(h, self.size.0), self.out_len(w, self.size.1));
        Array4::from_shape_fn((n_batch, n_chan, oh, ow), |(n, c, i, j)| {
            let mut best = [n, c, i * self.size.0, j * self.size.1];
            for r in (i * self.size.0)..((i + 1) * self.size.0).min(h) {
                for s in (j * self.size.1)..((j + 1) * self.size.1).min(w) {
                    if x[[n, c, r, s]] > x[best] {
                        best = [n, c, r, s];
                    }
                }
            }
            best
        })
    }
}

fn view_4d(x: &Tensor) -> Result<ArrayView4<'_, Float>, GraphError> {
    x.view()
        .into_dimensionality::<Ix4>()
        .map_err(|_| GraphError::DimensionMismatch {
            expected: 4,
            got: x.dimension(),
            message: "MaxPool2d的输入必须是4阶张量".to_string(),
        })
}

impl TraitNode for MaxPool2d {
    fn type_name(&self) -> &'static str {
        "MaxPool2d"
    }

    fn infer_ndim(&self, parent_ndims: &[usize]) -> Result<usize, GraphError> {
        check_parents_count(self.type_name(), parent_ndims, 1)?;
        if parent_ndims[0] != 4 {
            return Err(GraphError::DimensionMismatch {
                expected: 4,
                got: parent_ndims[0],
                message: "MaxPool2d的输入必须是4阶张量".to_string(),
            });
        }
        Ok(4)
    }

    fn calc_value_by_parents(&self, parents: &[&Tensor]) -> Result<Tensor, GraphError> {
        let x = view_4d(parents[0])?;
        let out = self.argmax(&x).mapv(|idx| x[idx]);
        Ok(Tensor::from_array(out.into_dyn()))
    }

    fn calc_grad_to_parent(
        &self,
        _index: usize,
        parents: &[&Tensor],
        _value: &Tensor,
        upstream: &Tensor,
    ) -> Result<Option<Tensor>, GraphError> {
        let x = view_4d(parents[0])?;
        let up = view_4d(upstream)?;
        let mut dx = Array4::<Float>::zeros(x.dim());
        for (o, idx) in self.argmax(&x).indexed_iter() {
            dx[*idx] += up[[o.0, o.1, o.2, o.3]];
        }
        Ok(Some(Tensor::from_array(dx.into_dyn())))
    }
}

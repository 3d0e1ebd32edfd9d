/*
 * @Description  : 沿样本维（首维）把若干个等长的张量按顺序切成小批量
 */

use crate::tensor::Tensor;

/// 按输入顺序产生连续、互不重叠的小批量；最后一批可能不足`batchsize`
///
/// # 使用示例
/// ```ignore
/// for batch in batched(3, &[&x, &t]) {
///     let (xb, tb) = (&batch[0], &batch[1]);
/// }
/// ```
pub fn batched<'a>(batchsize: usize, arrays: &[&'a Tensor]) -> Batched<'a> {
    assert!(batchsize > 0, "批大小必须大于0");
    let len = arrays.first().map_or(0, |a| a.shape().first().copied().unwrap_or(0));
    assert!(
        arrays.iter().all(|a| a.shape().first().copied().unwrap_or(0) == len),
        "所有张量的样本数必须一致"
    );
    Batched {
        arrays: arrays.to_vec(),
        batchsize,
        len,
        start: 0,
    }
}

pub struct Batched<'a> {
    arrays: Vec<&'a Tensor>,
    batchsize: usize,
    len: usize,
    start: usize,
}

impl Iterator for Batched<'_> {
    type Item = Vec<Tensor>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.start >= self.len {
            return None;
        }
        let end = (self.start + self.batchsize).min(self.len);
        let batch = self
            .arrays
            .iter()
            .map(|a| a.slice_rows(self.start, end))
            .collect();
        self.start = end;
        Some(batch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = (self.len - self.start).div_ceil(self.batchsize);
        (n, Some(n))
    }
}

impl ExactSizeIterator for Batched<'_> {}

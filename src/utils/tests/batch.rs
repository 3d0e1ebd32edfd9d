use crate::assert_panic;
use crate::tensor::Tensor;
use crate::utils::batched;

#[test]
fn test_batched_keeps_order_and_remainder() {
    let x = Tensor::arange(&[10, 2]);
    let t = Tensor::arange(&[10]);
    let batches = batched(3, &[&x, &t]).collect::<Vec<_>>();

    let sizes = batches.iter().map(|b| b[0].shape()[0]).collect::<Vec<_>>();
    assert_eq!(sizes, vec![3, 3, 3, 1]);
    // 目标与输入一一对应，且既不遗漏也不重复
    let seen = batches.iter().flat_map(|b| b[1].to_vec()).collect::<Vec<_>>();
    assert_eq!(seen, t.to_vec());
    assert_eq!(batches[3][0], x.slice_rows(9, 10));
}

#[test]
fn test_batched_exact_size() {
    let x = Tensor::zeros(&[6, 1]);
    let it = batched(2, &[&x]);
    assert_eq!(it.len(), 3);
    assert_eq!(batched(7, &[&x]).count(), 1);
}

#[test]
fn test_batched_rejects_mismatched_lengths() {
    let x = Tensor::zeros(&[4, 1]);
    let t = Tensor::zeros(&[3]);
    assert_panic!(batched(2, &[&x, &t]));
    assert_panic!(batched(0, &[&x]));
}

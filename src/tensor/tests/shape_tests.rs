use crate::assert_panic;
use crate::errors::TensorError;
use crate::tensor::Tensor;

#[test]
fn test_new_and_properties() {
    let tensor = Tensor::new(&[1., 2., 3., 4.], &[2, 2]);
    assert_eq!(tensor.shape(), &[2, 2]);
    assert_eq!(tensor.dimension(), 2);
    assert_eq!(tensor.size(), 4);
    assert_eq!(tensor[[1, 0]], 3.);
    assert!(!tensor.is_scalar());
    assert_eq!(tensor.number(), None);
    assert_eq!(Tensor::scalar(7.).number(), Some(7.));
    assert_eq!(Tensor::scalar(7.).dimension(), 0);
    assert!(tensor.is_same_shape(&Tensor::zeros(&[2, 2])));
    assert!(!tensor.is_same_shape(&Tensor::zeros(&[4])));
    assert_eq!(tensor.clone().into_data().len(), 4);

    assert_panic!(Tensor::new(&[1., 2., 3.], &[2, 2]));
}

#[test]
fn test_reshape() {
    let tensor = Tensor::arange(&[2, 3]);
    let reshaped = tensor.reshape(&[3, 2]).unwrap();
    assert_eq!(reshaped.to_vec(), tensor.to_vec());
    assert_eq!(
        tensor.reshape(&[4, 2]),
        Err(TensorError::IncompatibleShape {
            from: vec![2, 3],
            to: vec![4, 2],
        })
    );
    // 转置后的非连续数据
    let transposed = tensor.transpose().unwrap();
    assert_eq!(
        transposed.reshape(&[6]).unwrap().to_vec(),
        vec![0., 3., 1., 4., 2., 5.]
    );
}

#[test]
fn test_concat_and_slice_rows() {
    let a = Tensor::arange(&[2, 2]);
    let b = Tensor::new(&[9., 9.], &[1, 2]);
    let joined = Tensor::concat_rows(&[a.clone(), b]).unwrap();
    assert_eq!(joined.shape(), &[3, 2]);
    assert_eq!(joined.slice_rows(1, 3).to_vec(), vec![2., 3., 9., 9.]);

    assert_eq!(Tensor::concat_rows(&[]), Err(TensorError::EmptyList));
    assert_eq!(
        Tensor::concat_rows(&[a, Tensor::zeros(&[1, 3])]),
        Err(TensorError::InconsitentShape)
    );
}

#[test]
fn test_insert_axis() {
    let tensor = Tensor::arange(&[3]);
    assert_eq!(tensor.insert_axis(0).unwrap().shape(), &[1, 3]);
    assert_eq!(tensor.insert_axis(1).unwrap().shape(), &[3, 1]);
    assert!(tensor.insert_axis(2).is_err());
}

use candle_core::{Device, Tensor};
use credirag_embed::masked_mean_l2;

fn pooled(hidden: &[f32], shape: (usize, usize, usize), mask: &[u32]) -> Vec<Vec<f32>> {
    let dev = Device::Cpu;
    let h = Tensor::from_slice(hidden, shape, &dev).expect("hidden");
    let m = Tensor::from_slice(mask, (shape.0, shape.1), &dev).expect("mask");
    masked_mean_l2(&h, &m).expect("pool").to_vec2().expect("vec")
}

#[test]
fn padding_tokens_do_not_contribute() {
    // token 1 is padding; only [0, 3, 4] counts
    let out = pooled(&[0.0, 3.0, 4.0, 100.0, -50.0, 7.0], (1, 2, 3), &[1, 0]);
    let expected = [0.0, 0.6, 0.8];
    for (a, b) in out[0].iter().zip(expected) {
        assert!((a - b).abs() < 1e-5, "a={a} b={b}");
    }
}

#[test]
fn rows_are_pooled_independently() {
    let out = pooled(&[3.0, 0.0, 9.0, 9.0, 0.0, 2.0, 0.0, 4.0], (2, 2, 2), &[1, 0, 1, 1]);
    // row 0 keeps [3, 0]; row 1 averages to [0, 3]
    assert!((out[0][0] - 1.0).abs() < 1e-5 && out[0][1].abs() < 1e-5);
    assert!(out[1][0].abs() < 1e-5 && (out[1][1] - 1.0).abs() < 1e-5);
}

#[test]
fn all_padding_row_stays_finite() {
    let out = pooled(&[1.0, 2.0, 3.0, 4.0], (1, 2, 2), &[0, 0]);
    assert!(out[0].iter().all(|x| x.is_finite() && x.abs() < 1e-3));
}

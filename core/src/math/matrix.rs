use ndarray::{Array2, ArrayView2, Axis};

pub struct MatrixHelper;

impl MatrixHelper {
    /// Same-size 2D convolution with the separable kernel `rows ⊗ cols`.
    ///
    /// Both kernels must have odd length; samples outside the matrix count as
    /// zero. Kernels are applied unflipped, which equals convolution for the
    /// symmetric kernels used here.
    pub fn convolve_separable(input: ArrayView2<f64>, rows: &[f64], cols: &[f64]) -> Array2<f64> {
        let along_rows = Self::convolve_axis(input, rows, Axis(0));
        Self::convolve_axis(along_rows.view(), cols, Axis(1))
    }

    fn convolve_axis(input: ArrayView2<f64>, kernel: &[f64], axis: Axis) -> Array2<f64> {
        let mut output = Array2::zeros(input.raw_dim());
        let half = kernel.len() / 2;
        for (lane_in, mut lane_out) in input.lanes(axis).into_iter().zip(output.lanes_mut(axis)) {
            let len = lane_in.len();
            for idx in 0..len {
                let mut acc = 0.0;
                for (k, &weight) in kernel.iter().enumerate() {
                    let pos = idx + k;
                    if pos < half || pos - half >= len {
                        continue;
                    }
                    acc += weight * lane_in[pos - half];
                }
                lane_out[idx] = acc;
            }
        }
        output
    }
}

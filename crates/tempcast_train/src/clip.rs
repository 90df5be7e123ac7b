//! Gradient clipping by global norm.
//!
//! Burn's optimizer-level clipping works per parameter tensor. These
//! helpers treat every gradient of a module as one vector instead: the norm
//! is taken over all of them, and when it exceeds the limit every gradient
//! is scaled by the same factor.

use std::marker::PhantomData;

use burn::module::{Module, ModuleVisitor, ParamId};
use burn::optim::GradientsParams;
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;

/// Added to the norm before dividing.
const NORM_EPS: f64 = 1e-6;

struct SquaredNorm<'a, B: AutodiffBackend> {
    grads: &'a GradientsParams,
    total: f64,
    _backend: PhantomData<B>,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for SquaredNorm<'_, B> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        if let Some(grad) = self.grads.get::<B::InnerBackend, D>(id) {
            self.total += squared_norm(grad);
        }
    }
}

/// Squared L2 norm of one tensor in f64.
///
/// Entries are divided by the largest magnitude before squaring so the f32
/// sum stays in range; the scale is reapplied in f64.
fn squared_norm<B: Backend, const D: usize>(grad: Tensor<B, D>) -> f64 {
    let peak: f32 = grad.clone().abs().max().into_scalar().elem();
    if !peak.is_finite() {
        return f64::INFINITY;
    }
    if peak == 0.0 {
        return 0.0;
    }
    let unit: f32 = grad
        .div_scalar(peak)
        .powf_scalar(2.0)
        .sum()
        .into_scalar()
        .elem();
    if !unit.is_finite() {
        return f64::INFINITY;
    }
    let peak = f64::from(peak);
    peak * peak * f64::from(unit)
}

struct Rescale<'a, B: AutodiffBackend> {
    grads: &'a mut GradientsParams,
    scale: f32,
    _backend: PhantomData<B>,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for Rescale<'_, B> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        if let Some(grad) = self.grads.remove::<B::InnerBackend, D>(id) {
            self.grads.register(id, grad.mul_scalar(self.scale));
        }
    }
}

/// L2 norm of all gradients of `module`, taken as one flat vector.
///
/// Infinite when any gradient entry is NaN or infinite.
pub fn global_grad_norm<B, M>(module: &M, grads: &GradientsParams) -> f64
where
    B: AutodiffBackend,
    M: Module<B>,
{
    let mut visitor = SquaredNorm::<B> {
        grads,
        total: 0.0,
        _backend: PhantomData,
    };
    module.visit(&mut visitor);
    visitor.total.sqrt()
}

/// Scale all gradients so their global norm is at most `max_norm`.
///
/// Returns the norm measured before clipping. Gradients are untouched when
/// the norm is already within bounds, when it is not finite, or when
/// `max_norm` is not positive. Callers must treat a non-finite return value
/// as a failed step.
pub fn clip_global_norm<B, M>(module: &M, grads: &mut GradientsParams, max_norm: f32) -> f64
where
    B: AutodiffBackend,
    M: Module<B>,
{
    let norm = global_grad_norm::<B, M>(module, grads);
    let max_norm = f64::from(max_norm);
    if max_norm <= 0.0 || !norm.is_finite() || norm <= max_norm {
        return norm;
    }

    let scale = (max_norm / (norm + NORM_EPS)) as f32;
    tracing::trace!("Clipping gradients: norm {:.4e} -> {:.4}", norm, max_norm);

    let mut visitor = Rescale::<B> {
        grads,
        scale,
        _backend: PhantomData,
    };
    module.visit(&mut visitor);
    norm
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::nn::{Linear, LinearConfig};
    use burn_autodiff::Autodiff;
    use burn_ndarray::NdArray;

    type TestBackend = Autodiff<NdArray>;

    fn grads_for(layer: &Linear<TestBackend>, scale: f32) -> GradientsParams {
        let device = Default::default();
        let x = Tensor::<TestBackend, 2>::ones([2, 3], &device).mul_scalar(scale);
        let loss = layer.forward(x).sum();
        GradientsParams::from_grads(loss.backward(), layer)
    }

    #[test]
    fn test_norm_matches_manual() {
        let device = Default::default();
        let layer = LinearConfig::new(3, 2).init::<TestBackend>(&device);
        let grads = grads_for(&layer, 1.0);

        // d(sum(xW + b))/dW = x^T 1 = 2 everywhere (6 entries); d/db = 2 (2 entries)
        let expected = (8.0f64 * 4.0).sqrt();
        let norm = global_grad_norm::<TestBackend, _>(&layer, &grads);
        assert!((norm - expected).abs() < 1e-4, "norm {norm}");
    }

    #[test]
    fn test_clip_scales_to_max() {
        let device = Default::default();
        let layer = LinearConfig::new(3, 2).init::<TestBackend>(&device);
        let mut grads = grads_for(&layer, 10.0);

        let before = clip_global_norm::<TestBackend, _>(&layer, &mut grads, 1.0);
        assert!(before > 1.0);

        let after = global_grad_norm::<TestBackend, _>(&layer, &grads);
        assert!((after - 1.0).abs() < 1e-4, "after {after}");
    }

    #[test]
    fn test_clip_leaves_small_gradients() {
        let device = Default::default();
        let layer = LinearConfig::new(3, 2).init::<TestBackend>(&device);
        let mut grads = grads_for(&layer, 1.0);

        let before = clip_global_norm::<TestBackend, _>(&layer, &mut grads, 100.0);
        let after = global_grad_norm::<TestBackend, _>(&layer, &grads);
        assert!((before - after).abs() < 1e-6);
    }

    #[test]
    fn test_clip_handles_huge_gradients() {
        let device = Default::default();
        let layer = LinearConfig::new(3, 2).init::<TestBackend>(&device);
        // Six weight gradients of 2e20 each; squaring them in f32 would overflow.
        let mut grads = grads_for(&layer, 1e20);

        let before = clip_global_norm::<TestBackend, _>(&layer, &mut grads, 1.0);
        assert!(before.is_finite());
        assert!((before / (2e20 * 6f64.sqrt()) - 1.0).abs() < 1e-4, "before {before}");

        let after = global_grad_norm::<TestBackend, _>(&layer, &grads);
        assert!(after <= 1.0 + 1e-4, "after {after}");

        let weight = grads.get::<NdArray, 2>(layer.weight.id).unwrap();
        let peak: f32 = weight.abs().max().into_scalar();
        assert!(peak <= 1.0, "peak {peak}");
    }

    #[test]
    fn test_non_finite_norm_is_reported() {
        let device = Default::default();
        let layer = LinearConfig::new(3, 2).init::<TestBackend>(&device);
        let mut grads = grads_for(&layer, f32::INFINITY);

        let norm = clip_global_norm::<TestBackend, _>(&layer, &mut grads, 1.0);
        assert!(!norm.is_finite());
    }
}

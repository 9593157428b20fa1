// AMSGrad: Adam that divides by the running maximum of the second
// moment instead of the current estimate.
//
//   m    = β1*m + (1-β1)*g
//   v    = β2*v + (1-β2)*g²
//   v̂    = max(v̂, v)
//   lr_t = lr * √(1-β2^t) / (1-β1^t)
//   θ    = θ - lr_t * m / (√v̂ + ε)
//
// burn's Adam has no amsgrad switch, so this plugs into the
// optimizer machinery through SimpleOptimizer + OptimizerAdaptor.

use burn::{
    config::Config,
    module::AutodiffModule,
    optim::{adaptor::OptimizerAdaptor, LearningRate, SimpleOptimizer},
    prelude::*,
    record::Record,
    tensor::backend::AutodiffBackend,
};

#[derive(Config, Debug)]
pub struct AmsGradConfig {
    #[config(default = 0.9)]
    pub beta_1: f32,
    #[config(default = 0.999)]
    pub beta_2: f32,
    #[config(default = 1e-7)]
    pub epsilon: f32,
}

impl AmsGradConfig {
    pub fn init<B: AutodiffBackend, M: AutodiffModule<B>>(
        &self,
    ) -> OptimizerAdaptor<AmsGrad, M, B> {
        OptimizerAdaptor::from(AmsGrad {
            beta_1: self.beta_1,
            beta_2: self.beta_2,
            epsilon: self.epsilon,
        })
    }
}

#[derive(Clone, Debug)]
pub struct AmsGrad {
    beta_1: f32,
    beta_2: f32,
    epsilon: f32,
}

/// Per-parameter optimizer state.
#[derive(Record, Clone)]
pub struct AmsGradState<B: Backend, const D: usize> {
    pub time: usize,
    pub moment_1: Tensor<B, D>,
    pub moment_2: Tensor<B, D>,
    pub max_moment_2: Tensor<B, D>,
}

impl<B: Backend> SimpleOptimizer<B> for AmsGrad {
    type State<const D: usize> = AmsGradState<B, D>;

    fn step<const D: usize>(
        &self,
        lr: LearningRate,
        tensor: Tensor<B, D>,
        grad: Tensor<B, D>,
        state: Option<Self::State<D>>,
    ) -> (Tensor<B, D>, Option<Self::State<D>>) {
        let first = grad.clone().mul_scalar(1.0 - self.beta_1);
        let second = grad.powi_scalar(2).mul_scalar(1.0 - self.beta_2);

        let (time, moment_1, moment_2, max_moment_2) = match state {
            Some(state) => {
                let moment_1 = state.moment_1.mul_scalar(self.beta_1).add(first);
                let moment_2 = state.moment_2.mul_scalar(self.beta_2).add(second);
                let max_moment_2 = state.max_moment_2.max_pair(moment_2.clone());
                (state.time + 1, moment_1, moment_2, max_moment_2)
            }
            None => (1, first, second.clone(), second),
        };

        let t = time as i32;
        let lr_t = lr * (1.0 - (self.beta_2 as f64).powi(t)).sqrt()
            / (1.0 - (self.beta_1 as f64).powi(t));

        let delta = moment_1
            .clone()
            .div(max_moment_2.clone().sqrt().add_scalar(self.epsilon))
            .mul_scalar(lr_t);

        let state = AmsGradState {
            time,
            moment_1,
            moment_2,
            max_moment_2,
        };
        (tensor.sub(delta), Some(state))
    }

    fn to_device<const D: usize>(mut state: Self::State<D>, device: &B::Device) -> Self::State<D> {
        state.moment_1 = state.moment_1.to_device(device);
        state.moment_2 = state.moment_2.to_device(device);
        state.max_moment_2 = state.max_moment_2.to_device(device);
        state
    }
}

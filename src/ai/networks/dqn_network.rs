use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::{Initializer, Linear, LinearConfig, PaddingConfig2d, Relu};
use burn::prelude::*;

use crate::game::NUM_ACTIONS;

/// DQN network architecture for checkers.
///
/// ```text
/// Input:  [batch, 1, 8, 8]
/// Conv1:  1 -> C channels, 3x3, stride 2, pad 1  =>  [batch, C, 4, 4]
/// ReLU
/// Conv2:  C -> C channels, 3x3, stride 2, pad 1  =>  [batch, C, 2, 2]
/// ReLU
/// Conv3:  C -> C channels, 3x3, stride 2, pad 1  =>  [batch, C, 1, 1]
/// ReLU
/// Flatten: C
/// FC1:    C -> H, ReLU
/// FC2:    H -> H, ReLU
/// Out:    H -> 128  (Q-values, one per square x direction)
/// ```
#[derive(Module, Debug)]
pub struct DqnNetwork<B: Backend> {
    conv1: Conv2d<B>,
    conv2: Conv2d<B>,
    conv3: Conv2d<B>,
    fc1: Linear<B>,
    fc2: Linear<B>,
    out: Linear<B>,
    relu: Relu,
}

#[derive(Config, Debug)]
pub struct DqnNetworkConfig {
    #[config(default = 16)]
    pub conv_channels: usize,
    #[config(default = 8)]
    pub hidden_size: usize,
    #[config(default = "NUM_ACTIONS")]
    pub num_actions: usize,
}

impl DqnNetworkConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> DqnNetwork<B> {
        let c = self.conv_channels;
        let h = self.hidden_size;
        let conv = |in_channels: usize| {
            Conv2dConfig::new([in_channels, c], [3, 3])
                .with_stride([2, 2])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(device)
        };
        // He-uniform for the dense head
        let he_uniform = Initializer::KaimingUniform {
            gain: std::f64::consts::SQRT_2,
            fan_out_only: false,
        };

        DqnNetwork {
            conv1: conv(1),
            conv2: conv(c),
            conv3: conv(c),
            fc1: LinearConfig::new(c, h)
                .with_initializer(he_uniform.clone())
                .init(device),
            fc2: LinearConfig::new(h, h)
                .with_initializer(he_uniform.clone())
                .init(device),
            out: LinearConfig::new(h, self.num_actions)
                .with_initializer(he_uniform)
                .init(device),
            relu: Relu::new(),
        }
    }
}

impl<B: Backend> DqnNetwork<B> {
    /// Forward pass: input [batch, 1, 8, 8] -> output [batch, num_actions] Q-values.
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.relu.forward(self.conv1.forward(input));
        let x = self.relu.forward(self.conv2.forward(x));
        let x = self.relu.forward(self.conv3.forward(x));
        let [batch_size, channels, height, width] = x.dims();
        let x = x.reshape([batch_size, channels * height * width]);
        let x = self.relu.forward(self.fc1.forward(x));
        let x = self.relu.forward(self.fc2.forward(x));
        self.out.forward(x)
    }
}

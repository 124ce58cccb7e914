//! Core configuration for reveal-core.

use serde::{Deserialize, Serialize};

/// Stage-wide timing, smoothing and contract settings.
///
/// Every field has a default, so hosts may pass a partial JSON object.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Delay between mounting a section and running its trigger build, so layout can settle.
    pub settle_delay_ms: f64,
    /// Resize events closer together than this collapse into one layout pass.
    pub resize_debounce_ms: f64,
    /// Smooth-scroll proxy settings used by `Stage::start_smooth_scroll`.
    pub smooth: SmoothScrollConfig,
    /// Pinned-card stack geometry.
    pub stack: StackConfig,
    /// Panic on caller contract violations instead of logging and recovering.
    pub strict_contracts: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settle_delay_ms: 50.0,
            resize_debounce_ms: 100.0,
            smooth: SmoothScrollConfig::default(),
            stack: StackConfig::default(),
            strict_contracts: cfg!(debug_assertions),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothScrollConfig {
    /// Seconds the virtual offset takes to catch up with the native offset.
    pub smooth: f32,
    /// Whether per-element lag effects are honoured while smoothing.
    pub effects: bool,
}

impl Default for SmoothScrollConfig {
    fn default() -> Self {
        Self {
            smooth: 1.2,
            effects: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    /// Scale lost per card of stacking depth.
    pub scale_step: f32,
    /// Extra pin lead (px) per card index so later cards pin slightly earlier.
    pub offset_step_px: f32,
    /// Pin line below the viewport top (px).
    pub pin_top_px: f32,
    /// Lower bound for the computed scale; deep stacks clamp here instead of going non-positive.
    pub min_scale: f32,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            scale_step: 0.05,
            offset_step_px: 40.0,
            pin_top_px: 150.0,
            min_scale: 0.05,
        }
    }
}

impl StackConfig {
    /// Resting scale for card `index` of `count`: cards further back in the stack shrink.
    pub fn scale_for(&self, index: usize, count: usize) -> f32 {
        let depth = count.saturating_sub(index + 1) as f32;
        (1.0 - depth * self.scale_step).max(self.min_scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: Config = serde_json::from_str(r#"{ "settle_delay_ms": 80 }"#).unwrap();
        assert_eq!(cfg.settle_delay_ms, 80.0);
        assert_eq!(cfg.resize_debounce_ms, 100.0);
        assert_eq!(cfg.smooth.smooth, 1.2);
        assert!(cfg.smooth.effects);
    }

    #[test]
    fn stack_scale_matches_three_card_layout() {
        let stack = StackConfig::default();
        let scales: Vec<f32> = (0..3).map(|i| stack.scale_for(i, 3)).collect();
        assert!((scales[0] - 0.90).abs() < 1e-6);
        assert!((scales[1] - 0.95).abs() < 1e-6);
        assert!((scales[2] - 1.00).abs() < 1e-6);
    }

    #[test]
    fn stack_scale_stays_positive_for_deep_stacks() {
        let stack = StackConfig::default();
        for count in [6usize, 20, 21, 22, 100] {
            for i in 0..count {
                let s = stack.scale_for(i, count);
                assert!(s > 0.0, "count={count} i={i} scale={s}");
                assert!(s <= 1.0);
            }
        }
        // The unclamped formula first reaches zero at depth 20.
        assert_eq!(stack.scale_for(0, 21), stack.min_scale);
    }
}

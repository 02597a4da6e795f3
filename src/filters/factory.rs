// SPDX-License-Identifier: GPL-3.0-only

//! Backend selection
//!
//! The backend is chosen once, when stages are built. Everything downstream
//! holds `Box<dyn FilterStage>` and never branches on it.

use super::{
    ComputeFilter, FilterBackend, FilterChain, FilterStage, FilterType, LegacyFilter, StageConfig,
};
use crate::geometry::ContentFit;
use crate::gpu::GpuContext;
use crate::media::{Dimensions, PixelBuffer};
use crate::pipelines::Scaler;
use std::sync::Arc;
use tracing::debug;

/// Build one stage on `backend`
pub fn create_stage(
    context: &Arc<GpuContext>,
    backend: FilterBackend,
    config: StageConfig,
) -> Box<dyn FilterStage> {
    match backend {
        FilterBackend::Legacy => Box::new(LegacyFilter::new(context.clone(), config)),
        FilterBackend::Compute => Box::new(ComputeFilter::new(context.clone(), config)),
    }
}

/// Build the standard chain: passthrough, the effect, one blend per overlay
///
/// The passthrough stage applies the media transform and output size; the
/// effect stage is skipped when the filter is not applied.
pub fn create_chain(
    context: &Arc<GpuContext>,
    backend: FilterBackend,
    effect: FilterType,
    overlays: &[PixelBuffer],
) -> FilterChain {
    let mut chain = FilterChain::default();
    chain.push(create_stage(context, backend, StageConfig::effect(FilterType::Passthrough)));
    if effect.is_applied() {
        chain.push(create_stage(context, backend, StageConfig::effect(effect)));
    }
    for overlay in overlays {
        chain.push(create_stage(context, backend, StageConfig::overlay(overlay.clone())));
    }
    debug!(backend = backend.display_name(), stages = ?chain.labels(), "Built filter chain");
    chain
}

/// Source of stages for long-lived owners such as the renderer
pub trait ChainFactory: Send + Sync {
    /// Chain for `effect` with `overlays` blended on top
    fn create_chain(&self, effect: FilterType, overlays: &[PixelBuffer]) -> FilterChain;

    /// Stage fitting its input into `target`
    fn create_scaler(
        &self,
        target: Dimensions,
        fit: ContentFit,
        portrait: bool,
    ) -> Box<dyn FilterStage>;
}

/// [`ChainFactory`] producing GPU stages on one backend
#[derive(Clone)]
pub struct StageFactory {
    context: Arc<GpuContext>,
    backend: FilterBackend,
}

impl StageFactory {
    pub fn new(context: Arc<GpuContext>, backend: FilterBackend) -> Self {
        Self { context, backend }
    }

    pub fn backend(&self) -> FilterBackend {
        self.backend
    }

    pub fn context(&self) -> &Arc<GpuContext> {
        &self.context
    }

    pub fn create_stage(&self, config: StageConfig) -> Box<dyn FilterStage> {
        create_stage(&self.context, self.backend, config)
    }
}

impl ChainFactory for StageFactory {
    fn create_chain(&self, effect: FilterType, overlays: &[PixelBuffer]) -> FilterChain {
        create_chain(&self.context, self.backend, effect, overlays)
    }

    fn create_scaler(
        &self,
        target: Dimensions,
        fit: ContentFit,
        portrait: bool,
    ) -> Box<dyn FilterStage> {
        let inner = self.create_stage(StageConfig::effect(FilterType::Passthrough));
        Box::new(Scaler::new(inner, target, fit, portrait))
    }
}

impl std::fmt::Debug for StageFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageFactory")
            .field("backend", &self.backend)
            .field("adapter", &self.context.info().adapter_name)
            .finish()
    }
}

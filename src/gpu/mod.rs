// SPDX-License-Identifier: GPL-3.0-only

//! GPU device setup shared by both filter backends
//!
//! A [`GpuContext`] owns one wgpu device and queue. Stages hold an
//! `Arc<GpuContext>` and bind it (see [`context`]) around every call that
//! records or submits GPU work.

pub mod context;

use crate::errors::{PipelineResult, SetupError};
use context::{ContextGuard, ContextId};
use std::sync::Arc;
use tracing::{debug, info};

pub use wgpu;

/// Information about the created GPU device
#[derive(Debug, Clone)]
pub struct GpuDeviceInfo {
    /// Name of the GPU adapter
    pub adapter_name: String,
    /// Backend being used (Vulkan, Metal, DX12, etc.)
    pub backend: wgpu::Backend,
}

/// Device, queue and identity for one pipeline instance
pub struct GpuContext {
    id: ContextId,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    info: GpuDeviceInfo,
}

/// Create a wgpu device and queue for filter work.
///
/// # Arguments
///
/// * `label` - A label for the device (for debugging)
pub async fn create_device(
    label: &str,
) -> PipelineResult<(Arc<wgpu::Device>, Arc<wgpu::Queue>, GpuDeviceInfo)> {
    info!(label = label, "Creating GPU device for filters");

    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::PRIMARY,
        ..Default::default()
    });

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .map_err(|e| SetupError::NoAdapter(e.to_string()))?;

    let adapter_info = adapter.get_info();

    info!(
        adapter = %adapter_info.name,
        backend = ?adapter_info.backend,
        "GPU adapter selected for filters"
    );

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some(label),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
            memory_hints: wgpu::MemoryHints::Performance,
            ..Default::default()
        })
        .await
        .map_err(|e| SetupError::DeviceCreation(e.to_string()))?;

    let info = GpuDeviceInfo {
        adapter_name: adapter_info.name.clone(),
        backend: adapter_info.backend,
    };

    Ok((Arc::new(device), Arc::new(queue), info))
}

impl GpuContext {
    /// Create a context on the best available adapter
    pub async fn new(label: &str) -> PipelineResult<Arc<Self>> {
        let (device, queue, info) = create_device(label).await?;
        let id = ContextId::next();
        debug!(context = id.as_u64(), adapter = %info.adapter_name, "GPU context ready");
        Ok(Arc::new(Self {
            id,
            device,
            queue,
            info,
        }))
    }

    /// Blocking variant of [`GpuContext::new`] for non-async callers
    pub fn new_blocking(label: &str) -> PipelineResult<Arc<Self>> {
        pollster::block_on(Self::new(label))
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.queue
    }

    pub fn info(&self) -> &GpuDeviceInfo {
        &self.info
    }

    /// Make this context current on the calling thread until the guard drops
    pub fn bind(&self) -> ContextGuard {
        ContextGuard::bind(self.id)
    }

    /// True if this context is bound on the calling thread
    pub fn is_current(&self) -> bool {
        context::current() == Some(self.id)
    }
}

impl std::fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuContext")
            .field("id", &self.id)
            .field("info", &self.info)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_context() {
        // This test requires a GPU, so it may be skipped in CI
        match GpuContext::new("test_device").await {
            Ok(ctx) => {
                println!("Created device: {:?}", ctx.info());
                assert!(!ctx.is_current());
                let guard = ctx.bind();
                assert!(ctx.is_current());
                drop(guard);
                assert!(!ctx.is_current());
            }
            Err(e) => {
                // Skip if no GPU available
                println!("Skipping test (no GPU): {}", e);
            }
        }
    }
}

// SPDX-License-Identifier: MPL-2.0

//! Error types for the filter pipeline
//!
//! Setup failures are reported once, when a stage or chain is prepared.
//! Frame failures never leave a stage: `FilterStage::process` turns them into
//! "no output for this frame".

use std::fmt;

/// Result type alias using PipelineError
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Main pipeline error type
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Fatal to a pipeline instance, raised at construction or first-frame time
    Setup(SetupError),
    /// Recoverable per frame, the frame is dropped
    Frame(FrameError),
    /// Configuration errors
    Config(String),
    /// Reading or writing media files
    Storage(String),
    /// Generic error with message
    Other(String),
}

/// Errors raised while preparing GPU resources
#[derive(Debug, Clone, PartialEq)]
pub enum SetupError {
    /// No GPU adapter could be found
    NoAdapter(String),
    /// The adapter refused to create a device
    DeviceCreation(String),
    /// A shader failed to compile or a pipeline failed to build
    ShaderCompilation(String),
    /// The buffer pool could not allocate its backing memory
    PoolAllocation(String),
    /// Zero or oversized dimensions were requested
    InvalidDimensions { width: u32, height: u32 },
    /// The first sample's pixel format cannot be rendered by the stage
    UnsupportedFormat(String),
    /// The GPU context a stage is bound to is gone
    ContextUnavailable,
}

/// Errors raised while processing a single frame
#[derive(Debug, Clone, PartialEq)]
pub enum FrameError {
    /// The pool is at its outstanding-buffer cap
    PoolExhausted,
    /// Input pixel format differs from the negotiated format
    FormatMismatch(String),
    /// Input dimensions differ from the negotiated dimensions
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    /// A buffer could not be imported as a texture
    ImportFailed(String),
    /// `process` was called before `prepare`
    NotPrepared,
    /// Reading the rendered result back failed
    Readback(String),
}

impl PipelineError {
    /// True for errors that only cost the current frame
    pub fn is_frame_failure(&self) -> bool {
        matches!(self, PipelineError::Frame(_))
    }

    /// True when the error is the pool's allocation cap
    pub fn is_pool_exhausted(&self) -> bool {
        matches!(self, PipelineError::Frame(FrameError::PoolExhausted))
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Setup(e) => write!(f, "Setup failed: {}", e),
            PipelineError::Frame(e) => write!(f, "Frame dropped: {}", e),
            PipelineError::Config(msg) => write!(f, "Configuration error: {}", msg),
            PipelineError::Storage(msg) => write!(f, "Storage error: {}", msg),
            PipelineError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetupError::NoAdapter(msg) => write!(f, "No suitable GPU adapter: {}", msg),
            SetupError::DeviceCreation(msg) => write!(f, "Failed to create GPU device: {}", msg),
            SetupError::ShaderCompilation(msg) => write!(f, "Shader compilation failed: {}", msg),
            SetupError::PoolAllocation(msg) => write!(f, "Buffer pool allocation failed: {}", msg),
            SetupError::InvalidDimensions { width, height } => {
                write!(f, "Invalid dimensions {}x{}", width, height)
            }
            SetupError::UnsupportedFormat(msg) => write!(f, "Unsupported pixel format: {}", msg),
            SetupError::ContextUnavailable => write!(f, "GPU context unavailable"),
        }
    }
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::PoolExhausted => write!(f, "Pool is out of buffers"),
            FrameError::FormatMismatch(msg) => write!(f, "Invalid pixel buffer format: {}", msg),
            FrameError::DimensionMismatch { expected, actual } => write!(
                f,
                "Expected {}x{} input, got {}x{}",
                expected.0, expected.1, actual.0, actual.1
            ),
            FrameError::ImportFailed(msg) => write!(f, "Texture import failed: {}", msg),
            FrameError::NotPrepared => write!(f, "Stage has not been prepared"),
            FrameError::Readback(msg) => write!(f, "Readback failed: {}", msg),
        }
    }
}

impl std::error::Error for PipelineError {}
impl std::error::Error for SetupError {}
impl std::error::Error for FrameError {}

impl From<SetupError> for PipelineError {
    fn from(err: SetupError) -> Self {
        PipelineError::Setup(err)
    }
}

impl From<FrameError> for PipelineError {
    fn from(err: FrameError) -> Self {
        PipelineError::Frame(err)
    }
}

impl From<String> for PipelineError {
    fn from(msg: String) -> Self {
        PipelineError::Other(msg)
    }
}

impl From<&str> for PipelineError {
    fn from(msg: &str) -> Self {
        PipelineError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Storage(err.to_string())
    }
}

impl From<image::ImageError> for PipelineError {
    fn from(err: image::ImageError) -> Self {
        PipelineError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_failure_classification() {
        let err: PipelineError = FrameError::PoolExhausted.into();
        assert!(err.is_frame_failure());
        assert!(err.is_pool_exhausted());

        let err: PipelineError = SetupError::ContextUnavailable.into();
        assert!(!err.is_frame_failure());
        assert!(!err.is_pool_exhausted());
    }

    #[test]
    fn test_display_messages() {
        let err = PipelineError::Frame(FrameError::DimensionMismatch {
            expected: (640, 480),
            actual: (1280, 720),
        });
        assert_eq!(
            err.to_string(),
            "Frame dropped: Expected 640x480 input, got 1280x720"
        );

        let err = PipelineError::Setup(SetupError::InvalidDimensions {
            width: 0,
            height: 10,
        });
        assert_eq!(err.to_string(), "Setup failed: Invalid dimensions 0x10");
    }
}

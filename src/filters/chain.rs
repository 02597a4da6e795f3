// SPDX-License-Identifier: GPL-3.0-only

//! Ordered composition of filter stages

use super::{FilterStage, StageSetup};
use crate::errors::PipelineResult;
use crate::media::{FormatDescription, MediaTime, PixelBuffer};
use tracing::{debug, trace, warn};

/// A fold of `process` over an ordered list of stages
///
/// The chain is itself a [`FilterStage`], so a chain can be nested or wrapped
/// like any single stage. An empty chain passes buffers through unchanged.
#[derive(Default)]
pub struct FilterChain {
    stages: Vec<Box<dyn FilterStage>>,
    prepared_format: Option<FormatDescription>,
}

impl FilterChain {
    pub fn new(stages: Vec<Box<dyn FilterStage>>) -> Self {
        Self {
            stages,
            prepared_format: None,
        }
    }

    /// Append a stage; only valid before the chain is prepared
    pub fn push(&mut self, stage: Box<dyn FilterStage>) {
        self.stages.push(stage);
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared_format.is_some()
    }

    /// Labels of the stages, in order
    pub fn labels(&self) -> Vec<String> {
        self.stages.iter().map(|stage| stage.label().to_string()).collect()
    }
}

impl FilterStage for FilterChain {
    fn label(&self) -> &str {
        "chain"
    }

    /// Prepare every stage in order
    ///
    /// Stage 0 receives the caller's setup; each later stage is prepared with
    /// the previous stage's negotiated output format and no overrides.
    fn prepare(&mut self, format: &FormatDescription, setup: &StageSetup) -> PipelineResult<()> {
        if self.is_prepared() {
            return Ok(());
        }

        let mut current = *format;
        let mut failure = None;
        for (index, stage) in self.stages.iter_mut().enumerate() {
            let stage_setup = if index == 0 {
                *setup
            } else {
                StageSetup::default()
            };
            if let Err(e) = stage.prepare(&current, &stage_setup) {
                warn!(stage = %stage.label(), index, error = %e, "Chain setup failed");
                failure = Some(e);
                break;
            }
            if let Some(output) = stage.output_format() {
                current = output;
            }
        }
        if let Some(e) = failure {
            // Stages prepared before the failure release their pools too
            self.cleanup();
            return Err(e);
        }

        debug!(
            stages = self.stages.len(),
            input = %format.dimensions,
            output = %current.dimensions,
            "Filter chain prepared"
        );
        self.prepared_format = Some(*format);
        Ok(())
    }

    fn output_format(&self) -> Option<FormatDescription> {
        let input = self.prepared_format?;
        match self.stages.last() {
            Some(stage) => stage.output_format(),
            None => Some(input),
        }
    }

    /// Run `input` through every stage; any dropped stage drops the frame
    fn process(&mut self, input: &PixelBuffer, time: MediaTime) -> Option<PixelBuffer> {
        let mut current = input.clone();
        for (index, stage) in self.stages.iter_mut().enumerate() {
            match stage.process(&current, time) {
                Some(output) => current = output,
                None => {
                    trace!(stage = %stage.label(), index, "Chain short-circuited");
                    return None;
                }
            }
        }
        Some(current)
    }

    fn cleanup(&mut self) {
        for stage in &mut self.stages {
            stage.cleanup();
        }
        self.prepared_format = None;
    }
}

impl std::fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterChain")
            .field("stages", &self.labels())
            .field("prepared", &self.is_prepared())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{Dimensions, PixelFormat};

    struct Halve {
        output: Option<FormatDescription>,
    }

    impl FilterStage for Halve {
        fn label(&self) -> &str {
            "halve"
        }

        fn prepare(&mut self, format: &FormatDescription, _: &StageSetup) -> PipelineResult<()> {
            if self.output.is_none() {
                let dims = Dimensions::new(format.width() / 2, format.height() / 2);
                self.output = Some(FormatDescription::new(dims, format.pixel_format));
            }
            Ok(())
        }

        fn output_format(&self) -> Option<FormatDescription> {
            self.output
        }

        fn process(&mut self, _: &PixelBuffer, _: MediaTime) -> Option<PixelBuffer> {
            let output = self.output?;
            PixelBuffer::new(output.width(), output.height(), output.pixel_format).ok()
        }

        fn cleanup(&mut self) {
            self.output = None;
        }
    }

    #[test]
    fn test_output_dimensions_thread_forward() {
        let mut chain = FilterChain::new(vec![
            Box::new(Halve { output: None }),
            Box::new(Halve { output: None }),
        ]);
        let format = FormatDescription::new(Dimensions::new(64, 32), PixelFormat::Bgra8);
        chain.prepare(&format, &StageSetup::default()).unwrap();
        assert_eq!(
            chain.output_format().map(|f| f.dimensions),
            Some(Dimensions::new(16, 8))
        );

        let input = PixelBuffer::new(64, 32, PixelFormat::Bgra8).unwrap();
        let output = chain.process(&input, MediaTime::ZERO).unwrap();
        assert_eq!(output.dimensions(), Dimensions::new(16, 8));
    }

    #[test]
    fn test_empty_chain_passes_through() {
        let mut chain = FilterChain::default();
        let format = FormatDescription::new(Dimensions::new(4, 4), PixelFormat::Bgra8);
        assert_eq!(chain.output_format(), None);
        chain.prepare(&format, &StageSetup::default()).unwrap();
        assert_eq!(chain.output_format(), Some(format));

        let input = PixelBuffer::new(4, 4, PixelFormat::Bgra8).unwrap();
        let output = chain.process(&input, MediaTime::ZERO).unwrap();
        assert!(output.same_buffer(&input));
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let mut chain = FilterChain::new(vec![Box::new(Halve { output: None })]);
        let format = FormatDescription::new(Dimensions::new(8, 8), PixelFormat::Bgra8);
        chain.prepare(&format, &StageSetup::default()).unwrap();
        chain.cleanup();
        chain.cleanup();
        assert!(!chain.is_prepared());
        assert_eq!(chain.output_format(), None);
    }
}

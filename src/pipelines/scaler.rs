// SPDX-License-Identifier: GPL-3.0-only

//! Fit-to-target scaling stage
//!
//! Wraps a backend stage and prepares it so its quad lands where
//! [`compute_fit`] places the source inside a fixed presentation target.
//! Target pixels the source does not cover are transparent black.

use crate::errors::PipelineResult;
use crate::filters::{FilterStage, StageSetup};
use crate::geometry::{ContentFit, FitTransform, Orientation, compute_fit};
use crate::media::{Dimensions, FormatDescription, MediaTime, PixelBuffer};
use tracing::debug;

/// Stage that resizes its input into a fixed target
pub struct Scaler {
    inner: Box<dyn FilterStage>,
    target: Dimensions,
    fit: ContentFit,
    portrait: bool,
    placement: Option<FitTransform>,
}

impl Scaler {
    pub fn new(
        inner: Box<dyn FilterStage>,
        target: Dimensions,
        fit: ContentFit,
        portrait: bool,
    ) -> Self {
        Self {
            inner,
            target,
            fit,
            portrait,
            placement: None,
        }
    }

    pub fn target(&self) -> Dimensions {
        self.target
    }

    pub fn content_fit(&self) -> ContentFit {
        self.fit
    }

    /// Placement negotiated at prepare time
    pub fn placement(&self) -> Option<&FitTransform> {
        self.placement.as_ref()
    }

    /// Setup handed to the wrapped stage for an input of `source`
    pub fn inner_setup(&self, source: Dimensions, setup: &StageSetup) -> (StageSetup, FitTransform) {
        let target = if self.target.is_empty() {
            source
        } else {
            self.target
        };
        let fit = compute_fit(source, target, self.fit, self.portrait);

        let caller = setup.transform.unwrap_or_default();
        // A portrait fit of a landscape source needs the quad turned unless
        // the caller's transform already turns it
        let rotation = if self.portrait && source.width > source.height && !caller.swaps_axes() {
            Orientation::Right.transform()
        } else {
            None
        };
        let transform = match rotation {
            Some(rotation) => fit.to_ndc_transform() * rotation * caller,
            None => fit.to_ndc_transform() * caller,
        };

        let inner = StageSetup {
            transform: Some(transform),
            output_dimensions: Some(target),
            swap_dimensions: false,
        };
        (inner, fit)
    }
}

impl FilterStage for Scaler {
    fn label(&self) -> &str {
        "scaler"
    }

    fn prepare(&mut self, format: &FormatDescription, setup: &StageSetup) -> PipelineResult<()> {
        if self.placement.is_some() {
            return Ok(());
        }
        let (inner_setup, fit) = self.inner_setup(format.dimensions, setup);
        self.inner.prepare(format, &inner_setup)?;

        debug!(
            source = %format.dimensions,
            target = %self.target,
            fit = self.fit.display_name(),
            scale_x = fit.scale_x,
            scale_y = fit.scale_y,
            "Scaler prepared"
        );
        self.placement = Some(fit);
        Ok(())
    }

    fn output_format(&self) -> Option<FormatDescription> {
        self.inner.output_format()
    }

    fn process(&mut self, input: &PixelBuffer, time: MediaTime) -> Option<PixelBuffer> {
        self.inner.process(input, time)
    }

    fn cleanup(&mut self) {
        self.inner.cleanup();
        self.placement = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Transform;
    use crate::media::PixelFormat;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorder {
        setups: Arc<Mutex<Vec<StageSetup>>>,
        output: Option<FormatDescription>,
    }

    impl FilterStage for Recorder {
        fn label(&self) -> &str {
            "recorder"
        }

        fn prepare(&mut self, format: &FormatDescription, setup: &StageSetup) -> PipelineResult<()> {
            self.setups.lock().unwrap().push(*setup);
            let dims = setup.resolve_output(format.dimensions);
            self.output = Some(FormatDescription::new(dims, format.pixel_format));
            Ok(())
        }

        fn output_format(&self) -> Option<FormatDescription> {
            self.output
        }

        fn process(&mut self, input: &PixelBuffer, _: MediaTime) -> Option<PixelBuffer> {
            Some(input.clone())
        }

        fn cleanup(&mut self) {
            self.output = None;
        }
    }

    fn landscape() -> FormatDescription {
        FormatDescription::new(Dimensions::new(1920, 1080), PixelFormat::Bgra8)
    }

    #[test]
    fn test_prepares_inner_with_target_size() {
        let setups = Arc::new(Mutex::new(Vec::new()));
        let inner = Recorder {
            setups: setups.clone(),
            output: None,
        };
        let mut scaler = Scaler::new(
            Box::new(inner),
            Dimensions::new(1080, 1920),
            ContentFit::AspectFit,
            false,
        );
        scaler.prepare(&landscape(), &StageSetup::default()).unwrap();
        scaler.prepare(&landscape(), &StageSetup::default()).unwrap();

        let setups = setups.lock().unwrap();
        assert_eq!(setups.len(), 1);
        assert_eq!(setups[0].output_dimensions, Some(Dimensions::new(1080, 1920)));
        assert_eq!(
            scaler.output_format().map(|f| f.dimensions),
            Some(Dimensions::new(1080, 1920))
        );
        assert!((scaler.placement().unwrap().scale() - 0.5625).abs() < 1e-9);
    }

    #[test]
    fn test_aspect_fit_letterboxes_in_ndc() {
        let scaler = Scaler::new(
            Box::new(Recorder::default()),
            Dimensions::new(1080, 1920),
            ContentFit::AspectFit,
            false,
        );
        let (setup, _) = scaler.inner_setup(Dimensions::new(1920, 1080), &StageSetup::default());
        let transform = setup.transform.unwrap();
        let (x, y) = transform.apply(1.0, 1.0);
        assert!((x - 1.0).abs() < 1e-5);
        assert!((y - 607.5 / 1920.0).abs() < 1e-5);
    }

    #[test]
    fn test_portrait_rotates_landscape_source() {
        let scaler = Scaler::new(
            Box::new(Recorder::default()),
            Dimensions::new(1080, 1920),
            ContentFit::Fill,
            true,
        );
        let (setup, fit) = scaler.inner_setup(Dimensions::new(1920, 1080), &StageSetup::default());
        assert!(setup.transform.unwrap().swaps_axes());
        assert_eq!(fit.source_width, 1080.0);
        assert_eq!(fit.scale_x, 1.0);
    }

    #[test]
    fn test_empty_target_keeps_source_size() {
        let scaler = Scaler::new(
            Box::new(Recorder::default()),
            Dimensions::new(0, 0),
            ContentFit::AspectFill,
            false,
        );
        let (setup, _) = scaler.inner_setup(Dimensions::new(640, 480), &StageSetup::default());
        assert_eq!(setup.output_dimensions, Some(Dimensions::new(640, 480)));
        assert!(setup.transform.unwrap().approx_eq(&Transform::identity(), 1e-6));
    }
}

use std::sync::Arc;

use canvas_core::{
    CanvasControlAdapter, CanvasError, FrameScheduler, RenderingCallback, RenderingCallbackToken,
    Result,
};
use canvas_runtime_std::StdFrameScheduler;
use canvas_ui_graphics::PixelSize;
use parking_lot::Mutex;

use crate::device::SoftwareDevice;
use crate::host::{SoftwareHost, SoftwareImageControl};
use crate::session::SoftwareImageSource;

/// Largest surface edge the rasterizer accepts, matching common GPU limits.
pub const MAX_SURFACE_DIMENSION: u32 = 16_384;

/// Adapter wiring a canvas to CPU surfaces and a [`StdFrameScheduler`].
#[derive(Debug)]
pub struct SoftwareAdapter {
    scheduler: Arc<StdFrameScheduler>,
    current_device: Mutex<Option<Arc<SoftwareDevice>>>,
}

impl SoftwareAdapter {
    pub fn new(scheduler: Arc<StdFrameScheduler>) -> Self {
        Self {
            scheduler,
            current_device: Mutex::new(None),
        }
    }

    pub fn scheduler(&self) -> &Arc<StdFrameScheduler> {
        &self.scheduler
    }

    pub fn current_device(&self) -> Option<Arc<SoftwareDevice>> {
        self.current_device.lock().clone()
    }

    /// Marks the current device as removed, as a driver reset would.
    pub fn simulate_device_loss(&self) {
        if let Some(device) = self.current_device() {
            log::debug!("simulating loss of software device {}", device.id());
            device.mark_lost();
        }
    }
}

impl CanvasControlAdapter for SoftwareAdapter {
    type UserControl = SoftwareHost;
    type Device = SoftwareDevice;
    type ImageSource = SoftwareImageSource;
    type ImageControl = SoftwareImageControl;

    fn create_user_control(&self) -> Result<SoftwareHost> {
        Ok(SoftwareHost::default())
    }

    fn create_canvas_device(&self) -> Result<Arc<SoftwareDevice>> {
        let device = Arc::new(SoftwareDevice::new());
        log::debug!("created software device {}", device.id());
        *self.current_device.lock() = Some(Arc::clone(&device));
        Ok(device)
    }

    fn add_composition_rendering_callback(
        &self,
        callback: RenderingCallback,
    ) -> Result<RenderingCallbackToken> {
        self.scheduler.register(callback)
    }

    fn remove_composition_rendering_callback(&self, token: RenderingCallbackToken) {
        self.scheduler.unregister(token);
    }

    fn request_frame(&self) {
        self.scheduler.request_frame();
    }

    fn create_canvas_image_source(
        &self,
        device: &Arc<SoftwareDevice>,
        size: PixelSize,
    ) -> Result<SoftwareImageSource> {
        device.ensure_alive()?;
        if size.width > MAX_SURFACE_DIMENSION || size.height > MAX_SURFACE_DIMENSION {
            return Err(CanvasError::SurfaceCreation {
                width: size.width,
                height: size.height,
                reason: format!("exceeds the {MAX_SURFACE_DIMENSION} pixel limit"),
            });
        }
        Ok(SoftwareImageSource::new(Arc::clone(device), size))
    }

    fn create_image_control(&self) -> Result<SoftwareImageControl> {
        Ok(SoftwareImageControl::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas_core::prelude::*;
    use pretty_assertions::assert_eq;

    fn shown_canvas(size: Size, options: CanvasControlOptions) -> CanvasControl<SoftwareAdapter> {
        let scheduler = Arc::new(StdFrameScheduler::new());
        let adapter = Arc::new(SoftwareAdapter::new(scheduler));
        let canvas = CanvasControl::with_options(adapter, options).unwrap();
        canvas.on_apply_template();
        canvas.base().notify_loaded();
        canvas.measure_override(size).unwrap();
        canvas.arrange_override(size).unwrap();
        canvas
    }

    #[test]
    fn drawn_frame_reaches_window_buffer() {
        let options = CanvasControlOptions::default().with_clear_color(Color::BLACK);
        let canvas = shown_canvas(Size::new(4.0, 2.0), options);
        canvas.add_drawing(|_, args| {
            args.drawing_session()?
                .fill_rect(Rect::new(2.0, 0.0, 2.0, 2.0), Color::WHITE);
            Ok(())
        });

        assert_eq!(canvas.adapter().scheduler().tick(0), 0);

        let frame_size = PixelSize::new(4, 2);
        let mut frame = vec![7u8; frame_size.area() * 4];
        let image = canvas.base().content().expect("image control attached");
        assert!(image.present(&mut frame, frame_size));
        assert_eq!(&frame[..4], &[0, 0, 0, 255]);
        assert_eq!(&frame[8..12], &[255, 255, 255, 255]);
    }

    #[test]
    fn oversized_surface_is_rejected() {
        let scheduler = Arc::new(StdFrameScheduler::new());
        let adapter = Arc::new(SoftwareAdapter::new(scheduler));
        let canvas = CanvasControl::new(adapter).unwrap();
        let huge = Size::new((MAX_SURFACE_DIMENSION + 1) as f32, 1.0);

        let err = canvas.measure_override(huge).unwrap_err();
        assert!(matches!(err, CanvasError::SurfaceCreation { .. }));
        assert!(!canvas.has_image_source());
    }

    #[test]
    fn unbounded_measure_takes_no_space() {
        let host = SoftwareHost::default();
        let desired = host.measure_override(Size::new(f32::INFINITY, 30.0));
        assert_eq!(desired, Size::new(0.0, 30.0));
    }

    #[test]
    fn invalidate_from_another_thread_wakes_the_host() {
        let canvas = shown_canvas(Size::new(2.0, 2.0), CanvasControlOptions::default());
        let scheduler = Arc::clone(canvas.adapter().scheduler());
        scheduler.tick(0);
        scheduler.take_frame_request();

        let remote = canvas.clone();
        std::thread::spawn(move || remote.invalidate())
            .join()
            .unwrap();

        assert!(scheduler.take_frame_request());
        assert_eq!(scheduler.tick(1), 0);
        assert_eq!(canvas.image_source().expect("surface").present_count(), 2);
    }

    #[test]
    fn size_handler_may_subscribe_while_notified() {
        let host = Arc::new(SoftwareHost::default());
        let late = Arc::new(Mutex::new(Vec::new()));
        {
            let inner = Arc::clone(&host);
            let late = Arc::clone(&late);
            host.add_size_changed(Box::new(move |_| {
                let late = Arc::clone(&late);
                inner.add_size_changed(Box::new(move |args| late.lock().push(args.new_size)));
            }));
        }

        host.notify_size_changed(Size::new(1.0, 1.0));
        assert!(late.lock().is_empty());
        host.notify_size_changed(Size::new(2.0, 2.0));
        assert_eq!(late.lock().first().copied(), Some(Size::new(2.0, 2.0)));
    }

    #[test]
    fn recovers_from_simulated_device_loss() {
        let canvas = shown_canvas(Size::new(2.0, 2.0), CanvasControlOptions::default());
        let scheduler = Arc::clone(canvas.adapter().scheduler());
        scheduler.tick(0);
        let first = canvas.adapter().current_device().expect("device").id();

        canvas.adapter().simulate_device_loss();
        canvas.invalidate();
        assert_eq!(scheduler.tick(1), 1);
        assert_eq!(scheduler.tick(2), 0);

        let second = canvas.device().expect("replacement device");
        assert_ne!(second.id(), first);
        let source = canvas.image_source().expect("surface");
        assert_eq!(source.present_count(), 1);
        assert!(Arc::ptr_eq(source.device(), &second));
    }
}

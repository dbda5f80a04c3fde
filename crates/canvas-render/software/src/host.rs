use std::sync::Arc;

use canvas_core::{
    HostEvents, ImageControl, RoutedHandler, SizeChangedEventArgs, SizeChangedHandler,
    UserControlBase,
};
use canvas_ui_graphics::{PixelSize, Size};
use parking_lot::Mutex;

use crate::session::SoftwareImageSource;

/// Element presenting a software surface inside a host window.
#[derive(Debug, Default)]
pub struct SoftwareImageControl {
    source: Mutex<Option<Arc<SoftwareImageSource>>>,
}

impl SoftwareImageControl {
    pub fn source(&self) -> Option<Arc<SoftwareImageSource>> {
        self.source.lock().clone()
    }

    /// Copies the presented surface into `frame`. Returns false when nothing
    /// is presented.
    pub fn present(&self, frame: &mut [u8], frame_size: PixelSize) -> bool {
        match self.source() {
            Some(source) => {
                source.copy_to_frame(frame, frame_size);
                true
            }
            None => false,
        }
    }
}

impl ImageControl for SoftwareImageControl {
    type Source = SoftwareImageSource;

    fn set_source(&self, source: Option<Arc<SoftwareImageSource>>) {
        *self.source.lock() = source;
    }
}

/// Minimal retained host for a canvas living in a desktop window.
///
/// The window's event loop forwards lifecycle and resize events through the
/// `notify_*` methods.
#[derive(Default)]
pub struct SoftwareHost {
    events: HostEvents,
    size: Mutex<Size>,
    content: Mutex<Option<Arc<SoftwareImageControl>>>,
}

impl SoftwareHost {
    pub fn notify_loaded(&self) {
        self.events.raise_loaded();
    }

    pub fn notify_unloaded(&self) {
        self.events.raise_unloaded();
    }

    /// Raises size-changed when `new_size` differs from the last reported size.
    pub fn notify_size_changed(&self, new_size: Size) {
        let previous_size = {
            let mut size = self.size.lock();
            if *size == new_size {
                return;
            }
            std::mem::replace(&mut *size, new_size)
        };
        self.events.raise_size_changed(&SizeChangedEventArgs {
            previous_size,
            new_size,
        });
    }

    pub fn size(&self) -> Size {
        *self.size.lock()
    }

    pub fn content(&self) -> Option<Arc<SoftwareImageControl>> {
        self.content.lock().clone()
    }
}

impl UserControlBase for SoftwareHost {
    type Content = SoftwareImageControl;

    /// Takes all of the available space, or nothing when it is unbounded.
    fn measure_override(&self, available_size: Size) -> Size {
        let take = |value: f32| if value.is_finite() { value.max(0.0) } else { 0.0 };
        Size::new(take(available_size.width), take(available_size.height))
    }

    fn arrange_override(&self, final_size: Size) -> Size {
        final_size
    }

    fn set_content(&self, content: Arc<SoftwareImageControl>) {
        *self.content.lock() = Some(content);
    }

    fn add_loaded(&self, handler: RoutedHandler) {
        self.events.add_loaded(handler);
    }

    fn add_unloaded(&self, handler: RoutedHandler) {
        self.events.add_unloaded(handler);
    }

    fn add_size_changed(&self, handler: SizeChangedHandler) {
        self.events.add_size_changed(handler);
    }
}

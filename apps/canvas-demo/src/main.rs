use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use canvas_core::prelude::*;
use canvas_render_software::{SoftwareAdapter, SoftwareCanvas};
use canvas_runtime_std::{StdClock, StdFrameScheduler};
use pixels::{Pixels, SurfaceTexture};
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::{ElementState, Event, MouseButton, VirtualKeyCode, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder};
use winit::window::WindowBuilder;

const INITIAL_WIDTH: u32 = 800;
const INITIAL_HEIGHT: u32 = 600;
const GRID_COLUMNS: usize = 8;
const GRID_ROWS: usize = 6;
const CELL_GAP: f32 = 8.0;

const PALETTE: [Color; 5] = [
    Color::CORNFLOWER_BLUE,
    Color::rgb(0.9, 0.45, 0.2),
    Color::rgb(0.3, 0.75, 0.45),
    Color::rgb(0.85, 0.8, 0.3),
    Color::rgb(0.6, 0.35, 0.8),
];

/// Grid of cells, each holding an index into [`PALETTE`].
struct Grid {
    columns: usize,
    rows: usize,
    cells: Vec<AtomicUsize>,
}

impl Grid {
    fn new(columns: usize, rows: usize) -> Self {
        Self {
            columns,
            rows,
            cells: (0..columns * rows)
                .map(|index| AtomicUsize::new(index % PALETTE.len()))
                .collect(),
        }
    }

    fn cell_rect(&self, index: usize, size: Size) -> Rect {
        let cell_width = (size.width - CELL_GAP) / self.columns as f32;
        let cell_height = (size.height - CELL_GAP) / self.rows as f32;
        let column = index % self.columns;
        let row = index / self.columns;
        Rect::new(
            CELL_GAP + column as f32 * cell_width,
            CELL_GAP + row as f32 * cell_height,
            (cell_width - CELL_GAP).max(0.0),
            (cell_height - CELL_GAP).max(0.0),
        )
    }

    fn cell_at(&self, x: f32, y: f32, size: Size) -> Option<usize> {
        (0..self.cells.len()).find(|index| self.cell_rect(*index, size).contains(x, y))
    }

    fn cycle(&self, index: usize) {
        if let Some(cell) = self.cells.get(index) {
            cell.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn color(&self, index: usize) -> Color {
        PALETTE[self.cells[index].load(Ordering::Relaxed) % PALETTE.len()]
    }
}

fn main() {
    env_logger::init();

    println!("=== Canvas-RS Desktop Example ===");
    println!("Click a cell to change its color (invalidates the canvas).");
    println!("Resize the window to recreate the drawing surface.");
    println!("Press 'L' to simulate losing the device.");
    println!();

    let event_loop = EventLoopBuilder::new().build();
    let frame_proxy = event_loop.create_proxy();
    let window = WindowBuilder::new()
        .with_title("Canvas Grid")
        .with_inner_size(LogicalSize::new(
            INITIAL_WIDTH as f64,
            INITIAL_HEIGHT as f64,
        ))
        .build(&event_loop)
        .expect("window");
    let size = window.inner_size();
    let surface_texture = SurfaceTexture::new(size.width, size.height, &window);
    let mut pixels = Pixels::new(size.width, size.height, surface_texture).expect("pixels");

    let scheduler = Arc::new(StdFrameScheduler::new());
    scheduler.set_frame_waker({
        let proxy = frame_proxy.clone();
        move || {
            let _ = proxy.send_event(());
        }
    });
    let adapter = Arc::new(SoftwareAdapter::new(Arc::clone(&scheduler)));
    let options = CanvasControlOptions::default().with_clear_color(Color(0.08, 0.08, 0.1, 1.0));
    let canvas = SoftwareCanvas::with_options(adapter, options).expect("canvas");

    let grid = Arc::new(Grid::new(GRID_COLUMNS, GRID_ROWS));
    canvas.add_creating_resources(|control, args| {
        let device = control.device()?;
        log::info!("device {} ready ({:?})", device.id(), args.reason);
        Ok(())
    });
    {
        let grid = Arc::clone(&grid);
        canvas.add_drawing(move |control, args| {
            let size = control.size();
            let mut session = args.drawing_session()?;
            for index in 0..grid.cells.len() {
                let rect = grid.cell_rect(index, size);
                session.fill_rect(rect, grid.color(index));
                session.stroke_rect(rect, 2.0, Color::WHITE.with_alpha(0.25));
            }
            Ok(())
        });
    }

    canvas.on_apply_template();
    canvas.base().notify_loaded();
    layout(&canvas, size);

    let clock = StdClock::new();
    let mut buffer_size = PixelSize::new(size.width, size.height);
    let mut cursor = (0.0f32, 0.0f32);

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Wait;
        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => {
                    canvas.base().notify_unloaded();
                    *control_flow = ControlFlow::Exit;
                }
                WindowEvent::Resized(new_size) => {
                    if let Err(err) = pixels.resize_surface(new_size.width, new_size.height) {
                        log::error!("failed to resize surface: {err}");
                        *control_flow = ControlFlow::Exit;
                        return;
                    }
                    if let Err(err) = pixels.resize_buffer(new_size.width, new_size.height) {
                        log::error!("failed to resize buffer: {err}");
                        *control_flow = ControlFlow::Exit;
                        return;
                    }
                    buffer_size = PixelSize::new(new_size.width, new_size.height);
                    layout(&canvas, new_size);
                    window.request_redraw();
                }
                WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                    let new_size = *new_inner_size;
                    if let Err(err) = pixels.resize_surface(new_size.width, new_size.height) {
                        log::error!("failed to resize surface: {err}");
                        *control_flow = ControlFlow::Exit;
                        return;
                    }
                    if let Err(err) = pixels.resize_buffer(new_size.width, new_size.height) {
                        log::error!("failed to resize buffer: {err}");
                        *control_flow = ControlFlow::Exit;
                        return;
                    }
                    buffer_size = PixelSize::new(new_size.width, new_size.height);
                    layout(&canvas, new_size);
                    window.request_redraw();
                }
                WindowEvent::CursorMoved { position, .. } => {
                    cursor = (position.x as f32, position.y as f32);
                }
                WindowEvent::MouseInput {
                    state: ElementState::Pressed,
                    button: MouseButton::Left,
                    ..
                } => {
                    if let Some(index) = grid.cell_at(cursor.0, cursor.1, canvas.size()) {
                        grid.cycle(index);
                        canvas.invalidate();
                    }
                }
                WindowEvent::KeyboardInput { input, .. } => {
                    if input.state == ElementState::Pressed
                        && input.virtual_keycode == Some(VirtualKeyCode::L)
                    {
                        canvas.adapter().simulate_device_loss();
                        canvas.invalidate();
                    }
                }
                _ => {}
            },
            Event::MainEventsCleared | Event::RedrawEventsCleared | Event::UserEvent(()) => {
                if canvas.is_draw_needed() {
                    window.request_redraw();
                    *control_flow = ControlFlow::Poll;
                }
            }
            Event::RedrawRequested(_) => {
                let failures = scheduler.tick(clock.now_nanos());
                if failures > 0 {
                    log::warn!("{failures} rendering callback(s) failed this frame");
                }

                let frame = pixels.frame_mut();
                if !canvas.image_control().present(frame, buffer_size) {
                    frame.fill(0);
                }
                if let Err(err) = pixels.render() {
                    log::error!("pixels render failed: {err}");
                    *control_flow = ControlFlow::Exit;
                }
            }
            _ => {}
        }
    });
}

/// Lays the canvas out to fill the window and reports the new size to its host.
fn layout(canvas: &SoftwareCanvas, window_size: PhysicalSize<u32>) {
    let size = Size::new(window_size.width as f32, window_size.height as f32);
    let laid_out = canvas
        .measure_override(size)
        .and_then(|_| canvas.arrange_override(size));
    if let Err(err) = laid_out {
        log::error!("canvas layout failed: {err}");
    }
    canvas.base().notify_size_changed(size);
}

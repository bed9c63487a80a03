// ============================================================================
// CRATE CONFIGURATION & IMPORTS
// ============================================================================

pub mod command;
pub mod config;
pub mod interaction;
pub mod pose;
pub mod render;
pub mod transform;

// External crate imports
use bon::Builder;
use glam::DVec2;
use pixels::{Pixels, SurfaceTexture};

// Standard library imports
use std::io::BufRead;
use std::sync::Arc;
use std::time::{Duration, Instant};

// Window management imports
use winit::dpi::LogicalSize;
use winit::event::{ElementState, Event, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::WindowBuilder;

pub use command::{Command, CommandError, CommandReader, StopSignal};
pub use config::{Color, ConfigError, FileConfig, HudStyle, MarkerStyle};
pub use interaction::{Gesture, InteractionController, PointerEvent};
pub use pose::{normalize_heading, Pose, PoseReport, PoseStore};
pub use render::{Background, Canvas, Hud, Sprite};
pub use transform::{FieldTransform, FIELD_WIDTH_INCHES};

// ============================================================================
// ERRORS
// ============================================================================

#[derive(thiserror::Error, Debug)]
pub enum ViewerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to load field image: {0}")]
    Image(#[from] image::ImageError),
    #[error("failed to read font: {0}")]
    FontIo(#[source] std::io::Error),
    #[error("font data could not be parsed")]
    Font,
    #[error(transparent)]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error(transparent)]
    Window(#[from] winit::error::OsError),
    #[error(transparent)]
    Pixels(#[from] pixels::Error),
    #[error("failed to start command reader: {0}")]
    Reader(#[source] std::io::Error),
}

// ============================================================================
// PUBLIC API - VIEWER CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Builder)]
pub struct ViewerConfig {
    #[builder(default = "Robot Field".to_string())]
    pub title: String,
    #[builder(default = config::DEFAULT_WINDOW_SIZE)]
    pub window_size: u32,
    #[builder(default = FIELD_WIDTH_INCHES)]
    pub field_width_inches: f64,
    #[builder(default = config::DEFAULT_MAX_FRAMERATE)]
    pub max_framerate: f64,

    // Marker size in inches
    #[builder(default = 18.0)]
    pub robot_width: f64,
    #[builder(default = 18.0)]
    pub robot_height: f64,

    #[builder(default)]
    pub marker_style: MarkerStyle,
    #[builder(default)]
    pub hud_style: HudStyle,

    /// Key that prints the current pose.
    #[builder(default = NamedKey::Space)]
    pub report_key: NamedKey,

    /// How long shutdown waits for a command reader blocked on input.
    #[builder(default = Duration::from_millis(100))]
    pub reader_shutdown_timeout: Duration,
}

impl ViewerConfig {
    pub fn from_file_config(file: &FileConfig) -> Self {
        Self::builder()
            .window_size(file.window_size)
            .max_framerate(file.max_framerate)
            .robot_width(file.robot_width)
            .robot_height(file.robot_height)
            .build()
    }

    pub fn transform(&self) -> FieldTransform {
        FieldTransform::new(self.window_size as f64, self.field_width_inches)
    }
}

// ============================================================================
// PUBLIC API - VIEWER
// ============================================================================

/// The field window: background, one marker, and the shared pose.
pub struct FieldViewer {
    config: ViewerConfig,
    transform: FieldTransform,
    store: Arc<PoseStore>,
    background: Background,
    marker: Sprite,
    hud: Option<Hud>,
}

impl FieldViewer {
    pub fn new(config: ViewerConfig, background: Background) -> Self {
        let transform = config.transform();
        let marker = Sprite::marker(
            transform.length_to_pixels(config.robot_width).round() as usize,
            transform.length_to_pixels(config.robot_height).round() as usize,
            &config.marker_style,
        );
        let store = Arc::new(PoseStore::centered(&transform));
        Self {
            config,
            transform,
            store,
            background,
            marker,
            hud: None,
        }
    }

    /// Builds a viewer from a loaded `config.json`, reading the field image
    /// and optional font it names.
    pub fn from_file_config(file: &FileConfig) -> Result<Self, ViewerError> {
        let config = ViewerConfig::from_file_config(file);
        let background = Background::load(&file.field_image_path, config.window_size)?;
        let mut viewer = Self::new(config, background);
        if let Some(font_path) = &file.font_path {
            let data = std::fs::read(font_path).map_err(ViewerError::FontIo)?;
            viewer = viewer.with_hud_font(data)?;
        }
        Ok(viewer)
    }

    pub fn with_hud_font(mut self, data: Vec<u8>) -> Result<Self, ViewerError> {
        let hud = Hud::from_bytes(data, self.config.hud_style.clone()).ok_or(ViewerError::Font)?;
        self.hud = Some(hud);
        Ok(self)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.config.title = title.into();
        self
    }

    pub fn store(&self) -> Arc<PoseStore> {
        Arc::clone(&self.store)
    }

    pub fn transform(&self) -> FieldTransform {
        self.transform
    }

    /// Current pose in field inches, heading wrapped into [0, 360).
    pub fn report(&self) -> PoseReport {
        self.store.read().report(&self.transform)
    }

    /// Opens the window and runs until it is closed, applying commands read
    /// from `input` on a background thread.
    pub fn run_with_input<R>(&self, input: R) -> Result<(), ViewerError>
    where
        R: BufRead + Send + 'static,
    {
        let stop = StopSignal::new();
        let reader = CommandReader::spawn(input, self.store(), self.transform, stop)
            .map_err(ViewerError::Reader)?;
        log::info!("reading pose commands: \"x y theta\" or \"x|y|theta value\"");

        let result = self.run_window();

        if reader.shutdown(self.config.reader_shutdown_timeout).is_none() {
            log::debug!("exiting without waiting for command input");
        }
        result
    }

    fn run_window(&self) -> Result<(), ViewerError> {
        let size = self.config.window_size;

        let event_loop = EventLoop::new()?;
        let window = WindowBuilder::new()
            .with_title(&self.config.title)
            .with_inner_size(LogicalSize::new(size as f64, size as f64))
            .with_resizable(false)
            .build(&event_loop)?;

        let window = Arc::new(window);
        let window_clone = window.clone();
        let physical = window.inner_size();
        let surface_texture = SurfaceTexture::new(physical.width, physical.height, &window);
        let mut pixels = Pixels::new(size, size, surface_texture)?;

        let mut controller = InteractionController::new();
        let mut last_report: Option<PoseReport> = None;

        let frame_duration = Duration::from_secs_f64(1.0 / self.config.max_framerate);
        let mut last_frame = Instant::now();

        event_loop.run(move |event, window_target| {
            window_target.set_control_flow(ControlFlow::Poll);
            match event {
                Event::WindowEvent { event, .. } => match event {
                    WindowEvent::CloseRequested => {
                        window_target.exit();
                    }
                    WindowEvent::Resized(new_size) => {
                        if let Err(err) = pixels.resize_surface(new_size.width, new_size.height) {
                            log::warn!("surface resize to {new_size:?} failed: {err}");
                        }
                    }
                    WindowEvent::ModifiersChanged(modifiers) => {
                        let shift = modifiers.state().shift_key();
                        controller.handle(PointerEvent::Modifier(shift), &self.store);
                    }
                    WindowEvent::MouseInput {
                        state,
                        button: MouseButton::Left,
                        ..
                    } => {
                        let event = match state {
                            ElementState::Pressed => PointerEvent::LeftPressed,
                            ElementState::Released => PointerEvent::LeftReleased,
                        };
                        controller.handle(event, &self.store);
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        let logical = position.to_logical::<f64>(window_clone.scale_factor());
                        let cursor = DVec2::new(logical.x, logical.y);
                        controller.handle(PointerEvent::Moved(cursor), &self.store);
                    }
                    WindowEvent::KeyboardInput { event, .. } => {
                        if event.state == ElementState::Pressed
                            && !event.repeat
                            && event.logical_key == Key::Named(self.config.report_key)
                        {
                            let report = self.report();
                            println!("{report}");
                            last_report = Some(report);
                        }
                    }
                    WindowEvent::RedrawRequested => {
                        let pose = self.store.read();
                        let mut canvas = Canvas::new(pixels.frame_mut(), size as usize, size as usize);
                        self.render_frame(&mut canvas, pose, last_report);
                        if let Err(err) = pixels.render() {
                            log::error!("render failed: {err}");
                            window_target.exit();
                        }
                    }
                    _ => {}
                },
                Event::AboutToWait => {
                    if last_frame.elapsed() >= frame_duration {
                        window_clone.request_redraw();
                        last_frame = Instant::now();
                    } else {
                        std::thread::sleep(frame_duration - last_frame.elapsed().min(frame_duration));
                    }
                }
                _ => {}
            }
        })?;

        Ok(())
    }

    /// Draws one frame for `pose`: background, rotated marker, then the
    /// optional HUD.
    pub fn render_frame(&self, canvas: &mut Canvas, pose: Pose, last_report: Option<PoseReport>) {
        self.background.draw(canvas);
        render::blit_rotated(canvas, &self.marker, pose.position, pose.heading);

        if let Some(hud) = &self.hud {
            let mut lines = vec![format!("pose {}", pose.report(&self.transform))];
            if let Some(report) = last_report {
                lines.push(format!("last {report}"));
            }
            hud.draw(canvas, &lines);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewer() -> FieldViewer {
        let config = ViewerConfig::builder().window_size(200).build();
        let background = Background::solid(200, Color::new(0x10, 0x10, 0x10));
        FieldViewer::new(config, background)
    }

    #[test]
    fn builder_defaults_match_field() {
        let config = ViewerConfig::builder().build();
        assert_eq!(config.window_size, 700);
        assert_eq!(config.title, "Robot Field");
        assert_eq!(config.max_framerate, 60.0);
        assert_eq!(config.report_key, NamedKey::Space);
        assert_eq!(config.field_width_inches, FIELD_WIDTH_INCHES);
    }

    #[test]
    fn starts_centred_facing_up() {
        let viewer = viewer();
        assert_eq!(viewer.store().read(), Pose::new(DVec2::splat(100.0), 0.0));
        assert_eq!(viewer.report().to_string(), "0.00 0.00 0.00");
    }

    #[test]
    fn marker_is_scaled_from_inches() {
        let viewer = viewer();
        let expected = (18.0 * viewer.transform().scale()).round() as usize;
        assert_eq!(viewer.marker.width(), expected);
        assert_eq!(viewer.marker.height(), expected);
    }

    #[test]
    fn render_frame_draws_marker_over_background() {
        let viewer = viewer();
        let mut buf = vec![0u8; 200 * 200 * 4];
        let mut canvas = Canvas::new(&mut buf, 200, 200);
        viewer.render_frame(&mut canvas, viewer.store().read(), None);
        assert_eq!(canvas.pixel(0, 0), [0x10, 0x10, 0x10, 0xff]);
        // arrow starts at the marker centre
        assert_eq!(canvas.pixel(99, 98), [0xff, 0x00, 0x00, 0xff]);
    }

    #[test]
    fn file_config_carries_robot_size() {
        let file = FileConfig::from_json(
            r#"{"FIELD_IMAGE_PATH": "f.png", "ROBOT_WIDTH": 15, "ROBOT_HEIGHT": 12, "WINDOW_SIZE": 600}"#,
        )
        .unwrap();
        let config = ViewerConfig::from_file_config(&file);
        assert_eq!(config.robot_width, 15.0);
        assert_eq!(config.robot_height, 12.0);
        assert_eq!(config.window_size, 600);
    }
}

use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy};
use winit::keyboard::PhysicalKey;
use winit::window::{Window, WindowId};

use crate::assets::{AssetSource, FileSource};
use crate::config::{EngineConfig, FontEntry};
use crate::context::EngineContext;
use crate::error::{EngineError, Result};
use crate::events::{EditorEvent, OutboundEvent};
use crate::graphics::Color;
use crate::level::LevelManager;
use crate::math::Vector2;
use crate::message::{MOUSE_DOWN, MOUSE_UP, Mailbox, Subscriber, asset_failed_code, asset_loaded_code};
use crate::renderer::{Gpu, Renderer, WgpuDevice, shared};

/// One engine instance: its managers, its levels and its renderer.
pub struct Engine {
    ctx: EngineContext,
    levels: LevelManager,
    renderer: Renderer,
    /// `MOUSE_DOWN` / `MOUSE_UP`, turned into selection events.
    pointer_events: Rc<Mailbox>,
    /// Completed material manifest fetches.
    manifests: Rc<Mailbox>,
    outbound: VecDeque<OutboundEvent>,
    start_level: Option<String>,
    frames: u64,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    fn new(gpu: Gpu, source: Arc<dyn AssetSource>, config: &EngineConfig) -> Result<Self> {
        let viewport = Vector2::new(config.width as f32, config.height as f32);
        let mut ctx = EngineContext::new(gpu, source, config.messages_per_update, viewport)?;
        let mut levels = LevelManager::new(ctx.bus.clone());

        let pointer_events = Mailbox::new();
        ctx.bus.subscribe(MOUSE_DOWN, Subscriber::handler(&pointer_events));
        ctx.bus.subscribe(MOUSE_UP, Subscriber::handler(&pointer_events));

        let manifests = Mailbox::new();
        if let Some(file) = &config.materials_manifest {
            ctx.bus.subscribe(asset_loaded_code(file), Subscriber::handler(&manifests));
            ctx.bus.subscribe(asset_failed_code(file), Subscriber::handler(&manifests));
            ctx.assets.load_asset(file);
        }

        for FontEntry { name, file } in &config.fonts {
            ctx.fonts.add_font(name, file);
        }
        ctx.fonts.load(&ctx.assets, &ctx.bus)?;

        levels.request_manifest(&config.pages_manifest, &mut ctx)?;

        let renderer = Renderer::new(config.width, config.height, config.near, config.far, config.clear_color);
        info!(width = config.width, height = config.height, "engine started");
        Ok(Self {
            ctx,
            levels,
            renderer,
            pointer_events,
            manifests,
            outbound: VecDeque::new(),
            start_level: config.start_level.clone(),
            frames: 0,
        })
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut EngineContext {
        &mut self.ctx
    }

    pub fn levels(&self) -> &LevelManager {
        &self.levels
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Switches the active level; see [`LevelManager::change_level`].
    pub fn change_level(&mut self, name: &str) -> Result<()> {
        self.start_level = None;
        self.levels.change_level(name, &mut self.ctx)
    }

    /// Runs one frame. `delta_time` is in seconds.
    pub fn frame(&mut self, delta_time: f32) -> Result<()> {
        self.frames += 1;
        self.ctx.assets.update();
        self.ctx.bus.update(delta_time);

        self.apply_material_manifests()?;
        self.levels.update(&mut self.ctx)?;
        if self.levels.is_manifest_loaded()
            && let Some(name) = self.start_level.take()
        {
            self.levels.change_level(&name, &mut self.ctx)?;
        }

        self.levels.update_level(delta_time, &mut self.ctx);
        if let Some(level) = self.levels.active_level_mut() {
            let pointer = self.ctx.input.pointer();
            self.ctx.collisions.update(delta_time, level.scene_mut(), pointer);
        }
        self.select_hovered();
        self.ctx.input.clear_frame_state();

        self.renderer.render(delta_time, self.levels.active_level(), &self.ctx)?;
        Ok(())
    }

    fn apply_material_manifests(&mut self) -> Result<()> {
        for message in self.manifests.drain() {
            let handler = Subscriber::handler(&self.manifests);
            let Some(asset) = message.asset() else {
                error!(code = %message.code, "material manifest failed to load");
                continue;
            };
            self.ctx.bus.unsubscribe(&asset_loaded_code(asset.name()), &handler);
            self.ctx.bus.unsubscribe(&asset_failed_code(asset.name()), &handler);
            let Some(json) = asset.as_json() else {
                return Err(EngineError::InvalidManifest {
                    name: asset.name().to_owned(),
                    reason: "not a JSON document".into(),
                });
            };
            let count = self.ctx.materials.load_manifest(json)?;
            debug!(manifest = %asset.name(), count, "materials registered");
        }
        Ok(())
    }

    fn select_hovered(&mut self) {
        if self.pointer_events.drain().is_empty() {
            return;
        }
        let Some(level) = self.levels.active_level() else { return };
        for id in self.ctx.collisions.hovered_entities() {
            if let Some(event) = OutboundEvent::select_object(level.scene(), id) {
                self.outbound.push_back(event);
            }
        }
    }

    pub fn handle_event(&mut self, event: &EditorEvent) -> bool {
        event.apply(&mut self.ctx)
    }

    /// Parses and applies one `{event, detail}` JSON line.
    pub fn handle_event_line(&mut self, line: &str) -> Result<bool> {
        let event = EditorEvent::parse(line)?;
        Ok(self.handle_event(&event))
    }

    pub fn drain_outbound(&mut self) -> Vec<OutboundEvent> {
        self.outbound.drain(..).collect()
    }

    pub fn on_resize(&mut self, width: u32, height: u32) {
        self.renderer.on_resize(width, height, &self.ctx.gpu);
        self.ctx.viewport_size = Vector2::new(width as f32, height as f32);
    }

    /// Unloads the active level and drops every engine-level subscription.
    pub fn shutdown(&mut self) {
        self.levels.unload(&mut self.ctx);
        self.ctx.fonts.dispose(&self.ctx.bus);
        self.ctx.bus.unsubscribe(MOUSE_DOWN, &Subscriber::handler(&self.pointer_events));
        self.ctx.bus.unsubscribe(MOUSE_UP, &Subscriber::handler(&self.pointer_events));
    }
}

// ── EngineBuilder ───────────────────────────────────────────────────────────

#[derive(Default)]
pub struct EngineBuilder {
    config: EngineConfig,
}

impl EngineBuilder {
    pub fn from_config(config: EngineConfig) -> Self { Self { config } }
    pub fn with_title(mut self, title: &str) -> Self { self.config.title = title.into(); self }
    pub fn with_size(mut self, width: u32, height: u32) -> Self { self.config.width = width; self.config.height = height; self }
    pub fn with_asset_root(mut self, root: impl Into<PathBuf>) -> Self { self.config.asset_root = root.into(); self }
    pub fn with_pages_manifest(mut self, file: &str) -> Self { self.config.pages_manifest = file.into(); self }
    pub fn with_materials_manifest(mut self, file: &str) -> Self { self.config.materials_manifest = Some(file.into()); self }
    pub fn with_start_level(mut self, name: &str) -> Self { self.config.start_level = Some(name.into()); self }
    pub fn with_messages_per_update(mut self, cap: usize) -> Self { self.config.messages_per_update = cap; self }
    pub fn with_clear_color(mut self, color: Color) -> Self { self.config.clear_color = color; self }

    pub fn with_font(mut self, name: &str, file: &str) -> Self {
        self.config.fonts.push(FontEntry { name: name.into(), file: file.into() });
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Builds an engine on an existing device and asset source, without a
    /// window. Used by tests and offline tools.
    pub fn build_headless(self, gpu: Gpu, source: Arc<dyn AssetSource>) -> Result<Engine> {
        Engine::new(gpu, source, &self.config)
    }

    /// Opens the window and runs until it is closed. Editor events are read
    /// from stdin and outbound events written to stdout, one JSON object per
    /// line.
    pub fn run(self) -> Result<()> {
        let event_loop = EventLoop::<HostEvent>::with_user_event().build()?;
        spawn_stdin_reader(event_loop.create_proxy());
        let mut app = App { config: self.config, window: None, engine: None, last_instant: None, result: Ok(()) };
        event_loop.run_app(&mut app)?;
        app.result
    }
}

// ── App (winit ApplicationHandler) ──────────────────────────────────────────

enum HostEvent {
    EditorLine(String),
}

fn spawn_stdin_reader(proxy: EventLoopProxy<HostEvent>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            if proxy.send_event(HostEvent::EditorLine(line)).is_err() {
                break;
            }
        }
    });
}

struct App {
    config: EngineConfig,
    window: Option<Arc<Window>>,
    engine: Option<Engine>,
    last_instant: Option<Instant>,
    result: Result<()>,
}

impl App {
    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attributes = Window::default_attributes()
            .with_title(&self.config.title)
            .with_inner_size(winit::dpi::PhysicalSize::new(self.config.width, self.config.height));
        let window = Arc::new(event_loop.create_window(attributes)?);
        let device = pollster::block_on(WgpuDevice::new(Arc::clone(&window)))?;
        let (_, gpu) = shared(device);
        let source = Arc::new(FileSource::new(self.config.asset_root.clone()));
        self.engine = Some(Engine::new(gpu, source, &self.config)?);
        self.window = Some(window);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: EngineError) {
        error!("{err}");
        self.result = Err(err);
        event_loop.exit();
    }

    fn write_outbound(engine: &mut Engine) {
        let mut stdout = std::io::stdout().lock();
        for event in engine.drain_outbound() {
            match event.to_json_line() {
                Ok(line) => {
                    if let Err(err) = writeln!(stdout, "{line}") {
                        warn!("failed to write outbound event: {err}");
                    }
                }
                Err(err) => warn!("failed to encode outbound event: {err}"),
            }
        }
        let _ = stdout.flush();
    }
}

impl ApplicationHandler<HostEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.engine.is_some() {
            return;
        }
        if let Err(err) = self.start(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: HostEvent) {
        let Some(engine) = self.engine.as_mut() else { return };
        match event {
            HostEvent::EditorLine(line) => {
                if let Err(err) = engine.handle_event_line(&line) {
                    warn!(%line, "ignoring editor event: {err}");
                }
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(engine) = self.engine.as_mut() else { return };

        match event {
            WindowEvent::CloseRequested => {
                engine.shutdown();
                event_loop.exit();
            }

            WindowEvent::Resized(size) => engine.on_resize(size.width.max(1), size.height.max(1)),

            WindowEvent::CursorMoved { position, .. } => {
                engine.context_mut().input.mouse_moved(position.x as f32, position.y as f32);
            }

            WindowEvent::CursorLeft { .. } => engine.context_mut().input.mouse_left_window(),

            WindowEvent::MouseInput { button, state, .. } => {
                engine.context_mut().input.mouse_button(button, state == ElementState::Pressed);
            }

            WindowEvent::KeyboardInput {
                event: KeyEvent { physical_key: PhysicalKey::Code(code), state, .. },
                ..
            } => {
                let input = &mut engine.context_mut().input;
                match state {
                    ElementState::Pressed => input.key_down(code),
                    ElementState::Released => input.key_up(code),
                }
            }

            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let elapsed = match self.last_instant {
                    Some(prev) => now.duration_since(prev).as_secs_f32().min(0.25),
                    None => 0.0,
                };
                self.last_instant = Some(now);

                let result = engine.frame(elapsed);
                Self::write_outbound(engine);
                if let Err(err) = result {
                    self.fail(event_loop, err);
                }
            }

            _ => {}
        }
    }
}

//! Corridor Runner entry point
//!
//! Handles platform-specific initialization and runs the game loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{Document, HtmlCanvasElement, HtmlElement, HtmlInputElement, KeyboardEvent};

    use corridor_runner::platform::{self, map_key};
    use corridor_runner::renderer::{Renderer, SdfRenderState};
    use corridor_runner::sim::{GameEvent, GamePhase, GameSession, InputEvent, LevelCatalog};
    use corridor_runner::ui::{FpsCounter, MENU_IDS, UiState};
    use corridor_runner::{GameError, QualityPreset, Result, Settings, Tuning};

    /// Game instance holding all state
    struct Game {
        session: GameSession,
        renderer: SdfRenderState,
        fps: FpsCounter,
        /// Pending requestAnimationFrame id
        frame_request: Option<i32>,
    }

    type Shared = Rc<RefCell<Game>>;

    fn window() -> Result<web_sys::Window> {
        web_sys::window().ok_or_else(|| GameError::Init("no window".into()))
    }

    fn document() -> Result<Document> {
        window()?
            .document()
            .ok_or_else(|| GameError::Init("no document".into()))
    }

    fn now() -> f64 {
        web_sys::window()
            .and_then(|w| w.performance())
            .map(|p| p.now())
            .unwrap_or_default()
    }

    pub async fn run() -> Result<()> {
        console_error_panic_hook::set_once();
        let _ = console_log::init_with_level(log::Level::Info);

        log::info!("Corridor Runner starting...");

        let window = window()?;
        let document = document()?;

        let canvas: HtmlCanvasElement = document
            .get_element_by_id("canvas")
            .ok_or_else(|| GameError::Init("no canvas".into()))?
            .dyn_into()
            .map_err(|_| GameError::Init("#canvas is not a canvas".into()))?;

        let dpr = window.device_pixel_ratio();
        let width = (canvas.client_width() as f64 * dpr) as u32;
        let height = (canvas.client_height() as f64 * dpr) as u32;
        canvas.set_width(width);
        canvas.set_height(height);

        // GL backend: the collision readback has to complete inside a substep
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::GL,
            ..Default::default()
        });
        let surface = instance
            .create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))
            .map_err(|e| GameError::Init(format!("failed to create surface: {}", e)))?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| GameError::Init(format!("no adapter: {}", e)))?;
        log::info!("Using adapter: {:?}", adapter.get_info().name);

        let shaders = platform::web::load_shaders().await?;
        let settings = Settings::default();
        let renderer =
            SdfRenderState::new(surface, &adapter, width, height, &shaders, settings.quality).await?;

        let seed = js_sys::Date::now() as u64;
        let session = GameSession::new(LevelCatalog::builtin(), settings, Tuning::default(), seed);
        log::info!("Session created with seed: {}", seed);

        let game = Rc::new(RefCell::new(Game {
            session,
            renderer,
            fps: FpsCounter::default(),
            frame_request: None,
        }));

        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        build_level_menu(&document, &game)?;
        setup_keyboard(&game)?;
        setup_buttons(&document, &game);
        setup_auto_pause(&document, &game);
        setup_context_events(&canvas, &game);
        setup_resize(&canvas, &game)?;

        apply_ui(&game.borrow());
        log::info!("Corridor Runner ready");
        Ok(())
    }

    /// Register a click handler on an element, if it exists
    fn on_click(document: &Document, id: &str, handler: impl FnMut() + 'static) {
        let Some(el) = document.get_element_by_id(id) else {
            log::warn!("Missing #{}", id);
            return;
        };
        let mut handler = handler;
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| handler());
        let _ = el.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn build_level_menu(document: &Document, game: &Shared) -> Result<()> {
        let list = document
            .get_element_by_id("level-list")
            .ok_or_else(|| GameError::Init("no #level-list".into()))?;
        let labels = game.borrow().session.catalog().labels();

        // One handler per level id, each owning its id
        for (id, label) in labels.into_iter().enumerate() {
            let button = document
                .create_element("button")
                .map_err(|_| GameError::Init("cannot create button".into()))?;
            button.set_text_content(Some(&label));

            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
                start_level(&game, id);
            });
            let _ = button.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
            let _ = list.append_child(&button);
        }
        Ok(())
    }

    fn start_level(game: &Shared, id: usize) {
        let result = game.borrow_mut().session.select_level(id, now());
        match result {
            Ok(()) => schedule_frame(game),
            Err(e) => log::error!("Cannot start level {}: {}", id, e),
        }
        apply_ui(&game.borrow());
    }

    fn setup_buttons(document: &Document, game: &Shared) {
        {
            let game = game.clone();
            on_click(document, "pause-btn", move || {
                game.borrow_mut().session.pause(now());
                cancel_frame(&game);
                apply_ui(&game.borrow());
            });
        }
        {
            let game = game.clone();
            on_click(document, "resume-btn", move || {
                let resumed = {
                    let mut g = game.borrow_mut();
                    let ready = g.renderer.is_ready();
                    g.session.resume(now(), ready)
                };
                if resumed {
                    schedule_frame(&game);
                }
                apply_ui(&game.borrow());
            });
        }
        for id in ["quit-btn", "levels-btn"] {
            let game = game.clone();
            on_click(document, id, move || {
                cancel_frame(&game);
                game.borrow_mut().session.return_to_menu();
                apply_ui(&game.borrow());
            });
        }
        {
            let game = game.clone();
            on_click(document, "replay-btn", move || {
                cancel_frame(&game);
                let result = game.borrow_mut().session.replay(now());
                match result {
                    Ok(()) => schedule_frame(&game),
                    Err(e) => log::error!("Cannot replay: {}", e),
                }
                apply_ui(&game.borrow());
            });
        }

        // Options: physics substeps
        if let Some(input) = document
            .get_element_by_id("substeps-input")
            .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
        {
            let game = game.clone();
            let input_clone = input.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                match input_clone.value().parse::<u32>() {
                    Ok(n) => game.borrow_mut().session.settings_mut().set_physics_substeps(n),
                    Err(_) => log::warn!("Ignoring substeps value '{}'", input_clone.value()),
                }
            });
            let _ = input.add_event_listener_with_callback("change", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Options: ray-march quality ("low", "medium", "high")
        if let Some(input) = document
            .get_element_by_id("quality-input")
            .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
        {
            let game = game.clone();
            let input_clone = input.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                let Some(quality) = QualityPreset::parse(&input_clone.value()) else {
                    log::warn!("Unknown quality '{}'", input_clone.value());
                    return;
                };
                let mut g = game.borrow_mut();
                g.session.settings_mut().quality = quality;
                g.renderer.set_quality(quality);
                log::info!("Quality set to {}", quality.as_str());
            });
            let _ = input.add_event_listener_with_callback("change", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_keyboard(game: &Shared) -> Result<()> {
        let window = window()?;
        for (event_name, pressed) in [("keydown", true), ("keyup", false)] {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let key = event.key();
                if platform::is_game_key(&key) {
                    event.prevent_default();
                }
                if pressed && event.repeat() {
                    return;
                }
                if let Some(input) = map_key(&key, pressed) {
                    send_input(&game, input);
                }
            });
            let _ = window.add_event_listener_with_callback(event_name, closure.as_ref().unchecked_ref());
            closure.forget();
        }
        Ok(())
    }

    fn send_input(game: &Shared, input: InputEvent) {
        let paused = {
            let mut g = game.borrow_mut();
            let before = g.session.phase();
            g.session.handle_input(input, now());
            before != GamePhase::Paused && g.session.phase() == GamePhase::Paused
        };
        if paused {
            cancel_frame(game);
            apply_ui(&game.borrow());
        }
    }

    fn setup_auto_pause(document: &Document, game: &Shared) {
        let game = game.clone();
        let document_clone = document.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            if document_clone.visibility_state() == web_sys::VisibilityState::Hidden {
                log::info!("Auto-pausing (tab hidden)");
                send_input(&game, InputEvent::VisibilityLost);
            }
        });
        let _ = document
            .add_event_listener_with_callback("visibilitychange", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_context_events(canvas: &HtmlCanvasElement, game: &Shared) {
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::Event| {
                // Allows the browser to restore the context later
                event.prevent_default();
                log::warn!("WebGL context lost");
                {
                    let mut g = game.borrow_mut();
                    g.renderer.set_ready(false);
                    g.session.pause(now());
                }
                cancel_frame(&game);
                apply_ui(&game.borrow());
            });
            let _ = canvas
                .add_event_listener_with_callback("webglcontextlost", closure.as_ref().unchecked_ref());
            closure.forget();
        }
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                log::info!("WebGL context restored");
                game.borrow_mut().renderer.set_ready(true);
            });
            let _ = canvas.add_event_listener_with_callback(
                "webglcontextrestored",
                closure.as_ref().unchecked_ref(),
            );
            closure.forget();
        }
    }

    fn setup_resize(canvas: &HtmlCanvasElement, game: &Shared) -> Result<()> {
        let window = window()?;
        let game = game.clone();
        let canvas = canvas.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            let dpr = web_sys::window().map(|w| w.device_pixel_ratio()).unwrap_or(1.0);
            let width = (canvas.client_width() as f64 * dpr) as u32;
            let height = (canvas.client_height() as f64 * dpr) as u32;
            canvas.set_width(width);
            canvas.set_height(height);
            game.borrow_mut().renderer.resize(width, height);
        });
        let _ = window.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref());
        closure.forget();
        Ok(())
    }

    fn schedule_frame(game: &Shared) {
        if game.borrow().frame_request.is_some() {
            return;
        }
        let Ok(window) = window() else {
            return;
        };
        let game_clone = game.clone();
        // Freed by wasm-bindgen once the browser has called it
        let callback = Closure::once_into_js(move |time: f64| {
            game_loop(game_clone, time);
        });
        match window.request_animation_frame(callback.unchecked_ref()) {
            Ok(id) => game.borrow_mut().frame_request = Some(id),
            Err(e) => log::error!("requestAnimationFrame failed: {:?}", e),
        }
    }

    fn cancel_frame(game: &Shared) {
        if let Some(id) = game.borrow_mut().frame_request.take()
            && let Ok(window) = window()
        {
            let _ = window.cancel_animation_frame(id);
        }
    }

    fn game_loop(game: Shared, time: f64) {
        let keep_running = {
            let mut g = game.borrow_mut();
            g.frame_request = None;
            g.fps.record(time);

            let Game {
                session, renderer, ..
            } = &mut *g;
            let keep_running = session.frame(time, renderer);

            for event in session.drain_events() {
                match event {
                    GameEvent::PhaseChanged { from, to } => log::debug!("{:?} -> {:?}", from, to),
                    GameEvent::ProjectileFired => log::debug!("Projectile fired"),
                    GameEvent::ShakeStarted => log::debug!("Shake started"),
                }
            }
            keep_running
        };

        apply_ui(&game.borrow());
        if keep_running {
            schedule_frame(&game);
        }
    }

    fn set_hidden(document: &Document, id: &str, hidden: bool) {
        if let Some(el) = document.get_element_by_id(id) {
            let _ = el.set_attribute("class", if hidden { "hidden" } else { "" });
        }
    }

    fn style_of(document: &Document, id: &str) -> Option<web_sys::CssStyleDeclaration> {
        document
            .get_element_by_id(id)
            .and_then(|el| el.dyn_into::<HtmlElement>().ok())
            .map(|el| el.style())
    }

    /// Sync DOM overlays with the session
    fn apply_ui(game: &Game) {
        let Ok(document) = document() else {
            return;
        };
        let ui = UiState::from_session(&game.session, game.fps.fps());

        let shown = ui.menu.element_id();
        for id in MENU_IDS {
            set_hidden(&document, id, shown != Some(id));
        }
        if let (Some(title), Some(el)) = (ui.menu.title(), document.get_element_by_id("end-title")) {
            el.set_text_content(Some(title));
        }

        let running = matches!(game.session.phase(), GamePhase::Countdown | GamePhase::Playing);
        set_hidden(&document, "pause-btn", !running);

        if let Some(el) = document.get_element_by_id("countdown") {
            el.set_text_content(ui.countdown_text.as_deref());
        }
        set_hidden(&document, "countdown", ui.countdown_text.is_none());
        if let Some(style) = style_of(&document, "countdown") {
            let _ = style.set_property("opacity", &ui.countdown_opacity.to_string());
        }

        if let Some(el) = document.get_element_by_id("fps") {
            el.set_text_content(ui.fps_text.as_deref());
        }

        if let Some(style) = style_of(&document, "game-container") {
            let _ = style.set_property("transform", &ui.view_transform);
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    if let Err(e) = wasm_game::run().await {
        log::error!("Startup failed: {}", e);
        if let Some(el) = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id("loading"))
        {
            el.set_text_content(Some(&format!("Failed to start: {}", e)));
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Corridor Runner (native) starting...");
    log::info!("Native mode runs the built-in levels headless - run with `trunk serve` for the web version");

    run_headless_levels();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Drive every built-in level straight down the corridor, with obstacles near
/// the player counting as hits
#[cfg(not(target_arch = "wasm32"))]
fn run_headless_levels() {
    use corridor_runner::consts::NO_HIT;
    use corridor_runner::renderer::HeadlessRenderer;
    use corridor_runner::sim::{GamePhase, GameSession, LevelCatalog};
    use corridor_runner::{Settings, Tuning};

    const FRAME_MS: f64 = 1000.0 / 60.0;
    const MAX_FRAMES: usize = 200_000;
    const HIT_RADIUS: f32 = 1.5;

    let catalog = LevelCatalog::builtin();
    let count = catalog.len();
    let mut session = GameSession::new(catalog, Settings::default(), Tuning::default(), 42);

    for id in 0..count {
        let mut renderer = HeadlessRenderer::with_rule(|state| {
            let hit = state
                .obstacles
                .iter()
                .position(|(pos, exists)| *exists && pos.distance(state.player_pos) < HIT_RADIUS);
            [hit.map_or(NO_HIT, |i| i as u8), NO_HIT]
        });

        let mut now = 0.0;
        if let Err(e) = session.select_level(id, now) {
            log::error!("Level {}: {}", id, e);
            continue;
        }
        for _ in 0..MAX_FRAMES {
            now += FRAME_MS;
            session.frame(now, &mut renderer);
            if matches!(session.phase(), GamePhase::Won | GamePhase::Lost) {
                break;
            }
        }

        let z = session.world().map(|w| w.player.pos.z).unwrap_or_default();
        log::info!(
            "Level {} '{}': {:?} at z={:.1} after {:.1}s ({} collision queries)",
            id + 1,
            session.catalog().levels[id].title,
            session.phase(),
            z,
            session.sim_time(now) / 1000.0,
            renderer.collision_draws
        );
        session.return_to_menu();
    }
}

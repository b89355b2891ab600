use raylib::prelude::*;
use std::path::PathBuf;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

use ai_video_studio::config::{
    AspectRatio, Config, DEFAULT_SCENES, MAX_SCENES, MIN_SCENES, Mode, RunConfig, Voice,
    default_output_path,
};
use ai_video_studio::generator::run_generation;
use ai_video_studio::init;
use ai_video_studio::platform;
use ai_video_studio::set_log_hook;

const LOG_MAX_LINES: usize = 300;
const LOG_LINE_MAX: usize = 600;
const FIELD_MAX: usize = 512;

const COLOR_BG: Color = Color::new(25, 25, 25, 255);
const COLOR_BTN: Color = Color::new(40, 90, 170, 255);
const COLOR_BTN_HOVER: Color = Color::new(70, 120, 200, 255);
const COLOR_BTN_DISABLED: Color = Color::new(60, 60, 60, 255);
const COLOR_FIELD: Color = Color::new(35, 35, 35, 255);
const COLOR_FIELD_FOCUS: Color = Color::new(90, 140, 220, 255);
const COLOR_LOG_BG: Color = Color::new(18, 18, 18, 255);
const COLOR_LOG_TEXT: Color = Color::new(210, 210, 210, 255);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Topic,
    Music,
    OpenAiKey,
    FalKey,
}

struct Form {
    mode: usize,
    aspect: usize,
    voice: usize,
    scenes: u32,
    subtitles: bool,
    topic: String,
    music: String,
    openai_key: String,
    fal_key: String,
    focus: Option<Field>,
}

impl Form {
    fn new(cfg: &Config) -> Self {
        Self {
            mode: 0,
            aspect: 0,
            voice: 0,
            scenes: DEFAULT_SCENES,
            subtitles: true,
            topic: "The history of coffee".to_string(),
            music: String::new(),
            openai_key: cfg.openai_api_key.clone(),
            fal_key: cfg.fal_api_key.clone(),
            focus: None,
        }
    }

    fn mode(&self) -> Mode {
        Mode::ALL[self.mode % Mode::ALL.len()]
    }

    fn aspect(&self) -> AspectRatio {
        AspectRatio::ALL[self.aspect % AspectRatio::ALL.len()]
    }

    fn voice(&self) -> Voice {
        Voice::ALL[self.voice % Voice::ALL.len()]
    }

    fn field_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Topic => &mut self.topic,
            Field::Music => &mut self.music,
            Field::OpenAiKey => &mut self.openai_key,
            Field::FalKey => &mut self.fal_key,
        }
    }

    fn run_config(&self) -> RunConfig {
        let music = self.music.trim();
        RunConfig {
            aspect: self.aspect(),
            scenes: self.scenes,
            voice: self.voice(),
            subtitles: self.subtitles,
            music_upload: (!music.is_empty()).then(|| PathBuf::from(music)),
            ..RunConfig::new(self.topic.trim(), self.mode(), default_output_path())
        }
    }

    fn studio_config(&self, base: &Config) -> Config {
        let mut cfg = base.clone();
        if !self.openai_key.trim().is_empty() {
            cfg.openai_api_key = self.openai_key.trim().to_string();
        }
        if !self.fal_key.trim().is_empty() {
            cfg.fal_api_key = self.fal_key.trim().to_string();
        }
        cfg
    }
}

struct AppState {
    running: Arc<AtomicBool>,
    last_output: Arc<Mutex<Option<PathBuf>>>,
    log_buffer: Arc<Mutex<Vec<String>>>,
}

fn push_log_line(buffer: &Arc<Mutex<Vec<String>>>, line: &str) {
    let mut guard = buffer.lock().unwrap_or_else(|e| e.into_inner());
    if guard.len() >= LOG_MAX_LINES {
        let excess = guard.len() + 1 - LOG_MAX_LINES;
        guard.drain(0..excess);
    }
    let mut text = line.to_string();
    if text.len() > LOG_LINE_MAX {
        let mut cut = LOG_LINE_MAX;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
    }
    guard.push(text);
}

fn draw_button(
    d: &mut RaylibDrawHandle,
    rect: Rectangle,
    label: &str,
    enabled: bool,
    font_size: f32,
) -> bool {
    let mouse = d.get_mouse_position();
    let hot = rect.check_collision_point_rec(mouse);

    let bg = if !enabled {
        COLOR_BTN_DISABLED
    } else if hot {
        COLOR_BTN_HOVER
    } else {
        COLOR_BTN
    };

    d.draw_rectangle_rounded(rect, 0.25, 10, bg);
    d.draw_rectangle_rounded_lines(rect, 0.25, 10, Color::new(20, 20, 20, 255));

    let ts = d.measure_text(label, font_size as i32);
    let pos_x = rect.x + (rect.width - ts as f32) * 0.5;
    let pos_y = rect.y + (rect.height - font_size) * 0.5;

    d.draw_text(label, pos_x as i32, pos_y as i32, font_size as i32, Color::RAYWHITE);

    enabled && hot && d.is_mouse_button_released(MouseButton::MOUSE_BUTTON_LEFT)
}

/// Single-line text box. Returns true when clicked this frame.
fn draw_field(
    d: &mut RaylibDrawHandle,
    rect: Rectangle,
    label: &str,
    value: &str,
    masked: bool,
    focused: bool,
) -> bool {
    d.draw_text(label, rect.x as i32, (rect.y - 16.0) as i32, 14, COLOR_LOG_TEXT);
    d.draw_rectangle_rec(rect, COLOR_FIELD);
    let border = if focused {
        COLOR_FIELD_FOCUS
    } else {
        Color::new(60, 60, 60, 255)
    };
    d.draw_rectangle_lines_ex(rect, 2.0, border);

    let mut shown = if masked {
        "*".repeat(value.chars().count().min(32))
    } else {
        value.to_string()
    };
    if focused {
        shown.push('_');
    }
    // keep the tail visible when the text is wider than the box
    while shown.len() > 1 && d.measure_text(&shown, 16) as f32 > rect.width - 12.0 {
        shown.remove(0);
    }
    d.draw_text(&shown, (rect.x + 6.0) as i32, (rect.y + 8.0) as i32, 16, Color::RAYWHITE);

    let mouse = d.get_mouse_position();
    rect.check_collision_point_rec(mouse) && d.is_mouse_button_released(MouseButton::MOUSE_BUTTON_LEFT)
}

fn draw_log_panel(d: &mut RaylibDrawHandle, rect: Rectangle, lines: &[String]) {
    d.draw_rectangle_rec(rect, COLOR_LOG_BG);
    d.draw_rectangle_lines_ex(rect, 2.0, Color::new(40, 40, 40, 255));

    let font_size = 14;
    let pad = 8.0;
    let line_h = 16.0;
    let max_lines = ((rect.height - 2.0 * pad) / line_h).floor().max(1.0) as usize;

    let start = lines.len().saturating_sub(max_lines);

    let mut y = rect.y + pad;
    for line in lines.iter().skip(start) {
        let pos_x = rect.x + pad;
        d.draw_text(line, pos_x as i32, y as i32, font_size, COLOR_LOG_TEXT);
        y += line_h;
    }
}

fn start_generation_thread(state: &AppState, cfg: Config, run: RunConfig) {
    if state.running.load(Ordering::SeqCst) {
        return;
    }

    state.running.store(true, Ordering::SeqCst);
    *state.last_output.lock().unwrap_or_else(|e| e.into_inner()) = None;

    let running = Arc::clone(&state.running);
    let last_output = Arc::clone(&state.last_output);
    let log_buffer = Arc::clone(&state.log_buffer);

    std::thread::spawn(move || {
        let hook_buffer = Arc::clone(&log_buffer);
        let hook = Arc::new(Mutex::new(move |line: &str| {
            push_log_line(&hook_buffer, line);
        }));

        set_log_hook(Some(hook));
        let rt = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(err) => {
                push_log_line(&log_buffer, &format!("[ERROR] {}", err));
                push_log_line(&log_buffer, "Failed to initialize async runtime");
                running.store(false, Ordering::SeqCst);
                set_log_hook(None);
                return;
            }
        };

        match rt.block_on(run_generation(&cfg, &run)) {
            Ok(path) => {
                *last_output.lock().unwrap_or_else(|e| e.into_inner()) = Some(path);
            }
            Err(err) => push_log_line(&log_buffer, &format!("[ERROR] {}", err)),
        }

        set_log_hook(None);
        running.store(false, Ordering::SeqCst);
    });
}

fn snapshot_logs(buffer: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
    buffer.lock().unwrap_or_else(|e| e.into_inner()).clone()
}

fn clear_logs(buffer: &Arc<Mutex<Vec<String>>>) {
    buffer.lock().unwrap_or_else(|e| e.into_inner()).clear();
}

fn main() {
    tracing_subscriber::fmt::init();

    let rt = tokio::runtime::Runtime::new().expect("Failed to create async runtime");
    let base_cfg = rt.block_on(async {
        let cfg = match init::load_config(None).await {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("[ERROR] {:#}; using defaults", e);
                Config::default()
            }
        };
        if !init::check_ffmpeg(&cfg).await {
            eprintln!("[WARNING] FFmpeg not found in PATH. Please install FFmpeg.");
        }
        cfg
    });
    drop(rt);

    let (mut rl, thread) = raylib::init()
        .size(940, 640)
        .resizable()
        .title("AI Video Studio")
        .build();
    rl.set_target_fps(60);
    // Esc leaves a text field instead of closing the window
    rl.set_exit_key(None);

    let mut form = Form::new(&base_cfg);
    let state = AppState {
        running: Arc::new(AtomicBool::new(false)),
        last_output: Arc::new(Mutex::new(None)),
        log_buffer: Arc::new(Mutex::new(Vec::with_capacity(LOG_MAX_LINES))),
    };

    while !rl.window_should_close() {
        if let Some(field) = form.focus {
            while let Some(ch) = rl.get_char_pressed() {
                let value = form.field_mut(field);
                if !ch.is_control() && value.len() < FIELD_MAX {
                    value.push(ch);
                }
            }
            if rl.is_key_pressed(KeyboardKey::KEY_BACKSPACE) {
                form.field_mut(field).pop();
            }
            if rl.is_key_pressed(KeyboardKey::KEY_ENTER) || rl.is_key_pressed(KeyboardKey::KEY_ESCAPE)
            {
                form.focus = None;
            }
        }
        let clicked = rl.is_mouse_button_released(MouseButton::MOUSE_BUTTON_LEFT);
        let mut clicked_field = None;

        let mut d = rl.begin_drawing(&thread);
        d.clear_background(COLOR_BG);

        let idle = !state.running.load(Ordering::SeqCst);
        d.draw_text("AI Video Studio", 30, 16, 24, Color::RAYWHITE);

        let row = |y: f32| Rectangle::new(30.0, y, 300.0, 34.0);

        if draw_button(&mut d, row(56.0), &format!("Mode: {}", form.mode()), idle, 16.0) {
            form.mode = (form.mode + 1) % Mode::ALL.len();
        }
        if draw_button(&mut d, row(98.0), &format!("Format: {}", form.aspect()), idle, 16.0) {
            form.aspect = (form.aspect + 1) % AspectRatio::ALL.len();
        }
        if draw_button(&mut d, row(140.0), &format!("Voice: {}", form.voice()), idle, 16.0) {
            form.voice = (form.voice + 1) % Voice::ALL.len();
        }

        let scenes_label = if form.mode() == Mode::QuickLoop {
            "Scenes: 1 (Quick Loop)".to_string()
        } else {
            format!("Scenes: {}", form.scenes)
        };
        if draw_button(&mut d, Rectangle::new(30.0, 182.0, 44.0, 34.0), "-", idle, 18.0)
            && form.scenes > MIN_SCENES
        {
            form.scenes -= 1;
        }
        d.draw_text(&scenes_label, 90, 190, 16, Color::RAYWHITE);
        if draw_button(&mut d, Rectangle::new(286.0, 182.0, 44.0, 34.0), "+", idle, 18.0)
            && form.scenes < MAX_SCENES
        {
            form.scenes += 1;
        }

        let subs_label = if form.subtitles {
            "Subtitles: ON"
        } else {
            "Subtitles: OFF"
        };
        if draw_button(&mut d, row(224.0), subs_label, idle, 16.0) {
            form.subtitles = !form.subtitles;
        }

        let fields = [
            (Field::Topic, 290.0, "Topic", false),
            (Field::Music, 346.0, "Background music file (optional)", false),
            (Field::OpenAiKey, 402.0, "OpenAI key", true),
            (Field::FalKey, 458.0, "fal.ai key", true),
        ];
        for (field, y, label, masked) in fields {
            let value = form.field_mut(field).clone();
            if draw_field(&mut d, row(y), label, &value, masked, form.focus == Some(field)) && idle {
                clicked_field = Some(field);
            }
        }

        let start_label = if idle { "GENERATE VIDEO" } else { "RUNNING..." };
        if draw_button(
            &mut d,
            Rectangle::new(30.0, 506.0, 300.0, 56.0),
            start_label,
            idle,
            22.0,
        ) {
            clear_logs(&state.log_buffer);
            let cfg = form.studio_config(&base_cfg);
            let run = form.run_config();
            start_generation_thread(&state, cfg, run);
        }

        let last_output = state
            .last_output
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if let Some(output) = &last_output {
            if draw_button(&mut d, Rectangle::new(30.0, 572.0, 145.0, 40.0), "Play Result", true, 16.0) {
                platform::open_path(output);
            }
            if draw_button(&mut d, Rectangle::new(185.0, 572.0, 145.0, 40.0), "Open Folder", true, 16.0) {
                platform::reveal(output);
            }
        }

        let status = match (&last_output, idle) {
            (_, false) => "Status: RUNNING".to_string(),
            (Some(path), true) => format!("Status: DONE -> {}", path.display()),
            (None, true) => "Status: IDLE".to_string(),
        };
        d.draw_text(&status, 360, 612, 16, Color::new(220, 220, 220, 255));

        d.draw_text("Log", 360, 16, 24, Color::RAYWHITE);
        let lines = snapshot_logs(&state.log_buffer);
        draw_log_panel(&mut d, Rectangle::new(360.0, 56.0, 560.0, 544.0), &lines);

        drop(d);
        if clicked {
            form.focus = clicked_field;
        }
    }
}

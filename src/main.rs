use iced::keyboard::{self, Modifiers};
use iced::widget::{image, scrollable, stack};
use iced::{event, window, Element, Event, Point, Size, Subscription, Task, Theme};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::{Builder, Handle};

use raw_culler::library::{Catalog, Project, RecentFolder};
use raw_culler::preview;
use raw_culler::selection::{ClickMode, ViewMode};
use raw_culler::session::{open_folder, OpenedFolder, Services, Session, SessionEvent};
use raw_culler::settings::{PreviewBackend, Settings, Theme as ThemeChoice};
use raw_culler::zoom::{Pan, Zoom};
use raw_culler::{logging, shell, ImageLoader, Score};

mod ui;

use ui::grid::GridLayout;
use ui::keys::{BackStep, Command};

/// Time between two clicks on the same cell that opens the viewer
const DOUBLE_CLICK: Duration = Duration::from_millis(400);

/// Height taken by the toolbar and status line around the grid
const CHROME_HEIGHT: f32 = 96.0;

/// Horizontal padding around the viewer image
const VIEWER_PADDING: f32 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Home,
    Gallery,
    Viewer,
    Settings,
}

/// A transient message shown above the status line
#[derive(Debug, Clone)]
pub struct Notice {
    pub id: u64,
    pub message: String,
    pub is_error: bool,
    created: Instant,
}

impl Notice {
    fn expired(&self, now: Instant) -> bool {
        let ttl = if self.is_error { 10 } else { 4 };
        now.duration_since(self.created) > Duration::from_secs(ttl)
    }
}

/// Application messages (events)
#[derive(Debug, Clone)]
pub enum Message {
    Tick,
    Key(Command),
    ModifiersChanged(Modifiers),
    WindowResized(Size),
    CloseRequested(window::Id),
    GridScrolled(scrollable::Viewport),

    OpenFolder,
    FolderPicked(Option<PathBuf>),
    OpenPath(PathBuf),
    FolderOpened(Result<Arc<OpenedFolder>, String>),

    CardClicked(usize),
    RetryThumbnail(usize),
    Rate(Score),
    ToggleAccept,
    Next,
    Prev,
    ShowScreen(Screen),
    SaveNow,
    ClearCache,
    CacheCleared(Result<usize, String>),
    Reveal(PathBuf),
    DismissNotice(u64),

    ZoomFit,
    ViewerScrolled(scrollable::Viewport),
    ViewerPressed,
    ViewerReleased,
    ViewerCursorMoved(Point),

    ForgetFolder(PathBuf),
    ProjectNameChanged(String),
    CreateProject,
    RenameProject(i64),
    DeleteProject(i64),
    AddFolderToProject(i64),

    ThemeChanged(ThemeChoice),
    GridSizeChanged(u16),
    AutosaveChanged(u64),
    MaxTasksChanged(usize),
    PreviewBackendChanged(PreviewBackend),
    RetainBuffersToggled(bool),
    SaveSettings,
}

/// Main application state
pub struct RawCuller {
    runtime: Handle,
    settings: Settings,
    loader: ImageLoader,
    catalog: Option<Catalog>,
    recent: Vec<RecentFolder>,
    projects: Vec<Project>,
    project_name: String,

    session: Option<Session>,
    opening: Option<PathBuf>,
    screen: Screen,

    /// Decoded thumbnail handles, built once per record
    thumbs: HashMap<usize, image::Handle>,
    /// Viewer image of the focused record and its pixel size
    full: Option<(usize, image::Handle, Option<(u32, u32)>)>,
    zoom: Zoom,
    pan: Option<Pan>,
    viewer_offset: (f32, f32),
    viewer_cursor: (f32, f32),
    last_image_press: Option<Instant>,
    fullscreen: bool,
    show_help: bool,

    modifiers: Modifiers,
    last_click: Option<(usize, Instant)>,
    window: Size,
    scroll_y: f32,
    grid_viewport: Option<Size>,

    notices: Vec<Notice>,
    next_notice: u64,
}

impl RawCuller {
    fn new(runtime: Handle) -> (Self, Task<Message>) {
        let settings = Settings::load();
        let loader = ImageLoader::new(preview::from_settings(&settings));

        let mut app = RawCuller {
            runtime,
            loader,
            catalog: None,
            recent: Vec::new(),
            projects: Vec::new(),
            project_name: String::new(),
            session: None,
            opening: None,
            screen: Screen::Home,
            thumbs: HashMap::new(),
            full: None,
            zoom: Zoom::Fit,
            pan: None,
            viewer_offset: (0.0, 0.0),
            viewer_cursor: (0.0, 0.0),
            last_image_press: None,
            fullscreen: false,
            show_help: false,
            modifiers: Modifiers::default(),
            last_click: None,
            window: Size::new(1280.0, 800.0),
            scroll_y: 0.0,
            grid_viewport: None,
            notices: Vec::new(),
            next_notice: 0,
            settings,
        };

        match Catalog::open_default() {
            Ok(catalog) => app.catalog = Some(catalog),
            Err(err) => app.notify_error(format!("Project catalog unavailable: {}", err)),
        }
        app.refresh_catalog();

        tracing::info!("🎨 RAW Culler initialized");
        (app, Task::none())
    }

    fn title(&self) -> String {
        match &self.session {
            Some(session) => format!("RAW Culler - {}", session.folder().display()),
            None => "RAW Culler".to_string(),
        }
    }

    fn theme(&self) -> Theme {
        match self.settings.theme {
            ThemeChoice::Dark => Theme::Dark,
            ThemeChoice::Light => Theme::Light,
        }
    }

    fn subscription(&self) -> Subscription<Message> {
        let events = event::listen_with(|event, _status, id| match event {
            Event::Keyboard(keyboard::Event::ModifiersChanged(modifiers)) => {
                Some(Message::ModifiersChanged(modifiers))
            }
            Event::Window(window::Event::Resized(size)) => Some(Message::WindowResized(size)),
            Event::Window(window::Event::CloseRequested) => Some(Message::CloseRequested(id)),
            _ => None,
        });
        let keys = keyboard::on_key_press(|key, modifiers| {
            ui::keys::command(key.as_ref(), modifiers).map(Message::Key)
        });

        let mut subs = vec![events, keys];
        if self.session.is_some() || !self.notices.is_empty() {
            subs.push(iced::time::every(Duration::from_millis(50)).map(|_| Message::Tick));
        }
        Subscription::batch(subs)
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Tick => {
                self.drain_session_events();
                let now = Instant::now();
                self.notices.retain(|n| !n.expired(now));
                Task::none()
            }
            Message::Key(command) => self.run_command(command),
            Message::ModifiersChanged(modifiers) => {
                self.modifiers = modifiers;
                Task::none()
            }
            Message::WindowResized(size) => {
                self.window = size;
                self.request_visible_thumbnails();
                Task::none()
            }
            Message::CloseRequested(id) => {
                if let Some(session) = self.session.take() {
                    if let Err(err) = session.close() {
                        shell::show_error("Ratings not saved", &err.to_string());
                    }
                }
                window::close(id)
            }
            Message::GridScrolled(viewport) => {
                self.scroll_y = viewport.absolute_offset().y;
                self.grid_viewport = Some(viewport.bounds().size());
                self.request_visible_thumbnails();
                Task::none()
            }

            Message::OpenFolder => Task::perform(shell::pick_folder(), Message::FolderPicked),
            Message::FolderPicked(None) => Task::none(),
            Message::FolderPicked(Some(folder)) | Message::OpenPath(folder) => self.begin_open(folder),
            Message::FolderOpened(result) => {
                self.opening = None;
                match result {
                    Ok(opened) => self.finish_open(opened),
                    Err(err) => {
                        self.notify_error(format!("Could not open folder: {}", err));
                        Task::none()
                    }
                }
            }

            Message::CardClicked(index) => {
                let mode = if self.modifiers.shift() {
                    ClickMode::Range
                } else if self.modifiers.command() {
                    ClickMode::Toggle
                } else {
                    ClickMode::Plain
                };
                let double = mode == ClickMode::Plain
                    && matches!(self.last_click, Some((i, at)) if i == index && at.elapsed() < DOUBLE_CLICK);
                self.last_click = Some((index, Instant::now()));

                if let Some(session) = self.session.as_mut() {
                    session.click(index, mode);
                }
                if double {
                    return self.show(Screen::Viewer);
                }
                Task::none()
            }
            Message::RetryThumbnail(index) => {
                if let Some(session) = self.session.as_mut() {
                    session.retry_thumbnail(index);
                }
                Task::none()
            }
            Message::Rate(score) => self.run_command(Command::Rate(score)),
            Message::ToggleAccept => self.run_command(Command::ToggleAccept),
            Message::Next => self.run_command(Command::Next),
            Message::Prev => self.run_command(Command::Prev),
            Message::ShowScreen(screen) => self.show(screen),
            Message::SaveNow => self.run_command(Command::Save),
            Message::ClearCache => match &self.session {
                Some(session) => Task::perform(session.clear_thumbnail_cache(), |result| {
                    Message::CacheCleared(result.map_err(|e| e.to_string()))
                }),
                None => Task::none(),
            },
            Message::CacheCleared(Ok(removed)) => {
                self.notify(format!("Cleared {} cached thumbnails", removed));
                Task::none()
            }
            Message::CacheCleared(Err(err)) => {
                self.notify_error(err);
                Task::none()
            }
            Message::Reveal(path) => {
                if let Err(err) = shell::reveal(&path) {
                    self.notify_error(format!("Could not reveal {}: {}", path.display(), err));
                }
                Task::none()
            }
            Message::DismissNotice(id) => {
                self.notices.retain(|n| n.id != id);
                Task::none()
            }

            Message::ZoomFit => self.set_zoom(Zoom::Fit),
            Message::ViewerScrolled(viewport) => {
                let offset = viewport.absolute_offset();
                self.viewer_offset = (offset.x, offset.y);
                Task::none()
            }
            Message::ViewerPressed => {
                let double = self.last_image_press.is_some_and(|at| at.elapsed() < DOUBLE_CLICK);
                self.last_image_press = Some(Instant::now());
                if double {
                    self.last_image_press = None;
                    return self.set_zoom(Zoom::Fit);
                }
                if self.zoom.is_pannable() {
                    self.pan = Some(Pan::begin(self.viewer_cursor, self.viewer_offset));
                }
                Task::none()
            }
            Message::ViewerReleased => {
                self.pan = None;
                Task::none()
            }
            Message::ViewerCursorMoved(position) => {
                self.viewer_cursor = (position.x, position.y);
                let Some(pan) = self.pan else {
                    return Task::none();
                };
                let (x, y) = pan.offset_at(self.viewer_cursor);
                self.viewer_offset = (x, y);
                scrollable::scroll_to(ui::viewer::scroll_id(), scrollable::AbsoluteOffset { x, y })
            }

            Message::ForgetFolder(folder) => {
                self.with_catalog(|catalog| catalog.forget_folder(&folder));
                Task::none()
            }

            Message::ProjectNameChanged(name) => {
                self.project_name = name;
                Task::none()
            }
            Message::CreateProject => {
                let name = std::mem::take(&mut self.project_name);
                self.with_catalog(|catalog| catalog.add_project(&name).map(|_| ()));
                Task::none()
            }
            Message::RenameProject(id) => {
                let name = std::mem::take(&mut self.project_name);
                self.with_catalog(|catalog| catalog.rename_project(id, &name));
                Task::none()
            }
            Message::DeleteProject(id) => {
                self.with_catalog(|catalog| catalog.delete_project(id));
                Task::none()
            }
            Message::AddFolderToProject(id) => {
                if let Some(folder) = self.session.as_ref().map(|s| s.folder().to_path_buf()) {
                    self.with_catalog(|catalog| catalog.add_folder_to_project(id, &folder).map(|_| ()));
                }
                Task::none()
            }

            Message::ThemeChanged(theme) => {
                self.settings.theme = theme;
                Task::none()
            }
            Message::GridSizeChanged(size) => {
                self.settings.grid_size = size;
                self.request_visible_thumbnails();
                Task::none()
            }
            Message::AutosaveChanged(ms) => {
                self.settings.autosave_interval_ms = ms;
                Task::none()
            }
            Message::MaxTasksChanged(tasks) => {
                self.settings.max_thumbnail_tasks = tasks;
                Task::none()
            }
            Message::PreviewBackendChanged(backend) => {
                self.settings.preview_backend = backend;
                Task::none()
            }
            Message::RetainBuffersToggled(retain) => {
                self.settings.retain_scan_buffers = retain;
                Task::none()
            }
            Message::SaveSettings => {
                self.settings = self.settings.clone().sanitized();
                self.loader = ImageLoader::new(preview::from_settings(&self.settings));
                match self.settings.save() {
                    Ok(path) => self.notify(format!("Settings saved to {}", path.display())),
                    Err(err) => self.notify_error(format!("Could not save settings: {}", err)),
                }
                Task::none()
            }
        }
    }

    fn run_command(&mut self, command: Command) -> Task<Message> {
        match command {
            Command::OpenFolder => return Task::perform(shell::pick_folder(), Message::FolderPicked),
            Command::ShowProjects => return self.show(Screen::Home),
            Command::ToggleFullscreen => return self.set_fullscreen(!self.fullscreen),
            Command::ToggleHelp => {
                self.show_help = !self.show_help;
                return Task::none();
            }
            Command::Back => return self.back(),
            Command::ZoomIn if self.screen == Screen::Viewer => return self.set_zoom(self.zoom.zoom_in()),
            Command::ZoomOut if self.screen == Screen::Viewer => return self.set_zoom(self.zoom.zoom_out()),
            Command::ZoomIn | Command::ZoomOut => return Task::none(),
            _ => {}
        }
        let view = if self.screen == Screen::Viewer {
            ViewMode::Viewer
        } else {
            ViewMode::Grid
        };
        let Some(session) = self.session.as_mut() else {
            return Task::none();
        };

        match command {
            Command::Save => {
                session.save_now();
                Task::none()
            }
            Command::Rate(score) => {
                session.apply_score(score, view);
                Task::none()
            }
            Command::ToggleAccept => {
                session.toggle_accept(view);
                Task::none()
            }
            Command::Next | Command::Prev => {
                if command == Command::Next {
                    session.next();
                } else {
                    session.prev();
                }
                if self.screen == Screen::Viewer {
                    self.refresh_viewer();
                    Task::none()
                } else {
                    self.scroll_to_focused()
                }
            }
            Command::RetryThumbnail => {
                if let Some(current) = session.current() {
                    session.retry_thumbnail(current);
                }
                Task::none()
            }
            Command::ShowViewer => self.show(Screen::Viewer),
            Command::ShowGallery => self.show(Screen::Gallery),
            Command::OpenFolder
            | Command::ShowProjects
            | Command::ToggleFullscreen
            | Command::ToggleHelp
            | Command::Back
            | Command::ZoomIn
            | Command::ZoomOut => Task::none(),
        }
    }

    fn back(&mut self) -> Task<Message> {
        match BackStep::next(self.fullscreen, self.show_help) {
            BackStep::ExitFullscreen => self.set_fullscreen(false),
            BackStep::CloseHelp => {
                self.show_help = false;
                Task::none()
            }
            BackStep::Gallery => {
                if let Some(session) = self.session.as_mut() {
                    session.clear_selection();
                }
                self.show(Screen::Gallery)
            }
        }
    }

    fn set_fullscreen(&mut self, fullscreen: bool) -> Task<Message> {
        self.fullscreen = fullscreen;
        let mode = if fullscreen {
            self.notify("Fullscreen - press F11 or Esc to exit".to_string());
            window::Mode::Fullscreen
        } else {
            window::Mode::Windowed
        };
        window::get_latest().and_then(move |id| window::change_mode(id, mode))
    }

    fn set_zoom(&mut self, zoom: Zoom) -> Task<Message> {
        self.zoom = zoom;
        self.pan = None;
        if zoom.is_pannable() {
            return Task::none();
        }
        self.viewer_offset = (0.0, 0.0);
        scrollable::scroll_to(ui::viewer::scroll_id(), scrollable::AbsoluteOffset { x: 0.0, y: 0.0 })
    }

    fn show(&mut self, screen: Screen) -> Task<Message> {
        let has_records = self.session.as_ref().is_some_and(|s| !s.records().is_empty());
        match screen {
            Screen::Viewer if !has_records => Task::none(),
            Screen::Viewer => {
                self.screen = Screen::Viewer;
                self.refresh_viewer();
                Task::none()
            }
            Screen::Gallery if self.session.is_none() => Task::none(),
            Screen::Gallery => {
                let was_gallery = self.screen == Screen::Gallery;
                self.screen = Screen::Gallery;
                if was_gallery {
                    return Task::none();
                }
                // The scrollable is rebuilt from the top
                self.scroll_y = 0.0;
                let task = self.scroll_to_focused();
                self.request_visible_thumbnails();
                task
            }
            Screen::Home => {
                self.refresh_catalog();
                self.screen = Screen::Home;
                Task::none()
            }
            Screen::Settings => {
                self.screen = Screen::Settings;
                Task::none()
            }
        }
    }

    // ========== Folder lifecycle ==========

    fn begin_open(&mut self, folder: PathBuf) -> Task<Message> {
        if self.opening.is_some() {
            return Task::none();
        }
        // The rescan reads the sidecar, so pending scores go to disk first
        if let Some(Err(err)) = self.session.as_mut().map(Session::flush) {
            self.notify_error(format!("Ratings were not saved: {}", err));
        }
        self.opening = Some(folder.clone());
        let loader = self.loader.clone();
        let retain = self.settings.retain_scan_buffers;
        Task::perform(
            async move { open_folder(&folder, loader, retain).await },
            |result| Message::FolderOpened(result.map(Arc::new).map_err(|e| e.to_string())),
        )
    }

    fn finish_open(&mut self, opened: Arc<OpenedFolder>) -> Task<Message> {
        let mut opened = Arc::try_unwrap(opened).unwrap_or_else(|shared| (*shared).clone());

        if let Some(previous) = self.session.take() {
            let same_folder = previous.folder() == opened.folder;
            match previous.close() {
                // Scores given while the scan ran are on disk only now
                Ok(()) if same_folder => opened.merge_saved_scores(),
                Ok(()) => {}
                Err(err) => {
                    self.notify_error(format!("Ratings of the previous folder were not saved: {}", err))
                }
            }
        }

        self.notify(opened.summary());
        let folder = opened.folder.clone();
        self.with_catalog(|catalog| catalog.record_folder_opened(&folder));

        let services = Services {
            runtime: self.runtime.clone(),
            loader: self.loader.clone(),
            settings: self.settings.clone(),
        };
        self.session = Some(Session::start(opened, &services));
        self.thumbs.clear();
        self.full = None;
        self.zoom = Zoom::Fit;
        self.pan = None;
        self.last_click = None;
        self.scroll_y = 0.0;
        self.screen = Screen::Gallery;
        self.request_visible_thumbnails();

        scrollable::scroll_to(ui::grid::scroll_id(), scrollable::AbsoluteOffset { x: 0.0, y: 0.0 })
    }

    // ========== Thumbnails and viewer ==========

    fn grid_layout(&self) -> GridLayout {
        let width = self.grid_viewport.map_or(self.window.width, |s| s.width);
        GridLayout::new(width, self.settings.grid_size as f32)
    }

    fn grid_height(&self) -> f32 {
        self.grid_viewport
            .map_or(self.window.height - CHROME_HEIGHT, |s| s.height)
            .max(0.0)
    }

    /// Width available to the viewer image inside its padding
    fn viewer_width(&self) -> f32 {
        (self.window.width - VIEWER_PADDING).max(0.0)
    }

    /// Ask for thumbnails of every cell in or near the viewport
    fn request_visible_thumbnails(&mut self) {
        if self.screen != Screen::Gallery {
            return;
        }
        let layout = self.grid_layout();
        let height = self.grid_height();
        let Some(session) = self.session.as_mut() else {
            return;
        };
        for index in layout.visible_range(self.scroll_y, height, session.records().len()) {
            session.ensure_thumbnail(index);
        }
    }

    fn scroll_to_focused(&mut self) -> Task<Message> {
        let Some(current) = self.session.as_ref().and_then(Session::current) else {
            return Task::none();
        };
        let layout = self.grid_layout();
        let height = self.grid_height();
        match layout.scroll_target(current, self.scroll_y, height) {
            Some(y) => {
                self.scroll_y = y;
                self.request_visible_thumbnails();
                scrollable::scroll_to(ui::grid::scroll_id(), scrollable::AbsoluteOffset { x: 0.0, y })
            }
            None => Task::none(),
        }
    }

    /// Show the focused record's full image, loading it when needed
    fn refresh_viewer(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(current) = session.current() else {
            return;
        };
        if self.full.as_ref().is_some_and(|(i, _, _)| *i == current) {
            session.preload_adjacent();
            return;
        }

        match session.record(current).and_then(|r| r.full_image.clone()) {
            Some(full) => {
                self.full = Some((current, image::Handle::from_bytes(full.bytes.clone()), full.dimensions()));
            }
            None => {
                session.ensure_full_image(current);
                session.ensure_thumbnail(current);
            }
        }
        session.preload_adjacent();
    }

    fn drain_session_events(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let events = session.poll_events();
        let current = session.current();

        let mut failed_thumbs = 0;
        let mut refresh_viewer = false;
        for event in events {
            match event {
                SessionEvent::ThumbnailReady(index) => {
                    let handle = self
                        .session
                        .as_ref()
                        .and_then(|s| s.record(index))
                        .and_then(|r| r.thumbnail_data())
                        .map(|data| image::Handle::from_bytes(data.as_ref().clone()));
                    if let Some(handle) = handle {
                        self.thumbs.insert(index, handle);
                    }
                }
                SessionEvent::ThumbnailFailed { index, error } => {
                    tracing::debug!("Thumbnail {} failed: {}", index, error);
                    failed_thumbs += 1;
                }
                SessionEvent::FullImageReady(index) => {
                    refresh_viewer |= current == Some(index);
                }
                SessionEvent::FullImageFailed { index, error } => {
                    if current == Some(index) {
                        self.notify_error(format!("Could not load image: {}", error));
                    }
                }
                SessionEvent::Saved { path, manual } => {
                    if manual {
                        self.notify(format!("Saved ratings to {}", path.display()));
                    }
                }
                SessionEvent::SaveFailed(err) => {
                    self.notify_error(format!("Could not save ratings: {}", err));
                }
            }
        }

        if failed_thumbs > 0 {
            self.notify_error(format!("{} thumbnails could not be generated", failed_thumbs));
        }
        if refresh_viewer && self.screen == Screen::Viewer {
            self.refresh_viewer();
        }
    }

    // ========== Catalog and notices ==========

    fn with_catalog<F>(&mut self, op: F)
    where
        F: FnOnce(&Catalog) -> Result<(), raw_culler::error::CatalogError>,
    {
        let result = match &self.catalog {
            Some(catalog) => op(catalog),
            None => return,
        };
        if let Err(err) = result {
            self.notify_error(err.to_string());
        }
        self.refresh_catalog();
    }

    fn refresh_catalog(&mut self) {
        let Some(catalog) = &self.catalog else {
            return;
        };
        match catalog.recent_folders(12).and_then(|recent| Ok((recent, catalog.projects()?))) {
            Ok((recent, projects)) => {
                self.recent = recent;
                self.projects = projects;
            }
            Err(err) => tracing::warn!("⚠️  Could not read catalog: {}", err),
        }
    }

    fn notify(&mut self, message: String) {
        self.notices_push(message, false);
    }

    fn notify_error(&mut self, message: String) {
        tracing::error!("❌ {}", message);
        self.notices_push(message, true);
    }

    fn notices_push(&mut self, message: String, is_error: bool) {
        self.next_notice += 1;
        self.notices.push(Notice {
            id: self.next_notice,
            message,
            is_error,
            created: Instant::now(),
        });
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let content = match (self.screen, &self.session) {
            (Screen::Settings, _) => ui::settings::view(&self.settings),
            (Screen::Gallery, Some(session)) => ui::grid::view(
                session,
                &self.thumbs,
                self.grid_layout(),
                self.scroll_y,
                self.grid_height(),
            ),
            (Screen::Viewer, Some(session)) => {
                let full = self
                    .full
                    .as_ref()
                    .filter(|(index, _, _)| session.current() == Some(*index))
                    .map(|(_, handle, size)| ui::viewer::Picture { handle, size: *size });
                let thumb = session
                    .current()
                    .and_then(|i| self.thumbs.get(&i))
                    .map(|handle| ui::viewer::Picture { handle, size: None });
                ui::viewer::view(session, full.or(thumb), self.zoom, self.viewer_width())
            }
            _ => ui::home::view(
                &self.recent,
                &self.projects,
                &self.project_name,
                self.session.as_ref().map(Session::folder),
            ),
        };

        let framed = ui::frame(
            self.screen,
            self.session.as_ref(),
            self.opening.as_deref(),
            &self.notices,
            content,
        );
        if self.show_help {
            stack![framed, ui::help_overlay()].into()
        } else {
            framed
        }
    }
}

fn main() -> iced::Result {
    logging::init();
    logging::install_panic_guard();

    // Background work (thumbnails, saves) runs on its own runtime so the
    // session can spawn from inside `update`
    let runtime = match Builder::new_multi_thread()
        .thread_name("raw-culler-worker")
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            tracing::error!("❌ Could not start worker runtime: {}", err);
            shell::show_error("RAW Culler", &format!("Could not start worker runtime: {}", err));
            return Ok(());
        }
    };
    let handle = runtime.handle().clone();

    let result = iced::application(RawCuller::title, RawCuller::update, RawCuller::view)
        .subscription(RawCuller::subscription)
        .theme(RawCuller::theme)
        .window(window::Settings {
            size: Size::new(1280.0, 800.0),
            exit_on_close_request: false,
            ..window::Settings::default()
        })
        .centered()
        .run_with(move || RawCuller::new(handle));

    runtime.shutdown_timeout(Duration::from_secs(2));
    result
}

//! Authoring session: the one context object the host drives.
//!
//! A session owns the viewport, the annotation store, the tool state and the
//! committed image. Hosts feed it [`SessionEvent`]s and re-render when the
//! returned [`Transition`] asks for it.

use crate::annotation::{AnnotationId, AnnotationPatch, NewAnnotation};
use crate::catalog::{DefectCatalog, HexColor};
use crate::config::EngineConfig;
use crate::loader::{ImageLoader, ImageSource, LoadOutcome, LoadedImage, Placeholder};
use crate::schedule::RenderRequest;
use crate::storage::{AnnotationSet, Storage, StorageError, StorageResult};
use crate::store::{AnnotationStore, StoreResult};
use crate::tools::{ShapeDraft, ToolAction, ToolKind, ToolManager};
use crate::viewport::Viewport;
use kurbo::{Point, Size, Vec2};
use std::sync::Arc;
use std::sync::atomic::AtomicU64;

/// Defect type used when the catalog is empty.
const UNCATEGORIZED: &str = "uncategorized";

/// What gets drawn on top of the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayOptions {
    pub show_annotations: bool,
    pub show_labels: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            show_annotations: true,
            show_labels: true,
        }
    }
}

/// User intents. Pointer positions are in view space.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    SetTool(ToolKind),
    SetActiveDefectType(String),
    PointerDown(Point),
    PointerMove(Point),
    PointerUp(Point),
    ClosePolygon,
    CancelGesture,
    ZoomIn,
    ZoomOut,
    ResetView,
    /// View-space delta.
    Pan(Vec2),
    ContainerResized(Size),
    Select(Option<AnnotationId>),
    Create(NewAnnotation),
    Update(AnnotationId, AnnotationPatch),
    Delete(AnnotationId),
    ToggleAnnotations,
    ToggleLabels,
}

/// Outcome of applying an event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transition {
    pub render: RenderRequest,
    /// Id of an annotation created by this event.
    pub created: Option<AnnotationId>,
}

impl Transition {
    fn render(render: RenderRequest) -> Self {
        Self {
            render,
            created: None,
        }
    }
}

/// Annotation authoring session for one image at a time.
#[derive(Debug, Clone)]
pub struct Session {
    config: EngineConfig,
    viewport: Viewport,
    store: AnnotationStore,
    tools: ToolManager,
    catalog: DefectCatalog,
    active_defect_type_id: String,
    image: Option<LoadedImage>,
    image_id: String,
    container: Option<Size>,
    display: DisplayOptions,
    revision: u64,
    /// Load generations for every loader handed out by this session.
    generations: Arc<AtomicU64>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Session with the default config and inspection catalog.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default(), DefectCatalog::default())
    }

    /// The config's fallback color replaces the catalog's.
    pub fn with_config(config: EngineConfig, catalog: DefectCatalog) -> Self {
        let catalog = match HexColor::parse(&config.fallback_color) {
            Ok(color) => catalog.with_fallback(color),
            Err(e) => {
                log::warn!("{}; keeping catalog fallback color", e);
                catalog
            }
        };
        let active_defect_type_id = catalog
            .first()
            .map(|t| t.id.clone())
            .unwrap_or_else(|| UNCATEGORIZED.to_string());
        Self {
            viewport: Viewport::with_config(&config),
            store: AnnotationStore::new()
                .with_operator(config.operator.clone())
                .with_marker_radius(config.marker_radius),
            tools: ToolManager::with_config(&config),
            catalog,
            active_defect_type_id,
            image: None,
            image_id: String::new(),
            container: None,
            display: DisplayOptions::default(),
            revision: 0,
            generations: Arc::new(AtomicU64::new(0)),
            config,
        }
    }

    /// Set the container size before any image is committed.
    pub fn with_container(mut self, container: Size) -> Self {
        self.container = Some(container);
        self
    }

    /// Image loader using this session's placeholder settings.
    ///
    /// All loaders from one session share its generation counter, so the
    /// newest request wins across loaders too.
    pub fn image_loader(&self, source: Arc<dyn ImageSource>) -> ImageLoader {
        ImageLoader::new(source)
            .with_placeholder(Placeholder::from_config(&self.config))
            .with_generations(Arc::clone(&self.generations))
    }

    /// Apply a user intent.
    pub fn apply(&mut self, event: SessionEvent) -> StoreResult<Transition> {
        let transition = match event {
            SessionEvent::SetTool(tool) => {
                self.tools.set_tool(tool);
                Transition::render(RenderRequest::Immediate)
            }
            SessionEvent::SetActiveDefectType(id) => {
                if self.catalog.get(&id).is_none() {
                    log::debug!("Active defect type {} is not in the catalog", id);
                }
                self.active_defect_type_id = id;
                self.preview_request()
            }
            SessionEvent::PointerDown(view) => {
                let (p, scale) = self.to_image(view);
                let action = self.tools.pointer_down(p, scale);
                self.handle_action(action)?
            }
            SessionEvent::PointerMove(view) => {
                let (p, scale) = self.to_image(view);
                let action = self.tools.pointer_move(p, scale);
                self.handle_action(action)?
            }
            SessionEvent::PointerUp(view) => {
                let (p, scale) = self.to_image(view);
                let action = self.tools.pointer_up(p, scale);
                self.handle_action(action)?
            }
            SessionEvent::ClosePolygon => match self.tools.close_polygon() {
                Some(draft) => self.create_from_draft(draft)?,
                None => Transition::render(RenderRequest::Immediate),
            },
            SessionEvent::CancelGesture => {
                self.tools.cancel();
                Transition::render(RenderRequest::Immediate)
            }
            SessionEvent::ZoomIn => {
                self.viewport.zoom_in();
                Transition::render(RenderRequest::Debounced)
            }
            SessionEvent::ZoomOut => {
                self.viewport.zoom_out();
                Transition::render(RenderRequest::Debounced)
            }
            SessionEvent::ResetView => {
                self.viewport.reset();
                Transition::render(RenderRequest::Immediate)
            }
            SessionEvent::Pan(delta) => {
                self.viewport.pan(delta);
                Transition::render(RenderRequest::Immediate)
            }
            SessionEvent::ContainerResized(size) => {
                self.container = Some(size);
                self.viewport.resize_container(size);
                Transition::render(RenderRequest::Debounced)
            }
            SessionEvent::Select(id) => {
                self.store.select(id.as_deref())?;
                Transition::render(RenderRequest::Immediate)
            }
            SessionEvent::Create(new) => {
                let id = self.store.create(new)?;
                Transition {
                    render: RenderRequest::Immediate,
                    created: Some(id),
                }
            }
            SessionEvent::Update(id, patch) => {
                self.store.update(&id, patch)?;
                Transition::render(RenderRequest::Immediate)
            }
            SessionEvent::Delete(id) => {
                self.store.delete(&id)?;
                Transition::render(RenderRequest::Immediate)
            }
            SessionEvent::ToggleAnnotations => {
                self.display.show_annotations = !self.display.show_annotations;
                Transition::render(RenderRequest::Immediate)
            }
            SessionEvent::ToggleLabels => {
                self.display.show_labels = !self.display.show_labels;
                Transition::render(RenderRequest::Immediate)
            }
        };

        if transition.render != RenderRequest::None {
            self.revision += 1;
        }
        Ok(transition)
    }

    /// Commit a finished load. Returns false if the outcome is stale.
    ///
    /// Switching to a different image clears the annotations and selection.
    pub fn commit_image(&mut self, outcome: LoadOutcome) -> bool {
        let image = match outcome {
            LoadOutcome::Ready(image) => image,
            LoadOutcome::Superseded { generation, source } => {
                log::debug!("Not committing superseded image {} (generation {})", source, generation);
                return false;
            }
        };
        if let Some(current) = &self.image {
            if image.generation <= current.generation {
                log::debug!(
                    "Not committing image {} (generation {}, committed {})",
                    image.source,
                    image.generation,
                    current.generation
                );
                return false;
            }
        }

        if image.source != self.image_id {
            self.store.clear();
            self.image_id = image.source.clone();
        }
        self.tools.cancel();
        let container = self.container.unwrap_or_else(|| image.size());
        self.viewport.fit(container, image.size());
        log::info!(
            "Committed image {} ({}x{}{})",
            image.source,
            image.width(),
            image.height(),
            if image.placeholder { ", placeholder" } else { "" }
        );
        self.image = Some(image);
        self.revision += 1;
        true
    }

    /// The complete annotation set for the current image.
    pub fn export(&self) -> AnnotationSet {
        AnnotationSet::new(self.image_id.clone(), self.store.snapshot())
    }

    /// Emit the annotation set to a storage backend.
    pub async fn save(&self, storage: &dyn Storage) -> StorageResult<()> {
        if self.image_id.is_empty() {
            return Err(StorageError::Other("No image to save annotations for".to_string()));
        }
        let set = self.export();
        storage.save(&set).await?;
        log::info!("Saved {} annotations for {}", set.annotations.len(), set.image_id);
        Ok(())
    }

    /// Replace the annotations with a stored set.
    pub fn import(&mut self, set: AnnotationSet) -> StoreResult<()> {
        if self.image_id.is_empty() {
            self.image_id = set.image_id.clone();
        } else if set.image_id != self.image_id {
            log::warn!(
                "Importing annotations for {} into session for {}",
                set.image_id,
                self.image_id
            );
        }
        self.store.import(set.annotations)?;
        self.tools.cancel();
        self.revision += 1;
        Ok(())
    }

    fn to_image(&self, view: Point) -> (Point, f64) {
        (self.viewport.to_image(view), self.viewport.scale)
    }

    fn handle_action(&mut self, action: ToolAction) -> StoreResult<Transition> {
        match action {
            ToolAction::None => Ok(self.preview_request()),
            ToolAction::Pick(p) => {
                let hit = self.store.hit_test(p, self.viewport.scale);
                self.store.select(hit.as_deref())?;
                if let Some(id) = hit {
                    self.tools.begin_move(id, p);
                }
                Ok(Transition::render(RenderRequest::Immediate))
            }
            ToolAction::Create(draft) => self.create_from_draft(draft),
            ToolAction::Translate { id, delta } => {
                self.store.translate(&id, delta)?;
                Ok(Transition::render(RenderRequest::Immediate))
            }
        }
    }

    /// New annotations take the active defect type and are selected.
    fn create_from_draft(&mut self, draft: ShapeDraft) -> StoreResult<Transition> {
        let new = NewAnnotation::new(draft.kind, self.active_defect_type_id.clone(), draft.points);
        let id = self.store.create(new)?;
        self.store.select(Some(&id))?;
        Ok(Transition {
            render: RenderRequest::Immediate,
            created: Some(id),
        })
    }

    fn preview_request(&self) -> Transition {
        if self.tools.preview().is_some() {
            Transition::render(RenderRequest::Immediate)
        } else {
            Transition::default()
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn catalog(&self) -> &DefectCatalog {
        &self.catalog
    }

    pub fn image(&self) -> Option<&LoadedImage> {
        self.image.as_ref()
    }

    pub fn image_id(&self) -> &str {
        &self.image_id
    }

    pub fn display(&self) -> DisplayOptions {
        self.display
    }

    pub fn active_tool(&self) -> ToolKind {
        self.tools.current_tool
    }

    pub fn active_defect_type_id(&self) -> &str {
        &self.active_defect_type_id
    }

    pub fn selected(&self) -> Option<&str> {
        self.store.selected()
    }

    /// In-progress shape, for preview rendering.
    pub fn preview(&self) -> Option<ShapeDraft> {
        self.tools.preview()
    }

    /// Bumped on every visible change.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::AnnotationKind;
    use crate::storage::MemoryStorage;
    use crate::store::StoreError;
    use futures::executor::block_on;
    use image::RgbaImage;

    fn loaded(generation: u64, source: &str, width: u32, height: u32) -> LoadOutcome {
        LoadOutcome::Ready(LoadedImage {
            generation,
            source: source.to_string(),
            image: Arc::new(RgbaImage::new(width, height)),
            placeholder: false,
            caption: None,
            failure: None,
        })
    }

    /// 1600x800 image in an 800x600 container: scale 0.5, offset (0, 50).
    fn fitted_session() -> Session {
        let mut session = Session::new().with_container(Size::new(800.0, 600.0));
        assert!(session.commit_image(loaded(1, "part-17.png", 1600, 800)));
        session
    }

    fn view(session: &Session, x: f64, y: f64) -> Point {
        session.viewport().to_view(Point::new(x, y))
    }

    fn drag(session: &mut Session, from: Point, to: Point) -> Transition {
        session.apply(SessionEvent::PointerDown(from)).unwrap();
        session.apply(SessionEvent::PointerMove(to)).unwrap();
        session.apply(SessionEvent::PointerUp(to)).unwrap()
    }

    fn click(session: &mut Session, at: Point) -> Transition {
        session.apply(SessionEvent::PointerDown(at)).unwrap();
        session.apply(SessionEvent::PointerUp(at)).unwrap()
    }

    #[test]
    fn test_commit_fits_viewport() {
        let session = fitted_session();
        assert!((session.viewport().scale - 0.5).abs() < f64::EPSILON);
        assert_eq!(session.viewport().to_view(Point::ZERO), Point::new(0.0, 50.0));
        assert_eq!(session.image_id(), "part-17.png");
    }

    #[test]
    fn test_drag_creates_in_image_space() {
        let mut session = fitted_session();
        session.apply(SessionEvent::SetTool(ToolKind::Rectangle)).unwrap();
        session
            .apply(SessionEvent::SetActiveDefectType("crack".to_string()))
            .unwrap();

        let t = drag(&mut session, Point::new(100.0, 90.0), Point::new(50.0, 70.0));
        let id = t.created.unwrap();
        let ann = session.store().get(&id).unwrap();
        assert_eq!(ann.kind, AnnotationKind::Rectangle);
        assert_eq!(ann.points, vec![Point::new(200.0, 80.0), Point::new(100.0, 40.0)]);
        assert_eq!(ann.defect_type_id, "crack");
        assert_eq!(ann.label, "Rectangle");
        assert_eq!(ann.created_by, "operator");
        assert!(!ann.verified);
        assert_eq!(session.selected(), Some(id.as_str()));
    }

    #[test]
    fn test_select_click_and_miss() {
        let mut session = fitted_session();
        let id = session
            .apply(SessionEvent::Create(NewAnnotation::rectangle(
                "scratch",
                Point::new(10.0, 10.0),
                Point::new(90.0, 90.0),
            )))
            .unwrap()
            .created
            .unwrap();

        let hit = view(&session, 50.0, 50.0);
        click(&mut session, hit);
        assert_eq!(session.selected(), Some(id.as_str()));

        let miss = view(&session, 5.0, 5.0);
        click(&mut session, miss);
        assert_eq!(session.selected(), None);
    }

    #[test]
    fn test_move_tool_drags_points() {
        let mut session = fitted_session();
        let id = session
            .apply(SessionEvent::Create(NewAnnotation::rectangle(
                "dent",
                Point::new(100.0, 100.0),
                Point::new(200.0, 200.0),
            )))
            .unwrap()
            .created
            .unwrap();
        session.apply(SessionEvent::SetTool(ToolKind::Move)).unwrap();

        let from = view(&session, 150.0, 150.0);
        drag(&mut session, from, from + Vec2::new(10.0, 5.0));
        // 10x5 view px at scale 0.5 is 20x10 image px.
        assert_eq!(
            session.store().get(&id).unwrap().points,
            vec![Point::new(120.0, 110.0), Point::new(220.0, 210.0)]
        );
    }

    #[test]
    fn test_polygon_close_event() {
        let mut session = fitted_session();
        session.apply(SessionEvent::SetTool(ToolKind::Polygon)).unwrap();
        for (x, y) in [(0.0, 0.0), (100.0, 0.0)] {
            let p = view(&session, x, y);
            click(&mut session, p);
        }
        let t = session.apply(SessionEvent::ClosePolygon).unwrap();
        assert!(t.created.is_none());
        assert!(session.store().is_empty());

        for (x, y) in [(0.0, 0.0), (100.0, 0.0), (50.0, 90.0)] {
            let p = view(&session, x, y);
            click(&mut session, p);
        }
        let t = session.apply(SessionEvent::ClosePolygon).unwrap();
        let ann = session.store().get(&t.created.unwrap()).unwrap();
        assert_eq!(ann.kind, AnnotationKind::Polygon);
        assert_eq!(ann.points.len(), 3);
    }

    #[test]
    fn test_view_changes_keep_points() {
        let mut session = fitted_session();
        let id = session
            .apply(SessionEvent::Create(NewAnnotation::circle(
                "dent",
                Point::new(123.25, 456.5),
                Point::new(130.0, 460.0),
            )))
            .unwrap()
            .created
            .unwrap();
        let before = session.store().get(&id).unwrap().points.clone();

        for event in [
            SessionEvent::ZoomIn,
            SessionEvent::ZoomOut,
            SessionEvent::ResetView,
            SessionEvent::Pan(Vec2::new(-40.0, 12.0)),
            SessionEvent::ContainerResized(Size::new(300.0, 200.0)),
        ] {
            session.apply(event).unwrap();
        }
        assert_eq!(session.store().get(&id).unwrap().points, before);
    }

    #[test]
    fn test_render_requests() {
        let mut session = fitted_session();
        let rev = session.revision();
        assert_eq!(session.apply(SessionEvent::ZoomIn).unwrap().render, RenderRequest::Debounced);
        assert_eq!(session.apply(SessionEvent::ToggleLabels).unwrap().render, RenderRequest::Immediate);
        assert!(!session.display().show_labels);
        assert_eq!(session.revision(), rev + 2);

        // Moving the pointer with nothing in progress changes nothing.
        let t = session.apply(SessionEvent::PointerMove(Point::new(5.0, 5.0))).unwrap();
        assert_eq!(t.render, RenderRequest::None);
        assert_eq!(session.revision(), rev + 2);
    }

    #[test]
    fn test_store_errors_surface() {
        let mut session = fitted_session();
        let err = session
            .apply(SessionEvent::Delete("missing-id".to_string()))
            .unwrap_err();
        assert_eq!(err, StoreError::AnnotationNotFound("missing-id".to_string()));
        assert!(session.apply(SessionEvent::Select(Some("missing-id".to_string()))).is_err());
    }

    #[test]
    fn test_stale_commit_refused() {
        let mut session = Session::new();
        assert!(session.commit_image(loaded(2, "B", 40, 30)));
        assert!(!session.commit_image(loaded(1, "A", 50, 50)));
        assert!(!session.commit_image(LoadOutcome::Superseded {
            generation: 3,
            source: "C".to_string(),
        }));
        assert_eq!(session.image().unwrap().source, "B");
        // No container: fitted to the image itself.
        assert!((session.viewport().scale - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_loaders_share_generations() {
        let mut png = std::io::Cursor::new(Vec::new());
        RgbaImage::new(4, 4)
            .write_to(&mut png, image::ImageFormat::Png)
            .unwrap();
        let bytes = png.into_inner();
        let source: Arc<dyn ImageSource> = Arc::new(
            crate::loader::MemorySource::new()
                .with("A", bytes.clone())
                .with("B", bytes),
        );
        let mut session = Session::new();

        let first = session.image_loader(Arc::clone(&source));
        assert!(session.commit_image(block_on(first.load("A"))));

        // A second loader continues the same sequence.
        let second = session.image_loader(source);
        let outcome = block_on(second.load("B"));
        assert_eq!(outcome.generation(), 2);
        assert!(session.commit_image(outcome));
        assert_eq!(session.image_id(), "B");
        assert_eq!(first.latest_generation(), 2);
    }

    #[test]
    fn test_new_image_clears_annotations() {
        let mut session = fitted_session();
        session
            .apply(SessionEvent::Create(NewAnnotation::point("dent", Point::new(1.0, 1.0))))
            .unwrap();
        assert!(session.commit_image(loaded(2, "part-18.png", 100, 100)));
        assert!(session.store().is_empty());
        assert_eq!(session.image_id(), "part-18.png");
    }

    #[test]
    fn test_save_and_import() {
        let mut session = fitted_session();
        session
            .apply(SessionEvent::Create(
                NewAnnotation::point("dent", Point::new(4.0, 4.0)).with_confidence(77.0),
            ))
            .unwrap();
        let storage = MemoryStorage::new();
        block_on(session.save(&storage)).unwrap();

        let set = block_on(storage.load("part-17.png")).unwrap();
        assert_eq!(set.annotations.len(), 1);

        let mut other = fitted_session();
        other.import(set).unwrap();
        assert_eq!(other.export(), session.export());
    }

    #[test]
    fn test_save_without_image_fails() {
        let session = Session::new();
        let storage = MemoryStorage::new();
        assert!(matches!(
            block_on(session.save(&storage)),
            Err(StorageError::Other(_))
        ));
    }

    #[test]
    fn test_empty_catalog_default_type() {
        let session = Session::with_config(EngineConfig::default(), DefectCatalog::new(Vec::new()));
        assert_eq!(session.active_defect_type_id(), UNCATEGORIZED);
        assert_eq!(Session::new().active_defect_type_id(), "scratch");
    }
}

//! Builder session.
//!
//! The caller boundary around the drag-and-drop controller for one open builder
//! view. It gates controller operations by role, tracks which target user's page
//! is loaded, discards stale loads, keeps saves from overlapping and queues the
//! user-visible notifications.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use uuid::Uuid;

use crate::{
    controller::{DragController, DragOutcome, DragSource, PointerPosition},
    error::{BuilderError, RepositoryError},
    grouping::{RenderPlan, group_sections},
    models::{Layout, PageConfig, Section, SectionId, SectionPatch},
    permissions::{Capabilities, Permission, Role, require_permission},
    repository::Repository,
};

const LOAD_FAILED: &str = "Failed to load saved page";
const SAVE_SUCCEEDED: &str = "Page saved successfully";
const SAVE_FAILED: &str = "Failed to save page";
const SELECT_TARGET: &str = "Please select a user";

/// SessionContext
///
/// Identity and role of the signed-in user, passed explicitly into the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionContext {
    pub user_id: Uuid,
    pub role: Role,
}

impl SessionContext {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities::for_role(self.role)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// Notice
///
/// A transient toast shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn success(message: &str) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.to_string(),
        }
    }

    fn error(message: &str) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.to_string(),
        }
    }
}

/// LoadTicket
///
/// Handle for one in-flight load. Selecting another target flips the ticket's
/// cancellation flag, and `complete_load` then drops its result.
#[derive(Debug, Clone)]
pub struct LoadTicket {
    target: Uuid,
    cancelled: Arc<AtomicBool>,
}

impl LoadTicket {
    fn new(target: Uuid) -> Self {
        Self {
            target,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn target(&self) -> Uuid {
        self.target
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    Reset,
    Failed,
    Discarded,
}

/// SaveTicket
///
/// Snapshot of the page handed to the adapter. Holding one means the save
/// affordance is disabled.
#[derive(Debug, Clone)]
pub struct SaveTicket {
    pub target: Uuid,
    pub config: PageConfig,
}

/// SectionControls
///
/// Per-section affordances shown on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionControls {
    pub editable: bool,
    pub deletable: bool,
    pub draggable: bool,
}

/// CanvasView
///
/// Everything the view layer needs to render one frame of the builder.
#[derive(Debug)]
pub struct CanvasView<'a> {
    pub plan: RenderPlan<'a>,
    pub controls: SectionControls,
    pub layout: Layout,
    pub show_palette: bool,
    pub show_user_selector: bool,
    pub show_save: bool,
    pub save_enabled: bool,
    pub loading: bool,
    pub selected_target: Option<Uuid>,
}

#[derive(Debug)]
pub struct BuilderSession {
    context: SessionContext,
    controller: DragController,
    layout: Layout,
    target: Option<Uuid>,
    pending_load: Option<LoadTicket>,
    save_pending: bool,
    notices: Vec<Notice>,
}

impl BuilderSession {
    /// Opens an empty session with no target selected.
    pub fn new(context: SessionContext) -> Self {
        Self {
            context,
            controller: DragController::default(),
            layout: Layout::default(),
            target: None,
            pending_load: None,
            save_pending: false,
            notices: Vec::new(),
        }
    }

    /// with_initial
    ///
    /// Opens a session already showing `target`'s page, as rendered on first request.
    pub fn with_initial(
        context: SessionContext,
        target: Uuid,
        initial: Option<PageConfig>,
    ) -> Self {
        let mut session = Self::new(context);
        session.target = Some(target);
        if let Some(config) = initial {
            session.apply(config);
        }
        session
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn sections(&self) -> &Arc<[Section]> {
        self.controller.sections()
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn selected_target(&self) -> Option<Uuid> {
        self.target
    }

    pub fn is_loading(&self) -> bool {
        self.pending_load.is_some()
    }

    pub fn is_save_pending(&self) -> bool {
        self.save_pending
    }

    pub fn current_config(&self) -> PageConfig {
        PageConfig {
            sections: self.controller.sections().to_vec(),
            layout: self.layout,
        }
    }

    /// Drains queued notifications.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    // --- View composition ---

    pub fn view(&self) -> CanvasView<'_> {
        let capabilities = self.context.capabilities();
        let manages = capabilities.manages_pages();
        CanvasView {
            plan: group_sections(self.controller.sections(), self.layout.cards_per_row),
            controls: SectionControls {
                editable: capabilities.can_edit,
                deletable: capabilities.can_delete,
                draggable: capabilities.is_draggable(),
            },
            layout: self.layout,
            show_palette: manages,
            show_user_selector: manages,
            show_save: manages,
            save_enabled: manages && !self.save_pending && self.pending_load.is_none(),
            loading: self.is_loading(),
            selected_target: self.target,
        }
    }

    // --- Gated editing ---

    pub fn update_section(
        &mut self,
        id: &SectionId,
        patch: &SectionPatch,
    ) -> Result<bool, BuilderError> {
        require_permission(self.context.role, Permission::Edit)?;
        Ok(self.controller.update_section(id, patch))
    }

    pub fn delete_section(&mut self, id: &SectionId) -> Result<bool, BuilderError> {
        require_permission(self.context.role, Permission::Delete)?;
        Ok(self.controller.delete_section(id))
    }

    pub fn set_cards_per_row(&mut self, cards_per_row: u8) -> Result<(), BuilderError> {
        self.require_manager()?;
        self.layout = Layout { cards_per_row };
        Ok(())
    }

    pub fn begin_drag(
        &mut self,
        source: DragSource,
        origin: PointerPosition,
    ) -> Result<(), BuilderError> {
        self.require_draggable()?;
        self.controller.begin_drag(source, origin);
        Ok(())
    }

    pub fn drag_move(&mut self, position: PointerPosition) -> bool {
        self.controller.drag_move(position)
    }

    pub fn drag_over(&mut self, target: Option<SectionId>) {
        self.controller.drag_over(target);
    }

    pub fn cancel_drag(&mut self) {
        self.controller.cancel_drag();
    }

    pub fn end_drag(&mut self) -> DragOutcome {
        let capabilities = self.context.capabilities();
        self.controller.end_drag(&capabilities)
    }

    /// Resolves a completed drag in one step, without gesture tracking.
    pub fn complete_drag(
        &mut self,
        source: &DragSource,
        target: Option<&SectionId>,
    ) -> Result<DragOutcome, BuilderError> {
        self.require_draggable()?;
        let capabilities = self.context.capabilities();
        Ok(self.controller.complete_drag(source, target, &capabilities))
    }

    fn require_draggable(&self) -> Result<(), BuilderError> {
        if self.context.capabilities().is_draggable() {
            Ok(())
        } else {
            Err(BuilderError::NotAllowed(self.context.role))
        }
    }

    fn require_manager(&self) -> Result<(), BuilderError> {
        if self.context.capabilities().manages_pages() {
            Ok(())
        } else {
            Err(BuilderError::NotAllowed(self.context.role))
        }
    }

    // --- Loading ---

    /// select_target
    ///
    /// Switches the target user. Any load still in flight is cancelled. Clearing the
    /// selection resets to an empty page; selecting the current target is a no-op.
    pub fn select_target(&mut self, target: Option<Uuid>) -> Option<LoadTicket> {
        if target == self.target {
            return None;
        }
        self.target = target;
        match target {
            Some(target) => Some(self.issue_load(target)),
            None => {
                self.cancel_pending_load();
                self.reset();
                None
            }
        }
    }

    /// Re-issues a load for the current target, e.g. after a failure.
    pub fn reload(&mut self) -> Option<LoadTicket> {
        let target = self.target?;
        Some(self.issue_load(target))
    }

    fn issue_load(&mut self, target: Uuid) -> LoadTicket {
        self.cancel_pending_load();
        let ticket = LoadTicket::new(target);
        self.pending_load = Some(ticket.clone());
        tracing::debug!(target_user = %target, "page load issued");
        ticket
    }

    fn cancel_pending_load(&mut self) {
        if let Some(previous) = self.pending_load.take() {
            previous.cancel();
        }
    }

    /// complete_load
    ///
    /// Applies the result of a load unless its ticket was cancelled in the meantime.
    /// A failed load falls back to an empty page and queues an error notice.
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<Option<PageConfig>, RepositoryError>,
    ) -> LoadOutcome {
        if ticket.is_cancelled() {
            tracing::warn!(target_user = %ticket.target, "discarding stale page load");
            return LoadOutcome::Discarded;
        }
        self.pending_load = None;

        match result {
            Ok(Some(config)) => {
                self.apply(config);
                LoadOutcome::Applied
            }
            Ok(None) => {
                self.reset();
                LoadOutcome::Reset
            }
            Err(e) => {
                tracing::warn!(target_user = %ticket.target, "page load failed: {}", e);
                self.reset();
                self.notices.push(Notice::error(LOAD_FAILED));
                LoadOutcome::Failed
            }
        }
    }

    fn apply(&mut self, config: PageConfig) {
        self.controller.replace(config.sections);
        self.layout = config.layout;
    }

    fn reset(&mut self) {
        self.controller.replace(Vec::new());
        self.layout = Layout::default();
    }

    // --- Saving ---

    /// begin_save
    ///
    /// Snapshots the page and disables the save affordance until `finish_save`.
    /// Refused while a load is pending: the sections on screen still belong to the
    /// previously selected user.
    pub fn begin_save(&mut self) -> Result<SaveTicket, BuilderError> {
        if self.save_pending {
            return Err(BuilderError::SaveInProgress);
        }
        if self.pending_load.is_some() {
            return Err(BuilderError::LoadInProgress);
        }
        let Some(target) = self.target else {
            self.notices.push(Notice::error(SELECT_TARGET));
            return Err(BuilderError::NoTargetSelected);
        };
        self.save_pending = true;
        Ok(SaveTicket {
            target,
            config: self.current_config(),
        })
    }

    /// finish_save
    ///
    /// Re-enables saving and queues exactly one notice. The in-memory page is never
    /// touched, whatever the outcome.
    pub fn finish_save(
        &mut self,
        ticket: SaveTicket,
        result: Result<(), RepositoryError>,
    ) -> Result<(), BuilderError> {
        self.save_pending = false;
        match result {
            Ok(()) => {
                tracing::info!(target_user = %ticket.target, "page saved");
                self.notices.push(Notice::success(SAVE_SUCCEEDED));
                Ok(())
            }
            Err(e) => {
                tracing::warn!(target_user = %ticket.target, "page save failed: {}", e);
                self.notices.push(Notice::error(SAVE_FAILED));
                Err(e.into())
            }
        }
    }

    /// Runs a full save against `repo`: snapshot, persist, report.
    pub async fn save<R: Repository + ?Sized>(&mut self, repo: &R) -> Result<(), BuilderError> {
        let ticket = self.begin_save()?;
        let result = repo
            .save_page(self.context.role, ticket.target, &ticket.config)
            .await;
        self.finish_save(ticket, result)
    }
}

/// fetch_page
///
/// Performs the asynchronous half of a load. The ticket is handed back so the
/// caller can pass both to `BuilderSession::complete_load`.
pub async fn fetch_page<R: Repository + ?Sized>(
    repo: &R,
    ticket: LoadTicket,
) -> (LoadTicket, Result<Option<PageConfig>, RepositoryError>) {
    let result = repo.get_page(ticket.target).await;
    (ticket, result)
}

//! Window-manager reconciliation after a load.
//!
//! A reload replaces the whole document, but the OS windows on screen must
//! survive: their native handles, GPU contexts and queued events live outside
//! the document and cannot be recreated cheaply. The reconciler merges the
//! previous session's window manager with the freshly loaded one.
//!
//! Per reload the setup moves through one of three branches:
//! `NoPriorWm -> UsingFreshWm | SubstitutingWindows | KeepingPriorWm`,
//! always ending `Finalized` — reconciliation cannot fail structurally, at
//! least one native window is kept alive by construction.

use tracing::{debug, warn};

use scar_model::{
    CopyFlags, Document, Id, IdCode, IdHandle, IdPayload, ModelError, ReportList, Window,
    WindowId, WindowManager,
};

/// Which branch a reconciliation took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WmSetupState {
    /// No window manager was running before the load.
    NoPriorWm,
    /// The freshly loaded (or synthesized) window manager is used as-is.
    UsingFreshWm,
    /// Live window resources were transplanted into the loaded manager and
    /// the prior manager was torn down.
    SubstitutingWindows,
    /// The prior manager stayed live and was re-pointed at the loaded
    /// workspaces and layouts.
    KeepingPriorWm,
    /// Terminal state; reconciliation completed.
    Finalized,
}

/// Summary of one reconciliation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Branch taken before reaching `Finalized`.
    pub state: WmSetupState,
    /// A default window manager had to be synthesized (archives written
    /// before window managers existed).
    pub synthesized_default: bool,
    /// Number of windows whose live resources were carried over.
    pub transplanted: usize,
    /// No window id matched and the first-window fallback was used.
    pub fallback_substitution: bool,
}

/// Merge the previous window manager into the freshly loaded `document`.
///
/// `old_wm` is the record pulled out of the previous document (if any);
/// `keep_ui` preserves the running interface instead of adopting the
/// archive's window layout.
///
/// Post-conditions: the document holds exactly one window manager, and no
/// record of a discarded manager remains reachable from it.
pub fn reconcile_window_manager(
    document: &mut Document,
    old_wm: Option<Id>,
    keep_ui: bool,
    reports: &mut ReportList,
) -> Result<ReconcileOutcome, ModelError> {
    let mut outcome = ReconcileOutcome {
        state: WmSetupState::NoPriorWm,
        synthesized_default: false,
        transplanted: 0,
        fallback_substitution: false,
    };

    match old_wm {
        None => {
            outcome.synthesized_default = ensure_window_manager(document)?.1;
            outcome.state = WmSetupState::UsingFreshWm;
        }
        Some(old) => {
            let old = into_window_manager(old)?;
            if keep_ui {
                keep_prior_manager(document, old)?;
                outcome.state = WmSetupState::KeepingPriorWm;
            } else {
                outcome = substitute_windows(document, old, reports, outcome)?;
                outcome.state = WmSetupState::SubstitutingWindows;
            }
        }
    }

    debug_assert_eq!(document.count_of(IdCode::WINDOW_MANAGER), 1);
    debug!(state = ?outcome.state, transplanted = outcome.transplanted, "window manager reconciled");
    Ok(outcome)
}

fn into_window_manager(old: Id) -> Result<Id, ModelError> {
    if old.code() != IdCode::WINDOW_MANAGER {
        return Err(ModelError::WrongIdType {
            expected: IdCode::WINDOW_MANAGER,
            actual: old.code(),
        });
    }
    Ok(old)
}

/// Make sure the document has a window manager, synthesizing a default one
/// for archives that predate them. Returns the handle and whether synthesis
/// happened.
fn ensure_window_manager(document: &mut Document) -> Result<(IdHandle, bool), ModelError> {
    if let Some(handle) = document.window_manager_handle() {
        return Ok((handle, false));
    }

    debug!("archive has no window manager, synthesizing a default one");
    let mut wm = WindowManager::new();
    let mut window = Window::new(WindowId(1));
    window.active = true;

    let workspace = document.handles_of(IdCode::WORKSPACE).next();
    if let Some(workspace) = workspace {
        window.hook.workspace = Some(workspace);
        window.hook.layout = 0;
        let screen = document
            .get(workspace)?
            .workspace()
            .and_then(|ws| ws.layouts.first())
            .map(|layout| layout.screen);
        if let Some(screen) = screen {
            if let Some(screen) = document.get_mut(screen)?.screen_mut() {
                screen.winid = Some(window.winid);
            }
        }
    }

    wm.windows.push(window);
    let handle = document.add(Id::new("Main", IdPayload::WindowManager(wm)));
    if let Some(workspace) = workspace {
        document.get_mut(workspace)?.users += 1;
    }
    Ok((handle, true))
}

/// Carry live resources from `old` into the loaded manager, then tear the
/// old manager down.
fn substitute_windows(
    document: &mut Document,
    old: Id,
    reports: &mut ReportList,
    mut outcome: ReconcileOutcome,
) -> Result<ReconcileOutcome, ModelError> {
    let IdPayload::WindowManager(mut old_wm) = old.payload else {
        unreachable!("checked by into_window_manager");
    };

    let (wm_handle, synthesized) = ensure_window_manager(document)?;
    outcome.synthesized_default = synthesized;

    let wm = document
        .get_mut(wm_handle)?
        .window_manager_mut()
        .expect("handle points at a window manager");

    for window in &mut wm.windows {
        if let Some(old_window) = old_wm.window_by_id_mut(window.winid) {
            substitute_window(old_window, window);
            outcome.transplanted += 1;
        }
    }

    // Nothing matched: keep at least one native window alive by moving the
    // first prior window's resources into the first loaded window. This can
    // discard the identity of a previously active window; it is reported
    // rather than silent.
    if outcome.transplanted == 0 {
        if let (Some(old_window), Some(window)) =
            (old_wm.windows.first_mut(), wm.windows.first_mut())
        {
            warn!(
                old = %old_window.winid,
                new = %window.winid,
                "no window ids matched, substituting into the first loaded window"
            );
            reports.warning(format!(
                "No loaded window matches a previous window; window {} takes over the \
                 resources of window {}",
                window.winid, old_window.winid
            ));
            substitute_window(old_window, window);
            outcome.transplanted = 1;
            outcome.fallback_substitution = true;
        }
    }

    // Teardown of the prior manager: release its reports timer and drop it.
    // Windows that transplanted their resources hold none anymore; windows
    // that matched nothing close with the manager.
    let _ = old_wm.take_reports_timer();
    drop(old_wm);

    Ok(outcome)
}

/// Move the live resources of `old_window` into `window`, nulling them on
/// the old window so its teardown does not close them.
fn substitute_window(old_window: &mut Window, window: &mut Window) {
    window.native = old_window.native.take();
    window.gpu = old_window.gpu.take();
    window.events = std::mem::take(&mut old_window.events);
    window.active = old_window.active;
    old_window.active = false;

    // Keep the on-screen geometry of the real window so the loaded screens
    // rescale against it.
    window.pos = old_window.pos;
    window.size = old_window.size;
}

/// The prior manager stays live: discard the archive's own manager and
/// re-point every window at the newly loaded workspaces and layouts.
fn keep_prior_manager(document: &mut Document, mut old: Id) -> Result<(), ModelError> {
    if let Some(fresh) = document.window_manager_handle() {
        document.free_id(fresh)?;
    }

    let old_wm = old
        .window_manager_mut()
        .expect("checked by into_window_manager");
    let mut windows = std::mem::take(&mut old_wm.windows);
    for window in &mut windows {
        repoint_window(document, window)?;
    }
    old.window_manager_mut()
        .expect("checked by into_window_manager")
        .windows = windows;

    document.add(old);
    Ok(())
}

/// Point `window` at the layout the loaded document holds for it.
///
/// The lookup is keyed solely by the window's stable id: the workspace whose
/// relation list mentions the id wins, the first workspace is the fallback.
/// An unclaimed screen is assigned directly; a screen already claimed by
/// another window is duplicated so two windows never alias one mutable
/// screen.
fn repoint_window(document: &mut Document, window: &mut Window) -> Result<(), ModelError> {
    let workspace_handle = workspace_for_window(document, window.winid)
        .or_else(|| document.handles_of(IdCode::WORKSPACE).next());
    let Some(workspace_handle) = workspace_handle else {
        // Nothing to show; the window keeps running without a workspace.
        window.hook.workspace = None;
        window.hook.layout = 0;
        return Ok(());
    };

    let workspace = document
        .get(workspace_handle)?
        .workspace()
        .expect("handle points at a workspace");
    if workspace.layouts.is_empty() {
        window.hook.workspace = None;
        window.hook.layout = 0;
        return Ok(());
    }
    let layout_index = workspace
        .active_layout_for(window.winid)
        .unwrap_or(0)
        .min(workspace.layouts.len() - 1);
    let screen_handle = workspace.layouts[layout_index].screen;

    let claimed_by_other = document
        .get(screen_handle)?
        .screen()
        .and_then(|screen| screen.winid)
        .is_some_and(|claim| claim != window.winid);

    let final_index = if claimed_by_other {
        // Duplicate the layout: deep-copy its screen and wrap the copy.
        let screen_copy = document.copy_id(screen_handle, CopyFlags::empty())?;
        if let Some(screen) = document.get_mut(screen_copy)?.screen_mut() {
            screen.winid = Some(window.winid);
        }
        let workspace = document
            .get_mut(workspace_handle)?
            .workspace_mut()
            .expect("handle points at a workspace");
        let name = workspace.layouts[layout_index].name.clone();
        let index = workspace.add_layout(name, screen_copy);
        document.get_mut(screen_copy)?.users += 1;
        index
    } else {
        if let Some(screen) = document.get_mut(screen_handle)?.screen_mut() {
            screen.winid = Some(window.winid);
        }
        layout_index
    };

    let workspace = document
        .get_mut(workspace_handle)?
        .workspace_mut()
        .expect("handle points at a workspace");
    workspace.set_active_layout(window.winid, final_index);

    window.hook.workspace = Some(workspace_handle);
    window.hook.layout = final_index;
    document.get_mut(workspace_handle)?.users += 1;
    Ok(())
}

/// The workspace whose relation list mentions `winid`, if any.
fn workspace_for_window(document: &Document, winid: WindowId) -> Option<IdHandle> {
    document.handles_of(IdCode::WORKSPACE).find(|&handle| {
        document
            .get(handle)
            .ok()
            .and_then(Id::workspace)
            .is_some_and(|workspace| workspace.active_layout_for(winid).is_some())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use scar_model::{GpuContext, IdTags, NativeHandle, Screen, TimerHandle, WorkSpace};

    /// New-style document: screens, one workspace, one window manager whose
    /// windows have no live resources yet (as freshly decoded).
    fn loaded_document(window_ids: &[u32]) -> Document {
        let mut document = Document::new();
        let s1 = document.add(Id::new("Default", IdPayload::Screen(Screen::new(2))));
        let mut workspace = WorkSpace::new();
        workspace.add_layout("Default", s1);
        let ws = document.add(Id::new("General", IdPayload::WorkSpace(workspace)));
        document.get_mut(s1).unwrap().users = 1;

        let mut wm = WindowManager::new();
        for &id in window_ids {
            let mut window = Window::new(WindowId(id));
            window.hook.workspace = Some(ws);
            wm.windows.push(window);
        }
        document.add(Id::new("Main", IdPayload::WindowManager(wm)));
        document.get_mut(ws).unwrap().users += window_ids.len() as u32;
        document
    }

    fn live_window_manager(window_ids: &[u32]) -> Id {
        let mut wm = WindowManager::new();
        wm.reports_timer = Some(TimerHandle(77));
        for (n, &id) in window_ids.iter().enumerate() {
            let mut window = Window::new(WindowId(id));
            window.native = Some(NativeHandle(1000 + n as u64));
            window.gpu = Some(GpuContext(2000 + n as u64));
            window.active = n == 0;
            wm.windows.push(window);
        }
        Id::new("Main", IdPayload::WindowManager(wm))
    }

    #[test]
    fn test_no_prior_wm_uses_fresh_one() {
        let mut document = loaded_document(&[1]);
        let mut reports = ReportList::new();

        let outcome =
            reconcile_window_manager(&mut document, None, false, &mut reports).unwrap();
        assert_eq!(outcome.state, WmSetupState::UsingFreshWm);
        assert!(!outcome.synthesized_default);
        assert_eq!(document.count_of(IdCode::WINDOW_MANAGER), 1);
    }

    #[test]
    fn test_no_wm_anywhere_synthesizes_default() {
        let mut document = Document::new();
        let s1 = document.add(Id::new("Default", IdPayload::Screen(Screen::new(1))));
        let mut workspace = WorkSpace::new();
        workspace.add_layout("Default", s1);
        let ws = document.add(Id::new("General", IdPayload::WorkSpace(workspace)));
        document.get_mut(s1).unwrap().users = 1;
        let mut reports = ReportList::new();

        let outcome =
            reconcile_window_manager(&mut document, None, false, &mut reports).unwrap();
        assert!(outcome.synthesized_default);

        let wm_handle = document.window_manager_handle().unwrap();
        let wm = document.get(wm_handle).unwrap().window_manager().unwrap();
        assert_eq!(wm.windows.len(), 1);
        assert_eq!(wm.windows[0].hook.workspace, Some(ws));
        assert_eq!(document.get(ws).unwrap().users, 1);
    }

    #[test]
    fn test_substitution_by_matching_window_id() {
        let mut document = loaded_document(&[1, 2]);
        let old = live_window_manager(&[2, 1]);
        let mut reports = ReportList::new();

        let outcome =
            reconcile_window_manager(&mut document, Some(old), false, &mut reports).unwrap();
        assert_eq!(outcome.state, WmSetupState::SubstitutingWindows);
        assert_eq!(outcome.transplanted, 2);
        assert!(!outcome.fallback_substitution);

        let wm_handle = document.window_manager_handle().unwrap();
        let wm = document.get(wm_handle).unwrap().window_manager().unwrap();
        // Window 1 got the resources the prior window 1 held (index 1 in the
        // old manager).
        let win1 = wm.window_by_id(WindowId(1)).unwrap();
        assert_eq!(win1.native, Some(NativeHandle(1001)));
        assert_eq!(win1.gpu, Some(GpuContext(2001)));
        let win2 = wm.window_by_id(WindowId(2)).unwrap();
        assert_eq!(win2.native, Some(NativeHandle(1000)));
        assert!(win2.active);
        assert!(!reports.has_errors());
    }

    #[test]
    fn test_substitution_fallback_is_reported() {
        let mut document = loaded_document(&[9]);
        let old = live_window_manager(&[1]);
        let mut reports = ReportList::new();

        let outcome =
            reconcile_window_manager(&mut document, Some(old), false, &mut reports).unwrap();
        assert!(outcome.fallback_substitution);
        assert_eq!(outcome.transplanted, 1);
        assert_eq!(reports.warning_count(), 1);

        let wm_handle = document.window_manager_handle().unwrap();
        let wm = document.get(wm_handle).unwrap().window_manager().unwrap();
        // The surviving native window lives on under the new id.
        assert_eq!(wm.windows[0].native, Some(NativeHandle(1000)));
    }

    #[test]
    fn test_keep_ui_repoints_at_loaded_layout() {
        // The loaded workspace prescribes layout 1 for window 1 via its
        // relation list.
        let mut document = Document::new();
        let s1 = document.add(Id::new("Old", IdPayload::Screen(Screen::new(1))));
        let s2 = document.add(Id::new("NewDefault", IdPayload::Screen(Screen::new(2))));
        let mut workspace = WorkSpace::new();
        workspace.add_layout("Old", s1);
        workspace.add_layout("NewDefault", s2);
        workspace.set_active_layout(WindowId(1), 1);
        let ws = document.add(Id::new("General", IdPayload::WorkSpace(workspace)));
        document.get_mut(s1).unwrap().users = 1;
        document.get_mut(s2).unwrap().users = 1;

        let old = live_window_manager(&[1]);
        let mut reports = ReportList::new();

        let outcome =
            reconcile_window_manager(&mut document, Some(old), true, &mut reports).unwrap();
        assert_eq!(outcome.state, WmSetupState::KeepingPriorWm);

        let wm_handle = document.window_manager_handle().unwrap();
        let wm = document.get(wm_handle).unwrap().window_manager().unwrap();
        let window = wm.window_by_id(WindowId(1)).unwrap();
        // The prior manager survived with its resources...
        assert_eq!(window.native, Some(NativeHandle(1000)));
        // ...but now shows the loaded workspace's layout for this window.
        assert_eq!(window.hook.workspace, Some(ws));
        assert_eq!(window.hook.layout, 1);
        let screen = document.get(s2).unwrap().screen().unwrap();
        assert_eq!(screen.winid, Some(WindowId(1)));
    }

    #[test]
    fn test_keep_ui_duplicates_claimed_screen() {
        // Two live windows, one loaded layout whose screen both would claim:
        // the second window must get a duplicated screen, never an alias.
        let mut document = Document::new();
        let s1 = document.add(Id::new("Default", IdPayload::Screen(Screen::new(1))));
        let mut workspace = WorkSpace::new();
        workspace.add_layout("Default", s1);
        let ws = document.add(Id::new("General", IdPayload::WorkSpace(workspace)));
        document.get_mut(s1).unwrap().users = 1;

        let old = live_window_manager(&[1, 2]);
        let mut reports = ReportList::new();

        reconcile_window_manager(&mut document, Some(old), true, &mut reports).unwrap();

        let wm_handle = document.window_manager_handle().unwrap();
        let wm = document.get(wm_handle).unwrap().window_manager().unwrap();
        let first = wm.window_by_id(WindowId(1)).unwrap();
        let second = wm.window_by_id(WindowId(2)).unwrap();

        let workspace = document.get(ws).unwrap().workspace().unwrap();
        assert_eq!(workspace.layouts.len(), 2);
        let first_screen = workspace.layouts[first.hook.layout].screen;
        let second_screen = workspace.layouts[second.hook.layout].screen;
        assert_ne!(first_screen, second_screen);
        assert_eq!(
            document.get(second_screen).unwrap().screen().unwrap().winid,
            Some(WindowId(2))
        );
        // The duplicated screen is a real record with its own single user.
        assert_eq!(document.get(second_screen).unwrap().users, 1);
        assert!(!document
            .get(second_screen)
            .unwrap()
            .tags
            .contains(IdTags::NO_MAIN));
    }

    #[test]
    fn test_keep_ui_discards_fresh_window_manager() {
        let mut document = loaded_document(&[5]);
        let old = live_window_manager(&[1]);
        let mut reports = ReportList::new();

        reconcile_window_manager(&mut document, Some(old), true, &mut reports).unwrap();

        let wm_handle = document.window_manager_handle().unwrap();
        let wm = document.get(wm_handle).unwrap().window_manager().unwrap();
        // Only the prior manager's window remains; the archive's window 5
        // is gone with its manager.
        assert_eq!(wm.windows.len(), 1);
        assert_eq!(wm.windows[0].winid, WindowId(1));
        assert_eq!(document.count_of(IdCode::WINDOW_MANAGER), 1);
    }

    #[test]
    fn test_wrong_id_type_is_rejected() {
        let mut document = loaded_document(&[1]);
        let bogus = Id::new("NotAWm", IdPayload::Screen(Screen::new(1)));
        let mut reports = ReportList::new();

        let err = reconcile_window_manager(&mut document, Some(bogus), false, &mut reports)
            .unwrap_err();
        assert!(matches!(err, ModelError::WrongIdType { .. }));
    }
}

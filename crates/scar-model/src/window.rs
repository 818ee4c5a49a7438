//! Window manager and window entities.
//!
//! A [`WindowManager`] owns the ordered set of OS windows for one session.
//! The native handle, GPU context and event queue on a [`Window`] are live
//! resources created by the windowing toolkit; the loader never creates them
//! itself, it only transplants them between window generations during
//! reconciliation.

use std::collections::VecDeque;

use crate::ids::{IdHandle, WindowId};

/// Opaque handle to a native OS window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeHandle(pub u64);

/// Opaque handle to a GPU rendering context bound to one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuContext(pub u64);

/// Opaque handle to a timer owned by the window manager (reports timer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerHandle(pub u64);

/// One queued input/window event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowEvent {
    pub kind: u16,
    pub x: i32,
    pub y: i32,
}

/// Per-window record of which workspace and layout are currently shown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkSpaceInstanceHook {
    /// Active workspace record, if any.
    pub workspace: Option<IdHandle>,
    /// Index of the active layout within the active workspace.
    pub layout: usize,
}

/// One OS window and its live resources.
#[derive(Debug, Clone)]
pub struct Window {
    /// Stable id, preserved in the archive; the only key used to match
    /// windows across a reload.
    pub winid: WindowId,
    pub native: Option<NativeHandle>,
    pub gpu: Option<GpuContext>,
    pub events: VecDeque<WindowEvent>,
    pub active: bool,
    pub pos: (i32, i32),
    pub size: (u32, u32),
    pub hook: WorkSpaceInstanceHook,
}

impl Window {
    pub fn new(winid: WindowId) -> Self {
        Self {
            winid,
            native: None,
            gpu: None,
            events: VecDeque::new(),
            active: false,
            pos: (0, 0),
            size: (1280, 720),
            hook: WorkSpaceInstanceHook::default(),
        }
    }

    /// True when the window holds a native handle (it is actually open).
    pub fn has_native_resources(&self) -> bool {
        self.native.is_some()
    }
}

/// The set of OS windows for one session. Exactly one window manager is
/// live at a time.
#[derive(Debug, Clone, Default)]
pub struct WindowManager {
    pub windows: Vec<Window>,
    pub reports_timer: Option<TimerHandle>,
}

impl WindowManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn window_by_id(&self, winid: WindowId) -> Option<&Window> {
        self.windows.iter().find(|win| win.winid == winid)
    }

    pub fn window_by_id_mut(&mut self, winid: WindowId) -> Option<&mut Window> {
        self.windows.iter_mut().find(|win| win.winid == winid)
    }

    /// Release the reports timer, if one is still attached.
    pub fn take_reports_timer(&mut self) -> Option<TimerHandle> {
        self.reports_timer.take()
    }
}

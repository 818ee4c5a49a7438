//! Archive encoding.
//!
//! The loader does not export user documents; this module exists to produce
//! the built-in startup archive and test fixtures. It writes the same block
//! grammar `blocks.rs` reads.

use std::io::Write;

use scar_model::WindowId;

use crate::blocks::{
    BLOCK_END, BLOCK_GLOBAL, BLOCK_SCREEN, BLOCK_USERDEF, BLOCK_WINDOW_MANAGER, BLOCK_WORKSPACE,
};
use crate::header::{Endianness, FormatHeader, PointerSize};
use crate::layout_table::{TypeLayout, encode_layout_table};

/// Description of one window for [`ArchiveBuilder::window_manager`].
#[derive(Debug, Clone)]
pub struct WindowSpec {
    pub winid: WindowId,
    pub pos: (i32, i32),
    pub size: (u32, u32),
    pub active: bool,
    /// File-order index of the workspace this window shows, if any.
    pub workspace_index: Option<u32>,
    pub layout: u16,
}

impl WindowSpec {
    pub fn new(winid: WindowId) -> Self {
        Self {
            winid,
            pos: (0, 0),
            size: (1280, 720),
            active: false,
            workspace_index: None,
            layout: 0,
        }
    }

    #[must_use]
    pub fn showing(mut self, workspace_index: u32, layout: u16) -> Self {
        self.workspace_index = Some(workspace_index);
        self.layout = layout;
        self
    }

    #[must_use]
    pub fn active(mut self) -> Self {
        self.active = true;
        self
    }
}

/// Builds archive byte streams block by block.
#[derive(Debug, Clone)]
pub struct ArchiveBuilder {
    header: FormatHeader,
    legacy: bool,
    layout_bytes: Vec<u8>,
    blocks: Vec<([u8; 4], Vec<u8>)>,
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The type layouts every archive written by this build declares.
fn default_layout_table() -> Vec<TypeLayout> {
    vec![
        TypeLayout {
            code: u16::from_le_bytes(*b"SR"),
            size: 16,
        },
        TypeLayout {
            code: u16::from_le_bytes(*b"WS"),
            size: 48,
        },
        TypeLayout {
            code: u16::from_le_bytes(*b"WM"),
            size: 72,
        },
    ]
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self {
            header: FormatHeader {
                pointer_size: PointerSize::Eight,
                endianness: Endianness::Little,
                file_version: 400,
                file_format_version: 1,
            },
            legacy: false,
            layout_bytes: encode_layout_table(&default_layout_table()),
            blocks: Vec::new(),
        }
    }

    /// Use the legacy 12-byte header layout with the given portability
    /// markers.
    #[must_use]
    pub fn legacy_header(mut self, pointer_size: PointerSize, endianness: Endianness) -> Self {
        self.legacy = true;
        self.header.pointer_size = pointer_size;
        self.header.endianness = endianness;
        self.header.file_format_version = 0;
        self
    }

    #[must_use]
    pub fn version(mut self, file_version: u32) -> Self {
        self.header.file_version = file_version;
        self
    }

    /// Replace the type-layout section with arbitrary bytes (corruption
    /// fixtures).
    #[must_use]
    pub fn raw_layout_section(mut self, bytes: Vec<u8>) -> Self {
        self.layout_bytes = bytes;
        self
    }

    #[must_use]
    pub fn global(mut self, subversion: u32) -> Self {
        let mut payload = Vec::new();
        put_u32(&mut payload, subversion);
        self.blocks.push((BLOCK_GLOBAL, payload));
        self
    }

    #[must_use]
    pub fn user_prefs(mut self, ui_scale_percent: u32, theme: &str) -> Self {
        let mut payload = Vec::new();
        put_u32(&mut payload, ui_scale_percent);
        put_string(&mut payload, theme);
        self.blocks.push((BLOCK_USERDEF, payload));
        self
    }

    #[must_use]
    pub fn screen(mut self, name: &str, areas: u32, winid: Option<WindowId>) -> Self {
        let mut payload = Vec::new();
        put_string(&mut payload, name);
        put_u32(&mut payload, areas);
        put_u32(&mut payload, winid.map_or(0, |id| id.0));
        self.blocks.push((BLOCK_SCREEN, payload));
        self
    }

    /// `layouts` are `(name, screen file-order index)` pairs; `relations`
    /// are `(window id, layout index)` pairs.
    #[must_use]
    pub fn workspace(
        mut self,
        name: &str,
        layouts: &[(&str, u32)],
        relations: &[(WindowId, u16)],
    ) -> Self {
        let mut payload = Vec::new();
        put_string(&mut payload, name);
        put_u16(&mut payload, layouts.len() as u16);
        for (layout_name, screen_index) in layouts {
            put_string(&mut payload, layout_name);
            put_u32(&mut payload, *screen_index);
        }
        put_u16(&mut payload, relations.len() as u16);
        for (winid, layout) in relations {
            put_u32(&mut payload, winid.0);
            put_u16(&mut payload, *layout);
        }
        self.blocks.push((BLOCK_WORKSPACE, payload));
        self
    }

    #[must_use]
    pub fn window_manager(mut self, name: &str, windows: &[WindowSpec]) -> Self {
        let mut payload = Vec::new();
        put_string(&mut payload, name);
        put_u16(&mut payload, windows.len() as u16);
        for window in windows {
            put_u32(&mut payload, window.winid.0);
            put_i32(&mut payload, window.pos.0);
            put_i32(&mut payload, window.pos.1);
            put_u32(&mut payload, window.size.0);
            put_u32(&mut payload, window.size.1);
            payload.push(u8::from(window.active));
            put_u32(&mut payload, window.workspace_index.unwrap_or(u32::MAX));
            put_u16(&mut payload, window.layout);
        }
        self.blocks.push((BLOCK_WINDOW_MANAGER, payload));
        self
    }

    /// Append a block with an arbitrary code (forward-compatibility
    /// fixtures).
    #[must_use]
    pub fn raw_block(mut self, code: [u8; 4], payload: Vec<u8>) -> Self {
        self.blocks.push((code, payload));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        if self.legacy {
            out.extend_from_slice(&self.header.encode_legacy());
        } else {
            out.extend_from_slice(&self.header.encode_modern());
        }
        out.extend_from_slice(&self.layout_bytes);
        for (code, payload) in &self.blocks {
            out.extend_from_slice(code);
            put_u32(&mut out, payload.len() as u32);
            out.extend_from_slice(payload);
        }
        out.extend_from_slice(&BLOCK_END);
        put_u32(&mut out, 0);
        out
    }

    /// Build and gzip-compress the archive.
    pub fn build_gzip(&self) -> Vec<u8> {
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder
            .write_all(&self.build())
            .expect("in-memory gzip cannot fail");
        encoder.finish().expect("in-memory gzip cannot fail")
    }

    /// Build and zstd-compress the archive.
    pub fn build_zstd(&self) -> Vec<u8> {
        zstd::encode_all(self.build().as_slice(), 0).expect("in-memory zstd cannot fail")
    }
}

fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_i32(out: &mut Vec<u8>, value: i32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_string(out: &mut Vec<u8>, value: &str) {
    put_u16(out, value.len() as u16);
    out.extend_from_slice(value.as_bytes());
}

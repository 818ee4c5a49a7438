//! Block-level document population.
//!
//! After the header and type-layout table the archive is a flat sequence of
//! tagged blocks: `[4-byte code][u32 LE payload length][payload]`, terminated
//! by an `ENDB` block. Cross-references inside payloads use file-order
//! indices (the n-th `SCRN` block, the n-th `WSPC` block), which the loader
//! resolves to arena handles as it goes. Unknown block codes are skipped so
//! newer writers stay readable.

use std::io::Read;

use tracing::{debug, warn};

use scar_model::{
    Document, Id, IdHandle, IdPayload, ReportList, Screen, SkipFlags, Window, WindowId,
    WindowManager, WorkSpace,
};

use crate::error::{ArchiveError, Result};
use crate::filedata::FileData;

pub const BLOCK_GLOBAL: [u8; 4] = *b"GLOB";
pub const BLOCK_USERDEF: [u8; 4] = *b"USER";
pub const BLOCK_SCREEN: [u8; 4] = *b"SCRN";
pub const BLOCK_WORKSPACE: [u8; 4] = *b"WSPC";
pub const BLOCK_WINDOW_MANAGER: [u8; 4] = *b"WNDM";
pub const BLOCK_END: [u8; 4] = *b"ENDB";

/// User preferences embedded in an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPrefs {
    pub ui_scale_percent: u32,
    pub theme: String,
}

/// Everything produced by one successful decode.
#[derive(Debug)]
pub struct LoadedArchive {
    pub document: Document,
    /// Present unless the archive had no `USER` block or the caller skipped
    /// preferences.
    pub user_prefs: Option<UserPrefs>,
}

/// Read blocks from the validated context until the end block, populating a
/// fresh document.
pub fn read_document(fd: &mut FileData, reports: &mut ReportList) -> Result<LoadedArchive> {
    let skip = fd.skip;
    let mut document = Document::new();
    document.version = fd.file_version;

    let mut user_prefs = None;
    let mut screens: Vec<IdHandle> = Vec::new();
    let mut workspaces: Vec<IdHandle> = Vec::new();
    let mut seen_window_manager = false;

    loop {
        let Some((code, payload)) = read_block(fd.stream_mut())? else {
            return Err(ArchiveError::format_failure(
                "unexpected end of archive, end block missing",
            ));
        };

        match code {
            BLOCK_END => break,
            BLOCK_GLOBAL => {
                let mut payload = Payload::new(&payload, "GLOB");
                document.subversion = payload.u32()?;
            }
            BLOCK_USERDEF => {
                if skip.contains(SkipFlags::USERDEF) {
                    debug!("skipping embedded user preferences");
                    continue;
                }
                let mut payload = Payload::new(&payload, "USER");
                user_prefs = Some(UserPrefs {
                    ui_scale_percent: payload.u32()?,
                    theme: payload.string()?,
                });
            }
            BLOCK_SCREEN => {
                if skip.contains(SkipFlags::DATA) {
                    continue;
                }
                screens.push(read_screen(&payload, &mut document)?);
            }
            BLOCK_WORKSPACE => {
                if skip.contains(SkipFlags::DATA) {
                    continue;
                }
                workspaces.push(read_workspace(&payload, &mut document, &screens)?);
            }
            BLOCK_WINDOW_MANAGER => {
                if skip.contains(SkipFlags::DATA) {
                    continue;
                }
                if seen_window_manager {
                    reports.warning("archive contains more than one window manager, extra ones ignored");
                    continue;
                }
                seen_window_manager = true;
                read_window_manager(&payload, &mut document, &workspaces)?;
            }
            unknown => {
                debug!(code = ?String::from_utf8_lossy(&unknown), len = payload.len(), "skipping unknown block");
            }
        }
    }

    Ok(LoadedArchive {
        document,
        user_prefs,
    })
}

fn read_screen(payload: &[u8], document: &mut Document) -> Result<IdHandle> {
    let mut payload = Payload::new(payload, "SCRN");
    let name = payload.string()?;
    let areas = payload.u32()?;
    let winid = payload.u32()?;

    let mut screen = Screen::new(areas);
    if winid != 0 {
        screen.winid = Some(WindowId(winid));
    }
    Ok(document.add(Id::new(name, IdPayload::Screen(screen))))
}

fn read_workspace(
    payload: &[u8],
    document: &mut Document,
    screens: &[IdHandle],
) -> Result<IdHandle> {
    let mut payload = Payload::new(payload, "WSPC");
    let name = payload.string()?;
    let mut workspace = WorkSpace::new();

    let layout_count = payload.u16()?;
    for _ in 0..layout_count {
        let layout_name = payload.string()?;
        let screen_index = payload.u32()? as usize;
        let screen = *screens.get(screen_index).ok_or_else(|| {
            ArchiveError::format_failure(format!(
                "workspace '{name}' references missing screen {screen_index}"
            ))
        })?;
        workspace.add_layout(layout_name, screen);
    }

    let relation_count = payload.u16()?;
    for _ in 0..relation_count {
        let winid = WindowId(payload.u32()?);
        let layout = payload.u16()? as usize;
        if layout >= workspace.layouts.len() {
            warn!(%winid, layout, "dropping layout relation pointing past the layout list");
            continue;
        }
        workspace.set_active_layout(winid, layout);
    }

    // Each layout owns a user of its screen.
    let referenced: Vec<IdHandle> = workspace.layouts.iter().map(|layout| layout.screen).collect();
    let handle = document.add(Id::new(name, IdPayload::WorkSpace(workspace)));
    for screen in referenced {
        document.get_mut(screen).map_err(map_model_error)?.users += 1;
    }
    Ok(handle)
}

fn read_window_manager(
    payload: &[u8],
    document: &mut Document,
    workspaces: &[IdHandle],
) -> Result<IdHandle> {
    let mut payload = Payload::new(payload, "WNDM");
    let name = payload.string()?;
    let mut wm = WindowManager::new();
    let mut referenced = Vec::new();

    let window_count = payload.u16()?;
    for _ in 0..window_count {
        let winid = WindowId(payload.u32()?);
        let mut window = Window::new(winid);
        window.pos = (payload.i32()?, payload.i32()?);
        window.size = (payload.u32()?, payload.u32()?);
        window.active = payload.u8()? != 0;

        let workspace_index = payload.u32()?;
        if workspace_index != u32::MAX {
            let workspace =
                *workspaces.get(workspace_index as usize).ok_or_else(|| {
                    ArchiveError::format_failure(format!(
                        "window {winid} references missing workspace {workspace_index}"
                    ))
                })?;
            window.hook.workspace = Some(workspace);
            referenced.push(workspace);
        }
        window.hook.layout = payload.u16()? as usize;
        wm.windows.push(window);
    }

    let handle = document.add(Id::new(name, IdPayload::WindowManager(wm)));
    for workspace in referenced {
        document.get_mut(workspace).map_err(map_model_error)?.users += 1;
    }
    Ok(handle)
}

fn map_model_error(err: scar_model::ModelError) -> ArchiveError {
    ArchiveError::format_failure(err.to_string())
}

/// Read one block head + payload. `None` at a clean end of stream.
fn read_block(reader: &mut impl Read) -> Result<Option<([u8; 4], Vec<u8>)>> {
    let mut head = [0u8; 8];
    let mut filled = 0;
    while filled < head.len() {
        let n = reader.read(&mut head[filled..])?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(ArchiveError::format_failure("truncated block header"));
        }
        filled += n;
    }

    let code = [head[0], head[1], head[2], head[3]];
    let len = u32::from_le_bytes([head[4], head[5], head[6], head[7]]) as usize;

    let mut payload = vec![0u8; len];
    let mut filled = 0;
    while filled < len {
        let n = reader.read(&mut payload[filled..])?;
        if n == 0 {
            return Err(ArchiveError::format_failure(format!(
                "block {:?} truncated: expected {len} payload bytes, got {filled}",
                String::from_utf8_lossy(&code)
            )));
        }
        filled += n;
    }
    Ok(Some((code, payload)))
}

/// Cursor over one block payload with bounds-checked field reads.
struct Payload<'a> {
    data: &'a [u8],
    pos: usize,
    block: &'static str,
}

impl<'a> Payload<'a> {
    fn new(data: &'a [u8], block: &'static str) -> Self {
        Self {
            data,
            pos: 0,
            block,
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|&end| end <= self.data.len());
        let Some(end) = end else {
            return Err(ArchiveError::format_failure(format!(
                "block {} payload truncated at offset {}",
                self.block, self.pos
            )));
        };
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn i32(&mut self) -> Result<i32> {
        let bytes = self.take(4)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn string(&mut self) -> Result<String> {
        let len = self.u16()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| {
            ArchiveError::format_failure(format!(
                "block {} contains a non-UTF-8 string",
                self.block
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_bounds_checked() {
        let mut payload = Payload::new(&[1, 0], "TEST");
        assert_eq!(payload.u16().unwrap(), 1);
        assert!(payload.u32().is_err());
    }

    #[test]
    fn test_payload_string() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&5u16.to_le_bytes());
        bytes.extend_from_slice(b"Scene");
        let mut payload = Payload::new(&bytes, "TEST");
        assert_eq!(payload.string().unwrap(), "Scene");
    }

    #[test]
    fn test_read_block_clean_eof() {
        let mut cursor = std::io::Cursor::new(Vec::new());
        assert!(read_block(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn test_read_block_truncated_payload() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&BLOCK_GLOBAL);
        bytes.extend_from_slice(&10u32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 4]);
        let err = read_block(&mut std::io::Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, ArchiveError::FormatFailure { .. }));
    }
}

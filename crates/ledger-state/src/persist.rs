//! Savepoint stack persistence.
//!
//! File layout: `[header][savepoints]`. The header is a single 32-bit
//! little-endian dirty flag. The body is a varuint-counted sequence of
//! savepoints, each `seq:i64` followed by a varuint-counted sequence of
//! actions `op:u16, type:u16, key, value`; byte strings are
//! varuint-length-prefixed. All integers little-endian.
//!
//! Writing sets `dirty = 1`, streams the body, syncs, rewrites the
//! header to `dirty = 0`, and syncs again; a crash mid-persist leaves
//! the flag set and the next open refuses the file.

use crate::savepoints::{Savepoint, SavepointPayload};
use crate::{PersistentAction, StateError, StateResult};
use ledger_types::{ActionOp, TokenType};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

const DIRTY: u32 = 1;
const CLEAN: u32 = 0;

/// A savepoint in transportable form.
pub(crate) type MaterializedSavepoint = (i64, Vec<PersistentAction>);

/// Capture pre-images for every runtime savepoint from its own
/// snapshot; persistent savepoints copy through.
pub(crate) fn materialize(
    stack: &VecDeque<Savepoint>,
) -> StateResult<Vec<MaterializedSavepoint>> {
    let mut out = Vec::with_capacity(stack.len());
    for savepoint in stack {
        let actions = match &savepoint.payload {
            SavepointPayload::Persistent { actions } => actions.clone(),
            SavepointPayload::Runtime { snapshot, actions } => {
                let mut persistent = Vec::with_capacity(actions.len());
                for action in actions {
                    for entry in action.entries()? {
                        let value = match action.op {
                            ActionOp::Add => Vec::new(),
                            ActionOp::Update | ActionOp::Put | ActionOp::Delete => {
                                snapshot.get(entry.cf, &entry.bytes)?.unwrap_or_default()
                            }
                        };
                        persistent.push(PersistentAction {
                            op: action.op,
                            ty: entry.ty,
                            key: entry.bytes,
                            value,
                        });
                    }
                }
                persistent
            }
        };
        out.push((savepoint.seq, actions));
    }
    Ok(out)
}

fn push_varuint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            return;
        }
    }
}

fn push_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    push_varuint(buf, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

/// Write the materialized stack atomically behind the dirty flag.
pub(crate) fn write_file(path: &Path, stack: &[MaterializedSavepoint]) -> StateResult<()> {
    let mut body = Vec::new();
    push_varuint(&mut body, stack.len() as u64);
    for (seq, actions) in stack {
        body.extend_from_slice(&seq.to_le_bytes());
        push_varuint(&mut body, actions.len() as u64);
        for action in actions {
            body.extend_from_slice(&action.op.as_u16().to_le_bytes());
            body.extend_from_slice(&action.ty.as_u16().to_le_bytes());
            push_bytes(&mut body, &action.key);
            push_bytes(&mut body, &action.value);
        }
    }

    let io = |e: std::io::Error| StateError::Storage(e.into());
    let mut file = File::create(path).map_err(io)?;
    file.write_all(&DIRTY.to_le_bytes()).map_err(io)?;
    file.write_all(&body).map_err(io)?;
    file.sync_all().map_err(io)?;

    file.seek(SeekFrom::Start(0)).map_err(io)?;
    file.write_all(&CLEAN.to_le_bytes()).map_err(io)?;
    file.sync_all().map_err(io)?;
    Ok(())
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> StateResult<&'a [u8]> {
        if self.data.len() - self.pos < n {
            return Err(StateError::PersistDecode("truncated".to_string()));
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn read_u16(&mut self) -> StateResult<u16> {
        Ok(u16::from_le_bytes(self.take(2)?.try_into().expect("sized read")))
    }

    fn read_i64(&mut self) -> StateResult<i64> {
        Ok(i64::from_le_bytes(self.take(8)?.try_into().expect("sized read")))
    }

    fn read_varuint(&mut self) -> StateResult<u64> {
        let mut value = 0u64;
        let mut shift = 0u32;
        loop {
            let byte = self.take(1)?[0];
            if shift >= 64 {
                return Err(StateError::PersistDecode("varuint overflow".to_string()));
            }
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
        }
    }

    fn read_len_bytes(&mut self) -> StateResult<Vec<u8>> {
        let len = self.read_varuint()? as usize;
        Ok(self.take(len)?.to_vec())
    }
}

/// Load a persisted stack, refusing dirty files.
pub(crate) fn load_file(path: &Path) -> StateResult<Vec<MaterializedSavepoint>> {
    let io = |e: std::io::Error| StateError::Storage(e.into());
    let mut data = Vec::new();
    File::open(path).map_err(io)?.read_to_end(&mut data).map_err(io)?;

    let mut r = Reader { data: &data, pos: 0 };
    let dirty = u32::from_le_bytes(r.take(4)?.try_into().expect("sized read"));
    if dirty != CLEAN {
        return Err(StateError::DirtyFlag);
    }

    let savepoint_count = r.read_varuint()? as usize;
    let mut stack = Vec::with_capacity(savepoint_count.min(1024));
    for _ in 0..savepoint_count {
        let seq = r.read_i64()?;
        let action_count = r.read_varuint()? as usize;
        let mut actions = Vec::with_capacity(action_count.min(4096));
        for _ in 0..action_count {
            let op = ActionOp::from_u16(r.read_u16()?)
                .ok_or_else(|| StateError::PersistDecode("bad action op".to_string()))?;
            let ty = TokenType::from_u16(r.read_u16()?)
                .ok_or_else(|| StateError::PersistDecode("bad token type".to_string()))?;
            let key = r.read_len_bytes()?;
            let value = r.read_len_bytes()?;
            actions.push(PersistentAction { op, ty, key, value });
        }
        stack.push((seq, actions));
    }
    if r.pos != data.len() {
        return Err(StateError::PersistDecode("trailing bytes".to_string()));
    }
    Ok(stack)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_stack() -> Vec<MaterializedSavepoint> {
        vec![
            (
                1,
                vec![PersistentAction {
                    op: ActionOp::Add,
                    ty: TokenType::Domain,
                    key: vec![1; 32],
                    value: vec![],
                }],
            ),
            (
                2,
                vec![
                    PersistentAction {
                        op: ActionOp::Update,
                        ty: TokenType::Token,
                        key: vec![2; 32],
                        value: b"old".to_vec(),
                    },
                    PersistentAction {
                        op: ActionOp::Put,
                        ty: TokenType::Asset,
                        key: vec![3; 41],
                        value: b"10".to_vec(),
                    },
                ],
            ),
        ]
    }

    #[test]
    fn test_file_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("savepoints");
        let stack = sample_stack();

        write_file(&path, &stack).unwrap();
        let loaded = load_file(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].0, 1);
        assert_eq!(loaded[1].1, stack[1].1);
    }

    #[test]
    fn test_clean_flag_after_write() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("savepoints");
        write_file(&path, &sample_stack()).unwrap();

        let data = std::fs::read(&path).unwrap();
        assert_eq!(&data[..4], &CLEAN.to_le_bytes());
    }

    #[test]
    fn test_dirty_file_refused() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("savepoints");
        write_file(&path, &sample_stack()).unwrap();

        let mut data = std::fs::read(&path).unwrap();
        data[..4].copy_from_slice(&DIRTY.to_le_bytes());
        std::fs::write(&path, &data).unwrap();

        assert!(matches!(load_file(&path), Err(StateError::DirtyFlag)));
    }

    #[test]
    fn test_truncated_file_refused() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("savepoints");
        write_file(&path, &sample_stack()).unwrap();

        let data = std::fs::read(&path).unwrap();
        std::fs::write(&path, &data[..data.len() - 3]).unwrap();

        assert!(matches!(load_file(&path), Err(StateError::PersistDecode(_))));
    }

    #[test]
    fn test_empty_stack_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("savepoints");
        write_file(&path, &[]).unwrap();
        assert!(load_file(&path).unwrap().is_empty());
    }
}

//! Frame encoding for the write-ahead log, grounded on `storage/log.rs`'s
//! length-prefixed entry format, extended with a leading tag byte so the
//! log can carry `SET`/`DEL`/`ABORT` frames instead of just key/value pairs.
//!
//! Wire format per frame: `[u64 LE total_len][u8 tag][fields...]`, where
//! `total_len` counts everything after itself (the tag byte and fields).
//! `COMMIT` has no frame of its own: a transaction with no `abort` frame is
//! replayed as committed, mirroring `oplog.go::ReplayLog`.

use std::io::{Read, Write};

use crate::error::{CResult, Error};
use crate::txn::txid::TxId;

const TAG_SET: u8 = 1;
const TAG_DEL: u8 = 2;
const TAG_ABORT: u8 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalFrame {
    Set { tx: TxId, key: String, value: String },
    Del { tx: TxId, key: String },
    Abort { tx: TxId },
}

impl WalFrame {
    fn tag(&self) -> u8 {
        match self {
            WalFrame::Set { .. } => TAG_SET,
            WalFrame::Del { .. } => TAG_DEL,
            WalFrame::Abort { .. } => TAG_ABORT,
        }
    }

    pub fn tx_id(&self) -> TxId {
        match self {
            WalFrame::Set { tx, .. } | WalFrame::Del { tx, .. } | WalFrame::Abort { tx } => *tx,
        }
    }

    /// Encodes this frame's body (everything after the length prefix).
    fn encode_body(&self) -> Vec<u8> {
        let mut body = vec![self.tag()];
        match self {
            WalFrame::Set { tx, key, value } => {
                body.extend_from_slice(&tx.to_be_bytes());
                body.extend_from_slice(&(key.len() as u32).to_be_bytes());
                body.extend_from_slice(key.as_bytes());
                body.extend_from_slice(&(value.len() as u32).to_be_bytes());
                body.extend_from_slice(value.as_bytes());
            }
            WalFrame::Del { tx, key } => {
                body.extend_from_slice(&tx.to_be_bytes());
                body.extend_from_slice(&(key.len() as u32).to_be_bytes());
                body.extend_from_slice(key.as_bytes());
            }
            WalFrame::Abort { tx } => {
                body.extend_from_slice(&tx.to_be_bytes());
            }
        }
        body
    }

    /// Writes `[len][body]` to `w` and returns the number of bytes written.
    pub fn write_to<W: Write>(&self, w: &mut W) -> CResult<u64> {
        let body = self.encode_body();
        let len = body.len() as u64;
        w.write_all(&len.to_le_bytes())?;
        w.write_all(&body)?;
        Ok(8 + body.len() as u64)
    }

    /// Reads one `[len][body]` frame from `r`. Returns `Ok(None)` on a clean
    /// EOF between frames (nothing left to read).
    pub fn read_from<R: Read>(r: &mut R) -> CResult<Option<WalFrame>> {
        let mut len_buf = [0u8; 8];
        match r.read_exact(&mut len_buf) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(err) => return Err(err.into()),
        }
        let len = u64::from_le_bytes(len_buf) as usize;
        let mut body = vec![0u8; len];
        r.read_exact(&mut body).map_err(|err| {
            if err.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::Parse("truncated WAL frame at end of file".to_string())
            } else {
                Error::Io(err.to_string())
            }
        })?;
        Self::decode_body(&body).map(Some)
    }

    fn decode_body(body: &[u8]) -> CResult<WalFrame> {
        let mut cur = body;
        let tag = take_u8(&mut cur)?;
        let tx = take_u64(&mut cur)?;
        match tag {
            TAG_SET => {
                let key = take_string(&mut cur)?;
                let value = take_string(&mut cur)?;
                Ok(WalFrame::Set { tx, key, value })
            }
            TAG_DEL => {
                let key = take_string(&mut cur)?;
                Ok(WalFrame::Del { tx, key })
            }
            TAG_ABORT => Ok(WalFrame::Abort { tx }),
            other => Err(Error::Parse(format!("unknown WAL frame tag {other}"))),
        }
    }
}

fn take_u8(cur: &mut &[u8]) -> CResult<u8> {
    if cur.is_empty() {
        return Err(Error::Parse("WAL frame ended before tag byte".to_string()));
    }
    let (byte, rest) = cur.split_at(1);
    *cur = rest;
    Ok(byte[0])
}

fn take_u64(cur: &mut &[u8]) -> CResult<u64> {
    if cur.len() < 8 {
        return Err(Error::Parse("WAL frame ended before transaction id".to_string()));
    }
    let (bytes, rest) = cur.split_at(8);
    *cur = rest;
    Ok(u64::from_be_bytes(bytes.try_into().unwrap()))
}

fn take_string(cur: &mut &[u8]) -> CResult<String> {
    if cur.len() < 4 {
        return Err(Error::Parse("WAL frame ended before a length prefix".to_string()));
    }
    let (len_bytes, rest) = cur.split_at(4);
    let len = u32::from_be_bytes(len_bytes.try_into().unwrap()) as usize;
    *cur = rest;
    if cur.len() < len {
        return Err(Error::Parse("WAL frame ended before declared field length".to_string()));
    }
    let (bytes, rest) = cur.split_at(len);
    *cur = rest;
    String::from_utf8(bytes.to_vec()).map_err(|err| Error::Parse(err.to_string()))
}

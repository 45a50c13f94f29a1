//! Instruction and account encoding for the GIF board on-chain program.
//!
//! The program is an Anchor program: instructions and accounts are prefixed
//! with an 8-byte discriminator derived from their name, and payloads are
//! borsh-encoded.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::keys::{Pubkey, PUBKEY_LEN};
use crate::transaction::{AccountMeta, Instruction, SYSTEM_PROGRAM_ID};

const DISCRIMINATOR_LEN: usize = 8;

/// One stored entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub gif_link: String,
    pub user_address: Pubkey,
}

/// Decoded contents of the program's base account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BaseAccount {
    pub total_gifs: u64,
    pub gif_list: Vec<Record>,
}

pub fn instruction_discriminator(name: &str) -> [u8; DISCRIMINATOR_LEN] {
    discriminator("global", name)
}

pub fn account_discriminator(name: &str) -> [u8; DISCRIMINATOR_LEN] {
    discriminator("account", name)
}

fn discriminator(namespace: &str, name: &str) -> [u8; DISCRIMINATOR_LEN] {
    let hash = Sha256::digest(format!("{namespace}:{name}").as_bytes());
    let mut out = [0u8; DISCRIMINATOR_LEN];
    out.copy_from_slice(&hash[..DISCRIMINATOR_LEN]);
    out
}

/// One-time creation of the base account, paid for by `user`.
pub fn start_stuff_off(program_id: &Pubkey, base_account: &Pubkey, user: &Pubkey) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::writable(*base_account, true),
            AccountMeta::writable(*user, true),
            AccountMeta::readonly(SYSTEM_PROGRAM_ID, false),
        ],
        data: instruction_discriminator("start_stuff_off").to_vec(),
    }
}

pub fn add_gif(program_id: &Pubkey, base_account: &Pubkey, gif_link: &str) -> Instruction {
    let mut data = instruction_discriminator("add_gif").to_vec();
    put_string(&mut data, gif_link);
    Instruction {
        program_id: *program_id,
        accounts: vec![AccountMeta::writable(*base_account, false)],
        data,
    }
}

impl BaseAccount {
    pub fn decode(data: &[u8]) -> Result<Self, String> {
        let mut r = Reader::new(data);
        let disc = r.take(DISCRIMINATOR_LEN)?;
        if disc != account_discriminator("BaseAccount") {
            return Err("account discriminator mismatch".into());
        }
        let total_gifs = r.u64()?;
        let len = r.u32()? as usize;
        // Each item needs at least a length prefix and a key.
        if len > r.remaining() / (4 + PUBKEY_LEN) {
            return Err(format!("gif_list length {len} exceeds account data"));
        }
        let mut gif_list = Vec::with_capacity(len);
        for _ in 0..len {
            let gif_link = r.string()?;
            let user_address = Pubkey::try_from(r.take(PUBKEY_LEN)?).map_err(|e| e.to_string())?;
            gif_list.push(Record {
                gif_link,
                user_address,
            });
        }
        Ok(Self {
            total_gifs,
            gif_list,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = account_discriminator("BaseAccount").to_vec();
        out.extend_from_slice(&self.total_gifs.to_le_bytes());
        out.extend_from_slice(&(self.gif_list.len() as u32).to_le_bytes());
        for item in &self.gif_list {
            put_string(&mut out, &item.gif_link);
            out.extend_from_slice(item.user_address.as_bytes());
        }
        out
    }
}

fn put_string(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], String> {
        if self.remaining() < n {
            return Err(format!(
                "unexpected end of data at offset {} (wanted {n})",
                self.pos
            ));
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn u32(&mut self) -> Result<u32, String> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(buf))
    }

    fn u64(&mut self) -> Result<u64, String> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(buf))
    }

    fn string(&mut self) -> Result<String, String> {
        let len = self.u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|e| e.to_string())
    }
}

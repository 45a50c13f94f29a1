//! Legacy Solana transaction building: message compilation, signing slots and
//! wire encoding.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::keys::Pubkey;

pub const SYSTEM_PROGRAM_ID: Pubkey = Pubkey::new([0u8; 32]);

const MAX_TRANSACTION_LEN: usize = 1232;
const SIGNATURE_LEN: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountMeta {
    pub pubkey: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    pub fn writable(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: true,
        }
    }

    pub fn readonly(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    pub program_id: Pubkey,
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
}

/// A compiled legacy message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub num_required_signatures: u8,
    pub num_readonly_signed: u8,
    pub num_readonly_unsigned: u8,
    pub account_keys: Vec<Pubkey>,
    pub recent_blockhash: [u8; 32],
    instructions: Vec<CompiledInstruction>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct CompiledInstruction {
    program_index: u8,
    accounts: Vec<u8>,
    data: Vec<u8>,
}

#[derive(Clone, Copy)]
struct KeyFlags {
    signer: bool,
    writable: bool,
}

impl Message {
    /// Compile `instructions` with `payer` as the fee payer.
    ///
    /// Keys are ordered writable signers (payer first), readonly signers,
    /// writable non-signers, readonly non-signers. Program ids are readonly
    /// non-signers unless also used as an account elsewhere.
    pub fn compile(
        payer: &Pubkey,
        instructions: &[Instruction],
        recent_blockhash_base58: &str,
    ) -> Result<Self, String> {
        let blockhash_bytes = bs58::decode(recent_blockhash_base58)
            .into_vec()
            .map_err(|e| format!("invalid blockhash: {e}"))?;
        let recent_blockhash: [u8; 32] = blockhash_bytes
            .try_into()
            .map_err(|_| "invalid blockhash length".to_string())?;

        // Collect keys in first-seen order, merging flags.
        let mut keys: Vec<(Pubkey, KeyFlags)> = vec![(
            *payer,
            KeyFlags {
                signer: true,
                writable: true,
            },
        )];
        let mut merge = |pubkey: Pubkey, signer: bool, writable: bool| {
            match keys.iter_mut().find(|(k, _)| *k == pubkey) {
                Some((_, flags)) => {
                    flags.signer |= signer;
                    flags.writable |= writable;
                }
                None => keys.push((pubkey, KeyFlags { signer, writable })),
            }
        };
        for ix in instructions {
            for meta in &ix.accounts {
                merge(meta.pubkey, meta.is_signer, meta.is_writable);
            }
            merge(ix.program_id, false, false);
        }

        // Stable sort keeps first-seen order within each class.
        keys.sort_by_key(|(_, f)| match (f.signer, f.writable) {
            (true, true) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (false, false) => 3,
        });

        let count = |pred: fn(&KeyFlags) -> bool| keys.iter().filter(|(_, f)| pred(f)).count();
        let num_required_signatures = count(|f| f.signer);
        let num_readonly_signed = count(|f| f.signer && !f.writable);
        let num_readonly_unsigned = count(|f| !f.signer && !f.writable);
        if keys.len() > u8::MAX as usize {
            return Err("too many account keys".into());
        }

        let account_keys: Vec<Pubkey> = keys.into_iter().map(|(k, _)| k).collect();
        let index_of = |key: &Pubkey| -> u8 {
            // Every key was inserted above.
            account_keys.iter().position(|k| k == key).unwrap_or_default() as u8
        };

        let compiled = instructions
            .iter()
            .map(|ix| CompiledInstruction {
                program_index: index_of(&ix.program_id),
                accounts: ix.accounts.iter().map(|m| index_of(&m.pubkey)).collect(),
                data: ix.data.clone(),
            })
            .collect();

        Ok(Self {
            num_required_signatures: num_required_signatures as u8,
            num_readonly_signed: num_readonly_signed as u8,
            num_readonly_unsigned: num_readonly_unsigned as u8,
            account_keys,
            recent_blockhash,
            instructions: compiled,
        })
    }

    pub fn signers(&self) -> &[Pubkey] {
        &self.account_keys[..self.num_required_signatures as usize]
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut msg = Vec::with_capacity(MAX_TRANSACTION_LEN);

        // Header
        msg.push(self.num_required_signatures);
        msg.push(self.num_readonly_signed);
        msg.push(self.num_readonly_unsigned);

        append_shortvec(&mut msg, self.account_keys.len());
        for key in &self.account_keys {
            msg.extend_from_slice(key.as_bytes());
        }

        msg.extend_from_slice(&self.recent_blockhash);

        append_shortvec(&mut msg, self.instructions.len());
        for ix in &self.instructions {
            msg.push(ix.program_index);
            append_shortvec(&mut msg, ix.accounts.len());
            msg.extend_from_slice(&ix.accounts);
            append_shortvec(&mut msg, ix.data.len());
            msg.extend_from_slice(&ix.data);
        }
        msg
    }
}

/// A message plus one signature slot per required signer.
#[derive(Clone, Debug)]
pub struct Transaction {
    pub message: Message,
    signatures: Vec<Option<[u8; SIGNATURE_LEN]>>,
}

impl Transaction {
    pub fn new(message: Message) -> Self {
        let slots = message.num_required_signatures as usize;
        Self {
            message,
            signatures: vec![None; slots],
        }
    }

    pub fn message_bytes(&self) -> Vec<u8> {
        self.message.serialize()
    }

    /// Place `signature` in the slot belonging to `signer`.
    pub fn sign(&mut self, signer: &Pubkey, signature: [u8; SIGNATURE_LEN]) -> Result<(), String> {
        let slot = self
            .message
            .signers()
            .iter()
            .position(|k| k == signer)
            .ok_or_else(|| format!("{signer} is not a signer of this message"))?;
        self.signatures[slot] = Some(signature);
        Ok(())
    }

    pub fn is_fully_signed(&self) -> bool {
        self.signatures.iter().all(Option::is_some)
    }

    /// The fee payer's signature, which is also the transaction id.
    pub fn signature_base58(&self) -> Option<String> {
        self.signatures
            .first()
            .copied()
            .flatten()
            .map(|s| bs58::encode(s).into_string())
    }

    /// Wire encoding: `[sig count][signatures][message]`, base64.
    pub fn to_base64(&self) -> Result<String, String> {
        if !self.is_fully_signed() {
            return Err("transaction is missing signatures".into());
        }
        let msg = self.message.serialize();
        let mut tx = Vec::with_capacity(MAX_TRANSACTION_LEN);
        append_shortvec(&mut tx, self.signatures.len());
        for sig in self.signatures.iter().flatten() {
            tx.extend_from_slice(sig);
        }
        tx.extend_from_slice(&msg);
        if tx.len() > MAX_TRANSACTION_LEN {
            return Err(format!(
                "transaction too large: {} > {MAX_TRANSACTION_LEN}",
                tx.len()
            ));
        }
        Ok(STANDARD.encode(tx))
    }
}

/// Append a compact-u16 encoded value (Solana "shortvec").
fn append_shortvec(buf: &mut Vec<u8>, mut value: usize) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::Keypair;

    const BLOCKHASH: &str = "11111111111111111111111111111111";

    #[test]
    fn test_shortvec_encoding() {
        let mut buf = Vec::new();
        append_shortvec(&mut buf, 0);
        assert_eq!(buf, vec![0]);

        buf.clear();
        append_shortvec(&mut buf, 127);
        assert_eq!(buf, vec![127]);

        buf.clear();
        append_shortvec(&mut buf, 128);
        assert_eq!(buf, vec![0x80, 0x01]);

        buf.clear();
        append_shortvec(&mut buf, 0x3FFF);
        assert_eq!(buf, vec![0xFF, 0x7F]);
    }

    #[test]
    fn compile_orders_keys_by_role() {
        let payer = Pubkey::new([1; 32]);
        let extra_signer = Pubkey::new([2; 32]);
        let readonly = Pubkey::new([3; 32]);
        let program = Pubkey::new([9; 32]);

        let ix = Instruction {
            program_id: program,
            accounts: vec![
                AccountMeta::readonly(readonly, false),
                AccountMeta::writable(extra_signer, true),
                AccountMeta::writable(payer, true),
            ],
            data: vec![0xAA],
        };
        let msg = Message::compile(&payer, &[ix], BLOCKHASH).unwrap();

        assert_eq!(msg.account_keys, vec![payer, extra_signer, readonly, program]);
        assert_eq!(msg.num_required_signatures, 2);
        assert_eq!(msg.num_readonly_signed, 0);
        assert_eq!(msg.num_readonly_unsigned, 2);
        assert_eq!(msg.signers(), &[payer, extra_signer]);

        let bytes = msg.serialize();
        assert_eq!(&bytes[..4], &[2, 0, 2, 4]);
        // program index, 3 accounts, then data.
        let tail = &bytes[bytes.len() - 7..];
        assert_eq!(tail, &[3, 3, 2, 1, 0, 1, 0xAA]);
    }

    #[test]
    fn unsigned_transaction_does_not_encode() {
        let payer = Keypair::from_seed(&[1; 32]);
        let ix = Instruction {
            program_id: Pubkey::new([9; 32]),
            accounts: vec![],
            data: vec![],
        };
        let msg = Message::compile(&payer.pubkey(), &[ix], BLOCKHASH).unwrap();
        let mut tx = Transaction::new(msg);
        assert!(tx.to_base64().is_err());
        assert!(tx.signature_base58().is_none());

        let sig = payer.sign(&tx.message_bytes());
        tx.sign(&payer.pubkey(), sig).unwrap();
        assert!(tx.is_fully_signed());
        assert_eq!(tx.signature_base58(), Some(bs58::encode(sig).into_string()));

        let decoded = STANDARD.decode(tx.to_base64().unwrap()).unwrap();
        assert_eq!(decoded[0], 1);
        assert_eq!(&decoded[1..65], &sig);
        assert_eq!(&decoded[65..], tx.message_bytes().as_slice());
    }

    #[test]
    fn sign_rejects_non_signer() {
        let payer = Pubkey::new([1; 32]);
        let msg = Message::compile(&payer, &[], BLOCKHASH).unwrap();
        let mut tx = Transaction::new(msg);
        assert!(tx.sign(&Pubkey::new([2; 32]), [0; 64]).is_err());
    }

    #[test]
    fn compile_rejects_bad_blockhash() {
        assert!(Message::compile(&Pubkey::new([1; 32]), &[], "abc").is_err());
    }
}

//! Legacy ledger transactions: instruction building, message compilation,
//! signing and wire serialization

use crate::encoding::{read_shortvec_len, write_shortvec_len};
use crate::error::ParseError;
use crate::keys::{verify_signature, Keypair};
use crate::models::{Address, Lamports, Signature};

/// System program instruction index for a lamport transfer
const SYSTEM_TRANSFER: u32 = 2;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountMeta {
    pub address: Address,
    pub is_signer: bool,
    pub is_writable: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    pub program_id: Address,
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
}

/// Move `lamports` from `from` to `to` through the system program
pub fn system_transfer(from: &Address, to: &Address, lamports: Lamports) -> Instruction {
    let mut data = Vec::with_capacity(12);
    data.extend_from_slice(&SYSTEM_TRANSFER.to_le_bytes());
    data.extend_from_slice(&lamports.0.to_le_bytes());
    Instruction {
        program_id: Address::system_program(),
        accounts: vec![
            AccountMeta { address: *from, is_signer: true, is_writable: true },
            AccountMeta { address: *to, is_signer: false, is_writable: true },
        ],
        data,
    }
}

/// Decode a system transfer instruction back into (from, to, lamports)
pub fn parse_system_transfer(
    message: &Message,
    ix: &CompiledInstruction,
) -> Option<(Address, Address, Lamports)> {
    let program = message.account_keys.get(ix.program_id_index as usize)?;
    if *program != Address::system_program() || ix.data.len() != 12 || ix.accounts.len() != 2 {
        return None;
    }
    let kind = u32::from_le_bytes(ix.data[0..4].try_into().ok()?);
    if kind != SYSTEM_TRANSFER {
        return None;
    }
    let lamports = u64::from_le_bytes(ix.data[4..12].try_into().ok()?);
    let from = message.account_keys.get(ix.accounts[0] as usize)?;
    let to = message.account_keys.get(ix.accounts[1] as usize)?;
    Some((*from, *to, Lamports(lamports)))
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MessageHeader {
    pub num_required_signatures: u8,
    pub num_readonly_signed_accounts: u8,
    pub num_readonly_unsigned_accounts: u8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub accounts: Vec<u8>,
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub header: MessageHeader,
    pub account_keys: Vec<Address>,
    pub recent_blockhash: [u8; 32],
    pub instructions: Vec<CompiledInstruction>,
}

/// Per-account flags gathered while compiling
struct KeyEntry {
    address: Address,
    is_signer: bool,
    is_writable: bool,
}

impl Message {
    /// Compile instructions into a message. Keys are ordered fee payer first,
    /// then writable signers, readonly signers, writable and readonly others.
    pub fn new(
        instructions: &[Instruction],
        payer: &Address,
        recent_blockhash: [u8; 32],
    ) -> Result<Self, ParseError> {
        let mut entries: Vec<KeyEntry> = vec![KeyEntry {
            address: *payer,
            is_signer: true,
            is_writable: true,
        }];

        let mut upsert = |address: Address, is_signer: bool, is_writable: bool| {
            if let Some(entry) = entries.iter_mut().find(|e| e.address == address) {
                entry.is_signer |= is_signer;
                entry.is_writable |= is_writable;
            } else {
                entries.push(KeyEntry { address, is_signer, is_writable });
            }
        };

        for ix in instructions {
            for meta in &ix.accounts {
                upsert(meta.address, meta.is_signer, meta.is_writable);
            }
            upsert(ix.program_id, false, false);
        }

        // Account indexes are a single byte
        if entries.len() > usize::from(u8::MAX) {
            return Err(ParseError::TooManyAccounts(entries.len()));
        }

        let (payer_entry, rest) = entries.split_at(1);
        let rank = |e: &KeyEntry| match (e.is_signer, e.is_writable) {
            (true, true) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (false, false) => 3,
        };
        let mut ordered: Vec<&KeyEntry> = rest.iter().collect();
        ordered.sort_by_key(|e| rank(*e));
        let ordered: Vec<&KeyEntry> = payer_entry.iter().chain(ordered).collect();

        let count = |pred: fn(&KeyEntry) -> bool| {
            let n = ordered.iter().filter(|e| pred(e)).count();
            u8::try_from(n).map_err(|_| ParseError::TooManyAccounts(n))
        };
        let header = MessageHeader {
            num_required_signatures: count(|e| e.is_signer)?,
            num_readonly_signed_accounts: count(|e| e.is_signer && !e.is_writable)?,
            num_readonly_unsigned_accounts: count(|e| !e.is_signer && !e.is_writable)?,
        };
        let account_keys: Vec<Address> = ordered.iter().map(|e| e.address).collect();

        let index_of = |address: &Address| -> Result<u8, ParseError> {
            let pos = account_keys
                .iter()
                .position(|k| k == address)
                .ok_or_else(|| ParseError::MissingAccount(address.to_string()))?;
            u8::try_from(pos).map_err(|_| ParseError::TooManyAccounts(pos + 1))
        };
        let instructions = instructions
            .iter()
            .map(|ix| {
                Ok(CompiledInstruction {
                    program_id_index: index_of(&ix.program_id)?,
                    accounts: ix
                        .accounts
                        .iter()
                        .map(|m| index_of(&m.address))
                        .collect::<Result<_, _>>()?,
                    data: ix.data.clone(),
                })
            })
            .collect::<Result<Vec<_>, ParseError>>()?;

        Ok(Message {
            header,
            account_keys,
            recent_blockhash,
            instructions,
        })
    }

    pub fn signer_keys(&self) -> &[Address] {
        let n = (self.header.num_required_signatures as usize).min(self.account_keys.len());
        &self.account_keys[..n]
    }

    pub fn serialize(&self) -> Result<Vec<u8>, ParseError> {
        let mut out = vec![
            self.header.num_required_signatures,
            self.header.num_readonly_signed_accounts,
            self.header.num_readonly_unsigned_accounts,
        ];
        write_shortvec_len(&mut out, self.account_keys.len())?;
        for key in &self.account_keys {
            out.extend_from_slice(key.as_bytes());
        }
        out.extend_from_slice(&self.recent_blockhash);
        write_shortvec_len(&mut out, self.instructions.len())?;
        for ix in &self.instructions {
            out.push(ix.program_id_index);
            write_shortvec_len(&mut out, ix.accounts.len())?;
            out.extend_from_slice(&ix.accounts);
            write_shortvec_len(&mut out, ix.data.len())?;
            out.extend_from_slice(&ix.data);
        }
        Ok(out)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, ParseError> {
        let mut reader = Reader::new(bytes);
        let header = MessageHeader {
            num_required_signatures: reader.byte()?,
            num_readonly_signed_accounts: reader.byte()?,
            num_readonly_unsigned_accounts: reader.byte()?,
        };
        let key_count = reader.shortvec()?;
        let mut account_keys = Vec::with_capacity(key_count);
        for _ in 0..key_count {
            account_keys.push(Address::new(reader.array::<32>()?));
        }
        let recent_blockhash = reader.array::<32>()?;
        let ix_count = reader.shortvec()?;
        let mut instructions = Vec::with_capacity(ix_count);
        for _ in 0..ix_count {
            let program_id_index = reader.byte()?;
            let n = reader.shortvec()?;
            let accounts = reader.take(n)?.to_vec();
            let n = reader.shortvec()?;
            let data = reader.take(n)?.to_vec();
            instructions.push(CompiledInstruction { program_id_index, accounts, data });
        }
        Ok(Message {
            header,
            account_keys,
            recent_blockhash,
            instructions,
        })
    }
}

/// A message plus one signature slot per required signer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub signatures: Vec<Signature>,
    pub message: Message,
}

impl Transaction {
    pub fn new_unsigned(message: Message) -> Self {
        let slots = message.header.num_required_signatures as usize;
        Transaction {
            signatures: vec![Signature::empty(); slots],
            message,
        }
    }

    /// Fill the signature slots belonging to `signers`
    pub fn sign(&mut self, signers: &[&Keypair]) -> Result<(), ParseError> {
        let bytes = self.message.serialize()?;
        for signer in signers {
            let key = signer.public_key();
            if let Some(pos) = self.message.signer_keys().iter().position(|k| *k == key) {
                self.signatures[pos] = signer.sign(&bytes);
            }
        }
        Ok(())
    }

    /// The transaction id: the fee payer's signature
    pub fn signature(&self) -> Option<Signature> {
        self.signatures.first().copied().filter(|s| !s.is_empty())
    }

    pub fn is_fully_signed(&self) -> bool {
        self.signatures.len() == self.message.header.num_required_signatures as usize
            && self.signatures.iter().all(|s| !s.is_empty())
    }

    pub fn verify(&self) -> bool {
        let Ok(bytes) = self.message.serialize() else {
            return false;
        };
        self.is_fully_signed()
            && self
                .message
                .signer_keys()
                .iter()
                .zip(&self.signatures)
                .all(|(key, sig)| verify_signature(key, &bytes, sig))
    }

    pub fn serialize(&self) -> Result<Vec<u8>, ParseError> {
        let mut out = Vec::new();
        write_shortvec_len(&mut out, self.signatures.len())?;
        for sig in &self.signatures {
            out.extend_from_slice(sig.as_bytes());
        }
        out.extend_from_slice(&self.message.serialize()?);
        Ok(out)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, ParseError> {
        let mut reader = Reader::new(bytes);
        let count = reader.shortvec()?;
        let mut signatures = Vec::with_capacity(count);
        for _ in 0..count {
            signatures.push(Signature::new(reader.array::<64>()?));
        }
        let message = Message::deserialize(reader.rest())?;
        Ok(Transaction { signatures, message })
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Reader { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ParseError> {
        let end = self.pos.checked_add(n).ok_or(ParseError::Truncated)?;
        let slice = self.bytes.get(self.pos..end).ok_or(ParseError::Truncated)?;
        self.pos = end;
        Ok(slice)
    }

    fn byte(&mut self) -> Result<u8, ParseError> {
        Ok(self.take(1)?[0])
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], ParseError> {
        let slice = self.take(N)?;
        slice.try_into().map_err(|_| ParseError::Truncated)
    }

    fn shortvec(&mut self) -> Result<usize, ParseError> {
        let (len, used) = read_shortvec_len(&self.bytes[self.pos..])?;
        self.pos += used;
        Ok(len)
    }

    fn rest(&self) -> &'a [u8] {
        &self.bytes[self.pos..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer_tx(from: &Keypair, to: Address) -> Transaction {
        let ix = system_transfer(&from.public_key(), &to, Lamports::from_sol(2));
        let message = Message::new(&[ix], &from.public_key(), [3u8; 32]).unwrap();
        let mut tx = Transaction::new_unsigned(message);
        tx.sign(&[from]).unwrap();
        tx
    }

    #[test]
    fn test_transfer_message_layout() {
        let from = Keypair::generate();
        let to = Address::new([5u8; 32]);
        let tx = transfer_tx(&from, to);

        let msg = &tx.message;
        assert_eq!(
            msg.header,
            MessageHeader {
                num_required_signatures: 1,
                num_readonly_signed_accounts: 0,
                num_readonly_unsigned_accounts: 1,
            }
        );
        assert_eq!(msg.account_keys, vec![from.public_key(), to, Address::system_program()]);
        assert_eq!(msg.instructions.len(), 1);
        assert_eq!(msg.instructions[0].program_id_index, 2);
        assert_eq!(msg.instructions[0].accounts, vec![0, 1]);
        assert_eq!(&msg.instructions[0].data[..4], &[2, 0, 0, 0]);
        assert_eq!(&msg.instructions[0].data[4..], &2_000_000_000u64.to_le_bytes());
    }

    #[test]
    fn test_signed_transaction_verifies() {
        let from = Keypair::generate();
        let tx = transfer_tx(&from, Address::new([5u8; 32]));
        assert!(tx.is_fully_signed());
        assert!(tx.verify());
        assert_eq!(tx.signature(), Some(tx.signatures[0]));

        let mut tampered = tx.clone();
        tampered.message.recent_blockhash = [4u8; 32];
        assert!(!tampered.verify());
    }

    #[test]
    fn test_unsigned_transaction_has_no_id() {
        let from = Keypair::generate();
        let ix = system_transfer(&from.public_key(), &Address::new([1u8; 32]), Lamports(1));
        let tx = Transaction::new_unsigned(Message::new(&[ix], &from.public_key(), [0u8; 32]).unwrap());
        assert_eq!(tx.signature(), None);
        assert!(!tx.verify());
    }

    #[test]
    fn test_wire_decode_recovers_transfer() {
        let from = Keypair::generate();
        let to = Address::new([8u8; 32]);
        let tx = transfer_tx(&from, to);

        let decoded = Transaction::deserialize(&tx.serialize().unwrap()).unwrap();
        assert_eq!(decoded, tx);
        let parsed = parse_system_transfer(&decoded.message, &decoded.message.instructions[0]);
        assert_eq!(parsed, Some((from.public_key(), to, Lamports::from_sol(2))));
    }

    #[test]
    fn test_truncated_wire_rejected() {
        let from = Keypair::generate();
        let bytes = transfer_tx(&from, Address::new([8u8; 32])).serialize().unwrap();
        assert_eq!(
            Transaction::deserialize(&bytes[..bytes.len() - 3]).unwrap_err(),
            ParseError::Truncated
        );
    }

    #[test]
    fn test_too_many_accounts_rejected() {
        let payer = Address::new([1u8; 32]);
        let accounts = (0..=u8::MAX)
            .map(|i| {
                let mut bytes = [9u8; 32];
                bytes[0] = i;
                AccountMeta { address: Address::new(bytes), is_signer: false, is_writable: true }
            })
            .collect();
        let ix = Instruction {
            program_id: Address::system_program(),
            accounts,
            data: Vec::new(),
        };
        assert!(matches!(
            Message::new(&[ix], &payer, [0u8; 32]),
            Err(ParseError::TooManyAccounts(_))
        ));
    }
}

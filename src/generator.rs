//! Generator role (spec §4.1): walks the file list, selects a basis for
//! each entry, and emits block signatures to the Sender. After the first
//! pass it collects the Receiver's REDO set and re-emits full-strength
//! signatures for those files only, per the two-phase redo policy.

use std::io::{Read, Write};

use crate::basis::FileBytesProvider;
use crate::channel::MessageChannel;
use crate::error::CoreResult;
use crate::interfaces::FileList;
use crate::session::{Phase, SessionConfig};
use crate::signature::{compute_signature, write_signature};
use crate::wire::{MD4_SUM_LENGTH, PHASE1_STRONG_LENGTH};

fn strong_len_for(phase: Phase) -> u32 {
    match phase {
        Phase::One => PHASE1_STRONG_LENGTH,
        Phase::Two => MD4_SUM_LENGTH as u32,
    }
}

fn run_phase<S, B>(
    phase: Phase,
    file_list: &dyn FileList,
    basis: &B,
    config: &SessionConfig,
    to_sender: &mut MessageChannel<S>,
    indices: &[usize],
) -> CoreResult<()>
where
    S: Read + Write,
    B: FileBytesProvider,
{
    let strong_len = strong_len_for(phase);
    for &index in indices {
        let entry = file_list.entry(index);
        let basis_bytes = basis.open(entry)?;
        let signature = compute_signature(&basis_bytes, config.seed, strong_len);
        to_sender.write_i32(index as i32)?;
        write_signature(to_sender, &signature)?;
    }
    Ok(())
}

/// Runs a complete two-phase generator session: the whole file list in
/// phase 1, then only the indices the Receiver reported as failed in
/// phase 2. `to_sender` and `from_receiver` are independent links (spec
/// §2's three-duplex-link process model), so they are independent type
/// parameters rather than a single shared stream type.
pub fn run_generator_session<S1, S2, B>(
    file_list: &dyn FileList,
    basis: &B,
    config: &SessionConfig,
    to_sender: &mut MessageChannel<S1>,
    from_receiver: &mut MessageChannel<S2>,
) -> CoreResult<()>
where
    S1: Read + Write,
    S2: Read + Write,
    B: FileBytesProvider,
{
    let all_indices: Vec<usize> = (0..file_list.len()).collect();
    run_phase(Phase::One, file_list, basis, config, to_sender, &all_indices)?;
    to_sender.write_done()?;
    to_sender.flush()?;

    let redo_indices: Vec<usize> = from_receiver
        .drain_control()?
        .into_iter()
        .map(|i| i as usize)
        .collect();

    if !redo_indices.is_empty() {
        run_phase(Phase::Two, file_list, basis, config, to_sender, &redo_indices)?;
    }
    to_sender.write_done()?;
    to_sender.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basis::MapBytesProvider;
    use crate::interfaces::{FileEntry, VecFileList};
    use crate::signature::read_signature;
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::net::{TcpListener, TcpStream};
    use std::thread;

    fn duplex_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || listener.accept().unwrap().0);
        let client = TcpStream::connect(addr).unwrap();
        (handle.join().unwrap(), client)
    }

    #[test]
    fn phase_one_emits_one_signature_per_file() {
        let entries = vec![
            FileEntry { name: "a".into(), size: 5, mode: 0o644, mtime: 0, link_info: None },
            FileEntry { name: "b".into(), size: 0, mode: 0o644, mtime: 0, link_info: None },
        ];
        let file_list = VecFileList(entries);

        let mut bytes_map = HashMap::new();
        bytes_map.insert("a".to_string(), b"hello".to_vec());
        let basis = MapBytesProvider(bytes_map);
        let config = SessionConfig::default();

        let (server, client) = duplex_pair();
        let mut to_sender = MessageChannel::new(server);
        let mut from_receiver = MessageChannel::new(Cursor::new(Vec::<u8>::new()));
        // No redo: the receiver-side cursor is immediately "done".
        from_receiver.done = true;

        let handle = thread::spawn(move || {
            run_generator_session(&file_list, &basis, &config, &mut to_sender, &mut from_receiver).unwrap();
        });

        let mut reader = MessageChannel::new(client);
        let idx0 = reader.read_i32().unwrap();
        let sig0 = read_signature(&mut reader).unwrap();
        assert_eq!(idx0, 0);
        assert_eq!(sig0.header.strong_len, PHASE1_STRONG_LENGTH);

        let idx1 = reader.read_i32().unwrap();
        let sig1 = read_signature(&mut reader).unwrap();
        assert_eq!(idx1, 1);
        assert_eq!(sig1.header.count, 0);

        assert!(reader.at_end().unwrap());
        handle.join().unwrap();
    }
}

//! Sender role (spec §4.2): matches a source file against the basis
//! signature it receives from the Generator, emitting a token stream of
//! literal runs and basis-block copies, followed by the whole-file
//! strong digest the Receiver verifies against.

use std::io::{Read, Write};

use rustc_hash::FxHashMap;

use crate::basis::FileBytesProvider;
use crate::channel::MessageChannel;
use crate::checksum::{strong, weak::WeakChecksum};
use crate::error::CoreResult;
use crate::interfaces::FileList;
use crate::session::{SessionConfig, SessionStats};
use crate::signature::FileSignature;
use crate::wire::{MAX_FRAME_LEN, MD4_SUM_LENGTH};

/// Scans `data` against `signature`, writing a token stream to `channel`:
/// a run of `Token::Copy` markers (negative `i32`, `-(block_index + 1)`)
/// and `Token::Literal` runs (positive `i32` length followed by that many
/// DATA bytes), terminated by a zero `i32`, followed by the whole-file
/// digest. A literal run longer than `max_literal_chunk` is split across
/// several positive-length tokens rather than sent as one (spec §4.2);
/// this also keeps every DATA frame under the wire's 24-bit length field.
pub fn match_sums<S: Read + Write>(
    channel: &mut MessageChannel<S>,
    signature: &FileSignature,
    data: &[u8],
    seed: u32,
    max_literal_chunk: usize,
) -> CoreResult<SessionStats> {
    let mut stats = SessionStats::default();
    let blen = signature.header.block_length as usize;
    let strong_len = signature.header.strong_len as usize;

    let mut by_weak: FxHashMap<u32, Vec<usize>> = FxHashMap::default();
    for (i, block) in signature.blocks.iter().enumerate() {
        by_weak.entry(block.weak).or_default().push(i);
    }

    let len = data.len();
    let mut pos = 0usize;
    let mut literal_start = 0usize;

    if signature.header.count > 0 && blen > 0 {
        let mut window_len = std::cmp::min(blen, len.saturating_sub(pos));
        let mut checksum = if window_len > 0 {
            WeakChecksum::from_window(&data[pos..pos + window_len])
        } else {
            WeakChecksum::default()
        };
        // Tracks the window length `checksum` actually represents, so a
        // shrinking tail window (file length not a multiple of the block
        // length) gets recomputed from scratch rather than rolled with a
        // stale length, which `WeakChecksum::roll` doesn't support.
        let mut checksum_len = window_len;

        while pos < len {
            window_len = std::cmp::min(blen, len - pos);
            if window_len != checksum_len {
                checksum = WeakChecksum::from_window(&data[pos..pos + window_len]);
                checksum_len = window_len;
            }
            let weak = checksum.value();
            let mut matched_index = None;

            if let Some(candidates) = by_weak.get(&weak) {
                let window = &data[pos..pos + window_len];
                let full = strong::digest(seed, window);
                let prefix = &full[..strong_len];
                for &candidate_index in candidates {
                    let block = &signature.blocks[candidate_index];
                    if block.len as usize == window_len && block.strong == prefix {
                        matched_index = Some(candidate_index);
                        break;
                    }
                }
            }

            if let Some(block_index) = matched_index {
                if literal_start < pos {
                    write_literal(channel, &data[literal_start..pos], &mut stats, max_literal_chunk)?;
                }
                channel.write_i32(-((block_index as i32) + 1))?;
                stats.matched_data += window_len as u64;
                pos += window_len;
                literal_start = pos;
                if pos < len {
                    let next_len = std::cmp::min(blen, len - pos);
                    checksum = WeakChecksum::from_window(&data[pos..pos + next_len]);
                    checksum_len = next_len;
                }
                continue;
            }

            if pos + window_len < len {
                let old_byte = data[pos];
                let new_byte = data[pos + window_len];
                checksum.roll(old_byte, new_byte, window_len as u32);
            }
            pos += 1;
        }
    }

    if literal_start < len {
        write_literal(channel, &data[literal_start..len], &mut stats, max_literal_chunk)?;
    }

    channel.write_i32(0)?;
    let digest = strong::digest(seed, data);
    channel.write_data(&digest)?;

    stats.total_transferred_size = len as u64;
    Ok(stats)
}

fn write_literal<S: Read + Write>(
    channel: &mut MessageChannel<S>,
    bytes: &[u8],
    stats: &mut SessionStats,
    max_chunk: usize,
) -> CoreResult<()> {
    if bytes.is_empty() {
        return Ok(());
    }
    let chunk_size = max_chunk.clamp(1, MAX_FRAME_LEN);
    for chunk in bytes.chunks(chunk_size) {
        channel.write_i32(chunk.len() as i32)?;
        channel.write_data(chunk)?;
        stats.literal_data += chunk.len() as u64;
    }
    Ok(())
}

/// Reads the full whole-file digest that follows a token stream.
pub fn read_whole_file_digest<S: Read + Write>(
    channel: &mut MessageChannel<S>,
) -> std::io::Result<[u8; MD4_SUM_LENGTH]> {
    let bytes = channel.read_exact_data(MD4_SUM_LENGTH)?;
    let mut digest = [0u8; MD4_SUM_LENGTH];
    digest.copy_from_slice(&bytes);
    Ok(digest)
}

/// Drives one full sender session: for each `(index, signature)` pair
/// the Generator produced, matches the corresponding source file and
/// forwards the token stream to the Receiver. Source files that vanish
/// between listing and read are reported as an empty delta, per spec §8
/// scenario's vanished-file handling, and flagged in the returned stats'
/// `io_errors`.
pub fn run_sender<S, B>(
    file_list: &dyn FileList,
    source: &B,
    config: &SessionConfig,
    from_generator: &mut MessageChannel<S>,
    to_receiver: &mut MessageChannel<S>,
) -> CoreResult<SessionStats>
where
    S: Read + Write,
    B: FileBytesProvider,
{
    let mut totals = SessionStats::default();

    // Two passes over the same link: phase 1 covers every file, phase 2
    // only the indices the Generator re-signed after the Receiver's redo
    // report. Each pass ends with its own DONE; `reset_done` lets the
    // link be read again after the first one.
    for phase in 0..2 {
        while !from_generator.at_end()? {
            let index = from_generator.read_i32()? as usize;
            let signature = crate::signature::read_signature(from_generator)?;
            let entry = file_list.entry(index);
            totals.current_file_index = Some(index);

            to_receiver.write_i32(index as i32)?;

            if config.dry_run {
                to_receiver.write_i32(0)?;
                let digest = strong::digest(config.seed, &[]);
                to_receiver.write_data(&digest)?;
                continue;
            }

            match source.open(entry) {
                Ok(data) => {
                    let stats = match_sums(to_receiver, &signature, &data, config.seed, config.max_literal_chunk)?;
                    totals.literal_data += stats.literal_data;
                    totals.matched_data += stats.matched_data;
                    totals.total_transferred_size += stats.total_transferred_size;
                    totals.num_transferred_files += 1;
                }
                Err(_) => {
                    totals.io_errors.set(crate::session::IoErrorFlags::VANISHED);
                    to_receiver.write_info(&format!("file vanished: {}", entry.name))?;
                    to_receiver.write_i32(0)?;
                    let digest = strong::digest(config.seed, &[]);
                    to_receiver.write_data(&digest)?;
                }
            }
        }
        to_receiver.write_done()?;
        to_receiver.flush()?;
        if phase == 0 {
            from_generator.reset_done();
        }
    }
    Ok(totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::compute_signature;
    use std::io::Cursor;

    fn channel_over(bytes: Vec<u8>) -> MessageChannel<Cursor<Vec<u8>>> {
        MessageChannel::new(Cursor::new(bytes))
    }

    #[test]
    fn identical_data_is_a_single_copy_token() {
        let data = vec![9u8; 3000];
        let signature = compute_signature(&data, 0, 16);

        let mut writer = channel_over(Vec::new());
        let stats = match_sums(&mut writer, &signature, &data, 0, 32 * 1024).unwrap();
        assert_eq!(stats.literal_data, 0);
        assert_eq!(stats.matched_data, data.len() as u64);
    }

    #[test]
    fn completely_different_data_is_all_literal() {
        let basis = vec![1u8; 3000];
        let signature = compute_signature(&basis, 0, 16);
        let new_data: Vec<u8> = (0..3000).map(|i| (i % 251) as u8).collect();

        let mut writer = channel_over(Vec::new());
        let stats = match_sums(&mut writer, &signature, &new_data, 0, 32 * 1024).unwrap();
        assert_eq!(stats.matched_data, 0);
        assert_eq!(stats.literal_data, new_data.len() as u64);
    }

    #[test]
    fn empty_basis_is_all_literal() {
        let signature = compute_signature(b"", 0, 16);
        let data = b"some new content".to_vec();

        let mut writer = channel_over(Vec::new());
        let stats = match_sums(&mut writer, &signature, &data, 0, 32 * 1024).unwrap();
        assert_eq!(stats.literal_data, data.len() as u64);
        assert_eq!(stats.matched_data, 0);
    }

    #[test]
    fn trailing_insertion_still_matches_the_leading_blocks() {
        let basis = vec![5u8; 2100];
        let signature = compute_signature(&basis, 0, 16);
        let mut data = basis.clone();
        data.extend_from_slice(b"appended-tail");

        let mut writer = channel_over(Vec::new());
        let stats = match_sums(&mut writer, &signature, &data, 0, 32 * 1024).unwrap();
        assert!(stats.matched_data >= basis.len() as u64 - 700);
        assert!(stats.literal_data > 0);
    }

    #[test]
    fn a_tail_remainder_block_still_matches_after_a_leading_literal_run() {
        // 700-byte floor block plus a 20-byte remainder block; only the
        // remainder is shared with the new data, so the scan has to carry
        // the rolling checksum correctly through the shrinking tail window.
        let mut basis = vec![b'A'; 700];
        basis.extend(std::iter::repeat(b'B').take(20));
        let signature = compute_signature(&basis, 0, 16);

        let mut data = vec![b'C'; 700];
        data.extend(std::iter::repeat(b'B').take(20));

        let mut writer = channel_over(Vec::new());
        let stats = match_sums(&mut writer, &signature, &data, 0, 32 * 1024).unwrap();
        assert_eq!(stats.matched_data, 20);
        assert_eq!(stats.literal_data, 700);
    }

    #[test]
    fn a_long_literal_run_is_split_into_max_chunk_sized_tokens() {
        let signature = compute_signature(b"", 0, 16);
        let data = vec![3u8; 10_000];

        let mut writer = channel_over(Vec::new());
        let stats = match_sums(&mut writer, &signature, &data, 0, 4_000).unwrap();
        assert_eq!(stats.literal_data, data.len() as u64);

        let bytes = writer.into_inner().into_inner();
        let mut reader = channel_over(bytes);
        let mut token_lens = Vec::new();
        loop {
            let token = reader.read_i32().unwrap();
            if token == 0 {
                break;
            }
            assert!(token > 0, "basis is empty, every token must be a literal");
            let len = token as usize;
            assert!(len <= 4_000);
            reader.read_exact_data(len).unwrap();
            token_lens.push(len);
        }
        assert_eq!(token_lens, vec![4_000, 4_000, 2_000]);
    }

    struct AlwaysVanished;
    impl FileBytesProvider for AlwaysVanished {
        fn open(&self, _entry: &crate::interfaces::FileEntry) -> std::io::Result<Vec<u8>> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))
        }
    }

    #[test]
    fn a_vanished_source_file_sends_an_empty_delta_and_flags_io_errors() {
        use crate::interfaces::{FileEntry, VecFileList};
        use crate::session::IoErrorFlags;
        use crate::signature::write_signature;

        let file_list = VecFileList(vec![FileEntry {
            name: "gone.txt".into(),
            size: 0,
            mode: 0o644,
            mtime: 0,
            link_info: None,
        }]);

        let mut gen_writer = channel_over(Vec::new());
        let sig = compute_signature(b"", 0, 16);
        gen_writer.write_i32(0).unwrap();
        write_signature(&mut gen_writer, &sig).unwrap();
        gen_writer.write_done().unwrap();
        gen_writer.write_done().unwrap();
        let mut from_generator = channel_over(gen_writer.into_inner().into_inner());

        let mut to_receiver = channel_over(Vec::new());
        let config = SessionConfig::default();
        let stats = run_sender(&file_list, &AlwaysVanished, &config, &mut from_generator, &mut to_receiver).unwrap();

        assert!(stats.io_errors.contains(IoErrorFlags::VANISHED));
        assert_eq!(stats.num_transferred_files, 0);

        let mut reader = channel_over(to_receiver.into_inner().into_inner());
        assert_eq!(reader.read_i32().unwrap(), 0);
        let token = reader.read_i32().unwrap();
        assert_eq!(token, 0);
        let digest = reader.read_exact_data(MD4_SUM_LENGTH).unwrap();
        assert_eq!(digest.as_slice(), &strong::digest(0, &[])[..]);
        assert!(reader.at_end().unwrap());
    }
}
